//! Deterministic ordering of emitted schema entries.
//!
//! Output order must depend only on the registered data, never on
//! registration order or map iteration order. Every sorted collection in
//! the emitted document is sorted by [`OrderingKey`].

use std::cmp::Ordering;

use crate::types::MemberKind;

/// What an ordered entry is. Classifiers precede classes; members are only
/// ever compared with other members.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntryKind {
    Classifier,
    Class,
    Member,
}

/// Sort key computed once from a finished descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OrderingKey {
    pub entry: EntryKind,
    /// Explicit sequence; 0 means no preference.
    pub sequence: u32,
    pub member_kind: MemberKind,
    pub name: String,
}

impl OrderingKey {
    pub fn classifier(name: impl Into<String>) -> Self {
        Self {
            entry: EntryKind::Classifier,
            sequence: 0,
            member_kind: MemberKind::Content,
            name: name.into(),
        }
    }

    pub fn class(name: impl Into<String>) -> Self {
        Self {
            entry: EntryKind::Class,
            sequence: 0,
            member_kind: MemberKind::Content,
            name: name.into(),
        }
    }

    pub fn member(name: impl Into<String>, sequence: u32, member_kind: MemberKind) -> Self {
        Self {
            entry: EntryKind::Member,
            sequence,
            member_kind,
            name: name.into(),
        }
    }
}

/// Unsequenced entries (0) sort after every sequenced one.
fn sequence_rank(sequence: u32) -> (bool, u32) {
    (sequence == 0, sequence)
}

/// Total order over schema entries, most significant first:
/// entry kind, explicit sequence, supplementary before content, then
/// case-sensitive name.
pub fn compare(a: &OrderingKey, b: &OrderingKey) -> Ordering {
    a.entry
        .cmp(&b.entry)
        .then_with(|| sequence_rank(a.sequence).cmp(&sequence_rank(b.sequence)))
        .then_with(|| a.member_kind.cmp(&b.member_kind))
        .then_with(|| a.name.cmp(&b.name))
}

impl Ord for OrderingKey {
    fn cmp(&self, other: &Self) -> Ordering {
        compare(self, other)
    }
}

impl PartialOrd for OrderingKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

//! Model loading from various sources.
//!
//! Handles loading model files from disk, strings, and HTTP URLs.

use std::path::Path;

use crate::error::LoadError;
use crate::model::Model;

#[cfg(feature = "remote")]
use std::time::Duration;

/// Default timeout for HTTP requests (10 seconds).
#[cfg(feature = "remote")]
const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Load a model from a file path.
///
/// # Errors
///
/// Returns `LoadError::FileNotFound` if the file doesn't exist,
/// or `LoadError::InvalidModel` if the file isn't a valid model.
pub fn load_model(path: &Path) -> Result<Model, LoadError> {
    if !path.exists() {
        return Err(LoadError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    let content = std::fs::read_to_string(path).map_err(|source| LoadError::ReadError {
        path: path.to_path_buf(),
        source,
    })?;

    tracing::debug!(path = %path.display(), "loaded model file");
    load_model_str(&content)
}

/// Load a model from a JSON string.
///
/// # Errors
///
/// Returns `LoadError::InvalidModel` if the string isn't a valid model.
pub fn load_model_str(content: &str) -> Result<Model, LoadError> {
    serde_json::from_str(content).map_err(|source| LoadError::InvalidModel { source })
}

/// Load a model from an HTTP/HTTPS URL.
///
/// Requires the `remote` feature (enabled by default).
///
/// # Errors
///
/// Returns `LoadError::NetworkError` if the request fails,
/// or `LoadError::InvalidModel` if the body isn't a valid model.
#[cfg(feature = "remote")]
pub fn load_model_url(url: &str) -> Result<Model, LoadError> {
    let network = |source: reqwest::Error| LoadError::NetworkError {
        url: url.to_string(),
        source,
    };

    let client = reqwest::blocking::Client::builder()
        .timeout(HTTP_TIMEOUT)
        .build()
        .map_err(network)?;

    // Check for HTTP errors before parsing
    let body = client
        .get(url)
        .send()
        .and_then(|response| response.error_for_status())
        .and_then(|response| response.text())
        .map_err(network)?;

    tracing::debug!(url, "fetched model");
    load_model_str(&body)
}

/// Check if a string looks like a URL (starts with http:// or https://).
pub fn is_url(s: &str) -> bool {
    s.starts_with("http://") || s.starts_with("https://")
}

/// Load a model from a file path or URL.
///
/// Automatically detects whether the source is a URL or file path.
/// URL loading requires the `remote` feature.
///
/// # Errors
///
/// Returns appropriate errors based on the source type.
pub fn load_model_auto(source: &str) -> Result<Model, LoadError> {
    if is_url(source) {
        #[cfg(feature = "remote")]
        {
            load_model_url(source)
        }
        #[cfg(not(feature = "remote"))]
        {
            Err(LoadError::FileNotFound {
                path: std::path::PathBuf::from(source),
            })
        }
    } else {
        load_model(Path::new(source))
    }
}

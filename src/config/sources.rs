//! Config file loading.
//!
//! The format is picked from the file extension; each format sits behind
//! its own feature flag (`yaml` is on by default).

use std::path::Path;

use super::model::FileConfig;
use crate::error::{AppError, BoxError};

/// Parse a config string based on file extension.
pub fn parse_config_str(
    ext: &str,
    content: &str,
    path_display: &str,
) -> Result<FileConfig, AppError> {
    let parse_error = |source: BoxError| AppError::ConfigParse {
        path: path_display.to_string(),
        source,
    };

    match ext {
        #[cfg(feature = "yaml")]
        "yaml" | "yml" => serde_yml::from_str(content).map_err(|e| parse_error(Box::new(e))),

        #[cfg(feature = "json")]
        "json" => serde_json::from_str(content).map_err(|e| parse_error(Box::new(e))),

        #[cfg(feature = "toml")]
        "toml" => toml::from_str(content).map_err(|e| parse_error(Box::new(e))),

        other => Err(AppError::UnsupportedFormat(other.to_string())),
    }
}

pub async fn load_file(path: &Path) -> Result<FileConfig, AppError> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    let content = tokio::fs::read_to_string(path).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            AppError::ConfigFileNotFound {
                path: path.to_path_buf(),
            }
        } else {
            AppError::Io(e)
        }
    })?;
    parse_config_str(ext, &content, &path.display().to_string())
}

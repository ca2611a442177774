use std::path::Path;
use tokio::fs;

use crate::error::ExtractError;
use crate::schema::RequirementsSpec;

/// Write the requirements spec as pretty-printed JSON (2-space indent), creating missing
/// parent directories and overwriting any existing file.
pub async fn write_spec(spec: &RequirementsSpec, path: &Path) -> Result<(), ExtractError> {
    let io_error = |source: std::io::Error| ExtractError::Io {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await.map_err(io_error)?;
    }

    let mut json = serde_json::to_string_pretty(spec).map_err(|e| io_error(e.into()))?;
    json.push('\n');

    fs::write(path, json).await.map_err(io_error)
}

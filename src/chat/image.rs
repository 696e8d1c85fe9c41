//! Image attachments encoded as data URIs

use crate::error::{LlmError, Result};
use base64::{engine::general_purpose, Engine as _};
use std::path::Path;

/// MIME subtype for an image path, taken from its extension (`jpg` becomes `jpeg`)
pub fn image_subtype(path: &Path) -> Result<String> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .ok_or_else(|| LlmError::InvalidInput(format!("Image path has no extension: {:?}", path)))?;

    Ok(match extension.as_str() {
        "jpg" => "jpeg".to_string(),
        _ => extension,
    })
}

/// Read an image file into a `data:image/<subtype>;base64,...` URI
pub fn image_data_uri<P: AsRef<Path>>(path: P) -> Result<String> {
    let path = path.as_ref();
    let subtype = image_subtype(path)?;
    let bytes = std::fs::read(path).map_err(|source| LlmError::Image {
        path: path.to_path_buf(),
        source,
    })?;

    Ok(format!(
        "data:image/{};base64,{}",
        subtype,
        general_purpose::STANDARD.encode(bytes)
    ))
}

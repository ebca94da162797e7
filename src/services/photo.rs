use std::path::Path;

use base64::{engine::general_purpose::STANDARD, Engine as _};

use crate::error::{AppError, Result};

/// Reads an image file and encodes it the way photos are stored.
pub fn load_data_uri(path: &Path) -> Result<String> {
    let mime = mime_for_path(path).ok_or_else(|| {
        AppError::PreconditionFailed(format!("{} is not a supported image", path.display()))
    })?;
    let bytes = std::fs::read(path)?;
    if bytes.is_empty() {
        return Err(AppError::PreconditionFailed(format!(
            "{} is empty",
            path.display()
        )));
    }
    Ok(encode_data_uri(mime, &bytes))
}

pub fn encode_data_uri(mime: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", mime, STANDARD.encode(bytes))
}

fn mime_for_path(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        "bmp" => Some("image/bmp"),
        _ => None,
    }
}

use crate::error::{LmChatError, Result};
use crate::models::ContentBlock;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::path::Path;

/// MIME type from the file extension. Unknown extensions are sent as JPEG.
pub fn mime_type_for(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match extension.as_deref() {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("bmp") => "image/bmp",
        _ => "image/jpeg",
    }
}

/// Reads an image from disk into an inline, base64-encoded content block.
pub async fn load_image(path: impl AsRef<Path>) -> Result<ContentBlock> {
    let path = path.as_ref();
    if !tokio::fs::try_exists(path).await.unwrap_or(false) {
        return Err(LmChatError::ImageNotFound(path.to_path_buf()));
    }

    let bytes = tokio::fs::read(path)
        .await
        .map_err(|source| LmChatError::ImageRead {
            path: path.to_path_buf(),
            source,
        })?;

    Ok(ContentBlock::image(mime_type_for(path), STANDARD.encode(bytes)))
}

pub async fn load_images<P: AsRef<Path>>(paths: &[P]) -> Result<Vec<ContentBlock>> {
    let mut blocks = Vec::with_capacity(paths.len());
    for path in paths {
        blocks.push(load_image(path).await?);
    }
    Ok(blocks)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mime_type_follows_extension() {
        assert_eq!(mime_type_for(Path::new("a.PNG")), "image/png");
        assert_eq!(mime_type_for(Path::new("a.jpeg")), "image/jpeg");
        assert_eq!(mime_type_for(Path::new("a.webp")), "image/webp");
        assert_eq!(mime_type_for(Path::new("a.bmp")), "image/bmp");
        assert_eq!(mime_type_for(Path::new("a.gif")), "image/gif");
        assert_eq!(mime_type_for(Path::new("a.tiff")), "image/jpeg");
        assert_eq!(mime_type_for(Path::new("noext")), "image/jpeg");
    }
}

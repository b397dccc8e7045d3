use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use lmchat::image::{load_image, load_images};
use lmchat::models::ContentBlock;
use lmchat::LmChatError;
use std::fs;
use tempfile::TempDir;

#[tokio::test]
async fn test_load_image_encodes_contents() {
    let temp_dir = TempDir::new().unwrap();
    let image = temp_dir.path().join("photo.JPG");
    fs::write(&image, [0xFFu8, 0xD8, 0xFF, 0xE0]).unwrap();

    let block = load_image(&image).await.unwrap();
    match &block {
        ContentBlock::Image { mime_type, data } => {
            assert_eq!(mime_type, "image/jpeg");
            assert_eq!(STANDARD.decode(data).unwrap(), vec![0xFF, 0xD8, 0xFF, 0xE0]);
        }
        other => panic!("expected an image block, got {:?}", other),
    }
    assert!(block.data_url().unwrap().starts_with("data:image/jpeg;base64,"));
}

#[tokio::test]
async fn test_load_image_missing_file() {
    let temp_dir = TempDir::new().unwrap();
    let missing = temp_dir.path().join("nope.png");

    match load_image(&missing).await {
        Err(LmChatError::ImageNotFound(path)) => assert_eq!(path, missing),
        other => panic!("expected ImageNotFound, got {:?}", other),
    }
}

#[tokio::test]
async fn test_load_image_directory_is_read_error() {
    let temp_dir = TempDir::new().unwrap();
    let result = load_image(temp_dir.path()).await;
    assert!(matches!(result, Err(LmChatError::ImageRead { .. })));
}

#[tokio::test]
async fn test_load_images_keeps_order() {
    let temp_dir = TempDir::new().unwrap();
    let png = temp_dir.path().join("a.png");
    let gif = temp_dir.path().join("b.gif");
    fs::write(&png, b"png").unwrap();
    fs::write(&gif, b"gif").unwrap();

    let blocks = load_images(&[png, gif]).await.unwrap();
    let mimes: Vec<String> = blocks
        .iter()
        .filter_map(|b| match b {
            ContentBlock::Image { mime_type, .. } => Some(mime_type.clone()),
            ContentBlock::Text(_) => None,
        })
        .collect();
    assert_eq!(mimes, vec!["image/png", "image/gif"]);
}

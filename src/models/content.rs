use serde::de::{self, Deserializer};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};

const DATA_URL_PREFIX: &str = "data:";
const BASE64_MARKER: &str = ";base64,";

/// One block of a message payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentBlock {
    Text(String),
    /// An inline image, already base64-encoded.
    Image { mime_type: String, data: String },
}

impl ContentBlock {
    pub fn text(text: impl Into<String>) -> Self {
        ContentBlock::Text(text.into())
    }

    pub fn image(mime_type: impl Into<String>, base64_data: impl Into<String>) -> Self {
        ContentBlock::Image {
            mime_type: mime_type.into(),
            data: base64_data.into(),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ContentBlock::Text(text) => Some(text),
            ContentBlock::Image { .. } => None,
        }
    }

    /// `data:<mime>;base64,<payload>` for image blocks.
    pub fn data_url(&self) -> Option<String> {
        match self {
            ContentBlock::Text(_) => None,
            ContentBlock::Image { mime_type, data } => Some(format!(
                "{}{}{}{}",
                DATA_URL_PREFIX, mime_type, BASE64_MARKER, data
            )),
        }
    }
}

#[derive(Serialize)]
struct ImageUrlRef<'a> {
    url: &'a str,
}

impl Serialize for ContentBlock {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(2))?;
        match self {
            ContentBlock::Text(text) => {
                map.serialize_entry("type", "text")?;
                map.serialize_entry("text", text)?;
            }
            ContentBlock::Image { .. } => {
                let url = self.data_url().unwrap_or_default();
                map.serialize_entry("type", "image_url")?;
                map.serialize_entry("image_url", &ImageUrlRef { url: &url })?;
            }
        }
        map.end()
    }
}

#[derive(Deserialize)]
struct RawImageUrl {
    url: String,
}

#[derive(Deserialize)]
struct RawBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    image_url: Option<RawImageUrl>,
}

fn split_data_url(url: &str) -> Option<(&str, &str)> {
    let rest = url.strip_prefix(DATA_URL_PREFIX)?;
    let marker = rest.find(BASE64_MARKER)?;
    Some((&rest[..marker], &rest[marker + BASE64_MARKER.len()..]))
}

impl<'de> Deserialize<'de> for ContentBlock {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = RawBlock::deserialize(deserializer)?;
        match raw.kind.as_str() {
            "text" => Ok(ContentBlock::Text(raw.text.unwrap_or_default())),
            "image_url" => {
                let image_url = raw
                    .image_url
                    .ok_or_else(|| de::Error::missing_field("image_url"))?;
                let (mime_type, data) = split_data_url(&image_url.url).ok_or_else(|| {
                    de::Error::custom("image_url must be a base64 data URL")
                })?;
                Ok(ContentBlock::image(mime_type, data))
            }
            other => Err(de::Error::unknown_variant(other, &["text", "image_url"])),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum FlexibleContent {
    Text(String),
    Blocks(Vec<ContentBlock>),
}

/// Accepts message content as a bare string, an array of typed blocks, or null.
pub(crate) fn deserialize_content<'de, D>(deserializer: D) -> Result<Vec<ContentBlock>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<FlexibleContent>::deserialize(deserializer)? {
        Some(FlexibleContent::Text(text)) => vec![ContentBlock::Text(text)],
        Some(FlexibleContent::Blocks(blocks)) => blocks,
        None => Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn text_block_serializes_with_type_tag() {
        let value = serde_json::to_value(ContentBlock::text("hi")).unwrap();
        assert_eq!(value, json!({"type": "text", "text": "hi"}));
    }

    #[test]
    fn image_block_serializes_as_data_url() {
        let value = serde_json::to_value(ContentBlock::image("image/png", "AAAA")).unwrap();
        assert_eq!(
            value,
            json!({"type": "image_url", "image_url": {"url": "data:image/png;base64,AAAA"}})
        );
    }

    #[test]
    fn image_block_parses_data_url() {
        let block: ContentBlock = serde_json::from_value(
            json!({"type": "image_url", "image_url": {"url": "data:image/gif;base64,R0lG"}}),
        )
        .unwrap();
        assert_eq!(block, ContentBlock::image("image/gif", "R0lG"));
    }

    #[test]
    fn remote_image_url_is_rejected() {
        let result: Result<ContentBlock, _> = serde_json::from_value(
            json!({"type": "image_url", "image_url": {"url": "https://example.com/cat.png"}}),
        );
        assert!(result.is_err());
    }

    #[test]
    fn unknown_block_type_is_rejected() {
        let result: Result<ContentBlock, _> =
            serde_json::from_value(json!({"type": "audio", "data": "x"}));
        assert!(result.is_err());
    }
}

use crate::model::FileAttachment;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use chrono::Utc;
use uuid::Uuid;

/// Builds the `data:<type>;base64,<payload>` form the document viewer
/// consumes.
pub fn encode_data_url(media_type: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", media_type, BASE64.encode(bytes))
}

/// Splits a data URL back into media type and raw bytes. Returns `None`
/// for anything that is not a base64 data URL.
#[allow(dead_code)]
pub fn decode_data_url(url: &str) -> Option<(String, Vec<u8>)> {
    let rest = url.strip_prefix("data:")?;
    let (media_type, payload) = rest.split_once(";base64,")?;
    let bytes = BASE64.decode(payload).ok()?;
    Some((media_type.to_string(), bytes))
}

pub fn media_type_for_name(name: &str) -> &'static str {
    let ext = name
        .rsplit_once('.')
        .map(|(_, e)| e.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "pdf" => "application/pdf",
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "txt" => "text/plain",
        _ => "application/octet-stream",
    }
}

/// Stamps a fresh attachment with a v4 id and today's date.
pub fn new_attachment(name: &str, media_type: &str, data_url: String) -> FileAttachment {
    FileAttachment {
        id: Uuid::new_v4().to_string(),
        name: name.to_string(),
        media_type: media_type.to_string(),
        date: Utc::now().format("%Y-%m-%d").to_string(),
        data: Some(data_url),
    }
}

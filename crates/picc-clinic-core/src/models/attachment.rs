//! Photo attachments of an implant record.

use chrono::NaiveDate;
use rand::Rng;
use serde::{Deserialize, Serialize};

const TEMP_ID_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Client-side id for an attachment not yet saved: `temp_<millis>_<9 base-36 chars>`.
pub fn new_temp_id() -> String {
    let millis = chrono::Utc::now().timestamp_millis();
    let mut rng = rand::thread_rng();
    let suffix: String = (0..9)
        .map(|_| TEMP_ID_ALPHABET[rng.gen_range(0..TEMP_ID_ALPHABET.len())] as char)
        .collect();
    format!("temp_{}_{}", millis, suffix)
}

pub fn is_temp_id(id: &str) -> bool {
    id.starts_with("temp_")
}

/// An image attached to an implant record.
///
/// Exactly one of `id` (assigned by the server) or `temp_id` (assigned on
/// upload) identifies it; on save the server echoes both so the client can
/// reconcile.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Attachment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "tempId", default, skip_serializing_if = "Option::is_none")]
    pub temp_id: Option<String>,
    /// Base64 JPEG, never with a `data:` prefix
    pub image_data: String,
    #[serde(rename = "descrizione", default)]
    pub description: String,
    #[serde(rename = "data")]
    pub created_on: NaiveDate,
}

impl Attachment {
    /// A freshly uploaded image with a temporary id.
    pub fn uploaded(image_data: String, description: String, created_on: NaiveDate) -> Self {
        Self {
            id: None,
            temp_id: Some(new_temp_id()),
            image_data,
            description,
            created_on,
        }
    }

    /// The id used to refer to this attachment from the record.
    pub fn key(&self) -> &str {
        self.id
            .as_deref()
            .or(self.temp_id.as_deref())
            .unwrap_or_default()
    }

    pub fn is_saved(&self) -> bool {
        self.id.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_temp_id_format() {
        let id = new_temp_id();
        assert!(is_temp_id(&id));
        let parts: Vec<&str> = id.split('_').collect();
        assert_eq!(parts.len(), 3);
        assert!(parts[1].parse::<i64>().is_ok());
        assert_eq!(parts[2].len(), 9);
        assert!(parts[2].chars().all(|c| c.is_ascii_digit() || c.is_ascii_lowercase()));
    }

    #[test]
    fn test_key_prefers_server_id() {
        let date = NaiveDate::from_ymd_opt(2024, 6, 10).unwrap();
        let mut a = Attachment::uploaded("AAAA".into(), "foto.jpg".into(), date);
        assert!(is_temp_id(a.key()));
        assert!(!a.is_saved());
        a.id = Some("srv-1".into());
        assert_eq!(a.key(), "srv-1");
    }

    #[test]
    fn test_wire_shape() {
        let date = NaiveDate::from_ymd_opt(2024, 6, 10).unwrap();
        let a = Attachment::uploaded("AAAA".into(), "foto.jpg".into(), date);
        let json = serde_json::to_value(&a).unwrap();
        assert!(json.get("id").is_none());
        assert!(json.get("tempId").is_some());
        assert_eq!(json["descrizione"], "foto.jpg");
        assert_eq!(json["data"], "2024-06-10");
    }
}

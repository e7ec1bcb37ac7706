//! Wire model for remote items and revisions.
//!
//! Items are typed records over the small set of fields the engine reasons
//! about; everything else the store returns (labels, owners, links, …) is
//! kept verbatim in the open `extra` map so nothing downstream has to probe
//! for fields at runtime.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// MIME type the store uses for folders.
pub const FOLDER_MIME: &str = "application/vnd.google-apps.folder";

/// MIME prefix of native documents: types the store can only export, never
/// serve raw, and for which it never declares a checksum or size.
pub const NATIVE_MIME_PREFIX: &str = "application/vnd.google-apps";

/// One item of the remote hierarchy, as returned by listing or lookup.
///
/// The identifier is the sole identity key; title and derived paths are
/// non-identifying and survive renames only as different attribute values.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteItem {
    pub id: String,
    pub title: String,
    pub mime_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub md5_checksum: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_u64",
        skip_serializing_if = "Option::is_none"
    )]
    pub file_size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_viewed_by_me_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_date: Option<DateTime<Utc>>,
    #[serde(
        default,
        deserialize_with = "lenient_u64",
        skip_serializing_if = "Option::is_none"
    )]
    pub version: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_filename: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_extension: Option<String>,
    /// Recorded history, populated by the engine after listing revisions and
    /// normalizing (a single entry is only the current state, not history).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revisions: Option<Vec<Revision>>,
    /// Vendor fields the engine carries but does not interpret.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RemoteItem {
    pub fn is_folder(&self) -> bool {
        self.mime_type == FOLDER_MIME
    }

    pub fn is_native_doc(&self) -> bool {
        self.mime_type.starts_with(NATIVE_MIME_PREFIX) && !self.is_folder()
    }
}

/// A historical content state of an item.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Revision {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub md5_checksum: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_u64",
        skip_serializing_if = "Option::is_none"
    )]
    pub file_size: Option<u64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One page of a folder listing.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemPage {
    #[serde(default)]
    pub items: Vec<RemoteItem>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

/// Response envelope of a revision listing.
#[derive(Debug, Clone, Deserialize)]
pub struct RevisionPage {
    #[serde(default)]
    pub items: Vec<Revision>,
}

/// The store serializes 64-bit counters (sizes, versions) as JSON strings;
/// accept either form.
fn lenient_u64<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(u64),
        Text(String),
    }

    match Option::<Raw>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Raw::Number(n)) => Ok(Some(n)),
        Some(Raw::Text(s)) => s.parse().map(Some).map_err(serde::de::Error::custom),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> RemoteItem {
        serde_json::from_value(serde_json::json!({
            "id": "f1",
            "title": "Quarterly Report",
            "mimeType": "application/pdf",
            "md5Checksum": "abc123",
            "fileSize": "2048",
            "version": "3",
            "modifiedDate": "2019-05-17T14:31:52.520Z",
            "originalFilename": "Quarterly Report.pdf",
            "fileExtension": "pdf",
            "selfLink": "https://example.invalid/files/f1",
            "labels": {"trashed": false}
        }))
        .unwrap()
    }

    #[test]
    fn test_deserialize_stringly_counters() {
        let item = sample();
        assert_eq!(item.file_size, Some(2048));
        assert_eq!(item.version, Some(3));
    }

    #[test]
    fn test_numeric_counters_also_accepted() {
        let item: RemoteItem = serde_json::from_value(serde_json::json!({
            "id": "f2",
            "title": "x",
            "mimeType": "text/plain",
            "fileSize": 10
        }))
        .unwrap();
        assert_eq!(item.file_size, Some(10));
    }

    #[test]
    fn test_unknown_fields_collect_into_extra() {
        let item = sample();
        assert!(item.extra.contains_key("selfLink"));
        assert!(item.extra.contains_key("labels"));
        assert!(!item.extra.contains_key("md5Checksum"));
    }

    #[test]
    fn test_folder_and_native_predicates() {
        let mut item = sample();
        assert!(!item.is_folder());
        assert!(!item.is_native_doc());

        item.mime_type = FOLDER_MIME.to_string();
        assert!(item.is_folder());
        assert!(!item.is_native_doc());

        item.mime_type = "application/vnd.google-apps.document".to_string();
        assert!(item.is_native_doc());
    }

    #[test]
    fn test_timestamp_parses_with_millis() {
        let item = sample();
        let modified = item.modified_date.unwrap();
        assert_eq!(modified.timestamp(), 1558103512);
    }

    #[test]
    fn test_page_without_token() {
        let page: ItemPage = serde_json::from_value(serde_json::json!({
            "items": [{"id": "a", "title": "A", "mimeType": "text/plain"}]
        }))
        .unwrap();
        assert_eq!(page.items.len(), 1);
        assert!(page.next_page_token.is_none());
    }
}

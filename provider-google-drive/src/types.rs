//! Google Drive API response types
//!
//! Data structures for deserializing Google Drive API v3 responses.

use bridge_traits::remote::RemoteFile;
use chrono::{DateTime, Utc};
use serde::Deserialize;

/// Google Drive API file resource, restricted to the requested fields.
///
/// See: https://developers.google.com/drive/api/v3/reference/files#resource
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveFile {
    pub id: String,
    pub name: String,
    /// Modification time (RFC 3339)
    #[serde(default)]
    pub modified_time: Option<String>,
}

impl DriveFile {
    /// Convert into the provider-neutral descriptor. An unparseable
    /// timestamp is dropped rather than failing the whole page.
    pub fn into_remote_file(self) -> RemoteFile {
        let modified_time = self
            .modified_time
            .as_deref()
            .and_then(|t| DateTime::parse_from_rfc3339(t).ok())
            .map(|dt| dt.with_timezone(&Utc));

        RemoteFile {
            id: self.id,
            name: self.name,
            modified_time,
        }
    }
}

/// Google Drive API files.list response
///
/// See: https://developers.google.com/drive/api/v3/reference/files/list
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilesListResponse {
    #[serde(default)]
    pub files: Vec<DriveFile>,

    /// Token for next page
    #[serde(default)]
    pub next_page_token: Option<String>,
}

/// Error envelope returned by the API.
#[derive(Debug, Deserialize)]
pub struct ApiErrorResponse {
    pub error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_files_list_deserialization() {
        let json = r#"{
            "nextPageToken": "page-2",
            "files": [
                {"id": "1", "name": "A.pdf", "modifiedTime": "2024-03-01T10:15:00.000Z"},
                {"id": "2", "name": "B.pdf"}
            ]
        }"#;

        let response: FilesListResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.next_page_token.as_deref(), Some("page-2"));

        let files: Vec<RemoteFile> = response
            .files
            .into_iter()
            .map(DriveFile::into_remote_file)
            .collect();
        assert_eq!(files[0].name, "A.pdf");
        assert_eq!(
            files[0].modified_time.map(|t| t.to_rfc3339()),
            Some("2024-03-01T10:15:00+00:00".to_string())
        );
        assert_eq!(files[1].modified_time, None);
    }

    #[test]
    fn test_empty_listing() {
        let response: FilesListResponse = serde_json::from_str("{}").unwrap();
        assert!(response.files.is_empty());
        assert!(response.next_page_token.is_none());
    }

    #[test]
    fn test_bad_timestamp_is_dropped() {
        let file = DriveFile {
            id: "1".to_string(),
            name: "A.pdf".to_string(),
            modified_time: Some("yesterday".to_string()),
        };
        assert_eq!(file.into_remote_file().modified_time, None);
    }

    #[test]
    fn test_error_envelope() {
        let json = r#"{"error": {"code": 404, "message": "File not found: x."}}"#;
        let response: ApiErrorResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.error.message, "File not found: x.");
    }
}

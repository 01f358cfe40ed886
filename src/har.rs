//! HAR 1.2 input model
//!
//! Only the fields the capture boundary and the replay driver read are
//! modelled; everything else in a HAR export is ignored. The DevTools
//! network API hands out the same shape for `onRequestFinished` entries.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Root of a `.har` file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HarFile {
    pub log: HarLog,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HarLog {
    #[serde(default)]
    pub pages: Vec<HarPage>,
    #[serde(default)]
    pub entries: Vec<HarEntry>,
}

/// A page (navigation) in the export; `title` usually holds the page URL
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HarPage {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub started_date_time: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HarEntry {
    #[serde(default)]
    pub pageref: Option<String>,
    /// RFC 3339 dispatch time
    pub started_date_time: String,
    /// Total elapsed time in milliseconds
    #[serde(default)]
    pub time: f64,
    pub request: HarRequest,
    #[serde(default)]
    pub response: HarResponse,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HarRequest {
    #[serde(default)]
    pub method: String,
    pub url: String,
    #[serde(default)]
    pub headers: Vec<NameValue>,
    #[serde(default)]
    pub query_string: Vec<NameValue>,
    #[serde(default)]
    pub post_data: Option<PostData>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NameValue {
    pub name: String,
    #[serde(default)]
    pub value: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostData {
    #[serde(default)]
    pub mime_type: String,
    #[serde(default)]
    pub params: Vec<PostParam>,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostParam {
    pub name: String,
    #[serde(default)]
    pub value: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HarResponse {
    #[serde(default)]
    pub status: u16,
    #[serde(default)]
    pub content: HarContent,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HarContent {
    #[serde(default)]
    pub mime_type: String,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub encoding: Option<String>,
}

impl HarFile {
    /// Load and parse a `.har` export
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read HAR file {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse HAR file {}", path.display()))
    }

    /// Look up a page by its id
    pub fn page(&self, id: &str) -> Option<&HarPage> {
        self.log.pages.iter().find(|page| page.id == id)
    }
}

impl HarRequest {
    /// Header value, matching the name case-insensitively
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|h| h.name.eq_ignore_ascii_case(name))
            .map(|h| h.value.as_str())
    }

    pub fn has_query_param(&self, name: &str) -> bool {
        self.query_string.iter().any(|q| q.name == name)
    }

    /// Value of a form parameter in the POST body
    pub fn post_param(&self, name: &str) -> Option<&str> {
        self.post_data
            .as_ref()?
            .params
            .iter()
            .find(|p| p.name == name)?
            .value
            .as_deref()
    }
}

impl HarContent {
    /// Response text, unless the export stored it base64-encoded
    pub fn plain_text(&self) -> Option<&str> {
        match self.encoding.as_deref() {
            Some(encoding) if encoding.eq_ignore_ascii_case("base64") => None,
            _ => self.text.as_deref(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ENTRY: &str = r#"{
        "pageref": "page_1",
        "startedDateTime": "2024-03-01T10:00:00.000Z",
        "time": 42.5,
        "request": {
            "method": "POST",
            "url": "https://acme.my.site.com/s/sfsites/aura?r=3&aura.ApexAction.execute=1",
            "headers": [{"name": "X-SFDC-Request-Id", "value": "abc123"}],
            "queryString": [{"name": "aura.ApexAction.execute", "value": "1"}],
            "postData": {
                "mimeType": "application/x-www-form-urlencoded",
                "params": [{"name": "message", "value": "%7B%7D"}, {"name": "empty"}]
            }
        },
        "response": {"status": 200, "content": {"mimeType": "application/json", "text": "{}"}}
    }"#;

    #[test]
    fn test_parses_devtools_entry() {
        let entry: HarEntry = serde_json::from_str(ENTRY).unwrap();
        assert_eq!(entry.pageref.as_deref(), Some("page_1"));
        assert_eq!(entry.time, 42.5);
        assert_eq!(entry.request.header("x-sfdc-request-id"), Some("abc123"));
        assert!(entry.request.has_query_param("aura.ApexAction.execute"));
        assert_eq!(entry.request.post_param("message"), Some("%7B%7D"));
        assert_eq!(entry.request.post_param("empty"), None);
        assert_eq!(entry.response.content.plain_text(), Some("{}"));
    }

    #[test]
    fn test_missing_optional_sections_default() {
        let entry: HarEntry = serde_json::from_str(
            r#"{"startedDateTime": "2024-03-01T10:00:00Z", "request": {"url": "https://x"}}"#,
        )
        .unwrap();
        assert!(entry.request.post_data.is_none());
        assert_eq!(entry.request.post_param("message"), None);
        assert_eq!(entry.response.content.plain_text(), None);
    }

    #[test]
    fn test_base64_body_is_not_plain_text() {
        let content = HarContent {
            mime_type: "application/json".to_string(),
            text: Some("e30=".to_string()),
            encoding: Some("base64".to_string()),
        };
        assert_eq!(content.plain_text(), None);
    }
}

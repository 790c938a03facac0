//! HAR documents, captured transactions and payload extraction
//!
//! A HAR file is `{"log": {"entries": [...]}}`; each entry is one
//! request/response pair. Response bodies from the ads tooling are JSON,
//! sometimes behind the `for (;;);` anti-hijacking prefix.

use crate::error::PayloadError;
use serde::Deserialize;
use serde_json::Value;

/// Prefix some JSON endpoints prepend to block cross-site script inclusion
pub const ANTI_HIJACK_PREFIX: &str = "for (;;);";

/// Top-level HAR document
///
/// Only `log.entries` is read. A document where it is absent or not a list
/// is valid and empty; only a syntax error fails the file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HarDocument {
    /// Raw entries; each is decoded lazily so one bad entry cannot fail the file
    entries: Vec<Value>,
}

impl HarDocument {
    /// Parse a whole HAR file
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        Ok(Self::from_value(serde_json::from_str(text)?))
    }

    /// Take the entries out of an already-parsed document
    pub fn from_value(mut value: Value) -> Self {
        let entries = match value.pointer_mut("/log/entries").map(Value::take) {
            Some(Value::Array(entries)) => entries,
            _ => Vec::new(),
        };
        Self { entries }
    }

    /// Raw capture entries (empty when the document has none)
    pub fn entries(&self) -> &[Value] {
        &self.entries
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
struct CaptureRequest {
    #[serde(default)]
    url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct CaptureContent {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct CaptureResponse {
    #[serde(default)]
    content: Option<CaptureContent>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct CaptureEntry {
    #[serde(default)]
    request: Option<CaptureRequest>,
    #[serde(default)]
    response: Option<CaptureResponse>,
}

/// One logged request/response pair
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawCapture {
    /// Request URL, possibly carrying an `event_name` query parameter
    pub url: Option<String>,
    /// Response body text (empty when the capture has none)
    pub body: String,
}

impl RawCapture {
    pub fn new(url: Option<&str>, body: impl Into<String>) -> Self {
        Self {
            url: url.map(str::to_string),
            body: body.into(),
        }
    }

    /// Decode one raw HAR entry
    ///
    /// Fails only when a present field has the wrong shape (e.g. a numeric
    /// URL); absent request/response parts are tolerated.
    pub fn from_entry(entry: &Value) -> Result<Self, serde_json::Error> {
        let entry = CaptureEntry::deserialize(entry)?;
        Ok(Self {
            url: entry.request.and_then(|r| r.url),
            body: entry
                .response
                .and_then(|r| r.content)
                .and_then(|c| c.text)
                .unwrap_or_default(),
        })
    }

    /// Parse the response body as JSON
    pub fn payload(&self) -> Result<Value, PayloadError> {
        parse_payload(&self.body)
    }

    /// First non-empty value of a query parameter, percent-decoded
    pub fn query_param(&self, name: &str) -> Option<String> {
        query_param(self.url.as_deref()?, name)
    }
}

/// Remove exactly one leading anti-hijacking prefix, if present
pub fn strip_prefix(text: &str) -> &str {
    text.strip_prefix(ANTI_HIJACK_PREFIX).unwrap_or(text)
}

/// Strip the prefix and parse the remainder as JSON
pub fn parse_payload(text: &str) -> Result<Value, PayloadError> {
    let body = strip_prefix(text);
    if body.trim().is_empty() {
        return Err(PayloadError::Empty);
    }
    Ok(serde_json::from_str(body)?)
}

/// Look up a query parameter on an absolute or relative URL
pub fn query_param(url: &str, name: &str) -> Option<String> {
    let (_, query) = url.split_once('?')?;
    let query = query.split('#').next().unwrap_or_default();
    url::form_urlencoded::parse(query.as_bytes())
        .find(|(key, value)| key == name && !value.is_empty())
        .map(|(_, value)| value.into_owned())
}

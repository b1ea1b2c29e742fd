use std::fmt;

use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::error::ModelResult;

/// Promoted task properties as JSON object text.
///
/// The text is kept verbatim from the parser so that state interpolation can
/// rewrite `$(Title.Property)` references before a provider decodes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawProperties(String);

impl RawProperties {
    /// Wrap already promoted JSON object text.
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Returns the raw JSON text.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume and return the raw JSON text.
    #[inline]
    pub fn into_inner(self) -> String {
        self.0
    }

    /// Decode into a provider-specific settings type.
    pub fn decode<T: DeserializeOwned>(&self) -> ModelResult<T> {
        Ok(serde_json::from_str(&self.0)?)
    }

    /// Returns the property names present in the object.
    pub fn keys(&self) -> ModelResult<Vec<String>> {
        let map: serde_json::Map<String, serde_json::Value> = serde_json::from_str(&self.0)?;
        Ok(map.keys().cloned().collect())
    }
}

impl Default for RawProperties {
    fn default() -> Self {
        Self("{}".to_string())
    }
}

impl fmt::Display for RawProperties {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for RawProperties {
    fn from(raw: String) -> Self {
        Self(raw)
    }
}

impl From<&str> for RawProperties {
    fn from(raw: &str) -> Self {
        Self(raw.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "PascalCase")]
    struct Settings {
        file: String,
        #[serde(default)]
        args: Vec<String>,
    }

    #[test]
    fn default_is_empty_object() {
        let props = RawProperties::default();
        assert_eq!(props.as_str(), "{}");
        assert!(props.keys().unwrap().is_empty());
    }

    #[test]
    fn decode_into_settings() {
        let props = RawProperties::new(r#"{"File":"/bin/echo","Args":["hi","there"]}"#);
        let settings: Settings = props.decode().unwrap();

        assert_eq!(settings.file, "/bin/echo");
        assert_eq!(settings.args, vec!["hi", "there"]);
    }

    #[test]
    fn decode_reports_invalid_json() {
        let props = RawProperties::new("{not json");
        assert!(props.decode::<Settings>().is_err());
    }

    #[test]
    fn serializes_as_plain_string() {
        let props = RawProperties::new(r#"{"A":"1"}"#);
        let json = serde_json::to_string(&props).unwrap();
        assert_eq!(json, r#""{\"A\":\"1\"}""#);

        let back: RawProperties = serde_json::from_str(&json).unwrap();
        assert_eq!(back, props);
    }
}

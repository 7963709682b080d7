//! Service configuration.
//!
//! Plain serde types so the host application can load them from whatever
//! format it already uses. Two configurations are interchangeable when their
//! base paths match ignoring ASCII case; transport settings do not take part
//! in equality.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Absolute URL every endpoint is resolved against.
    pub base_path: String,
    #[serde(default)]
    pub transport: TransportSettings,
}

/// Knobs passed through to the transport.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransportSettings {
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    #[serde(default)]
    pub user_agent: Option<String>,
}

impl ServiceConfig {
    pub fn new(base_path: impl Into<String>) -> Self {
        Self {
            base_path: base_path.into(),
            transport: TransportSettings::default(),
        }
    }

    pub fn with_transport(mut self, transport: TransportSettings) -> Self {
        self.transport = transport;
        self
    }

    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    /// Join `endpoint` onto the base path with exactly one `/` between them.
    pub fn resolve(&self, endpoint: &str) -> String {
        let base = self.base_path.trim_end_matches('/');
        let endpoint = endpoint.trim_start_matches('/');
        if endpoint.is_empty() {
            return base.to_string();
        }
        format!("{base}/{endpoint}")
    }
}

impl PartialEq for ServiceConfig {
    fn eq(&self, other: &Self) -> bool {
        self.base_path.eq_ignore_ascii_case(&other.base_path)
    }
}

impl Eq for ServiceConfig {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equality_ignores_case_and_settings() {
        let a = ServiceConfig::new("http://LOCALHOST:3000/api");
        let b = ServiceConfig::new("http://localhost:3000/API").with_transport(TransportSettings {
            timeout_secs: Some(5),
            user_agent: None,
        });
        assert_eq!(a, b);
        assert_ne!(a, ServiceConfig::new("http://localhost:3001/api"));
    }

    #[test]
    fn resolve_joins_with_single_slash() {
        let config = ServiceConfig::new("http://localhost:3000/");
        assert_eq!(config.resolve("/posts"), "http://localhost:3000/posts");
        assert_eq!(config.resolve("posts/1"), "http://localhost:3000/posts/1");
        assert_eq!(config.resolve(""), "http://localhost:3000");
    }

    #[test]
    fn loads_from_json_with_defaults() {
        let config = ServiceConfig::from_json(r#"{"base_path":"http://localhost:3000"}"#).unwrap();
        assert_eq!(config.base_path, "http://localhost:3000");
        assert_eq!(config.transport, TransportSettings::default());

        let config = ServiceConfig::from_json(
            r#"{"base_path":"http://h","transport":{"timeout_secs":10,"user_agent":"fetch/1"}}"#,
        )
        .unwrap();
        assert_eq!(config.transport.timeout_secs, Some(10));
        assert_eq!(config.transport.user_agent.as_deref(), Some("fetch/1"));
    }
}

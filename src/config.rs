use std::{path::Path, time::Duration};

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Options of an [`crate::InteractionClient`].
///
/// The defaults wait without limit and keep every command status until the handle is
/// cleared again.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Give up waiting for a response after this many milliseconds.
    pub wait_timeout_ms: Option<u64>,
    /// Release a command handle's status once its result has been returned.
    pub release_on_consume: bool,
}

impl ClientConfig {
    pub fn with_wait_timeout(mut self, timeout: Duration) -> Self {
        self.wait_timeout_ms = Some(timeout.as_millis().try_into().unwrap_or(u64::MAX));
        self
    }

    pub fn with_release_on_consume(mut self, release: bool) -> Self {
        self.release_on_consume = release;
        self
    }

    pub fn wait_timeout(&self) -> Option<Duration> {
        self.wait_timeout_ms.map(Duration::from_millis)
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        Ok(serde_json::from_reader(std::io::BufReader::new(file))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::from_json_str("{}").unwrap();
        assert_eq!(config, ClientConfig::default());
        assert_eq!(config.wait_timeout(), None);
        assert!(!config.release_on_consume);
    }

    #[test]
    fn test_from_json() {
        let config =
            ClientConfig::from_json_str(r#"{"wait_timeout_ms": 1500, "release_on_consume": true}"#)
                .unwrap();
        assert_eq!(config.wait_timeout(), Some(Duration::from_millis(1500)));
        assert!(config.release_on_consume);
        assert_eq!(
            config,
            ClientConfig::default()
                .with_wait_timeout(Duration::from_millis(1500))
                .with_release_on_consume(true)
        );
    }

    #[test]
    fn test_invalid_config() {
        let err = ClientConfig::from_json_str(r#"{"wait_timeout_ms": "soon"}"#).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        let err = ClientConfig::from_json_file("/nonexistent/client.json").unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }
}

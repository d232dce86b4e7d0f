use crate::prelude::error::Error;
use std::time::Duration;

pub const DEFAULT_ENDPOINT: &str = "https://pubsub.googleapis.com";

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub project_id: String,
    pub endpoint: String,
    pub access_token: Option<String>,
    pub request_timeout: Duration,
}

impl ClientConfig {
    pub fn new(project_id: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            access_token: None,
            request_timeout: Duration::from_secs(60),
        }
    }

    /// Loads `.env` if present, then reads the process environment.
    pub fn from_env() -> Result<Self, Error> {
        dotenv::dotenv().ok();
        Self::from_vars(|key| std::env::var(key).ok())
    }

    pub fn from_vars<F>(lookup: F) -> Result<Self, Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.is_empty());

        let project_id = var("GCP_PROJECT_ID")
            .ok_or_else(|| Error::Config("GCP_PROJECT_ID is not set".into()))?;
        let mut config = Self::new(project_id);

        // The emulator speaks plain HTTP and ignores credentials.
        if let Some(host) = var("PUBSUB_EMULATOR_HOST") {
            config.endpoint = format!("http://{}", host);
            return Ok(config);
        }

        if let Some(endpoint) = var("PUBSUB_ENDPOINT") {
            config.endpoint = endpoint.trim_end_matches('/').to_string();
        }
        config.access_token = var("GOOGLE_OAUTH_ACCESS_TOKEN");

        Ok(config)
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

/// Identifiers the publish and pull samples operate on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleConfig {
    pub project_id: String,
    pub topic_id: String,
    pub subscription_id: String,
}

impl SampleConfig {
    pub fn from_env() -> Result<Self, Error> {
        dotenv::dotenv().ok();
        Self::from_vars(|key| std::env::var(key).ok())
    }

    pub fn from_vars<F>(lookup: F) -> Result<Self, Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let require = |key: &str| {
            lookup(key)
                .filter(|v| !v.is_empty())
                .ok_or_else(|| Error::Config(format!("{} is not set", key)))
        };

        Ok(Self {
            project_id: require("GCP_PROJECT_ID")?,
            topic_id: require("GCP_TOPIC_ID")?,
            subscription_id: require("GCP_SUBSCRIPTION_ID")?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct ReceiveSettings {
    /// Upper bound on messages requested per pull call
    pub max_messages: i32,
    /// Pause between pull calls that returned nothing
    pub poll_interval: Duration,
    /// Capacity of the channel between the puller and the consumer loop
    pub buffer: usize,
}

impl Default for ReceiveSettings {
    fn default() -> Self {
        Self {
            max_messages: 100,
            poll_interval: Duration::from_millis(100),
            buffer: 1000,
        }
    }
}

impl ReceiveSettings {
    pub fn with_max_messages(mut self, max_messages: i32) -> Self {
        self.max_messages = max_messages.max(1);
        self
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn with_buffer(mut self, buffer: usize) -> Self {
        self.buffer = buffer.max(1);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_client_config_defaults() {
        let config = ClientConfig::from_vars(vars(&[("GCP_PROJECT_ID", "my-project")])).unwrap();
        assert_eq!(config.project_id, "my-project");
        assert_eq!(config.endpoint, DEFAULT_ENDPOINT);
        assert!(config.access_token.is_none());
        assert_eq!(config.request_timeout, Duration::from_secs(60));
    }

    #[test]
    fn test_client_config_emulator() {
        let config = ClientConfig::from_vars(vars(&[
            ("GCP_PROJECT_ID", "my-project"),
            ("PUBSUB_EMULATOR_HOST", "localhost:8085"),
            ("GOOGLE_OAUTH_ACCESS_TOKEN", "ignored"),
        ]))
        .unwrap();
        assert_eq!(config.endpoint, "http://localhost:8085");
        assert!(config.access_token.is_none());
    }

    #[test]
    fn test_client_config_token_and_endpoint() {
        let config = ClientConfig::from_vars(vars(&[
            ("GCP_PROJECT_ID", "my-project"),
            ("PUBSUB_ENDPOINT", "https://europe-west1-pubsub.googleapis.com/"),
            ("GOOGLE_OAUTH_ACCESS_TOKEN", "ya29.token"),
        ]))
        .unwrap();
        assert_eq!(config.endpoint, "https://europe-west1-pubsub.googleapis.com");
        assert_eq!(config.access_token.as_deref(), Some("ya29.token"));
    }

    #[test]
    fn test_client_config_requires_project() {
        let result = ClientConfig::from_vars(vars(&[("GCP_PROJECT_ID", "")]));
        assert_matches!(result, Err(Error::Config(_)));
    }

    #[test]
    fn test_sample_config_missing_subscription() {
        let result = SampleConfig::from_vars(vars(&[
            ("GCP_PROJECT_ID", "my-project"),
            ("GCP_TOPIC_ID", "my-topic"),
        ]));
        assert_matches!(result, Err(Error::Config(msg)) if msg.contains("GCP_SUBSCRIPTION_ID"));
    }

    #[test]
    fn test_receive_settings_builder() {
        let settings = ReceiveSettings::default()
            .with_max_messages(0)
            .with_poll_interval(Duration::from_millis(5))
            .with_buffer(16);

        assert_eq!(settings.max_messages, 1);
        assert_eq!(settings.poll_interval, Duration::from_millis(5));
        assert_eq!(settings.buffer, 16);
    }
}

use chrono::{DateTime, Utc};
use derive_more::Display;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Fully qualified resource name, e.g. `projects/my-project/topics/my-topic`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Display)]
#[display("projects/{project}/{collection}/{id}")]
pub struct ResourceName {
    pub project: String,
    pub collection: &'static str,
    pub id: String,
}

impl ResourceName {
    pub fn topic(project: &str, id: &str) -> Self {
        Self {
            project: project.to_string(),
            collection: "topics",
            id: id.to_string(),
        }
    }

    pub fn subscription(project: &str, id: &str) -> Self {
        Self {
            project: project.to_string(),
            collection: "subscriptions",
            id: id.to_string(),
        }
    }
}

/// A message as submitted by a publisher. It carries no identifier until the
/// service has accepted it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutgoingMessage {
    #[serde(with = "base64_data")]
    pub data: Vec<u8>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub attributes: HashMap<String, String>,
}

impl OutgoingMessage {
    pub fn new(data: impl Into<Vec<u8>>) -> Self {
        Self {
            data: data.into(),
            attributes: HashMap::new(),
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }
}

/// A message the service has accepted and assigned an id to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    #[serde(default, with = "base64_data")]
    pub data: Vec<u8>,
    #[serde(default)]
    pub attributes: HashMap<String, String>,
    pub message_id: String,
    #[serde(default)]
    pub publish_time: Option<DateTime<Utc>>,
}

impl Message {
    pub fn data_lossy(&self) -> String {
        String::from_utf8_lossy(&self.data).into_owned()
    }
}

/// One delivery of a message on a subscription. Redeliveries of the same
/// message share `message.message_id` but get a fresh `ack_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceivedMessage {
    pub ack_id: String,
    pub message: Message,
    #[serde(default)]
    pub delivery_attempt: Option<i32>,
}

#[derive(Debug, Serialize)]
pub(crate) struct PublishRequest<'a> {
    pub messages: &'a [OutgoingMessage],
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PublishResponse {
    #[serde(default)]
    pub message_ids: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PullRequest {
    pub max_messages: i32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PullResponse {
    #[serde(default)]
    pub received_messages: Vec<ReceivedMessage>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AcknowledgeRequest<'a> {
    pub ack_ids: &'a [String],
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ModifyAckDeadlineRequest<'a> {
    pub ack_ids: &'a [String],
    pub ack_deadline_seconds: i32,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorEnvelope {
    pub error: ErrorBody,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub code: u16,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub status: String,
}

mod base64_data {
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(data: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(data))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(encoded.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}

mod memory;
mod rest;

pub use memory::InMemoryTransport;
pub use rest::RestTransport;

use crate::prelude::{
    config::ClientConfig,
    error::Error,
    models::{OutgoingMessage, ReceivedMessage, ResourceName},
    subscriber::Subscription,
    topic::Topic,
};
use async_trait::async_trait;
use std::sync::Arc;

/// Wire-level access to the pub/sub service. Every call is a single attempt.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Returns one message id per submitted message, in order.
    async fn publish(
        &self,
        topic: &ResourceName,
        messages: &[OutgoingMessage],
    ) -> Result<Vec<String>, Error>;

    /// May return an empty batch when nothing is available.
    async fn pull(
        &self,
        subscription: &ResourceName,
        max_messages: i32,
    ) -> Result<Vec<ReceivedMessage>, Error>;

    async fn acknowledge(&self, subscription: &ResourceName, ack_ids: &[String])
        -> Result<(), Error>;

    /// Resets the ack deadline of pulled messages. Zero seconds hands them
    /// back to the service for immediate redelivery.
    async fn modify_ack_deadline(
        &self,
        subscription: &ResourceName,
        ack_ids: &[String],
        ack_deadline_seconds: i32,
    ) -> Result<(), Error>;
}

/// Project-scoped connection handle. Clones share the same transport.
#[derive(Clone)]
pub struct PubSubClient {
    project_id: Arc<str>,
    transport: Arc<dyn Transport>,
}

impl PubSubClient {
    pub fn new(config: ClientConfig) -> Result<Self, Error> {
        let transport = RestTransport::new(&config)?;
        Ok(Self::with_transport(config.project_id, Arc::new(transport)))
    }

    pub fn from_env() -> Result<Self, Error> {
        Self::new(ClientConfig::from_env()?)
    }

    pub fn with_transport(project_id: impl Into<String>, transport: Arc<dyn Transport>) -> Self {
        Self {
            project_id: Arc::from(project_id.into()),
            transport,
        }
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    pub fn topic(&self, topic_id: &str) -> Topic {
        Topic::new(self.clone(), ResourceName::topic(&self.project_id, topic_id))
    }

    pub fn subscription(&self, subscription_id: &str) -> Subscription {
        Subscription::new(
            self.clone(),
            ResourceName::subscription(&self.project_id, subscription_id),
        )
    }

    pub(crate) fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }
}

impl std::fmt::Debug for PubSubClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PubSubClient")
            .field("project_id", &self.project_id)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handles_are_project_scoped() {
        let client =
            PubSubClient::with_transport("my-project", Arc::new(InMemoryTransport::new()));

        assert_eq!(client.project_id(), "my-project");
        assert_eq!(
            client.topic("my-topic").name().to_string(),
            "projects/my-project/topics/my-topic"
        );
        assert_eq!(
            client.subscription("my-sub").name().to_string(),
            "projects/my-project/subscriptions/my-sub"
        );
    }

    #[test]
    fn test_clones_share_transport() {
        let client =
            PubSubClient::with_transport("my-project", Arc::new(InMemoryTransport::new()));
        let other = client.clone();
        assert!(Arc::ptr_eq(client.transport(), other.transport()));
    }
}

use crate::client::PubSubClient;
use crate::prelude::{
    error::Error,
    models::{OutgoingMessage, ResourceName},
};
use tracing::debug;

/// Named handle on a topic. Cheap to clone; it shares the client's
/// transport.
#[derive(Clone)]
pub struct Topic {
    client: PubSubClient,
    name: ResourceName,
}

impl Topic {
    pub(crate) fn new(client: PubSubClient, name: ResourceName) -> Self {
        Self { client, name }
    }

    pub fn id(&self) -> &str {
        &self.name.id
    }

    pub fn name(&self) -> &ResourceName {
        &self.name
    }

    /// Submits one message and waits for the service to acknowledge it.
    ///
    /// Returns the id the service assigned. A single attempt is made; the
    /// caller owns any retry policy.
    pub async fn publish(&self, payload: impl Into<Vec<u8>>) -> Result<String, Error> {
        self.publish_message(OutgoingMessage::new(payload)).await
    }

    pub async fn publish_message(&self, message: OutgoingMessage) -> Result<String, Error> {
        if message.data.is_empty() {
            return Err(Error::InvalidMessage(format!(
                "refusing to publish an empty payload to {}",
                self.name
            )));
        }

        debug!(
            "Publishing {} bytes to topic {}",
            message.data.len(),
            self.name
        );

        let ids = self
            .client
            .transport()
            .publish(&self.name, std::slice::from_ref(&message))
            .await?;

        match ids.into_iter().next() {
            Some(id) if !id.is_empty() => Ok(id),
            _ => Err(Error::Internal(format!(
                "service accepted a message on {} without assigning an id",
                self.name
            ))),
        }
    }
}

impl std::fmt::Debug for Topic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Topic").field("name", &self.name).finish()
    }
}

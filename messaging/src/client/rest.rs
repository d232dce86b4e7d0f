use crate::client::Transport;
use crate::prelude::{
    config::ClientConfig,
    error::Error,
    models::{
        AcknowledgeRequest, ErrorEnvelope, ModifyAckDeadlineRequest, OutgoingMessage,
        PublishRequest, PublishResponse, PullRequest, PullResponse, ReceivedMessage, ResourceName,
    },
};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{de::DeserializeOwned, de::IgnoredAny, Serialize};
use tracing::debug;

/// Talks to the Pub/Sub v1 REST API (or an emulator) over HTTP.
pub struct RestTransport {
    endpoint: String,
    access_token: Option<String>,
    client: Client,
}

impl RestTransport {
    pub fn new(config: &ClientConfig) -> Result<Self, Error> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| Error::Config(format!("failed to build http client: {}", e)))?;

        Ok(Self {
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            access_token: config.access_token.clone(),
            client,
        })
    }

    fn url(&self, name: &ResourceName, method: &str) -> String {
        format!("{}/v1/{}:{}", self.endpoint, name, method)
    }

    async fn call<B, R>(&self, name: &ResourceName, method: &str, body: &B) -> Result<R, Error>
    where
        B: Serialize + ?Sized + Sync,
        R: DeserializeOwned,
    {
        let url = self.url(name, method);
        debug!("POST {}", url);

        let mut request = self.client.post(&url).json(body);
        if let Some(token) = &self.access_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        let body = response.bytes().await?;

        if !status.is_success() {
            return Err(service_error(name, status, &body));
        }

        // acknowledge answers with `{}`, some emulators with nothing at all
        let body: &[u8] = if body.is_empty() { b"{}" } else { &body };
        Ok(serde_json::from_slice(body)?)
    }
}

fn service_error(name: &ResourceName, status: StatusCode, body: &[u8]) -> Error {
    let (code, status_text, message) = match serde_json::from_slice::<ErrorEnvelope>(body) {
        Ok(envelope) => (
            if envelope.error.code == 0 {
                status.as_u16()
            } else {
                envelope.error.code
            },
            envelope.error.status,
            envelope.error.message,
        ),
        Err(_) => (
            status.as_u16(),
            status.canonical_reason().unwrap_or_default().to_string(),
            String::from_utf8_lossy(body).into_owned(),
        ),
    };

    if code == StatusCode::NOT_FOUND.as_u16() {
        return Error::NotFound(format!("{}: {}", name, message));
    }

    Error::Api {
        code,
        status: status_text,
        message,
    }
}

#[async_trait]
impl Transport for RestTransport {
    async fn publish(
        &self,
        topic: &ResourceName,
        messages: &[OutgoingMessage],
    ) -> Result<Vec<String>, Error> {
        let response: PublishResponse = self
            .call(topic, "publish", &PublishRequest { messages })
            .await?;
        Ok(response.message_ids)
    }

    async fn pull(
        &self,
        subscription: &ResourceName,
        max_messages: i32,
    ) -> Result<Vec<ReceivedMessage>, Error> {
        let response: Result<PullResponse, Error> = self
            .call(subscription, "pull", &PullRequest { max_messages })
            .await;
        match response {
            Ok(response) => Ok(response.received_messages),
            // A long poll on an idle subscription can outlive the client timeout.
            // Anything the service did hand out is redelivered after its ack deadline.
            Err(Error::Timeout) => {
                debug!("Pull on {} timed out, treating as empty", subscription);
                Ok(Vec::new())
            }
            Err(err) => Err(err),
        }
    }

    async fn acknowledge(
        &self,
        subscription: &ResourceName,
        ack_ids: &[String],
    ) -> Result<(), Error> {
        let _: IgnoredAny = self
            .call(subscription, "acknowledge", &AcknowledgeRequest { ack_ids })
            .await?;
        Ok(())
    }

    async fn modify_ack_deadline(
        &self,
        subscription: &ResourceName,
        ack_ids: &[String],
        ack_deadline_seconds: i32,
    ) -> Result<(), Error> {
        let request = ModifyAckDeadlineRequest {
            ack_ids,
            ack_deadline_seconds,
        };
        let _: IgnoredAny = self
            .call(subscription, "modifyAckDeadline", &request)
            .await?;
        Ok(())
    }
}

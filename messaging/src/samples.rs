//! The two sample flows: publish one message, and pull a subscription for a
//! fixed window. They share nothing but the client handle.

use crate::client::PubSubClient;
use crate::prelude::error::Error;
use std::time::Duration;
use tracing::info;

/// How long [`pull_msgs`] keeps receiving.
pub const PULL_WINDOW: Duration = Duration::from_secs(10);

/// Publishes `msg` to `topic_id` and returns the id the service assigned.
pub async fn publish(client: &PubSubClient, topic_id: &str, msg: &str) -> Result<String, Error> {
    let id = client.topic(topic_id).publish(msg).await?;
    info!("Published a message; msg ID: {}", id);
    Ok(id)
}

/// Receives from `sub_id` for [`PULL_WINDOW`], acknowledging every message.
pub async fn pull_msgs(client: &PubSubClient, sub_id: &str) -> Result<usize, Error> {
    pull_msgs_for(client, sub_id, PULL_WINDOW).await
}

pub async fn pull_msgs_for(
    client: &PubSubClient,
    sub_id: &str,
    window: Duration,
) -> Result<usize, Error> {
    let received = client
        .subscription(sub_id)
        .receive(window, |msg| {
            info!("Got message: {:?}", msg.data_lossy());
        })
        .await?;
    info!("Received {} messages.", received);
    Ok(received)
}

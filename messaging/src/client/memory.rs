use crate::client::Transport;
use crate::prelude::{
    error::Error,
    models::{Message, OutgoingMessage, ReceivedMessage, ResourceName},
};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::{HashMap, VecDeque};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

/// Ack deadline the hosted service applies when a subscription sets none.
pub const DEFAULT_ACK_DEADLINE: Duration = Duration::from_secs(10);

struct Delivery {
    message: Message,
    attempts: i32,
}

struct Outstanding {
    delivery: Delivery,
    expires: Instant,
}

#[derive(Default)]
struct SubscriptionState {
    pending: VecDeque<Delivery>,
    outstanding: HashMap<String, Outstanding>,
}

impl SubscriptionState {
    fn expire(&mut self, now: Instant) {
        let expired: Vec<String> = self
            .outstanding
            .iter()
            .filter(|(_, o)| o.expires <= now)
            .map(|(ack_id, _)| ack_id.clone())
            .collect();
        for ack_id in expired {
            if let Some(o) = self.outstanding.remove(&ack_id) {
                self.pending.push_front(o.delivery);
            }
        }
    }
}

#[derive(Default)]
struct Broker {
    next_message_id: u64,
    // topic -> attached subscriptions
    topics: HashMap<ResourceName, Vec<ResourceName>>,
    subscriptions: HashMap<ResourceName, SubscriptionState>,
}

/// A process-local broker with the same contract as the hosted service:
/// topics fan out to subscriptions, pulled messages stay outstanding until
/// acknowledged, and go back to the queue once their ack deadline passes.
pub struct InMemoryTransport {
    broker: Mutex<Broker>,
    ack_deadline: Duration,
}

impl Default for InMemoryTransport {
    fn default() -> Self {
        Self {
            broker: Mutex::new(Broker::default()),
            ack_deadline: DEFAULT_ACK_DEADLINE,
        }
    }
}

impl InMemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ack_deadline(mut self, ack_deadline: Duration) -> Self {
        self.ack_deadline = ack_deadline;
        self
    }

    pub async fn create_topic(&self, topic: ResourceName) {
        let mut broker = self.broker.lock().await;
        debug!("Creating topic {}", topic);
        broker.topics.entry(topic).or_default();
    }

    /// Messages published before the subscription existed are not delivered to it.
    pub async fn create_subscription(
        &self,
        subscription: ResourceName,
        topic: &ResourceName,
    ) -> Result<(), Error> {
        let mut broker = self.broker.lock().await;
        let attached = broker
            .topics
            .get_mut(topic)
            .ok_or_else(|| Error::NotFound(topic.to_string()))?;
        if !attached.contains(&subscription) {
            attached.push(subscription.clone());
        }
        debug!("Creating subscription {} on {}", subscription, topic);
        broker.subscriptions.entry(subscription).or_default();
        Ok(())
    }

    /// Puts every pulled but unacknowledged message back in the queue, as the
    /// service does when an ack deadline expires.
    pub async fn redeliver_unacked(&self, subscription: &ResourceName) -> Result<usize, Error> {
        let mut broker = self.broker.lock().await;
        let state = broker
            .subscriptions
            .get_mut(subscription)
            .ok_or_else(|| Error::NotFound(subscription.to_string()))?;

        let expired: Vec<Outstanding> = state.outstanding.drain().map(|(_, o)| o).collect();
        let count = expired.len();
        for o in expired {
            state.pending.push_front(o.delivery);
        }
        Ok(count)
    }

    pub async fn backlog(&self, subscription: &ResourceName) -> Option<usize> {
        let broker = self.broker.lock().await;
        broker.subscriptions.get(subscription).map(|s| s.pending.len())
    }

    pub async fn unacked(&self, subscription: &ResourceName) -> Option<usize> {
        let broker = self.broker.lock().await;
        broker
            .subscriptions
            .get(subscription)
            .map(|s| s.outstanding.len())
    }
}

#[async_trait]
impl Transport for InMemoryTransport {
    async fn publish(
        &self,
        topic: &ResourceName,
        messages: &[OutgoingMessage],
    ) -> Result<Vec<String>, Error> {
        let mut broker = self.broker.lock().await;
        let attached = broker
            .topics
            .get(topic)
            .cloned()
            .ok_or_else(|| Error::NotFound(topic.to_string()))?;

        let mut ids = Vec::with_capacity(messages.len());
        for outgoing in messages {
            broker.next_message_id += 1;
            let message = Message {
                data: outgoing.data.clone(),
                attributes: outgoing.attributes.clone(),
                message_id: broker.next_message_id.to_string(),
                publish_time: Some(Utc::now()),
            };

            for subscription in &attached {
                if let Some(state) = broker.subscriptions.get_mut(subscription) {
                    state.pending.push_back(Delivery {
                        message: message.clone(),
                        attempts: 0,
                    });
                }
            }
            ids.push(message.message_id);
        }

        Ok(ids)
    }

    async fn pull(
        &self,
        subscription: &ResourceName,
        max_messages: i32,
    ) -> Result<Vec<ReceivedMessage>, Error> {
        let mut broker = self.broker.lock().await;
        let state = broker
            .subscriptions
            .get_mut(subscription)
            .ok_or_else(|| Error::NotFound(subscription.to_string()))?;

        let now = Instant::now();
        state.expire(now);

        let take = (max_messages.max(1) as usize).min(state.pending.len());
        let mut batch = Vec::with_capacity(take);
        for mut delivery in state.pending.drain(..take).collect::<Vec<_>>() {
            delivery.attempts += 1;
            let ack_id = uuid::Uuid::new_v4().to_string();
            batch.push(ReceivedMessage {
                ack_id: ack_id.clone(),
                message: delivery.message.clone(),
                delivery_attempt: Some(delivery.attempts),
            });
            state.outstanding.insert(
                ack_id,
                Outstanding {
                    delivery,
                    expires: now + self.ack_deadline,
                },
            );
        }

        Ok(batch)
    }

    async fn acknowledge(
        &self,
        subscription: &ResourceName,
        ack_ids: &[String],
    ) -> Result<(), Error> {
        let mut broker = self.broker.lock().await;
        let state = broker
            .subscriptions
            .get_mut(subscription)
            .ok_or_else(|| Error::NotFound(subscription.to_string()))?;

        // Stale ack ids are ignored, matching the hosted service.
        for ack_id in ack_ids {
            state.outstanding.remove(ack_id);
        }
        Ok(())
    }

    async fn modify_ack_deadline(
        &self,
        subscription: &ResourceName,
        ack_ids: &[String],
        ack_deadline_seconds: i32,
    ) -> Result<(), Error> {
        let mut broker = self.broker.lock().await;
        let state = broker
            .subscriptions
            .get_mut(subscription)
            .ok_or_else(|| Error::NotFound(subscription.to_string()))?;

        if ack_deadline_seconds <= 0 {
            // walk backwards so the released messages keep their order at the head
            for ack_id in ack_ids.iter().rev() {
                if let Some(o) = state.outstanding.remove(ack_id) {
                    state.pending.push_front(o.delivery);
                }
            }
            return Ok(());
        }

        let expires = Instant::now() + Duration::from_secs(ack_deadline_seconds as u64);
        for ack_id in ack_ids {
            if let Some(o) = state.outstanding.get_mut(ack_id) {
                o.expires = expires;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    async fn broker_with_subscription() -> (InMemoryTransport, ResourceName, ResourceName) {
        let transport = InMemoryTransport::new();
        let topic = ResourceName::topic("p", "t");
        let subscription = ResourceName::subscription("p", "s");
        transport.create_topic(topic.clone()).await;
        transport
            .create_subscription(subscription.clone(), &topic)
            .await
            .unwrap();
        (transport, topic, subscription)
    }

    #[tokio::test]
    async fn test_publish_assigns_distinct_ids() {
        let (transport, topic, subscription) = broker_with_subscription().await;

        let ids = transport
            .publish(&topic, &[OutgoingMessage::new("a"), OutgoingMessage::new("b")])
            .await
            .unwrap();

        assert_eq!(ids.len(), 2);
        assert_ne!(ids[0], ids[1]);
        assert_eq!(transport.backlog(&subscription).await, Some(2));
    }

    #[tokio::test]
    async fn test_publish_to_unknown_topic() {
        let transport = InMemoryTransport::new();
        let result = transport
            .publish(&ResourceName::topic("p", "missing"), &[OutgoingMessage::new("a")])
            .await;
        assert_matches!(result, Err(Error::NotFound(_)));
    }

    #[tokio::test]
    async fn test_subscription_requires_topic() {
        let transport = InMemoryTransport::new();
        let result = transport
            .create_subscription(
                ResourceName::subscription("p", "s"),
                &ResourceName::topic("p", "missing"),
            )
            .await;
        assert_matches!(result, Err(Error::NotFound(_)));
    }

    #[tokio::test]
    async fn test_pull_then_ack() {
        let (transport, topic, subscription) = broker_with_subscription().await;
        transport
            .publish(&topic, &[OutgoingMessage::new("a"), OutgoingMessage::new("b")])
            .await
            .unwrap();

        let batch = transport.pull(&subscription, 1).await.unwrap();
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].message.data, b"a".to_vec());
        assert_eq!(batch[0].delivery_attempt, Some(1));
        assert_eq!(transport.unacked(&subscription).await, Some(1));

        transport
            .acknowledge(&subscription, &[batch[0].ack_id.clone(), "stale".to_string()])
            .await
            .unwrap();
        assert_eq!(transport.unacked(&subscription).await, Some(0));
        assert_eq!(transport.backlog(&subscription).await, Some(1));
    }

    #[tokio::test]
    async fn test_redelivery_keeps_message_id() {
        let (transport, topic, subscription) = broker_with_subscription().await;
        transport
            .publish(&topic, &[OutgoingMessage::new("a")])
            .await
            .unwrap();

        let first = transport.pull(&subscription, 10).await.unwrap();
        assert_eq!(transport.redeliver_unacked(&subscription).await.unwrap(), 1);
        let second = transport.pull(&subscription, 10).await.unwrap();

        assert_eq!(first[0].message.message_id, second[0].message.message_id);
        assert_ne!(first[0].ack_id, second[0].ack_id);
        assert_eq!(second[0].delivery_attempt, Some(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unacked_messages_return_after_ack_deadline() {
        let (transport, topic, subscription) = broker_with_subscription().await;
        transport
            .publish(&topic, &[OutgoingMessage::new("a")])
            .await
            .unwrap();

        let first = transport.pull(&subscription, 10).await.unwrap();
        assert_eq!(first.len(), 1);
        assert!(transport.pull(&subscription, 10).await.unwrap().is_empty());

        tokio::time::sleep(DEFAULT_ACK_DEADLINE).await;
        let second = transport.pull(&subscription, 10).await.unwrap();
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].message.message_id, first[0].message.message_id);
        assert_eq!(second[0].delivery_attempt, Some(2));
    }

    #[tokio::test]
    async fn test_zero_ack_deadline_releases_in_order() {
        let (transport, topic, subscription) = broker_with_subscription().await;
        transport
            .publish(
                &topic,
                &[OutgoingMessage::new("a"), OutgoingMessage::new("b"), OutgoingMessage::new("c")],
            )
            .await
            .unwrap();

        let batch = transport.pull(&subscription, 2).await.unwrap();
        let ack_ids: Vec<String> = batch.iter().map(|d| d.ack_id.clone()).collect();
        transport
            .modify_ack_deadline(&subscription, &ack_ids, 0)
            .await
            .unwrap();

        assert_eq!(transport.unacked(&subscription).await, Some(0));
        let again = transport.pull(&subscription, 10).await.unwrap();
        let data: Vec<Vec<u8>> = again.into_iter().map(|d| d.message.data).collect();
        assert_eq!(data, vec![b"a".to_vec(), b"b".to_vec(), b"c".to_vec()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_extended_ack_deadline_holds_message() {
        let (transport, topic, subscription) = broker_with_subscription().await;
        transport
            .publish(&topic, &[OutgoingMessage::new("a")])
            .await
            .unwrap();

        let batch = transport.pull(&subscription, 1).await.unwrap();
        transport
            .modify_ack_deadline(&subscription, &[batch[0].ack_id.clone()], 60)
            .await
            .unwrap();

        tokio::time::sleep(DEFAULT_ACK_DEADLINE * 2).await;
        assert!(transport.pull(&subscription, 10).await.unwrap().is_empty());
        assert_eq!(transport.unacked(&subscription).await, Some(1));
    }

    #[tokio::test]
    async fn test_fan_out_to_every_subscription() {
        let (transport, topic, subscription) = broker_with_subscription().await;
        let other = ResourceName::subscription("p", "other");
        transport
            .create_subscription(other.clone(), &topic)
            .await
            .unwrap();

        transport
            .publish(&topic, &[OutgoingMessage::new("a")])
            .await
            .unwrap();

        assert_eq!(transport.backlog(&subscription).await, Some(1));
        assert_eq!(transport.backlog(&other).await, Some(1));
    }
}

use crate::client::{PubSubClient, Transport};
use crate::prelude::{
    config::ReceiveSettings,
    error::Error,
    models::{Message, ReceivedMessage, ResourceName},
};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{sleep, sleep_until, Instant};
use tracing::{debug, warn};

/// Named handle on a subscription.
#[derive(Clone)]
pub struct Subscription {
    client: PubSubClient,
    name: ResourceName,
    settings: ReceiveSettings,
}

impl Subscription {
    pub(crate) fn new(client: PubSubClient, name: ResourceName) -> Self {
        Self {
            client,
            name,
            settings: ReceiveSettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: ReceiveSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn id(&self) -> &str {
        &self.name.id
    }

    pub fn name(&self) -> &ResourceName {
        &self.name
    }

    pub fn settings(&self) -> &ReceiveSettings {
        &self.settings
    }

    /// Receives messages for `window`, handing each one to `handler` and
    /// acknowledging it, then returns how many distinct messages arrived.
    ///
    /// A background task pulls from the service and feeds a channel; this
    /// loop is the only consumer, so the handler never runs concurrently.
    /// Acknowledgments go out from a second task and never hold the loop
    /// past the deadline. A message redelivered within the window is
    /// acknowledged again but neither counted nor handed over twice.
    ///
    /// Messages pulled but not yet handed over when the window closes are
    /// released back to the service for redelivery.
    ///
    /// If a pull fails the window ends early with [`Error::Receive`] and the
    /// count gathered so far is dropped.
    pub async fn receive<F>(&self, window: Duration, mut handler: F) -> Result<usize, Error>
    where
        F: FnMut(&Message),
    {
        let deadline = Instant::now() + window;
        let transport = self.client.transport().clone();
        let (tx, mut rx) = mpsc::channel(self.settings.buffer);
        let (ack_tx, ack_rx) = mpsc::unbounded_channel();
        spawn_dispatcher(
            transport.clone(),
            self.name.clone(),
            self.settings.clone(),
            tx,
        );
        spawn_acker(transport.clone(), self.name.clone(), ack_rx);

        let mut received = 0usize;
        let mut seen = HashSet::new();

        let outcome = loop {
            let next = tokio::select! {
                _ = sleep_until(deadline) => break Ok(received),
                next = rx.recv() => next,
            };

            match next {
                Some(Ok(delivery)) => {
                    if seen.insert(delivery.message.message_id.clone()) {
                        handler(&delivery.message);
                        received += 1;
                    } else {
                        debug!(
                            "Message {} redelivered on {}",
                            delivery.message.message_id, self.name
                        );
                    }
                    // acks leave on their own task so a slow one cannot hold the window open
                    let _ = ack_tx.send(delivery.ack_id);
                }
                Some(Err(err)) => {
                    warn!(
                        "Receive on {} aborted, discarding {} received messages: {}",
                        self.name, received, err
                    );
                    break Err(Error::Receive {
                        subscription: self.name.id.clone(),
                        source: Box::new(err),
                    });
                }
                None => break Ok(received),
            }
        };

        release_undelivered(transport, self.name.clone(), rx);
        outcome
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("name", &self.name)
            .field("settings", &self.settings)
            .finish()
    }
}

/// Upper bound on ack ids sent in one acknowledge call.
const MAX_ACK_BATCH: usize = 1000;

fn spawn_dispatcher(
    transport: Arc<dyn Transport>,
    name: ResourceName,
    settings: ReceiveSettings,
    tx: mpsc::Sender<Result<ReceivedMessage, Error>>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let batch = tokio::select! {
                _ = tx.closed() => return,
                batch = transport.pull(&name, settings.max_messages) => batch,
            };

            match batch {
                Ok(batch) if batch.is_empty() => {
                    tokio::select! {
                        _ = tx.closed() => return,
                        _ = sleep(settings.poll_interval) => {}
                    }
                }
                Ok(batch) => {
                    debug!("Pulled {} messages from {}", batch.len(), name);
                    let mut batch = batch.into_iter();
                    while let Some(delivery) = batch.next() {
                        if let Err(mpsc::error::SendError(rejected)) = tx.send(Ok(delivery)).await {
                            // the window closed while this batch was in hand
                            let ack_ids = rejected
                                .into_iter()
                                .chain(batch)
                                .map(|d| d.ack_id)
                                .collect();
                            release(transport.as_ref(), &name, ack_ids).await;
                            return;
                        }
                    }
                }
                Err(err) => {
                    let _ = tx.send(Err(err)).await;
                    return;
                }
            }
        }
    })
}

// Ack is fire-and-forget: a failure only means the service may redeliver.
fn spawn_acker(
    transport: Arc<dyn Transport>,
    name: ResourceName,
    mut ack_rx: mpsc::UnboundedReceiver<String>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut batch = Vec::new();
        while ack_rx.recv_many(&mut batch, MAX_ACK_BATCH).await > 0 {
            if let Err(err) = transport.acknowledge(&name, &batch).await {
                warn!(
                    "Failed to acknowledge {} messages on {}: {}",
                    batch.len(),
                    name,
                    err
                );
            }
            batch.clear();
        }
    })
}

/// Closes the delivery channel and hands back, without waiting, every
/// message still buffered in it. The dispatcher releases whatever it was
/// still holding on its own.
fn release_undelivered(
    transport: Arc<dyn Transport>,
    name: ResourceName,
    mut rx: mpsc::Receiver<Result<ReceivedMessage, Error>>,
) {
    rx.close();
    let mut ack_ids = Vec::new();
    while let Ok(item) = rx.try_recv() {
        if let Ok(delivery) = item {
            ack_ids.push(delivery.ack_id);
        }
    }
    if ack_ids.is_empty() {
        return;
    }
    tokio::spawn(async move { release(transport.as_ref(), &name, ack_ids).await });
}

async fn release(transport: &dyn Transport, name: &ResourceName, ack_ids: Vec<String>) {
    if ack_ids.is_empty() {
        return;
    }
    match transport.modify_ack_deadline(name, &ack_ids, 0).await {
        Ok(()) => debug!("Released {} unhandled messages on {}", ack_ids.len(), name),
        Err(err) => warn!(
            "Failed to release {} messages on {}, they return after their ack deadline: {}",
            ack_ids.len(),
            name,
            err
        ),
    }
}

use messaging::{
    publish, pull_msgs_for, Error, InMemoryTransport, PubSubClient, ResourceName,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

// Publishes and pulls against the in-process broker, no credentials needed.
#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let broker = Arc::new(InMemoryTransport::new());
    let topic = ResourceName::topic("local", "my-topic");
    broker.create_topic(topic.clone()).await;
    broker
        .create_subscription(ResourceName::subscription("local", "my-sub"), &topic)
        .await?;

    let client = PubSubClient::with_transport("local", broker);

    for greeting in ["Hello World", "Hola Mundo", "Bonjour le monde"] {
        publish(&client, "my-topic", greeting).await?;
    }

    let received = pull_msgs_for(&client, "my-sub", Duration::from_secs(2)).await?;
    info!("Round trip complete: {} messages", received);

    Ok(())
}

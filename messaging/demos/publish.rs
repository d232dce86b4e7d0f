use messaging::{publish, Error, PubSubClient, SampleConfig};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = SampleConfig::from_env()?;
    let client = PubSubClient::from_env()?;

    let msg = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "Hello World".to_string());
    publish(&client, &config.topic_id, &msg).await?;

    Ok(())
}

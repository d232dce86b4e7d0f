use messaging::{pull_msgs, Error, PubSubClient, SampleConfig};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = SampleConfig::from_env()?;
    let client = PubSubClient::from_env()?;

    pull_msgs(&client, &config.subscription_id).await?;

    Ok(())
}

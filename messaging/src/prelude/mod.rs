pub mod config;
pub mod error;
pub mod models;
pub mod subscriber;
pub mod topic;

pub use config::{ClientConfig, ReceiveSettings, SampleConfig};
pub use error::Error;
pub use models::{Message, OutgoingMessage, ReceivedMessage, ResourceName};
pub use subscriber::Subscription;
pub use topic::Topic;

pub type Result<T> = std::result::Result<T, Error>;

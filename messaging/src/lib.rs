pub mod client;
pub mod prelude;
pub mod samples;

pub use client::{InMemoryTransport, PubSubClient, RestTransport, Transport};
pub use prelude::{
    ClientConfig, Error, Message, OutgoingMessage, ReceiveSettings, ReceivedMessage,
    ResourceName, Result, SampleConfig, Subscription, Topic,
};
pub use samples::{publish, pull_msgs, pull_msgs_for, PULL_WINDOW};

//! Client-side replica of the synchronized hackathon tables.
//!
//! The replica keeps a local mirror fed by the change feed, applies the
//! client's own mutations optimistically, and reconciles them against the
//! feed by transaction id. See [`session::ReplicaSession`] for the entry
//! point.

pub mod feed_client;
pub mod gateway;
pub mod local;
mod overlay;
pub mod session;

pub use feed_client::{ChangeFeedClient, HttpFeedClient};
pub use gateway::{ErrorKind, GatewayClient, GatewayError, HttpGatewayClient};
pub use local::{LocalFeedClient, LocalGateway};
pub use session::{MutationHandle, MutationStatus, ReplicaError, ReplicaSession};

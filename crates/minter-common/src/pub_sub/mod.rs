//! Publish-subscribe hub
//!
//! A type agnostic publish-subscribe hub. Subscribers register for a set of topics and
//! receive every event whose topics intersect with theirs, through a bounded channel.
//!
//! Events implement the [`Event`] trait to declare which topics they belong to. Dropping an
//! [`ActiveSubscription`] removes the listener from the hub.

mod error;
mod pubsub;
mod subscriber;
mod types;

pub use self::error::Error;
pub use self::pubsub::{Pubsub, DEFAULT_CHANNEL_SIZE};
pub use self::subscriber::{ActiveSubscription, Subscriber};
pub use self::types::{Event, Spec};

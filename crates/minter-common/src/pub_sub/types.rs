//! Traits describing what a hub carries

use std::fmt::Debug;
use std::hash::Hash;

/// Topic and event types of one hub
pub trait Spec: Send + Sync + 'static {
    /// Routing key, ordered so the hub can look subscriptions up by range
    type Topic: Send + Sync + Clone + Eq + Ord + Hash + Debug;

    /// Payload delivered to subscribers
    type Event: Event<Topic = Self::Topic>;
}

/// Payload that knows which topics it belongs to
pub trait Event: Clone + Send + Sync + Eq + Debug + 'static {
    /// Same as the hub's topic
    type Topic;

    /// Every topic whose subscribers should receive this event
    fn get_topics(&self) -> Vec<Self::Topic>;
}

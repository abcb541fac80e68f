//! Subscription handles
use std::fmt::Debug;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;

use super::pubsub::{EventReceiver, Routes};
use super::Spec;

/// Live subscription to a set of topics
///
/// Receives the events of the topics it was opened for. Dropping it removes its routes from
/// the hub.
pub struct ActiveSubscription<S>
where
    S: Spec,
{
    id: usize,
    topics: Vec<S::Topic>,
    receiver: EventReceiver<S>,
    routes: Routes<S>,
    subscribers: Arc<AtomicUsize>,
}

impl<S> Debug for ActiveSubscription<S>
where
    S: Spec,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActiveSubscription")
            .field("id", &self.id)
            .field("topics", &self.topics)
            .finish()
    }
}

impl<S> ActiveSubscription<S>
where
    S: Spec,
{
    pub(super) fn new(
        id: usize,
        topics: Vec<S::Topic>,
        receiver: EventReceiver<S>,
        routes: Routes<S>,
        subscribers: Arc<AtomicUsize>,
    ) -> Self {
        Self {
            id,
            topics,
            receiver,
            routes,
            subscribers,
        }
    }

    /// Wait for the next event
    pub async fn recv(&mut self) -> Option<S::Event> {
        self.receiver.recv().await
    }

    /// Next event if one is already buffered
    pub fn try_recv(&mut self) -> Option<S::Event> {
        self.receiver.try_recv().ok()
    }

    /// Topics this subscription listens to
    pub fn topics(&self) -> &[S::Topic] {
        &self.topics
    }
}

impl<S> Drop for ActiveSubscription<S>
where
    S: Spec,
{
    fn drop(&mut self) {
        {
            let mut routes = self.routes.write();
            for topic in self.topics.drain(..) {
                routes.remove(&(topic, self.id));
            }
        }
        self.subscribers.fetch_sub(1, Ordering::Relaxed);
    }
}

/// Sending end of one subscription, shared by all its routes
pub struct Subscriber<S>
where
    S: Spec,
{
    sink: mpsc::Sender<S::Event>,
}

impl<S> Debug for Subscriber<S>
where
    S: Spec,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscriber")
            .field("closed", &self.sink.is_closed())
            .finish()
    }
}

impl<S> Clone for Subscriber<S>
where
    S: Spec,
{
    fn clone(&self) -> Self {
        Self {
            sink: self.sink.clone(),
        }
    }
}

impl<S> Subscriber<S>
where
    S: Spec,
{
    /// Wrap the sending end of a subscription channel
    pub fn new(sink: &mpsc::Sender<S::Event>) -> Self {
        Self { sink: sink.clone() }
    }

    /// Forward `event` without waiting, dropped if the subscription lags behind
    pub fn send(&self, event: S::Event) {
        if let Err(err) = self.sink.try_send(event) {
            tracing::warn!("Dropping event for slow subscriber: {}", super::Error::from(err));
        }
    }
}

//! Hub routing events to the subscriptions of their topics

use std::collections::{BTreeMap, HashSet};
use std::fmt::Debug;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::mpsc;

use super::subscriber::ActiveSubscription;
use super::{Error, Event, Spec, Subscriber};

/// Buffered events per subscription before new ones are dropped
pub const DEFAULT_CHANNEL_SIZE: usize = 1_000;

/// Receiving end of a subscription
pub(super) type EventReceiver<S> = mpsc::Receiver<<S as Spec>::Event>;

/// Routing table keyed by topic, then subscription id, so one topic is a contiguous range
pub(super) type Routes<S> = Arc<RwLock<BTreeMap<(<S as Spec>::Topic, usize), Subscriber<S>>>>;

/// Publish-subscribe hub
pub struct Pubsub<S>
where
    S: Spec,
{
    routes: Routes<S>,
    next_id: AtomicUsize,
    subscribers: Arc<AtomicUsize>,
}

impl<S> Debug for Pubsub<S>
where
    S: Spec,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pubsub")
            .field("subscribers", &self.active_subscribers())
            .finish()
    }
}

impl<S> Default for Pubsub<S>
where
    S: Spec,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<S> Pubsub<S>
where
    S: Spec,
{
    /// Create an empty hub
    pub fn new() -> Self {
        Self {
            routes: Arc::new(RwLock::new(BTreeMap::new())),
            next_id: AtomicUsize::new(0),
            subscribers: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Number of live subscriptions, whatever their topics
    pub fn active_subscribers(&self) -> usize {
        self.subscribers.load(Ordering::Relaxed)
    }

    /// Whether at least one subscription listens to `topic`
    pub fn has_listeners(&self, topic: &S::Topic) -> bool {
        self.routes
            .read()
            .range((topic.clone(), 0)..)
            .next()
            .is_some_and(|((routed, _), _)| routed == topic)
    }

    /// Deliver `event` to every subscription of its topics, once per subscription
    pub fn publish_now<E>(&self, event: E) -> Result<(), Error>
    where
        E: Into<S::Event>,
    {
        let event = event.into();
        let routes = self.routes.read();
        let mut delivered = HashSet::new();

        for topic in event.get_topics() {
            let targets = routes
                .range((topic.clone(), 0)..)
                .take_while(|((routed, _), _)| *routed == topic);

            for ((_, id), subscriber) in targets {
                if delivered.insert(*id) {
                    subscriber.send(event.clone());
                }
            }
        }

        Ok(())
    }

    /// Open a subscription to `topics`
    pub fn subscribe(&self, topics: Vec<S::Topic>) -> Result<ActiveSubscription<S>, Error> {
        if topics.is_empty() {
            return Err(Error::NoTopics);
        }

        let (sender, receiver) = mpsc::channel(DEFAULT_CHANNEL_SIZE);
        let subscriber = Subscriber::new(&sender);
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);

        {
            let mut routes = self.routes.write();
            for topic in topics.iter() {
                routes.insert((topic.clone(), id), subscriber.clone());
            }
        }
        self.subscribers.fetch_add(1, Ordering::Relaxed);

        Ok(ActiveSubscription::new(
            id,
            topics,
            receiver,
            self.routes.clone(),
            self.subscribers.clone(),
        ))
    }
}

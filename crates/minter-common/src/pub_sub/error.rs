use tokio::sync::mpsc::error::TrySendError;

/// Hub failures
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Subscribing to nothing
    #[error("Subscription without topics")]
    NoTopics,
    /// Subscriber is not keeping up
    #[error("Subscriber channel is full")]
    ChannelFull,
    /// Subscriber went away
    #[error("Subscriber channel is closed")]
    ChannelClosed,
}

impl<T> From<TrySendError<T>> for Error {
    fn from(err: TrySendError<T>) -> Self {
        if matches!(err, TrySendError::Full(_)) {
            Self::ChannelFull
        } else {
            Self::ChannelClosed
        }
    }
}

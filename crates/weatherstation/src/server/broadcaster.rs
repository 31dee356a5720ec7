use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, Mutex};

/// Per-subscriber queue depth.
pub const SUBSCRIBER_BUFFER: usize = 16;

/// Fan-out of values to any number of subscribers.
///
/// Sending never waits: a subscriber whose queue is full misses the value,
/// and subscribers whose receiver was dropped are pruned.
pub struct Broadcaster<T> {
    subscribers: Mutex<Vec<mpsc::Sender<T>>>,
    buffer: usize,
}

impl<T: Clone> Broadcaster<T> {
    pub fn new(buffer: usize) -> Self {
        Self {
            subscribers: Mutex::new(Vec::new()),
            buffer: buffer.max(1),
        }
    }

    pub async fn subscribe(&self) -> mpsc::Receiver<T> {
        let (tx, rx) = mpsc::channel(self.buffer);
        self.subscribers.lock().await.push(tx);
        rx
    }

    /// Offer `value` to every subscriber. Returns how many accepted it.
    pub async fn broadcast(&self, value: T) -> usize {
        let mut subscribers = self.subscribers.lock().await;
        let mut delivered = 0;
        subscribers.retain(|tx| match tx.try_send(value.clone()) {
            Ok(()) => {
                delivered += 1;
                true
            }
            Err(TrySendError::Full(_)) => {
                log::debug!("Subscriber lagging, dropping update");
                true
            }
            Err(TrySendError::Closed(_)) => false,
        });
        delivered
    }

    pub async fn subscriber_count(&self) -> usize {
        self.subscribers.lock().await.len()
    }
}

impl<T: Clone> Default for Broadcaster<T> {
    fn default() -> Self {
        Self::new(SUBSCRIBER_BUFFER)
    }
}

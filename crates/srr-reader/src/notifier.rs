//! Event fan-out
//!
//! Two ways to observe a reader:
//!
//! - Listeners registered with [`Notifier::add_listener`] are called
//!   synchronously, in registration order, on the task that produced the
//!   event.
//! - [`Notifier::subscribe`] hands out a broadcast receiver for async
//!   consumers. A receiver that falls behind by more than the channel
//!   capacity sees `Lagged` and skips ahead.

use std::sync::{PoisonError, RwLock};

use tokio::sync::broadcast;
use tracing::trace;

use crate::events::ReaderEvent;

/// Synchronous event callback
pub type Listener = Box<dyn Fn(&ReaderEvent) + Send + Sync>;

/// Observer registry plus broadcast channel
pub struct Notifier {
    listeners: RwLock<Vec<Listener>>,
    tx: broadcast::Sender<ReaderEvent>,
}

impl Notifier {
    /// Create a notifier whose broadcast channel holds `capacity` events
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self {
            listeners: RwLock::new(Vec::new()),
            tx,
        }
    }

    /// Register a listener
    ///
    /// Listeners must not register further listeners from inside the
    /// callback.
    pub fn add_listener<F>(&self, listener: F)
    where
        F: Fn(&ReaderEvent) + Send + Sync + 'static,
    {
        self.listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Box::new(listener));
    }

    /// Receive every event emitted from now on
    pub fn subscribe(&self) -> broadcast::Receiver<ReaderEvent> {
        self.tx.subscribe()
    }

    pub fn listener_count(&self) -> usize {
        self.listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Deliver `event` to every listener, then to subscribers
    pub fn emit(&self, event: ReaderEvent) {
        trace!("Emitting {} event", event.name());
        {
            let listeners = self.listeners.read().unwrap_or_else(PoisonError::into_inner);
            for listener in listeners.iter() {
                listener(&event);
            }
        }
        // No subscribers is fine
        let _ = self.tx.send(event);
    }
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new(256)
    }
}

impl std::fmt::Debug for Notifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Notifier")
            .field("listeners", &self.listener_count())
            .field("subscribers", &self.tx.receiver_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;

    #[test]
    fn test_listeners_called_in_registration_order() {
        let notifier = Notifier::default();
        let calls = Arc::new(Mutex::new(Vec::new()));

        for id in 0..3 {
            let calls = Arc::clone(&calls);
            notifier.add_listener(move |event| {
                calls.lock().unwrap().push((id, event.name()));
            });
        }
        assert_eq!(notifier.listener_count(), 3);

        notifier.emit(ReaderEvent::Connected {
            port: "COM3".into(),
        });
        notifier.emit(ReaderEvent::Disconnected);

        assert_eq!(
            *calls.lock().unwrap(),
            vec![
                (0, "connected"),
                (1, "connected"),
                (2, "connected"),
                (0, "disconnected"),
                (1, "disconnected"),
                (2, "disconnected"),
            ]
        );
    }

    #[tokio::test]
    async fn test_subscribers_receive_events() {
        let notifier = Notifier::new(8);
        let mut a = notifier.subscribe();
        let mut b = notifier.subscribe();

        notifier.emit(ReaderEvent::Error {
            message: "read failed".into(),
        });

        for rx in [&mut a, &mut b] {
            assert_eq!(
                rx.recv().await.unwrap(),
                ReaderEvent::Error {
                    message: "read failed".into()
                }
            );
        }
    }

    #[test]
    fn test_emit_without_observers() {
        let notifier = Notifier::new(0);
        notifier.emit(ReaderEvent::Disconnected);
        assert_eq!(notifier.listener_count(), 0);
    }
}

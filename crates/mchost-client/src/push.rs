//! Push notification delivery.
//!
//! The device sends unsolicited frames (advert received, message waiting,
//! send confirmed, ...) at any time, including while a command is pending.
//! The read loop hands these to a [`PushRouter`], which fans them out to an
//! explicit subscription list. Subscribers that drop their receiver are
//! pruned on the next delivery.

use bytes::Bytes;
use parking_lot::Mutex;
use tokio::sync::mpsc;

/// An unsolicited device → host notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushEvent {
    /// The push code (e.g. `PUSH_CODE_ADVERT`).
    pub code: u8,
    /// Raw notification data; interpretation is the caller's concern.
    pub data: Bytes,
}

/// Receiving end of a push subscription.
///
/// Dropping the subscription unsubscribes; the router prunes the closed
/// channel on its next delivery.
#[derive(Debug)]
pub struct PushSubscription {
    rx: mpsc::UnboundedReceiver<PushEvent>,
}

impl PushSubscription {
    /// Wait for the next push event.
    ///
    /// Returns `None` once the session has disconnected and all buffered
    /// events have been drained.
    pub async fn recv(&mut self) -> Option<PushEvent> {
        self.rx.recv().await
    }

    /// Non-blocking poll for a buffered push event.
    pub fn try_recv(&mut self) -> Option<PushEvent> {
        self.rx.try_recv().ok()
    }
}

/// Fan-out of push events to all live subscribers.
#[derive(Debug, Default)]
pub(crate) struct PushRouter {
    subscribers: Mutex<Vec<mpsc::UnboundedSender<PushEvent>>>,
}

impl PushRouter {
    /// Register a new subscriber.
    pub(crate) fn subscribe(&self) -> PushSubscription {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.lock().push(tx);
        PushSubscription { rx }
    }

    /// Deliver an event to every live subscriber, pruning closed ones.
    ///
    /// Events are delivered in arrival order; each subscriber has its own
    /// unbounded queue so a slow consumer never blocks the read loop.
    pub(crate) fn deliver(&self, event: PushEvent) {
        let mut subs = self.subscribers.lock();
        subs.retain(|tx| tx.send(event.clone()).is_ok());
        if subs.is_empty() {
            tracing::trace!(
                code = format_args!("0x{:02X}", event.code),
                data = %hex::encode(&event.data),
                "push event with no subscribers"
            );
        }
    }

    /// Drop all subscriber channels, ending every subscription.
    pub(crate) fn close(&self) {
        self.subscribers.lock().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_delivery_order() {
        let router = PushRouter::default();
        let mut sub = router.subscribe();

        for code in [0x80u8, 0x83, 0x82] {
            router.deliver(PushEvent { code, data: Bytes::new() });
        }

        assert_eq!(sub.recv().await.unwrap().code, 0x80);
        assert_eq!(sub.recv().await.unwrap().code, 0x83);
        assert_eq!(sub.recv().await.unwrap().code, 0x82);
    }

    #[tokio::test]
    async fn test_dropped_subscriber_is_pruned() {
        let router = PushRouter::default();
        let sub = router.subscribe();
        drop(sub);

        router.deliver(PushEvent { code: 0x80, data: Bytes::new() });
        assert!(router.subscribers.lock().is_empty());
    }

    #[tokio::test]
    async fn test_close_ends_subscription() {
        let router = PushRouter::default();
        let mut sub = router.subscribe();
        router.deliver(PushEvent { code: 0x81, data: Bytes::new() });
        router.close();

        // Buffered event still drains, then the channel ends.
        assert_eq!(sub.recv().await.unwrap().code, 0x81);
        assert!(sub.recv().await.is_none());
    }
}

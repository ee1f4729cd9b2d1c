use futures_channel::mpsc::{unbounded, UnboundedReceiver, UnboundedSender};
use std::cell::RefCell;
use std::rc::Rc;

/// Single-threaded fan-out of values to any number of subscribers.
/// Subscribers whose receiver was dropped are pruned on the next send.
pub struct Broadcast<T> {
    senders: Rc<RefCell<Vec<UnboundedSender<T>>>>,
}

impl<T> Clone for Broadcast<T> {
    fn clone(&self) -> Self {
        Self {
            senders: self.senders.clone(),
        }
    }
}

impl<T> Default for Broadcast<T> {
    fn default() -> Self {
        Self {
            senders: Rc::new(RefCell::new(Vec::new())),
        }
    }
}

impl<T: Clone> Broadcast<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a subscriber and hands it `initial` before any later value.
    pub fn subscribe(&self, initial: T) -> UnboundedReceiver<T> {
        let (tx, rx) = unbounded();
        let _ = tx.unbounded_send(initial);
        self.senders.borrow_mut().push(tx);
        rx
    }

    pub fn send(&self, value: T) {
        self.senders
            .borrow_mut()
            .retain(|tx| tx.unbounded_send(value.clone()).is_ok());
    }

    #[cfg(test)]
    pub fn subscriber_count(&self) -> usize {
        self.senders.borrow().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::StreamExt;

    #[tokio::test]
    async fn subscribers_see_initial_then_later_values() {
        let broadcast = Broadcast::new();
        let mut first = broadcast.subscribe(1);
        broadcast.send(2);
        let mut second = broadcast.subscribe(2);
        broadcast.send(3);

        assert_eq!(first.next().await, Some(1));
        assert_eq!(first.next().await, Some(2));
        assert_eq!(first.next().await, Some(3));
        assert_eq!(second.next().await, Some(2));
        assert_eq!(second.next().await, Some(3));
    }

    #[test]
    fn dropped_subscribers_are_pruned() {
        let broadcast = Broadcast::new();
        let kept = broadcast.subscribe(0u8);
        drop(broadcast.subscribe(0u8));
        broadcast.send(1);
        assert_eq!(broadcast.subscriber_count(), 1);
        drop(kept);
    }
}

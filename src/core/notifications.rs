use crate::core::order::BrokerOrder;
use crossbeam_channel::{unbounded, Receiver, Sender, TryRecvError};
use log::{debug, error};

/// FIFO of order states handed back to the engine. The broker produces, the
/// engine drains with `next_notification`, possibly from another thread
/// through a cloned `receiver()`.
#[derive(Clone, Debug)]
pub struct NotificationQueue {
    sender: Sender<BrokerOrder>,
    receiver: Receiver<BrokerOrder>,
}

impl Default for NotificationQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl NotificationQueue {
    pub fn new() -> Self {
        let (sender, receiver) = unbounded();
        Self { sender, receiver }
    }

    pub fn receiver(&self) -> Receiver<BrokerOrder> {
        self.receiver.clone()
    }

    pub fn notify(&self, order: &BrokerOrder) {
        debug!("notify order {} status {:?}", order.id(), order.status());
        // both ends live in self, so the channel cannot be disconnected here
        if let Err(err) = self.sender.send(order.clone()) {
            error!("failed to queue notification: {:?}", err)
        }
    }

    /// Never blocks; `None` when nothing is pending.
    pub fn next_notification(&self) -> Option<BrokerOrder> {
        match self.receiver.try_recv() {
            Ok(order) => Some(order),
            Err(TryRecvError::Empty) => None,
            Err(err) => {
                error!("failed to receive notification: {:?}", err);
                None
            }
        }
    }

    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }
}

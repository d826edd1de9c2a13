//! In-process notification hub.

use std::sync::mpsc::{channel, Receiver, Sender};

use tracing::{debug, warn};

use crate::notify::events::{DocumentNotification, EventType, HubMessage};

/// Sink for change notifications
///
/// Delivery is fire-and-forget: implementations must not block the caller and
/// must not report subscriber failures back to it.
pub trait NotificationHub: Send + Sync {
    fn notify(&self, uid: &str, device: &str, notification: DocumentNotification, event: EventType);

    /// Ask the user's other devices to sync, carrying an opaque token
    fn notify_sync(&self, uid: &str, token: &str);
}

/// Hub backed by an unbounded channel
#[derive(Clone)]
pub struct ChannelHub {
    sender: Sender<HubMessage>,
}

impl ChannelHub {
    pub fn new_pair() -> (Self, Receiver<HubMessage>) {
        let (sender, receiver) = channel();
        (Self { sender }, receiver)
    }

    fn send(&self, message: HubMessage) {
        if let Err(e) = self.sender.send(message) {
            warn!(uid = %e.0.uid(), "no hub subscriber, notification dropped");
        }
    }
}

impl NotificationHub for ChannelHub {
    fn notify(&self, uid: &str, device: &str, notification: DocumentNotification, event: EventType) {
        debug!(uid, doc_id = %notification.id, ?event, "notify");
        self.send(HubMessage::document(uid, device, notification, event));
    }

    fn notify_sync(&self, uid: &str, token: &str) {
        debug!(uid, token, "notify sync");
        self.send(HubMessage::sync(uid, token));
    }
}

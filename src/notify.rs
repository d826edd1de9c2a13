//! Change notifications pushed to a user's other devices.

pub mod events;
pub mod hub;

pub use events::{DocumentNotification, EventType, HubMessage};
pub use hub::{ChannelHub, NotificationHub};

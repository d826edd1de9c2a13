//! Event schema for change notifications.

use crate::types::{DocumentId, EntryType, UserId};
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventType {
    #[serde(rename = "DocAdded")]
    DocumentAdded,
    #[serde(rename = "DocDeleted")]
    DocumentDeleted,
}

/// Identity of the document a change refers to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentNotification {
    #[serde(rename = "ID")]
    pub id: DocumentId,
    #[serde(rename = "Type")]
    pub doc_type: EntryType,
    #[serde(rename = "Version")]
    pub version: i64,
    #[serde(rename = "Parent")]
    pub parent: DocumentId,
    #[serde(rename = "Name")]
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum HubMessage {
    Document {
        ts: String,
        uid: UserId,
        device: String,
        event: EventType,
        notification: DocumentNotification,
    },
    Sync {
        ts: String,
        uid: UserId,
        token: String,
    },
}

impl HubMessage {
    pub fn document(
        uid: impl Into<UserId>,
        device: impl Into<String>,
        notification: DocumentNotification,
        event: EventType,
    ) -> Self {
        HubMessage::Document {
            ts: now_rfc3339(),
            uid: uid.into(),
            device: device.into(),
            event,
            notification,
        }
    }

    pub fn sync(uid: impl Into<UserId>, token: impl Into<String>) -> Self {
        HubMessage::Sync {
            ts: now_rfc3339(),
            uid: uid.into(),
            token: token.into(),
        }
    }

    pub fn uid(&self) -> &str {
        match self {
            HubMessage::Document { uid, .. } | HubMessage::Sync { uid, .. } => uid,
        }
    }
}

fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

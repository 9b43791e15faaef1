//! UI-agnostic conversation types
//!
//! This module contains the data structures shared between the session
//! controller and any presentation layer (TUI today). None of them depend on a
//! specific UI framework.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Namespace for name-based ids of conversations rebuilt from server history.
const HISTORY_NAMESPACE: Uuid = Uuid::from_u128(0x6f1c_2a4e_93d7_4b0e_a5c1_0d8e_7f21_b3a9);

macro_rules! define_id {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(pub Uuid);

        impl $name {
            pub fn new_random() -> Self {
                Self(Uuid::new_v4())
            }

            pub fn from_name(name: &str) -> Self {
                Self(Uuid::new_v5(&HISTORY_NAMESPACE, name.as_bytes()))
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

define_id!(MessageId);
define_id!(ConversationId);

/// Who authored a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    User,
    Assistant,
}

/// A single chat turn. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    id: MessageId,
    content: String,
    origin: Origin,
    timestamp: DateTime<Utc>,
}

impl Message {
    pub fn new(id: MessageId, content: impl Into<String>, origin: Origin, timestamp: DateTime<Utc>) -> Self {
        Self {
            id,
            content: content.into(),
            origin,
            timestamp,
        }
    }

    pub fn user(content: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self::new(MessageId::new_random(), content, Origin::User, timestamp)
    }

    pub fn assistant(content: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self::new(MessageId::new_random(), content, Origin::Assistant, timestamp)
    }

    pub fn id(&self) -> MessageId {
        self.id
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn origin(&self) -> Origin {
        self.origin
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

/// An ordered exchange of messages grouped under one id and title
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: ConversationId,
    pub title: String,
    pub messages: Vec<Message>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Conversation {
    pub fn new(id: ConversationId, title: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            title: title.into(),
            messages: Vec::new(),
            created_at,
            updated_at: created_at,
        }
    }

    /// Advance `updated_at`, never moving it backwards.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        if now > self.updated_at {
            self.updated_at = now;
        }
    }
}

/// Opaque bearer token proving the user's identity to the backend
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_touch_never_moves_backwards() {
        let start = Utc::now();
        let mut conversation = Conversation::new(ConversationId::new_random(), "t", start);

        conversation.touch(start - Duration::seconds(30));
        assert_eq!(conversation.updated_at, start);

        conversation.touch(start + Duration::seconds(5));
        assert_eq!(conversation.updated_at, start + Duration::seconds(5));
    }

    #[test]
    fn test_name_based_ids_are_stable() {
        let a = ConversationId::from_name("2024-05-01T10:00:00Z|why is it hot");
        let b = ConversationId::from_name("2024-05-01T10:00:00Z|why is it hot");
        let c = ConversationId::from_name("2024-05-01T10:00:00Z|why is it cold");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_credential_debug_is_redacted() {
        let credential = Credential::new("secret-token");
        assert!(!format!("{:?}", credential).contains("secret-token"));
        assert_eq!(credential.expose(), "secret-token");
    }
}

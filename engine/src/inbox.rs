//! Support inbox conversations.
//!
//! One conversation per user, created lazily on first contact. Messages are
//! append-only, and whichever conversation was updated most recently sits
//! at the front of the list so the admin inbox surfaces it first.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::identity::CachedUser;
use crate::keys;
use crate::local::LocalStore;

/// Message kind used for automated notices.
pub const KIND_SYSTEM: &str = "system";

/// Who sent a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SenderRole {
    User,
    Admin,
}

/// A single inbox message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    #[serde(rename = "from")]
    pub sender: SenderRole,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

/// A conversation between one user and the storefront.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub id: String,
    pub user_sub: String,
    pub user_email: Option<String>,
    pub user_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub messages: Vec<Message>,
}

/// Load every conversation, most recently updated first.
pub fn conversations(store: &LocalStore) -> Vec<Conversation> {
    store.get(keys::CONVERSATIONS)
}

fn save_conversations(store: &LocalStore, list: &[Conversation]) {
    store.set(keys::CONVERSATIONS, list);
}

/// Find one conversation by id.
pub fn conversation(store: &LocalStore, convo_id: &str) -> Option<Conversation> {
    conversations(store).into_iter().find(|c| c.id == convo_id)
}

/// The user's conversation, created on first contact.
pub fn get_or_create_for_user(
    store: &LocalStore,
    user: &CachedUser,
    now: DateTime<Utc>,
) -> Conversation {
    let mut list = conversations(store);
    if let Some(existing) = list.iter().find(|c| c.user_sub == user.sub) {
        return existing.clone();
    }

    let convo = Conversation {
        id: format!("convo_{}", now.timestamp_millis()),
        user_sub: user.sub.clone(),
        user_email: user.email.clone(),
        user_name: user.name.clone(),
        created_at: now,
        updated_at: now,
        messages: Vec::new(),
    };
    list.insert(0, convo.clone());
    save_conversations(store, &list);
    convo
}

/// Append a message and move the conversation to the front of the list.
pub fn append_message(
    store: &LocalStore,
    convo_id: &str,
    sender: SenderRole,
    kind: Option<&str>,
    text: &str,
    now: DateTime<Utc>,
) -> Result<Message> {
    let mut list = conversations(store);
    let index = list
        .iter()
        .position(|c| c.id == convo_id)
        .ok_or_else(|| Error::ConversationNotFound(convo_id.to_owned()))?;

    let message = Message {
        id: format!("msg_{}", now.timestamp_millis()),
        sender,
        kind: kind.map(str::to_owned),
        text: text.to_owned(),
        created_at: now,
    };

    let mut convo = list.remove(index);
    convo.messages.push(message.clone());
    convo.updated_at = now;
    list.insert(0, convo);

    save_conversations(store, &list);
    Ok(message)
}

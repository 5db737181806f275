//! Support inbox operations.

use chrono::Utc;
use serde_json::Value;

use cardforce_engine::{
    error::{Error, Result},
    inbox::{self, Conversation, Message, SenderRole},
};

use super::Storefront;
use crate::error::RemoteError;
use crate::sync::SyncOutcome;

/// Automated notice posted when an admin approves a custom-card request.
const PROCEED_TEXT: &str = "Proceeding with order. Please upload files.";

impl Storefront {
    /// Every conversation, most recently updated first.
    pub fn conversations(&self) -> Vec<Conversation> {
        inbox::conversations(self.local())
    }

    /// One conversation by id.
    pub fn conversation(&self, convo_id: &str) -> Option<Conversation> {
        inbox::conversation(self.local(), convo_id)
    }

    /// The signed-in user's conversation, created on first contact.
    pub fn user_conversation(&self) -> Result<Conversation> {
        let user = self.session().current_user().ok_or(Error::NotSignedIn)?;
        Ok(inbox::get_or_create_for_user(self.local(), &user, Utc::now()))
    }

    /// Send a message as the signed-in user and push it to the chat
    /// collection.
    pub async fn send_message(&self, text: &str) -> Result<(Message, SyncOutcome)> {
        let convo = self.user_conversation()?;
        self.append_and_push(&convo.id, SenderRole::User, None, text)
            .await
    }

    /// Reply in a conversation as the storefront admin.
    pub async fn admin_reply(&self, convo_id: &str, text: &str) -> Result<(Message, SyncOutcome)> {
        self.append_and_push(convo_id, SenderRole::Admin, None, text)
            .await
    }

    /// Post the automated proceed-with-order notice.
    pub async fn admin_proceed(&self, convo_id: &str) -> Result<(Message, SyncOutcome)> {
        self.append_and_push(
            convo_id,
            SenderRole::Admin,
            Some(inbox::KIND_SYSTEM),
            PROCEED_TEXT,
        )
        .await
    }

    /// A conversation's remote history, oldest first.
    pub async fn remote_messages(
        &self,
        convo_id: &str,
    ) -> std::result::Result<Vec<Value>, RemoteError> {
        self.sync().pull_chat_messages(convo_id).await
    }

    async fn append_and_push(
        &self,
        convo_id: &str,
        sender: SenderRole,
        kind: Option<&str>,
        text: &str,
    ) -> Result<(Message, SyncOutcome)> {
        let message =
            inbox::append_message(self.local(), convo_id, sender, kind, text, Utc::now())?;
        let outcome = self.sync().push_chat_message(convo_id, &message).await;
        Ok((message, outcome))
    }
}

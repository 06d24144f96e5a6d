//! Mail handlers. Every operation is scoped to the caller's own
//! messages; there is no way to name another owner.

use mailroom_core::error::MailroomResult;
use mailroom_core::models::message::{CreateMessage, Folder, Message, MessageStatus, NewMessage};
use mailroom_core::models::user::User;
use mailroom_core::policy;
use mailroom_core::repository::MessageRepository;
use tracing::debug;
use uuid::Uuid;

use crate::validation;

pub struct MailService<M: MessageRepository> {
    messages: M,
    sender_domain: String,
}

impl<M: MessageRepository> MailService<M> {
    pub fn new(messages: M, sender_domain: impl Into<String>) -> Self {
        Self {
            messages,
            sender_domain: sender_domain.into(),
        }
    }

    /// The system-assigned sender address for `user`.
    pub fn sender_address(&self, user: &User) -> String {
        format!("{}@{}", user.username, self.sender_domain)
    }

    /// Newest first. Defaults to the inbox.
    pub async fn list(
        &self,
        actor: Option<&User>,
        folder: Option<Folder>,
    ) -> MailroomResult<Vec<Message>> {
        let actor = policy::require_authenticated(actor)?;
        self.messages
            .list_for_owner(actor.id, folder.unwrap_or_default())
            .await
    }

    /// Store a message in the caller's sent folder.
    pub async fn send(
        &self,
        actor: Option<&User>,
        input: CreateMessage,
    ) -> MailroomResult<Message> {
        let actor = policy::require_authenticated(actor)?;
        validation::validate_message(&input)?;

        let message = self
            .messages
            .create(NewMessage {
                user_id: actor.id,
                sender: self.sender_address(actor),
                recipient: input.recipient.trim().to_string(),
                subject: input.subject,
                body: input.body,
                folder: Folder::Sent,
            })
            .await?;

        debug!(user_id = %actor.id, message_id = %message.id, "message sent");
        Ok(message)
    }

    /// A message the caller does not own is reported as not found.
    pub async fn set_status(
        &self,
        actor: Option<&User>,
        id: Uuid,
        status: MessageStatus,
    ) -> MailroomResult<Message> {
        let actor = policy::require_authenticated(actor)?;
        self.messages.update_status(actor.id, id, status).await
    }

    pub async fn move_to_folder(
        &self,
        actor: Option<&User>,
        id: Uuid,
        folder: Folder,
    ) -> MailroomResult<Message> {
        let actor = policy::require_authenticated(actor)?;
        self.messages.move_to_folder(actor.id, id, folder).await
    }
}

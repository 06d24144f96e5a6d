//! SurrealDB implementation of [`MessageRepository`].

use chrono::{DateTime, Utc};
use mailroom_core::error::MailroomResult;
use mailroom_core::models::message::{Folder, Message, MessageStatus, NewMessage};
use mailroom_core::repository::MessageRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use super::parse_uuid;
use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct MessageRow {
    record_id: String,
    user_id: String,
    sender: String,
    recipient: String,
    subject: String,
    body: String,
    is_read: bool,
    is_starred: bool,
    folder: String,
    created_at: DateTime<Utc>,
}

impl MessageRow {
    fn try_into_message(self) -> Result<Message, DbError> {
        Ok(Message {
            id: parse_uuid("message", &self.record_id)?,
            user_id: parse_uuid("user", &self.user_id)?,
            sender: self.sender,
            recipient: self.recipient,
            subject: self.subject,
            body: self.body,
            is_read: self.is_read,
            is_starred: self.is_starred,
            folder: self.folder.parse::<Folder>().map_err(DbError::Decode)?,
            created_at: self.created_at,
        })
    }
}

/// SurrealDB implementation of the Message repository.
#[derive(Clone)]
pub struct SurrealMessageRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealMessageRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> MessageRepository for SurrealMessageRepository<C> {
    async fn create(&self, input: NewMessage) -> MailroomResult<Message> {
        let id = Uuid::new_v4();
        let owner_id = input.user_id;

        self.db
            .query(
                "CREATE type::record('message', $id) SET \
                 user_id = $user_id, sender = $sender, \
                 recipient = $recipient, subject = $subject, \
                 body = $body, is_read = false, is_starred = false, \
                 folder = $folder",
            )
            .bind(("id", id.to_string()))
            .bind(("user_id", owner_id.to_string()))
            .bind(("sender", input.sender))
            .bind(("recipient", input.recipient))
            .bind(("subject", input.subject))
            .bind(("body", input.body))
            .bind(("folder", input.folder.as_str().to_string()))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        self.get_for_owner(owner_id, id).await
    }

    async fn get_for_owner(&self, owner_id: Uuid, id: Uuid) -> MailroomResult<Message> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * \
                 FROM type::record('message', $id) \
                 WHERE user_id = $owner_id",
            )
            .bind(("id", id_str.clone()))
            .bind(("owner_id", owner_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<MessageRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "message".into(),
            id: id_str,
        })?;

        Ok(row.try_into_message()?)
    }

    async fn list_for_owner(&self, owner_id: Uuid, folder: Folder) -> MailroomResult<Vec<Message>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM message \
                 WHERE user_id = $owner_id AND folder = $folder \
                 ORDER BY created_at DESC",
            )
            .bind(("owner_id", owner_id.to_string()))
            .bind(("folder", folder.as_str().to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<MessageRow> = result.take(0).map_err(DbError::from)?;
        let messages = rows
            .into_iter()
            .map(MessageRow::try_into_message)
            .collect::<Result<Vec<_>, DbError>>()?;
        Ok(messages)
    }

    async fn update_status(
        &self,
        owner_id: Uuid,
        id: Uuid,
        status: MessageStatus,
    ) -> MailroomResult<Message> {
        let current = self.get_for_owner(owner_id, id).await?;
        if status.is_empty() {
            return Ok(current);
        }

        let mut sets = Vec::new();
        if status.is_read.is_some() {
            sets.push("is_read = $is_read");
        }
        if status.is_starred.is_some() {
            sets.push("is_starred = $is_starred");
        }
        let query = format!(
            "UPDATE type::record('message', $id) SET {} WHERE user_id = $owner_id",
            sets.join(", ")
        );

        let mut builder = self
            .db
            .query(&query)
            .bind(("id", id.to_string()))
            .bind(("owner_id", owner_id.to_string()));
        if let Some(is_read) = status.is_read {
            builder = builder.bind(("is_read", is_read));
        }
        if let Some(is_starred) = status.is_starred {
            builder = builder.bind(("is_starred", is_starred));
        }

        builder
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        self.get_for_owner(owner_id, id).await
    }

    async fn move_to_folder(
        &self,
        owner_id: Uuid,
        id: Uuid,
        folder: Folder,
    ) -> MailroomResult<Message> {
        self.get_for_owner(owner_id, id).await?;

        self.db
            .query(
                "UPDATE type::record('message', $id) SET folder = $folder \
                 WHERE user_id = $owner_id",
            )
            .bind(("id", id.to_string()))
            .bind(("owner_id", owner_id.to_string()))
            .bind(("folder", folder.as_str().to_string()))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        self.get_for_owner(owner_id, id).await
    }
}

use std::sync::Arc;

use domain::{
    AppendOutcome, Chatroom, ChatroomId, ChatroomRepository, DomainError, LinkId, LinkRepository,
    Message, MessageContent, MessageId, Timestamp, UserId, LOCKED_MESSAGE_LIMIT,
};

use crate::clock::Clock;
use crate::error::ApplicationResult;
use crate::timeouts::StoreTimeouts;

pub struct ChatroomGateDependencies {
    pub chatroom_repository: Arc<dyn ChatroomRepository>,
    pub link_repository: Arc<dyn LinkRepository>,
    pub clock: Arc<dyn Clock>,
    pub timeouts: StoreTimeouts,
}

/// 聊天室的锁定策略：锁定时全室最多两条预览消息，近距离确认后解锁
pub struct ChatroomGate {
    deps: ChatroomGateDependencies,
}

impl ChatroomGate {
    pub fn new(deps: ChatroomGateDependencies) -> Self {
        Self { deps }
    }

    /// 无条件解锁；已解锁时直接返回
    pub async fn unlock(&self, chatroom_id: ChatroomId) -> ApplicationResult<Chatroom> {
        let mut chatroom = self.load_chatroom(chatroom_id).await?;
        if !chatroom.is_locked {
            return Ok(chatroom);
        }

        let now = self.deps.clock.now();
        if self.unlock_if_locked(chatroom_id, now).await? {
            tracing::info!(chatroom_id = %chatroom_id, "chatroom unlocked");
        }
        chatroom.unlock(now);
        Ok(chatroom)
    }

    /// 参与者确认彼此在附近后解锁。并发确认时只有一方成功，另一方得到“已解锁”
    pub async fn proximity_unlock(
        &self,
        user_id: UserId,
        chatroom_id: ChatroomId,
    ) -> ApplicationResult<Chatroom> {
        let mut chatroom = self.load_chatroom(chatroom_id).await?;
        if !chatroom.is_participant(user_id) {
            return Err(DomainError::NotChatroomParticipant.into());
        }
        if !chatroom.is_locked {
            return Err(DomainError::ChatroomAlreadyUnlocked.into());
        }

        let now = self.deps.clock.now();
        if !self.unlock_if_locked(chatroom_id, now).await? {
            return Err(DomainError::ChatroomAlreadyUnlocked.into());
        }
        chatroom.unlock(now);

        tracing::info!(
            chatroom_id = %chatroom_id,
            user_id = %user_id,
            "chatroom unlocked by proximity"
        );
        Ok(chatroom)
    }

    pub async fn send_message(
        &self,
        user_id: UserId,
        chatroom_id: ChatroomId,
        content: String,
    ) -> ApplicationResult<Message> {
        let content = MessageContent::new(content)?;
        let chatroom = self.load_chatroom(chatroom_id).await?;
        if !chatroom.is_participant(user_id) {
            return Err(DomainError::NotChatroomParticipant.into());
        }

        let message = Message::new(
            MessageId::generate(),
            chatroom_id,
            user_id,
            content,
            self.deps.clock.now(),
        );
        // 计数与写入在存储层原子完成，锁定状态以存储中的为准
        let outcome = self
            .deps
            .timeouts
            .point(
                "chatrooms.append_message",
                self.deps
                    .chatroom_repository
                    .append_message(message, LOCKED_MESSAGE_LIMIT),
            )
            .await?;

        match outcome {
            AppendOutcome::Appended(message) => Ok(message),
            AppendOutcome::LimitReached => {
                tracing::debug!(
                    chatroom_id = %chatroom_id,
                    user_id = %user_id,
                    "locked chatroom message limit reached"
                );
                Err(DomainError::ChatroomLockedLimitReached.into())
            }
        }
    }

    /// 按创建顺序返回消息
    pub async fn get_messages(
        &self,
        user_id: UserId,
        chatroom_id: ChatroomId,
    ) -> ApplicationResult<Vec<Message>> {
        let chatroom = self.load_chatroom(chatroom_id).await?;
        if !chatroom.is_participant(user_id) {
            return Err(DomainError::NotChatroomParticipant.into());
        }

        let messages = self
            .deps
            .timeouts
            .scan(
                "chatrooms.list_messages",
                self.deps.chatroom_repository.list_messages(chatroom_id),
            )
            .await?;
        Ok(messages)
    }

    /// 已接受链接对应的聊天室
    pub async fn chatroom_for_link(
        &self,
        user_id: UserId,
        link_id: LinkId,
    ) -> ApplicationResult<Chatroom> {
        let link = self
            .deps
            .timeouts
            .point(
                "links.find_by_id",
                self.deps.link_repository.find_by_id(link_id),
            )
            .await?
            .ok_or(DomainError::LinkNotFound)?;
        if !link.is_participant(user_id) {
            return Err(DomainError::NotLinkParticipant.into());
        }

        let chatroom = self
            .deps
            .timeouts
            .point(
                "chatrooms.find_by_link",
                self.deps.chatroom_repository.find_by_link(link_id),
            )
            .await?
            .ok_or(DomainError::ChatroomNotFound)?;
        Ok(chatroom)
    }

    async fn unlock_if_locked(
        &self,
        chatroom_id: ChatroomId,
        now: Timestamp,
    ) -> ApplicationResult<bool> {
        let unlocked = self
            .deps
            .timeouts
            .point(
                "chatrooms.unlock_if_locked",
                self.deps
                    .chatroom_repository
                    .unlock_if_locked(chatroom_id, now),
            )
            .await?;
        Ok(unlocked)
    }

    async fn load_chatroom(&self, chatroom_id: ChatroomId) -> ApplicationResult<Chatroom> {
        let chatroom = self
            .deps
            .timeouts
            .point(
                "chatrooms.find_by_id",
                self.deps.chatroom_repository.find_by_id(chatroom_id),
            )
            .await?
            .ok_or(DomainError::ChatroomNotFound)?;
        Ok(chatroom)
    }
}

use serde::{Deserialize, Serialize};

use crate::value_objects::{ChatroomId, LinkId, MessageContent, MessageId, Timestamp, UserId};

/// 锁定状态下整个聊天室允许的消息总数（每人一条“预览”消息）。
/// 固定值，如有需要再改为可配置。
pub const LOCKED_MESSAGE_LIMIT: u32 = 2;

/// 链接被接受后创建的聊天室
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chatroom {
    pub id: ChatroomId,
    pub link_id: LinkId,
    pub user_a_id: UserId,
    pub user_b_id: UserId,
    pub is_locked: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Chatroom {
    /// 新聊天室总是处于锁定状态
    pub fn for_link(
        id: ChatroomId,
        link_id: LinkId,
        user_a_id: UserId,
        user_b_id: UserId,
        now: Timestamp,
    ) -> Self {
        Self {
            id,
            link_id,
            user_a_id,
            user_b_id,
            is_locked: true,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_participant(&self, user_id: UserId) -> bool {
        self.user_a_id == user_id || self.user_b_id == user_id
    }

    pub fn unlock(&mut self, now: Timestamp) {
        self.is_locked = false;
        self.updated_at = now;
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub chatroom_id: ChatroomId,
    pub sender_id: UserId,
    pub content: MessageContent,
    pub created_at: Timestamp,
}

impl Message {
    pub fn new(
        id: MessageId,
        chatroom_id: ChatroomId,
        sender_id: UserId,
        content: MessageContent,
        created_at: Timestamp,
    ) -> Self {
        Self {
            id,
            chatroom_id,
            sender_id,
            content,
            created_at,
        }
    }
}

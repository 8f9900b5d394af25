//! 进程内存储
//!
//! 三个存储接口共用一把 `RwLock`，每个条件写都在一次写锁内完成，
//! 与 PostgreSQL 实现的单语句条件更新语义一致。用于单进程部署和测试。

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use domain::{
    AppendOutcome, CandidateQuery, Chatroom, ChatroomId, ChatroomRepository, GeoPoint, Link,
    LinkId, LinkRepository, LinkStatus, Message, RepositoryError, RepositoryResult, Timestamp,
    User, UserEmail, UserId, UserRepository,
};
use rand::seq::IndexedRandom;
use tokio::sync::RwLock;

#[derive(Default)]
struct MemoryState {
    users: HashMap<UserId, User>,
    links: HashMap<LinkId, Link>,
    chatrooms: HashMap<ChatroomId, Chatroom>,
    /// 按追加顺序保存
    messages: HashMap<ChatroomId, Vec<Message>>,
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<RwLock<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn pick_random(candidates: &[&User]) -> Option<User> {
    let mut rng = rand::rng();
    candidates.choose(&mut rng).map(|user| (*user).clone())
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn create(&self, user: User) -> RepositoryResult<User> {
        let mut state = self.state.write().await;
        if state.users.contains_key(&user.id) || state.users.values().any(|u| u.email == user.email)
        {
            return Err(RepositoryError::Conflict);
        }
        state.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn update(&self, user: User) -> RepositoryResult<User> {
        let mut state = self.state.write().await;
        if state
            .users
            .values()
            .any(|u| u.id != user.id && u.email == user.email)
        {
            return Err(RepositoryError::Conflict);
        }
        let stored = state
            .users
            .get_mut(&user.id)
            .ok_or(RepositoryError::NotFound)?;

        // 搜索标记、链接引用与位置只通过各自的条件写修改
        stored.username = user.username;
        stored.email = user.email;
        stored.profile = user.profile;
        stored.preferences = user.preferences;
        stored.updated_at = user.updated_at;
        Ok(stored.clone())
    }

    async fn find_by_id(&self, id: UserId) -> RepositoryResult<Option<User>> {
        Ok(self.state.read().await.users.get(&id).cloned())
    }

    async fn find_by_email(&self, email: UserEmail) -> RepositoryResult<Option<User>> {
        let state = self.state.read().await;
        Ok(state.users.values().find(|u| u.email == email).cloned())
    }

    async fn find_candidate(&self, query: &CandidateQuery) -> RepositoryResult<Option<User>> {
        let state = self.state.read().await;
        let eligible: Vec<&User> = state.users.values().filter(|u| query.matches(u)).collect();
        Ok(pick_random(&eligible))
    }

    async fn list_candidates(
        &self,
        query: &CandidateQuery,
        limit: u32,
    ) -> RepositoryResult<Vec<User>> {
        let state = self.state.read().await;
        let mut eligible: Vec<(f64, &User)> = state
            .users
            .values()
            .filter(|u| query.matches(u))
            .filter_map(|u| {
                u.location
                    .map(|location| (query.origin.distance_meters(&location), u))
            })
            .collect();
        eligible.sort_by(|a, b| a.0.total_cmp(&b.0));

        Ok(eligible
            .into_iter()
            .take(limit as usize)
            .map(|(_, u)| u.clone())
            .collect())
    }

    async fn update_location(
        &self,
        id: UserId,
        location: GeoPoint,
        now: Timestamp,
    ) -> RepositoryResult<()> {
        let mut state = self.state.write().await;
        let user = state.users.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        user.move_to(location, now);
        Ok(())
    }

    async fn set_searching(
        &self,
        id: UserId,
        searching: bool,
        now: Timestamp,
    ) -> RepositoryResult<bool> {
        let mut state = self.state.write().await;
        let user = state.users.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        if searching {
            Ok(user.start_searching(now).is_ok())
        } else {
            user.stop_searching(now);
            Ok(true)
        }
    }

    async fn claim_for_link(
        &self,
        id: UserId,
        link_id: LinkId,
        now: Timestamp,
    ) -> RepositoryResult<bool> {
        let mut state = self.state.write().await;
        Ok(state
            .users
            .get_mut(&id)
            .is_some_and(|user| user.claim_for_link(link_id, now)))
    }

    async fn release_from_link(
        &self,
        id: UserId,
        link_id: LinkId,
        now: Timestamp,
    ) -> RepositoryResult<bool> {
        let mut state = self.state.write().await;
        Ok(state
            .users
            .get_mut(&id)
            .is_some_and(|user| user.release_from_link(link_id, now)))
    }
}

#[async_trait]
impl LinkRepository for MemoryStore {
    async fn create(&self, link: Link) -> RepositoryResult<Link> {
        let mut state = self.state.write().await;
        if state.links.contains_key(&link.id) {
            return Err(RepositoryError::Conflict);
        }
        state.links.insert(link.id, link.clone());
        Ok(link)
    }

    async fn find_by_id(&self, id: LinkId) -> RepositoryResult<Option<Link>> {
        Ok(self.state.read().await.links.get(&id).cloned())
    }

    async fn transition_from_pending(
        &self,
        id: LinkId,
        status: LinkStatus,
        now: Timestamp,
    ) -> RepositoryResult<Option<Link>> {
        let mut state = self.state.write().await;
        let link = state.links.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        match link.transition(status, now) {
            Ok(()) => Ok(Some(link.clone())),
            Err(_) => Ok(None),
        }
    }

    async fn expire_overdue(&self, now: Timestamp) -> RepositoryResult<Vec<Link>> {
        let mut state = self.state.write().await;
        let mut expired = Vec::new();
        for link in state.links.values_mut() {
            if link.is_overdue(now) && link.transition(LinkStatus::Expired, now).is_ok() {
                expired.push(link.clone());
            }
        }
        Ok(expired)
    }

    async fn list_awaiting_release(&self, limit: u32) -> RepositoryResult<Vec<Link>> {
        let state = self.state.read().await;
        let mut awaiting: Vec<Link> = state
            .links
            .values()
            .filter(|link| link.awaits_release())
            .cloned()
            .collect();
        awaiting.sort_by_key(|link| link.updated_at);
        awaiting.truncate(limit as usize);
        Ok(awaiting)
    }

    async fn mark_released(&self, id: LinkId, now: Timestamp) -> RepositoryResult<()> {
        let mut state = self.state.write().await;
        let link = state.links.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        link.mark_released(now);
        Ok(())
    }
}

#[async_trait]
impl ChatroomRepository for MemoryStore {
    async fn create(&self, chatroom: Chatroom) -> RepositoryResult<Chatroom> {
        let mut state = self.state.write().await;
        if state.chatrooms.contains_key(&chatroom.id)
            || state
                .chatrooms
                .values()
                .any(|room| room.link_id == chatroom.link_id)
        {
            return Err(RepositoryError::Conflict);
        }
        state.chatrooms.insert(chatroom.id, chatroom.clone());
        Ok(chatroom)
    }

    async fn find_by_id(&self, id: ChatroomId) -> RepositoryResult<Option<Chatroom>> {
        Ok(self.state.read().await.chatrooms.get(&id).cloned())
    }

    async fn find_by_link(&self, link_id: LinkId) -> RepositoryResult<Option<Chatroom>> {
        let state = self.state.read().await;
        Ok(state
            .chatrooms
            .values()
            .find(|room| room.link_id == link_id)
            .cloned())
    }

    async fn unlock_if_locked(&self, id: ChatroomId, now: Timestamp) -> RepositoryResult<bool> {
        let mut state = self.state.write().await;
        let room = state
            .chatrooms
            .get_mut(&id)
            .ok_or(RepositoryError::NotFound)?;
        if !room.is_locked {
            return Ok(false);
        }
        room.unlock(now);
        Ok(true)
    }

    async fn append_message(
        &self,
        message: Message,
        locked_cap: u32,
    ) -> RepositoryResult<AppendOutcome> {
        let mut state = self.state.write().await;
        let is_locked = state
            .chatrooms
            .get(&message.chatroom_id)
            .ok_or(RepositoryError::NotFound)?
            .is_locked;

        let messages = state.messages.entry(message.chatroom_id).or_default();
        if is_locked && messages.len() >= locked_cap as usize {
            return Ok(AppendOutcome::LimitReached);
        }
        messages.push(message.clone());
        Ok(AppendOutcome::Appended(message))
    }

    async fn list_messages(&self, chatroom_id: ChatroomId) -> RepositoryResult<Vec<Message>> {
        let state = self.state.read().await;
        Ok(state.messages.get(&chatroom_id).cloned().unwrap_or_default())
    }
}

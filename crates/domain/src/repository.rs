//! 存储接口定义
//!
//! 领域层只定义接口，具体的存储后端（内存 / PostgreSQL）在基础设施层实现。
//! 所有跨实体一致性都依赖这里声明的条件写，而不是进程内锁。

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::chatroom::{Chatroom, Message};
use crate::errors::RepositoryResult;
use crate::link::{Link, LinkStatus};
use crate::user::User;
use crate::value_objects::{
    ChatroomId, Gender, GeoPoint, LinkId, Timestamp, UserEmail, UserId,
};

/// 候选人查询条件，由搜索者的资料与偏好推导而来
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateQuery {
    pub exclude_id: UserId,
    /// 候选人性别必须落在其中
    pub genders: Vec<Gender>,
    /// 候选人出生日期区间（两端包含）
    pub earliest_birth_date: NaiveDate,
    pub latest_birth_date: NaiveDate,
    /// 反向偏好：候选人必须接受这个性别与年龄
    pub seeker_gender: Gender,
    pub seeker_age: u32,
    pub origin: GeoPoint,
    pub radius_meters: f64,
}

impl CandidateQuery {
    /// `seeker` 没有位置时无法进行半径查询，返回 `None`
    pub fn for_seeker(seeker: &User, today: NaiveDate, radius_meters: f64) -> Option<Self> {
        let origin = seeker.location?;
        let (earliest, latest) = seeker.preferences.age_range.birth_date_bounds(today);
        Some(Self {
            exclude_id: seeker.id,
            genders: seeker.preferences.genders.clone(),
            earliest_birth_date: earliest,
            latest_birth_date: latest,
            seeker_gender: seeker.profile.gender,
            seeker_age: seeker.profile.age_on(today),
            origin,
            radius_meters,
        })
    }

    /// 内存实现与测试使用的同一套判定规则
    pub fn matches(&self, candidate: &User) -> bool {
        let Some(location) = candidate.location else {
            return false;
        };
        candidate.id != self.exclude_id
            && candidate.is_searching
            && candidate.current_link_id.is_none()
            && self.genders.contains(&candidate.profile.gender)
            && candidate.profile.date_of_birth >= self.earliest_birth_date
            && candidate.profile.date_of_birth <= self.latest_birth_date
            && candidate.preferences.genders.contains(&self.seeker_gender)
            && candidate.preferences.age_range.contains(self.seeker_age)
            && self.origin.distance_meters(&location) <= self.radius_meters
    }
}

/// 候选人存储（用户）
#[cfg_attr(feature = "testing", mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create(&self, user: User) -> RepositoryResult<User>;

    /// 整体覆盖用户资料；不得用于修改 `is_searching` / `current_link_id`
    async fn update(&self, user: User) -> RepositoryResult<User>;

    async fn find_by_id(&self, id: UserId) -> RepositoryResult<Option<User>>;

    async fn find_by_email(&self, email: UserEmail) -> RepositoryResult<Option<User>>;

    /// 随机返回一个满足条件的候选人
    async fn find_candidate(&self, query: &CandidateQuery) -> RepositoryResult<Option<User>>;

    /// 列出最多 `limit` 个满足条件的候选人（只读预览）
    async fn list_candidates(
        &self,
        query: &CandidateQuery,
        limit: u32,
    ) -> RepositoryResult<Vec<User>>;

    async fn update_location(
        &self,
        id: UserId,
        location: GeoPoint,
        now: Timestamp,
    ) -> RepositoryResult<()>;

    /// 设置搜索状态；`searching = true` 仅在用户未持有链接时生效，返回是否生效
    async fn set_searching(
        &self,
        id: UserId,
        searching: bool,
        now: Timestamp,
    ) -> RepositoryResult<bool>;

    /// 条件写：仅当 `is_searching = true` 且 `current_link_id` 为空时，
    /// 设置 `current_link_id = link_id`、`is_searching = false`
    async fn claim_for_link(
        &self,
        id: UserId,
        link_id: LinkId,
        now: Timestamp,
    ) -> RepositoryResult<bool>;

    /// 条件写：仅当 `current_link_id = link_id` 时清空并恢复搜索
    async fn release_from_link(
        &self,
        id: UserId,
        link_id: LinkId,
        now: Timestamp,
    ) -> RepositoryResult<bool>;
}

/// 链接存储
#[cfg_attr(feature = "testing", mockall::automock)]
#[async_trait]
pub trait LinkRepository: Send + Sync {
    async fn create(&self, link: Link) -> RepositoryResult<Link>;

    async fn find_by_id(&self, id: LinkId) -> RepositoryResult<Option<Link>>;

    /// 条件迁移：仅当当前状态为 pending 时把状态改为 `status`。
    /// 返回迁移后的链接；若链接已处于终态则返回 `None`。
    async fn transition_from_pending(
        &self,
        id: LinkId,
        status: LinkStatus,
        now: Timestamp,
    ) -> RepositoryResult<Option<Link>>;

    /// 把所有 `expires_at < now` 的 pending 链接标记为 expired，并返回本次被标记的链接
    async fn expire_overdue(&self, now: Timestamp) -> RepositoryResult<Vec<Link>>;

    /// 已 rejected / expired 但释放副作用尚未完成的链接
    async fn list_awaiting_release(&self, limit: u32) -> RepositoryResult<Vec<Link>>;

    async fn mark_released(&self, id: LinkId, now: Timestamp) -> RepositoryResult<()>;
}

/// 追加消息的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppendOutcome {
    Appended(Message),
    /// 聊天室仍处于锁定状态且已达到消息上限
    LimitReached,
}

/// 聊天室与消息存储
#[cfg_attr(feature = "testing", mockall::automock)]
#[async_trait]
pub trait ChatroomRepository: Send + Sync {
    /// 每个链接最多一个聊天室；重复创建返回 `RepositoryError::Conflict`
    async fn create(&self, chatroom: Chatroom) -> RepositoryResult<Chatroom>;

    async fn find_by_id(&self, id: ChatroomId) -> RepositoryResult<Option<Chatroom>>;

    async fn find_by_link(&self, link_id: LinkId) -> RepositoryResult<Option<Chatroom>>;

    /// 条件解锁：仅当聊天室仍锁定时写入。返回 `false` 表示已被解锁过。
    async fn unlock_if_locked(&self, id: ChatroomId, now: Timestamp) -> RepositoryResult<bool>;

    /// 追加消息。若存储中的聊天室仍锁定且消息数已达 `locked_cap`，
    /// 不写入并返回 `LimitReached`；计数与写入是原子的。
    async fn append_message(
        &self,
        message: Message,
        locked_cap: u32,
    ) -> RepositoryResult<AppendOutcome>;

    /// 按创建顺序返回消息
    async fn list_messages(&self, chatroom_id: ChatroomId) -> RepositoryResult<Vec<Message>>;
}

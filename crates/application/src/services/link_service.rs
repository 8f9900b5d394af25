//! 链接生命周期
//!
//! pending 链接只会迁移一次：接受、拒绝或过期。并发的响应与清扫之间
//! 没有进程内锁，唯一的并发原语是存储层的“仅当仍为 pending 时迁移”条件写，
//! 先提交者获胜，只有获胜方执行释放副作用。

use std::collections::HashSet;
use std::sync::Arc;

use domain::{
    Chatroom, ChatroomId, ChatroomRepository, DomainError, Link, LinkId, LinkRepository,
    LinkStatus, RepositoryError, Timestamp, User, UserId, UserRepository,
};

use crate::clock::Clock;
use crate::error::ApplicationResult;
use crate::services::match_finder::MatchFinder;
use crate::timeouts::StoreTimeouts;

/// 候选人被并发抢走时的最大重试次数
const MAX_MATCH_ATTEMPTS: usize = 3;

pub struct LinkServiceDependencies {
    pub user_repository: Arc<dyn UserRepository>,
    pub link_repository: Arc<dyn LinkRepository>,
    pub chatroom_repository: Arc<dyn ChatroomRepository>,
    pub match_finder: Arc<MatchFinder>,
    pub clock: Arc<dyn Clock>,
    pub timeouts: StoreTimeouts,
    /// 每次清扫最多补做多少条链接的释放
    pub sweep_batch_limit: u32,
}

/// 响应链接的结果；接受时带上新建的聊天室
#[derive(Debug, Clone, PartialEq)]
pub struct LinkResponse {
    pub link: Link,
    pub chatroom: Option<Chatroom>,
}

/// 一次清扫的统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// 本次新标记为 expired 的链接数
    pub expired: usize,
    /// 完成释放的链接数（含之前遗留的 rejected / expired）
    pub released: usize,
    /// 释放失败、留待下次清扫的链接数
    pub failed: usize,
}

impl SweepReport {
    pub fn is_idle(&self) -> bool {
        self.expired == 0 && self.released == 0 && self.failed == 0
    }
}

pub struct LinkService {
    deps: LinkServiceDependencies,
}

impl LinkService {
    pub fn new(deps: LinkServiceDependencies) -> Self {
        Self { deps }
    }

    /// 为搜索中的用户寻找候选人并创建 pending 链接，双方同时退出搜索
    pub async fn find_match(&self, user_id: UserId) -> ApplicationResult<Link> {
        let seeker = self.load_user(user_id).await?;
        if seeker.has_active_link() {
            return Err(DomainError::UserAlreadyLinked.into());
        }
        if !seeker.is_searching {
            return Err(DomainError::UserNotSearching.into());
        }

        let ttl = self.deps.match_finder.settings().link_ttl;
        for attempt in 1..=MAX_MATCH_ATTEMPTS {
            let Some(candidate) = self.deps.match_finder.find_candidate(&seeker).await? else {
                break;
            };

            let now = self.deps.clock.now();
            let link = Link::pending(LinkId::generate(), seeker.id, candidate.id, now, ttl)?;
            let link = self
                .deps
                .timeouts
                .point("links.create", self.deps.link_repository.create(link))
                .await?;

            // 认领失败时链接作废；认领调用本身出错时链接留在 pending，
            // 由清扫在过期后释放
            if !self.claim(seeker.id, link.id, now).await? {
                self.abandon(&link).await;
                return Err(DomainError::UserNotSearching.into());
            }
            if !self.claim(candidate.id, link.id, now).await? {
                tracing::debug!(
                    link_id = %link.id,
                    candidate_id = %candidate.id,
                    attempt,
                    "candidate was claimed concurrently, retrying"
                );
                self.abandon(&link).await;
                continue;
            }

            tracing::info!(
                link_id = %link.id,
                user_a_id = %link.user_a_id,
                user_b_id = %link.user_b_id,
                expires_at = %link.expires_at,
                "link created"
            );
            return Ok(link);
        }

        Err(DomainError::NoMatchFound.into())
    }

    /// 参与者接受或拒绝 pending 链接
    pub async fn respond_to_link(
        &self,
        user_id: UserId,
        link_id: LinkId,
        accept: bool,
    ) -> ApplicationResult<LinkResponse> {
        let link = self.load_link(link_id).await?;
        if !link.is_participant(user_id) {
            return Err(DomainError::NotLinkParticipant.into());
        }
        if link.status.is_terminal() {
            return Err(DomainError::link_already_resolved(link.status).into());
        }

        let next = if accept {
            LinkStatus::Accepted
        } else {
            LinkStatus::Rejected
        };
        let now = self.deps.clock.now();
        let Some(link) = self
            .deps
            .timeouts
            .point(
                "links.transition_from_pending",
                self.deps
                    .link_repository
                    .transition_from_pending(link_id, next, now),
            )
            .await?
        else {
            // 另一个响应或清扫先提交了
            let current = self.load_link(link_id).await?;
            return Err(DomainError::link_already_resolved(current.status).into());
        };

        tracing::info!(
            link_id = %link.id,
            user_id = %user_id,
            status = %link.status,
            "link resolved"
        );

        if accept {
            let chatroom = self.open_chatroom(&link, now).await?;
            return Ok(LinkResponse {
                link,
                chatroom: Some(chatroom),
            });
        }

        let link = match self.release_participants(&link).await {
            Ok(released) => released,
            Err(err) => {
                // 迁移已提交；released_at 仍为空，下次清扫会补做释放
                tracing::warn!(
                    link_id = %link.id,
                    error = %err,
                    "release after rejection failed, deferring to sweep"
                );
                link
            }
        };
        Ok(LinkResponse {
            link,
            chatroom: None,
        })
    }

    pub async fn get_link(&self, user_id: UserId, link_id: LinkId) -> ApplicationResult<Link> {
        let link = self.load_link(link_id).await?;
        if !link.is_participant(user_id) {
            return Err(DomainError::NotLinkParticipant.into());
        }
        Ok(link)
    }

    /// 一次过期清扫：
    /// 1. 把所有超时的 pending 链接标记为 expired；
    /// 2. 释放所有 rejected / expired 但尚未释放的链接的参与者。
    ///
    /// 单条链接的释放失败不会影响其余链接。
    pub async fn run_expiration_sweep(&self) -> ApplicationResult<SweepReport> {
        let now = self.deps.clock.now();
        let expired = self
            .deps
            .timeouts
            .scan(
                "links.expire_overdue",
                self.deps.link_repository.expire_overdue(now),
            )
            .await?;
        for link in &expired {
            tracing::info!(link_id = %link.id, expires_at = %link.expires_at, "link expired");
        }

        let awaiting = self
            .deps
            .timeouts
            .scan(
                "links.list_awaiting_release",
                self.deps
                    .link_repository
                    .list_awaiting_release(self.deps.sweep_batch_limit),
            )
            .await?;

        let mut report = SweepReport {
            expired: expired.len(),
            ..SweepReport::default()
        };
        let mut seen = HashSet::new();
        for link in expired.iter().chain(awaiting.iter()) {
            if !seen.insert(link.id) {
                continue;
            }
            match self.release_participants(link).await {
                Ok(_) => report.released += 1,
                Err(err) => {
                    report.failed += 1;
                    tracing::warn!(
                        link_id = %link.id,
                        error = %err,
                        "failed to release link participants, will retry next sweep"
                    );
                }
            }
        }

        Ok(report)
    }

    /// 把双方放回搜索池。条件写保证已进入新链接的用户不受影响。
    async fn release_participants(&self, link: &Link) -> ApplicationResult<Link> {
        let now = self.deps.clock.now();
        for participant in link.participants() {
            let released = self
                .deps
                .timeouts
                .point(
                    "users.release_from_link",
                    self.deps
                        .user_repository
                        .release_from_link(participant, link.id, now),
                )
                .await?;
            if !released {
                tracing::debug!(
                    link_id = %link.id,
                    user_id = %participant,
                    "participant no longer holds this link"
                );
            }
        }

        self.deps
            .timeouts
            .point(
                "links.mark_released",
                self.deps.link_repository.mark_released(link.id, now),
            )
            .await?;

        let mut released = link.clone();
        released.mark_released(now);
        Ok(released)
    }

    async fn claim(
        &self,
        user_id: UserId,
        link_id: LinkId,
        now: Timestamp,
    ) -> ApplicationResult<bool> {
        let claimed = self
            .deps
            .timeouts
            .point(
                "users.claim_for_link",
                self.deps
                    .user_repository
                    .claim_for_link(user_id, link_id, now),
            )
            .await?;
        Ok(claimed)
    }

    /// 撤销认领未完成的链接，尽力而为；失败时由清扫兜底
    async fn abandon(&self, link: &Link) {
        let now = self.deps.clock.now();
        let expired = self
            .deps
            .timeouts
            .point(
                "links.transition_from_pending",
                self.deps
                    .link_repository
                    .transition_from_pending(link.id, LinkStatus::Expired, now),
            )
            .await;

        match expired {
            Ok(Some(expired)) => {
                if let Err(err) = self.release_participants(&expired).await {
                    tracing::warn!(
                        link_id = %link.id,
                        error = %err,
                        "failed to release abandoned link"
                    );
                }
            }
            Ok(None) => {}
            Err(err) => {
                tracing::warn!(
                    link_id = %link.id,
                    error = %err,
                    "failed to expire abandoned link"
                );
            }
        }
    }

    async fn open_chatroom(&self, link: &Link, now: Timestamp) -> ApplicationResult<Chatroom> {
        let chatroom = Chatroom::for_link(
            ChatroomId::generate(),
            link.id,
            link.user_a_id,
            link.user_b_id,
            now,
        );
        let created = self
            .deps
            .timeouts
            .point(
                "chatrooms.create",
                self.deps.chatroom_repository.create(chatroom),
            )
            .await;

        match created {
            Ok(chatroom) => {
                tracing::info!(
                    link_id = %link.id,
                    chatroom_id = %chatroom.id,
                    "chatroom opened"
                );
                Ok(chatroom)
            }
            Err(RepositoryError::Conflict) => {
                let existing = self
                    .deps
                    .timeouts
                    .point(
                        "chatrooms.find_by_link",
                        self.deps.chatroom_repository.find_by_link(link.id),
                    )
                    .await?;
                Ok(existing.ok_or(DomainError::ChatroomNotFound)?)
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn load_user(&self, user_id: UserId) -> ApplicationResult<User> {
        let user = self
            .deps
            .timeouts
            .point(
                "users.find_by_id",
                self.deps.user_repository.find_by_id(user_id),
            )
            .await?
            .ok_or(DomainError::UserNotFound)?;
        Ok(user)
    }

    async fn load_link(&self, link_id: LinkId) -> ApplicationResult<Link> {
        let link = self
            .deps
            .timeouts
            .point(
                "links.find_by_id",
                self.deps.link_repository.find_by_id(link_id),
            )
            .await?
            .ok_or(DomainError::LinkNotFound)?;
        Ok(link)
    }
}

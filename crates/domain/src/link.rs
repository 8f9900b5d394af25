use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::DomainError;
use crate::value_objects::{LinkId, Timestamp, UserId};

/// pending 链接的存活时间
pub const LINK_TTL: Duration = Duration::from_secs(30);

/// 候选人搜索半径（米）
pub const MATCH_RADIUS_METERS: f64 = 200.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkStatus {
    Pending,
    Accepted,
    Rejected,
    Expired,
}

impl LinkStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LinkStatus::Pending => "pending",
            LinkStatus::Accepted => "accepted",
            LinkStatus::Rejected => "rejected",
            LinkStatus::Expired => "expired",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, LinkStatus::Pending)
    }

    /// 终态中需要把双方放回搜索池的那些
    pub fn releases_participants(&self) -> bool {
        matches!(self, LinkStatus::Rejected | LinkStatus::Expired)
    }

    /// 唯一合法的迁移：pending → {accepted, rejected, expired}
    pub fn can_transition_to(&self, next: LinkStatus) -> bool {
        matches!(self, LinkStatus::Pending) && next.is_terminal()
    }
}

impl fmt::Display for LinkStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LinkStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(LinkStatus::Pending),
            "accepted" => Ok(LinkStatus::Accepted),
            "rejected" => Ok(LinkStatus::Rejected),
            "expired" => Ok(LinkStatus::Expired),
            other => Err(DomainError::invalid_argument(
                "link_status",
                format!("unknown status `{other}`"),
            )),
        }
    }
}

/// 两个用户之间限时的配对提议
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub id: LinkId,
    pub user_a_id: UserId,
    pub user_b_id: UserId,
    pub status: LinkStatus,
    pub created_at: Timestamp,
    pub expires_at: Timestamp,
    pub updated_at: Timestamp,
    /// 释放副作用（双方回到搜索池）已完成的时间；只对 rejected / expired 有意义
    #[serde(skip_serializing_if = "Option::is_none")]
    pub released_at: Option<Timestamp>,
}

impl Link {
    pub fn pending(
        id: LinkId,
        user_a_id: UserId,
        user_b_id: UserId,
        now: Timestamp,
        ttl: Duration,
    ) -> Result<Self, DomainError> {
        if user_a_id == user_b_id {
            return Err(DomainError::SelfLink);
        }
        let ttl = chrono::Duration::from_std(ttl)
            .map_err(|_| DomainError::invalid_argument("link_ttl", "out of range"))?;
        Ok(Self {
            id,
            user_a_id,
            user_b_id,
            status: LinkStatus::Pending,
            created_at: now,
            expires_at: now + ttl,
            updated_at: now,
            released_at: None,
        })
    }

    pub fn is_participant(&self, user_id: UserId) -> bool {
        self.user_a_id == user_id || self.user_b_id == user_id
    }

    pub fn participants(&self) -> [UserId; 2] {
        [self.user_a_id, self.user_b_id]
    }

    pub fn is_overdue(&self, now: Timestamp) -> bool {
        self.status == LinkStatus::Pending && self.expires_at < now
    }

    pub fn awaits_release(&self) -> bool {
        self.status.releases_participants() && self.released_at.is_none()
    }

    /// 在内存中执行一次状态迁移；存储层用同样的规则做条件写
    pub fn transition(&mut self, next: LinkStatus, now: Timestamp) -> Result<(), DomainError> {
        if !self.status.can_transition_to(next) {
            return Err(DomainError::link_already_resolved(self.status));
        }
        self.status = next;
        self.updated_at = now;
        Ok(())
    }

    pub fn mark_released(&mut self, now: Timestamp) {
        if self.released_at.is_none() {
            self.released_at = Some(now);
        }
    }
}

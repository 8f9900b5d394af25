use std::sync::Arc;
use std::time::Duration;

use domain::{
    CandidateQuery, DomainError, User, UserId, UserRepository, LINK_TTL, MATCH_RADIUS_METERS,
};

use crate::clock::Clock;
use crate::error::ApplicationResult;
use crate::timeouts::StoreTimeouts;

/// 候选预览一次最多返回的人数
pub const MAX_PREVIEW_LIMIT: u32 = 50;

/// 可按部署调整的配对参数，默认值取自领域常量
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchingSettings {
    pub radius_meters: f64,
    pub link_ttl: Duration,
}

impl Default for MatchingSettings {
    fn default() -> Self {
        Self {
            radius_meters: MATCH_RADIUS_METERS,
            link_ttl: LINK_TTL,
        }
    }
}

pub struct MatchFinderDependencies {
    pub user_repository: Arc<dyn UserRepository>,
    pub clock: Arc<dyn Clock>,
    pub timeouts: StoreTimeouts,
    pub settings: MatchingSettings,
}

/// 根据双向偏好和距离为搜索中的用户挑选候选人
pub struct MatchFinder {
    deps: MatchFinderDependencies,
}

impl MatchFinder {
    pub fn new(deps: MatchFinderDependencies) -> Self {
        Self { deps }
    }

    pub fn settings(&self) -> &MatchingSettings {
        &self.deps.settings
    }

    /// 随机返回一个合格的候选人；没有时返回 `None`。
    ///
    /// 调用方负责确认 `seeker.is_searching`。
    pub async fn find_candidate(&self, seeker: &User) -> ApplicationResult<Option<User>> {
        let query = self.query_for(seeker)?;
        let candidate = self
            .deps
            .timeouts
            .scan(
                "users.find_candidate",
                self.deps.user_repository.find_candidate(&query),
            )
            .await?;

        if let Some(candidate) = &candidate {
            tracing::debug!(
                user_id = %seeker.id,
                candidate_id = %candidate.id,
                "candidate found"
            );
        }
        Ok(candidate)
    }

    /// 只读预览：列出满足同样条件的候选人，不创建链接
    pub async fn search_candidates(
        &self,
        user_id: UserId,
        limit: u32,
    ) -> ApplicationResult<Vec<User>> {
        if !(1..=MAX_PREVIEW_LIMIT).contains(&limit) {
            return Err(DomainError::invalid_argument(
                "limit",
                format!("must be between 1 and {MAX_PREVIEW_LIMIT}"),
            )
            .into());
        }

        let seeker = self
            .deps
            .timeouts
            .point(
                "users.find_by_id",
                self.deps.user_repository.find_by_id(user_id),
            )
            .await?
            .ok_or(DomainError::UserNotFound)?;
        let query = self.query_for(&seeker)?;

        let candidates = self
            .deps
            .timeouts
            .scan(
                "users.list_candidates",
                self.deps.user_repository.list_candidates(&query, limit),
            )
            .await?;
        Ok(candidates)
    }

    fn query_for(&self, seeker: &User) -> ApplicationResult<CandidateQuery> {
        CandidateQuery::for_seeker(
            seeker,
            self.deps.clock.today(),
            self.deps.settings.radius_meters,
        )
        .ok_or_else(|| {
            DomainError::invalid_argument("location", "a location is required to search").into()
        })
    }
}

use std::sync::Arc;

use application::{
    ChatroomGate, ChatroomGateDependencies, Clock, LinkService, LinkServiceDependencies,
    MatchFinder, MatchFinderDependencies, MatchingSettings, StoreTimeouts, UserService,
    UserServiceDependencies,
};
use infrastructure::Infrastructure;

/// 服务装配所需的可调参数
#[derive(Debug, Clone, Copy)]
pub struct EngineSettings {
    pub matching: MatchingSettings,
    pub timeouts: StoreTimeouts,
    pub sweep_batch_limit: u32,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            matching: MatchingSettings::default(),
            timeouts: StoreTimeouts::default(),
            sweep_batch_limit: 500,
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub user_service: Arc<UserService>,
    pub link_service: Arc<LinkService>,
    pub match_finder: Arc<MatchFinder>,
    pub chatroom_gate: Arc<ChatroomGate>,
    pub clock: Arc<dyn Clock>,
}

impl AppState {
    pub fn new(infra: &Infrastructure, clock: Arc<dyn Clock>, settings: EngineSettings) -> Self {
        let match_finder = Arc::new(MatchFinder::new(MatchFinderDependencies {
            user_repository: infra.user_repository.clone(),
            clock: clock.clone(),
            timeouts: settings.timeouts,
            settings: settings.matching,
        }));

        let link_service = Arc::new(LinkService::new(LinkServiceDependencies {
            user_repository: infra.user_repository.clone(),
            link_repository: infra.link_repository.clone(),
            chatroom_repository: infra.chatroom_repository.clone(),
            match_finder: match_finder.clone(),
            clock: clock.clone(),
            timeouts: settings.timeouts,
            sweep_batch_limit: settings.sweep_batch_limit,
        }));

        let chatroom_gate = Arc::new(ChatroomGate::new(ChatroomGateDependencies {
            chatroom_repository: infra.chatroom_repository.clone(),
            link_repository: infra.link_repository.clone(),
            clock: clock.clone(),
            timeouts: settings.timeouts,
        }));

        let user_service = Arc::new(UserService::new(UserServiceDependencies {
            user_repository: infra.user_repository.clone(),
            password_hasher: infra.password_hasher.clone(),
            clock: clock.clone(),
            timeouts: settings.timeouts,
        }));

        Self {
            user_service,
            link_service,
            match_finder,
            chatroom_gate,
            clock,
        }
    }
}

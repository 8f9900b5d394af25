mod chatroom_gate;
mod link_service;
mod match_finder;
mod sweeper;
mod user_service;

#[cfg(test)]
mod tests;

pub use chatroom_gate::{ChatroomGate, ChatroomGateDependencies};
pub use link_service::{LinkResponse, LinkService, LinkServiceDependencies, SweepReport};
pub use match_finder::{MatchFinder, MatchFinderDependencies, MatchingSettings, MAX_PREVIEW_LIMIT};
pub use sweeper::ExpirationSweeper;
pub use user_service::{
    AuthenticateUserRequest, PreferencesInput, RegisterUserRequest, UpdateAccountRequest,
    UserService, UserServiceDependencies,
};

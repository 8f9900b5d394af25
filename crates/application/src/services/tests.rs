//! 应用服务单元测试
//!
//! 用 mockall 生成的存储桩覆盖授权顺序、并发竞争、超时分类以及清扫的失败隔离。

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::{Duration as ChronoDuration, NaiveDate, TimeZone, Utc};
use domain::{
    AgeRange, AppendOutcome, Chatroom, ChatroomId, DomainError, Gender, GeoPoint, Link, LinkId,
    LinkStatus, MockChatroomRepository, MockLinkRepository, MockUserRepository, PasswordHash,
    Preferences, Profile, RepositoryError, Timestamp, User, UserEmail, UserId, Username,
    LINK_TTL,
};

use crate::clock::Clock;
use crate::error::{ApplicationError, ErrorKind};
use crate::password::MockPasswordHasher;
use crate::services::{
    AuthenticateUserRequest, ChatroomGate, ChatroomGateDependencies, LinkService,
    LinkServiceDependencies, MatchFinder, MatchFinderDependencies, MatchingSettings,
    PreferencesInput, RegisterUserRequest, UserService, UserServiceDependencies,
};
use crate::timeouts::StoreTimeouts;

struct FixedClock(Timestamp);

impl Clock for FixedClock {
    fn now(&self) -> Timestamp {
        self.0
    }
}

fn now() -> Timestamp {
    Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
}

fn profile(gender: Gender, born: (i32, u32, u32)) -> Profile {
    Profile {
        first_name: "Test".into(),
        last_name: "User".into(),
        date_of_birth: NaiveDate::from_ymd_opt(born.0, born.1, born.2).unwrap(),
        gender,
        bio: String::new(),
        profile_pic_url: None,
    }
}

fn searching_user(gender: Gender, wants: Gender) -> User {
    let mut user = User::register(
        UserId::generate(),
        Username::parse("tester").unwrap(),
        UserEmail::parse(format!("{}@example.com", UserId::generate())).unwrap(),
        PasswordHash::new("hashed").unwrap(),
        profile(gender, (1995, 1, 1)),
        Preferences::new(AgeRange::new(25, 35).unwrap(), vec![wants]).unwrap(),
        Some(GeoPoint::new(37.5665, 126.9780).unwrap()),
        now(),
    );
    user.start_searching(now()).unwrap();
    user
}

fn pending_link(a: UserId, b: UserId) -> Link {
    Link::pending(LinkId::generate(), a, b, now(), LINK_TTL).unwrap()
}

fn resolved(link: &Link, status: LinkStatus) -> Link {
    let mut link = link.clone();
    link.transition(status, now()).unwrap();
    link
}

fn link_service(
    users: MockUserRepository,
    links: MockLinkRepository,
    chatrooms: MockChatroomRepository,
) -> LinkService {
    let users: Arc<dyn domain::UserRepository> = Arc::new(users);
    let clock: Arc<dyn Clock> = Arc::new(FixedClock(now()));
    let match_finder = Arc::new(MatchFinder::new(MatchFinderDependencies {
        user_repository: users.clone(),
        clock: clock.clone(),
        timeouts: StoreTimeouts::default(),
        settings: MatchingSettings::default(),
    }));

    LinkService::new(LinkServiceDependencies {
        user_repository: users,
        link_repository: Arc::new(links),
        chatroom_repository: Arc::new(chatrooms),
        match_finder,
        clock,
        timeouts: StoreTimeouts::default(),
        sweep_batch_limit: 100,
    })
}

fn chatroom_gate(chatrooms: MockChatroomRepository, links: MockLinkRepository) -> ChatroomGate {
    ChatroomGate::new(ChatroomGateDependencies {
        chatroom_repository: Arc::new(chatrooms),
        link_repository: Arc::new(links),
        clock: Arc::new(FixedClock(now())),
        timeouts: StoreTimeouts::default(),
    })
}

fn assert_kind<T: std::fmt::Debug>(result: Result<T, ApplicationError>, kind: ErrorKind) {
    match result {
        Err(err) => assert_eq!(err.kind(), kind, "unexpected error: {err}"),
        Ok(value) => panic!("expected {kind:?}, got {value:?}"),
    }
}

#[tokio::test]
async fn find_match_claims_both_participants() {
    let seeker = searching_user(Gender::Male, Gender::Female);
    let candidate = searching_user(Gender::Female, Gender::Male);
    let (seeker_id, candidate_id) = (seeker.id, candidate.id);

    let mut users = MockUserRepository::new();
    users
        .expect_find_by_id()
        .returning(move |_| Ok(Some(seeker.clone())));
    users
        .expect_find_candidate()
        .withf(move |query| query.exclude_id == seeker_id && query.radius_meters == 200.0)
        .times(1)
        .returning(move |_| Ok(Some(candidate.clone())));
    users
        .expect_claim_for_link()
        .times(2)
        .returning(|_, _, _| Ok(true));

    let mut links = MockLinkRepository::new();
    links.expect_create().times(1).returning(|link| Ok(link));

    let service = link_service(users, links, MockChatroomRepository::new());
    let link = service.find_match(seeker_id).await.unwrap();

    assert_eq!(link.status, LinkStatus::Pending);
    assert_eq!(link.participants(), [seeker_id, candidate_id]);
    assert_eq!(link.expires_at - link.created_at, ChronoDuration::seconds(30));
}

#[tokio::test]
async fn find_match_without_candidates_leaves_seeker_untouched() {
    let seeker = searching_user(Gender::Male, Gender::Female);
    let seeker_id = seeker.id;

    let mut users = MockUserRepository::new();
    users
        .expect_find_by_id()
        .returning(move |_| Ok(Some(seeker.clone())));
    users.expect_find_candidate().returning(|_| Ok(None));
    users.expect_claim_for_link().never();

    let mut links = MockLinkRepository::new();
    links.expect_create().never();

    let service = link_service(users, links, MockChatroomRepository::new());
    assert_kind(service.find_match(seeker_id).await, ErrorKind::NoMatchFound);
}

#[tokio::test]
async fn find_match_requires_searching_user() {
    let mut idle = searching_user(Gender::Male, Gender::Female);
    idle.stop_searching(now());
    let idle_id = idle.id;

    let mut users = MockUserRepository::new();
    users
        .expect_find_by_id()
        .returning(move |_| Ok(Some(idle.clone())));
    users.expect_find_candidate().never();

    let service = link_service(users, MockLinkRepository::new(), MockChatroomRepository::new());
    let err = service.find_match(idle_id).await.unwrap_err();
    assert!(matches!(
        err,
        ApplicationError::Domain(DomainError::UserNotSearching)
    ));
}

#[tokio::test]
async fn find_match_retries_when_candidate_is_claimed_concurrently() {
    let seeker = searching_user(Gender::Male, Gender::Female);
    let taken = searching_user(Gender::Female, Gender::Male);
    let free = searching_user(Gender::Female, Gender::Male);
    let (seeker_id, taken_id, free_id) = (seeker.id, taken.id, free.id);

    let mut users = MockUserRepository::new();
    users
        .expect_find_by_id()
        .returning(move |_| Ok(Some(seeker.clone())));
    let searches = AtomicUsize::new(0);
    users.expect_find_candidate().times(2).returning(move |_| {
        if searches.fetch_add(1, Ordering::SeqCst) == 0 {
            Ok(Some(taken.clone()))
        } else {
            Ok(Some(free.clone()))
        }
    });
    users
        .expect_claim_for_link()
        .returning(move |user_id, _, _| Ok(user_id != taken_id));
    // 作废的链接只会把搜索者放回搜索池
    users
        .expect_release_from_link()
        .times(2)
        .returning(move |user_id, _, _| Ok(user_id == seeker_id));

    let mut links = MockLinkRepository::new();
    links.expect_create().times(2).returning(|link| Ok(link));
    links
        .expect_transition_from_pending()
        .withf(|_, status, _| *status == LinkStatus::Expired)
        .times(1)
        .returning(move |id, _, _| {
            let mut link = pending_link(seeker_id, taken_id);
            link.id = id;
            Ok(Some(resolved(&link, LinkStatus::Expired)))
        });
    links.expect_mark_released().times(1).returning(|_, _| Ok(()));

    let service = link_service(users, links, MockChatroomRepository::new());
    let link = service.find_match(seeker_id).await.unwrap();
    assert_eq!(link.participants(), [seeker_id, free_id]);
}

#[tokio::test]
async fn respond_rejects_non_participant_before_any_write() {
    let link = pending_link(UserId::generate(), UserId::generate());
    let link_id = link.id;

    let mut links = MockLinkRepository::new();
    links
        .expect_find_by_id()
        .returning(move |_| Ok(Some(link.clone())));
    links.expect_transition_from_pending().never();

    let service = link_service(MockUserRepository::new(), links, MockChatroomRepository::new());
    assert_kind(
        service
            .respond_to_link(UserId::generate(), link_id, true)
            .await,
        ErrorKind::Unauthorized,
    );
}

#[tokio::test]
async fn accepting_opens_a_locked_chatroom() {
    let link = pending_link(UserId::generate(), UserId::generate());
    let (link_id, responder) = (link.id, link.user_b_id);
    let accepted = resolved(&link, LinkStatus::Accepted);

    let mut links = MockLinkRepository::new();
    links
        .expect_find_by_id()
        .returning(move |_| Ok(Some(link.clone())));
    links
        .expect_transition_from_pending()
        .withf(|_, status, _| *status == LinkStatus::Accepted)
        .times(1)
        .returning(move |_, _, _| Ok(Some(accepted.clone())));

    let mut chatrooms = MockChatroomRepository::new();
    chatrooms
        .expect_create()
        .times(1)
        .returning(|room| Ok(room));

    let mut users = MockUserRepository::new();
    users.expect_release_from_link().never();

    let service = link_service(users, links, chatrooms);
    let response = service
        .respond_to_link(responder, link_id, true)
        .await
        .unwrap();

    assert_eq!(response.link.status, LinkStatus::Accepted);
    let room = response.chatroom.unwrap();
    assert_eq!(room.link_id, link_id);
    assert!(room.is_locked);
}

#[tokio::test]
async fn respond_losing_the_race_to_the_sweep_is_invalid_state() {
    let link = pending_link(UserId::generate(), UserId::generate());
    let (link_id, responder) = (link.id, link.user_a_id);
    let expired = resolved(&link, LinkStatus::Expired);

    let reads = AtomicUsize::new(0);
    let mut links = MockLinkRepository::new();
    links.expect_find_by_id().times(2).returning(move |_| {
        if reads.fetch_add(1, Ordering::SeqCst) == 0 {
            Ok(Some(link.clone()))
        } else {
            Ok(Some(expired.clone()))
        }
    });
    links
        .expect_transition_from_pending()
        .returning(|_, _, _| Ok(None));

    let mut chatrooms = MockChatroomRepository::new();
    chatrooms.expect_create().never();
    let mut users = MockUserRepository::new();
    users.expect_release_from_link().never();

    let service = link_service(users, links, chatrooms);
    let err = service
        .respond_to_link(responder, link_id, true)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidState);
    assert!(err.to_string().contains("expired"));
}

#[tokio::test]
async fn rejection_survives_a_failed_release() {
    let link = pending_link(UserId::generate(), UserId::generate());
    let (link_id, responder) = (link.id, link.user_a_id);
    let rejected = resolved(&link, LinkStatus::Rejected);

    let mut links = MockLinkRepository::new();
    links
        .expect_find_by_id()
        .returning(move |_| Ok(Some(link.clone())));
    links
        .expect_transition_from_pending()
        .returning(move |_, _, _| Ok(Some(rejected.clone())));
    links.expect_mark_released().never();

    let mut users = MockUserRepository::new();
    users
        .expect_release_from_link()
        .returning(|_, _, _| Err(RepositoryError::timeout("users.release_from_link")));

    let service = link_service(users, links, MockChatroomRepository::new());
    let response = service
        .respond_to_link(responder, link_id, false)
        .await
        .unwrap();

    assert_eq!(response.link.status, LinkStatus::Rejected);
    assert!(response.link.released_at.is_none(), "left for the sweep");
    assert!(response.chatroom.is_none());
}

#[tokio::test]
async fn store_timeout_surfaces_as_transient() {
    let mut links = MockLinkRepository::new();
    links
        .expect_find_by_id()
        .returning(|_| Err(RepositoryError::timeout("links.find_by_id")));

    let service = link_service(MockUserRepository::new(), links, MockChatroomRepository::new());
    assert_kind(
        service.get_link(UserId::generate(), LinkId::generate()).await,
        ErrorKind::Transient,
    );
}

#[tokio::test]
async fn sweep_isolates_per_link_failures() {
    let broken_user = UserId::generate();
    let overdue_a = resolved(
        &pending_link(broken_user, UserId::generate()),
        LinkStatus::Expired,
    );
    let overdue_b = resolved(
        &pending_link(UserId::generate(), UserId::generate()),
        LinkStatus::Expired,
    );
    let leftover = resolved(
        &pending_link(UserId::generate(), UserId::generate()),
        LinkStatus::Rejected,
    );

    let expired = vec![overdue_a.clone(), overdue_b.clone()];
    let awaiting = vec![overdue_a, overdue_b, leftover];

    let mut links = MockLinkRepository::new();
    links
        .expect_expire_overdue()
        .times(1)
        .returning(move |_| Ok(expired.clone()));
    links
        .expect_list_awaiting_release()
        .withf(|limit| *limit == 100)
        .returning(move |_| Ok(awaiting.clone()));
    links.expect_mark_released().times(2).returning(|_, _| Ok(()));

    let mut users = MockUserRepository::new();
    users.expect_release_from_link().returning(move |user_id, _, _| {
        if user_id == broken_user {
            Err(RepositoryError::storage("connection reset"))
        } else {
            Ok(true)
        }
    });

    let service = link_service(users, links, MockChatroomRepository::new());
    let report = service.run_expiration_sweep().await.unwrap();

    assert_eq!(report.expired, 2);
    assert_eq!(report.released, 2);
    assert_eq!(report.failed, 1);
}

fn locked_room(a: UserId, b: UserId) -> Chatroom {
    Chatroom::for_link(ChatroomId::generate(), LinkId::generate(), a, b, now())
}

#[tokio::test]
async fn locked_chatroom_at_cap_rejects_message() {
    let (a, b) = (UserId::generate(), UserId::generate());
    let room = locked_room(a, b);
    let room_id = room.id;

    let mut chatrooms = MockChatroomRepository::new();
    chatrooms
        .expect_find_by_id()
        .returning(move |_| Ok(Some(room.clone())));
    chatrooms
        .expect_append_message()
        .withf(|_, cap| *cap == 2)
        .returning(|_, _| Ok(AppendOutcome::LimitReached));

    let gate = chatroom_gate(chatrooms, MockLinkRepository::new());
    let err = gate
        .send_message(a, room_id, "third".into())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ApplicationError::Domain(DomainError::ChatroomLockedLimitReached)
    ));
}

#[tokio::test]
async fn outsider_cannot_read_or_write_chatroom() {
    let room = locked_room(UserId::generate(), UserId::generate());
    let room_id = room.id;

    let mut chatrooms = MockChatroomRepository::new();
    chatrooms
        .expect_find_by_id()
        .returning(move |_| Ok(Some(room.clone())));
    chatrooms.expect_append_message().never();
    chatrooms.expect_list_messages().never();
    chatrooms.expect_unlock_if_locked().never();

    let gate = chatroom_gate(chatrooms, MockLinkRepository::new());
    let outsider = UserId::generate();
    assert_kind(
        gate.send_message(outsider, room_id, "hi".into()).await,
        ErrorKind::Unauthorized,
    );
    assert_kind(gate.get_messages(outsider, room_id).await, ErrorKind::Unauthorized);
    assert_kind(
        gate.proximity_unlock(outsider, room_id).await,
        ErrorKind::Unauthorized,
    );
}

#[tokio::test]
async fn blank_message_is_rejected_before_lookup() {
    let mut chatrooms = MockChatroomRepository::new();
    chatrooms.expect_find_by_id().never();

    let gate = chatroom_gate(chatrooms, MockLinkRepository::new());
    assert_kind(
        gate.send_message(UserId::generate(), ChatroomId::generate(), "  ".into())
            .await,
        ErrorKind::InvalidInput,
    );
}

#[tokio::test]
async fn proximity_unlock_twice_reports_already_unlocked() {
    let (a, b) = (UserId::generate(), UserId::generate());
    let mut room = locked_room(a, b);
    room.unlock(now());
    let room_id = room.id;

    let mut chatrooms = MockChatroomRepository::new();
    chatrooms
        .expect_find_by_id()
        .returning(move |_| Ok(Some(room.clone())));
    chatrooms.expect_unlock_if_locked().never();

    let gate = chatroom_gate(chatrooms, MockLinkRepository::new());
    let err = gate.proximity_unlock(b, room_id).await.unwrap_err();
    assert!(matches!(
        err,
        ApplicationError::Domain(DomainError::ChatroomAlreadyUnlocked)
    ));

    // 手动解锁是无条件的
    let unlocked = gate.unlock(room_id).await.unwrap();
    assert!(!unlocked.is_locked);
}

#[tokio::test]
async fn proximity_unlock_losing_the_conditional_write_reports_already_unlocked() {
    let (a, b) = (UserId::generate(), UserId::generate());
    let room = locked_room(a, b);
    let room_id = room.id;

    // 读到的仍是锁定状态，但另一方已先提交了解锁
    let mut chatrooms = MockChatroomRepository::new();
    chatrooms
        .expect_find_by_id()
        .returning(move |_| Ok(Some(room.clone())));
    chatrooms
        .expect_unlock_if_locked()
        .times(1)
        .returning(|_, _| Ok(false));

    let gate = chatroom_gate(chatrooms, MockLinkRepository::new());
    let err = gate.proximity_unlock(a, room_id).await.unwrap_err();
    assert!(matches!(
        err,
        ApplicationError::Domain(DomainError::ChatroomAlreadyUnlocked)
    ));
}

#[tokio::test]
async fn manual_unlock_tolerates_a_concurrent_unlock() {
    let room = locked_room(UserId::generate(), UserId::generate());
    let room_id = room.id;

    let mut chatrooms = MockChatroomRepository::new();
    chatrooms
        .expect_find_by_id()
        .returning(move |_| Ok(Some(room.clone())));
    chatrooms
        .expect_unlock_if_locked()
        .times(1)
        .returning(|_, _| Ok(false));

    let gate = chatroom_gate(chatrooms, MockLinkRepository::new());
    let unlocked = gate.unlock(room_id).await.unwrap();
    assert!(!unlocked.is_locked);
}

#[tokio::test]
async fn unlocking_missing_chatroom_is_not_found() {
    let mut chatrooms = MockChatroomRepository::new();
    chatrooms.expect_find_by_id().returning(|_| Ok(None));

    let gate = chatroom_gate(chatrooms, MockLinkRepository::new());
    assert_kind(gate.unlock(ChatroomId::generate()).await, ErrorKind::NotFound);
}

fn user_service(users: MockUserRepository, hasher: MockPasswordHasher) -> UserService {
    UserService::new(UserServiceDependencies {
        user_repository: Arc::new(users),
        password_hasher: Arc::new(hasher),
        clock: Arc::new(FixedClock(now())),
        timeouts: StoreTimeouts::default(),
    })
}

fn register_request(email: &str) -> RegisterUserRequest {
    RegisterUserRequest {
        username: "alice".into(),
        email: email.into(),
        password: "correct horse".into(),
        profile: profile(Gender::Female, (1995, 3, 1)),
        preferences: PreferencesInput {
            min_age: 25,
            max_age: 35,
            genders: vec![Gender::Male],
        },
        location: Some((37.5665, 126.9780)),
    }
}

#[tokio::test]
async fn registered_user_is_not_searching() {
    let mut users = MockUserRepository::new();
    users.expect_find_by_email().returning(|_| Ok(None));
    users.expect_create().times(1).returning(|user| Ok(user));

    let mut hasher = MockPasswordHasher::new();
    hasher
        .expect_hash()
        .returning(|_| Ok(PasswordHash::new("bcrypt-hash").unwrap()));

    let service = user_service(users, hasher);
    let user = service
        .register(register_request("Alice@Example.com"))
        .await
        .unwrap();

    assert_eq!(user.email.as_str(), "alice@example.com");
    assert!(!user.is_searching);
    assert!(user.current_link_id.is_none());
    assert_eq!(user.password.as_str(), "bcrypt-hash");
}

#[tokio::test]
async fn duplicate_email_is_rejected_without_hashing() {
    let existing = searching_user(Gender::Female, Gender::Male);
    let mut users = MockUserRepository::new();
    users
        .expect_find_by_email()
        .returning(move |_| Ok(Some(existing.clone())));
    users.expect_create().never();

    let mut hasher = MockPasswordHasher::new();
    hasher.expect_hash().never();

    let service = user_service(users, hasher);
    let err = service
        .register(register_request("alice@example.com"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ApplicationError::Domain(DomainError::UserAlreadyExists)
    ));
}

#[tokio::test]
async fn invalid_preferences_are_rejected_before_any_store_call() {
    let mut users = MockUserRepository::new();
    users.expect_find_by_email().never();

    let service = user_service(users, MockPasswordHasher::new());
    let mut request = register_request("bob@example.com");
    request.preferences.min_age = 40;
    request.preferences.max_age = 30;

    assert_kind(service.register(request).await, ErrorKind::InvalidInput);
}

#[tokio::test]
async fn unknown_email_and_wrong_password_look_the_same() {
    let known = searching_user(Gender::Female, Gender::Male);
    let known_email = known.email.clone();
    let known_address = known.email.as_str().to_owned();

    let mut users = MockUserRepository::new();
    users.expect_find_by_email().returning(move |email| {
        if email == known_email {
            Ok(Some(known.clone()))
        } else {
            Ok(None)
        }
    });
    let mut hasher = MockPasswordHasher::new();
    hasher.expect_verify().returning(|_, _| Ok(false));

    let service = user_service(users, hasher);
    let unknown = service
        .authenticate(AuthenticateUserRequest {
            email: "nobody@example.com".into(),
            password: "whatever".into(),
        })
        .await
        .unwrap_err();
    let wrong = service
        .authenticate(AuthenticateUserRequest {
            email: known_address,
            password: "not the password".into(),
        })
        .await
        .unwrap_err();

    assert_eq!(unknown.to_string(), wrong.to_string());
    assert_eq!(unknown.kind(), ErrorKind::Authentication);
}

#[tokio::test]
async fn linked_user_cannot_start_searching() {
    let mut linked = searching_user(Gender::Male, Gender::Female);
    linked.claim_for_link(LinkId::generate(), now());
    let id = linked.id;

    let mut users = MockUserRepository::new();
    users
        .expect_find_by_id()
        .returning(move |_| Ok(Some(linked.clone())));
    users.expect_set_searching().never();

    let service = user_service(users, MockPasswordHasher::new());
    assert_kind(service.start_searching(id).await, ErrorKind::InvalidState);
}

#[tokio::test]
async fn location_outside_valid_range_is_invalid_input() {
    let mut users = MockUserRepository::new();
    users.expect_update_location().never();

    let service = user_service(users, MockPasswordHasher::new());
    assert_kind(
        service
            .update_location(UserId::generate(), 95.0, 10.0)
            .await,
        ErrorKind::InvalidInput,
    );
}

#[test]
fn matching_settings_default_to_domain_constants() {
    let settings = MatchingSettings::default();
    assert_eq!(settings.radius_meters, 200.0);
    assert_eq!(settings.link_ttl, std::time::Duration::from_secs(30));
}

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration as StdDuration;

use async_trait::async_trait;

use application::{
    ChatroomGate, ChatroomGateDependencies, Clock, LinkService, LinkServiceDependencies,
    MatchFinder, MatchFinderDependencies, MatchingSettings, StoreTimeouts,
};
use chrono::{Duration, NaiveDate, TimeZone, Utc};
use domain::{
    AgeRange, AppendOutcome, Chatroom, ChatroomId, ChatroomRepository, Gender, GeoPoint, LinkId,
    Message, PasswordHash, Preferences, Profile, RepositoryResult, Timestamp, User, UserEmail,
    UserId, UserRepository, Username,
};
use infrastructure::MemoryStore;

pub const SEOUL: (f64, f64) = (37.5665, 126.9780);

/// 可手动拨动的时钟
pub struct ManualClock {
    now: Mutex<Timestamp>,
}

impl ManualClock {
    pub fn starting_at(now: Timestamp) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap();
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        *self.now.lock().unwrap()
    }
}

pub fn start_time() -> Timestamp {
    Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
}

/// 向北偏移约 `meters` 米
pub fn north_of(origin: (f64, f64), meters: f64) -> (f64, f64) {
    (origin.0 + meters / 111_195.0, origin.1)
}

pub struct Harness {
    pub clock: Arc<ManualClock>,
    pub store: MemoryStore,
    pub links: Arc<LinkService>,
    pub gate: Arc<ChatroomGate>,
    pub finder: Arc<MatchFinder>,
}

impl Harness {
    pub fn new() -> Self {
        let clock = Arc::new(ManualClock::starting_at(start_time()));
        let store = MemoryStore::new();
        let shared = Arc::new(store.clone());
        let dyn_clock: Arc<dyn Clock> = clock.clone();

        let finder = Arc::new(MatchFinder::new(MatchFinderDependencies {
            user_repository: shared.clone(),
            clock: dyn_clock.clone(),
            timeouts: StoreTimeouts::default(),
            settings: MatchingSettings::default(),
        }));
        let links = Arc::new(LinkService::new(LinkServiceDependencies {
            user_repository: shared.clone(),
            link_repository: shared.clone(),
            chatroom_repository: shared.clone(),
            match_finder: finder.clone(),
            clock: dyn_clock.clone(),
            timeouts: StoreTimeouts::default(),
            sweep_batch_limit: 100,
        }));
        let gate = Arc::new(ChatroomGate::new(ChatroomGateDependencies {
            chatroom_repository: shared.clone(),
            link_repository: shared,
            clock: dyn_clock,
            timeouts: StoreTimeouts::default(),
        }));

        Self {
            clock,
            store,
            links,
            gate,
            finder,
        }
    }

    /// 聊天室读取被放慢的闸门，用来拉开“先读后写”之间的窗口
    pub fn gate_with_slow_reads(&self, delay: StdDuration) -> Arc<ChatroomGate> {
        let shared = Arc::new(self.store.clone());
        let dyn_clock: Arc<dyn Clock> = self.clock.clone();
        Arc::new(ChatroomGate::new(ChatroomGateDependencies {
            chatroom_repository: Arc::new(SlowChatroomReads {
                inner: self.store.clone(),
                delay,
            }),
            link_repository: shared,
            clock: dyn_clock,
            timeouts: StoreTimeouts::default(),
        }))
    }

    /// 直接写入存储并进入搜索状态
    pub async fn searching_user(&self, persona: Persona) -> User {
        let now = self.clock.now();
        let mut user = User::register(
            UserId::generate(),
            Username::parse(persona.name).unwrap(),
            UserEmail::parse(format!("{}@example.com", persona.name)).unwrap(),
            PasswordHash::new("not-used").unwrap(),
            Profile {
                first_name: persona.name.to_owned(),
                last_name: "Tester".to_owned(),
                date_of_birth: NaiveDate::from_ymd_opt(persona.born, 1, 1).unwrap(),
                gender: persona.gender,
                bio: String::new(),
                profile_pic_url: None,
            },
            Preferences::new(
                AgeRange::new(persona.ages.0, persona.ages.1).unwrap(),
                persona.wants.to_vec(),
            )
            .unwrap(),
            persona.at.map(|(lat, lon)| GeoPoint::new(lat, lon).unwrap()),
            now,
        );
        user.start_searching(now).unwrap();
        UserRepository::create(&self.store, user).await.unwrap()
    }

    pub async fn user(&self, id: UserId) -> User {
        UserRepository::find_by_id(&self.store, id)
            .await
            .unwrap()
            .expect("user exists")
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Persona {
    pub name: &'static str,
    pub gender: Gender,
    /// 出生年份（1 月 1 日）
    pub born: i32,
    pub wants: &'static [Gender],
    pub ages: (u32, u32),
    pub at: Option<(f64, f64)>,
}

impl Persona {
    /// 29 岁男性，寻找 25-35 岁女性，位于首尔
    pub fn man(name: &'static str) -> Self {
        Self {
            name,
            gender: Gender::Male,
            born: 1995,
            wants: &[Gender::Female],
            ages: (25, 35),
            at: Some(SEOUL),
        }
    }

    /// 29 岁女性，寻找 25-35 岁男性，位于首尔以北 50 米
    pub fn woman(name: &'static str) -> Self {
        Self {
            name,
            gender: Gender::Female,
            born: 1995,
            wants: &[Gender::Male],
            ages: (25, 35),
            at: Some(north_of(SEOUL, 50.0)),
        }
    }
}

/// 读取聊天室前先等待 `delay`，写操作直接转发
pub struct SlowChatroomReads {
    inner: MemoryStore,
    delay: StdDuration,
}

#[async_trait]
impl ChatroomRepository for SlowChatroomReads {
    async fn create(&self, chatroom: Chatroom) -> RepositoryResult<Chatroom> {
        ChatroomRepository::create(&self.inner, chatroom).await
    }

    async fn find_by_id(&self, id: ChatroomId) -> RepositoryResult<Option<Chatroom>> {
        tokio::time::sleep(self.delay).await;
        ChatroomRepository::find_by_id(&self.inner, id).await
    }

    async fn find_by_link(&self, link_id: LinkId) -> RepositoryResult<Option<Chatroom>> {
        self.inner.find_by_link(link_id).await
    }

    async fn unlock_if_locked(&self, id: ChatroomId, now: Timestamp) -> RepositoryResult<bool> {
        self.inner.unlock_if_locked(id, now).await
    }

    async fn append_message(
        &self,
        message: Message,
        locked_cap: u32,
    ) -> RepositoryResult<AppendOutcome> {
        self.inner.append_message(message, locked_cap).await
    }

    async fn list_messages(&self, chatroom_id: ChatroomId) -> RepositoryResult<Vec<Message>> {
        self.inner.list_messages(chatroom_id).await
    }
}

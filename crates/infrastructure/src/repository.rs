use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use domain::{
    AgeRange, AppendOutcome, CandidateQuery, Chatroom, ChatroomId, ChatroomRepository, Gender,
    GeoPoint, Link, LinkId, LinkRepository, LinkStatus, Message, MessageContent, MessageId,
    PasswordHash, Preferences, Profile, RepositoryError, RepositoryResult, Timestamp, User,
    UserEmail, UserId, UserRepository, Username,
};
use sqlx::{postgres::PgPoolOptions, FromRow, PgPool};
use uuid::Uuid;

fn map_sqlx_err(err: sqlx::Error) -> RepositoryError {
    if let Some(db_err) = err.as_database_error() {
        if db_err.is_unique_violation() {
            return RepositoryError::Conflict;
        }
    }
    RepositoryError::storage(err.to_string())
}

const USER_COLUMNS: &str = "id, username, email, password_hash, first_name, last_name, \
     date_of_birth, gender, bio, profile_pic_url, pref_min_age, pref_max_age, pref_genders, \
     latitude, longitude, is_searching, current_link_id, created_at, updated_at";

const LINK_COLUMNS: &str =
    "id, user_a_id, user_b_id, status, created_at, expires_at, updated_at, released_at";

const CHATROOM_COLUMNS: &str =
    "id, link_id, user_a_id, user_b_id, is_locked, created_at, updated_at";

/// 候选过滤条件；`distance_m` 为 haversine 大圆距离（米）。
///
/// 参数：$1 排除的 id，$2 可接受的性别，$3/$4 出生日期区间，
/// $5 搜索者性别，$6 搜索者年龄，$7/$8 搜索者坐标，$9 半径。
fn candidate_sql(tail: &str) -> String {
    format!(
        r#"
        SELECT {USER_COLUMNS} FROM (
            SELECT *,
                2 * 6371008.8 * asin(LEAST(1.0, sqrt(
                    power(sin(radians(latitude - $7) / 2), 2)
                    + cos(radians($7)) * cos(radians(latitude))
                      * power(sin(radians(longitude - $8) / 2), 2)
                ))) AS distance_m
            FROM users
            WHERE id <> $1
              AND is_searching
              AND current_link_id IS NULL
              AND gender = ANY($2)
              AND date_of_birth BETWEEN $3 AND $4
              AND $5 = ANY(pref_genders)
              AND pref_min_age <= $6 AND pref_max_age >= $6
              AND latitude IS NOT NULL AND longitude IS NOT NULL
        ) AS nearby
        WHERE distance_m <= $9
        {tail}
        "#
    )
}

#[derive(Debug, FromRow)]
struct UserRecord {
    id: Uuid,
    username: String,
    email: String,
    password_hash: String,
    first_name: String,
    last_name: String,
    date_of_birth: NaiveDate,
    gender: String,
    bio: String,
    profile_pic_url: Option<String>,
    pref_min_age: i32,
    pref_max_age: i32,
    pref_genders: Vec<String>,
    latitude: Option<f64>,
    longitude: Option<f64>,
    is_searching: bool,
    current_link_id: Option<Uuid>,
    created_at: Timestamp,
    updated_at: Timestamp,
}

fn age_column(value: i32) -> Result<u32, RepositoryError> {
    u32::try_from(value)
        .map_err(|_| RepositoryError::invalid_data(format!("negative age {value}")))
}

impl TryFrom<UserRecord> for User {
    type Error = RepositoryError;

    fn try_from(value: UserRecord) -> Result<Self, Self::Error> {
        let invalid = |err: domain::DomainError| RepositoryError::invalid_data(err.to_string());

        let gender = value.gender.parse::<Gender>().map_err(invalid)?;
        let genders = value
            .pref_genders
            .iter()
            .map(|g| g.parse::<Gender>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(invalid)?;
        let age_range = AgeRange::new(
            age_column(value.pref_min_age)?,
            age_column(value.pref_max_age)?,
        )
        .map_err(invalid)?;
        let location = match (value.latitude, value.longitude) {
            (Some(latitude), Some(longitude)) => {
                Some(GeoPoint::new(latitude, longitude).map_err(invalid)?)
            }
            _ => None,
        };

        Ok(User {
            id: UserId::from(value.id),
            username: Username::parse(value.username).map_err(invalid)?,
            email: UserEmail::parse(value.email).map_err(invalid)?,
            password: PasswordHash::new(value.password_hash).map_err(invalid)?,
            profile: Profile {
                first_name: value.first_name,
                last_name: value.last_name,
                date_of_birth: value.date_of_birth,
                gender,
                bio: value.bio,
                profile_pic_url: value.profile_pic_url,
            },
            preferences: Preferences::new(age_range, genders).map_err(invalid)?,
            location,
            is_searching: value.is_searching,
            current_link_id: value.current_link_id.map(LinkId::from),
            created_at: value.created_at,
            updated_at: value.updated_at,
        })
    }
}

fn gender_names(genders: &[Gender]) -> Vec<String> {
    genders.iter().map(|g| g.as_str().to_owned()).collect()
}

#[derive(Debug, FromRow)]
struct LinkRecord {
    id: Uuid,
    user_a_id: Uuid,
    user_b_id: Uuid,
    status: String,
    created_at: Timestamp,
    expires_at: Timestamp,
    updated_at: Timestamp,
    released_at: Option<Timestamp>,
}

impl TryFrom<LinkRecord> for Link {
    type Error = RepositoryError;

    fn try_from(value: LinkRecord) -> Result<Self, Self::Error> {
        let status = value
            .status
            .parse::<LinkStatus>()
            .map_err(|err| RepositoryError::invalid_data(err.to_string()))?;

        Ok(Link {
            id: LinkId::from(value.id),
            user_a_id: UserId::from(value.user_a_id),
            user_b_id: UserId::from(value.user_b_id),
            status,
            created_at: value.created_at,
            expires_at: value.expires_at,
            updated_at: value.updated_at,
            released_at: value.released_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct ChatroomRecord {
    id: Uuid,
    link_id: Uuid,
    user_a_id: Uuid,
    user_b_id: Uuid,
    is_locked: bool,
    created_at: Timestamp,
    updated_at: Timestamp,
}

impl From<ChatroomRecord> for Chatroom {
    fn from(value: ChatroomRecord) -> Self {
        Chatroom {
            id: ChatroomId::from(value.id),
            link_id: LinkId::from(value.link_id),
            user_a_id: UserId::from(value.user_a_id),
            user_b_id: UserId::from(value.user_b_id),
            is_locked: value.is_locked,
            created_at: value.created_at,
            updated_at: value.updated_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct MessageRecord {
    id: Uuid,
    chatroom_id: Uuid,
    sender_id: Uuid,
    content: String,
    created_at: Timestamp,
}

impl TryFrom<MessageRecord> for Message {
    type Error = RepositoryError;

    fn try_from(value: MessageRecord) -> Result<Self, Self::Error> {
        let content = MessageContent::new(value.content)
            .map_err(|err| RepositoryError::invalid_data(err.to_string()))?;
        Ok(Message::new(
            MessageId::from(value.id),
            ChatroomId::from(value.chatroom_id),
            UserId::from(value.sender_id),
            content,
            value.created_at,
        ))
    }
}

#[derive(Clone)]
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn exists(&self, id: UserId) -> RepositoryResult<bool> {
        sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM users WHERE id = $1)")
            .bind(Uuid::from(id))
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_err)
    }

    async fn fetch_candidates(
        &self,
        query: &CandidateQuery,
        tail: &str,
        limit: i64,
    ) -> RepositoryResult<Vec<User>> {
        let sql = candidate_sql(tail);
        let records = sqlx::query_as::<_, UserRecord>(&sql)
            .bind(Uuid::from(query.exclude_id))
            .bind(gender_names(&query.genders))
            .bind(query.earliest_birth_date)
            .bind(query.latest_birth_date)
            .bind(query.seeker_gender.as_str())
            .bind(i32::try_from(query.seeker_age).unwrap_or(i32::MAX))
            .bind(query.origin.latitude)
            .bind(query.origin.longitude)
            .bind(query.radius_meters)
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_err)?;

        records.into_iter().map(User::try_from).collect()
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn create(&self, user: User) -> RepositoryResult<User> {
        let sql = format!(
            r#"
            INSERT INTO users ({USER_COLUMNS})
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19)
            RETURNING {USER_COLUMNS}
            "#
        );
        let record = sqlx::query_as::<_, UserRecord>(&sql)
            .bind(Uuid::from(user.id))
            .bind(user.username.as_str())
            .bind(user.email.as_str())
            .bind(user.password.as_str())
            .bind(&user.profile.first_name)
            .bind(&user.profile.last_name)
            .bind(user.profile.date_of_birth)
            .bind(user.profile.gender.as_str())
            .bind(&user.profile.bio)
            .bind(&user.profile.profile_pic_url)
            .bind(user.preferences.age_range.min as i32)
            .bind(user.preferences.age_range.max as i32)
            .bind(gender_names(&user.preferences.genders))
            .bind(user.location.map(|p| p.latitude))
            .bind(user.location.map(|p| p.longitude))
            .bind(user.is_searching)
            .bind(user.current_link_id.map(Uuid::from))
            .bind(user.created_at)
            .bind(user.updated_at)
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_err)?;

        User::try_from(record)
    }

    async fn update(&self, user: User) -> RepositoryResult<User> {
        // 搜索标记、链接引用与位置只通过各自的条件写修改
        let sql = format!(
            r#"
            UPDATE users
            SET username = $2, email = $3, first_name = $4, last_name = $5,
                date_of_birth = $6, gender = $7, bio = $8, profile_pic_url = $9,
                pref_min_age = $10, pref_max_age = $11, pref_genders = $12, updated_at = $13
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        );
        let record = sqlx::query_as::<_, UserRecord>(&sql)
            .bind(Uuid::from(user.id))
            .bind(user.username.as_str())
            .bind(user.email.as_str())
            .bind(&user.profile.first_name)
            .bind(&user.profile.last_name)
            .bind(user.profile.date_of_birth)
            .bind(user.profile.gender.as_str())
            .bind(&user.profile.bio)
            .bind(&user.profile.profile_pic_url)
            .bind(user.preferences.age_range.min as i32)
            .bind(user.preferences.age_range.max as i32)
            .bind(gender_names(&user.preferences.genders))
            .bind(user.updated_at)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_err)?
            .ok_or(RepositoryError::NotFound)?;

        User::try_from(record)
    }

    async fn find_by_id(&self, id: UserId) -> RepositoryResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let record = sqlx::query_as::<_, UserRecord>(&sql)
            .bind(Uuid::from(id))
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_err)?;

        record.map(User::try_from).transpose()
    }

    async fn find_by_email(&self, email: UserEmail) -> RepositoryResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
        let record = sqlx::query_as::<_, UserRecord>(&sql)
            .bind(email.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_err)?;

        record.map(User::try_from).transpose()
    }

    async fn find_candidate(&self, query: &CandidateQuery) -> RepositoryResult<Option<User>> {
        let mut found = self
            .fetch_candidates(query, "ORDER BY random() LIMIT $10", 1)
            .await?;
        Ok(found.pop())
    }

    async fn list_candidates(
        &self,
        query: &CandidateQuery,
        limit: u32,
    ) -> RepositoryResult<Vec<User>> {
        self.fetch_candidates(query, "ORDER BY distance_m LIMIT $10", i64::from(limit))
            .await
    }

    async fn update_location(
        &self,
        id: UserId,
        location: GeoPoint,
        now: Timestamp,
    ) -> RepositoryResult<()> {
        let result = sqlx::query(
            "UPDATE users SET latitude = $2, longitude = $3, updated_at = $4 WHERE id = $1",
        )
        .bind(Uuid::from(id))
        .bind(location.latitude)
        .bind(location.longitude)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn set_searching(
        &self,
        id: UserId,
        searching: bool,
        now: Timestamp,
    ) -> RepositoryResult<bool> {
        let sql = if searching {
            "UPDATE users SET is_searching = TRUE, updated_at = $2 \
             WHERE id = $1 AND current_link_id IS NULL"
        } else {
            "UPDATE users SET is_searching = FALSE, updated_at = $2 WHERE id = $1"
        };
        let result = sqlx::query(sql)
            .bind(Uuid::from(id))
            .bind(now)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_err)?;

        if result.rows_affected() == 1 {
            return Ok(true);
        }
        if self.exists(id).await? {
            Ok(false)
        } else {
            Err(RepositoryError::NotFound)
        }
    }

    async fn claim_for_link(
        &self,
        id: UserId,
        link_id: LinkId,
        now: Timestamp,
    ) -> RepositoryResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET current_link_id = $2, is_searching = FALSE, updated_at = $3
            WHERE id = $1 AND is_searching AND current_link_id IS NULL
            "#,
        )
        .bind(Uuid::from(id))
        .bind(Uuid::from(link_id))
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Ok(result.rows_affected() == 1)
    }

    async fn release_from_link(
        &self,
        id: UserId,
        link_id: LinkId,
        now: Timestamp,
    ) -> RepositoryResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET current_link_id = NULL, is_searching = TRUE, updated_at = $3
            WHERE id = $1 AND current_link_id = $2
            "#,
        )
        .bind(Uuid::from(id))
        .bind(Uuid::from(link_id))
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Ok(result.rows_affected() == 1)
    }
}

#[derive(Clone)]
pub struct PgLinkRepository {
    pool: PgPool,
}

impl PgLinkRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LinkRepository for PgLinkRepository {
    async fn create(&self, link: Link) -> RepositoryResult<Link> {
        let sql = format!(
            r#"
            INSERT INTO links ({LINK_COLUMNS})
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {LINK_COLUMNS}
            "#
        );
        let record = sqlx::query_as::<_, LinkRecord>(&sql)
            .bind(Uuid::from(link.id))
            .bind(Uuid::from(link.user_a_id))
            .bind(Uuid::from(link.user_b_id))
            .bind(link.status.as_str())
            .bind(link.created_at)
            .bind(link.expires_at)
            .bind(link.updated_at)
            .bind(link.released_at)
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_err)?;

        Link::try_from(record)
    }

    async fn find_by_id(&self, id: LinkId) -> RepositoryResult<Option<Link>> {
        let sql = format!("SELECT {LINK_COLUMNS} FROM links WHERE id = $1");
        let record = sqlx::query_as::<_, LinkRecord>(&sql)
            .bind(Uuid::from(id))
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_err)?;

        record.map(Link::try_from).transpose()
    }

    async fn transition_from_pending(
        &self,
        id: LinkId,
        status: LinkStatus,
        now: Timestamp,
    ) -> RepositoryResult<Option<Link>> {
        if !status.is_terminal() {
            return Ok(None);
        }

        let sql = format!(
            r#"
            UPDATE links SET status = $2, updated_at = $3
            WHERE id = $1 AND status = 'pending'
            RETURNING {LINK_COLUMNS}
            "#
        );
        let record = sqlx::query_as::<_, LinkRecord>(&sql)
            .bind(Uuid::from(id))
            .bind(status.as_str())
            .bind(now)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_err)?;

        match record {
            Some(record) => Link::try_from(record).map(Some),
            None => match self.find_by_id(id).await? {
                Some(_) => Ok(None),
                None => Err(RepositoryError::NotFound),
            },
        }
    }

    async fn expire_overdue(&self, now: Timestamp) -> RepositoryResult<Vec<Link>> {
        let sql = format!(
            r#"
            UPDATE links SET status = 'expired', updated_at = $1
            WHERE status = 'pending' AND expires_at < $1
            RETURNING {LINK_COLUMNS}
            "#
        );
        let records = sqlx::query_as::<_, LinkRecord>(&sql)
            .bind(now)
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_err)?;

        records.into_iter().map(Link::try_from).collect()
    }

    async fn list_awaiting_release(&self, limit: u32) -> RepositoryResult<Vec<Link>> {
        let sql = format!(
            r#"
            SELECT {LINK_COLUMNS} FROM links
            WHERE status IN ('rejected', 'expired') AND released_at IS NULL
            ORDER BY updated_at
            LIMIT $1
            "#
        );
        let records = sqlx::query_as::<_, LinkRecord>(&sql)
            .bind(i64::from(limit))
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_err)?;

        records.into_iter().map(Link::try_from).collect()
    }

    async fn mark_released(&self, id: LinkId, now: Timestamp) -> RepositoryResult<()> {
        let result =
            sqlx::query("UPDATE links SET released_at = COALESCE(released_at, $2) WHERE id = $1")
                .bind(Uuid::from(id))
                .bind(now)
                .execute(&self.pool)
                .await
                .map_err(map_sqlx_err)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

#[derive(Clone)]
pub struct PgChatroomRepository {
    pool: PgPool,
}

impl PgChatroomRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ChatroomRepository for PgChatroomRepository {
    async fn create(&self, chatroom: Chatroom) -> RepositoryResult<Chatroom> {
        let sql = format!(
            r#"
            INSERT INTO chatrooms ({CHATROOM_COLUMNS})
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {CHATROOM_COLUMNS}
            "#
        );
        let record = sqlx::query_as::<_, ChatroomRecord>(&sql)
            .bind(Uuid::from(chatroom.id))
            .bind(Uuid::from(chatroom.link_id))
            .bind(Uuid::from(chatroom.user_a_id))
            .bind(Uuid::from(chatroom.user_b_id))
            .bind(chatroom.is_locked)
            .bind(chatroom.created_at)
            .bind(chatroom.updated_at)
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_err)?;

        Ok(Chatroom::from(record))
    }

    async fn find_by_id(&self, id: ChatroomId) -> RepositoryResult<Option<Chatroom>> {
        let sql = format!("SELECT {CHATROOM_COLUMNS} FROM chatrooms WHERE id = $1");
        let record = sqlx::query_as::<_, ChatroomRecord>(&sql)
            .bind(Uuid::from(id))
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_err)?;

        Ok(record.map(Chatroom::from))
    }

    async fn find_by_link(&self, link_id: LinkId) -> RepositoryResult<Option<Chatroom>> {
        let sql = format!("SELECT {CHATROOM_COLUMNS} FROM chatrooms WHERE link_id = $1");
        let record = sqlx::query_as::<_, ChatroomRecord>(&sql)
            .bind(Uuid::from(link_id))
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_err)?;

        Ok(record.map(Chatroom::from))
    }

    async fn unlock_if_locked(&self, id: ChatroomId, now: Timestamp) -> RepositoryResult<bool> {
        let result = sqlx::query(
            "UPDATE chatrooms SET is_locked = FALSE, updated_at = $2 WHERE id = $1 AND is_locked",
        )
        .bind(Uuid::from(id))
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        if result.rows_affected() == 1 {
            return Ok(true);
        }

        let exists =
            sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM chatrooms WHERE id = $1)")
                .bind(Uuid::from(id))
                .fetch_one(&self.pool)
                .await
                .map_err(map_sqlx_err)?;
        if exists {
            Ok(false)
        } else {
            Err(RepositoryError::NotFound)
        }
    }

    async fn append_message(
        &self,
        message: Message,
        locked_cap: u32,
    ) -> RepositoryResult<AppendOutcome> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_err)?;

        // 行锁串行化同一聊天室的并发发送
        let is_locked: bool =
            sqlx::query_scalar("SELECT is_locked FROM chatrooms WHERE id = $1 FOR UPDATE")
                .bind(Uuid::from(message.chatroom_id))
                .fetch_optional(&mut *tx)
                .await
                .map_err(map_sqlx_err)?
                .ok_or(RepositoryError::NotFound)?;

        if is_locked {
            let count: i64 =
                sqlx::query_scalar("SELECT COUNT(*) FROM messages WHERE chatroom_id = $1")
                    .bind(Uuid::from(message.chatroom_id))
                    .fetch_one(&mut *tx)
                    .await
                    .map_err(map_sqlx_err)?;
            if count >= i64::from(locked_cap) {
                tx.rollback().await.map_err(map_sqlx_err)?;
                return Ok(AppendOutcome::LimitReached);
            }
        }

        let record = sqlx::query_as::<_, MessageRecord>(
            r#"
            INSERT INTO messages (id, chatroom_id, sender_id, content, created_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, chatroom_id, sender_id, content, created_at
            "#,
        )
        .bind(Uuid::from(message.id))
        .bind(Uuid::from(message.chatroom_id))
        .bind(Uuid::from(message.sender_id))
        .bind(message.content.as_str())
        .bind(message.created_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_sqlx_err)?;

        tx.commit().await.map_err(map_sqlx_err)?;
        Message::try_from(record).map(AppendOutcome::Appended)
    }

    async fn list_messages(&self, chatroom_id: ChatroomId) -> RepositoryResult<Vec<Message>> {
        let records = sqlx::query_as::<_, MessageRecord>(
            r#"
            SELECT id, chatroom_id, sender_id, content, created_at
            FROM messages
            WHERE chatroom_id = $1
            ORDER BY seq
            "#,
        )
        .bind(Uuid::from(chatroom_id))
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        records.into_iter().map(Message::try_from).collect()
    }
}

#[derive(Clone)]
pub struct PgStorage {
    pub pool: PgPool,
    pub user_repository: Arc<PgUserRepository>,
    pub link_repository: Arc<PgLinkRepository>,
    pub chatroom_repository: Arc<PgChatroomRepository>,
}

impl PgStorage {
    pub fn new(pool: PgPool) -> Self {
        Self {
            user_repository: Arc::new(PgUserRepository::new(pool.clone())),
            link_repository: Arc::new(PgLinkRepository::new(pool.clone())),
            chatroom_repository: Arc::new(PgChatroomRepository::new(pool.clone())),
            pool,
        }
    }
}

pub async fn create_pg_pool(
    database_url: &str,
    max_connections: u32,
) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await
}

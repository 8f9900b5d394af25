use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::errors::DomainError;
use crate::value_objects::{
    age_on, AgeRange, Gender, GeoPoint, LinkId, PasswordHash, Timestamp, UserEmail, UserId,
    Username,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: NaiveDate,
    pub gender: Gender,
    #[serde(default)]
    pub bio: String,
    #[serde(default)]
    pub profile_pic_url: Option<String>,
}

impl Profile {
    pub fn age_on(&self, today: NaiveDate) -> u32 {
        age_on(self.date_of_birth, today)
    }
}

/// 配对偏好：接受的年龄区间与性别集合
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preferences {
    pub age_range: AgeRange,
    pub genders: Vec<Gender>,
}

impl Preferences {
    pub fn new(age_range: AgeRange, genders: Vec<Gender>) -> Result<Self, DomainError> {
        let mut genders = genders;
        genders.sort_by_key(|g| g.as_str());
        genders.dedup();
        if genders.is_empty() {
            return Err(DomainError::invalid_argument(
                "preferences.genders",
                "at least one gender must be accepted",
            ));
        }
        Ok(Self { age_range, genders })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct User {
    pub id: UserId,
    pub username: Username,
    pub email: UserEmail,
    #[serde(skip_serializing)] // 密码哈希不暴露给客户端
    pub password: PasswordHash,
    pub profile: Profile,
    pub preferences: Preferences,
    pub location: Option<GeoPoint>,
    pub is_searching: bool,
    /// 反向引用当前活跃（pending / accepted）的链接，不表示所有权
    pub current_link_id: Option<LinkId>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl User {
    #[allow(clippy::too_many_arguments)]
    pub fn register(
        id: UserId,
        username: Username,
        email: UserEmail,
        password: PasswordHash,
        profile: Profile,
        preferences: Preferences,
        location: Option<GeoPoint>,
        now: Timestamp,
    ) -> Self {
        Self {
            id,
            username,
            email,
            password,
            profile,
            preferences,
            location,
            is_searching: false,
            current_link_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn has_active_link(&self) -> bool {
        self.current_link_id.is_some()
    }

    pub fn start_searching(&mut self, now: Timestamp) -> Result<(), DomainError> {
        if self.has_active_link() {
            return Err(DomainError::UserAlreadyLinked);
        }
        self.is_searching = true;
        self.updated_at = now;
        Ok(())
    }

    pub fn stop_searching(&mut self, now: Timestamp) {
        self.is_searching = false;
        self.updated_at = now;
    }

    /// 进入链接：仅当用户仍在搜索且未持有链接时成功
    pub fn claim_for_link(&mut self, link_id: LinkId, now: Timestamp) -> bool {
        if !self.is_searching || self.has_active_link() {
            return false;
        }
        self.is_searching = false;
        self.current_link_id = Some(link_id);
        self.updated_at = now;
        true
    }

    /// 从链接释放：仅当当前链接仍是 `link_id` 时生效，避免误伤已进入新链接的用户
    pub fn release_from_link(&mut self, link_id: LinkId, now: Timestamp) -> bool {
        if self.current_link_id != Some(link_id) {
            return false;
        }
        self.current_link_id = None;
        self.is_searching = true;
        self.updated_at = now;
        true
    }

    pub fn update_profile(&mut self, profile: Profile, now: Timestamp) {
        self.profile = profile;
        self.updated_at = now;
    }

    pub fn update_preferences(&mut self, preferences: Preferences, now: Timestamp) {
        self.preferences = preferences;
        self.updated_at = now;
    }

    pub fn update_account(
        &mut self,
        username: Option<Username>,
        email: Option<UserEmail>,
        now: Timestamp,
    ) {
        if let Some(new_username) = username {
            self.username = new_username;
        }
        if let Some(new_email) = email {
            self.email = new_email;
        }
        self.updated_at = now;
    }

    pub fn move_to(&mut self, location: GeoPoint, now: Timestamp) {
        self.location = Some(location);
        self.updated_at = now;
    }
}

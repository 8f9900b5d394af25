use domain::{Chatroom, Gender, GeoPoint, Link, LinkStatus, Message, Profile, Timestamp, User};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreferencesDto {
    pub min_age: u32,
    pub max_age: u32,
    pub genders: Vec<Gender>,
}

/// 用户本人可见的完整资料，不含密码哈希
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserDto {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub profile: Profile,
    pub preferences: PreferencesDto,
    pub location: Option<GeoPoint>,
    pub is_searching: bool,
    pub current_link_id: Option<Uuid>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl From<&User> for UserDto {
    fn from(user: &User) -> Self {
        Self {
            id: Uuid::from(user.id),
            username: user.username.as_str().to_owned(),
            email: user.email.as_str().to_owned(),
            profile: user.profile.clone(),
            preferences: PreferencesDto {
                min_age: user.preferences.age_range.min,
                max_age: user.preferences.age_range.max,
                genders: user.preferences.genders.clone(),
            },
            location: user.location,
            is_searching: user.is_searching,
            current_link_id: user.current_link_id.map(Into::into),
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

/// 候选预览只暴露公开资料，不含邮箱与精确位置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateDto {
    pub id: Uuid,
    pub username: String,
    pub first_name: String,
    pub age: u32,
    pub gender: Gender,
    pub bio: String,
    pub profile_pic_url: Option<String>,
}

impl CandidateDto {
    pub fn from_user(user: &User, today: chrono::NaiveDate) -> Self {
        Self {
            id: Uuid::from(user.id),
            username: user.username.as_str().to_owned(),
            first_name: user.profile.first_name.clone(),
            age: user.profile.age_on(today),
            gender: user.profile.gender,
            bio: user.profile.bio.clone(),
            profile_pic_url: user.profile.profile_pic_url.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkDto {
    pub id: Uuid,
    pub user_a_id: Uuid,
    pub user_b_id: Uuid,
    pub status: LinkStatus,
    pub created_at: Timestamp,
    pub expires_at: Timestamp,
    pub updated_at: Timestamp,
}

impl From<&Link> for LinkDto {
    fn from(link: &Link) -> Self {
        Self {
            id: Uuid::from(link.id),
            user_a_id: Uuid::from(link.user_a_id),
            user_b_id: Uuid::from(link.user_b_id),
            status: link.status,
            created_at: link.created_at,
            expires_at: link.expires_at,
            updated_at: link.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatroomDto {
    pub id: Uuid,
    pub link_id: Uuid,
    pub user_a_id: Uuid,
    pub user_b_id: Uuid,
    pub is_locked: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl From<&Chatroom> for ChatroomDto {
    fn from(room: &Chatroom) -> Self {
        Self {
            id: Uuid::from(room.id),
            link_id: Uuid::from(room.link_id),
            user_a_id: Uuid::from(room.user_a_id),
            user_b_id: Uuid::from(room.user_b_id),
            is_locked: room.is_locked,
            created_at: room.created_at,
            updated_at: room.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageDto {
    pub id: Uuid,
    pub chatroom_id: Uuid,
    pub sender_id: Uuid,
    pub content: String,
    pub created_at: Timestamp,
}

impl From<&Message> for MessageDto {
    fn from(message: &Message) -> Self {
        Self {
            id: Uuid::from(message.id),
            chatroom_id: Uuid::from(message.chatroom_id),
            sender_id: Uuid::from(message.sender_id),
            content: message.content.as_str().to_owned(),
            created_at: message.created_at,
        }
    }
}

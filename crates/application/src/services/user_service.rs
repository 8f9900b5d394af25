use std::sync::Arc;

use domain::{
    AgeRange, DomainError, Gender, GeoPoint, Preferences, Profile, RepositoryError, User,
    UserEmail, UserId, UserRepository, Username,
};

use crate::{
    clock::Clock,
    error::{ApplicationError, ApplicationResult},
    password::PasswordHasher,
    timeouts::StoreTimeouts,
};

#[derive(Debug, Clone)]
pub struct PreferencesInput {
    pub min_age: u32,
    pub max_age: u32,
    pub genders: Vec<Gender>,
}

impl PreferencesInput {
    fn into_preferences(self) -> Result<Preferences, DomainError> {
        Preferences::new(AgeRange::new(self.min_age, self.max_age)?, self.genders)
    }
}

#[derive(Debug, Clone)]
pub struct RegisterUserRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub profile: Profile,
    pub preferences: PreferencesInput,
    /// (latitude, longitude)
    pub location: Option<(f64, f64)>,
}

#[derive(Debug, Clone)]
pub struct AuthenticateUserRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateAccountRequest {
    pub username: Option<String>,
    pub email: Option<String>,
}

pub struct UserServiceDependencies {
    pub user_repository: Arc<dyn UserRepository>,
    pub password_hasher: Arc<dyn PasswordHasher>,
    pub clock: Arc<dyn Clock>,
    pub timeouts: StoreTimeouts,
}

/// 账号、资料与搜索状态
pub struct UserService {
    deps: UserServiceDependencies,
}

impl UserService {
    pub fn new(deps: UserServiceDependencies) -> Self {
        Self { deps }
    }

    pub async fn register(&self, request: RegisterUserRequest) -> ApplicationResult<User> {
        let username = Username::parse(request.username)?;
        let email = UserEmail::parse(request.email)?;
        if request.password.is_empty() {
            return Err(DomainError::invalid_argument("password", "cannot be empty").into());
        }
        validate_profile(&request.profile)?;
        let preferences = request.preferences.into_preferences()?;
        let location = request
            .location
            .map(|(latitude, longitude)| GeoPoint::new(latitude, longitude))
            .transpose()?;

        if self.find_by_email(email.clone()).await?.is_some() {
            return Err(DomainError::UserAlreadyExists.into());
        }

        let password_hash = self.deps.password_hasher.hash(&request.password).await?;

        let user = User::register(
            UserId::generate(),
            username,
            email,
            password_hash,
            request.profile,
            preferences,
            location,
            self.deps.clock.now(),
        );

        let stored = match self
            .deps
            .timeouts
            .point("users.create", self.deps.user_repository.create(user))
            .await
        {
            Ok(stored) => stored,
            // 并发注册同一个邮箱
            Err(RepositoryError::Conflict) => return Err(DomainError::UserAlreadyExists.into()),
            Err(err) => return Err(err.into()),
        };

        tracing::info!(user_id = %stored.id, "user registered");
        Ok(stored)
    }

    pub async fn authenticate(&self, request: AuthenticateUserRequest) -> ApplicationResult<User> {
        let email =
            UserEmail::parse(request.email).map_err(|_| ApplicationError::Authentication)?;
        let user = self
            .find_by_email(email)
            .await?
            .ok_or(ApplicationError::Authentication)?;

        let password_ok = self
            .deps
            .password_hasher
            .verify(&request.password, &user.password)
            .await?;
        if !password_ok {
            return Err(ApplicationError::Authentication);
        }

        Ok(user)
    }

    pub async fn get_user(&self, user_id: UserId) -> ApplicationResult<User> {
        self.load(user_id).await
    }

    pub async fn update_profile(
        &self,
        user_id: UserId,
        profile: Profile,
    ) -> ApplicationResult<User> {
        validate_profile(&profile)?;
        let mut user = self.load(user_id).await?;
        user.update_profile(profile, self.deps.clock.now());
        self.save(user).await
    }

    pub async fn update_preferences(
        &self,
        user_id: UserId,
        preferences: PreferencesInput,
    ) -> ApplicationResult<User> {
        let preferences = preferences.into_preferences()?;
        let mut user = self.load(user_id).await?;
        user.update_preferences(preferences, self.deps.clock.now());
        self.save(user).await
    }

    pub async fn update_account(
        &self,
        user_id: UserId,
        request: UpdateAccountRequest,
    ) -> ApplicationResult<User> {
        let username = request.username.map(Username::parse).transpose()?;
        let email = request.email.map(UserEmail::parse).transpose()?;

        let mut user = self.load(user_id).await?;
        if let Some(email) = &email {
            if email != &user.email {
                if let Some(owner) = self.find_by_email(email.clone()).await? {
                    if owner.id != user.id {
                        return Err(DomainError::UserAlreadyExists.into());
                    }
                }
            }
        }

        user.update_account(username, email, self.deps.clock.now());
        self.save(user).await
    }

    pub async fn update_location(
        &self,
        user_id: UserId,
        latitude: f64,
        longitude: f64,
    ) -> ApplicationResult<()> {
        let location = GeoPoint::new(latitude, longitude)?;
        self.deps
            .timeouts
            .point(
                "users.update_location",
                self.deps
                    .user_repository
                    .update_location(user_id, location, self.deps.clock.now()),
            )
            .await
            .map_err(not_found_as_user)?;
        Ok(())
    }

    /// 持有链接时不能重新进入搜索
    pub async fn start_searching(&self, user_id: UserId) -> ApplicationResult<()> {
        let user = self.load(user_id).await?;
        if user.has_active_link() {
            return Err(DomainError::UserAlreadyLinked.into());
        }

        let applied = self
            .deps
            .timeouts
            .point(
                "users.set_searching",
                self.deps
                    .user_repository
                    .set_searching(user_id, true, self.deps.clock.now()),
            )
            .await
            .map_err(not_found_as_user)?;
        if !applied {
            // 读取之后被并发配对认领了
            return Err(DomainError::UserAlreadyLinked.into());
        }

        tracing::debug!(user_id = %user_id, "user started searching");
        Ok(())
    }

    /// 只影响搜索标记，不影响已有链接
    pub async fn stop_searching(&self, user_id: UserId) -> ApplicationResult<()> {
        self.deps
            .timeouts
            .point(
                "users.set_searching",
                self.deps
                    .user_repository
                    .set_searching(user_id, false, self.deps.clock.now()),
            )
            .await
            .map_err(not_found_as_user)?;

        tracing::debug!(user_id = %user_id, "user stopped searching");
        Ok(())
    }

    async fn load(&self, user_id: UserId) -> ApplicationResult<User> {
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

    async fn find_by_email(&self, email: UserEmail) -> ApplicationResult<Option<User>> {
        let user = self
            .deps
            .timeouts
            .point(
                "users.find_by_email",
                self.deps.user_repository.find_by_email(email),
            )
            .await?;
        Ok(user)
    }

    async fn save(&self, user: User) -> ApplicationResult<User> {
        let stored = self
            .deps
            .timeouts
            .point("users.update", self.deps.user_repository.update(user))
            .await
            .map_err(|err| match err {
                RepositoryError::Conflict => ApplicationError::from(DomainError::UserAlreadyExists),
                other => not_found_as_user(other),
            })?;
        Ok(stored)
    }
}

fn validate_profile(profile: &Profile) -> Result<(), DomainError> {
    if profile.first_name.trim().is_empty() {
        return Err(DomainError::invalid_argument(
            "profile.first_name",
            "cannot be empty",
        ));
    }
    if profile.last_name.trim().is_empty() {
        return Err(DomainError::invalid_argument(
            "profile.last_name",
            "cannot be empty",
        ));
    }
    Ok(())
}

fn not_found_as_user(err: RepositoryError) -> ApplicationError {
    match err {
        RepositoryError::NotFound => DomainError::UserNotFound.into(),
        other => other.into(),
    }
}

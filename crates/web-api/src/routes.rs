use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use application::{
    AuthenticateUserRequest, CandidateDto, ChatroomDto, LinkDto, MessageDto, PreferencesInput,
    RegisterUserRequest, UpdateAccountRequest, UserDto,
};
use domain::{ChatroomId, Gender, LinkId, Profile, UserId};

use crate::{
    error::ApiError,
    extract::{JsonBody, PathParams, QueryParams},
    state::AppState,
};

const DEFAULT_PREVIEW_LIMIT: u32 = 10;

#[derive(Debug, Deserialize)]
struct PreferencesPayload {
    min_age: u32,
    max_age: u32,
    genders: Vec<Gender>,
}

impl From<PreferencesPayload> for PreferencesInput {
    fn from(payload: PreferencesPayload) -> Self {
        Self {
            min_age: payload.min_age,
            max_age: payload.max_age,
            genders: payload.genders,
        }
    }
}

#[derive(Debug, Deserialize)]
struct LocationPayload {
    latitude: f64,
    longitude: f64,
}

#[derive(Debug, Deserialize)]
struct RegisterPayload {
    username: String,
    email: String,
    password: String,
    profile: Profile,
    preferences: PreferencesPayload,
    location: Option<LocationPayload>,
}

#[derive(Debug, Deserialize)]
struct LoginPayload {
    email: String,
    password: String,
}

#[derive(Debug, Deserialize)]
struct UpdateAccountPayload {
    username: Option<String>,
    email: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RespondPayload {
    accept: bool,
}

#[derive(Debug, Deserialize)]
struct SendMessagePayload {
    content: String,
}

#[derive(Debug, Deserialize)]
struct PreviewQuery {
    limit: Option<u32>,
}

#[derive(Debug, Serialize)]
struct RespondResponse {
    link: LinkDto,
    chatroom: Option<ChatroomDto>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest("/api/v1", api_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/users", post(register_user))
        .route("/login", post(login_user))
        .route("/users/{id}", get(get_user).put(update_account))
        .route("/users/{id}/profile", put(update_profile))
        .route("/users/{id}/preferences", put(update_preferences))
        .route("/users/{id}/location", put(update_location))
        .route("/users/{id}/start-searching", post(start_searching))
        .route("/users/{id}/stop-searching", post(stop_searching))
        .route("/users/{id}/matches", get(preview_matches))
        .route("/users/{id}/find-match", post(find_match))
        .route("/users/{user_id}/links/{link_id}", get(get_link))
        .route("/users/{user_id}/links/{link_id}/respond", post(respond_to_link))
        .route(
            "/users/{user_id}/links/{link_id}/chatroom",
            get(chatroom_for_link),
        )
        .route(
            "/users/{user_id}/chatrooms/{chatroom_id}/messages",
            post(send_message).get(get_messages),
        )
        .route(
            "/users/{user_id}/chatrooms/{chatroom_id}/proximity-unlock",
            post(proximity_unlock),
        )
        .route("/chatrooms/{chatroom_id}/unlock", post(unlock_chatroom))
}

async fn health() -> StatusCode {
    StatusCode::OK
}

async fn register_user(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<RegisterPayload>,
) -> Result<(StatusCode, Json<UserDto>), ApiError> {
    let user = state
        .user_service
        .register(RegisterUserRequest {
            username: payload.username,
            email: payload.email,
            password: payload.password,
            profile: payload.profile,
            preferences: payload.preferences.into(),
            location: payload.location.map(|l| (l.latitude, l.longitude)),
        })
        .await?;

    Ok((StatusCode::CREATED, Json(UserDto::from(&user))))
}

async fn login_user(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<LoginPayload>,
) -> Result<Json<UserDto>, ApiError> {
    let user = state
        .user_service
        .authenticate(AuthenticateUserRequest {
            email: payload.email,
            password: payload.password,
        })
        .await?;

    Ok(Json(UserDto::from(&user)))
}

async fn get_user(
    State(state): State<AppState>,
    PathParams(id): PathParams<Uuid>,
) -> Result<Json<UserDto>, ApiError> {
    let user = state.user_service.get_user(UserId::from(id)).await?;
    Ok(Json(UserDto::from(&user)))
}

async fn update_account(
    State(state): State<AppState>,
    PathParams(id): PathParams<Uuid>,
    JsonBody(payload): JsonBody<UpdateAccountPayload>,
) -> Result<Json<UserDto>, ApiError> {
    let user = state
        .user_service
        .update_account(
            UserId::from(id),
            UpdateAccountRequest {
                username: payload.username,
                email: payload.email,
            },
        )
        .await?;
    Ok(Json(UserDto::from(&user)))
}

async fn update_profile(
    State(state): State<AppState>,
    PathParams(id): PathParams<Uuid>,
    JsonBody(profile): JsonBody<Profile>,
) -> Result<Json<UserDto>, ApiError> {
    let user = state
        .user_service
        .update_profile(UserId::from(id), profile)
        .await?;
    Ok(Json(UserDto::from(&user)))
}

async fn update_preferences(
    State(state): State<AppState>,
    PathParams(id): PathParams<Uuid>,
    JsonBody(payload): JsonBody<PreferencesPayload>,
) -> Result<Json<UserDto>, ApiError> {
    let user = state
        .user_service
        .update_preferences(UserId::from(id), payload.into())
        .await?;
    Ok(Json(UserDto::from(&user)))
}

async fn update_location(
    State(state): State<AppState>,
    PathParams(id): PathParams<Uuid>,
    JsonBody(payload): JsonBody<LocationPayload>,
) -> Result<StatusCode, ApiError> {
    state
        .user_service
        .update_location(UserId::from(id), payload.latitude, payload.longitude)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn start_searching(
    State(state): State<AppState>,
    PathParams(id): PathParams<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.user_service.start_searching(UserId::from(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn stop_searching(
    State(state): State<AppState>,
    PathParams(id): PathParams<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.user_service.stop_searching(UserId::from(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn preview_matches(
    State(state): State<AppState>,
    PathParams(id): PathParams<Uuid>,
    QueryParams(query): QueryParams<PreviewQuery>,
) -> Result<Json<Vec<CandidateDto>>, ApiError> {
    let limit = query.limit.unwrap_or(DEFAULT_PREVIEW_LIMIT);
    let candidates = state
        .match_finder
        .search_candidates(UserId::from(id), limit)
        .await?;

    let today = state.clock.today();
    Ok(Json(
        candidates
            .iter()
            .map(|user| CandidateDto::from_user(user, today))
            .collect(),
    ))
}

async fn find_match(
    State(state): State<AppState>,
    PathParams(id): PathParams<Uuid>,
) -> Result<(StatusCode, Json<LinkDto>), ApiError> {
    let link = state.link_service.find_match(UserId::from(id)).await?;
    Ok((StatusCode::CREATED, Json(LinkDto::from(&link))))
}

async fn get_link(
    State(state): State<AppState>,
    PathParams((user_id, link_id)): PathParams<(Uuid, Uuid)>,
) -> Result<Json<LinkDto>, ApiError> {
    let link = state
        .link_service
        .get_link(UserId::from(user_id), LinkId::from(link_id))
        .await?;
    Ok(Json(LinkDto::from(&link)))
}

async fn respond_to_link(
    State(state): State<AppState>,
    PathParams((user_id, link_id)): PathParams<(Uuid, Uuid)>,
    JsonBody(payload): JsonBody<RespondPayload>,
) -> Result<Json<RespondResponse>, ApiError> {
    let response = state
        .link_service
        .respond_to_link(UserId::from(user_id), LinkId::from(link_id), payload.accept)
        .await?;

    Ok(Json(RespondResponse {
        link: LinkDto::from(&response.link),
        chatroom: response.chatroom.as_ref().map(ChatroomDto::from),
    }))
}

async fn chatroom_for_link(
    State(state): State<AppState>,
    PathParams((user_id, link_id)): PathParams<(Uuid, Uuid)>,
) -> Result<Json<ChatroomDto>, ApiError> {
    let chatroom = state
        .chatroom_gate
        .chatroom_for_link(UserId::from(user_id), LinkId::from(link_id))
        .await?;
    Ok(Json(ChatroomDto::from(&chatroom)))
}

async fn send_message(
    State(state): State<AppState>,
    PathParams((user_id, chatroom_id)): PathParams<(Uuid, Uuid)>,
    JsonBody(payload): JsonBody<SendMessagePayload>,
) -> Result<(StatusCode, Json<MessageDto>), ApiError> {
    let message = state
        .chatroom_gate
        .send_message(
            UserId::from(user_id),
            ChatroomId::from(chatroom_id),
            payload.content,
        )
        .await?;
    Ok((StatusCode::CREATED, Json(MessageDto::from(&message))))
}

async fn get_messages(
    State(state): State<AppState>,
    PathParams((user_id, chatroom_id)): PathParams<(Uuid, Uuid)>,
) -> Result<Json<Vec<MessageDto>>, ApiError> {
    let messages = state
        .chatroom_gate
        .get_messages(UserId::from(user_id), ChatroomId::from(chatroom_id))
        .await?;
    Ok(Json(messages.iter().map(MessageDto::from).collect()))
}

async fn proximity_unlock(
    State(state): State<AppState>,
    PathParams((user_id, chatroom_id)): PathParams<(Uuid, Uuid)>,
) -> Result<Json<ChatroomDto>, ApiError> {
    let chatroom = state
        .chatroom_gate
        .proximity_unlock(UserId::from(user_id), ChatroomId::from(chatroom_id))
        .await?;
    Ok(Json(ChatroomDto::from(&chatroom)))
}

async fn unlock_chatroom(
    State(state): State<AppState>,
    PathParams(chatroom_id): PathParams<Uuid>,
) -> Result<Json<ChatroomDto>, ApiError> {
    let chatroom = state
        .chatroom_gate
        .unlock(ChatroomId::from(chatroom_id))
        .await?;
    Ok(Json(ChatroomDto::from(&chatroom)))
}

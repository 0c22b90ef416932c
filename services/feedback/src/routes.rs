//! Feedback service routes

use axum::{
    Json, Router,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use axum_extra::extract::CookieJar;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{error, info};

use crate::{
    AppState, authz,
    error::{ApiError, ApiResult},
    models::{
        Feedback, FeedbackForm, LoginCredentials, RegisterForm, User, UserResponse, UserSummary,
    },
    validation::{self, FieldErrors},
};

const LOGIN_TO_VIEW: &str = "Please login to view user feedback!";
const LOGIN_TO_ADD: &str = "Please login to add feedback!";
const LOGIN_TO_UPDATE: &str = "Please login to update feedback!";
const LOGIN_TO_DELETE_FEEDBACK: &str = "You must be logged in to delete feedback.";
const LOGIN_TO_DELETE_ACCOUNT: &str = "You must be logged in to delete your account.";

/// A user page: the account and everything they posted
#[derive(Debug, Serialize, Deserialize)]
pub struct UserDetailResponse {
    pub user: UserResponse,
    pub feedback: Vec<Feedback>,
}

/// Create the router for the feedback service
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health_check))
        .route("/register", get(register_form).post(register))
        .route("/login", get(login_form).post(login))
        .route("/logout", get(logout))
        .route("/users/:username", get(show_user))
        .route(
            "/users/:username/feedback/add",
            get(add_feedback_form).post(add_feedback),
        )
        .route("/users/:username/delete", get(delete_user))
        .route(
            "/feedback/:id/update",
            get(edit_feedback_form).post(update_feedback),
        )
        .route("/feedback/:id/delete", get(delete_feedback))
        .with_state(state)
}

fn session_failure(e: anyhow::Error) -> ApiError {
    error!("Session backend failure: {}", e);
    ApiError::InternalServerError
}

async fn session_user(state: &AppState, jar: &CookieJar) -> ApiResult<Option<i32>> {
    state.sessions.current(jar).await.map_err(session_failure)
}

/// Decode a JSON form; handlers call this only after their session gates
fn form_body<T>(body: Result<Json<T>, JsonRejection>) -> ApiResult<T> {
    body.map(|Json(form)| form).map_err(|rejection| {
        let mut errors = FieldErrors::new();
        errors.insert("body", rejection.body_text());
        ApiError::Validation(errors)
    })
}

async fn find_user(state: &AppState, username: &str) -> ApiResult<User> {
    state
        .users
        .find_by_username(username)
        .await?
        .ok_or(ApiError::NotFound)
}

/// Load a user page's owner and check the session user is that owner
async fn owned_user(state: &AppState, session_user_id: i32, username: &str) -> ApiResult<User> {
    let user = find_user(state, username).await?;
    authz::ensure_owner(session_user_id, user.id)?;
    Ok(user)
}

/// Load a feedback row and check the session user owns it
async fn owned_feedback(state: &AppState, session_user_id: i32, id: i32) -> ApiResult<Feedback> {
    let feedback = state.feedback.get(id).await?;
    let owner = find_user(state, &feedback.username).await?;
    authz::ensure_owner(session_user_id, owner.id)?;
    Ok(feedback)
}

/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "feedback-service"
    }))
}

/// Home page: every registered user
pub async fn index(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let users: Vec<UserSummary> = state
        .users
        .list()
        .await?
        .into_iter()
        .map(UserSummary::from)
        .collect();

    Ok(Json(users))
}

/// Registration form, unless already logged in
pub async fn register_form(
    State(state): State<AppState>,
    jar: CookieJar,
) -> ApiResult<impl IntoResponse> {
    if session_user(&state, &jar).await?.is_some() {
        return Err(ApiError::AlreadyAuthenticated);
    }

    Ok(Json(json!({
        "fields": ["username", "password", "email", "first_name", "last_name"]
    })))
}

/// Register a new account and log it in
pub async fn register(
    State(state): State<AppState>,
    jar: CookieJar,
    body: Result<Json<RegisterForm>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    if session_user(&state, &jar).await?.is_some() {
        return Err(ApiError::AlreadyAuthenticated);
    }
    let form = form_body(body)?;
    validation::validate_register(&form).map_err(ApiError::Validation)?;

    let user = state.credentials.register(form).await?;
    let jar = state
        .sessions
        .start(jar, user.id)
        .await
        .map_err(session_failure)?;

    Ok((
        StatusCode::CREATED,
        jar,
        Json(json!({
            "message": "Welcome! Successfully Created Your Account!",
            "user": UserResponse::from(user),
        })),
    ))
}

/// Login form, unless already logged in
pub async fn login_form(
    State(state): State<AppState>,
    jar: CookieJar,
) -> ApiResult<impl IntoResponse> {
    if session_user(&state, &jar).await?.is_some() {
        return Err(ApiError::AlreadyAuthenticated);
    }

    Ok(Json(json!({ "fields": ["username", "password"] })))
}

/// User login endpoint
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    body: Result<Json<LoginCredentials>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    if session_user(&state, &jar).await?.is_some() {
        return Err(ApiError::AlreadyAuthenticated);
    }
    let credentials = form_body(body)?;
    validation::validate_login(&credentials).map_err(ApiError::Validation)?;

    info!("Login attempt for user: {}", credentials.username);

    let user = state
        .credentials
        .authenticate(&credentials.username, &credentials.password)
        .await?
        .ok_or(ApiError::InvalidCredentials)?;

    let jar = state
        .sessions
        .start(jar, user.id)
        .await
        .map_err(session_failure)?;

    Ok((
        jar,
        Json(json!({
            "message": format!("Welcome Back, {}!", user.username),
            "user": UserResponse::from(user),
        })),
    ))
}

/// Logout endpoint; succeeds with or without a session
pub async fn logout(
    State(state): State<AppState>,
    jar: CookieJar,
) -> ApiResult<impl IntoResponse> {
    let jar = state.sessions.end(jar).await.map_err(session_failure)?;

    Ok((jar, Json(json!({ "message": "Goodbye!" }))))
}

/// A user's page with their feedback; any logged-in user may view it
pub async fn show_user(
    State(state): State<AppState>,
    jar: CookieJar,
    Path(username): Path<String>,
) -> ApiResult<impl IntoResponse> {
    authz::require_login(session_user(&state, &jar).await?, LOGIN_TO_VIEW)?;

    let user = find_user(&state, &username).await?;
    let feedback = state.feedback.list_by_owner(&user.username).await?;

    Ok(Json(UserDetailResponse {
        user: UserResponse::from(user),
        feedback,
    }))
}

/// Empty add-feedback form for the page owner
pub async fn add_feedback_form(
    State(state): State<AppState>,
    jar: CookieJar,
    Path(username): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let user_id = authz::require_login(session_user(&state, &jar).await?, LOGIN_TO_ADD)?;
    owned_user(&state, user_id, &username).await?;

    Ok(Json(FeedbackForm::default()))
}

/// Create feedback on the session user's own page
pub async fn add_feedback(
    State(state): State<AppState>,
    jar: CookieJar,
    Path(username): Path<String>,
    body: Result<Json<FeedbackForm>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let user_id = authz::require_login(session_user(&state, &jar).await?, LOGIN_TO_ADD)?;
    let user = owned_user(&state, user_id, &username).await?;
    let form = form_body(body)?;
    validation::validate_feedback(&form).map_err(ApiError::Validation)?;

    let feedback = state
        .feedback
        .create(&form.into_new_feedback(&user.username))
        .await?;
    info!("User {} added feedback {}", user.username, feedback.id);

    Ok((StatusCode::CREATED, Json(feedback)))
}

/// Current title and content of a feedback row, for its owner
pub async fn edit_feedback_form(
    State(state): State<AppState>,
    jar: CookieJar,
    Path(id): Path<i32>,
) -> ApiResult<impl IntoResponse> {
    let user_id = authz::require_login(session_user(&state, &jar).await?, LOGIN_TO_UPDATE)?;
    let feedback = owned_feedback(&state, user_id, id).await?;

    Ok(Json(FeedbackForm::from(feedback)))
}

/// Replace title and content of a feedback row
pub async fn update_feedback(
    State(state): State<AppState>,
    jar: CookieJar,
    Path(id): Path<i32>,
    body: Result<Json<FeedbackForm>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let user_id = authz::require_login(session_user(&state, &jar).await?, LOGIN_TO_UPDATE)?;
    owned_feedback(&state, user_id, id).await?;
    let form = form_body(body)?;
    validation::validate_feedback(&form).map_err(ApiError::Validation)?;

    let feedback = state
        .feedback
        .update(id, &form.title, &form.content)
        .await?;
    info!("User {} updated feedback {}", feedback.username, feedback.id);

    Ok(Json(feedback))
}

/// Delete a feedback row
pub async fn delete_feedback(
    State(state): State<AppState>,
    jar: CookieJar,
    Path(id): Path<i32>,
) -> ApiResult<impl IntoResponse> {
    let user_id =
        authz::require_login(session_user(&state, &jar).await?, LOGIN_TO_DELETE_FEEDBACK)?;
    let feedback = owned_feedback(&state, user_id, id).await?;

    state.feedback.delete(feedback.id).await?;
    info!("User {} deleted feedback {}", feedback.username, feedback.id);

    Ok(Json(json!({
        "message": "Feedback deleted.",
        "redirect": format!("/users/{}", feedback.username),
    })))
}

/// Delete the session user's account with all their feedback, then log out
pub async fn delete_user(
    State(state): State<AppState>,
    jar: CookieJar,
    Path(username): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let user_id =
        authz::require_login(session_user(&state, &jar).await?, LOGIN_TO_DELETE_ACCOUNT)?;
    let user = owned_user(&state, user_id, &username).await?;

    state.users.delete(user.id).await?;
    let jar = state.sessions.end(jar).await.map_err(session_failure)?;
    info!("Deleted account: {}", user.username);

    Ok((jar, Json(json!({ "message": "Account deleted" }))))
}

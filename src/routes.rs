use anyhow::Context;
use async_trait::async_trait;
use axum::{
    extract::{ConnectInfo, FromRequest, Request, State},
    http::{header::SET_COOKIE, HeaderMap, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

use crate::auth::{
    clear_session_cookie, hash_password, session_cookie, session_token, validate_credentials,
    verify_password, CurrentUser, MaybeUser,
};
use crate::error::AppError;
use crate::records::{ListName, SavedOutcome, User};
use crate::state::AppState;
use crate::translation::{word_count, LineOutcome};

// ==================== Payloads ====================

/// JSON body whose rejections go through `AppError` as 400s
#[derive(Debug)]
pub struct AppJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for AppJson<T>
where
    Json<T>: FromRequest<S, Rejection = axum::extract::rejection::JsonRejection>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(AppJson(value))
    }
}

#[derive(Debug, Deserialize)]
pub struct Credentials {
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PairRequest {
    pub english: Option<String>,
    pub telugu: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct IndexRequest {
    pub index: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct TranslateRequest {
    pub text: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslateResponse {
    pub translation: String,
    pub lines: Vec<LineOutcome>,
    pub word_count: usize,
    pub complete: bool,
    pub recorded: bool,
}

fn message(text: &str) -> Json<Value> {
    Json(json!({ "message": text, "success": true }))
}

fn required(value: Option<String>, field: &str) -> Result<String, AppError> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| AppError::Validation(format!("{} is required", field)))
}

fn required_pair(body: PairRequest) -> Result<(String, String), AppError> {
    let english = required(body.english, "english")?;
    let telugu = required(body.telugu, "telugu")?;
    Ok((english.trim().to_string(), telugu.trim().to_string()))
}

fn required_index(body: IndexRequest) -> Result<i64, AppError> {
    body.index
        .ok_or_else(|| AppError::Validation("index is required".to_string()))
}

fn client_key(connect: Option<&ConnectInfo<SocketAddr>>) -> String {
    connect
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

// ==================== Identity ====================

pub async fn signup(
    State(state): State<Arc<AppState>>,
    AppJson(body): AppJson<Credentials>,
) -> Result<impl IntoResponse, AppError> {
    let password = body.password.unwrap_or_default();
    let username = validate_credentials(&body.username.unwrap_or_default(), &password)?;

    let password_hash = tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .context("Password hashing task failed")??;

    if !state
        .store
        .create_user(&User::new(&username, password_hash))
        .await?
    {
        return Err(AppError::UsernameTaken);
    }

    info!("New account created: {}", username);
    Ok((StatusCode::CREATED, message("Account created successfully")))
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    connect: Option<ConnectInfo<SocketAddr>>,
    AppJson(body): AppJson<Credentials>,
) -> Result<Response, AppError> {
    let key = client_key(connect.as_ref());
    if !state.limiter.check(&key).await {
        warn!("Login throttled for {}", key);
        return Err(AppError::TooManyAttempts);
    }

    let username = required(body.username, "username")?.trim().to_string();
    let password = required(body.password, "password")?;

    let stored_hash = state
        .store
        .find_user(&username)
        .await?
        .map(|user| user.password_hash);
    let valid = match stored_hash {
        Some(hash) => tokio::task::spawn_blocking(move || verify_password(&password, &hash))
            .await
            .context("Password verification task failed")?,
        None => false,
    };

    if !valid {
        state.limiter.record_failure(&key).await;
        return Err(AppError::Unauthorized(
            "Invalid username or password".to_string(),
        ));
    }

    state.limiter.reset(&key).await;
    let token = state.sessions.create(&username).await;
    let cookie = session_cookie(&token, state.sessions.ttl(), state.config.cookie_secure);
    info!("{} logged in", username);

    Ok(([(SET_COOKIE, cookie)], message("Login successful")).into_response())
}

pub async fn logout(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    if let Some(token) = session_token(&headers) {
        state.sessions.destroy(&token).await;
    }
    ([(SET_COOKIE, clear_session_cookie())], message("Logged out")).into_response()
}

pub async fn current_user(CurrentUser(username): CurrentUser) -> Json<Value> {
    Json(json!({ "username": username }))
}

// ==================== Translation ====================

pub async fn translate(
    State(state): State<Arc<AppState>>,
    MaybeUser(user): MaybeUser,
    AppJson(body): AppJson<TranslateRequest>,
) -> Json<TranslateResponse> {
    let text = body.text.unwrap_or_default();
    let translation = state.translator.translate(&text).await;
    let translated = translation.text();

    let mut recorded = false;
    if let Some(username) = user.as_deref() {
        if translation.is_complete() {
            match state
                .recorder
                .record_history(username, &translation.source, &translated)
                .await
            {
                Ok(_) => recorded = true,
                Err(e) => warn!("Failed to record history for {}: {}", username, e),
            }
        }
    }

    Json(TranslateResponse {
        word_count: word_count(&translation.source),
        complete: translation.is_complete(),
        translation: translated,
        lines: translation.lines,
        recorded,
    })
}

// ==================== History & Saved ====================

pub async fn save_translation(
    State(state): State<Arc<AppState>>,
    CurrentUser(username): CurrentUser,
    AppJson(body): AppJson<PairRequest>,
) -> Result<Json<Value>, AppError> {
    let (english, telugu) = required_pair(body)?;
    state
        .recorder
        .record_history(&username, &english, &telugu)
        .await?;
    Ok(message("Translation saved to history"))
}

pub async fn save_to_saved(
    State(state): State<Arc<AppState>>,
    CurrentUser(username): CurrentUser,
    AppJson(body): AppJson<PairRequest>,
) -> Result<Json<Value>, AppError> {
    let (english, telugu) = required_pair(body)?;
    let outcome = state
        .recorder
        .record_saved(&username, &english, &telugu)
        .await?;

    Ok(match outcome {
        SavedOutcome::Saved => message("Translation saved"),
        SavedOutcome::AlreadySaved => Json(json!({
            "message": "Translation already saved",
            "success": false,
            "alreadySaved": true
        })),
    })
}

pub async fn get_history(
    State(state): State<Arc<AppState>>,
    CurrentUser(username): CurrentUser,
) -> Result<Json<Value>, AppError> {
    let translations = state.recorder.list(&username, ListName::History).await?;
    Ok(Json(json!({ "translations": translations })))
}

pub async fn get_saved(
    State(state): State<Arc<AppState>>,
    CurrentUser(username): CurrentUser,
) -> Result<Json<Value>, AppError> {
    let saved = state.recorder.list(&username, ListName::Saved).await?;
    Ok(Json(json!({ "savedTranslations": saved })))
}

pub async fn delete_history_item(
    State(state): State<Arc<AppState>>,
    CurrentUser(username): CurrentUser,
    AppJson(body): AppJson<IndexRequest>,
) -> Result<Json<Value>, AppError> {
    let index = required_index(body)?;
    state
        .recorder
        .delete_one(&username, ListName::History, index)
        .await?;
    Ok(message("History item deleted"))
}

pub async fn delete_saved_item(
    State(state): State<Arc<AppState>>,
    CurrentUser(username): CurrentUser,
    AppJson(body): AppJson<IndexRequest>,
) -> Result<Json<Value>, AppError> {
    let index = required_index(body)?;
    state
        .recorder
        .delete_one(&username, ListName::Saved, index)
        .await?;
    Ok(message("Saved translation deleted"))
}

pub async fn delete_history(
    State(state): State<Arc<AppState>>,
    CurrentUser(username): CurrentUser,
) -> Result<Json<Value>, AppError> {
    state.recorder.clear_all(&username, ListName::History).await?;
    Ok(message("History cleared"))
}

pub async fn delete_saved(
    State(state): State<Arc<AppState>>,
    CurrentUser(username): CurrentUser,
) -> Result<Json<Value>, AppError> {
    state.recorder.clear_all(&username, ListName::Saved).await?;
    Ok(message("Saved translations cleared"))
}

pub async fn health(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "store": state.store.kind(),
        "providers": state.translator.provider_names(),
        "activeSessions": state.sessions.len().await,
        "metrics": state.metrics.report(),
    }))
}

// ==================== Pages ====================

async fn page(state: &AppState, file: &str) -> Result<Html<String>, AppError> {
    let path = Path::new(&state.config.static_dir).join(file);
    let html = tokio::fs::read_to_string(&path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(Html(html))
}

/// Login page, or straight to the translator when already signed in
pub async fn login_page(
    State(state): State<Arc<AppState>>,
    MaybeUser(user): MaybeUser,
) -> Result<Response, AppError> {
    if user.is_some() {
        return Ok(Redirect::to("/home").into_response());
    }
    Ok(page(&state, "login.html").await?.into_response())
}

pub async fn home_page(
    State(state): State<Arc<AppState>>,
    MaybeUser(user): MaybeUser,
) -> Result<Response, AppError> {
    if user.is_none() {
        return Ok(Redirect::to("/").into_response());
    }
    Ok(page(&state, "index.html").await?.into_response())
}

/// Pages must be reached through their routes, not by file name
pub async fn forbidden_page(State(state): State<Arc<AppState>>) -> Response {
    let body = page(&state, "forbidden.html")
        .await
        .unwrap_or_else(|_| Html("<h1>403 Forbidden</h1>".to_string()));
    (StatusCode::FORBIDDEN, body).into_response()
}

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post, put},
    Json, Router,
};
use serde_json::{Map, Value};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer};
use uuid::Uuid;

use crate::auth::{AuthService, LoginResponse, TokenKeys};
use crate::config::Config;
use crate::error::{ApiError, Result};
use crate::models::{CreateNoteRequest, CredentialsRequest, NoteView};
use crate::notes::NotesService;
use crate::store::{NoteStore, UserStore};

const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

pub type AppState = Arc<AppData>;

pub struct AppData {
    pub auth: AuthService,
    pub notes: NotesService,
}

impl AppData {
    pub fn new(users: Arc<dyn UserStore>, notes: Arc<dyn NoteStore>, config: &Config) -> Result<AppState> {
        let tokens = TokenKeys::new(&config.jwt_secret, config.token_ttl_seconds);
        Ok(AppState::new(AppData {
            auth: AuthService::new(users.clone(), tokens, config.bcrypt_cost)?,
            notes: NotesService::new(users, notes),
        }))
    }
}

pub fn router(state: AppState, cors: CorsLayer) -> Router {
    let api = Router::new()
        .route("/test", get(health))
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/me", get(current_user))
        .route("/notes", get(list_notes).post(create_note))
        .route("/notes/:id", put(update_note).delete(delete_note));

    Router::new()
        .nest("/api", api)
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(cors)
        .with_state(state)
}

fn msg(text: &str) -> Json<Value> {
    Json(serde_json::json!({ "msg": text }))
}

// Ids that can't be parsed can't name an existing note
fn parse_note_id(raw: &str) -> Result<Uuid> {
    Uuid::parse_str(raw).map_err(|_| ApiError::NotFound("Note not found".to_string()))
}

async fn health() -> Json<Value> {
    Json(serde_json::json!({
        "msg": "Backend is working!",
        "status": "ok"
    }))
}

async fn register(
    State(state): State<AppState>,
    body: std::result::Result<Json<CredentialsRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Value>)> {
    let Json(req) = body?;
    state.auth.register(req.username, req.password).await?;
    Ok((StatusCode::CREATED, msg("User registered successfully")))
}

async fn login(
    State(state): State<AppState>,
    body: std::result::Result<Json<CredentialsRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>> {
    let Json(req) = body?;
    let response = state.auth.login(req.username, req.password).await?;
    Ok(Json(response))
}

async fn logout(headers: HeaderMap, State(state): State<AppState>) -> Result<Json<Value>> {
    let auth_state = state.auth.verify_token(&headers)?;
    state.auth.logout(auth_state).await?;
    Ok(msg("Successfully logged out"))
}

async fn current_user(headers: HeaderMap, State(state): State<AppState>) -> Result<Json<Value>> {
    let auth_state = state.auth.verify_token(&headers)?;
    let user = state.auth.current_user(auth_state).await?;

    Ok(Json(serde_json::json!({
        "username": user.username,
        "id": user.id
    })))
}

async fn list_notes(headers: HeaderMap, State(state): State<AppState>) -> Result<Json<Vec<NoteView>>> {
    let auth_state = state.auth.verify_token(&headers)?;
    let notes = state.notes.list_notes(auth_state.user_id).await?;
    Ok(Json(notes.into_iter().map(NoteView::from).collect()))
}

async fn create_note(
    headers: HeaderMap,
    State(state): State<AppState>,
    body: std::result::Result<Json<CreateNoteRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Value>)> {
    let auth_state = state.auth.verify_token(&headers)?;
    let Json(req) = body?;

    let id = state
        .notes
        .create_note(auth_state.user_id, req.title, req.content)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({ "msg": "Note created!", "id": id })),
    ))
}

async fn update_note(
    headers: HeaderMap,
    Path(note_id): Path<String>,
    State(state): State<AppState>,
    body: std::result::Result<Json<Map<String, Value>>, JsonRejection>,
) -> Result<Json<Value>> {
    let auth_state = state.auth.verify_token(&headers)?;
    let note_id = parse_note_id(&note_id)?;
    // A bad body only matters once the note is found and owned
    let fields = body.map(|Json(fields)| fields).map_err(ApiError::from);

    state.notes.update_note(auth_state.user_id, note_id, fields).await?;
    Ok(msg("Note updated!"))
}

async fn delete_note(
    headers: HeaderMap,
    Path(note_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<Value>> {
    let auth_state = state.auth.verify_token(&headers)?;
    let note_id = parse_note_id(&note_id)?;

    state.notes.delete_note(auth_state.user_id, note_id).await?;
    Ok(msg("Note deleted!"))
}

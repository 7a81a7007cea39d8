//! Route handlers

use super::auth::AuthUser;
use super::error::ApiError;
use super::AppState;
use crate::gallery::list_published_images;
use crate::pipeline::GenerationResult;
use crate::protocol::{
    ChatData, ChatIdRequest, ChatList, Envelope, Gallery, Notice, SubmitRequest, UserData,
};
use crate::providers::GenerationMode;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};

type ApiResult<T> = std::result::Result<Json<Envelope<T>>, ApiError>;

/// Register all API routes
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/message/text", post(submit_text))
        .route("/api/message/image", post(submit_image))
        .route("/api/message/published", get(published_images))
        .route("/api/chat/get", get(list_chats))
        .route("/api/chat/create", post(create_chat))
        .route("/api/chat/delete", post(delete_chat))
        .route("/api/chat/open", get(open_chat))
        .route("/api/user/data", get(user_data))
}

fn json_body<T>(body: std::result::Result<Json<T>, JsonRejection>) -> std::result::Result<T, ApiError> {
    body.map(|Json(value)| value)
        .map_err(|e| ApiError::bad_request(e.body_text()))
}

async fn submit_text(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    body: std::result::Result<Json<SubmitRequest>, JsonRejection>,
) -> ApiResult<GenerationResult> {
    let req = json_body(body)?;
    submit(state, user.id, req, GenerationMode::Text).await
}

async fn submit_image(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    body: std::result::Result<Json<SubmitRequest>, JsonRejection>,
) -> ApiResult<GenerationResult> {
    let req = json_body(body)?;
    submit(state, user.id, req, GenerationMode::Image).await
}

/// Run a turn on its own task
///
/// Once started the turn completes even if the client disconnects, so the
/// prompt, reply and debit are never left half-applied by a dropped
/// connection.
async fn submit(
    state: AppState,
    user_id: String,
    req: SubmitRequest,
    mode: GenerationMode,
) -> ApiResult<GenerationResult> {
    let pipeline = state.pipeline.clone();
    let handle = tokio::spawn(async move {
        pipeline
            .submit(&user_id, &req.chat_id, &req.prompt, mode, req.is_published)
            .await
    });

    let result = handle
        .await
        .map_err(|e| ApiError::internal(anyhow::anyhow!("generation task failed: {}", e)))??;

    Ok(Json(Envelope::ok(result)))
}

async fn published_images(State(state): State<AppState>) -> ApiResult<Gallery> {
    let images = list_published_images(state.chats.as_ref())?;
    Ok(Json(Envelope::ok(Gallery { images })))
}

async fn list_chats(State(state): State<AppState>, AuthUser(user): AuthUser) -> ApiResult<ChatList> {
    let data = state.chats.list_by_owner(&user.id)?;
    Ok(Json(Envelope::ok(ChatList { data })))
}

async fn create_chat(State(state): State<AppState>, AuthUser(user): AuthUser) -> ApiResult<ChatData> {
    let chat = state.chats.create(&user.id, &user.name)?;
    tracing::info!(user_id = %user.id, chat_id = %chat.id, "Chat created");
    Ok(Json(Envelope::ok(ChatData { data: chat })))
}

async fn delete_chat(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    body: std::result::Result<Json<ChatIdRequest>, JsonRejection>,
) -> ApiResult<Notice> {
    let req = json_body(body)?;
    if !state.chats.delete(&req.chat_id, &user.id)? {
        return Err(ApiError::chat_not_found());
    }

    tracing::info!(user_id = %user.id, chat_id = %req.chat_id, "Chat deleted");
    Ok(Json(Envelope::ok(Notice {
        message: "Chat Deleted".to_string(),
    })))
}

async fn open_chat(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    query: std::result::Result<Query<ChatIdRequest>, QueryRejection>,
) -> ApiResult<ChatData> {
    let Query(req) = query.map_err(|e| ApiError::bad_request(e.body_text()))?;
    let chat = state
        .chats
        .get(&req.chat_id, &user.id)?
        .ok_or_else(ApiError::chat_not_found)?;
    Ok(Json(Envelope::ok(ChatData { data: chat })))
}

async fn user_data(AuthUser(user): AuthUser) -> ApiResult<UserData> {
    Ok(Json(Envelope::ok(UserData { user })))
}

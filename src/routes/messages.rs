use actix_web::{get, post, put, web, HttpResponse};
use serde_json::json;
use uuid::Uuid;

use crate::error::AppError;
use crate::middleware::AuthedUser;
use crate::services::{ConversationService, MessageService, SendMessagePayload};
use crate::state::AppState;

/// Peer directory: every other user with presence, server-computed unseen
/// counts and last-message summaries.
#[get("/api/messages/users")]
pub async fn get_peers(
    state: web::Data<AppState>,
    user: AuthedUser,
) -> Result<HttpResponse, AppError> {
    let directory = ConversationService::list_peers(
        state.store.as_ref(),
        state.users.as_ref(),
        &state.registry,
        user.id,
    )
    .await?;

    Ok(HttpResponse::Ok().json(json!({
        "status": "success",
        "users": directory.users,
        "unseenMessages": directory.unseen_messages,
        "lastMessages": directory.last_messages,
    })))
}

#[post("/api/messages/send/{receiver_id}")]
pub async fn send_message(
    state: web::Data<AppState>,
    user: AuthedUser,
    path: web::Path<Uuid>,
    payload: web::Json<SendMessagePayload>,
) -> Result<HttpResponse, AppError> {
    let receiver_id = path.into_inner();
    let record = MessageService::send_message(
        state.store.as_ref(),
        state.users.as_ref(),
        state.assets.as_ref(),
        &state.registry,
        user.id,
        receiver_id,
        payload.into_inner(),
    )
    .await?;

    Ok(HttpResponse::Ok().json(json!({
        "status": "success",
        "message": record,
    })))
}

/// Single-message seen mark for the socket-driven path.
#[put("/api/messages/mark/{message_id}")]
pub async fn mark_message_seen(
    state: web::Data<AppState>,
    _user: AuthedUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    MessageService::mark_message_seen(state.store.as_ref(), path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(json!({
        "status": "success",
        "message": "Message marked as seen",
    })))
}

/// Full history with a peer. Side effect: marks everything the peer sent
/// as seen (read-on-fetch).
#[get("/api/messages/{peer_id}")]
pub async fn get_messages(
    state: web::Data<AppState>,
    user: AuthedUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let messages =
        MessageService::conversation_with(state.store.as_ref(), user.id, path.into_inner())
            .await?;

    Ok(HttpResponse::Ok().json(json!({
        "status": "success",
        "messages": messages,
    })))
}

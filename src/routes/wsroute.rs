use actix_web::{get, web, Error, HttpRequest, HttpResponse};
use actix_web_actors::ws;
use serde::Deserialize;
use uuid::Uuid;

use crate::state::AppState;
use crate::websocket::session::{PushFrame, WsSession};

#[derive(Debug, Deserialize)]
pub struct WsParams {
    pub user_id: Uuid,
}

/// WebSocket upgrade. The gateway has already authenticated the client;
/// the query carries its user id the way the original transport handshake
/// did.
#[get("/ws")]
pub async fn ws_handler(
    req: HttpRequest,
    stream: web::Payload,
    state: web::Data<AppState>,
    query: web::Query<WsParams>,
) -> Result<HttpResponse, Error> {
    let user_id = query.into_inner().user_id;

    match state.users.user_exists(user_id).await {
        Ok(true) => {}
        Ok(false) => {
            tracing::warn!(user_id = %user_id, "WebSocket rejected: unknown user");
            return Ok(HttpResponse::Forbidden().finish());
        }
        Err(e) => {
            tracing::error!(error = %e, "WebSocket rejected: user lookup failed");
            return Ok(HttpResponse::InternalServerError().finish());
        }
    }

    // Register before the actor starts; the first presenceChanged frame is
    // already waiting in the receiver when the forwarder task spins up.
    let (connection_id, mut rx) = state.registry.connect(user_id).await;

    let session = WsSession::new(user_id, connection_id, state.as_ref().clone());
    let (addr, resp) = ws::WsResponseBuilder::new(session, &req, stream).start_with_addr()?;

    // Bridge registry frames into the actor. Ends when the registry drops
    // this connection's sender (disconnect or newer-device overwrite).
    tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            addr.do_send(PushFrame(frame));
        }
    });

    Ok(resp)
}

use actix::{Actor, ActorContext, AsyncContext, Handler, Message as ActixMessage, StreamHandler};
use actix_web_actors::ws;
use std::time::{Duration, Instant};
use uuid::Uuid;

use chat_events::ClientEvent;

use crate::state::AppState;
use crate::websocket::ConnectionId;

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(5);
const CLIENT_TIMEOUT: Duration = Duration::from_secs(30);

/// Frame pushed from the presence registry to this connection.
#[derive(ActixMessage)]
#[rtype(result = "()")]
pub struct PushFrame(pub String);

/// One WebSocket session: registered with the presence registry for its
/// lifetime, forwarding inbound call-signaling frames to the coordinator.
pub struct WsSession {
    user_id: Uuid,
    connection_id: ConnectionId,
    state: AppState,
    hb: Instant,
}

impl WsSession {
    pub fn new(user_id: Uuid, connection_id: ConnectionId, state: AppState) -> Self {
        Self {
            user_id,
            connection_id,
            state,
            hb: Instant::now(),
        }
    }

    fn hb(&self, ctx: &mut ws::WebsocketContext<Self>) {
        ctx.run_interval(HEARTBEAT_INTERVAL, |act, ctx| {
            if Instant::now().duration_since(act.hb) > CLIENT_TIMEOUT {
                tracing::warn!(user_id = %act.user_id, "WebSocket heartbeat failed, disconnecting");
                ctx.stop();
                return;
            }
            ctx.ping(b"");
        });
    }
}

impl Actor for WsSession {
    type Context = ws::WebsocketContext<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        tracing::info!(user_id = %self.user_id, "WebSocket session started");
        self.hb(ctx);
    }

    fn stopped(&mut self, _ctx: &mut Self::Context) {
        tracing::info!(user_id = %self.user_id, "WebSocket session stopped");

        // Deregister; the registry ignores this when a newer device has
        // already overwritten the mapping.
        let registry = self.state.registry.clone();
        let user_id = self.user_id;
        let connection_id = self.connection_id;
        actix::spawn(async move {
            registry.disconnect(user_id, connection_id).await;
        });
    }
}

impl Handler<PushFrame> for WsSession {
    type Result = ();

    fn handle(&mut self, msg: PushFrame, ctx: &mut Self::Context) {
        ctx.text(msg.0);
    }
}

impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for WsSession {
    fn handle(&mut self, msg: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        match msg {
            Ok(ws::Message::Ping(msg)) => {
                self.hb = Instant::now();
                ctx.pong(&msg);
            }
            Ok(ws::Message::Pong(_)) => {
                self.hb = Instant::now();
            }
            Ok(ws::Message::Text(text)) => match serde_json::from_str::<ClientEvent>(&text) {
                Ok(event) => {
                    let calls = self.state.calls.clone();
                    let user_id = self.user_id;
                    actix::spawn(async move {
                        calls.handle_event(user_id, event).await;
                    });
                }
                Err(e) => {
                    tracing::warn!(user_id = %self.user_id, "Failed to parse WS message: {:?}", e);
                }
            },
            Ok(ws::Message::Binary(_)) => {
                tracing::warn!("Binary WebSocket messages not supported");
            }
            Ok(ws::Message::Close(reason)) => {
                tracing::info!(user_id = %self.user_id, "WebSocket close received: {:?}", reason);
                ctx.stop();
            }
            _ => {}
        }
    }
}

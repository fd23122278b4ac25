use actix::prelude::*;
use actix_web::{web, HttpMessage, HttpRequest, HttpResponse};
use actix_web_actors::ws;
use log::{debug, warn};
use serde::Deserialize;
use std::time::{Duration, Instant};

use crate::app_state::AppState;
use crate::auth::Session;
use crate::error::AppError;
use crate::notifier::{ChangeHub, ChangeNotice, Connect, Disconnect};
//ws.rs

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(5);
const CLIENT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Deserialize)]
pub struct WsQuery {
    token: Option<String>,
}

/// One browser connection listening for data store changes on a scope.
pub struct ChangeListener {
    pub scope: String,
    pub hb: Instant,
    pub hub: Addr<ChangeHub>,
}

impl ChangeListener {
    pub fn new(scope: String, hub: Addr<ChangeHub>) -> Self {
        ChangeListener {
            scope,
            hb: Instant::now(),
            hub,
        }
    }

    fn hb(&self, ctx: &mut ws::WebsocketContext<Self>) {
        ctx.run_interval(HEARTBEAT_INTERVAL, |act, ctx| {
            if Instant::now().duration_since(act.hb) > CLIENT_TIMEOUT {
                warn!("WebSocket client heartbeat failed on {}, disconnecting.", act.scope);
                ctx.stop();
                return;
            }
            ctx.ping(b"");
        });
    }
}

impl Actor for ChangeListener {
    type Context = ws::WebsocketContext<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        self.hb(ctx);

        self.hub
            .send(Connect {
                scope: self.scope.clone(),
                addr: ctx.address().recipient(),
            })
            .into_actor(self)
            .then(|res, _act, ctx| {
                if res.is_err() {
                    warn!("Failed to register with change hub.");
                    ctx.stop();
                }
                fut::ready(())
            })
            .wait(ctx);
    }

    fn stopped(&mut self, ctx: &mut Self::Context) {
        self.hub.do_send(Disconnect {
            scope: self.scope.clone(),
            addr: ctx.address().recipient(),
        });
    }
}

impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for ChangeListener {
    fn handle(&mut self, msg: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        match msg {
            Ok(ws::Message::Ping(msg)) => {
                self.hb = Instant::now();
                ctx.pong(&msg);
            }
            Ok(ws::Message::Pong(_)) => {
                self.hb = Instant::now();
            }
            // Listen-only socket.
            Ok(ws::Message::Text(_)) | Ok(ws::Message::Binary(_)) => {}
            Ok(ws::Message::Close(reason)) => {
                ctx.close(reason);
                ctx.stop();
            }
            Err(e) => {
                warn!("WebSocket error: {}", e);
                ctx.stop();
            }
            _ => {}
        }
    }
}

impl Handler<ChangeNotice> for ChangeListener {
    type Result = ();

    fn handle(&mut self, msg: ChangeNotice, ctx: &mut Self::Context) {
        match serde_json::to_string(&msg) {
            Ok(text) => {
                debug!("Notifying {} of {} change", self.scope, msg.entity_kind);
                ctx.text(text);
            }
            Err(e) => warn!("Failed to encode change notice: {}", e),
        }
    }
}

/// GET /ws
/// Browsers cannot set headers on a WebSocket handshake, so `?token=` is
/// accepted as well as the bearer header.
pub async fn ws_index(
    req: HttpRequest,
    stream: web::Payload,
    data: web::Data<AppState>,
    query: web::Query<WsQuery>,
) -> Result<HttpResponse, actix_web::Error> {
    let attached = req.extensions().get::<Session>().cloned();
    let session = match attached {
        Some(session) => session,
        None => match query.token.as_deref() {
            Some(token) => data.auth.get_session(token).await.ok_or(AppError::Unauthorized)?,
            None => return Err(AppError::Unauthorized.into()),
        },
    };
    let scope = data.scope_for(&session);
    ws::start(ChangeListener::new(scope.to_string(), data.change_hub.clone()), &req, stream)
}

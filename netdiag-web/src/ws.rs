//! WebSocket endpoint: one connection, one event stream, at most one
//! running diagnostic session.
//!
//! A new request supersedes a still-running one, and disconnecting aborts
//! the session task; spawned diagnostic processes are reaped through
//! `kill_on_drop`, so process lifetime never outlives the client.

use std::sync::Arc;

use actix_web::{web, HttpRequest, HttpResponse};
use actix_ws::{Message, MessageStream, Session};
use async_trait::async_trait;
use futures::StreamExt;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use uuid::Uuid;

use netdiag_toolbox::{
    DiagError, DiagResult, DiagnosticEvent, DiagnosticService, EventSink, RecordType,
};

use crate::messages::ClientMessage;
use crate::registry::ConnectionRegistry;

const DEFAULT_PING_COUNT: u32 = 4;
const DEFAULT_MAX_HOPS: u32 = 30;

/// [`EventSink`] over a WebSocket session, serializing each event as one
/// JSON text frame.
pub struct WsEventSink {
    session: Mutex<Session>,
}

impl WsEventSink {
    pub fn new(session: Session) -> Self {
        Self {
            session: Mutex::new(session),
        }
    }
}

#[async_trait]
impl EventSink for WsEventSink {
    async fn send(&self, event: DiagnosticEvent) -> DiagResult<()> {
        let json = serde_json::to_string(&event).map_err(|e| DiagError::Io(e.to_string()))?;
        self.session
            .lock()
            .await
            .text(json)
            .await
            .map_err(|_| DiagError::ChannelClosed)
    }
}

/// GET handler upgrading to the diagnostics WebSocket.
pub async fn diagnostics_ws(
    req: HttpRequest,
    body: web::Payload,
    registry: web::Data<ConnectionRegistry>,
) -> actix_web::Result<HttpResponse> {
    let (response, session, stream) = actix_ws::handle(&req, body)?;
    // the message stream is not Send; run the connection on this worker
    actix_web::rt::spawn(handle_connection(registry, session, stream));
    Ok(response)
}

async fn handle_connection(
    registry: web::Data<ConnectionRegistry>,
    mut session: Session,
    mut stream: MessageStream,
) {
    let id = Uuid::new_v4();
    let sink = Arc::new(WsEventSink::new(session.clone()));
    registry.add(id, sink.clone()).await;
    tracing::info!("client {id} connected ({} total)", registry.len().await);

    let _ = sink
        .send(DiagnosticEvent::Connected {
            message: "Welcome to the netdiag server".to_string(),
        })
        .await;

    let mut active: Option<JoinHandle<()>> = None;

    while let Some(Ok(msg)) = stream.next().await {
        match msg {
            Message::Text(text) => {
                dispatch(&sink, &text, &mut active, id).await;
            }
            Message::Ping(bytes) => {
                if session.pong(&bytes).await.is_err() {
                    break;
                }
            }
            Message::Close(reason) => {
                tracing::debug!("client {id} sent close: {reason:?}");
                break;
            }
            _ => {}
        }
    }

    // abort any running session; kill_on_drop reaps its subprocess
    if let Some(task) = active.take() {
        task.abort();
    }
    registry.remove(id).await;
    tracing::info!("client {id} disconnected ({} total)", registry.len().await);
}

async fn dispatch(
    sink: &Arc<WsEventSink>,
    text: &str,
    active: &mut Option<JoinHandle<()>>,
    id: Uuid,
) {
    let msg: ClientMessage = match serde_json::from_str(text) {
        Ok(msg) => msg,
        Err(e) => {
            tracing::warn!("client {id} sent an unrecognized message: {e}");
            let _ = sink
                .send(DiagnosticEvent::Error {
                    message: "Invalid message format".to_string(),
                })
                .await;
            return;
        }
    };

    if let Some(prev) = active.take() {
        if !prev.is_finished() {
            tracing::debug!("client {id} superseded a running session");
            prev.abort();
        }
    }

    let sink = Arc::clone(sink);
    *active = Some(tokio::spawn(run_session(sink, msg)));
}

async fn run_session(sink: Arc<WsEventSink>, msg: ClientMessage) {
    match msg {
        ClientMessage::Ping { host, count } => {
            DiagnosticService::ping(sink.as_ref(), &host, count.unwrap_or(DEFAULT_PING_COUNT))
                .await;
        }
        ClientMessage::Traceroute { host, max_hops } => {
            DiagnosticService::traceroute(
                sink.as_ref(),
                &host,
                max_hops.unwrap_or(DEFAULT_MAX_HOPS),
            )
            .await;
        }
        ClientMessage::Dns {
            domain,
            record_type,
        } => {
            let record_type = record_type
                .as_deref()
                .map_or(RecordType::A, RecordType::coerce);
            DiagnosticService::dns_lookup(sink.as_ref(), &domain, record_type).await;
        }
        ClientMessage::NetworkInfo {} => {
            DiagnosticService::network_info(sink.as_ref()).await;
        }
    }
}

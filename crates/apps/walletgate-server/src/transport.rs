//! HTTP and WebSocket transport.
//!
//! Each WebSocket connection on `/ws` gets its own [`SessionActor`] whose
//! inbound channel is fed text frames and whose outbox is written back as
//! text frames. Discovery and gate statistics are plain JSON over HTTP.
//!
//! [`SessionActor`]: walletgate_session::SessionActor

use std::fmt::Display;
use std::future::Future;

use axum::extract::ws::{Message, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::Response;
use axum::routing::get;
use axum::{Json, Router};
use futures::{Sink, SinkExt, Stream, StreamExt};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};
use walletgate_session::SessionHandle;
use walletgate_tools::ToolListing;
use walletgate_x402::X402Status;

use crate::context::GatewayContext;
use crate::error::{ServerError, ServerResult};

/// Query parameters accepted on `/ws`.
#[derive(Debug, Default, Deserialize)]
pub struct SessionParams {
    /// Identity recorded as payer on confirmed calls.
    pub signer: Option<String>,
}

/// Build the gateway router.
pub fn router(ctx: GatewayContext) -> Router {
    Router::new()
        .route("/ws", get(ws_upgrade))
        .route("/tools", get(list_tools))
        .route("/health", get(health))
        .route("/status", get(status))
        .with_state(ctx)
}

/// Bind `listen` and serve until Ctrl-C.
pub async fn serve(ctx: GatewayContext, listen: &str) -> ServerResult<()> {
    let listener = TcpListener::bind(listen)
        .await
        .map_err(|source| ServerError::Bind {
            addr: listen.to_string(),
            source,
        })?;
    serve_on(listener, ctx, shutdown_signal()).await
}

/// Serve on an already bound listener until `shutdown` completes.
pub async fn serve_on<F>(listener: TcpListener, ctx: GatewayContext, shutdown: F) -> ServerResult<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = listener.local_addr()?;
    info!(%addr, "Gateway listening");
    axum::serve(listener, router(ctx))
        .with_graceful_shutdown(shutdown)
        .await?;
    info!("Gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
    info!("Shutdown requested");
}

async fn ws_upgrade(
    ws: WebSocketUpgrade,
    Query(params): Query<SessionParams>,
    State(ctx): State<GatewayContext>,
) -> Response {
    ws.on_upgrade(move |socket| async move {
        let (sink, stream) = socket.split();
        bridge_session(&ctx, params.signer, sink, stream).await;
    })
}

/// Run one session over a split socket until the client goes away.
///
/// Text frames go to the actor as-is. Binary frames are decoded lossily so a
/// bad payload still gets a parse error back. Replies are written in the
/// order the actor emits them.
pub async fn bridge_session<S, R, E>(
    ctx: &GatewayContext,
    signer: Option<String>,
    mut sink: S,
    mut stream: R,
) where
    S: Sink<Message> + Unpin + Send + 'static,
    R: Stream<Item = Result<Message, E>> + Unpin,
    E: Display,
{
    info!(signer = ?signer, "Session opened");
    let SessionHandle {
        inbound,
        mut outbox,
        task,
    } = ctx.open_session(signer);

    let writer = tokio::spawn(async move {
        while let Some(reply) = outbox.recv().await {
            let text = match reply.to_json() {
                Ok(text) => text,
                Err(e) => {
                    error!(error = %e, kind = reply.kind(), "Failed to encode reply");
                    continue;
                }
            };
            if sink.send(Message::Text(text)).await.is_err() {
                debug!("Client gone, dropping remaining replies");
                break;
            }
        }
        let _ = sink.close().await;
    });

    while let Some(frame) = stream.next().await {
        let text = match frame {
            Ok(Message::Text(text)) => text,
            Ok(Message::Binary(bytes)) => String::from_utf8_lossy(&bytes).into_owned(),
            Ok(Message::Close(_)) => break,
            Ok(_) => continue,
            Err(e) => {
                warn!(error = %e, "Socket read failed");
                break;
            }
        };
        if inbound.send(text).await.is_err() {
            error!("Session actor stopped unexpectedly");
            break;
        }
    }

    drop(inbound);
    if let Err(e) = task.await {
        error!(error = %e, "Session actor panicked");
    }
    if let Err(e) = writer.await {
        error!(error = %e, "Socket writer panicked");
    }
    info!("Session closed");
}

async fn list_tools(State(ctx): State<GatewayContext>) -> Json<Vec<ToolListing>> {
    Json(ctx.registry.list_tools().collect())
}

async fn health(State(ctx): State<GatewayContext>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "tools": ctx.registry.len(),
        "x402": ctx.gate.is_enabled(),
    }))
}

async fn status(State(ctx): State<GatewayContext>) -> Json<X402Status> {
    Json(ctx.gate.status().await)
}

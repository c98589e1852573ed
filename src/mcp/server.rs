//! MCP server lifecycle.
//!
//! This module ties a line transport to the [`Dispatcher`]:
//!
//! 1. **Initialisation**: Capability negotiation and version agreement
//! 2. **Operation**: Every request runs on its own task; responses and
//!    server-push notifications are written by this loop alone
//! 3. **Shutdown**: EOF lets in-flight requests finish; a signal cancels them
//!
//! Clients may abandon an in-flight request with `notifications/cancelled`.

use std::collections::HashMap;
use std::future::Future;
use std::io;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::mcp::context::CallContext;
use crate::mcp::dispatcher::Dispatcher;
use crate::mcp::protocol::{
    methods, parse_message, IncomingMessage, JsonRpcNotification, JsonRpcRequest,
    JsonRpcResponse, RequestId,
};
use crate::mcp::transport::LineTransport;
use crate::mcp::types::CancelledParams;

/// Server state in the MCP lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    /// Waiting for initialize request.
    AwaitingInit,
    /// Initialize received, waiting for initialized notification.
    Initialising,
    /// Ready for normal operation.
    Running,
    /// Shutdown in progress.
    ShuttingDown,
}

type InFlight = Arc<Mutex<HashMap<RequestId, CancellationToken>>>;

/// The MCP server for one client session.
pub struct McpServer {
    /// Current server state.
    state: ServerState,
    /// Shared request router.
    dispatcher: Arc<Dispatcher>,
    /// Session template cloned into every call.
    session: CallContext,
    /// Cancellation tokens of requests still running.
    in_flight: InFlight,
}

impl McpServer {
    /// Creates a server for one session.
    #[must_use]
    pub fn new(dispatcher: Arc<Dispatcher>, session: CallContext) -> Self {
        Self {
            state: ServerState::AwaitingInit,
            dispatcher,
            session,
            in_flight: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Returns the current server state.
    #[must_use]
    pub const fn state(&self) -> ServerState {
        self.state
    }

    /// Runs the server over stdio until EOF or SIGINT/SIGTERM.
    ///
    /// # Errors
    ///
    /// Returns an error if transport I/O fails.
    pub async fn run(&mut self) -> io::Result<()> {
        self.serve_with_shutdown(tokio::io::stdin(), tokio::io::stdout(), shutdown_signal())
            .await
    }

    /// Runs the server over arbitrary streams until EOF.
    ///
    /// # Errors
    ///
    /// Returns an error if transport I/O fails.
    pub async fn serve<R, W>(&mut self, reader: R, writer: W) -> io::Result<()>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        self.serve_with_shutdown(reader, writer, std::future::pending())
            .await
    }

    /// Runs the main loop until EOF or until `shutdown` resolves.
    ///
    /// # Errors
    ///
    /// Returns an error if transport I/O fails.
    pub async fn serve_with_shutdown<R, W, S>(
        &mut self,
        reader: R,
        writer: W,
        shutdown: S,
    ) -> io::Result<()>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
        S: Future<Output = ()>,
    {
        let mut transport = LineTransport::new(reader, writer);
        let (responses_tx, mut responses) = mpsc::unbounded_channel::<JsonRpcResponse>();
        let (outlet, mut notifications) = mpsc::unbounded_channel();
        self.dispatcher.attach_outlet(outlet);

        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                () = &mut shutdown => {
                    info!("Shutdown requested, cancelling in-flight requests");
                    self.session.cancellation().cancel();
                    break;
                }

                Some(response) = responses.recv() => {
                    transport.write_response(&response).await?;
                }

                Some(notification) = notifications.recv() => {
                    transport.write_notification(&notification).await?;
                }

                line = transport.read_line() => {
                    let Some(line) = line? else {
                        debug!("Input closed");
                        break;
                    };
                    self.handle_line(&line, &responses_tx, &mut transport).await?;
                }
            }
        }

        self.state = ServerState::ShuttingDown;

        // Flush responses of requests still running
        drop(responses_tx);
        while let Some(response) = responses.recv().await {
            transport.write_response(&response).await?;
        }

        self.dispatcher.shutdown();
        info!("Server stopped");
        Ok(())
    }

    /// Handles a single line of input.
    async fn handle_line<R, W>(
        &mut self,
        line: &str,
        responses: &mpsc::UnboundedSender<JsonRpcResponse>,
        transport: &mut LineTransport<R, W>,
    ) -> io::Result<()>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        if line.trim().is_empty() {
            return Ok(());
        }

        match parse_message(line) {
            Ok(IncomingMessage::Request(req)) => {
                self.spawn_request(req, responses.clone());
                Ok(())
            }
            Ok(IncomingMessage::Notification(notif)) => {
                self.handle_notification(&notif);
                Ok(())
            }
            Err(error) => {
                debug!("Rejected unparseable message");
                transport.write_response(&error).await
            }
        }
    }

    /// Dispatches a request on its own task.
    fn spawn_request(
        &mut self,
        req: JsonRpcRequest,
        responses: mpsc::UnboundedSender<JsonRpcResponse>,
    ) {
        if req.method.as_deref() == Some(methods::INITIALIZE)
            && self.state == ServerState::AwaitingInit
        {
            self.state = ServerState::Initialising;
        }

        let token = self.session.cancellation().child_token();
        let ctx = self.session.clone().with_cancellation(token.clone());
        let id = req.id.clone();
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id.clone(), token);

        let dispatcher = Arc::clone(&self.dispatcher);
        let in_flight = Arc::clone(&self.in_flight);

        tokio::spawn(async move {
            let response = dispatcher.handle(&ctx, req).await;
            in_flight
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .remove(&id);
            if responses.send(response).is_err() {
                warn!(id = %id, "Response dropped, server already stopped");
            }
        });
    }

    /// Handles an incoming notification.
    fn handle_notification(&mut self, notif: &JsonRpcNotification) {
        match notif.method.as_str() {
            methods::NOTIFY_INITIALIZED => {
                if self.state == ServerState::Initialising {
                    self.state = ServerState::Running;
                    info!("Client initialised");
                }
            }
            methods::NOTIFY_CANCELLED => {
                let Some(params) = notif
                    .params
                    .clone()
                    .and_then(|p| serde_json::from_value::<CancelledParams>(p).ok())
                else {
                    debug!("Ignoring malformed cancellation");
                    return;
                };
                let token = self
                    .in_flight
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .get(&params.request_id)
                    .cloned();
                if let Some(token) = token {
                    debug!(id = %params.request_id, reason = ?params.reason, "Cancelling request");
                    token.cancel();
                }
            }
            other => debug!(method = other, "Ignoring notification"),
        }
    }
}

/// Resolves when the process receives SIGINT or SIGTERM.
#[cfg(unix)]
async fn shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let (Ok(mut sigint), Ok(mut sigterm)) = (
        signal(SignalKind::interrupt()),
        signal(SignalKind::terminate()),
    ) else {
        warn!("Failed to install signal handlers");
        return std::future::pending().await;
    };

    tokio::select! {
        _ = sigint.recv() => info!("Received SIGINT, initiating graceful shutdown"),
        _ = sigterm.recv() => info!("Received SIGTERM, initiating graceful shutdown"),
    }
}

/// Resolves when the process receives Ctrl+C.
#[cfg(windows)]
async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Received Ctrl+C, initiating graceful shutdown");
    } else {
        warn!("Failed to install Ctrl+C handler");
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_server_awaits_init() {
        let server = McpServer::new(Arc::new(Dispatcher::default()), CallContext::new());
        assert_eq!(server.state(), ServerState::AwaitingInit);
    }

    #[tokio::test]
    async fn lifecycle_reaches_running_then_shutting_down() {
        let mut server = McpServer::new(Arc::new(Dispatcher::default()), CallContext::new());
        let input = concat!(
            r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{}}"#,
            "\n",
            r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#,
            "\n",
        );
        let mut output = Vec::new();

        server.serve(input.as_bytes(), &mut output).await.unwrap();

        assert_eq!(server.state(), ServerState::ShuttingDown);
        let text = String::from_utf8(output).unwrap();
        assert_eq!(text.lines().count(), 1);
        assert!(text.contains("\"protocolVersion\":\"2024-11-05\""));
    }

    #[tokio::test]
    async fn unparseable_line_gets_parse_error() {
        let mut server = McpServer::new(Arc::new(Dispatcher::default()), CallContext::new());
        let mut output = Vec::new();

        server.serve(&b"{oops\n"[..], &mut output).await.unwrap();

        let response: serde_json::Value = serde_json::from_slice(&output).unwrap();
        assert_eq!(response["error"]["code"], -32700);
        assert_eq!(response["id"], serde_json::Value::Null);
    }
}

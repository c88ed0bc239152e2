//! Stdio client for the Terraform Registry MCP server.
//!
//! Messages are newline-delimited JSON-RPC. Requests are strictly
//! sequential: one request is written and the reader loops until the
//! matching response arrives, answering server pings on the way.

use crate::config::McpConfig;
use crate::error::{Error, Result};
use crate::llm::{ToolHost, ToolOutcome, ToolSpec};
use crate::mcp::message::{
    CallToolResult, Implementation, IncomingMessage, InitializeParams, InitializeResult,
    JsonRpcError, JsonRpcNotification, JsonRpcReply, JsonRpcRequest, ListToolsResult,
    MessageKind, PROTOCOL_VERSION,
};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::{json, Value};
use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

type BoxedReader = Box<dyn AsyncRead + Send + Unpin>;
type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

struct Transport {
    reader: BufReader<BoxedReader>,
    /// `None` once the client has shut down.
    writer: Option<BoxedWriter>,
}

impl Transport {
    async fn send<T: Serialize>(&mut self, message: &T) -> Result<()> {
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| Error::Mcp("connection already closed".to_string()))?;

        let mut line = serde_json::to_string(message)?;
        line.push('\n');
        writer.write_all(line.as_bytes()).await?;
        writer.flush().await?;
        Ok(())
    }

    /// Read until the response for `id` arrives.
    async fn await_response(&mut self, id: u64, method: &str) -> Result<Value> {
        loop {
            let mut line = String::new();
            if self.reader.read_line(&mut line).await? == 0 {
                return Err(Error::Mcp("server closed the connection".to_string()));
            }

            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let message: IncomingMessage = match serde_json::from_str(line) {
                Ok(m) => m,
                Err(_) => {
                    debug!("Ignoring non-JSON server output: {}", line);
                    continue;
                }
            };

            match message.kind() {
                MessageKind::Response(rid) if rid == id => {
                    if let Some(err) = message.error {
                        return Err(Error::Mcp(format!(
                            "{} failed: {} (code {})",
                            method, err.message, err.code
                        )));
                    }
                    return Ok(message.result.unwrap_or(Value::Null));
                }
                MessageKind::Response(rid) => {
                    debug!("Ignoring response to request #{}", rid);
                }
                MessageKind::ServerRequest => {
                    let server_method = message.method.unwrap_or_default();
                    let reply_id = message.id.unwrap_or(Value::Null);
                    let reply = if server_method == "ping" {
                        JsonRpcReply::success(reply_id, json!({}))
                    } else {
                        JsonRpcReply::error(reply_id, JsonRpcError::method_not_found(&server_method))
                    };
                    self.send(&reply).await?;
                }
                MessageKind::Notification => {
                    debug!("Server notification: {}", message.method.unwrap_or_default());
                }
                MessageKind::Unknown => {
                    debug!("Ignoring unrecognized message: {}", line);
                }
            }
        }
    }
}

/// A connected MCP session with its tool list loaded.
pub struct McpClient {
    transport: Mutex<Transport>,
    child: Mutex<Option<Child>>,
    next_id: AtomicU64,
    request_timeout: Duration,
    server_info: Option<Implementation>,
    tools: Vec<ToolSpec>,
}

impl McpClient {
    /// Launch the configured server process and complete the handshake.
    pub async fn spawn(config: &McpConfig) -> Result<Self> {
        info!("Starting MCP server: {} {}", config.command, config.args.join(" "));

        let mut child = Command::new(&config.command)
            .args(&config.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                Error::McpUnavailable(format!("failed to start '{}': {}", config.command, e))
            })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| Error::McpUnavailable("server stdin not captured".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| Error::McpUnavailable("server stdout not captured".to_string()))?;

        let timeout = Duration::from_secs(config.request_timeout_seconds);
        let client = Self::connect(stdout, stdin, timeout)
            .await
            .map_err(|e| match e {
                Error::McpUnavailable(_) => e,
                other => Error::McpUnavailable(other.to_string()),
            })?;

        *client.child.lock().await = Some(child);
        Ok(client)
    }

    /// Run the handshake over an already-open byte stream.
    pub async fn connect<R, W>(reader: R, writer: W, request_timeout: Duration) -> Result<Self>
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        let mut client = Self {
            transport: Mutex::new(Transport {
                reader: BufReader::new(Box::new(reader) as BoxedReader),
                writer: Some(Box::new(writer) as BoxedWriter),
            }),
            child: Mutex::new(None),
            next_id: AtomicU64::new(1),
            request_timeout,
            server_info: None,
            tools: Vec::new(),
        };

        client.server_info = client.initialize().await?;
        client.tools = client.list_tools().await?;
        Ok(client)
    }

    async fn initialize(&self) -> Result<Option<Implementation>> {
        let params = InitializeParams {
            protocol_version: PROTOCOL_VERSION.to_string(),
            capabilities: json!({}),
            client_info: Implementation {
                name: env!("CARGO_PKG_NAME").to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
        };

        let result = self
            .request("initialize", Some(serde_json::to_value(params)?))
            .await?;
        let init: InitializeResult = serde_json::from_value(result)?;

        if init.protocol_version != PROTOCOL_VERSION {
            debug!(
                "Server negotiated protocol {} (requested {})",
                init.protocol_version, PROTOCOL_VERSION
            );
        }

        self.notify("notifications/initialized", None).await?;
        Ok(init.server_info)
    }

    /// Fetch every page of `tools/list`.
    async fn list_tools(&self) -> Result<Vec<ToolSpec>> {
        let mut tools = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let params = cursor.as_ref().map(|c| json!({ "cursor": c }));
            let result = self.request("tools/list", params).await?;
            let page: ListToolsResult = serde_json::from_value(result)?;

            tools.extend(page.tools.into_iter().map(|t| ToolSpec {
                name: t.name,
                description: t.description.unwrap_or_default(),
                input_schema: t.input_schema,
            }));

            match page.next_cursor {
                Some(next) if !next.is_empty() => cursor = Some(next),
                _ => break,
            }
        }

        debug!("MCP server exposes {} tool(s)", tools.len());
        Ok(tools)
    }

    /// Invoke a tool on the server.
    pub async fn call_tool(&self, name: &str, arguments: Value) -> Result<CallToolResult> {
        let params = json!({ "name": name, "arguments": arguments });
        let result = self.request("tools/call", Some(params)).await?;
        Ok(serde_json::from_value(result)?)
    }

    pub fn server_info(&self) -> Option<&Implementation> {
        self.server_info.as_ref()
    }

    async fn notify(&self, method: &str, params: Option<Value>) -> Result<()> {
        let mut transport = self.transport.lock().await;
        transport
            .send(&JsonRpcNotification::new(method, params))
            .await
    }

    async fn request(&self, method: &str, params: Option<Value>) -> Result<Value> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let mut transport = self.transport.lock().await;

        debug!("MCP request #{}: {}", id, method);
        transport
            .send(&JsonRpcRequest::new(id, method, params))
            .await?;

        let exchange = transport.await_response(id, method);

        match tokio::time::timeout(self.request_timeout, exchange).await {
            Ok(result) => result,
            Err(_) => Err(Error::Mcp(format!(
                "{} timed out after {}s",
                method,
                self.request_timeout.as_secs()
            ))),
        }
    }

    /// Close stdin and wait for the server to exit, killing it if needed.
    pub async fn shutdown(&self) {
        self.transport.lock().await.writer = None;

        let Some(mut child) = self.child.lock().await.take() else {
            return;
        };

        match tokio::time::timeout(SHUTDOWN_GRACE, child.wait()).await {
            Ok(Ok(status)) => debug!("MCP server exited: {}", status),
            Ok(Err(e)) => warn!("Failed to wait for MCP server: {}", e),
            Err(_) => {
                debug!("MCP server did not exit, killing it");
                if let Err(e) = child.kill().await {
                    warn!("Failed to kill MCP server: {}", e);
                }
            }
        }
    }
}

#[async_trait]
impl ToolHost for McpClient {
    fn tools(&self) -> &[ToolSpec] {
        &self.tools
    }

    async fn call_tool(&self, name: &str, arguments: Value) -> ToolOutcome {
        match McpClient::call_tool(self, name, arguments).await {
            Ok(result) if result.is_error => ToolOutcome::error(result.text()),
            Ok(result) => ToolOutcome::success(result.text()),
            Err(e) => {
                warn!("MCP tool '{}' failed: {}", name, e);
                ToolOutcome::error(e.to_string())
            }
        }
    }
}

//! Anthropic Messages API client with tool use.

use crate::config::AnthropicConfig;
use crate::error::{Error, Result};
use crate::llm::{send_error, ChatModel, ChatRequest, ToolHost};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info, warn};

const PROVIDER: &str = "anthropic";
const API_VERSION: &str = "2023-06-01";

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: &'a [Message],
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<ToolDefinition<'a>>,
}

#[derive(Debug, Serialize)]
struct ToolDefinition<'a> {
    name: &'a str,
    description: &'a str,
    input_schema: &'a Value,
}

#[derive(Debug, Clone, Serialize)]
struct Message {
    role: &'static str,
    content: Vec<ContentBlock>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        #[serde(default)]
        input: Value,
    },
    ToolResult {
        tool_use_id: String,
        content: String,
        is_error: bool,
    },
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
    #[serde(default)]
    stop_reason: Option<String>,
}

impl MessagesResponse {
    fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(|block| match block {
                ContentBlock::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

pub struct AnthropicModel {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: String,
    max_tokens: u32,
    timeout_seconds: u64,
    max_tool_rounds: usize,
}

impl AnthropicModel {
    pub fn new(config: &AnthropicConfig, max_tool_rounds: usize) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| Error::Provider {
                provider: PROVIDER.to_string(),
                message: "API key not configured (set ANTHROPIC_API_KEY)".to_string(),
            })?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| Error::Provider {
                provider: PROVIDER.to_string(),
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key,
            max_tokens: config.max_tokens,
            timeout_seconds: config.timeout_seconds,
            max_tool_rounds,
        })
    }

    async fn send(
        &self,
        system: &str,
        messages: &[Message],
        tools: Vec<ToolDefinition<'_>>,
    ) -> Result<MessagesResponse> {
        let url = format!("{}/messages", self.base_url);
        debug!("Sending messages request with {} messages", messages.len());

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&MessagesRequest {
                model: &self.model,
                max_tokens: self.max_tokens,
                system,
                messages,
                tools,
            })
            .send()
            .await
            .map_err(|e| send_error(PROVIDER, &self.base_url, self.timeout_seconds, e))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Provider {
                provider: PROVIDER.to_string(),
                message: format!("HTTP {}: {}", status, body),
            });
        }

        response.json().await.map_err(|e| Error::Provider {
            provider: PROVIDER.to_string(),
            message: format!("Failed to parse response: {}", e),
        })
    }

    async fn run_tools(&self, host: &dyn ToolHost, blocks: &[ContentBlock]) -> Vec<ContentBlock> {
        let mut results = Vec::new();
        for block in blocks {
            if let ContentBlock::ToolUse { id, name, input } = block {
                let outcome = host.call_tool(name, input.clone()).await;
                info!("Tool {} executed", name);
                results.push(ContentBlock::ToolResult {
                    tool_use_id: id.clone(),
                    content: outcome.content,
                    is_error: outcome.is_error,
                });
            }
        }
        results
    }
}

fn tool_definitions(host: &dyn ToolHost) -> Vec<ToolDefinition<'_>> {
    host.tools()
        .iter()
        .map(|tool| ToolDefinition {
            name: &tool.name,
            description: &tool.description,
            input_schema: &tool.input_schema,
        })
        .collect()
}

fn user_text(text: &str) -> Message {
    Message {
        role: "user",
        content: vec![ContentBlock::Text {
            text: text.to_string(),
        }],
    }
}

#[async_trait]
impl ChatModel for AnthropicModel {
    async fn chat(&self, request: ChatRequest<'_>) -> Result<String> {
        let mut messages = vec![user_text(request.prompt)];

        let Some(host) = request.tools else {
            return Ok(self.send(request.system, &messages, Vec::new()).await?.text());
        };

        for round in 0..self.max_tool_rounds {
            debug!("Tool round {}", round + 1);
            let response = self.send(request.system, &messages, tool_definitions(host)).await?;

            if response.stop_reason.as_deref() != Some("tool_use") {
                return Ok(response.text());
            }

            let results = self.run_tools(host, &response.content).await;
            if results.is_empty() {
                return Ok(response.text());
            }
            messages.push(Message {
                role: "assistant",
                content: response
                    .content
                    .into_iter()
                    .filter(|block| !matches!(block, ContentBlock::Unknown))
                    .collect(),
            });
            messages.push(Message {
                role: "user",
                content: results,
            });
        }

        warn!(
            "Model still requesting tools after {} rounds, asking for a final answer",
            self.max_tool_rounds
        );
        // The last message carries tool results; the nudge joins it as an extra block.
        // Tools stay declared because the history contains tool_use blocks.
        if let Some(last) = messages.last_mut() {
            last.content.push(ContentBlock::Text {
                text: "Stop calling tools and give your final answer now.".to_string(),
            });
        }
        Ok(self
            .send(request.system, &messages, tool_definitions(host))
            .await?
            .text())
    }

    fn name(&self) -> &str {
        PROVIDER
    }

    fn model_id(&self) -> &str {
        &self.model
    }
}

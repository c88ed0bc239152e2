//! Ollama chat API client.
//!
//! Uses `/api/chat` with streaming disabled. When a tool host is supplied,
//! tool definitions are sent along with every request and tool calls are
//! executed until the model answers with plain text.

use crate::config::ModelConfig;
use crate::error::{Error, Result};
use crate::llm::{send_error, ChatModel, ChatRequest, ToolHost};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info, warn};

const PROVIDER: &str = "ollama";

/// Message in the chat history.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<ToolCallMessage>>,
}

impl ChatMessage {
    fn new(role: &str, content: impl Into<String>) -> Self {
        Self {
            role: role.to_string(),
            content: content.into(),
            tool_calls: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ToolCallMessage {
    function: ToolCallFunction,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ToolCallFunction {
    name: String,
    #[serde(default)]
    arguments: Value,
}

#[derive(Debug, Serialize)]
struct OllamaChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<Value>,
    stream: bool,
    options: OllamaOptions,
    keep_alive: &'a str,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    temperature: f32,
    num_predict: u32,
}

#[derive(Debug, Deserialize)]
struct OllamaChatResponse {
    message: ChatMessage,
}

/// A model served by a local Ollama instance.
pub struct OllamaModel {
    http_client: reqwest::Client,
    base_url: String,
    model: String,
    temperature: f32,
    num_predict: u32,
    keep_alive: String,
    timeout_seconds: u64,
    max_tool_rounds: usize,
}

impl OllamaModel {
    pub fn new(config: &ModelConfig, max_tool_rounds: usize) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| Error::Provider {
                provider: PROVIDER.to_string(),
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            http_client,
            base_url: config.ollama_url.trim_end_matches('/').to_string(),
            model: config.name.clone(),
            temperature: config.temperature,
            num_predict: config.max_tokens,
            keep_alive: config.keep_alive.clone(),
            timeout_seconds: config.timeout_seconds,
            max_tool_rounds,
        })
    }

    async fn send(&self, messages: &[ChatMessage], tools: Vec<Value>) -> Result<ChatMessage> {
        let url = format!("{}/api/chat", self.base_url);
        let request = OllamaChatRequest {
            model: &self.model,
            messages,
            tools,
            stream: false,
            options: OllamaOptions {
                temperature: self.temperature,
                num_predict: self.num_predict,
            },
            keep_alive: &self.keep_alive,
        };

        debug!("Sending chat request with {} messages", messages.len());

        let response = self
            .http_client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| send_error(PROVIDER, &self.base_url, self.timeout_seconds, e))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Provider {
                provider: PROVIDER.to_string(),
                message: format!("API error {}: {}", status, body),
            });
        }

        let chat_response: OllamaChatResponse =
            response.json().await.map_err(|e| Error::Provider {
                provider: PROVIDER.to_string(),
                message: format!("Failed to parse response: {}", e),
            })?;

        Ok(chat_response.message)
    }
}

fn tool_definitions(host: &dyn ToolHost) -> Vec<Value> {
    host.tools()
        .iter()
        .map(|tool| {
            serde_json::json!({
                "type": "function",
                "function": {
                    "name": tool.name,
                    "description": tool.description,
                    "parameters": tool.input_schema,
                }
            })
        })
        .collect()
}

#[async_trait]
impl ChatModel for OllamaModel {
    async fn chat(&self, request: ChatRequest<'_>) -> Result<String> {
        let mut messages = vec![
            ChatMessage::new("system", request.system),
            ChatMessage::new("user", request.prompt),
        ];

        let Some(host) = request.tools else {
            return Ok(self.send(&messages, Vec::new()).await?.content);
        };

        let tools = tool_definitions(host);
        for round in 0..self.max_tool_rounds {
            debug!("Tool round {}", round + 1);
            let reply = self.send(&messages, tools.clone()).await?;

            let calls = match reply.tool_calls.as_deref() {
                Some(calls) if !calls.is_empty() => calls.to_vec(),
                _ => return Ok(reply.content),
            };
            messages.push(reply);

            for call in calls {
                let name = &call.function.name;
                let outcome = host.call_tool(name, call.function.arguments.clone()).await;
                info!("Tool {} executed", name);
                messages.push(ChatMessage::new(
                    "tool",
                    if outcome.is_error {
                        format!("Error: {}", outcome.content)
                    } else {
                        outcome.content
                    },
                ));
            }
        }

        warn!(
            "Model still requesting tools after {} rounds, asking for a final answer",
            self.max_tool_rounds
        );
        messages.push(ChatMessage::new(
            "user",
            "Stop calling tools and give your final answer now.",
        ));
        Ok(self.send(&messages, Vec::new()).await?.content)
    }

    fn name(&self) -> &str {
        PROVIDER
    }

    fn model_id(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::testing::EchoTools;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn model_for(server: &MockServer) -> OllamaModel {
        let config = ModelConfig {
            ollama_url: server.uri(),
            timeout_seconds: 5,
            ..ModelConfig::default()
        };
        OllamaModel::new(&config, 3).unwrap()
    }

    fn text_reply(content: &str) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(json!({
            "model": "llama3.2",
            "message": {"role": "assistant", "content": content},
            "done": true
        }))
    }

    #[tokio::test]
    async fn test_plain_chat_sends_options() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .and(body_partial_json(json!({
                "model": "llama3.2",
                "stream": false,
                "keep_alive": "10m",
                "options": {"num_predict": 20000}
            })))
            .respond_with(text_reply("[\"s3\"]"))
            .expect(1)
            .mount(&server)
            .await;

        let model = model_for(&server);
        let answer = model
            .chat(ChatRequest {
                system: "system",
                prompt: "prompt",
                tools: None,
            })
            .await
            .unwrap();

        assert_eq!(answer, "[\"s3\"]");
    }

    #[tokio::test]
    async fn test_tool_calls_are_executed() {
        let server = MockServer::start().await;
        // Second request carries the tool result, so it matches first once available.
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .and(body_partial_json(json!({"messages": [{}, {}, {}, {"role": "tool"}]})))
            .respond_with(text_reply("Use aws_s3_bucket_versioning"))
            .with_priority(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "message": {
                    "role": "assistant",
                    "content": "",
                    "tool_calls": [{
                        "function": {"name": "search_providers", "arguments": {"query": "s3"}}
                    }]
                },
                "done": true
            })))
            .with_priority(2)
            .mount(&server)
            .await;

        let tools = EchoTools::new(&["search_providers"]);
        let model = model_for(&server);
        let answer = model
            .chat(ChatRequest {
                system: "system",
                prompt: "prompt",
                tools: Some(&tools),
            })
            .await
            .unwrap();

        assert_eq!(answer, "Use aws_s3_bucket_versioning");
        let calls = tools.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "search_providers");
        assert_eq!(calls[0].1, json!({"query": "s3"}));
    }

    #[tokio::test]
    async fn test_tool_rounds_are_bounded() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .and(body_string_contains("Stop calling tools"))
            .respond_with(text_reply("partial"))
            .with_priority(1)
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "message": {
                    "role": "assistant",
                    "content": "",
                    "tool_calls": [{
                        "function": {"name": "search_providers", "arguments": {"query": "s3"}}
                    }]
                },
                "done": true
            })))
            .with_priority(2)
            .expect(2)
            .mount(&server)
            .await;

        let config = ModelConfig {
            ollama_url: server.uri(),
            timeout_seconds: 5,
            ..ModelConfig::default()
        };
        let model = OllamaModel::new(&config, 2).unwrap();
        let tools = EchoTools::new(&["search_providers"]);
        let answer = model
            .chat(ChatRequest {
                system: "system",
                prompt: "prompt",
                tools: Some(&tools),
            })
            .await
            .unwrap();

        assert_eq!(answer, "partial");
        assert_eq!(tools.calls.lock().unwrap().len(), 2);

        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 3);
        let last: Value = serde_json::from_slice(&requests[2].body).unwrap();
        assert!(last.get("tools").is_none());
        assert!(requests[1].body_json::<Value>().unwrap().get("tools").is_some());
    }

    #[tokio::test]
    async fn test_http_error_is_provider_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(ResponseTemplate::new(404).set_body_string("model not found"))
            .mount(&server)
            .await;

        let model = model_for(&server);
        let err = model
            .chat(ChatRequest {
                system: "s",
                prompt: "p",
                tools: None,
            })
            .await
            .unwrap_err();

        match err {
            Error::Provider { provider, message } => {
                assert_eq!(provider, "ollama");
                assert!(message.contains("model not found"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unreachable_server() {
        let config = ModelConfig {
            ollama_url: "http://127.0.0.1:9".to_string(),
            timeout_seconds: 5,
            ..ModelConfig::default()
        };
        let model = OllamaModel::new(&config, 3).unwrap();
        let err = model
            .chat(ChatRequest {
                system: "s",
                prompt: "p",
                tools: None,
            })
            .await
            .unwrap_err();

        assert!(matches!(err, Error::ModelUnreachable { .. }));
    }
}

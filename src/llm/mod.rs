//! Chat model providers.
//!
//! Every agent talks to a [`ChatModel`]. A model may be handed a
//! [`ToolHost`] for the duration of a call, in which case it runs a
//! tool-use loop until the model produces a final answer.

pub mod anthropic;
pub mod ollama;

use crate::config::{Config, Provider};
use crate::error::{Error, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

pub use anthropic::AnthropicModel;
pub use ollama::OllamaModel;

/// A tool the model may call.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    /// JSON schema of the tool arguments.
    pub input_schema: Value,
}

/// Result of a tool call, fed back to the model verbatim.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolOutcome {
    pub content: String,
    pub is_error: bool,
}

impl ToolOutcome {
    pub fn success(content: String) -> Self {
        Self {
            content,
            is_error: false,
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            content: message,
            is_error: true,
        }
    }
}

/// Something that can execute tool calls on behalf of a model.
#[async_trait]
pub trait ToolHost: Send + Sync {
    fn tools(&self) -> &[ToolSpec];

    /// Execute a tool. Failures are reported in the outcome, not as errors,
    /// so the model gets a chance to recover.
    async fn call_tool(&self, name: &str, arguments: Value) -> ToolOutcome;
}

/// One prompted call.
pub struct ChatRequest<'a> {
    pub system: &'a str,
    pub prompt: &'a str,
    pub tools: Option<&'a dyn ToolHost>,
}

#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Send the prompt and return the final text answer.
    async fn chat(&self, request: ChatRequest<'_>) -> Result<String>;

    /// Provider name, e.g. `ollama`.
    fn name(&self) -> &str;

    /// Model identifier sent to the provider.
    fn model_id(&self) -> &str;
}

/// Build the model for a provider from configuration.
pub fn create_model(config: &Config, provider: Provider) -> Result<Arc<dyn ChatModel>> {
    let max_tool_rounds = config.agents.max_tool_rounds;
    match provider {
        Provider::Ollama => Ok(Arc::new(OllamaModel::new(&config.model, max_tool_rounds)?)),
        Provider::Anthropic => Ok(Arc::new(AnthropicModel::new(
            &config.anthropic,
            max_tool_rounds,
        )?)),
    }
}

/// Map a reqwest send error onto the user-facing error kinds.
pub(crate) fn send_error(provider: &str, endpoint: &str, timeout_secs: u64, e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::Timeout {
            provider: provider.to_string(),
            seconds: timeout_secs,
        }
    } else if e.is_connect() {
        Error::ModelUnreachable {
            provider: provider.to_string(),
            endpoint: endpoint.to_string(),
        }
    } else {
        Error::Provider {
            provider: provider.to_string(),
            message: format!("Failed to send request: {}", e),
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted stand-ins for models and tool hosts.

    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Returns queued responses in order and records every request.
    pub struct ScriptedModel {
        responses: Mutex<VecDeque<Result<String>>>,
        pub seen: Mutex<Vec<SeenRequest>>,
    }

    #[derive(Debug, Clone)]
    pub struct SeenRequest {
        pub system: String,
        pub prompt: String,
        pub tool_count: usize,
    }

    impl ScriptedModel {
        pub fn new(responses: Vec<&str>) -> Self {
            Self {
                responses: Mutex::new(responses.into_iter().map(|r| Ok(r.to_string())).collect()),
                seen: Mutex::new(Vec::new()),
            }
        }

        pub fn failing(error: Error) -> Self {
            Self {
                responses: Mutex::new(VecDeque::from(vec![Err(error)])),
                seen: Mutex::new(Vec::new()),
            }
        }

        pub fn requests(&self) -> Vec<SeenRequest> {
            self.seen.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ChatModel for ScriptedModel {
        async fn chat(&self, request: ChatRequest<'_>) -> Result<String> {
            self.seen.lock().unwrap().push(SeenRequest {
                system: request.system.to_string(),
                prompt: request.prompt.to_string(),
                tool_count: request.tools.map(|t| t.tools().len()).unwrap_or(0),
            });
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(String::new()))
        }

        fn name(&self) -> &str {
            "scripted"
        }

        fn model_id(&self) -> &str {
            "scripted-model"
        }
    }

    /// Echoes its arguments back and records the calls.
    pub struct EchoTools {
        specs: Vec<ToolSpec>,
        pub calls: Mutex<Vec<(String, Value)>>,
    }

    impl EchoTools {
        pub fn new(names: &[&str]) -> Self {
            Self {
                specs: names
                    .iter()
                    .map(|n| ToolSpec {
                        name: n.to_string(),
                        description: format!("{} tool", n),
                        input_schema: serde_json::json!({"type": "object", "properties": {}}),
                    })
                    .collect(),
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ToolHost for EchoTools {
        fn tools(&self) -> &[ToolSpec] {
            &self.specs
        }

        async fn call_tool(&self, name: &str, arguments: Value) -> ToolOutcome {
            self.calls
                .lock()
                .unwrap()
                .push((name.to_string(), arguments.clone()));
            if self.specs.iter().any(|s| s.name == name) {
                ToolOutcome::success(format!("{} result for {}", name, arguments))
            } else {
                ToolOutcome::error(format!("Unknown tool: {}", name))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_model_per_provider() {
        let mut config = Config::default();
        config.anthropic.api_key = Some("test-key".to_string());

        let ollama = create_model(&config, Provider::Ollama).unwrap();
        assert_eq!(ollama.name(), "ollama");
        assert_eq!(ollama.model_id(), "llama3.2");

        let anthropic = create_model(&config, Provider::Anthropic).unwrap();
        assert_eq!(anthropic.name(), "anthropic");
    }

    #[test]
    fn test_anthropic_requires_key() {
        let config = Config::default();
        let result = create_model(&config, Provider::Anthropic);
        assert!(matches!(result, Err(Error::Provider { .. })));
    }
}

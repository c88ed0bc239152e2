use crate::error::{Error, Result};
use crate::llm::{ChatModel, ChatRequest, ToolHost};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// A prompted call to a model, optionally with tools attached.
pub struct Agent {
    name: &'static str,
    system_prompt: String,
    model: Arc<dyn ChatModel>,
    tools: Option<Arc<dyn ToolHost>>,
}

impl Agent {
    pub fn new(
        name: &'static str,
        system_prompt: impl Into<String>,
        model: Arc<dyn ChatModel>,
        tools: Option<Arc<dyn ToolHost>>,
    ) -> Result<Self> {
        let system_prompt = system_prompt.into();
        if system_prompt.trim().is_empty() {
            return Err(Error::InvalidInput(
                "system_prompt cannot be empty".to_string(),
            ));
        }

        Ok(Self {
            name,
            system_prompt,
            model,
            tools,
        })
    }

    /// Send `prompt` to the model and return its answer.
    pub async fn execute(&self, prompt: &str) -> Result<String> {
        if prompt.trim().is_empty() {
            return Err(Error::InvalidInput("prompt cannot be empty".to_string()));
        }

        debug!(
            "{} sending {} byte prompt to {}",
            self.name,
            prompt.len(),
            self.model.model_id()
        );

        self.model
            .chat(ChatRequest {
                system: &self.system_prompt,
                prompt,
                tools: self.tools.as_deref(),
            })
            .await
    }

    pub fn tool_count(&self) -> usize {
        self.tools.as_ref().map(|t| t.tools().len()).unwrap_or(0)
    }

    /// `provider/model`, used in reports.
    pub fn model_label(&self) -> String {
        format!("{}/{}", self.model.name(), self.model.model_id())
    }

    /// Short technical description, e.g. `ServiceAnalyzer(model=ollama, tools=0)`.
    pub fn describe(&self) -> String {
        format!(
            "{}(model={}, tools={})",
            self.name,
            self.model.name(),
            self.tool_count()
        )
    }
}

impl fmt::Display for Agent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} with {} tool(s)", self.name, self.tool_count())
    }
}

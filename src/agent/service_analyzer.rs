use crate::agent::base::Agent;
use crate::agent::prompts::{service_analysis_prompt, SERVICE_ANALYZER_SYSTEM_PROMPT};
use crate::error::Result;
use crate::llm::ChatModel;
use crate::models::AwsServices;
use std::sync::Arc;
use tracing::warn;

/// Returned when the model answers with nothing.
pub const UNKNOWN_SERVICES: &str = r#"["unknown"]"#;

/// Identifies the AWS services a Terraform module uses.
pub struct ServiceAnalyzer {
    agent: Agent,
}

impl ServiceAnalyzer {
    pub fn new(model: Arc<dyn ChatModel>) -> Result<Self> {
        Ok(Self {
            agent: Agent::new("ServiceAnalyzer", SERVICE_ANALYZER_SYSTEM_PROMPT, model, None)?,
        })
    }

    pub async fn analyze(&self, terraform_code: &str) -> Result<AwsServices> {
        let response = self
            .agent
            .execute(&service_analysis_prompt(terraform_code))
            .await?;

        if response.trim().is_empty() {
            warn!("No services identified, falling back to {}", UNKNOWN_SERVICES);
            return Ok(AwsServices::from_response(UNKNOWN_SERVICES));
        }

        Ok(AwsServices::from_response(response))
    }

    pub fn agent(&self) -> &Agent {
        &self.agent
    }
}

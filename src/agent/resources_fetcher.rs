use crate::agent::base::Agent;
use crate::agent::prompts::{resources_prompt, RESOURCES_FETCHER_SYSTEM_PROMPT};
use crate::error::Result;
use crate::llm::{ChatModel, ToolHost};
use crate::models::AwsServices;
use std::sync::Arc;
use tracing::info;

/// Queries the Terraform Registry, through the MCP tools, for resources
/// and best practices of each service.
pub struct ResourcesFetcher {
    agent: Agent,
}

impl ResourcesFetcher {
    pub fn new(model: Arc<dyn ChatModel>, registry_tools: Arc<dyn ToolHost>) -> Result<Self> {
        Ok(Self {
            agent: Agent::new(
                "ResourcesFetcher",
                RESOURCES_FETCHER_SYSTEM_PROMPT,
                model,
                Some(registry_tools),
            )?,
        })
    }

    pub async fn fetch_best_practices(&self, services: &AwsServices) -> Result<String> {
        info!("Querying the Terraform Registry with {}", self.agent);
        let documentation = self
            .agent
            .execute(&resources_prompt(services.raw.trim()))
            .await?;
        info!("Best practices documentation retrieved from the Registry");
        Ok(documentation)
    }

    pub fn agent(&self) -> &Agent {
        &self.agent
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::testing::{EchoTools, ScriptedModel};

    #[tokio::test]
    async fn test_fetch_sends_services_with_tools() {
        let model = Arc::new(ScriptedModel::new(vec!["aws_s3_bucket_versioning docs"]));
        let tools = Arc::new(EchoTools::new(&["search_providers", "get_provider_details"]));
        let fetcher = ResourcesFetcher::new(model.clone(), tools).unwrap();

        let docs = fetcher
            .fetch_best_practices(&AwsServices::from_response(r#"["s3", "kms"]"#))
            .await
            .unwrap();

        assert_eq!(docs, "aws_s3_bucket_versioning docs");
        let seen = &model.requests()[0];
        assert!(seen.prompt.contains(r#"found in the code: ["s3", "kms"]"#));
        assert_eq!(seen.tool_count, 2);
        assert_eq!(fetcher.agent().tool_count(), 2);
    }
}

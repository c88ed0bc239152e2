use crate::agent::base::Agent;
use crate::agent::prompts::{advisor_prompt, ADVISOR_SYSTEM_PROMPT};
use crate::error::Result;
use crate::llm::ChatModel;
use crate::models::AwsServices;
use std::sync::Arc;

pub const NO_RECOMMENDATIONS: &str =
    "Unable to generate recommendations. Please check input data.";

/// Compares the module against the registry documentation and writes
/// prioritised recommendations.
pub struct BestPracticesAdvisor {
    agent: Agent,
}

impl BestPracticesAdvisor {
    pub fn new(model: Arc<dyn ChatModel>) -> Result<Self> {
        Ok(Self {
            agent: Agent::new("BestPracticesAdvisor", ADVISOR_SYSTEM_PROMPT, model, None)?,
        })
    }

    pub async fn generate_recommendations(
        &self,
        terraform_code: &str,
        services: &AwsServices,
        best_practices: &str,
    ) -> Result<String> {
        let prompt = advisor_prompt(terraform_code, services.raw.trim(), best_practices);
        let recommendations = self.agent.execute(&prompt).await?;

        if recommendations.trim().is_empty() {
            return Ok(NO_RECOMMENDATIONS.to_string());
        }
        Ok(recommendations)
    }

    pub fn agent(&self) -> &Agent {
        &self.agent
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::testing::ScriptedModel;

    #[tokio::test]
    async fn test_prompt_carries_all_inputs() {
        let model = Arc::new(ScriptedModel::new(vec!["1. Enable versioning (HIGH)"]));
        let advisor = BestPracticesAdvisor::new(model.clone()).unwrap();

        let out = advisor
            .generate_recommendations(
                "resource \"aws_s3_bucket\" \"example\" {}",
                &AwsServices::from_response(r#"["s3"]"#),
                "aws_s3_bucket_versioning keeps object history",
            )
            .await
            .unwrap();

        assert_eq!(out, "1. Enable versioning (HIGH)");
        let prompt = &model.requests()[0].prompt;
        assert!(prompt.contains("## Current Terraform Code:\nresource \"aws_s3_bucket\""));
        assert!(prompt.contains("## AWS Services Being Used:\n[\"s3\"]"));
        assert!(prompt.contains("aws_s3_bucket_versioning keeps object history"));
    }

    #[tokio::test]
    async fn test_empty_answer_uses_fallback() {
        let model = Arc::new(ScriptedModel::new(vec![""]));
        let advisor = BestPracticesAdvisor::new(model).unwrap();

        let out = advisor
            .generate_recommendations("code", &AwsServices::from_response("[]"), "docs")
            .await
            .unwrap();

        assert_eq!(out, NO_RECOMMENDATIONS);
    }
}

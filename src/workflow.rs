//! The four-step analysis of one Terraform module.
//!
//! 1. Read the module's `.tf` files.
//! 2. Ask the service analyzer which AWS services are used.
//! 3. Ask the resources fetcher, with the registry tools attached, for
//!    best-practice documentation on those services.
//! 4. Ask the advisor for recommendations.
//!
//! Every console line is captured in a [`Transcript`] which becomes the
//! text report.

use crate::agent::{BestPracticesAdvisor, ResourcesFetcher, ServiceAnalyzer};
use crate::config::{Config, ReportConfig};
use crate::error::Result;
use crate::llm::{create_model, ChatModel, ToolHost};
use crate::models::{AnalysisResult, ModelsUsed, TerraformModule};
use crate::report::{render_report, report_file_name, save_report, Transcript};
use chrono::Utc;
use indicatif::{ProgressBar, ProgressStyle};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

const RULE_WIDTH: usize = 80;

/// The three agents wired to their models.
pub struct Pipeline {
    pub analyzer: ServiceAnalyzer,
    pub fetcher: ResourcesFetcher,
    pub advisor: BestPracticesAdvisor,
}

/// The model behind each agent.
pub struct AgentModels {
    pub analyzer: Arc<dyn ChatModel>,
    pub fetcher: Arc<dyn ChatModel>,
    pub advisor: Arc<dyn ChatModel>,
}

impl AgentModels {
    /// Build each agent's model on the provider configured for it.
    ///
    /// Needs no network, so a missing API key surfaces before the
    /// registry server is launched.
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self {
            analyzer: create_model(config, config.agents.service_analyzer)?,
            fetcher: create_model(config, config.agents.resources_fetcher)?,
            advisor: create_model(config, config.agents.advisor)?,
        })
    }
}

impl Pipeline {
    pub fn new(models: AgentModels, registry: Arc<dyn ToolHost>) -> Result<Self> {
        Self::from_models(models.analyzer, models.fetcher, models.advisor, registry)
    }

    pub fn from_models(
        analyzer: Arc<dyn ChatModel>,
        fetcher: Arc<dyn ChatModel>,
        advisor: Arc<dyn ChatModel>,
        registry: Arc<dyn ToolHost>,
    ) -> Result<Self> {
        Ok(Self {
            analyzer: ServiceAnalyzer::new(analyzer)?,
            fetcher: ResourcesFetcher::new(fetcher, registry)?,
            advisor: BestPracticesAdvisor::new(advisor)?,
        })
    }

    fn models_used(&self) -> ModelsUsed {
        ModelsUsed {
            service_analyzer: self.analyzer.agent().model_label(),
            resources_fetcher: self.fetcher.agent().model_label(),
            advisor: self.advisor.agent().model_label(),
        }
    }
}

/// Console and report behaviour for one run.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Print transcript lines to stdout.
    pub echo: bool,
    /// Show spinners while models are working.
    pub show_progress: bool,
    pub report: ReportConfig,
}

fn rule() -> String {
    "=".repeat(RULE_WIDTH)
}

fn section(transcript: &mut Transcript, title: &str, leading_blank: bool) {
    if leading_blank {
        transcript.blank();
    }
    transcript.line(rule());
    transcript.line(title);
    transcript.line(rule());
}

async fn with_spinner<F, T>(show: bool, message: &str, fut: F) -> T
where
    F: Future<Output = T>,
{
    let pb = if show {
        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed}] {msg}") {
            pb.set_style(style);
        }
        pb.set_message(message.to_string());
        pb.enable_steady_tick(Duration::from_millis(120));
        pb
    } else {
        ProgressBar::hidden()
    };

    let out = fut.await;
    pb.finish_and_clear();
    out
}

/// Run the full analysis for an already-read module.
pub async fn analyze_module(
    module: &TerraformModule,
    pipeline: &Pipeline,
    options: &RunOptions,
) -> Result<AnalysisResult> {
    let started = Instant::now();
    let analysis_date = Utc::now();
    let directory = module.directory.display().to_string();
    let mut transcript = Transcript::new(options.echo);

    transcript.line(rule());
    transcript.line("🔍 TERRAFORM BEST PRACTICES ANALYZER");
    transcript.line(rule());
    transcript.line(format!("\n📂 Analyzing module: {}\n", directory));

    // Step 1
    section(&mut transcript, "📖 STEP 1: Reading Terraform code...", false);
    transcript.line(format!("\n📂 Module Directory: {}", directory));
    let discovered = module.discovered_names();
    transcript.line(format!(
        "📄 Found {} Terraform file(s) ({} lines total):",
        discovered.len(),
        module.total_lines()
    ));
    for name in discovered {
        transcript.line(format!("   - {}", name));
    }
    let code = module.formatted();

    // Step 2
    section(&mut transcript, "🔍 STEP 2: Identifying AWS services...", true);
    let services = with_spinner(
        options.show_progress,
        "Identifying AWS services...",
        pipeline.analyzer.analyze(&code),
    )
    .await?;
    info!("Identified {} AWS service(s)", services.names.len());
    transcript.line(format!("\n✅ Services identified: {}\n", services));

    // Step 3
    let mcp_tools = pipeline.fetcher.agent().tool_count();
    section(
        &mut transcript,
        "🔧 STEP 3: Fetching best practices from Terraform Registry...",
        true,
    );
    transcript.line(format!(
        "✅ Using {} MCP tools from Terraform Registry\n",
        mcp_tools
    ));
    let best_practices = with_spinner(
        options.show_progress,
        "Querying the Terraform Registry (this may take a minute)...",
        pipeline.fetcher.fetch_best_practices(&services),
    )
    .await?;

    // Step 4
    section(&mut transcript, "💡 STEP 4: Generating recommendations...", true);
    let recommendations = with_spinner(
        options.show_progress,
        "Generating recommendations...",
        pipeline
            .advisor
            .generate_recommendations(&code, &services, &best_practices),
    )
    .await?;

    section(&mut transcript, "✨ BEST PRACTICES RECOMMENDATIONS", true);
    transcript.line(format!("\n{}\n", recommendations));

    let mut result = AnalysisResult {
        module_directory: module.directory.clone(),
        files_analyzed: module.file_names(),
        total_lines: module.total_lines(),
        aws_services: services,
        mcp_tools,
        best_practices_resources: best_practices,
        recommendations,
        output_file: None,
        analysis_date,
        duration_seconds: started.elapsed().as_secs_f64(),
        models: pipeline.models_used(),
    };

    if options.report.save {
        let file_name = report_file_name(
            &module.name(),
            analysis_date.timestamp(),
            options.report.format,
        );
        result.output_file = Some(options.report.output_dir.join(&file_name));

        let saved = render_report(&transcript, &result, options.report.format).and_then(|content| {
            save_report(&options.report.output_dir, &file_name, &content)
        });
        match saved {
            Ok(path) => {
                info!("Report written to {}", path.display());
                transcript.line(format!("\n💾 Analysis saved to: {}", path.display()));
            }
            Err(e) => {
                result.output_file = None;
                warn!("Could not save report: {:#}", e);
            }
        }
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::OutputFormat;
    use crate::config::Provider;
    use crate::error::Error;
    use crate::llm::testing::{EchoTools, ScriptedModel};
    use crate::models::TerraformFile;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn s3_module() -> TerraformModule {
        TerraformModule {
            directory: PathBuf::from("./s3"),
            files: vec![TerraformFile::new(
                "main.tf",
                "resource \"aws_s3_bucket\" \"example\" {\n  bucket = \"demo\"\n}\n",
            )],
            unreadable: vec![],
        }
    }

    fn options(dir: &TempDir, save: bool, format: OutputFormat) -> RunOptions {
        RunOptions {
            echo: false,
            show_progress: false,
            report: ReportConfig {
                output_dir: dir.path().to_path_buf(),
                save,
                format,
            },
        }
    }

    #[tokio::test]
    async fn test_end_to_end_text_report() {
        let dir = TempDir::new().unwrap();
        let analyzer = Arc::new(ScriptedModel::new(vec![r#"["s3"]"#]));
        let fetcher = Arc::new(ScriptedModel::new(vec!["aws_s3_bucket_versioning: keeps history"]));
        let advisor = Arc::new(ScriptedModel::new(vec!["Add aws_s3_bucket_versioning (HIGH)"]));
        let tools = Arc::new(EchoTools::new(&["search_providers", "get_provider_details"]));
        let pipeline =
            Pipeline::from_models(analyzer.clone(), fetcher.clone(), advisor.clone(), tools).unwrap();

        let result = analyze_module(&s3_module(), &pipeline, &options(&dir, true, OutputFormat::Text))
            .await
            .unwrap();

        assert_eq!(result.aws_services.names, vec!["s3"]);
        assert_eq!(result.mcp_tools, 2);
        assert_eq!(result.files_analyzed, vec!["main.tf"]);
        assert_eq!(result.total_lines, 4);
        assert_eq!(result.recommendations, "Add aws_s3_bucket_versioning (HIGH)");
        assert_eq!(result.models.advisor, "scripted/scripted-model");

        // Each step feeds the next.
        assert!(analyzer.requests()[0].prompt.contains("## File: main.tf"));
        assert!(fetcher.requests()[0].prompt.contains(r#"["s3"]"#));
        assert_eq!(fetcher.requests()[0].tool_count, 2);
        let advisor_prompt = &advisor.requests()[0].prompt;
        assert!(advisor_prompt.contains("aws_s3_bucket_versioning: keeps history"));

        let path = result.output_file.expect("report should be saved");
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("terraform_analysis_s3_"));
        assert!(name.ends_with(".txt"));

        let report = std::fs::read_to_string(&path).unwrap();
        assert!(report.starts_with(&"=".repeat(80)));
        assert!(report.contains("📄 Found 1 Terraform file(s) (4 lines total):\n   - main.tf"));
        assert!(report.contains("✅ Services identified: [s3]"));
        assert!(report.contains("✅ Using 2 MCP tools from Terraform Registry"));
        assert!(report.contains("✨ BEST PRACTICES RECOMMENDATIONS"));
        assert!(report.contains("Add aws_s3_bucket_versioning (HIGH)"));
        assert!(!report.contains("Analysis saved to"));
    }

    #[tokio::test]
    async fn test_no_save_and_fallbacks() {
        let dir = TempDir::new().unwrap();
        let pipeline = Pipeline::from_models(
            Arc::new(ScriptedModel::new(vec![""])),
            Arc::new(ScriptedModel::new(vec!["docs"])),
            Arc::new(ScriptedModel::new(vec!["   "])),
            Arc::new(EchoTools::new(&[])),
        )
        .unwrap();

        let result = analyze_module(&s3_module(), &pipeline, &options(&dir, false, OutputFormat::Text))
            .await
            .unwrap();

        assert_eq!(result.aws_services.raw, r#"["unknown"]"#);
        assert_eq!(
            result.recommendations,
            "Unable to generate recommendations. Please check input data."
        );
        assert!(result.output_file.is_none());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_json_report_records_output_file() {
        let dir = TempDir::new().unwrap();
        let pipeline = Pipeline::from_models(
            Arc::new(ScriptedModel::new(vec![r#"["s3"]"#])),
            Arc::new(ScriptedModel::new(vec!["docs"])),
            Arc::new(ScriptedModel::new(vec!["recs"])),
            Arc::new(EchoTools::new(&["search_providers"])),
        )
        .unwrap();

        let result = analyze_module(&s3_module(), &pipeline, &options(&dir, true, OutputFormat::Json))
            .await
            .unwrap();

        let path = result.output_file.clone().unwrap();
        let saved: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(saved["recommendations"], "recs");
        assert_eq!(saved["output_file"], path.display().to_string());
    }

    #[tokio::test]
    async fn test_unreadable_files_are_listed() {
        let dir = TempDir::new().unwrap();
        let pipeline = Pipeline::from_models(
            Arc::new(ScriptedModel::new(vec![r#"["s3"]"#])),
            Arc::new(ScriptedModel::new(vec!["docs"])),
            Arc::new(ScriptedModel::new(vec!["recs"])),
            Arc::new(EchoTools::new(&[])),
        )
        .unwrap();
        let mut module = s3_module();
        module.unreadable.push("latin1.tf".to_string());

        let result = analyze_module(&module, &pipeline, &options(&dir, true, OutputFormat::Text))
            .await
            .unwrap();

        assert_eq!(result.files_analyzed, vec!["main.tf"]);
        let report = std::fs::read_to_string(result.output_file.unwrap()).unwrap();
        assert!(report.contains("📄 Found 2 Terraform file(s) (4 lines total):\n   - latin1.tf\n   - main.tf"));
    }

    #[test]
    fn test_agent_models_need_anthropic_key() {
        let mut config = Config::default();
        config.anthropic.api_key = None;
        assert!(AgentModels::from_config(&config).is_err());

        config.agents.resources_fetcher = Provider::Ollama;
        let models = AgentModels::from_config(&config).unwrap();
        assert_eq!(models.fetcher.name(), "ollama");
    }

    #[tokio::test]
    async fn test_model_failure_aborts() {
        let dir = TempDir::new().unwrap();
        let pipeline = Pipeline::from_models(
            Arc::new(ScriptedModel::failing(Error::ModelUnreachable {
                provider: "ollama".to_string(),
                endpoint: "http://localhost:11434".to_string(),
            })),
            Arc::new(ScriptedModel::new(vec![])),
            Arc::new(ScriptedModel::new(vec![])),
            Arc::new(EchoTools::new(&[])),
        )
        .unwrap();

        let err = analyze_module(&s3_module(), &pipeline, &options(&dir, true, OutputFormat::Text))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::ModelUnreachable { .. }));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}

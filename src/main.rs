//! tfadvisor - Terraform best practices analyzer
//!
//! Reads a Terraform module, identifies the AWS services it uses, pulls
//! best-practice documentation from the Terraform Registry MCP server and
//! asks an LLM for prioritized recommendations.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Any error (usage, no Terraform files, model or MCP failure)

mod agent;
mod cli;
mod config;
mod error;
mod llm;
mod mcp;
mod models;
mod report;
mod scanner;
mod workflow;

use anyhow::{Context, Result};
use cli::Args;
use config::{Config, Provider, DEFAULT_CONFIG_FILE};
use llm::ToolHost;
use mcp::McpClient;
use models::{AnalysisResult, TerraformModule};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;
use workflow::{AgentModels, Pipeline, RunOptions};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse_args();

    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    init_logging(&args);

    info!("tfadvisor v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    match run_analysis(args).await {
        Ok(exit_code) => std::process::exit(exit_code),
        Err(e) => {
            error!("Analysis failed: {:#}", e);
            eprintln!("\n❌ Error: {}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: write a default .tfadvisor.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(DEFAULT_CONFIG_FILE);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            DEFAULT_CONFIG_FILE
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", DEFAULT_CONFIG_FILE))?;

    println!("✅ Created {} with default settings.", DEFAULT_CONFIG_FILE);
    println!("   Edit it to choose models, providers per agent and the MCP server command.");
    Ok(())
}

fn init_logging(args: &Args) {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(args.log_level())
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

/// Run the analysis. Returns the process exit code.
async fn run_analysis(args: Args) -> Result<i32> {
    let mut config = load_config(&args)?;
    config.merge_with_args(&args);
    config.validate().context("Invalid configuration")?;

    let directory = args
        .directory
        .clone()
        .context("A Terraform module directory is required")?;

    // Fail on a missing or empty module before starting any external service.
    let module = scanner::read_module(&directory)?;

    if args.dry_run {
        return Ok(handle_dry_run(&module, &config));
    }

    if config.uses_provider(Provider::Ollama) {
        info!(
            "Ollama: {} at {}",
            config.model.name, config.model.ollama_url
        );
    }
    if config.uses_provider(Provider::Anthropic) {
        info!("Anthropic: {}", config.anthropic.model);
    }

    // Provider setup problems (a missing API key) fail before docker starts.
    let models = AgentModels::from_config(&config)?;

    let client = Arc::new(McpClient::spawn(&config.mcp).await?);
    if let Some(server) = client.server_info() {
        debug!("MCP server {} {}", server.name, server.version);
    }

    let echo = !args.quiet;
    if echo {
        println!("✅ Connected to Terraform Registry MCP Server");
        println!("✅ Loaded {} MCP tools\n", client.tools().len());
    }

    let outcome = analyze(&module, &config, models, client.clone(), echo).await;
    client.shutdown().await;
    let result = outcome?;

    if echo {
        print_summary(&result);
    } else {
        println!("{}", result.recommendations);
    }

    Ok(0)
}

async fn analyze(
    module: &TerraformModule,
    config: &Config,
    models: AgentModels,
    registry: Arc<McpClient>,
    echo: bool,
) -> Result<AnalysisResult> {
    let pipeline = Pipeline::new(models, registry)?;
    debug!(
        "Agents: {}, {}, {}",
        pipeline.analyzer.agent().describe(),
        pipeline.fetcher.agent().describe(),
        pipeline.advisor.agent().describe()
    );

    let options = RunOptions {
        echo,
        show_progress: echo,
        report: config.report.clone(),
    };

    Ok(workflow::analyze_module(module, &pipeline, &options).await?)
}

fn print_summary(result: &AnalysisResult) {
    println!("\n{}", "=".repeat(80));
    println!("🎉 ANALYSIS COMPLETED SUCCESSFULLY!");
    println!("{}", "=".repeat(80));
    println!("\n📊 Summary:");
    println!("   - Module analyzed: {}", result.module_directory.display());
    println!("   - Files reviewed: {}", result.files_analyzed.len());
    println!("   - AWS services found: {}", result.aws_services);
    if let Some(ref path) = result.output_file {
        println!("   - Report saved to: {}", path.display());
    }
    println!("   - Duration: {:.1}s", result.duration_seconds);
    println!("\n💡 Review the recommendations above to improve your Terraform module!");
}

/// Handle --dry-run: list what would be analyzed, contact nothing.
fn handle_dry_run(module: &TerraformModule, config: &Config) -> i32 {
    println!("\n🔍 Dry run: reading files (no MCP or model calls)...\n");
    println!(
        "   Found {} Terraform file(s) ({} lines total) in {}:\n",
        module.discovered_names().len(),
        module.total_lines(),
        module.directory.display()
    );
    for file in &module.files {
        println!("     📄 {} ({} lines)", file.name, file.line_count);
    }
    for name in &module.unreadable {
        println!("     ⚠️  {} (unreadable, skipped)", name);
    }

    println!("\n   Service analyzer: {:?}", config.agents.service_analyzer);
    println!("   Resources fetcher: {:?}", config.agents.resources_fetcher);
    println!("   Advisor: {:?}", config.agents.advisor);
    println!(
        "   MCP server: {} {}",
        config.mcp.command,
        config.mcp.args.join(" ")
    );

    println!("\n✅ Dry run complete. No external calls were made.");
    0
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded default config from {}", DEFAULT_CONFIG_FILE);
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => {
            warn!("Failed to load config: {:#}", e);
            Ok(Config::default())
        }
    }
}

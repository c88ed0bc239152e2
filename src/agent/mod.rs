//! The three analysis agents.
//!
//! Each agent wraps a single prompted call: the service analyzer lists the
//! AWS services in a module, the resources fetcher asks the Terraform
//! Registry about them, and the advisor turns both into recommendations.

pub mod advisor;
pub mod base;
pub mod prompts;
pub mod resources_fetcher;
pub mod service_analyzer;

pub use advisor::BestPracticesAdvisor;
pub use resources_fetcher::ResourcesFetcher;
pub use service_analyzer::ServiceAnalyzer;

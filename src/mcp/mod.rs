//! Model Context Protocol client used to reach the Terraform Registry.

pub mod client;
pub mod message;

pub use client::McpClient;

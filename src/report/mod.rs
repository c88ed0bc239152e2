//! Report output.

pub mod generator;

pub use generator::{render_report, report_file_name, save_report, Transcript};

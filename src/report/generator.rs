//! Report generation.
//!
//! The text report is the console transcript of an analysis run; the JSON
//! report is the serialized [`AnalysisResult`].

use crate::cli::OutputFormat;
use crate::models::AnalysisResult;
use anyhow::{Context, Result};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Lines printed to the console and kept for the text report.
#[derive(Debug, Default)]
pub struct Transcript {
    lines: Vec<String>,
    echo: bool,
}

impl Transcript {
    /// `echo` controls whether lines also go to stdout.
    pub fn new(echo: bool) -> Self {
        Self {
            lines: Vec::new(),
            echo,
        }
    }

    pub fn line(&mut self, text: impl Into<String>) {
        let text = text.into();
        if self.echo {
            println!("{}", text);
        }
        self.lines.push(text);
    }

    pub fn blank(&mut self) {
        self.line("");
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn render(&self) -> String {
        self.lines.join("\n")
    }
}

/// `terraform_analysis_<module>_<unix-seconds>.<ext>`
pub fn report_file_name(module: &str, timestamp: i64, format: OutputFormat) -> String {
    let module: String = module
        .chars()
        .map(|c| if c == '/' || c == '\\' { '_' } else { c })
        .collect();
    format!(
        "terraform_analysis_{}_{}.{}",
        module,
        timestamp,
        format.extension()
    )
}

/// Generate a JSON report.
pub fn generate_json_report(result: &AnalysisResult) -> Result<String> {
    serde_json::to_string_pretty(result).map_err(Into::into)
}

/// Render the report body in the requested format.
pub fn render_report(
    transcript: &Transcript,
    result: &AnalysisResult,
    format: OutputFormat,
) -> Result<String> {
    match format {
        OutputFormat::Text => Ok(transcript.render()),
        OutputFormat::Json => generate_json_report(result),
    }
}

/// Write the report into `output_dir`, creating it when missing.
pub fn save_report(output_dir: &Path, file_name: &str, content: &str) -> Result<PathBuf> {
    std::fs::create_dir_all(output_dir).with_context(|| {
        format!("Failed to create output directory {}", output_dir.display())
    })?;

    let path = output_dir.join(file_name);
    let mut file = std::fs::File::create(&path)
        .with_context(|| format!("Failed to create report file {}", path.display()))?;
    file.write_all(content.as_bytes())
        .with_context(|| format!("Failed to write report to {}", path.display()))?;

    Ok(path)
}

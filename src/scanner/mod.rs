//! Terraform file discovery.
//!
//! A module is a single directory: only `.tf` files directly inside it
//! are considered, nested modules are not followed.

use crate::error::{Error, Result};
use crate::models::{TerraformFile, TerraformModule};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

const TERRAFORM_EXTENSION: &str = "tf";

/// Find all `.tf` files directly inside `directory`, sorted by path.
pub fn find_terraform_files(directory: &Path) -> Result<Vec<PathBuf>> {
    if !directory.exists() {
        return Err(Error::DirectoryNotFound(directory.to_path_buf()));
    }

    if !directory.is_dir() {
        return Err(Error::NotADirectory(directory.to_path_buf()));
    }

    let mut files: Vec<PathBuf> = WalkDir::new(directory)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(e) => Some(e),
            Err(e) => {
                debug!("Skipping unreadable entry: {}", e);
                None
            }
        })
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| is_terraform_file(p))
        .collect();

    files.sort();
    Ok(files)
}

fn is_terraform_file(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some(TERRAFORM_EXTENSION)
}

/// Read every Terraform file of a module directory.
///
/// Files that cannot be read are skipped with a warning. A module with
/// no readable files is an error.
pub fn read_module(directory: &Path) -> Result<TerraformModule> {
    let paths = find_terraform_files(directory)?;
    let mut files = Vec::with_capacity(paths.len());
    let mut unreadable = Vec::new();

    for path in &paths {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());

        match fs::read_to_string(path) {
            Ok(content) => files.push(TerraformFile::new(name, content)),
            Err(e) => {
                warn!("Could not read file '{}': {}", path.display(), e);
                unreadable.push(name);
            }
        }
    }

    if files.is_empty() {
        return Err(Error::NoTerraformFiles(directory.to_path_buf()));
    }

    debug!(
        "Read {} Terraform file(s) from {}",
        files.len(),
        directory.display()
    );

    Ok(TerraformModule {
        directory: directory.to_path_buf(),
        files,
        unreadable,
    })
}

//! Load a decompiled application into a [`Corpus`].
//!
//! Accepts either a decompiler output directory (`sources/` + `resources/`, as jadx
//! writes it) or a JSON corpus dump.

use std::path::{Path, PathBuf};

use log::{info, warn};
use rayon::prelude::*;
use walkdir::WalkDir;

use super::{java, Corpus};
use crate::config::{AnalysisConfig, ClassUnit, ResourceEntry};
use crate::error::{AnalysisError, Result};

/// Names never descended into.
const DEFAULT_EXCLUDES: &[&str] = &[".git", ".gradle", ".idea", "node_modules", "__MACOSX"];

/// Resource root inside a decompiler output directory.
const RESOURCES_DIR: &str = "resources";

/// Load the corpus at `path`.
pub fn load_corpus(path: impl AsRef<Path>, config: &AnalysisConfig) -> Result<Corpus> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(AnalysisError::InvalidInput(format!(
            "input path does not exist: {}",
            path.display()
        )));
    }

    let corpus = if path.is_dir() {
        load_directory(path, config)
    } else {
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => {
                let content =
                    std::fs::read_to_string(path).map_err(|e| AnalysisError::io(path, e))?;
                Corpus::from_json(&content).map_err(|e| AnalysisError::json(path, e))?
            }
            Some("java") => {
                let content =
                    std::fs::read_to_string(path).map_err(|e| AnalysisError::io(path, e))?;
                Corpus::new(java::extract_classes(&content), Vec::new())
            }
            _ => {
                return Err(AnalysisError::InvalidInput(format!(
                    "expected a directory, a .json dump or a .java file: {}",
                    path.display()
                )))
            }
        }
    };

    info!(
        "Loaded {} classes and {} resources from {}",
        corpus.len(),
        corpus.resources().len(),
        path.display()
    );
    Ok(corpus)
}

fn load_directory(root: &Path, config: &AnalysisConfig) -> Corpus {
    let files = collect_files(root, config);

    let resource_root = root.join(RESOURCES_DIR);
    let has_resource_dir = resource_root.is_dir();

    let (java_files, other_files): (Vec<PathBuf>, Vec<PathBuf>) = files
        .into_iter()
        .partition(|p| p.extension().is_some_and(|e| e == "java"));

    let parse = |path: &PathBuf| -> Vec<ClassUnit> {
        let Some(text) = read_text(path, config.max_file_size) else {
            return Vec::new();
        };
        let units = java::extract_classes(&text);
        if units.is_empty() {
            warn!("No type declarations found in {}", path.display());
        }
        units
    };

    let per_file: Vec<Vec<ClassUnit>> = if config.parallel {
        java_files.par_iter().map(parse).collect()
    } else {
        java_files.iter().map(parse).collect()
    };
    let classes: Vec<ClassUnit> = per_file.into_iter().flatten().collect();

    let mut resources = Vec::new();
    for file in other_files {
        let base = if has_resource_dir {
            if !file.starts_with(&resource_root) {
                continue;
            }
            resource_root.as_path()
        } else {
            root
        };
        let Some(content) = read_text(&file, config.max_file_size) else {
            continue;
        };
        resources.push(ResourceEntry {
            name: relative_name(base, &file),
            content,
        });
    }

    Corpus::new(classes, resources)
}

fn collect_files(root: &Path, config: &AnalysisConfig) -> Vec<PathBuf> {
    let exclude_patterns: Vec<&str> = DEFAULT_EXCLUDES
        .iter()
        .copied()
        .chain(config.exclude_patterns.iter().map(|s| s.as_str()))
        .collect();

    WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| {
            let name = e.file_name().to_string_lossy();
            if exclude_patterns.iter().any(|p| name == *p) {
                return false;
            }
            !(e.depth() > 0 && e.file_type().is_dir() && name.starts_with('.'))
        })
        .filter_map(|entry| match entry {
            Ok(e) => Some(e),
            Err(err) => {
                warn!("Skipping unreadable entry: {err}");
                None
            }
        })
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .collect()
}

/// Read a file as UTF-8 text, skipping oversized and undecodable files.
fn read_text(path: &Path, max_file_size: u64) -> Option<String> {
    let size = std::fs::metadata(path).map(|m| m.len()).unwrap_or(0);
    if size > max_file_size {
        warn!(
            "Skipping {} ({} bytes exceeds limit of {})",
            path.display(),
            size,
            max_file_size
        );
        return None;
    }
    match std::fs::read(path) {
        Ok(bytes) => match String::from_utf8(bytes) {
            Ok(text) => Some(text),
            Err(_) => {
                warn!("Skipping non-UTF-8 file {}", path.display());
                None
            }
        },
        Err(e) => {
            warn!("Skipping unreadable file {}: {e}", path.display());
            None
        }
    }
}

fn relative_name(base: &Path, path: &Path) -> String {
    path.strip_prefix(base)
        .unwrap_or(path)
        .to_string_lossy()
        .replace('\\', "/")
}

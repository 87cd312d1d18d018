//! Asset commands: process, validate, manifest
//!
//! All commands walk the input tree recursively, skip hidden entries, and
//! visit files in path order so their output is reproducible.

use crate::config::ToolConfig;
use crate::error::{Result, ToolError};
use drifter_reflect::{write_atomic, Codec, TypeDescriptor, TypeInfo, TypeRegistry};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// File written into the output directory by `process`
pub const TYPE_INDEX_FILE: &str = "types.json";

/// Contents of [`TYPE_INDEX_FILE`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeIndex {
    pub types: Vec<TypeInfo>,
}

/// Summary of a `process` run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessReport {
    pub type_index: PathBuf,
    pub type_count: usize,
    /// Copied files, relative to the input directory
    pub copied: Vec<PathBuf>,
    pub bytes_copied: u64,
}

/// Write the type index and copy the input tree into the output directory
pub fn process(registry: &TypeRegistry, config: &ToolConfig) -> Result<ProcessReport> {
    require_dir(&config.input)?;
    fs::create_dir_all(&config.output)?;

    let index = TypeIndex {
        types: registry.iter().map(TypeDescriptor::info).collect(),
    };
    let type_index = config.output.join(TYPE_INDEX_FILE);
    write_atomic(&type_index, &serde_json::to_vec_pretty(&index)?, &config.persist)?;
    log::info!("Wrote {} types to {}", index.types.len(), type_index.display());

    let mut copied = Vec::new();
    let mut bytes_copied = 0;
    for file in scan(&config.input, &[config.output.as_path()])? {
        let dest = config.output.join(&file.relative);
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }
        bytes_copied += fs::copy(&file.path, &dest)?;
        log::debug!("Copied {}", file.relative.display());
        copied.push(file.relative);
    }
    log::info!(
        "Processed {} files ({} bytes) into {}",
        copied.len(),
        bytes_copied,
        config.output.display()
    );

    Ok(ProcessReport {
        type_index,
        type_count: index.types.len(),
        copied,
        bytes_copied,
    })
}

/// One validation failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Problem {
    pub path: PathBuf,
    pub message: String,
}

/// Outcome of `validate`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    /// JSON files inspected
    pub checked: usize,
    /// Files decoded as records of a registered type
    pub records: usize,
    pub problems: Vec<Problem>,
}

impl ValidationReport {
    pub fn is_ok(&self) -> bool {
        self.problems.is_empty()
    }

    fn problem(&mut self, path: &Path, message: impl Into<String>) {
        let message = message.into();
        log::warn!("{}: {}", path.display(), message);
        self.problems.push(Problem {
            path: path.to_path_buf(),
            message,
        });
    }
}

/// Check every JSON asset under `input`.
///
/// Each `*.json` file must hold an object. A file named after a registered
/// type (`Transform.json`) must also decode as a record of that type.
pub fn validate(registry: &TypeRegistry, input: &Path) -> Result<ValidationReport> {
    require_dir(input)?;
    let codec = Codec::new(registry);
    let mut report = ValidationReport::default();

    for file in scan(input, &[])? {
        if file.extension() != "json" {
            continue;
        }
        report.checked += 1;

        let text = match fs::read_to_string(&file.path) {
            Ok(text) => text,
            Err(e) => {
                report.problem(&file.relative, format!("unreadable: {}", e));
                continue;
            }
        };
        match serde_json::from_str::<Value>(&text) {
            Ok(Value::Object(_)) => {}
            Ok(_) => {
                report.problem(&file.relative, "expected a JSON object");
                continue;
            }
            Err(e) => {
                report.problem(&file.relative, format!("invalid JSON: {}", e));
                continue;
            }
        }

        let stem = file.path.file_stem().and_then(|s| s.to_str()).unwrap_or_default();
        if registry.contains(stem) {
            report.records += 1;
            if let Err(e) = codec.decode(stem, &text) {
                report.problem(&file.relative, e.to_string());
            }
        }
    }

    log::info!(
        "Validated {} files ({} records), {} problems",
        report.checked,
        report.records,
        report.problems.len()
    );
    Ok(report)
}

/// One manifest line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetEntry {
    /// Relative path with `/` separators
    pub path: String,
    pub size: u64,
    /// Lowercase extension, empty when there is none
    pub extension: String,
}

/// Inventory of an asset tree
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub asset_count: usize,
    pub total_bytes: u64,
    pub by_extension: BTreeMap<String, usize>,
    pub assets: Vec<AssetEntry>,
}

/// Build a manifest of `input`, leaving out the `exclude` paths
pub fn build_manifest(input: &Path, exclude: &[&Path]) -> Result<Manifest> {
    require_dir(input)?;
    let mut manifest = Manifest::default();
    for file in scan(input, exclude)? {
        let extension = file.extension();
        *manifest.by_extension.entry(extension.clone()).or_default() += 1;
        manifest.total_bytes += file.size;
        manifest.assets.push(AssetEntry {
            path: slash_path(&file.relative),
            size: file.size,
            extension,
        });
    }
    manifest.asset_count = manifest.assets.len();
    Ok(manifest)
}

/// Build the manifest of `config.input` and write it to `config.manifest`
pub fn manifest(config: &ToolConfig) -> Result<Manifest> {
    let manifest = build_manifest(&config.input, &[config.manifest.as_path()])?;
    write_atomic(
        &config.manifest,
        &serde_json::to_vec_pretty(&manifest)?,
        &config.persist,
    )?;
    log::info!(
        "Wrote manifest of {} assets ({} bytes) to {}",
        manifest.asset_count,
        manifest.total_bytes,
        config.manifest.display()
    );
    Ok(manifest)
}

fn require_dir(path: &Path) -> Result<()> {
    if path.is_dir() {
        Ok(())
    } else {
        Err(ToolError::not_found(path))
    }
}

#[derive(Debug)]
struct AssetFile {
    path: PathBuf,
    relative: PathBuf,
    size: u64,
}

impl AssetFile {
    fn extension(&self) -> String {
        self.path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default()
    }
}

/// Regular files under `root` in relative path order
fn scan(root: &Path, exclude: &[&Path]) -> io::Result<Vec<AssetFile>> {
    let excluded: Vec<PathBuf> = exclude
        .iter()
        .filter_map(|p| fs::canonicalize(p).ok())
        .collect();

    let mut files = Vec::new();
    let mut pending = vec![root.to_path_buf()];
    while let Some(dir) = pending.pop() {
        for entry in fs::read_dir(&dir)? {
            let entry = entry?;
            if entry.file_name().to_string_lossy().starts_with('.') {
                continue;
            }
            let path = entry.path();
            if !excluded.is_empty()
                && fs::canonicalize(&path).map_or(false, |c| excluded.contains(&c))
            {
                continue;
            }

            let file_type = entry.file_type()?;
            if file_type.is_dir() {
                pending.push(path);
            } else if file_type.is_file() {
                let size = entry.metadata()?.len();
                let relative = path.strip_prefix(root).unwrap_or(&path).to_path_buf();
                files.push(AssetFile {
                    path,
                    relative,
                    size,
                });
            }
        }
    }
    files.sort_by(|a, b| a.relative.cmp(&b.relative));
    Ok(files)
}

fn slash_path(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

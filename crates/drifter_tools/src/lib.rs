//! # drifter_tools - Asset Tooling
//!
//! Library side of the `drifter-assets` command. Commands read the type
//! catalogue through `drifter_reflect` and write their outputs with the same
//! atomic file replacement used for saved records.
//!
//! ```text
//! drifter-assets process   --input assets --output assets/processed
//! drifter-assets validate  --input assets
//! drifter-assets manifest  --input assets --manifest assets/manifest.json
//! ```

pub mod catalog;
pub mod commands;
pub mod config;
pub mod error;

pub use catalog::{demo_registry, register_demo_types};
pub use commands::{
    build_manifest, manifest, process, validate, AssetEntry, Manifest, ProcessReport, Problem,
    TypeIndex, ValidationReport, TYPE_INDEX_FILE,
};
pub use config::ToolConfig;
pub use error::{Result, ToolError};

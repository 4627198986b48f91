//! Caller-supplied configuration. Constructing and validating a [Config] is
//! the embedding application's job (CLI flag parsing is out of scope for
//! this crate); this module only defines the shape.

use chrono::{DateTime, Utc};

/// Where the catalog's properties/chunk files live.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Locator {
    Path(std::path::PathBuf),
    Url(url::Url),
}

/// Which slice of the incremental chunk sequence to process.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Mode {
    /// The full snapshot only.
    All,
    /// One specific incremental chunk id.
    OnlyChunk(u64),
    /// All incremental chunks strictly after the given id, ascending.
    AfterChunk(u64),
    /// All incremental chunks whose header timestamp is strictly after the
    /// given instant, in descending-id emission order.
    AfterTime(DateTime<Utc>),
}

/// The serialized output shape the embedding application intends to
/// produce. This crate does not interpret this field; it is carried purely
/// so callers have one place to put it alongside the rest of configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Log,
    Json,
    Csv,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    /// Expected `nexus.index.id`; validated against the sidecar properties.
    pub index_id: String,
    /// Expected `nexus.index.chain-id`; validated against the sidecar properties.
    pub chain_id: String,
    pub base: Locator,
    /// File stem shared by the properties and chunk files, e.g. `nexus-maven-repository-index`.
    pub file_stem: String,
    pub mode: Mode,
    pub worker_count: usize,
    pub verbose: bool,
    pub output_format: OutputFormat,
    pub output_path: Option<std::path::PathBuf>,
}

impl Config {
    pub const DEFAULT_WORKER_COUNT: usize = 4;
}

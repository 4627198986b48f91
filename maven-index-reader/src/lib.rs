//! Streaming reader for the Maven repository index: the gzipped,
//! length-prefixed binary catalog published alongside every public Maven
//! repository, plus its sidecar properties file.

pub mod chunk;
pub mod config;
pub mod error;
pub mod index;
pub mod pipeline;
pub mod properties;
pub mod record;
pub mod resource;
pub mod wire;

pub use config::{Config, Locator, Mode, OutputFormat};
pub use error::{Error, Result};
pub use record::{AttributeId, Record, RecordKind, Value};

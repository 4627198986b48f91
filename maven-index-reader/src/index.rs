//! Loads and validates the sidecar properties, then enumerates the ordered
//! set of chunk descriptors to process for the configured [Mode].

use std::time::Duration;

use chrono::{DateTime, FixedOffset};

use crate::{
    chunk::ChunkDecoder,
    config::{Config, Locator, Mode},
    error::{Error, PropertiesError},
    properties::Properties,
    resource::Resource,
};

/// Politeness pause between successive chunk existence/timestamp probes
/// against the upstream origin.
const PROBE_PACING: Duration = Duration::from_millis(500);

/// The parsed, validated sidecar properties.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CatalogProperties {
    pub index_id: String,
    pub chain_id: String,
    pub last_incremental: u64,
    pub timestamp: DateTime<FixedOffset>,
}

/// A locator for one chunk's byte stream: the full snapshot, or one
/// incremental with a specific id.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChunkDescriptor {
    Full,
    Incremental(u64),
}

impl ChunkDescriptor {
    fn file_suffix(self) -> String {
        match self {
            ChunkDescriptor::Full => ".gz".to_string(),
            ChunkDescriptor::Incremental(id) => format!(".{id}.gz"),
        }
    }
}

/// Opens the resource for `suffix` under `base`/`file_stem`.
pub(crate) fn resource_for(base: &Locator, file_stem: &str, suffix: &str) -> Result<Resource, Error> {
    let resource = match base {
        Locator::Path(path) => Resource::local(path.join(format!("{file_stem}{suffix}")))?,
        Locator::Url(base_url) => {
            let joined = base_url
                .join(&format!("{file_stem}{suffix}"))
                .map_err(crate::error::ResourceError::from)?;
            Resource::http(joined.as_str())?
        }
    };
    Ok(resource)
}

/// Loads the sidecar properties and validates catalog identity (§4.D).
pub async fn load_properties(config: &Config) -> Result<CatalogProperties, Error> {
    let mut resource = resource_for(&config.base, &config.file_stem, ".properties")?;
    let reader = resource.open().await?;
    let props = Properties::parse(reader)?;

    let index_id = props.as_string("nexus.index.id")?.to_string();
    let chain_id = props.as_string("nexus.index.chain-id")?.to_string();

    if index_id != config.index_id || chain_id != config.chain_id {
        return Err(PropertiesError::IdentityMismatch {
            expected_id: config.index_id.clone(),
            expected_chain: config.chain_id.clone(),
            actual_id: index_id,
            actual_chain: chain_id,
        }
        .into());
    }

    tracing::debug!(index_id, chain_id, "catalog identity validated");

    let last_incremental = props.as_int("nexus.index.last-incremental")? as u64;
    let timestamp = props.as_timestamp("nexus.index.timestamp")?;

    Ok(CatalogProperties {
        index_id,
        chain_id,
        last_incremental,
        timestamp,
    })
}

/// Opens and immediately drops a resource, as a reachability check.
async fn verify_reachable(config: &Config, descriptor: ChunkDescriptor) -> Result<(), Error> {
    let mut resource = resource_for(&config.base, &config.file_stem, &descriptor.file_suffix())?;
    resource.open().await?;
    Ok(())
}

/// Opens a chunk, reads just its header, and drops the resource.
///
/// The actual (synchronous) gzip/header read runs inside
/// [tokio::task::spawn_blocking], the same bridging pattern the pipeline
/// harness uses for full chunk decoding (§4.G).
async fn probe_header(
    config: &Config,
    descriptor: ChunkDescriptor,
) -> Result<crate::chunk::ChunkHeader, Error> {
    let mut resource = resource_for(&config.base, &config.file_stem, &descriptor.file_suffix())?;
    let reader = resource.open().await?;

    tokio::task::spawn_blocking(move || -> Result<_, Error> {
        let decoder = ChunkDecoder::open(reader)?;
        Ok(decoder.header())
    })
    .await
    .map_err(|e| Error::Internal(format!("header probe task panicked: {e}")))?
}

/// Computes the ordered list of chunk descriptors to process, per the
/// mode enumeration table (§4.D).
pub async fn enumerate_chunks(
    config: &Config,
    properties: &CatalogProperties,
) -> Result<Vec<ChunkDescriptor>, Error> {
    match &config.mode {
        Mode::All => Ok(vec![ChunkDescriptor::Full]),

        Mode::OnlyChunk(id) => {
            let descriptor = ChunkDescriptor::Incremental(*id);
            verify_reachable(config, descriptor).await?;
            Ok(vec![descriptor])
        }

        Mode::AfterChunk(n) => {
            let mut descriptors = Vec::new();
            for (i, id) in ((*n + 1)..=properties.last_incremental).enumerate() {
                if i > 0 {
                    tokio::time::sleep(PROBE_PACING).await;
                }
                let descriptor = ChunkDescriptor::Incremental(id);
                verify_reachable(config, descriptor).await?;
                descriptors.push(descriptor);
            }
            Ok(descriptors)
        }

        Mode::AfterTime(cutoff) => {
            let cutoff_ms = cutoff.timestamp_millis();
            let mut descriptors = Vec::new();

            for (i, id) in (1..=properties.last_incremental).rev().enumerate() {
                if i > 0 {
                    tokio::time::sleep(PROBE_PACING).await;
                }
                let descriptor = ChunkDescriptor::Incremental(id);
                let header = probe_header(config, descriptor).await?;
                if header.timestamp_ms <= cutoff_ms {
                    break;
                }
                descriptors.push(descriptor);
            }
            Ok(descriptors)
        }
    }
}

//! Fans out chunk descriptors to a bounded worker pool and funnels decoded
//! records into a single output channel.
//!
//! Grounded directly in the teacher's `castore::import::blobs::ConcurrentBlobUploader`:
//! an `Arc<Semaphore>` gates task spawning, a `tokio::task::JoinSet` collects
//! outcomes, and the record channel closes once every worker has exited.

use std::sync::Arc;

use tokio::{sync::mpsc, sync::Semaphore, task::JoinSet};

use crate::{
    chunk::{default_filter, ChunkDecoder},
    config::Config,
    error::Error,
    index::{self, ChunkDescriptor},
    record::Record,
};

/// Bound on the number of in-flight chunk descriptors. Matches §4.G.
const CHUNK_QUEUE_SIZE: usize = 16;
/// Bound on the output record channel. Matches §4.G.
const RECORD_QUEUE_SIZE: usize = 64;

pub type RecordFilter = Arc<dyn Fn(&Record) -> bool + Send + Sync>;

/// Runs the full pipeline: loads and validates properties, enumerates
/// chunks, and decodes them across a bounded worker pool.
///
/// Returns a receiver of `Result<Record, Error>`. A `Record` is one
/// successfully decoded and filter-admitted record; an `Err` is the first
/// fatal error encountered by any worker (a [crate::error::Error::Resource]
/// or [crate::error::Error::Decode], per §7's abort policy). The channel is
/// closed once every worker has exited, which the consumer observes as
/// end-of-stream.
pub async fn run(
    config: Config,
    filter: Option<RecordFilter>,
) -> Result<mpsc::Receiver<Result<Record, Error>>, Error> {
    let properties = index::load_properties(&config).await?;
    let descriptors = index::enumerate_chunks(&config, &properties).await?;

    let (tx, rx) = mpsc::channel(RECORD_QUEUE_SIZE);
    let config = Arc::new(config);
    let semaphore = Arc::new(Semaphore::new(config.worker_count.max(1)));
    let filter: RecordFilter = filter.unwrap_or_else(|| Arc::new(default_filter));

    tokio::spawn(run_supervisor(config, descriptors, semaphore, filter, tx));

    Ok(rx)
}

async fn run_supervisor(
    config: Arc<Config>,
    descriptors: Vec<ChunkDescriptor>,
    semaphore: Arc<Semaphore>,
    filter: RecordFilter,
    tx: mpsc::Sender<Result<Record, Error>>,
) {
    // The chunk queue itself is just this bounded prefix of the descriptor
    // list; real backpressure lives on the semaphore (concurrent open
    // resources) and the record channel (`tx`), per §4.G.
    let mut pending = descriptors.into_iter();
    let mut tasks: JoinSet<()> = JoinSet::new();

    loop {
        // Keep at most CHUNK_QUEUE_SIZE workers admitted at a time, in
        // addition to the semaphore's own P-sized concurrency bound.
        while tasks.len() < CHUNK_QUEUE_SIZE {
            let Some(descriptor) = pending.next() else {
                break;
            };

            let permit = semaphore
                .clone()
                .acquire_owned()
                .await
                .expect("pipeline semaphore is never closed");
            let config = config.clone();
            let filter = filter.clone();
            let tx = tx.clone();

            tasks.spawn(async move {
                let _permit = permit;
                if let Err(e) = decode_chunk(&config, descriptor, &filter, &tx).await {
                    tracing::warn!(error = %e, ?descriptor, "chunk worker aborted");
                    let _ = tx.send(Err(e)).await;
                }
            });
        }

        if tasks.join_next().await.is_none() {
            break;
        }
    }
    // `tx` (this function's own clone) drops here; once every spawned
    // worker's clone has also dropped, the channel closes.
}

async fn decode_chunk(
    config: &Config,
    descriptor: ChunkDescriptor,
    filter: &RecordFilter,
    tx: &mpsc::Sender<Result<Record, Error>>,
) -> Result<(), Error> {
    let suffix = match descriptor {
        ChunkDescriptor::Full => ".gz".to_string(),
        ChunkDescriptor::Incremental(id) => format!(".{id}.gz"),
    };
    let mut resource = index::resource_for(&config.base, &config.file_stem, &suffix)?;
    let reader = resource.open().await?;

    // The chunk decoder is a synchronous `Read`-based state machine; drive
    // it to completion off the async executor thread.
    let filter = filter.clone();
    let records = tokio::task::spawn_blocking(move || -> Result<Vec<Record>, Error> {
        let mut decoder = ChunkDecoder::open(reader)?;
        let mut records = Vec::new();
        while let Some(record) = decoder.next(&|r| filter(r))? {
            records.push(record);
        }
        Ok(records)
    })
    .await
    .map_err(|e| Error::Internal(format!("chunk decode task panicked: {e}")))??;

    for record in records {
        if tx.send(Ok(record)).await.is_err() {
            // consumer has dropped the receiver; nothing left to do.
            return Ok(());
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Locator, Mode, OutputFormat};
    use flate2::{write::GzEncoder, Compression};
    use std::io::Write;

    fn write_field_group(out: &mut Vec<u8>, fields: &[(&str, &str)]) {
        out.extend_from_slice(&(fields.len() as i32).to_be_bytes());
        for (k, v) in fields {
            out.push(0u8);
            out.extend_from_slice(&(k.len() as u16).to_be_bytes());
            out.extend_from_slice(k.as_bytes());
            out.extend_from_slice(&(v.len() as i32).to_be_bytes());
            out.extend_from_slice(v.as_bytes());
        }
    }

    fn write_chunk_file(path: &std::path::Path) {
        let mut raw = Vec::new();
        raw.push(1u8);
        raw.extend_from_slice(&1243533417953i64.to_be_bytes());
        write_field_group(
            &mut raw,
            &[
                ("u", "org.sonatype.nexus|nexus|1.3.0-SNAPSHOT|NA|pom"),
                ("i", "pom|1243533415343|1234|0|0|0"),
                ("m", "1243533417953"),
            ],
        );
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&raw).unwrap();
        let gz = encoder.finish().unwrap();
        std::fs::write(path, gz).unwrap();
    }

    fn write_properties_file(path: &std::path::Path) {
        std::fs::write(
            path,
            "nexus.index.id=apache-snapshots-local\n\
             nexus.index.chain-id=1243533418968\n\
             nexus.index.last-incremental=0\n\
             nexus.index.timestamp=20090529092504.542 -0400\n",
        )
        .unwrap();
    }

    #[tokio::test]
    async fn end_to_end_all_mode_yields_one_record() {
        let dir = tempfile::tempdir().unwrap();
        let stem = "nexus-maven-repository-index";
        write_properties_file(&dir.path().join(format!("{stem}.properties")));
        write_chunk_file(&dir.path().join(format!("{stem}.gz")));

        let config = Config {
            index_id: "apache-snapshots-local".to_string(),
            chain_id: "1243533418968".to_string(),
            base: Locator::Path(dir.path().to_path_buf()),
            file_stem: stem.to_string(),
            mode: Mode::All,
            worker_count: 2,
            verbose: false,
            output_format: OutputFormat::Log,
            output_path: None,
        };

        let mut rx = run(config, Some(Arc::new(|_: &Record| true))).await.unwrap();

        let mut records = Vec::new();
        while let Some(item) = rx.recv().await {
            records.push(item.unwrap());
        }

        assert_eq!(records.len(), 1);
    }
}

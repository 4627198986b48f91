//! Decodes one gzipped chunk into a sequence of typed [Record]s.

use std::io::Read;

use flate2::read::GzDecoder;

use crate::{
    error::{DecodeError, Error},
    record::{expand, AttributeId, Record, RecordKind},
    wire,
};

/// Version byte and chunk timestamp read off the chunk header. The version
/// byte is tolerated at any value (merely logged); only the timestamp
/// participates in mode enumeration (§4.D `after-time`).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChunkHeader {
    pub version: u8,
    /// Unix epoch milliseconds, as encoded on the wire.
    pub timestamp_ms: i64,
}

/// Default record filter: admits only `ArtifactAdd`/`ArtifactRemove`
/// records without a classifier (source/javadoc attachments are dropped).
pub fn default_filter(record: &Record) -> bool {
    matches!(record.kind, RecordKind::ArtifactAdd | RecordKind::ArtifactRemove)
        && record.get(AttributeId::Classifier).is_none()
}

/// Streaming decoder over one chunk's gzip-compressed byte stream.
pub struct ChunkDecoder<R: Read> {
    inner: GzDecoder<R>,
    header: ChunkHeader,
}

impl<R: Read> ChunkDecoder<R> {
    /// Wraps `reader` in a gzip decompressor and reads the chunk header
    /// (version byte, then an 8-byte big-endian millisecond timestamp).
    pub fn open(reader: R) -> Result<Self, Error> {
        let mut inner = GzDecoder::new(reader);

        let version = wire::read_u8(&mut inner).map_err(|e| eof_or_io(e, "chunk version byte"))?;
        tracing::debug!(version, "read chunk header version");
        let timestamp_ms =
            wire::read_i64_be(&mut inner).map_err(|e| eof_or_io(e, "chunk header timestamp"))?;

        Ok(Self {
            inner,
            header: ChunkHeader { version, timestamp_ms },
        })
    }

    pub fn header(&self) -> ChunkHeader {
        self.header
    }

    /// Reads the next raw field group off the wire.
    ///
    /// `Ok(None)` signals normal end-of-chunk: end-of-input was observed
    /// exactly at a `field_count` boundary. Any other end-of-input is a
    /// [DecodeError].
    ///
    /// We don't implement [Iterator] here for the same reason the NAR
    /// directory reader doesn't: callers must stop at the first `None` and
    /// abandon this decoder on the first error, and a misused `Iterator`
    /// impl would make that too easy to get wrong.
    fn next_raw(&mut self) -> Result<Option<RawFieldGroup>, DecodeError> {
        let field_count = match wire::try_read_i32_be(&mut self.inner)? {
            Some(n) => n,
            None => return Ok(None),
        };

        if field_count < 0 {
            return Err(DecodeError::Truncated("negative field_count"));
        }

        let mut raw = RawFieldGroup::new();
        for _ in 0..field_count {
            let _flags = wire::read_u8(&mut self.inner).map_err(|e| eof_or_io(e, "field flags byte"))?;
            let key = wire::read_short_string(&mut self.inner)?;
            let value = wire::read_long_string(&mut self.inner)?;
            raw.insert(key, value);
        }

        Ok(Some(raw))
    }

    /// Reads, classifies, expands, and filters records until one survives
    /// the filter or the chunk ends.
    pub fn next(&mut self, filter: &dyn Fn(&Record) -> bool) -> Result<Option<Record>, Error> {
        loop {
            let raw = match self.next_raw()? {
                Some(raw) => raw,
                None => return Ok(None),
            };

            let record = expand::expand(&raw)?;
            if filter(&record) {
                return Ok(Some(record));
            }
            tracing::trace!(kind = ?record.kind, "record rejected by filter");
        }
    }
}

type RawFieldGroup = crate::record::RawRecord;

fn eof_or_io(e: std::io::Error, what: &'static str) -> DecodeError {
    if e.kind() == std::io::ErrorKind::UnexpectedEof {
        DecodeError::Truncated(what)
    } else {
        DecodeError::Io(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::AttributeId;
    use flate2::{write::GzEncoder, Compression};
    use std::io::{Cursor, Write};

    /// Builds a synthetic gzipped chunk matching the wire layout in §6,
    /// carrying the five records described in the full-chunk test scenario.
    fn synthetic_chunk_bytes() -> Vec<u8> {
        let mut raw = Vec::new();
        raw.push(1u8); // version
        raw.extend_from_slice(&1243533417953i64.to_be_bytes()); // chunk timestamp

        write_field_group(
            &mut raw,
            &[
                ("u", "org.sonatype.nexus|nexus|1.3.0-SNAPSHOT|NA|pom"),
                ("i", "pom|1243533415343|1234|0|0|0"),
                ("n", "Nexus Repository Manager"),
                ("m", "1243533417953"),
            ],
        );

        write_field_group(
            &mut raw,
            &[
                ("u", "org.sonatype.test-evict|sonatype-test-evict_1.4_mail|1.0-SNAPSHOT|NA|jar"),
                ("i", "jar|0|0|0|0|0"),
                ("m", "1243533417954"),
            ],
        );

        write_field_group(&mut raw, &[("rootGroups", "x"), ("rootGroupsList", "org")]);

        write_field_group(
            &mut raw,
            &[
                ("allGroups", "x"),
                ("allGroupsList", "org.sonatype.test-evict|org.sonatype.nexus"),
            ],
        );

        write_field_group(
            &mut raw,
            &[("DESCRIPTOR", "x"), ("IDXINFO", "1|apache-snapshots")],
        );

        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&raw).unwrap();
        encoder.finish().unwrap()
    }

    fn write_field_group(out: &mut Vec<u8>, fields: &[(&str, &str)]) {
        out.extend_from_slice(&(fields.len() as i32).to_be_bytes());
        for (k, v) in fields {
            out.push(0u8); // flags, ignored
            out.extend_from_slice(&(k.len() as u16).to_be_bytes());
            out.extend_from_slice(k.as_bytes());
            out.extend_from_slice(&(v.len() as i32).to_be_bytes());
            out.extend_from_slice(v.as_bytes());
        }
    }

    #[test]
    fn full_chunk_scenario() {
        let bytes = synthetic_chunk_bytes();
        let mut decoder = ChunkDecoder::open(Cursor::new(bytes)).unwrap();
        assert_eq!(decoder.header().timestamp_ms, 1243533417953);

        let mut records = Vec::new();
        while let Some(record) = decoder.next(&|_| true).unwrap() {
            records.push(record);
        }

        assert_eq!(records.len(), 5);
        assert_eq!(records[0].kind, RecordKind::ArtifactAdd);
        assert_eq!(records[0].get_string(AttributeId::GroupId), Some("org.sonatype.nexus"));
        assert_eq!(records[0].get_string(AttributeId::Name), Some("Nexus Repository Manager"));
        assert_eq!(records[0].get_string(AttributeId::FileExtension), Some("pom"));

        assert_eq!(records[1].kind, RecordKind::ArtifactAdd);
        assert_eq!(
            records[1].get_string(AttributeId::ArtifactId),
            Some("sonatype-test-evict_1.4_mail")
        );
        assert_eq!(records[1].get_string(AttributeId::FileExtension), Some("jar"));

        assert_eq!(records[2].kind, RecordKind::RootGroups);
        assert_eq!(records[2].get_list(AttributeId::RootGroupsList), Some(&["org".to_string()][..]));

        assert_eq!(records[3].kind, RecordKind::AllGroups);
        assert_eq!(
            records[3].get_list(AttributeId::AllGroupsList),
            Some(&["org.sonatype.test-evict".to_string(), "org.sonatype.nexus".to_string()][..])
        );

        assert_eq!(records[4].kind, RecordKind::Descriptor);
        assert_eq!(records[4].get_string(AttributeId::RepositoryId), Some("apache-snapshots"));
    }

    #[test]
    fn filter_admits_only_selected_kinds() {
        let bytes = synthetic_chunk_bytes();
        let mut decoder = ChunkDecoder::open(Cursor::new(bytes)).unwrap();

        let filter = |r: &Record| matches!(r.kind, RecordKind::RootGroups | RecordKind::AllGroups);

        let mut records = Vec::new();
        while let Some(record) = decoder.next(&filter).unwrap() {
            records.push(record);
        }

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].kind, RecordKind::RootGroups);
        assert_eq!(records[1].kind, RecordKind::AllGroups);
    }

    #[test]
    fn truncated_mid_field_group_is_an_error() {
        let mut raw = Vec::new();
        raw.push(1u8);
        raw.extend_from_slice(&0i64.to_be_bytes());
        raw.extend_from_slice(&1i32.to_be_bytes()); // field_count = 1
        raw.push(0u8); // flags
                       // ... but no key/value bytes follow.

        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&raw).unwrap();
        let gz = encoder.finish().unwrap();

        let mut decoder = ChunkDecoder::open(Cursor::new(gz)).unwrap();
        assert!(decoder.next(&|_| true).is_err());
    }

    #[test]
    fn clean_eof_at_field_count_boundary_is_normal_termination() {
        let mut raw = Vec::new();
        raw.push(1u8);
        raw.extend_from_slice(&0i64.to_be_bytes());
        // no further bytes: stream ends exactly at the field_count boundary.

        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&raw).unwrap();
        let gz = encoder.finish().unwrap();

        let mut decoder = ChunkDecoder::open(Cursor::new(gz)).unwrap();
        assert_eq!(decoder.next(&|_| true).unwrap(), None);
    }
}

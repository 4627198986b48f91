//! Parser for the sidecar `.properties` file: a newline-delimited
//! `key=value` text format advertising catalog identity and the chunk
//! frontier.

use std::{collections::BTreeMap, io::Read};

use chrono::{DateTime, FixedOffset};

use crate::error::PropertiesError;

/// The producer's timestamp format: `yyyyMMddHHmmss.SSS` followed by a
/// `±HHMM` zone offset, e.g. `20090529092504.542 -0400`.
const TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S%.3f %z";

/// An immutable `key=value` map parsed from the sidecar properties file,
/// with typed accessors.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Properties {
    entries: BTreeMap<String, String>,
}

impl Properties {
    /// Reads and parses a properties resource to completion.
    pub fn parse(mut r: impl Read) -> Result<Self, PropertiesError> {
        let mut buf = String::new();
        r.read_to_string(&mut buf)?;
        Self::parse_str(&buf)
    }

    /// Parses already-decoded properties text.
    pub fn parse_str(input: &str) -> Result<Self, PropertiesError> {
        let mut entries = BTreeMap::new();

        for line in input.split(['\r', '\n']) {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let (key, value) = line
                .split_once('=')
                .ok_or_else(|| PropertiesError::MalformedLine(line.to_string()))?;

            entries.insert(key.trim().to_string(), value.trim().to_string());
        }

        Ok(Self { entries })
    }

    pub fn as_string(&self, key: &str) -> Result<&str, PropertiesError> {
        self.entries
            .get(key)
            .map(String::as_str)
            .ok_or_else(|| PropertiesError::KeyNotFound(key.to_string()))
    }

    pub fn as_int(&self, key: &str) -> Result<i64, PropertiesError> {
        let raw = self.as_string(key)?;
        raw.parse::<i64>()
            .map_err(|_| PropertiesError::InvalidInt(key.to_string(), raw.to_string()))
    }

    pub fn as_timestamp(&self, key: &str) -> Result<DateTime<FixedOffset>, PropertiesError> {
        let raw = self.as_string(key)?;
        DateTime::parse_from_str(raw, TIMESTAMP_FORMAT)
            .map_err(|_| PropertiesError::InvalidTimestamp(key.to_string(), raw.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_basic_properties() {
        let props = Properties::parse_str(
            "\
# a comment
nexus.index.id=apache-snapshots-local
nexus.index.chain-id=1243533418968
nexus.index.last-incremental=42
nexus.index.timestamp=20090529092504.542 -0400
",
        )
        .unwrap();

        assert_eq!(props.as_string("nexus.index.id").unwrap(), "apache-snapshots-local");
        assert_eq!(props.as_int("nexus.index.last-incremental").unwrap(), 42);
    }

    #[test]
    fn parses_crlf_and_blank_lines() {
        let props = Properties::parse_str("a=1\r\n\r\nb=2\r\n").unwrap();
        assert_eq!(props.as_string("a").unwrap(), "1");
        assert_eq!(props.as_string("b").unwrap(), "2");
    }

    #[test]
    fn trims_whitespace_around_key_and_value() {
        let props = Properties::parse_str("  a  =  1  \n").unwrap();
        assert_eq!(props.as_string("a").unwrap(), "1");
    }

    #[test]
    fn rejects_line_without_equals() {
        assert!(Properties::parse_str("not-a-kv-line\n").is_err());
    }

    #[test]
    fn missing_key_is_not_found() {
        let props = Properties::parse_str("a=1\n").unwrap();
        assert!(matches!(
            props.as_string("missing"),
            Err(PropertiesError::KeyNotFound(_))
        ));
    }

    #[test]
    fn parses_timestamp_with_offset() {
        use chrono::{Datelike, Timelike};

        let props = Properties::parse_str("t=20090529092504.542 -0400\n").unwrap();
        let ts = props.as_timestamp("t").unwrap();
        assert_eq!((ts.year(), ts.month(), ts.day()), (2009, 5, 29));
        assert_eq!((ts.hour(), ts.minute(), ts.second()), (9, 25, 4));
        assert_eq!(ts.timestamp_subsec_millis(), 542);
        assert_eq!(ts.offset().local_minus_utc(), -4 * 3600);
    }

    #[test]
    fn malformed_timestamp_is_rejected() {
        let props = Properties::parse_str("t=not-a-timestamp\n").unwrap();
        assert!(props.as_timestamp("t").is_err());
    }
}

//! A single-shot, scoped handle to a byte stream, opened from either a local
//! file or an HTTP(S) URL.

use std::{
    io::{self, BufReader, Read},
    path::PathBuf,
};

use tokio_util::io::{StreamReader, SyncIoBridge};

use crate::error::ResourceError;

const USER_AGENT: &str = "Maven Index Reader Rust";

enum Locator {
    Local(PathBuf),
    Http(url::Url),
}

/// A locator for a chunk or properties byte stream. Validated at
/// construction time; opened at most once.
pub struct Resource {
    locator: Locator,
    opened: bool,
}

impl Resource {
    /// Builds a resource over a local file. Fails immediately if the path
    /// does not exist, mirroring the HTTP variant's eager URL validation.
    pub fn local(path: impl Into<PathBuf>) -> Result<Self, ResourceError> {
        let path = path.into();
        if !path.exists() {
            return Err(ResourceError::NotFound(path.display().to_string()));
        }
        Ok(Self {
            locator: Locator::Local(path),
            opened: false,
        })
    }

    /// Builds a resource over an HTTP(S) URL, validating it parses.
    pub fn http(url: &str) -> Result<Self, ResourceError> {
        let url = url::Url::parse(url)?;
        Ok(Self {
            locator: Locator::Http(url),
            opened: false,
        })
    }

    /// Opens the underlying byte stream. May be called exactly once; any
    /// later call returns [ResourceError::AlreadyOpened].
    pub async fn open(&mut self) -> Result<Box<dyn Read + Send>, ResourceError> {
        if self.opened {
            return Err(ResourceError::AlreadyOpened);
        }
        self.opened = true;

        match &self.locator {
            Locator::Local(path) => {
                let file = tokio::fs::File::open(path).await?;
                let file = file.into_std().await;
                Ok(Box::new(BufReader::new(file)))
            }
            Locator::Http(url) => {
                let client = reqwest::Client::new();
                let resp = client
                    .get(url.clone())
                    .header(reqwest::header::ACCEPT_ENCODING, "gzip")
                    .header(reqwest::header::USER_AGENT, USER_AGENT)
                    .send()
                    .await?;
                let resp = resp.error_for_status()?;

                let async_r = StreamReader::new(futures_core_stream(resp));
                let sync_r = SyncIoBridge::new(async_r);
                Ok(Box::new(sync_r))
            }
        }
    }
}

/// Adapts [reqwest::Response::bytes_stream] errors into `io::Error`, as
/// [StreamReader] requires.
fn futures_core_stream(
    resp: reqwest::Response,
) -> impl futures::Stream<Item = io::Result<bytes::Bytes>> {
    use futures::TryStreamExt;
    resp.bytes_stream()
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e))
}

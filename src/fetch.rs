use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{CONTENT_LENGTH, HeaderMap, HeaderValue, USER_AGENT};

use crate::app::{ProgressEvent, ProgressSink};
use crate::error::SpawriousError;

pub const CHUNK_SIZE: usize = 1024;

pub trait ArchiveClient: Send + Sync {
    /// Streams `url` into `destination`, returning the number of bytes written.
    fn fetch(
        &self,
        url: &str,
        destination: &Path,
        sink: &dyn ProgressSink,
    ) -> Result<u64, SpawriousError>;
}

#[derive(Clone)]
pub struct HttpArchiveClient {
    client: Client,
}

impl HttpArchiveClient {
    pub fn new() -> Result<Self, SpawriousError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("spawrious/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| SpawriousError::TransferHttp(err.to_string()))?,
        );
        // Archives run to several gigabytes, so only the connect phase is bounded.
        let client = Client::builder()
            .default_headers(headers)
            .connect_timeout(Duration::from_secs(60))
            .timeout(None::<Duration>)
            .build()
            .map_err(|err| SpawriousError::TransferHttp(err.to_string()))?;
        Ok(Self { client })
    }
}

impl ArchiveClient for HttpArchiveClient {
    fn fetch(
        &self,
        url: &str,
        destination: &Path,
        sink: &dyn ProgressSink,
    ) -> Result<u64, SpawriousError> {
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|err| SpawriousError::TransferHttp(err.to_string()))?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response
                .text()
                .unwrap_or_else(|_| "archive request failed".to_string());
            return Err(SpawriousError::TransferStatus { status, message });
        }
        let total = response
            .headers()
            .get(CONTENT_LENGTH)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.parse::<u64>().ok())
            .unwrap_or(0);
        tracing::info!(url, total, "fetching archive");

        let mut file =
            File::create(destination).map_err(|err| SpawriousError::Filesystem(err.to_string()))?;
        copy_in_chunks(response, &mut file, total, sink)
    }
}

/// Copies until a read returns no data, reporting the running byte count
/// after every chunk. Nothing is removed on failure.
pub fn copy_in_chunks<R: Read, W: Write>(
    mut reader: R,
    writer: &mut W,
    total: u64,
    sink: &dyn ProgressSink,
) -> Result<u64, SpawriousError> {
    let mut buffer = [0u8; CHUNK_SIZE];
    let mut transferred = 0u64;
    loop {
        let read = reader
            .read(&mut buffer)
            .map_err(|err| SpawriousError::TransferHttp(err.to_string()))?;
        if read == 0 {
            break;
        }
        writer
            .write_all(&buffer[..read])
            .map_err(|err| SpawriousError::Filesystem(err.to_string()))?;
        transferred += read as u64;
        sink.event(ProgressEvent {
            message: format!("fetch.progress bytes={transferred} total={total}"),
            elapsed: None,
        });
    }
    writer
        .flush()
        .map_err(|err| SpawriousError::Filesystem(err.to_string()))?;
    Ok(transferred)
}

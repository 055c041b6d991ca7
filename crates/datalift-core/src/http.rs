//! Blocking HTTP downloads on top of async reqwest
//!
//! Requests run on a shared tokio runtime and are exposed through a sync
//! interface. Body reads carry a stall timeout: no data within
//! `read_timeout` surfaces as `TimedOut`, which the retry helper treats as
//! transient.

use std::fs::File;
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, LazyLock};
use std::task::Context;
use std::time::Duration;

use futures_util::StreamExt;
use indicatif::ProgressBar;
use tokio::io::{AsyncRead, ReadBuf};

use crate::error::DownloadError;
use crate::progress::upgrade_to_bar;

/// Shared tokio runtime for HTTP and object-store calls.
pub static SHARED_RUNTIME: LazyLock<tokio::runtime::Runtime> = LazyLock::new(|| {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .expect("failed to build tokio runtime")
});

const COPY_BUF_SIZE: usize = 64 * 1024;

/// Timeouts applied to every request made through an [`HttpClient`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpSettings {
    pub connect_timeout: Duration,
    /// Maximum gap between two body chunks
    pub read_timeout: Duration,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(30),
            read_timeout: Duration::from_secs(30),
        }
    }
}

/// Connection-pooled client, built once and shared by the source clients.
#[derive(Clone)]
pub struct HttpClient {
    client: reqwest::Client,
    read_timeout: Duration,
}

impl HttpClient {
    pub fn new(settings: &HttpSettings) -> Result<Self, DownloadError> {
        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .pool_max_idle_per_host(4)
            .user_agent(concat!("datalift/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(DownloadError::from_reqwest)?;
        Ok(Self {
            client,
            read_timeout: settings.read_timeout,
        })
    }

    /// Start a GET request; finish it with [`Self::get_text`],
    /// [`Self::open_reader`] or [`Self::download_to_file`].
    pub fn get(&self, url: &str) -> reqwest::RequestBuilder {
        self.client.get(url)
    }

    /// Send the request and return the response body as text.
    pub fn get_text(&self, request: reqwest::RequestBuilder) -> Result<String, DownloadError> {
        let read_timeout = self.read_timeout;
        SHARED_RUNTIME.handle().block_on(async move {
            let response = send(request).await?;
            match tokio::time::timeout(read_timeout, response.text()).await {
                Ok(body) => body.map_err(DownloadError::from_reqwest),
                Err(_) => Err(io::Error::new(io::ErrorKind::TimedOut, "read timeout").into()),
            }
        })
    }

    /// Send the request and return a sync reader over the body.
    ///
    /// Returns (reader, byte_counter, content_length)
    pub fn open_reader(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<(BodyReader, ByteCounter, Option<u64>), DownloadError> {
        let read_timeout = self.read_timeout;
        let (reader, total_bytes) = SHARED_RUNTIME.handle().block_on(async move {
            let response = send(request).await?;
            let total_bytes = response.content_length();
            let stream = response.bytes_stream();
            let async_reader = tokio_util::io::StreamReader::new(
                stream.map(|result| result.map_err(io::Error::other)),
            );
            Ok::<_, DownloadError>((
                TimeoutReader::new(Box::pin(async_reader), read_timeout),
                total_bytes,
            ))
        })?;

        let counter = ByteCounter::default();
        let reader = CountingReader {
            inner: reader,
            count: counter.clone(),
        };
        Ok((reader, counter, total_bytes))
    }

    /// Stream the response body into `path`, reporting bytes on `pb`.
    ///
    /// The body lands in `<path>.part` first and is renamed once complete,
    /// so an interrupted transfer never leaves a file under the final name.
    pub fn download_to_file(
        &self,
        request: reqwest::RequestBuilder,
        path: &Path,
        pb: &ProgressBar,
    ) -> Result<u64, DownloadError> {
        let (mut reader, _, total) = self.open_reader(request)?;
        if let Some(total) = total {
            upgrade_to_bar(pb, total);
        }

        let part = part_path(path);
        let written = copy_with_progress(&mut reader, &part, pb).inspect_err(|_| {
            let _ = std::fs::remove_file(&part);
        })?;
        std::fs::rename(&part, path)?;
        Ok(written)
    }
}

async fn send(request: reqwest::RequestBuilder) -> Result<reqwest::Response, DownloadError> {
    request
        .send()
        .await
        .and_then(|r| r.error_for_status())
        .map_err(DownloadError::from_reqwest)
}

fn part_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".part");
    PathBuf::from(name)
}

fn copy_with_progress(reader: &mut impl Read, dest: &Path, pb: &ProgressBar) -> io::Result<u64> {
    let mut out = BufWriter::new(File::create(dest)?);
    let mut buf = vec![0u8; COPY_BUF_SIZE];
    let mut written = 0u64;
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        out.write_all(&buf[..n])?;
        written += n as u64;
        pb.inc(n as u64);
    }
    out.flush()?;
    Ok(written)
}

/// Shared byte counter for progress tracking
pub type ByteCounter = Arc<AtomicU64>;

/// Sync reader over an HTTP response body
pub type BodyReader = CountingReader<TimeoutReader>;

/// Reader wrapper that tracks bytes read
pub struct CountingReader<R> {
    inner: R,
    count: ByteCounter,
}

impl<R: Read> Read for CountingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.count.fetch_add(n as u64, Ordering::Relaxed);
        Ok(n)
    }
}

/// Async-to-sync bridge with a per-read stall timeout.
pub struct TimeoutReader {
    inner: Pin<Box<dyn AsyncRead + Send + Sync>>,
    timeout: Duration,
}

impl TimeoutReader {
    fn new(inner: Pin<Box<dyn AsyncRead + Send + Sync>>, timeout: Duration) -> Self {
        Self { inner, timeout }
    }
}

impl Read for TimeoutReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let timeout = self.timeout;
        let inner = &mut self.inner;
        SHARED_RUNTIME.handle().block_on(async move {
            let read_future = async {
                let mut read_buf = ReadBuf::new(buf);
                std::future::poll_fn(|cx: &mut Context<'_>| {
                    inner.as_mut().poll_read(cx, &mut read_buf)
                })
                .await?;
                Ok::<_, io::Error>(read_buf.filled().len())
            };

            match tokio::time::timeout(timeout, read_future).await {
                Ok(result) => result,
                Err(_) => Err(io::Error::new(
                    io::ErrorKind::TimedOut,
                    format!("read timeout ({timeout:?} with no data)"),
                )),
            }
        })
    }
}

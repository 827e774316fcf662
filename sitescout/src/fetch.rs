//! Resource fetching.
//!
//! Workers only see the [`Fetcher`] trait: give it a URL, get back a lazily read sequence of
//! lines. The concrete transport lives behind it so tests can substitute in-memory content.
//! No implementation retries; a failed fetch is reported once and the worker moves on.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::time::Duration;
use tracing::trace;
use url::Url;

use crate::errors::{FetchError, ScoutError, ScoutResult};

/// User agent sent by default; some hosts reject requests without a browser-like one
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0";

const BUFFER_CAPACITY: usize = 8192;

/// Lines of a fetched resource, read on demand. Dropping it releases the underlying
/// connection or file handle.
pub type Lines = Box<dyn Iterator<Item = io::Result<String>> + Send>;

/// Retrieves the textual content behind a URL
pub trait Fetcher: Send + Sync {
    fn fetch(&self, url: &Url) -> Result<Lines, FetchError>;
}

/// Fetches `http`/`https` URLs with a blocking HTTP client and `file` URLs from disk
#[derive(Debug, Clone)]
pub struct UrlFetcher {
    client: reqwest::blocking::Client,
}

impl UrlFetcher {
    pub fn new(user_agent: &str) -> ScoutResult<Self> {
        Self::from_builder(Self::client_builder(user_agent))
    }

    // The blocking client gives up after 30s by default; fetches here are never cut short
    fn client_builder(user_agent: &str) -> reqwest::blocking::ClientBuilder {
        reqwest::blocking::Client::builder()
            .user_agent(user_agent)
            .timeout(None::<Duration>)
    }

    fn from_builder(builder: reqwest::blocking::ClientBuilder) -> ScoutResult<Self> {
        let client = builder
            .build()
            .map_err(|e| ScoutError::config_error(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }

    fn fetch_http(&self, url: &Url) -> Result<Lines, FetchError> {
        let response = self.client.get(url.clone()).send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status { status });
        }
        trace!("GET {} -> {}", url, status);
        Ok(Box::new(LossyLines::new(BufReader::with_capacity(
            BUFFER_CAPACITY,
            response,
        ))))
    }

    fn fetch_file(url: &Url) -> Result<Lines, FetchError> {
        let path = url.to_file_path().map_err(|_| {
            FetchError::Io(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("not a local file path: {}", url),
            ))
        })?;
        let file = File::open(&path)?;
        trace!("Opened {}", path.display());
        Ok(Box::new(LossyLines::new(BufReader::with_capacity(
            BUFFER_CAPACITY,
            file,
        ))))
    }
}

impl Fetcher for UrlFetcher {
    fn fetch(&self, url: &Url) -> Result<Lines, FetchError> {
        match url.scheme() {
            "http" | "https" => self.fetch_http(url),
            "file" => Self::fetch_file(url),
            other => Err(FetchError::UnsupportedScheme(other.to_string())),
        }
    }
}

/// Splits a reader into lines, replacing invalid UTF-8 instead of failing on it.
/// Trailing `\n` and `\r\n` terminators are removed.
pub struct LossyLines<R> {
    reader: R,
    buf: Vec<u8>,
}

impl<R: BufRead> LossyLines<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buf: Vec::with_capacity(256),
        }
    }
}

impl<R: BufRead> Iterator for LossyLines<R> {
    type Item = io::Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        self.buf.clear();
        match self.reader.read_until(b'\n', &mut self.buf) {
            Ok(0) => None,
            Ok(_) => {
                if self.buf.ends_with(b"\n") {
                    self.buf.pop();
                    if self.buf.ends_with(b"\r") {
                        self.buf.pop();
                    }
                }
                Some(Ok(String::from_utf8_lossy(&self.buf).into_owned()))
            }
            Err(e) => Some(Err(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Write};
    use std::net::TcpListener;
    use std::thread;
    use tempfile::tempdir;

    /// Answers a single request with `response` and hands back the request head it received
    fn serve_once(response: &'static str) -> (Url, thread::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream.try_clone().unwrap());
            let mut head = String::new();
            loop {
                let mut line = String::new();
                if reader.read_line(&mut line).unwrap() == 0 || line == "\r\n" {
                    break;
                }
                head.push_str(&line);
            }
            let mut stream = stream;
            stream.write_all(response.as_bytes()).unwrap();
            stream.flush().unwrap();
            head
        });
        let url = Url::parse(&format!("http://{}/index.html", addr)).unwrap();
        (url, handle)
    }

    // Loopback requests must not be routed through a proxy from the environment
    fn local_fetcher(user_agent: &str) -> UrlFetcher {
        UrlFetcher::from_builder(UrlFetcher::client_builder(user_agent).no_proxy()).unwrap()
    }

    #[test]
    fn test_fetch_http_sends_user_agent_and_returns_lines() {
        let (url, server) = serve_once(
            "HTTP/1.1 200 OK\r\nContent-Length: 32\r\nConnection: close\r\n\r\n<p>rock and roll</p>\n<p>jazz</p>",
        );

        let fetcher = local_fetcher("sitescout-test/1.0");
        let lines: Vec<String> = fetcher.fetch(&url).unwrap().map(|l| l.unwrap()).collect();
        assert_eq!(lines, vec!["<p>rock and roll</p>", "<p>jazz</p>"]);

        let head = server.join().unwrap().to_ascii_lowercase();
        assert!(head.starts_with("get /index.html http/1.1"));
        assert!(head.contains("user-agent: sitescout-test/1.0\r\n"));
    }

    #[test]
    fn test_fetch_http_error_status() {
        let (url, server) = serve_once(
            "HTTP/1.1 404 Not Found\r\nContent-Length: 9\r\nConnection: close\r\n\r\nnot found",
        );

        let fetcher = local_fetcher(DEFAULT_USER_AGENT);
        match fetcher.fetch(&url) {
            Err(FetchError::Status { status }) => {
                assert_eq!(status, reqwest::StatusCode::NOT_FOUND)
            }
            Err(e) => panic!("expected a status error, got {}", e),
            Ok(_) => panic!("expected a status error"),
        }
        let head = server.join().unwrap();
        assert!(head.contains("Mozilla/5.0"));
    }

    #[test]
    fn test_lossy_lines_strip_terminators() {
        let lines: Vec<String> = LossyLines::new(Cursor::new(b"one\r\ntwo\nthree".to_vec()))
            .map(|l| l.unwrap())
            .collect();
        assert_eq!(lines, vec!["one", "two", "three"]);
    }

    #[test]
    fn test_lossy_lines_replace_invalid_utf8() {
        let mut lines = LossyLines::new(Cursor::new(vec![b'o', b'k', 0xff, b'\n']));
        assert_eq!(lines.next().unwrap().unwrap(), "ok\u{FFFD}");
        assert!(lines.next().is_none());
    }

    #[test]
    fn test_fetch_file_url() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("page.html");
        std::fs::write(&path, "<p>bread and butter</p>\n<p>tea</p>\n").unwrap();

        let fetcher = UrlFetcher::new(DEFAULT_USER_AGENT).unwrap();
        let url = Url::from_file_path(&path).unwrap();
        let lines: Vec<String> = fetcher.fetch(&url).unwrap().map(|l| l.unwrap()).collect();
        assert_eq!(lines, vec!["<p>bread and butter</p>", "<p>tea</p>"]);
    }

    #[test]
    fn test_fetch_missing_file_fails() {
        let dir = tempdir().unwrap();
        let url = Url::from_file_path(dir.path().join("missing.html")).unwrap();
        let fetcher = UrlFetcher::new(DEFAULT_USER_AGENT).unwrap();
        assert!(matches!(fetcher.fetch(&url), Err(FetchError::Io(_))));
    }

    #[test]
    fn test_unsupported_scheme() {
        let fetcher = UrlFetcher::new(DEFAULT_USER_AGENT).unwrap();
        let url = Url::parse("ftp://files.example/readme").unwrap();
        match fetcher.fetch(&url) {
            Err(FetchError::UnsupportedScheme(scheme)) => assert_eq!(scheme, "ftp"),
            _ => panic!("expected unsupported scheme"),
        }
    }
}

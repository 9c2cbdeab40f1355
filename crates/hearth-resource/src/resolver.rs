use crate::{Bundle, ResourceError};
use std::fmt;
use std::fs::File;
use std::io::{self, Cursor, Read};
use std::path::Path;
use tracing::{debug, warn};
use url::Url;

/// Where a resolved resource came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Url,
    Filesystem,
    Bundled,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::Url => write!(f, "url"),
            Strategy::Filesystem => write!(f, "filesystem"),
            Strategy::Bundled => write!(f, "bundled"),
        }
    }
}

pub(crate) fn format_strategies(strategies: &[Strategy]) -> String {
    strategies
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// An open, readable resource.
///
/// The underlying handle is released when the `Resource` is dropped.
pub struct Resource {
    name: String,
    strategy: Strategy,
    reader: Box<dyn Read + Send>,
}

impl Resource {
    pub fn new(name: &str, strategy: Strategy, reader: Box<dyn Read + Send>) -> Self {
        Self {
            name: name.to_owned(),
            strategy,
            reader,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    /// Read the remainder of the stream into memory.
    pub fn into_bytes(mut self) -> io::Result<Vec<u8>> {
        let mut buf = Vec::new();
        self.reader.read_to_end(&mut buf)?;
        Ok(buf)
    }
}

impl Read for Resource {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.reader.read(buf)
    }
}

impl fmt::Debug for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resource")
            .field("name", &self.name)
            .field("strategy", &self.strategy)
            .finish_non_exhaustive()
    }
}

/// Opens URL resources for the resolver.
pub trait UrlFetcher: Send + Sync {
    fn fetch(&self, url: &Url) -> Result<Box<dyn Read + Send>, ResourceError>;
}

/// Fetches `http`/`https` URLs with `ureq` and opens `file:` URLs locally.
pub struct HttpFetcher {
    agent: ureq::Agent,
}

impl HttpFetcher {
    pub fn new() -> Self {
        Self {
            agent: ureq::Agent::new_with_defaults(),
        }
    }

    fn get(&self, url: &Url) -> Result<Vec<u8>, ResourceError> {
        let resp = match self.agent.get(url.as_str()).call() {
            Ok(r) => r,
            Err(ureq::Error::StatusCode(code)) => {
                return Err(ResourceError::Http(format!("HTTP {code} for {url}")));
            }
            Err(e) => return Err(ResourceError::Http(e.to_string())),
        };

        let mut reader = resp.into_body().into_reader();
        let mut body = Vec::new();
        reader
            .read_to_end(&mut body)
            .map_err(|e| ResourceError::Http(e.to_string()))?;
        Ok(body)
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl UrlFetcher for HttpFetcher {
    fn fetch(&self, url: &Url) -> Result<Box<dyn Read + Send>, ResourceError> {
        match url.scheme() {
            "http" | "https" => {
                debug!("GET {url}");
                Ok(Box::new(Cursor::new(self.get(url)?)))
            }
            "file" => {
                let path = url.to_file_path().map_err(|()| ResourceError::InvalidUrl {
                    url: url.to_string(),
                    reason: "not a local file path".to_owned(),
                })?;
                let file = File::open(&path).map_err(|source| ResourceError::Read {
                    path: path.clone(),
                    source,
                })?;
                Ok(Box::new(file))
            }
            other => Err(ResourceError::UnsupportedScheme(other.to_owned())),
        }
    }
}

/// Locates resources by trying, in order: URL, filesystem path, bundled default.
///
/// The URL strategy is only attempted for names containing a `:`. Failures in
/// the URL strategy are logged at debug level and never propagated; the next
/// strategy is tried instead. If nothing matches the result is
/// [`ResourceError::NotFound`].
pub struct ResourceResolver {
    fetcher: Box<dyn UrlFetcher>,
    bundle: Bundle,
}

impl ResourceResolver {
    pub fn new(bundle: Bundle) -> Self {
        Self::with_fetcher(Box::new(HttpFetcher::new()), bundle)
    }

    pub fn with_fetcher(fetcher: Box<dyn UrlFetcher>, bundle: Bundle) -> Self {
        Self { fetcher, bundle }
    }

    pub fn bundle(&self) -> Bundle {
        self.bundle
    }

    pub fn resolve(&self, name: &str) -> Result<Resource, ResourceError> {
        let mut attempted = Vec::with_capacity(3);

        if name.contains(':') {
            attempted.push(Strategy::Url);
            match self.open_url(name) {
                Ok(reader) => return Ok(Resource::new(name, Strategy::Url, reader)),
                Err(e) => debug!("'{name}' is not a reachable URL: {e}"),
            }
        }

        attempted.push(Strategy::Filesystem);
        let path = Path::new(name);
        if path.is_file() {
            let file = File::open(path).map_err(|source| ResourceError::Read {
                path: path.to_path_buf(),
                source,
            })?;
            return Ok(Resource::new(name, Strategy::Filesystem, Box::new(file)));
        }

        attempted.push(Strategy::Bundled);
        if let Some(contents) = self.bundle.get(name) {
            return Ok(Resource::new(
                name,
                Strategy::Bundled,
                Box::new(Cursor::new(contents)),
            ));
        }

        warn!(
            "failed to locate resource '{name}', tried {}",
            format_strategies(&attempted)
        );
        Err(ResourceError::NotFound {
            name: name.to_owned(),
            attempted,
        })
    }

    fn open_url(&self, name: &str) -> Result<Box<dyn Read + Send>, ResourceError> {
        let url = Url::parse(name).map_err(|e| ResourceError::InvalidUrl {
            url: name.to_owned(),
            reason: e.to_string(),
        })?;
        self.fetcher.fetch(&url)
    }
}

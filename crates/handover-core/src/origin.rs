//! Canonical origins for message validation.
//!
//! An origin is the `scheme://host[:port]` triple identifying a browsing
//! context's security boundary. Configured endpoint URLs routinely carry
//! trailing slashes or path suffixes, so both sides of the handshake
//! normalize through this type before comparing.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use url::Url;

/// A canonical origin: scheme + host + explicit port.
///
/// The port is `None` when it is the scheme's default, so
/// `https://a.com` and `https://a.com:443` compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Origin {
    scheme: String,
    host: String,
    port: Option<u16>,
}

impl Origin {
    /// Derive the canonical origin of an arbitrary URL, discarding path,
    /// query, and fragment.
    pub fn parse(input: &str) -> Result<Self, OriginParseError> {
        let url = Url::parse(input)?;
        let host = url
            .host_str()
            .ok_or_else(|| OriginParseError::NoHost(input.to_string()))?;
        Ok(Self {
            scheme: url.scheme().to_string(),
            host: host.to_string(),
            // `Url::port` is already None for the scheme default.
            port: url.port(),
        })
    }

    /// The scheme (e.g., "https").
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// The host, without port.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// The explicit port, if any.
    pub fn port(&self) -> Option<u16> {
        self.port
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.port {
            Some(port) => write!(f, "{}://{}:{}", self.scheme, self.host, port),
            None => write!(f, "{}://{}", self.scheme, self.host),
        }
    }
}

impl FromStr for Origin {
    type Err = OriginParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Origin {
    type Error = OriginParseError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Origin> for String {
    fn from(origin: Origin) -> Self {
        origin.to_string()
    }
}

/// Error deriving an origin from a URL string.
#[derive(Debug, Clone, thiserror::Error)]
pub enum OriginParseError {
    #[error("invalid url: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("url has no host: {0}")]
    NoHost(String),
}

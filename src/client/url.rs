use url::{Host, Url};
use crate::{Error, Result, RTMPS_DEFAULT_PORT, RTMP_DEFAULT_PORT};
use crate::transport::Endpoint;

/// A parsed `rtmp://host[:port]/app/instance[?query]` address
#[derive(Debug, Clone)]
pub struct RtmpUrl {
    raw: String,
    scheme: String,
    /// `host[:port]` as written, brackets kept for IPv6
    authority: String,
    endpoint: Endpoint,
    segments: Vec<String>,
    query: Option<String>,
}

impl RtmpUrl {
    pub fn parse(addr: &str) -> Result<Self> {
        let url = Url::parse(addr)
            .map_err(|e| Error::invalid_url(format!("{}: {}", addr, e)))?;

        let tls = match url.scheme() {
            "rtmp" => false,
            "rtmps" => true,
            scheme => return Err(Error::invalid_url(format!("Unsupported scheme: {}", scheme))),
        };

        let host = match url.host() {
            Some(Host::Domain(domain)) if !domain.is_empty() => domain.to_string(),
            Some(Host::Ipv4(addr)) => addr.to_string(),
            Some(Host::Ipv6(addr)) => addr.to_string(),
            _ => return Err(Error::invalid_url(format!("Missing host in {}", addr))),
        };
        let default_port = if tls { RTMPS_DEFAULT_PORT } else { RTMP_DEFAULT_PORT };
        let port = url.port().unwrap_or(default_port);

        let mut authority = url.host_str().unwrap_or_default().to_string();
        if let Some(port) = url.port() {
            authority.push_str(&format!(":{}", port));
        }

        let segments: Vec<String> = url
            .path_segments()
            .map(|segments| segments.map(str::to_string).collect())
            .unwrap_or_default();
        if segments.len() < 2 {
            return Err(Error::invalid_url(format!("Expected /app/stream in {}", addr)));
        }
        if segments[0].is_empty() {
            return Err(Error::invalid_url(format!("Empty application name in {}", addr)));
        }
        if segments[segments.len() - 1].is_empty() {
            return Err(Error::invalid_url(format!("Empty stream name in {}", addr)));
        }

        Ok(RtmpUrl {
            raw: addr.to_string(),
            scheme: url.scheme().to_string(),
            authority,
            endpoint: Endpoint::new(host, port, tls),
            segments,
            query: url.query().filter(|q| !q.is_empty()).map(str::to_string),
        })
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// First path segment
    pub fn app(&self) -> &str {
        &self.segments[0]
    }

    /// `scheme://authority/app`
    pub fn tc_url(&self) -> String {
        format!("{}://{}/{}", self.scheme, self.authority, self.app())
    }

    /// The full address as given
    pub fn swf_url(&self) -> &str {
        &self.raw
    }

    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    /// Everything after the app segment, plus the query
    pub fn publish_path(&self) -> String {
        self.with_query(self.segments[1..].join("/"))
    }

    /// Last path segment, plus the query
    pub fn play_name(&self) -> String {
        self.with_query(self.segments[self.segments.len() - 1].clone())
    }

    fn with_query(&self, mut path: String) -> String {
        if let Some(query) = &self.query {
            path.push('?');
            path.push_str(query);
        }
        path
    }
}

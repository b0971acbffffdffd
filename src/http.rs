//! Request and response model shared by the controller, the cache store
//! and the network capability.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// HTTP request method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Get,
    Head,
    Post,
    Put,
    Patch,
    Delete,
    Options,
}

impl Method {
    /// Only GET responses are ever written to or served from a cache generation
    pub fn is_cacheable(&self) -> bool {
        matches!(self, Self::Get)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Get => "GET",
            Self::Head => "HEAD",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
            Self::Options => "OPTIONS",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for Method {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Self::Get),
            "HEAD" => Ok(Self::Head),
            "POST" => Ok(Self::Post),
            "PUT" => Ok(Self::Put),
            "PATCH" => Ok(Self::Patch),
            "DELETE" => Ok(Self::Delete),
            "OPTIONS" => Ok(Self::Options),
            other => Err(format!("unsupported method '{other}'")),
        }
    }
}

/// Request mode, as reported by the page that issued the request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RequestMode {
    /// Top-level page navigation
    Navigate,
    #[default]
    SameOrigin,
    NoCors,
    Cors,
}

/// An intercepted request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: Method,
    /// Absolute URL or root-relative path
    pub url: String,
    pub mode: RequestMode,
    pub headers: BTreeMap<String, String>,
    pub body: Vec<u8>,
}

impl Request {
    /// Create a request with an explicit method
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            mode: RequestMode::default(),
            headers: BTreeMap::new(),
            body: Vec::new(),
        }
    }

    /// Create a GET sub-resource request
    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::Get, url)
    }

    /// Create a GET page-navigation request
    pub fn navigate(url: impl Into<String>) -> Self {
        Self::get(url).with_mode(RequestMode::Navigate)
    }

    pub fn with_mode(mut self, mode: RequestMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn is_navigation(&self) -> bool {
        self.mode == RequestMode::Navigate
    }

    /// The cache key addressing this request
    pub fn key(&self) -> RequestKey {
        RequestKey::new(self.method, &self.url)
    }

    /// Path component of the URL (scheme and authority removed, query kept)
    pub fn path(&self) -> &str {
        url_path(&self.url)
    }
}

/// Normalized request identity used to address cache entries
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RequestKey {
    pub method: Method,
    pub url: String,
}

impl RequestKey {
    /// Build a key from the path and query of the URL. Scheme, authority
    /// and any `#fragment` are dropped, so an absolute same-origin URL and
    /// its root-relative form address the same entry.
    pub fn new(method: Method, url: &str) -> Self {
        let url = match url.find('#') {
            Some(pos) => &url[..pos],
            None => url,
        };
        Self {
            method,
            url: url_path(url).to_string(),
        }
    }

    /// GET key for a root-relative asset path
    pub fn get(url: &str) -> Self {
        Self::new(Method::Get, url)
    }
}

impl fmt::Display for RequestKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.url)
    }
}

/// A response snapshot: status, headers and body at time of capture
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    pub status: u16,
    pub headers: BTreeMap<String, String>,
    #[serde(with = "hex_body")]
    pub body: Vec<u8>,
    /// When this snapshot was taken
    pub captured_at: DateTime<Utc>,
}

impl Response {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            headers: BTreeMap::new(),
            body: body.into(),
            captured_at: Utc::now(),
        }
    }

    /// 200 OK with the given body
    pub fn ok(body: impl Into<Vec<u8>>) -> Self {
        Self::new(200, body)
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into().to_ascii_lowercase(), value.into());
        self
    }

    pub fn is_ok(&self) -> bool {
        self.status == 200
    }

    pub fn content_type(&self) -> Option<&str> {
        self.headers.get("content-type").map(String::as_str)
    }
}

/// Strip scheme and authority from a URL, leaving the path (and query)
pub fn url_path(url: &str) -> &str {
    let rest = match url.find("://") {
        Some(pos) => &url[pos + 3..],
        None => return url,
    };
    match rest.find('/') {
        Some(pos) => &rest[pos..],
        None => "/",
    }
}

mod hex_body {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(body: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(body))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        hex::decode(s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_drops_fragment() {
        let a = RequestKey::get("/index.html#pricing");
        let b = RequestKey::get("/index.html");
        assert_eq!(a, b);
    }

    #[test]
    fn key_keeps_query() {
        let a = RequestKey::get("/js/app.js?v=2");
        assert_eq!(a.url, "/js/app.js?v=2");
        assert_ne!(a, RequestKey::get("/js/app.js"));
    }

    #[test]
    fn key_ignores_origin() {
        let absolute = RequestKey::get("https://csi.example.com/css/style.css");
        assert_eq!(absolute, RequestKey::get("/css/style.css"));
        assert_eq!(absolute.url, "/css/style.css");

        let with_query = RequestKey::get("http://localhost:8080/js/app.js?v=2#top");
        assert_eq!(with_query.url, "/js/app.js?v=2");
        assert_eq!(RequestKey::get("https://csi.example.com").url, "/");
    }

    #[test]
    fn keys_sort_by_method_then_url() {
        let mut keys = vec![
            RequestKey::new(Method::Post, "/a"),
            RequestKey::get("/b"),
            RequestKey::get("/a"),
        ];
        keys.sort();
        assert_eq!(
            keys,
            vec![
                RequestKey::get("/a"),
                RequestKey::get("/b"),
                RequestKey::new(Method::Post, "/a"),
            ]
        );
    }

    #[test]
    fn key_distinguishes_method() {
        assert_ne!(
            RequestKey::new(Method::Post, "/form"),
            RequestKey::new(Method::Get, "/form")
        );
    }

    #[test]
    fn method_parse_and_display() {
        assert_eq!("post".parse::<Method>().unwrap(), Method::Post);
        assert_eq!(Method::Delete.to_string(), "DELETE");
        assert!("TRACE".parse::<Method>().is_err());
        assert!(Method::Get.is_cacheable());
        assert!(!Method::Head.is_cacheable());
    }

    #[test]
    fn url_path_strips_origin() {
        assert_eq!(url_path("https://example.com/api/items?x=1"), "/api/items?x=1");
        assert_eq!(url_path("https://example.com"), "/");
        assert_eq!(url_path("/css/style.css"), "/css/style.css");
    }

    #[test]
    fn response_json_encodes_body_as_hex() {
        let resp = Response::ok(b"hi".to_vec()).with_header("Content-Type", "text/plain");
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("\"6869\""));
        assert!(json.contains("content-type"));

        let parsed: Response = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, resp);
        assert_eq!(parsed.content_type(), Some("text/plain"));
    }

    #[test]
    fn navigation_request() {
        let req = Request::navigate("/crew-calculator.html");
        assert!(req.is_navigation());
        assert_eq!(req.method, Method::Get);
        assert!(!Request::get("/").is_navigation());
    }
}

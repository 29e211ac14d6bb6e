//! Request/response types shared by all transports.

use async_trait::async_trait;
use bytes::Bytes;
use serde::{de::DeserializeOwned, Serialize};
use std::collections::HashMap;
use std::time::Duration;

use crate::error::Result;

/// HTTP methods the download core actually issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

/// A fully described HTTP request.
///
/// Built fresh for every call; the core never mutates a shared request
/// template, so concurrent jobs under one credential cannot race on header
/// state.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: HashMap<String, String>,
    pub body: Option<Bytes>,
    pub timeout: Option<Duration>,
}

impl HttpRequest {
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: HashMap::new(),
            body: None,
            timeout: None,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new(HttpMethod::Post, url)
    }

    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Attach a JSON body and matching content type.
    pub fn json<T: Serialize>(mut self, body: &T) -> Result<Self> {
        let json = serde_json::to_vec(body)?;
        self.body = Some(Bytes::from(json));
        self.headers
            .insert("Content-Type".to_string(), "application/json".to_string());
        Ok(self)
    }

    pub fn body(mut self, body: Bytes) -> Self {
        self.body = Some(body);
        self
    }

    pub fn timeout(mut self, duration: Duration) -> Self {
        self.timeout = Some(duration);
        self
    }
}

/// Response with the body fully buffered.
///
/// Track payloads top out well under the lossless tier's catalogued maximum,
/// so buffering whole responses keeps the decryption engine a pure transform.
#[derive(Debug)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: Bytes,
}

impl HttpResponse {
    /// Parse the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_slice(&self.body)?)
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Permission-denied responses drive the retry policies in the pipeline.
    pub fn is_forbidden(&self) -> bool {
        self.status == 403
    }
}

/// Object-safe async HTTP client.
///
/// Implemented by [`crate::ReqwestHttpClient`] in production and by scripted
/// mocks in tests.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_builder_sets_header_and_body() {
        let req = HttpRequest::post("https://example.com/gw")
            .header("Cookie", "arl=abc")
            .body(Bytes::from_static(b"{}"));

        assert_eq!(req.method, HttpMethod::Post);
        assert_eq!(req.headers.get("Cookie").map(String::as_str), Some("arl=abc"));
        assert_eq!(req.body.as_deref(), Some(&b"{}"[..]));
    }

    #[test]
    fn json_body_sets_content_type() {
        #[derive(serde::Serialize)]
        struct Body {
            sng_id: String,
        }

        let req = HttpRequest::post("https://example.com/gw")
            .json(&Body {
                sng_id: "123".to_string(),
            })
            .unwrap();

        assert_eq!(
            req.headers.get("Content-Type").map(String::as_str),
            Some("application/json")
        );
        assert!(req.body.is_some());
    }

    #[test]
    fn response_status_helpers() {
        let ok = HttpResponse {
            status: 200,
            headers: HashMap::new(),
            body: Bytes::new(),
        };
        let forbidden = HttpResponse {
            status: 403,
            headers: HashMap::new(),
            body: Bytes::new(),
        };

        assert!(ok.is_success());
        assert!(!ok.is_forbidden());
        assert!(forbidden.is_forbidden());
        assert!(!forbidden.is_success());
    }
}

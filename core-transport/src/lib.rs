//! HTTP transport abstraction for the download core.
//!
//! Every network-facing crate in the workspace talks to the catalog gateway
//! and the media/artwork CDNs through the [`HttpClient`] trait so that tests
//! can substitute scripted transports. The default implementation is
//! [`ReqwestHttpClient`].

pub mod client;
pub mod error;
pub mod http;

pub use client::ReqwestHttpClient;
pub use error::{Result, TransportError};
pub use http::{HttpClient, HttpMethod, HttpRequest, HttpResponse};

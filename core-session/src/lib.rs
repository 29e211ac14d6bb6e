//! # Session Module
//!
//! Credential-to-token session management for the gateway API.
//!
//! ## Overview
//!
//! Every download runs on behalf of one registered credential. This module
//! registers credentials, performs the token bootstrap exchange, and exposes
//! a single typed entry point for gateway methods with bounded
//! re-authentication on token invalidation.

pub mod error;
pub mod manager;
pub mod types;

pub use error::{Result, SessionError};
pub use manager::{Session, SessionManager};
pub use types::{GwEnvelope, UserData, UserProfile, TOKEN_INVALID_KEY};

//! # atlas-api
//!
//! [`OrganizationApi`](atlas_core::OrganizationApi) implementation backed by
//! the HTTP organization API.
//!
//! Requests use JSON bodies and HTTP digest authentication with the root API
//! key pair. Error responses are classified by
//! [`atlas_core::classify_response`], transport failures become
//! `NetworkError`.

mod client;
pub mod digest;

pub use client::{AtlasClient, AtlasClientConfig, DEFAULT_BASE_URL};
pub use digest::DigestChallenge;

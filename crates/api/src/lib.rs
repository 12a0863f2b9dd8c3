//! HTTP API layer for koinonia.
//!
//! This crate provides the REST API:
//!
//! - **Endpoints**: events, RSVPs, invitations, following, blocking,
//!   notifications
//! - **Extractors**: bearer-token authentication
//! - **Middleware**: token resolution
//! - **SSE**: live engagement event stream
//!
//! Built on Axum 0.8.

pub mod endpoints;
pub mod extractors;
pub mod middleware;
pub mod response;
pub mod sse;

pub use endpoints::router;

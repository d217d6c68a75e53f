//! Detection service abstraction.
//!
//! The detection service owns the camera, the person detector, and the
//! face-recognition database. This module provides the traits the rest of
//! the crate consumes it through, plus an HTTP implementation.

mod http;
mod types;

pub use http::HttpDetectorClient;
pub use types::*;

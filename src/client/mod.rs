//! Client Module
//!
//! HTTP transport shared by providers and REST collaborators.

pub mod http;

pub use http::{header_map, Auth, HttpClient};

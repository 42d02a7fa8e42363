//! Network utilities for HTTP operations against Plex.

mod client;

pub use client::{strip_query, HttpClient};

//! Plex Media Server implementation of the catalog.

mod account;
mod client;
mod models;

pub use account::PlexConnector;
pub use client::{edit_params, search_type, PlexClient};

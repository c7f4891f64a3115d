// Upstream module - HTTP access to the calculator API

pub mod client;

pub use client::{UpstreamClient, UpstreamResponse};

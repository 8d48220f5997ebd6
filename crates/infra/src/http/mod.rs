//! HTTP plumbing for remote adapters

pub mod client;

pub use client::{HttpClient, HttpClientBuilder};

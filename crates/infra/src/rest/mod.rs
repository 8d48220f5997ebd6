//! PostgREST adapter

pub mod client;
mod rows;

pub use client::RestPipelineStore;

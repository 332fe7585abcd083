//! Network access for index builds.
//!
//! This crate provides:
//! - [`FetchQueue`] — bounded concurrency with per-origin FIFO serialization
//! - [`OriginResolver`] — host folding into logical origins
//! - [`Fetcher`] — reqwest client bound to the queue, with a response cache

pub mod client;
pub mod origin;
pub mod queue;

pub use client::Fetcher;
pub use origin::OriginResolver;
pub use queue::FetchQueue;

//! oget-s3: S3 backend for oget
//!
//! Implements [`oget_core::ObjectStore`] on top of aws-sdk-s3, including
//! SSE-C request headers and retry of the request phase.

mod client;

pub use client::S3Client;

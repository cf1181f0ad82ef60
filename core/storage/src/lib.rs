//! Storage client contract for S3-compatible object stores.
//!
//! The tree engine and the platforms never talk to the wire protocol
//! directly. They go through the narrow [`StorageClient`] trait:
//! list, put, delete and a header-only status probe.
//!
//! # Design Principles
//! - One client per request, built from a [`ClientConfig`] by a [`ClientFactory`]
//! - No retries and no timeouts of its own
//! - Transport failures carry the provider's HTTP status when known

pub mod client;
pub mod memory;
pub mod s3;

pub use client::{ClientConfig, ClientFactory, ListQuery, StorageClient};
pub use memory::{Call, MemoryClient, MemoryClientFactory};
pub use s3::{S3Client, S3ClientFactory};

//! Storage platforms for mediabucket.
//!
//! Each platform wraps one S3-compatible provider: how its client is
//! configured, how public URLs look and how keys are recovered from them.

pub mod descriptor;
pub mod fields;
pub mod platform;
pub mod providers;
pub mod query;
pub mod registry;

pub use descriptor::{FieldKind, FieldScope, FieldSpec, ProviderDescriptor};
pub use fields::{Field, PlatformFields};
pub use platform::{ListingRequest, Platform};
pub use providers::{AwsS3, BackblazeB2, CloudflareR2, DigitalOceanSpaces};
pub use query::{FullBucket, PrefixScoped, QueryMode, QueryShaper};
pub use registry::{create_default_registry, factory_of, PlatformFactory, PlatformRegistry};

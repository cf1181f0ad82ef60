//! Platform registry for resolving providers by name or URL.

use std::sync::Arc;

use crate::descriptor::ProviderDescriptor;
use crate::fields::PlatformFields;
use crate::platform::Platform;
use crate::providers::{AwsS3, BackblazeB2, CloudflareR2, DigitalOceanSpaces};
use mediabucket_common::{Error, Result};

/// Factory function type for creating platforms.
pub type PlatformFactory = Box<dyn Fn(PlatformFields) -> Arc<dyn Platform> + Send + Sync>;

/// Wrap a platform constructor as a factory.
pub fn factory_of<P: Platform + 'static>(make: fn(PlatformFields) -> P) -> PlatformFactory {
    Box::new(move |fields| -> Arc<dyn Platform> { Arc::new(make(fields)) })
}

/// Registry of platform factories.
///
/// Keeps registration order, which is also the order in which URLs are
/// matched against platforms.
pub struct PlatformRegistry {
    entries: Vec<(&'static ProviderDescriptor, PlatformFactory)>,
}

impl PlatformRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Register a platform factory.
    ///
    /// # Preconditions
    /// - `descriptor.name` must be unique within the registry
    ///
    /// # Errors
    /// - Returns error if the name is already registered
    pub fn register(
        &mut self,
        descriptor: &'static ProviderDescriptor,
        factory: PlatformFactory,
    ) -> Result<()> {
        if self.has_platform(descriptor.name) {
            return Err(Error::InvalidInput(format!(
                "Platform '{}' is already registered",
                descriptor.name
            )));
        }
        self.entries.push((descriptor, factory));
        Ok(())
    }

    /// Metadata of a registered platform.
    ///
    /// # Errors
    /// - `Error::NotFound` if no platform has this name
    pub fn descriptor(&self, name: &str) -> Result<&'static ProviderDescriptor> {
        self.entries
            .iter()
            .find(|(d, _)| d.name == name)
            .map(|(d, _)| *d)
            .ok_or_else(|| Error::NotFound(format!("Platform '{}' is not registered", name)))
    }

    /// Create a platform bound to `fields`.
    ///
    /// # Errors
    /// - `Error::NotFound` if no platform has this name
    pub fn resolve(&self, name: &str, fields: PlatformFields) -> Result<Arc<dyn Platform>> {
        let (_, factory) = self
            .entries
            .iter()
            .find(|(d, _)| d.name == name)
            .ok_or_else(|| Error::NotFound(format!("Platform '{}' is not registered", name)))?;
        Ok(factory(fields))
    }

    /// Name of the first platform that accepts `url`.
    ///
    /// Matching only looks at the URL shape, so no fields are needed.
    pub fn platform_for_url(&self, url: &str) -> Option<&'static str> {
        self.entries
            .iter()
            .find(|(_, factory)| factory(PlatformFields::new()).is_url_compatible(url))
            .map(|(d, _)| d.name)
    }

    /// Registered names, in registration order.
    pub fn platforms(&self) -> Vec<&'static str> {
        self.entries.iter().map(|(d, _)| d.name).collect()
    }

    pub fn descriptors(&self) -> impl Iterator<Item = &'static ProviderDescriptor> + '_ {
        self.entries.iter().map(|(d, _)| *d)
    }

    pub fn has_platform(&self, name: &str) -> bool {
        self.entries.iter().any(|(d, _)| d.name == name)
    }
}

impl Default for PlatformRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Create a registry with the four built-in platforms.
pub fn create_default_registry() -> PlatformRegistry {
    let builtins: [(&'static ProviderDescriptor, PlatformFactory); 4] = [
        (AwsS3::describe(), factory_of(AwsS3::new)),
        (DigitalOceanSpaces::describe(), factory_of(DigitalOceanSpaces::new)),
        (CloudflareR2::describe(), factory_of(CloudflareR2::new)),
        (BackblazeB2::describe(), factory_of(BackblazeB2::new)),
    ];

    PlatformRegistry {
        entries: builtins.into_iter().collect(),
    }
}

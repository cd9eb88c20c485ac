//! Secret aggregation.
//!
//! Resolves every requested locator, in order, and merges the results into a
//! single namespace. Later locators override earlier ones.

use std::time::Instant;

use crate::core::observe::{Event, Observer};
use crate::core::provider::SecretSource;
use crate::core::types::{ProviderLocator, SecretMap};
use crate::core::validation::validate_secrets;
use crate::error::Result;

/// Resolve all locators and merge their secrets.
///
/// Locators are resolved sequentially in the order given. The first failing
/// provider aborts the whole resolution and its error is returned; nothing
/// from earlier providers is kept. A key already set by an earlier locator is
/// overwritten and reported once as [`Event::SecretCollision`]. Entries the OS
/// cannot carry in an environment are rejected.
///
/// # Errors
///
/// Returns the first provider error.
pub fn resolve_all(
    source: &dyn SecretSource,
    locators: &[ProviderLocator],
    observer: &dyn Observer,
) -> Result<SecretMap> {
    let mut merged = SecretMap::new();

    for locator in locators {
        let start = Instant::now();
        let secrets = source.resolve(locator)?;
        validate_secrets(locator, &secrets)?;
        observer.observe(Event::SecretsFetched {
            locator: locator.clone(),
            keys: secrets.len(),
            elapsed: start.elapsed(),
        });

        for (key, value) in secrets {
            if merged.insert(key.clone(), value).is_some() {
                observer.observe(Event::SecretCollision {
                    key,
                    locator: locator.clone(),
                });
            }
        }
    }

    Ok(merged)
}

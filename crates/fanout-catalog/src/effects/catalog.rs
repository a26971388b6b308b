use std::future::Future;

use crate::data::{CatalogEntry, Locator};
use crate::error::Result;

/// Resolves a catalog link into the covers it references.
pub trait Catalog: Send + Sync {
    /// Entries in catalog order, paginated internally. May contain the same
    /// cover more than once; callers deduplicate.
    fn resolve(&self, locator: &Locator) -> impl Future<Output = Result<Vec<CatalogEntry>>> + Send;
}

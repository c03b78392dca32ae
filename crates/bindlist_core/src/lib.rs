//! Core of the bindlist toolkit: identity-preserving, incrementally
//! reconciled collections for bound UI lists.

pub mod collection;
pub mod logging;
pub mod snapshot;

pub use collection::change::{CollectionChange, Subscription};
pub use collection::error::{CollectionError, CollectionResult};
pub use collection::grouped::{GroupedCollection, GroupedReport, ListGroup};
pub use collection::orderable::Orderable;
pub use collection::policy::{IdentityComparer, Identified, MergeFn, ReconcilePolicy};
pub use collection::reconciling::{ReconcileReport, ReconcilingCollection};
pub use logging::{default_log_level, init_logging, logging_status};
pub use snapshot::decode_snapshot;

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}

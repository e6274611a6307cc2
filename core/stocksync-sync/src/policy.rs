//! Protected-collection policy.
//!
//! Master/reference collections may only have their remote container created
//! or overwritten by a trusted device. Every device may still fetch and merge
//! them locally.

use crate::error::{SyncError, SyncResult};
use std::collections::BTreeSet;

/// Collections protected when the configuration does not say otherwise.
pub const DEFAULT_PROTECTED_COLLECTIONS: &[&str] = &["products", "users"];

/// Decides whether this device may push a collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtectedCollectionPolicy {
    protected: BTreeSet<String>,
    trusted_device: bool,
}

impl ProtectedCollectionPolicy {
    /// Creates a policy over `protected` for a device with the given trust.
    pub fn new<I, S>(protected: I, trusted_device: bool) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            protected: protected.into_iter().map(Into::into).collect(),
            trusted_device,
        }
    }

    /// Returns true if `endpoint` is a protected collection.
    pub fn is_protected(&self, endpoint: &str) -> bool {
        self.protected.contains(endpoint)
    }

    /// Returns true if this device is trusted.
    pub fn is_trusted_device(&self) -> bool {
        self.trusted_device
    }

    /// Returns true if this device may create or overwrite `endpoint` remotely.
    pub fn may_overwrite(&self, endpoint: &str) -> bool {
        self.trusted_device || !self.is_protected(endpoint)
    }

    /// Like [`may_overwrite`](Self::may_overwrite), as a `PolicyDenied` error.
    pub fn check_overwrite(&self, endpoint: &str) -> SyncResult<()> {
        if self.may_overwrite(endpoint) {
            Ok(())
        } else {
            Err(SyncError::PolicyDenied {
                reason: format!("'{endpoint}' is protected and this device is not trusted"),
            })
        }
    }

    /// The protected collection names, sorted.
    pub fn protected_collections(&self) -> impl Iterator<Item = &str> {
        self.protected.iter().map(String::as_str)
    }
}

impl Default for ProtectedCollectionPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_PROTECTED_COLLECTIONS.iter().copied(), false)
    }
}

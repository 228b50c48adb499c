//! # Serialization State
//!
//! Per-pass visitation state for the flattener.
//!
//! An object is "flattened" when the flattener must not expand it again as a
//! related object. The state belongs to one flatten pass and is dropped with
//! it, so nothing leaks between passes and objects carry no flag of their own.

use crate::ObjectId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// What happens when one object is reachable along several acyclic paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SharedReferences {
    /// Inline the object at every position. Only objects on the current
    /// expansion path count as flattened, so only true cycles are cut.
    #[default]
    Inline,

    /// Inline the object the first time it is reached and omit it afterwards.
    FirstOnly,
}

/// Visitation state of a single flatten pass.
#[derive(Debug, Clone, Default)]
pub struct SerializationState {
    policy: SharedReferences,

    /// Objects currently being expanded (the recursion path).
    expanding: BTreeSet<ObjectId>,

    /// Objects whose expansion has completed in this pass.
    emitted: BTreeSet<ObjectId>,

    /// Objects explicitly marked flattened by the caller.
    opaque: BTreeSet<ObjectId>,

    /// Expansions started in this pass, repeats included.
    expansions: usize,
}

impl SerializationState {
    /// Create a fresh state for one pass.
    #[must_use]
    pub fn new(policy: SharedReferences) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    /// The shared-reference policy of this pass.
    #[must_use]
    pub fn policy(&self) -> SharedReferences {
        self.policy
    }

    /// Whether `object` must be skipped when reached through a relationship.
    #[must_use]
    pub fn is_flattened(&self, object: ObjectId) -> bool {
        self.expanding.contains(&object)
            || self.opaque.contains(&object)
            || (self.policy == SharedReferences::FirstOnly && self.emitted.contains(&object))
    }

    /// Explicitly mark an object as flattened (opaque) or clear that mark.
    ///
    /// Clearing also forgets that the object was emitted earlier in the pass.
    /// It never releases an object that is on the current expansion path.
    pub fn set_flattened(&mut self, object: ObjectId, flattened: bool) {
        if flattened {
            self.opaque.insert(object);
        } else {
            self.opaque.remove(&object);
            self.emitted.remove(&object);
        }
    }

    /// Number of objects expanded so far in this pass.
    #[must_use]
    pub fn emitted_count(&self) -> usize {
        self.emitted.len()
    }

    /// Number of expansions started so far, counting each inlined copy of a
    /// shared object.
    #[must_use]
    pub fn expansion_count(&self) -> usize {
        self.expansions
    }

    /// Claim `object` at the start of its expansion.
    pub(crate) fn begin(&mut self, object: ObjectId) {
        self.expanding.insert(object);
        self.expansions = self.expansions.saturating_add(1);
    }

    /// Release `object` at the end of its expansion.
    pub(crate) fn finish(&mut self, object: ObjectId) {
        self.expanding.remove(&object);
        self.emitted.insert(object);
    }
}

// =============================================================================
// TESTS
// =============================================================================

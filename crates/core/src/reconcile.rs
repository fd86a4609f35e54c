//! Reconciliation Planning
//!
//! Computes the create/delete plan that converts the remote state of a keyed
//! collection into the state a form now specifies, carrying remote-owned
//! fields forward for every record whose identity survives the edit. The
//! planner is a pure function over two input sets and performs no I/O.

use std::hash::Hash;

use rustc_hash::FxHashSet;

/// A record that can be reconciled against its remote counterpart.
pub trait Reconcilable: Clone {
    /// Identity key. Two records with equal keys are the same entity.
    type Key: Eq + Hash + Clone;

    /// Remote store identifier carried by persisted records.
    type RemoteId: Copy;

    /// The record's identity key.
    fn key(&self) -> Self::Key;

    /// The remote identifier, absent for records not yet persisted.
    fn remote_id(&self) -> Option<Self::RemoteId>;

    /// The create-form of a desired record: identity preserved, remote-owned
    /// fields at their creation defaults, no remote id.
    #[must_use]
    fn materialize(&self) -> Self;
}

/// The computed buckets for one edit session.
///
/// Every key present in either input set is classified exactly once. The
/// plan is computed once per edit and applied as a whole; it is never
/// partially applied by the planner's callers.
#[derive(Debug, Clone)]
pub struct ReconciliationPlan<R: Reconcilable> {
    /// Records to create, with remote-owned fields at creation defaults.
    pub to_create: Vec<R>,
    /// Remote identifiers to delete.
    pub to_delete: Vec<R::RemoteId>,
    /// Remote records whose identity survives the edit, carried forward
    /// unchanged.
    pub to_keep: Vec<R>,
}

impl<R: Reconcilable> ReconciliationPlan<R> {
    /// True when applying the plan would issue no remote call.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.to_create.is_empty() && self.to_delete.is_empty()
    }

    /// Total number of classified entries across all three buckets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.to_create.len() + self.to_delete.len() + self.to_keep.len()
    }

    /// True when both input sets were empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Plan the remote calls that turn `remote` into `desired`.
///
/// `remote` is the authoritative set fetched immediately before planning;
/// `desired` is the set implied by the current form state. Deletes and keeps
/// follow remote order, creates follow desired order, so identical inputs
/// always yield an identical plan. Duplicate desired keys collapse to one
/// create. A remote record with no remote id has nothing to delete remotely
/// and contributes no delete operation.
pub fn reconcile<R: Reconcilable>(remote: &[R], desired: &[R]) -> ReconciliationPlan<R> {
    let remote_keys: FxHashSet<R::Key> = remote.iter().map(Reconcilable::key).collect();
    let desired_keys: FxHashSet<R::Key> = desired.iter().map(Reconcilable::key).collect();

    let mut to_delete = Vec::new();
    let mut to_keep = Vec::new();

    for record in remote {
        if desired_keys.contains(&record.key()) {
            to_keep.push(record.clone());
        } else if let Some(id) = record.remote_id() {
            to_delete.push(id);
        }
    }

    let mut to_create = Vec::new();
    let mut created = FxHashSet::default();

    for record in desired {
        let key = record.key();

        if !remote_keys.contains(&key) && created.insert(key) {
            to_create.push(record.materialize());
        }
    }

    ReconciliationPlan {
        to_create,
        to_delete,
        to_keep,
    }
}

//! Value Snapshots
//!
//! Four per-field snapshots drive the whole synchronization story:
//!
//! * `current` - the value the rest of the client sees right now
//! * `base`    - `current` as of the last completed save (or initial load)
//! * `draft`   - unsaved edits made in an open settings dialog
//! * `sent`    - values shipped in the save transaction still in flight
//!
//! Everything the engine reports (what is dirty, what another session
//! changed under us, how a finished transaction went) is a pure set
//! computation over these snapshots. A field absent from a map means "no
//! opinion", never "set to null".

use std::collections::BTreeSet;

use serde_json::Value;

use super::defaults::FieldValues;

/// The four per-field snapshots for one settings scope.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValueSnapshots {
    pub current: FieldValues,
    pub base: FieldValues,
    pub draft: FieldValues,
    pub sent: FieldValues,
}

impl ValueSnapshots {
    /// Start from a freshly loaded state: nothing edited, nothing in flight.
    /// `draft` only ever holds fields the user touched, so an empty draft
    /// means "no dialog edits" rather than "everything reset".
    pub fn new(current: FieldValues) -> Self {
        Self {
            base: current.clone(),
            draft: FieldValues::new(),
            sent: FieldValues::new(),
            current,
        }
    }

    /// Record a draft edit. Setting a field back to its current value still
    /// counts as "no pending change" because [`pending_fields`] compares
    /// values, not writes.
    ///
    /// [`pending_fields`]: Self::pending_fields
    pub fn set_draft(&mut self, field: &str, value: Value) {
        self.draft.insert(field.to_string(), value);
    }

    /// Discard all draft edits, reverting the dialog to `current`.
    pub fn cancel_edits(&mut self) {
        self.draft.clear();
    }

    /// Fields whose draft value differs from `current`. Fields the draft
    /// does not define are never pending.
    pub fn pending_fields(&self) -> BTreeSet<String> {
        self.draft
            .iter()
            .filter(|&(field, value)| self.current.get(field) != Some(value))
            .map(|(field, _)| field.clone())
            .collect()
    }

    /// True when at least one draft edit is unsaved.
    pub fn is_dirty(&self) -> bool {
        self.draft
            .iter()
            .any(|(field, value)| self.current.get(field) != Some(value))
    }

    /// The subset of the draft worth saving, as field/value pairs.
    pub fn pending_payload(&self) -> FieldValues {
        self.draft
            .iter()
            .filter(|&(field, value)| self.current.get(field) != Some(value))
            .map(|(field, value)| (field.clone(), value.clone()))
            .collect()
    }

    /// Fields another session changed that this session cares about:
    /// `current` moved away from `base` AND the new value matches neither
    /// the local draft nor what we just sent ourselves.
    pub fn conflicting_fields(&self) -> BTreeSet<String> {
        self.base
            .iter()
            .filter(|&(field, base_value)| {
                let current = self.current.get(field);
                if current == Some(base_value) {
                    return false;
                }
                current != self.draft.get(field) && current != self.sent.get(field)
            })
            .map(|(field, _)| field.clone())
            .collect()
    }

    /// Sent fields the store update confirmed: `current` now equals what we
    /// sent.
    pub fn changed_in_update(&self) -> BTreeSet<String> {
        self.sent
            .iter()
            .filter(|&(field, sent_value)| self.current.get(field) == Some(sent_value))
            .map(|(field, _)| field.clone())
            .collect()
    }

    /// Sent fields the store update did NOT confirm.
    pub fn still_pending(&self) -> BTreeSet<String> {
        self.sent
            .iter()
            .filter(|&(field, sent_value)| self.current.get(field) != Some(sent_value))
            .map(|(field, _)| field.clone())
            .collect()
    }

    /// Replace `current` with a store update. `base`, `draft` and `sent`
    /// are left alone so the derived sets can be computed against the new
    /// state before any reset.
    pub fn apply_store_update(&mut self, current: FieldValues) {
        self.current = current;
    }

    /// A field was committed outside any transaction (local-only fields, or
    /// a remote save that turned out to equal `current`).
    pub fn commit_field(&mut self, field: &str, value: Value) {
        self.current.insert(field.to_string(), value.clone());
        self.base.insert(field.to_string(), value);
    }

    /// Stamp the payload of a newly opened transaction.
    pub fn record_sent(&mut self, payload: &FieldValues) {
        self.sent = payload.clone();
    }

    /// Close the books after a transaction result arrived: the new `current`
    /// becomes the comparison base and nothing is in flight any more.
    pub fn reset_after_transaction(&mut self) {
        self.base = self.current.clone();
        self.sent = FieldValues::new();
    }
}

//! # User Options Synchronization
//!
//! Everything around persisted user settings: the field model, client-side
//! defaults, the stored-blob merge, the four-snapshot dirty/conflict
//! tracking, and the engine that drives save transactions end to end.
//!
//! Features:
//! - Draft edits tracked per field, save only ships what actually changed
//! - Partial updates merged into the stored blob so unknown keys survive
//! - One save transaction at a time, classified from the next store update
//! - Conflict warnings when another session changes fields under an open
//!   dialog
//! - SSH key saved through its dedicated id-bearing resource

pub mod defaults;
pub mod engine;
pub mod fields;
pub mod merge;
pub mod snapshots;

pub use defaults::{
    apply_server_options, global_defaults, initial_options, vm_defaults, FieldValues,
};
pub use engine::{
    SaveOutcome, SettingsBackend, SettingsScope, SettingsSyncEngine, SyncEvent, Transaction,
};
pub use fields::{field_kind, FieldKind};
pub use merge::merge;
pub use snapshots::ValueSnapshots;

//! Option Field Model
//!
//! Canonical names of the user-editable configuration fields and how each of
//! them is persisted. Field values are untyped `serde_json::Value`s - the
//! backend stores them double-encoded as opaque strings anyway, so the
//! engine only ever needs equality, not structure. The two scheduler-facing
//! fields additionally get typed accessors here, constrained to the choices
//! the settings UI offers.

use serde_json::{Map, Value};

/// Preferred UI language (also mirrored to client storage so the login
/// screen is translated before user options load).
pub const LANGUAGE: &str = "language";
/// The user's public SSH key, persisted through a dedicated id-bearing
/// backend resource.
pub const SSH_KEY: &str = "sshKey";
/// Background refresh interval in seconds.
pub const UPDATE_RATE: &str = "updateRate";
/// Master toggle for notifications.
pub const SHOW_NOTIFICATIONS: &str = "showNotifications";
/// When a snooze ends, as epoch seconds.
pub const NOTIFICATIONS_RESUME_TIME: &str = "notificationsResumeTime";
/// Snooze duration choice, in minutes.
pub const DONT_DISTURB_FOR: &str = "dontDisturbFor";
/// Opt-in to preview features.
pub const PREVIEW: &str = "preview";

// per-VM settings
pub const DISPLAY_UNSAVED_WARNINGS: &str = "displayUnsavedWarnings";
pub const CONFIRM_FORCE_SHUTDOWN: &str = "confirmForceShutdown";
pub const CONFIRM_VM_DELETING: &str = "confirmVmDeleting";
pub const CONFIRM_VM_SUSPENDING: &str = "confirmVmSuspending";
pub const FULL_SCREEN_MODE: &str = "fullScreenMode";
pub const CTRL_ALT_DEL: &str = "ctrlAltDel";
pub const SMARTCARD: &str = "smartcard";
pub const AUTO_CONNECT: &str = "autoConnect";

/// Refresh intervals offered by the settings UI, in seconds.
pub const UPDATE_RATE_CHOICES: [u64; 4] = [30, 60, 120, 300];

/// Snooze durations offered by the settings UI, in minutes.
pub const DONT_DISTURB_CHOICES: [u64; 4] = [5, 15, 30, 60];

/// Refresh interval to schedule from the stored options, in seconds.
///
/// Only values the settings UI offers are honored; anything else (missing,
/// wrong type, tampered) falls back to the deployment default.
pub fn update_rate_seconds(options: &Map<String, Value>, fallback: u64) -> u64 {
    options
        .get(UPDATE_RATE)
        .and_then(Value::as_u64)
        .filter(|secs| UPDATE_RATE_CHOICES.contains(secs))
        .unwrap_or(fallback)
}

/// Snooze duration to apply on "don't disturb", in minutes: the stored
/// choice, or the shortest offered one when the user never picked any.
pub fn dont_disturb_minutes(options: &Map<String, Value>) -> u64 {
    options
        .get(DONT_DISTURB_FOR)
        .and_then(Value::as_u64)
        .filter(|minutes| DONT_DISTURB_CHOICES.contains(minutes))
        .unwrap_or(DONT_DISTURB_CHOICES[0])
}

/// How a field is persisted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Stored in the backend user-options blob, merged with fields the
    /// client does not understand
    Remote,
    /// Client storage only; committed immediately, never part of a save
    /// transaction
    LocalOnly,
    /// Saved through a separate id-bearing subroutine (the SSH key)
    Composite,
}

/// Persistence kind of a field by its canonical name.
pub fn field_kind(name: &str) -> FieldKind {
    match name {
        SSH_KEY => FieldKind::Composite,
        _ => FieldKind::Remote,
    }
}

/// Fields whose saved value is additionally mirrored to client storage.
pub const LOCALLY_MIRRORED: [&str; 1] = [LANGUAGE];

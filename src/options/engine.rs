//! Settings Synchronization Engine
//!
//! Owns the save lifecycle for one settings scope (the account-wide dialog
//! or a set of per-VM dialogs):
//!
//! * collects draft edits and decides what is actually worth saving,
//! * persists through a [`SettingsBackend`], merging into the stored blob so
//!   fields this client does not understand survive,
//! * tracks one save transaction at a time and classifies its result from
//!   the next store update,
//! * flags fields another session changed underneath the open dialog.
//!
//! The engine is deliberately single-threaded state behind `&mut self`; the
//! host decides how to share it (the app holds one per open dialog).

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::Utc;
use futures_util::future::BoxFuture;
use serde_json::Value;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::PersistError;

use super::defaults::FieldValues;
use super::fields::{self, FieldKind};
use super::merge::merge;
use super::snapshots::ValueSnapshots;

/// Which part of the options blob a dialog edits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingsScope {
    /// Account-wide settings, stored under `global`.
    Global,
    /// Settings for one or more VMs; a multi-select dialog writes the same
    /// values to every listed VM.
    Vms { ids: Vec<String> },
}

impl SettingsScope {
    /// Paths inside the stored blob this scope merges into.
    pub fn paths(&self) -> Vec<Vec<String>> {
        match self {
            Self::Global => vec![vec!["global".to_string()]],
            Self::Vms { ids } => ids
                .iter()
                .map(|id| vec!["vms".to_string(), id.clone()])
                .collect(),
        }
    }
}

/// Where the engine persists to. One implementation talks to the REST API
/// and browser-equivalent client storage; tests plug in recorders.
pub trait SettingsBackend: Send + Sync {
    /// Write the merged options blob for the given scope. `transaction` is
    /// the id the resulting store update must be attributed to.
    fn persist_options(
        &self,
        scope: &SettingsScope,
        blob: Value,
        transaction: Uuid,
    ) -> BoxFuture<'static, Result<(), PersistError>>;

    /// Save the user's SSH key through its dedicated resource. `key_id` is
    /// the id of the existing key, if one was ever stored; a newly created
    /// key's id comes back in the result.
    fn persist_ssh_key(
        &self,
        key_id: Option<String>,
        key: Value,
        transaction: Uuid,
    ) -> BoxFuture<'static, Result<Option<String>, PersistError>>;

    /// Mirror a field to client-side storage. Optional; defaults to a no-op
    /// for backends with nothing local to write.
    fn store_local(&self, field: String, value: Value) -> BoxFuture<'static, Result<(), PersistError>> {
        let _ = (field, value);
        Box::pin(async { Ok(()) })
    }
}

/// One in-flight save: its correlation id and the fields it shipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    pub id: Uuid,
    pub fields: BTreeSet<String>,
}

/// How a finished save transaction went.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    /// Every sent field was confirmed by the store update.
    FullSuccess,
    /// Some fields landed, `not_saved` did not.
    PartialSuccess { not_saved: Vec<String> },
    /// Nothing landed.
    CompleteFailure,
}

/// What the engine tells the host about. `occurred_at` is an RFC 3339
/// timestamp for the notification feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    SaveResult {
        transaction: Transaction,
        outcome: SaveOutcome,
        occurred_at: String,
    },
    /// Fields changed by another session while this one had opinions about
    /// them.
    ConflictWarning {
        fields: Vec<String>,
        occurred_at: String,
    },
}

/// Draft collection, persistence and transaction tracking for one scope.
pub struct SettingsSyncEngine {
    scope: SettingsScope,
    snapshots: ValueSnapshots,
    /// The stored options blob as last fetched or successfully written;
    /// saves merge into this so unknown keys round-trip.
    backing: Value,
    defaults: Option<FieldValues>,
    ssh_key_id: Option<String>,
    open_transaction: Option<Transaction>,
    backend: Arc<dyn SettingsBackend>,
    classify: fn(&str) -> FieldKind,
}

impl SettingsSyncEngine {
    pub fn new(
        scope: SettingsScope,
        current: FieldValues,
        backing: Value,
        defaults: Option<FieldValues>,
        backend: Arc<dyn SettingsBackend>,
    ) -> Self {
        Self {
            scope,
            snapshots: ValueSnapshots::new(current),
            backing,
            defaults,
            ssh_key_id: None,
            open_transaction: None,
            backend,
            classify: fields::field_kind,
        }
    }

    /// Override how fields are classified. Tests use this to exercise the
    /// local-only path without inventing real field names.
    pub fn with_classifier(mut self, classify: fn(&str) -> FieldKind) -> Self {
        self.classify = classify;
        self
    }

    pub fn set_ssh_key_id(&mut self, id: Option<String>) {
        self.ssh_key_id = id;
    }

    pub fn ssh_key_id(&self) -> Option<&str> {
        self.ssh_key_id.as_deref()
    }

    /// Record a draft edit from the dialog.
    pub fn set_draft(&mut self, field: &str, value: Value) {
        self.snapshots.set_draft(field, value);
    }

    /// Throw away all draft edits.
    pub fn cancel_edits(&mut self) {
        self.snapshots.cancel_edits();
    }

    /// True when a draft edit differs from the current value.
    pub fn is_dirty(&self) -> bool {
        self.snapshots.is_dirty()
    }

    /// The dialog's save button: enabled when there is something to save and
    /// no save already running.
    pub fn save_enabled(&self) -> bool {
        self.open_transaction.is_none() && self.snapshots.is_dirty()
    }

    pub fn pending_fields(&self) -> BTreeSet<String> {
        self.snapshots.pending_fields()
    }

    pub fn open_transaction(&self) -> Option<&Transaction> {
        self.open_transaction.as_ref()
    }

    pub fn current_values(&self) -> &FieldValues {
        &self.snapshots.current
    }

    /// Refresh the stored blob after an out-of-band fetch.
    pub fn note_stored_options(&mut self, blob: Value) {
        self.backing = blob;
    }

    /// Persist all pending draft edits.
    ///
    /// Local-only fields commit immediately and never join a transaction.
    /// Remote fields are merged into the stored blob; when the merge changes
    /// nothing the server already agrees, so those fields commit locally
    /// without a write. Whatever actually needs the backend is shipped under
    /// a fresh transaction id, which the host passes back through
    /// [`on_store_update`] once the resulting state lands.
    ///
    /// Returns `Ok(None)` when nothing needed the backend. Errors only when
    /// no part of the save reached the backend at all; a partial dispatch
    /// failure keeps the transaction open for the branches that did.
    ///
    /// [`on_store_update`]: Self::on_store_update
    pub async fn save(&mut self) -> Result<Option<Transaction>, PersistError> {
        if let Some(txn) = &self.open_transaction {
            warn!(transaction = %txn.id, "save requested while one is in flight, ignoring");
            return Ok(None);
        }

        let payload = self.snapshots.pending_payload();
        if payload.is_empty() {
            debug!("nothing to save");
            return Ok(None);
        }

        let mut remote = FieldValues::new();
        let mut local = FieldValues::new();
        let mut ssh_key = None;
        for (field, value) in payload {
            match (self.classify)(&field) {
                FieldKind::Remote => {
                    remote.insert(field, value);
                }
                FieldKind::LocalOnly => {
                    local.insert(field, value);
                }
                FieldKind::Composite => ssh_key = Some(value),
            }
        }

        for (field, value) in &local {
            match self.backend.store_local(field.clone(), value.clone()).await {
                Ok(()) => self.snapshots.commit_field(field, value.clone()),
                Err(err) => warn!(field = %field, error = %err, "client storage write failed"),
            }
        }

        let mut txn_payload = FieldValues::new();
        let mut merged_blob = None;
        if !remote.is_empty() {
            let merged = merge(&self.backing, &self.scope.paths(), self.defaults.as_ref(), &remote);
            if merged == self.backing {
                debug!("stored options already hold these values, skipping write");
                for (field, value) in &remote {
                    self.snapshots.commit_field(field, value.clone());
                }
            } else {
                txn_payload.extend(remote.clone());
                merged_blob = Some(merged);
            }
        }
        if let Some(value) = &ssh_key {
            txn_payload.insert(fields::SSH_KEY.to_string(), value.clone());
        }
        if txn_payload.is_empty() {
            return Ok(None);
        }

        let transaction = Transaction {
            id: Uuid::new_v4(),
            fields: txn_payload.keys().cloned().collect(),
        };
        info!(transaction = %transaction.id, fields = ?transaction.fields, "saving user options");
        self.snapshots.record_sent(&txn_payload);
        self.open_transaction = Some(transaction.clone());

        let mut failures: Vec<PersistError> = Vec::new();
        let mut succeeded = false;

        if let Some(key) = ssh_key {
            match self
                .backend
                .persist_ssh_key(self.ssh_key_id.clone(), key, transaction.id)
                .await
            {
                Ok(new_id) => {
                    succeeded = true;
                    if new_id.is_some() {
                        self.ssh_key_id = new_id;
                    }
                }
                Err(err) => {
                    warn!(error = %err, "ssh key save failed");
                    failures.push(err);
                }
            }
        }

        if let Some(merged) = merged_blob {
            match self
                .backend
                .persist_options(&self.scope, merged.clone(), transaction.id)
                .await
            {
                Ok(()) => {
                    succeeded = true;
                    self.backing = merged;
                    for field in fields::LOCALLY_MIRRORED {
                        if let Some(value) = remote.get(field) {
                            if let Err(err) =
                                self.backend.store_local(field.to_string(), value.clone()).await
                            {
                                warn!(field, error = %err, "mirror to client storage failed");
                            }
                        }
                    }
                }
                Err(err) => {
                    warn!(error = %err, "options save failed");
                    failures.push(err);
                }
            }
        }

        if !succeeded {
            // no store update will ever answer this transaction
            self.open_transaction = None;
            self.snapshots.reset_after_transaction();
            let err = failures
                .into_iter()
                .next()
                .unwrap_or_else(|| PersistError::new("save dispatched nothing"));
            return Err(err);
        }
        if !failures.is_empty() {
            warn!(transaction = %transaction.id, "only part of the save reached the backend");
        }
        Ok(Some(transaction))
    }

    /// Feed the next store update into the engine.
    ///
    /// `current` is the freshly loaded value set for this scope and
    /// `transaction_id` the save it answers, if any. When the id matches the
    /// open transaction, the update settles it: sent fields the update
    /// confirms count as saved, the rest did not make it, and the outcome is
    /// classified from that split. Conflicts are computed against the state
    /// before any transaction bookkeeping so a lost race is still reported.
    pub fn on_store_update(
        &mut self,
        current: FieldValues,
        transaction_id: Option<Uuid>,
    ) -> Vec<SyncEvent> {
        self.snapshots.apply_store_update(current);
        let conflicts = self.snapshots.conflicting_fields();

        let mut events = Vec::new();
        let settles_open = matches!(
            (&self.open_transaction, transaction_id),
            (Some(txn), Some(id)) if txn.id == id
        );
        if settles_open {
            let transaction = self.open_transaction.take().expect("open transaction");
            let changed = self.snapshots.changed_in_update();
            let still_pending = self.snapshots.still_pending();
            let outcome = match (changed.is_empty(), still_pending.is_empty()) {
                (_, true) => SaveOutcome::FullSuccess,
                (true, false) => SaveOutcome::CompleteFailure,
                (false, false) => SaveOutcome::PartialSuccess {
                    not_saved: still_pending.iter().cloned().collect(),
                },
            };
            info!(transaction = %transaction.id, outcome = ?outcome, "save transaction settled");
            self.snapshots.reset_after_transaction();
            events.push(SyncEvent::SaveResult {
                transaction,
                outcome,
                occurred_at: Utc::now().to_rfc3339(),
            });
        }

        if !conflicts.is_empty() {
            warn!(fields = ?conflicts, "settings changed in another session");
            events.push(SyncEvent::ConflictWarning {
                fields: conflicts.into_iter().collect(),
                occurred_at: Utc::now().to_rfc3339(),
            });
        }
        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingBackend {
        persisted: Mutex<Vec<(SettingsScope, Value)>>,
        ssh_saves: Mutex<Vec<(Option<String>, Value)>>,
        local_writes: Mutex<Vec<(String, Value)>>,
        fail_options: AtomicBool,
        fail_ssh: AtomicBool,
    }

    impl SettingsBackend for RecordingBackend {
        fn persist_options(
            &self,
            scope: &SettingsScope,
            blob: Value,
            _transaction: Uuid,
        ) -> BoxFuture<'static, Result<(), PersistError>> {
            let result = if self.fail_options.load(Ordering::SeqCst) {
                Err(PersistError::new("backend unavailable"))
            } else {
                self.persisted.lock().unwrap().push((scope.clone(), blob));
                Ok(())
            };
            Box::pin(async move { result })
        }

        fn persist_ssh_key(
            &self,
            key_id: Option<String>,
            key: Value,
            _transaction: Uuid,
        ) -> BoxFuture<'static, Result<Option<String>, PersistError>> {
            let result = if self.fail_ssh.load(Ordering::SeqCst) {
                Err(PersistError::new("ssh endpoint unavailable"))
            } else {
                self.ssh_saves.lock().unwrap().push((key_id, key));
                Ok(Some("key-1".to_string()))
            };
            Box::pin(async move { result })
        }

        fn store_local(
            &self,
            field: String,
            value: Value,
        ) -> BoxFuture<'static, Result<(), PersistError>> {
            self.local_writes.lock().unwrap().push((field, value));
            Box::pin(async { Ok(()) })
        }
    }

    fn values(pairs: &[(&str, Value)]) -> FieldValues {
        pairs
            .iter()
            .map(|(field, value)| (field.to_string(), value.clone()))
            .collect()
    }

    fn global_engine(backend: Arc<RecordingBackend>) -> SettingsSyncEngine {
        SettingsSyncEngine::new(
            SettingsScope::Global,
            values(&[
                (fields::UPDATE_RATE, json!(60)),
                (fields::LANGUAGE, json!("en-US")),
            ]),
            json!({ "global": { "updateRate": 60, "language": "en-US" } }),
            Some(crate::options::global_defaults()),
            backend,
        )
    }

    #[tokio::test]
    async fn test_save_with_no_edits_is_a_noop() {
        let backend = Arc::new(RecordingBackend::default());
        let mut engine = global_engine(Arc::clone(&backend));

        let result = engine.save().await.unwrap();
        assert_eq!(result, None);
        assert!(backend.persisted.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_save_then_full_success() {
        let backend = Arc::new(RecordingBackend::default());
        let mut engine = global_engine(Arc::clone(&backend));

        engine.set_draft(fields::UPDATE_RATE, json!(120));
        assert!(engine.save_enabled());

        let transaction = engine.save().await.unwrap().expect("transaction opened");
        assert_eq!(
            transaction.fields.iter().collect::<Vec<_>>(),
            vec![fields::UPDATE_RATE]
        );
        assert!(!engine.save_enabled(), "save disabled while in flight");

        {
            let persisted = backend.persisted.lock().unwrap();
            assert_eq!(persisted.len(), 1);
            assert_eq!(persisted[0].1["global"]["updateRate"], json!(120));
            // untouched fields of the blob survive the merge
            assert_eq!(persisted[0].1["global"]["language"], json!("en-US"));
        }

        let events = engine.on_store_update(
            values(&[
                (fields::UPDATE_RATE, json!(120)),
                (fields::LANGUAGE, json!("en-US")),
            ]),
            Some(transaction.id),
        );
        assert_matches!(
            events.as_slice(),
            [SyncEvent::SaveResult { outcome: SaveOutcome::FullSuccess, .. }]
        );
        assert!(engine.open_transaction().is_none());
        assert!(!engine.is_dirty());
    }

    #[tokio::test]
    async fn test_partial_success_reports_unsaved_fields() {
        let backend = Arc::new(RecordingBackend::default());
        let mut engine = global_engine(Arc::clone(&backend));

        engine.set_draft(fields::UPDATE_RATE, json!(120));
        engine.set_draft(fields::LANGUAGE, json!("fr-FR"));
        let transaction = engine.save().await.unwrap().expect("transaction opened");

        // only the update rate came back changed
        let events = engine.on_store_update(
            values(&[
                (fields::UPDATE_RATE, json!(120)),
                (fields::LANGUAGE, json!("en-US")),
            ]),
            Some(transaction.id),
        );
        assert_matches!(
            &events[..],
            [SyncEvent::SaveResult {
                outcome: SaveOutcome::PartialSuccess { not_saved },
                ..
            }] if not_saved == &vec![fields::LANGUAGE.to_string()]
        );
    }

    #[tokio::test]
    async fn test_complete_failure_when_nothing_changed() {
        let backend = Arc::new(RecordingBackend::default());
        let mut engine = global_engine(Arc::clone(&backend));

        engine.set_draft(fields::UPDATE_RATE, json!(120));
        let transaction = engine.save().await.unwrap().expect("transaction opened");

        let events = engine.on_store_update(
            values(&[
                (fields::UPDATE_RATE, json!(60)),
                (fields::LANGUAGE, json!("en-US")),
            ]),
            Some(transaction.id),
        );
        assert_matches!(
            events.as_slice(),
            [SyncEvent::SaveResult { outcome: SaveOutcome::CompleteFailure, .. }]
        );
        // the edit is still pending so the user can retry
        assert!(engine.is_dirty());
    }

    #[tokio::test]
    async fn test_backend_error_closes_transaction_and_keeps_draft() {
        let backend = Arc::new(RecordingBackend::default());
        backend.fail_options.store(true, Ordering::SeqCst);
        let mut engine = global_engine(Arc::clone(&backend));

        engine.set_draft(fields::UPDATE_RATE, json!(120));
        let err = engine.save().await.unwrap_err();
        assert_eq!(err, PersistError::new("backend unavailable"));
        assert!(engine.open_transaction().is_none());
        assert!(engine.save_enabled(), "draft survives a failed dispatch");
    }

    #[tokio::test]
    async fn test_partial_dispatch_keeps_transaction_open() {
        let backend = Arc::new(RecordingBackend::default());
        backend.fail_ssh.store(true, Ordering::SeqCst);
        let mut engine = SettingsSyncEngine::new(
            SettingsScope::Global,
            values(&[
                (fields::UPDATE_RATE, json!(60)),
                (fields::SSH_KEY, json!("")),
            ]),
            json!({ "global": { "updateRate": 60 } }),
            None,
            Arc::clone(&backend) as Arc<dyn SettingsBackend>,
        );

        engine.set_draft(fields::UPDATE_RATE, json!(120));
        engine.set_draft(fields::SSH_KEY, json!("ssh-rsa AAAA"));

        // the options write lands, the ssh write does not: the transaction
        // stays open so the store update can settle the surviving branch
        let transaction = engine.save().await.unwrap().expect("transaction opened");
        assert!(transaction.fields.contains(fields::SSH_KEY));
        assert_eq!(backend.persisted.lock().unwrap().len(), 1);
        assert!(backend.ssh_saves.lock().unwrap().is_empty());
        assert_eq!(engine.open_transaction(), Some(&transaction));
    }

    #[tokio::test]
    async fn test_save_while_transaction_open_is_ignored() {
        let backend = Arc::new(RecordingBackend::default());
        let mut engine = global_engine(Arc::clone(&backend));

        engine.set_draft(fields::UPDATE_RATE, json!(120));
        let first = engine.save().await.unwrap();
        assert!(first.is_some());

        engine.set_draft(fields::UPDATE_RATE, json!(300));
        let second = engine.save().await.unwrap();
        assert_eq!(second, None);
        assert_eq!(backend.persisted.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_values_already_stored_commit_without_a_write() {
        let backend = Arc::new(RecordingBackend::default());
        // the blob already says 120 even though the client state lags at 60
        let mut engine = SettingsSyncEngine::new(
            SettingsScope::Global,
            values(&[(fields::UPDATE_RATE, json!(60))]),
            json!({ "global": { "updateRate": 120 } }),
            None,
            Arc::clone(&backend) as Arc<dyn SettingsBackend>,
        );

        engine.set_draft(fields::UPDATE_RATE, json!(120));
        let result = engine.save().await.unwrap();
        assert_eq!(result, None);
        assert!(backend.persisted.lock().unwrap().is_empty());
        assert_eq!(
            engine.current_values().get(fields::UPDATE_RATE),
            Some(&json!(120))
        );
        assert!(!engine.is_dirty());
    }

    #[tokio::test]
    async fn test_ssh_key_goes_through_its_own_resource() {
        let backend = Arc::new(RecordingBackend::default());
        let mut engine = SettingsSyncEngine::new(
            SettingsScope::Global,
            values(&[(fields::SSH_KEY, json!(""))]),
            json!({}),
            None,
            Arc::clone(&backend) as Arc<dyn SettingsBackend>,
        );

        engine.set_draft(fields::SSH_KEY, json!("ssh-rsa AAAA"));
        let transaction = engine.save().await.unwrap().expect("transaction opened");
        assert!(transaction.fields.contains(fields::SSH_KEY));

        let ssh_saves = backend.ssh_saves.lock().unwrap();
        assert_eq!(ssh_saves.len(), 1);
        assert_eq!(ssh_saves[0].0, None, "no previous key id");
        drop(ssh_saves);
        // the id of the created key is adopted for the next save
        assert_eq!(engine.ssh_key_id(), Some("key-1"));
        assert!(backend.persisted.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unchanged_ssh_key_is_not_persisted() {
        let backend = Arc::new(RecordingBackend::default());
        let mut engine = SettingsSyncEngine::new(
            SettingsScope::Global,
            values(&[(fields::SSH_KEY, json!("ssh-rsa AAAA"))]),
            json!({}),
            None,
            Arc::clone(&backend) as Arc<dyn SettingsBackend>,
        );
        engine.set_ssh_key_id(Some("key-1".to_string()));

        engine.set_draft(fields::SSH_KEY, json!("ssh-rsa AAAA"));
        let result = engine.save().await.unwrap();
        assert_eq!(result, None);
        assert!(backend.ssh_saves.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_language_is_mirrored_to_client_storage() {
        let backend = Arc::new(RecordingBackend::default());
        let mut engine = global_engine(Arc::clone(&backend));

        engine.set_draft(fields::LANGUAGE, json!("fr-FR"));
        engine.save().await.unwrap().expect("transaction opened");

        let local_writes = backend.local_writes.lock().unwrap();
        assert_eq!(
            local_writes.as_slice(),
            &[(fields::LANGUAGE.to_string(), json!("fr-FR"))]
        );
    }

    #[tokio::test]
    async fn test_local_only_fields_skip_the_transaction() {
        fn all_local(_name: &str) -> FieldKind {
            FieldKind::LocalOnly
        }

        let backend = Arc::new(RecordingBackend::default());
        let mut engine = global_engine(Arc::clone(&backend)).with_classifier(all_local);

        engine.set_draft(fields::UPDATE_RATE, json!(120));
        let result = engine.save().await.unwrap();
        assert_eq!(result, None, "local commits never open a transaction");
        assert!(backend.persisted.lock().unwrap().is_empty());
        assert_eq!(
            backend.local_writes.lock().unwrap().as_slice(),
            &[(fields::UPDATE_RATE.to_string(), json!(120))]
        );
        assert!(!engine.is_dirty());
    }

    #[tokio::test]
    async fn test_foreign_change_raises_conflict_warning() {
        let backend = Arc::new(RecordingBackend::default());
        let mut engine = global_engine(Arc::clone(&backend));

        engine.set_draft(fields::UPDATE_RATE, json!(120));
        // another session flipped the language while our dialog is open
        let events = engine.on_store_update(
            values(&[
                (fields::UPDATE_RATE, json!(60)),
                (fields::LANGUAGE, json!("de-DE")),
            ]),
            None,
        );
        assert_matches!(
            &events[..],
            [SyncEvent::ConflictWarning { fields: changed, .. }]
                if changed == &vec![fields::LANGUAGE.to_string()]
        );
    }

    #[tokio::test]
    async fn test_update_echoing_own_save_is_not_a_conflict() {
        let backend = Arc::new(RecordingBackend::default());
        let mut engine = global_engine(Arc::clone(&backend));

        engine.set_draft(fields::UPDATE_RATE, json!(120));
        let transaction = engine.save().await.unwrap().expect("transaction opened");

        let events = engine.on_store_update(
            values(&[
                (fields::UPDATE_RATE, json!(120)),
                (fields::LANGUAGE, json!("en-US")),
            ]),
            Some(transaction.id),
        );
        assert_eq!(events.len(), 1, "save result only, no conflict warning");
        assert_matches!(
            events.as_slice(),
            [SyncEvent::SaveResult { outcome: SaveOutcome::FullSuccess, .. }]
        );
    }

    #[tokio::test]
    async fn test_update_for_unknown_transaction_only_checks_conflicts() {
        let backend = Arc::new(RecordingBackend::default());
        let mut engine = global_engine(Arc::clone(&backend));

        engine.set_draft(fields::UPDATE_RATE, json!(120));
        let transaction = engine.save().await.unwrap().expect("transaction opened");

        // an update answering some other (stale) transaction id
        let events = engine.on_store_update(
            values(&[
                (fields::UPDATE_RATE, json!(120)),
                (fields::LANGUAGE, json!("en-US")),
            ]),
            Some(Uuid::new_v4()),
        );
        assert!(events.is_empty());
        assert_eq!(engine.open_transaction(), Some(&transaction));
    }

    #[tokio::test]
    async fn test_vm_scope_writes_every_selected_vm() {
        let backend = Arc::new(RecordingBackend::default());
        let scope = SettingsScope::Vms {
            ids: vec!["vm-1".to_string(), "vm-2".to_string()],
        };
        let mut engine = SettingsSyncEngine::new(
            scope,
            values(&[(fields::CTRL_ALT_DEL, json!(false))]),
            json!({ "vms": {} }),
            Some(crate::options::vm_defaults()),
            Arc::clone(&backend) as Arc<dyn SettingsBackend>,
        );

        engine.set_draft(fields::CTRL_ALT_DEL, json!(true));
        engine.save().await.unwrap().expect("transaction opened");

        let persisted = backend.persisted.lock().unwrap();
        assert_eq!(persisted.len(), 1);
        let blob = &persisted[0].1;
        assert_eq!(blob["vms"]["vm-1"][fields::CTRL_ALT_DEL], json!(true));
        assert_eq!(blob["vms"]["vm-2"][fields::CTRL_ALT_DEL], json!(true));
        // defaults fill the never-configured VM entries
        assert_eq!(blob["vms"]["vm-1"][fields::SMARTCARD], json!(false));
    }
}

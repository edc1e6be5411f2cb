//! Default Option Values and Server-Load Merge
//!
//! The client ships with a complete set of defaults so every page works
//! before (and without) any persisted user options. When the backend's
//! stored options arrive they are overlaid onto the defaults: a key the
//! server knows wins, a key it does not falls back to the client default.
//! Per-VM settings are deliberately seeded as a static snapshot of the
//! global VM baseline taken at load time - later changes to the baseline do
//! not leak into VMs the user configured individually.

use serde_json::{json, Map, Value};

use super::fields;

/// Flat field-name to value mapping for one settings scope.
pub type FieldValues = Map<String, Value>;

/// Defaults for the account-wide settings scope.
pub fn global_defaults() -> FieldValues {
    let Value::Object(map) = json!({
        fields::UPDATE_RATE: 60,
        fields::LANGUAGE: "en-US",
        fields::SHOW_NOTIFICATIONS: true,
        fields::NOTIFICATIONS_RESUME_TIME: 0,
        fields::PREVIEW: false,
    }) else {
        unreachable!("json object literal")
    };
    map
}

/// Baseline defaults applied to every VM without its own settings.
pub fn vm_defaults() -> FieldValues {
    let Value::Object(map) = json!({
        fields::DISPLAY_UNSAVED_WARNINGS: true,
        fields::CONFIRM_FORCE_SHUTDOWN: true,
        fields::CONFIRM_VM_DELETING: true,
        fields::CONFIRM_VM_SUSPENDING: true,
        fields::FULL_SCREEN_MODE: false,
        fields::CTRL_ALT_DEL: false,
        fields::SMARTCARD: false,
        fields::AUTO_CONNECT: false,
        fields::SHOW_NOTIFICATIONS: true,
    }) else {
        unreachable!("json object literal")
    };
    map
}

/// The options blob a fresh client starts from.
pub fn initial_options() -> Value {
    json!({
        "global": global_defaults(),
        "globalVm": vm_defaults(),
        "vms": {},
    })
}

/// Overlay options received from the backend onto the client state.
///
/// `global` and `globalVm` prefer the server value per key and keep the
/// client default for keys the server does not have. The `ssh` section is
/// client-side bookkeeping and survives untouched. Everything else the
/// server sent replaces the client copy; each per-VM entry is then the
/// merged `globalVm` baseline overlaid with that VM's stored overrides.
pub fn apply_server_options(client: &Value, server: &Value) -> Value {
    let mut merged = match client {
        Value::Object(map) => map.clone(),
        _ => Map::new(),
    };

    if let Value::Object(server) = server {
        for (key, server_value) in server {
            match key.as_str() {
                "global" | "globalVm" => {
                    let section = merged.entry(key.clone()).or_insert_with(|| json!({}));
                    overlay_defined(section, server_value);
                }
                "ssh" => {}
                _ => {
                    merged.insert(key.clone(), server_value.clone());
                }
            }
        }
    }

    let baseline = merged.get("globalVm").cloned().unwrap_or_else(|| json!({}));
    if let Some(Value::Object(vms)) = merged.get_mut("vms") {
        for vm_value in vms.values_mut() {
            let mut seeded = baseline.clone();
            overlay_defined(&mut seeded, vm_value);
            *vm_value = seeded;
        }
    }

    Value::Object(merged)
}

/// Overlay every key `source` defines onto `target`, keeping target keys the
/// source does not mention.
fn overlay_defined(target: &mut Value, source: &Value) {
    let (Value::Object(target), Value::Object(source)) = (target, source) else {
        return;
    };
    for (key, value) in source {
        target.insert(key.clone(), value.clone());
    }
}

//! # Print Settings
//!
//! User print preferences and their persisted document.
//!
//! The document is camelCase JSON. Any field may be missing, and most accept
//! the keyword `"auto"` meaning "let the printer decide":
//!
//! ```json
//! {
//!   "preview": false,
//!   "fit": true,
//!   "orientation": "landscape",
//!   "paperSize": "auto",
//!   "copies": 2,
//!   "duplex": "long",
//!   "printer": null
//! }
//! ```
//!
//! Loading merges the stored document over [`PrintSettings::default`] one
//! key at a time, so a single bad value only loses that value.

use crate::error::{PrintError, Result};
use bridge_traits::print::{DuplexMode, PageOrientation, PrintOptions};
use bridge_traits::storage::SettingsStore;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Settings key the preferences document is stored under.
pub const SETTINGS_KEY: &str = "print_settings";

const AUTO: &str = "auto";

/// A preference that is either left to the printer or pinned to a value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Setting<T> {
    Auto,
    Value(T),
}

impl<T> Default for Setting<T> {
    fn default() -> Self {
        Setting::Auto
    }
}

impl<T> Setting<T> {
    pub fn is_auto(&self) -> bool {
        matches!(self, Setting::Auto)
    }

    pub fn as_option(&self) -> Option<&T> {
        match self {
            Setting::Auto => None,
            Setting::Value(value) => Some(value),
        }
    }

    pub fn into_option(self) -> Option<T> {
        match self {
            Setting::Auto => None,
            Setting::Value(value) => Some(value),
        }
    }
}

impl<T> From<Option<T>> for Setting<T> {
    fn from(value: Option<T>) -> Self {
        value.map_or(Setting::Auto, Setting::Value)
    }
}

impl<T: Serialize> Serialize for Setting<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Setting::Auto => serializer.serialize_str(AUTO),
            Setting::Value(value) => value.serialize(serializer),
        }
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Setting<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        #[derive(Deserialize)]
        enum AutoKeyword {
            #[serde(rename = "auto")]
            Auto,
        }

        // Order matters: "auto" must win over a string-typed value.
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr<T> {
            Auto(AutoKeyword),
            Null(()),
            Value(T),
        }

        Ok(match Repr::<T>::deserialize(deserializer)? {
            Repr::Auto(AutoKeyword::Auto) | Repr::Null(()) => Setting::Auto,
            Repr::Value(value) => Setting::Value(value),
        })
    }
}

/// `"auto"`, `""` and `null` all mean the default printer.
fn deserialize_printer<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let name = Option::<String>::deserialize(deserializer)?;
    Ok(name
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty() && !n.eq_ignore_ascii_case(AUTO)))
}

/// Persisted print preferences.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PrintSettings {
    /// Open each document in a viewer or dialog instead of printing silently
    pub preview: bool,
    /// Scale pages to the printable area
    pub fit: bool,
    pub orientation: Setting<PageOrientation>,
    pub paper_size: Setting<String>,
    pub copies: Setting<u32>,
    pub duplex: Setting<DuplexMode>,
    /// `None` prints to the system default printer
    #[serde(deserialize_with = "deserialize_printer")]
    pub printer: Option<String>,
}

impl Default for PrintSettings {
    fn default() -> Self {
        Self {
            preview: false,
            fit: true,
            orientation: Setting::Auto,
            paper_size: Setting::Auto,
            copies: Setting::Auto,
            duplex: Setting::Auto,
            printer: None,
        }
    }
}

impl PrintSettings {
    /// Merge a stored document over the defaults.
    ///
    /// Keys are applied one at a time; a key whose value does not parse or
    /// fails [`validate`](Self::validate) is skipped with a warning. A
    /// document that is not an object yields the defaults.
    pub fn merge_over_defaults(stored: &Value) -> Self {
        let Some(fields) = stored.as_object() else {
            warn!("Stored print settings are not an object, using defaults");
            return Self::default();
        };

        let mut accepted = Map::new();
        for (key, value) in fields {
            let mut candidate = accepted.clone();
            candidate.insert(key.clone(), value.clone());

            match serde_json::from_value::<PrintSettings>(Value::Object(candidate.clone())) {
                Ok(parsed) => match parsed.validate() {
                    Ok(()) => accepted = candidate,
                    Err(e) => warn!(key = %key, error = %e, "Ignoring invalid print setting"),
                },
                Err(e) => warn!(key = %key, error = %e, "Ignoring unreadable print setting"),
            }
        }

        serde_json::from_value(Value::Object(accepted)).unwrap_or_default()
    }

    pub fn validate(&self) -> Result<()> {
        if let Setting::Value(0) = self.copies {
            return Err(PrintError::Settings(
                "copies must be at least 1".to_string(),
            ));
        }
        if let Setting::Value(paper) = &self.paper_size {
            if paper.trim().is_empty() {
                return Err(PrintError::Settings(
                    "paper size must not be blank".to_string(),
                ));
            }
        }
        Ok(())
    }

    /// Options handed to the print executor.
    pub fn to_print_options(&self) -> PrintOptions {
        PrintOptions {
            show_dialog: self.preview,
            fit: self.fit,
            orientation: self.orientation.as_option().copied(),
            paper_size: self.paper_size.as_option().cloned(),
            printer: self.printer.clone(),
            copies: self.copies.as_option().copied(),
            duplex: self.duplex.as_option().copied(),
        }
    }
}

/// A partial update; `None` leaves the field unchanged.
///
/// `printer: Some(Setting::Auto)` resets to the default printer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PrintSettingsPatch {
    pub preview: Option<bool>,
    pub fit: Option<bool>,
    pub orientation: Option<Setting<PageOrientation>>,
    pub paper_size: Option<Setting<String>>,
    pub copies: Option<Setting<u32>>,
    pub duplex: Option<Setting<DuplexMode>>,
    pub printer: Option<Setting<String>>,
}

impl PrintSettingsPatch {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    pub fn apply_to(&self, base: &PrintSettings) -> PrintSettings {
        let mut settings = base.clone();
        if let Some(preview) = self.preview {
            settings.preview = preview;
        }
        if let Some(fit) = self.fit {
            settings.fit = fit;
        }
        if let Some(orientation) = &self.orientation {
            settings.orientation = orientation.clone();
        }
        if let Some(paper_size) = &self.paper_size {
            settings.paper_size = paper_size.clone();
        }
        if let Some(copies) = &self.copies {
            settings.copies = copies.clone();
        }
        if let Some(duplex) = &self.duplex {
            settings.duplex = duplex.clone();
        }
        if let Some(printer) = &self.printer {
            settings.printer = printer
                .as_option()
                .map(|p| p.trim().to_string())
                .filter(|p| !p.is_empty());
        }
        settings
    }
}

/// Reads and writes [`PrintSettings`] through the host settings store.
pub struct PrintSettingsStore {
    store: Arc<dyn SettingsStore>,
}

impl PrintSettingsStore {
    pub fn new(store: Arc<dyn SettingsStore>) -> Self {
        Self { store }
    }

    /// Current settings; a missing document means the defaults.
    #[instrument(skip(self))]
    pub async fn load(&self) -> Result<PrintSettings> {
        let stored = self
            .store
            .get_json(SETTINGS_KEY)
            .await
            .map_err(|e| PrintError::Settings(format!("Failed to read settings: {}", e)))?;

        match stored {
            Some(document) => Ok(PrintSettings::merge_over_defaults(&document)),
            None => {
                debug!("No stored print settings, using defaults");
                Ok(PrintSettings::default())
            }
        }
    }

    /// Replace the stored document.
    #[instrument(skip(self, settings))]
    pub async fn save(&self, settings: &PrintSettings) -> Result<()> {
        settings.validate()?;

        let document = serde_json::to_value(settings)
            .map_err(|e| PrintError::Settings(format!("Failed to encode settings: {}", e)))?;

        self.store
            .set_json(SETTINGS_KEY, document)
            .await
            .map_err(|e| PrintError::Settings(format!("Failed to write settings: {}", e)))?;

        debug!(preview = settings.preview, "Print settings saved");
        Ok(())
    }

    /// Apply `patch` to the stored settings and save the result.
    pub async fn update(&self, patch: &PrintSettingsPatch) -> Result<PrintSettings> {
        let updated = patch.apply_to(&self.load().await?);
        self.save(&updated).await?;
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::error::{BridgeError, Result as BridgeResult};
    use serde_json::json;
    use std::collections::HashMap;
    use tokio::sync::Mutex;

    #[derive(Default)]
    struct MemorySettingsStore {
        values: Mutex<HashMap<String, Value>>,
        broken: bool,
    }

    #[async_trait]
    impl SettingsStore for MemorySettingsStore {
        async fn set_json(&self, key: &str, value: Value) -> BridgeResult<()> {
            if self.broken {
                return Err(BridgeError::OperationFailed("disk full".to_string()));
            }
            self.values.lock().await.insert(key.to_string(), value);
            Ok(())
        }

        async fn get_json(&self, key: &str) -> BridgeResult<Option<Value>> {
            if self.broken {
                return Err(BridgeError::OperationFailed("disk full".to_string()));
            }
            Ok(self.values.lock().await.get(key).cloned())
        }

        async fn delete(&self, key: &str) -> BridgeResult<()> {
            self.values.lock().await.remove(key);
            Ok(())
        }

        async fn list_keys(&self) -> BridgeResult<Vec<String>> {
            Ok(self.values.lock().await.keys().cloned().collect())
        }
    }

    #[test]
    fn test_defaults() {
        let settings = PrintSettings::default();
        assert!(!settings.preview);
        assert!(settings.fit);
        assert!(settings.orientation.is_auto());
        assert!(settings.paper_size.is_auto());
        assert!(settings.copies.is_auto());
        assert!(settings.duplex.is_auto());
        assert_eq!(settings.printer, None);
    }

    #[test]
    fn test_parse_full_document() {
        let settings = PrintSettings::merge_over_defaults(&json!({
            "preview": true,
            "fit": false,
            "orientation": "landscape",
            "paperSize": "A4",
            "copies": 3,
            "duplex": "long",
            "printer": "Office Laser"
        }));

        assert!(settings.preview);
        assert!(!settings.fit);
        assert_eq!(settings.orientation, Setting::Value(PageOrientation::Landscape));
        assert_eq!(settings.paper_size, Setting::Value("A4".to_string()));
        assert_eq!(settings.copies, Setting::Value(3));
        assert_eq!(settings.duplex, Setting::Value(DuplexMode::Long));
        assert_eq!(settings.printer.as_deref(), Some("Office Laser"));
    }

    #[test]
    fn test_auto_keyword_everywhere() {
        let settings = PrintSettings::merge_over_defaults(&json!({
            "orientation": "auto",
            "paperSize": "auto",
            "copies": "auto",
            "duplex": "auto",
            "printer": "auto"
        }));
        assert_eq!(settings, PrintSettings::default());

        let settings = PrintSettings::merge_over_defaults(&json!({ "printer": "" }));
        assert_eq!(settings.printer, None);
    }

    #[test]
    fn test_invalid_keys_are_ignored_individually() {
        let settings = PrintSettings::merge_over_defaults(&json!({
            "fit": false,
            "copies": 0,
            "orientation": "diagonal",
            "duplex": "short",
            "unknown": 42
        }));

        assert!(!settings.fit);
        assert!(settings.copies.is_auto());
        assert!(settings.orientation.is_auto());
        assert_eq!(settings.duplex, Setting::Value(DuplexMode::Short));
    }

    #[test]
    fn test_non_object_document() {
        assert_eq!(
            PrintSettings::merge_over_defaults(&json!("garbage")),
            PrintSettings::default()
        );
    }

    #[test]
    fn test_serialized_shape() {
        let settings = PrintSettings {
            copies: Setting::Value(2),
            ..PrintSettings::default()
        };
        let value = serde_json::to_value(&settings).unwrap();
        assert_eq!(
            value,
            json!({
                "preview": false,
                "fit": true,
                "orientation": "auto",
                "paperSize": "auto",
                "copies": 2,
                "duplex": "auto",
                "printer": null
            })
        );
    }

    #[test]
    fn test_to_print_options() {
        let settings = PrintSettings {
            preview: true,
            orientation: Setting::Value(PageOrientation::Portrait),
            copies: Setting::Value(2),
            printer: Some("Front Desk".to_string()),
            ..PrintSettings::default()
        };
        let options = settings.to_print_options();

        assert!(options.show_dialog);
        assert!(options.fit);
        assert_eq!(options.orientation, Some(PageOrientation::Portrait));
        assert_eq!(options.copies, Some(2));
        assert_eq!(options.paper_size, None);
        assert_eq!(options.duplex, None);
        assert_eq!(options.printer.as_deref(), Some("Front Desk"));
    }

    #[test]
    fn test_patch_apply() {
        let base = PrintSettings {
            printer: Some("Old".to_string()),
            ..PrintSettings::default()
        };
        let patch = PrintSettingsPatch {
            fit: Some(false),
            printer: Some(Setting::Auto),
            ..PrintSettingsPatch::default()
        };
        let patched = patch.apply_to(&base);

        assert!(!patched.fit);
        assert_eq!(patched.printer, None);
        assert!(PrintSettingsPatch::default().is_empty());
        assert!(!patch.is_empty());
    }

    #[tokio::test]
    async fn test_load_without_document() {
        let store = PrintSettingsStore::new(Arc::new(MemorySettingsStore::default()));
        assert_eq!(store.load().await.unwrap(), PrintSettings::default());
    }

    #[tokio::test]
    async fn test_save_then_load_merges_over_defaults() {
        let partials = vec![
            PrintSettingsPatch::default(),
            PrintSettingsPatch {
                preview: Some(true),
                ..PrintSettingsPatch::default()
            },
            PrintSettingsPatch {
                orientation: Some(Setting::Value(PageOrientation::Landscape)),
                copies: Some(Setting::Value(4)),
                printer: Some(Setting::Value("Lab".to_string())),
                ..PrintSettingsPatch::default()
            },
        ];

        for patch in partials {
            let store = PrintSettingsStore::new(Arc::new(MemorySettingsStore::default()));
            let expected = patch.apply_to(&PrintSettings::default());

            store.save(&expected).await.unwrap();
            assert_eq!(store.load().await.unwrap(), expected);
        }
    }

    #[tokio::test]
    async fn test_partial_document_on_disk() {
        let backing = Arc::new(MemorySettingsStore::default());
        backing
            .set_json(SETTINGS_KEY, json!({ "preview": true }))
            .await
            .unwrap();

        let loaded = PrintSettingsStore::new(backing).load().await.unwrap();
        assert_eq!(
            loaded,
            PrintSettings {
                preview: true,
                ..PrintSettings::default()
            }
        );
    }

    #[tokio::test]
    async fn test_update_keeps_other_fields() {
        let store = PrintSettingsStore::new(Arc::new(MemorySettingsStore::default()));
        store
            .save(&PrintSettings {
                copies: Setting::Value(2),
                ..PrintSettings::default()
            })
            .await
            .unwrap();

        let updated = store
            .update(&PrintSettingsPatch {
                preview: Some(true),
                ..PrintSettingsPatch::default()
            })
            .await
            .unwrap();

        assert!(updated.preview);
        assert_eq!(updated.copies, Setting::Value(2));
        assert_eq!(store.load().await.unwrap(), updated);
    }

    #[tokio::test]
    async fn test_save_rejects_invalid() {
        let store = PrintSettingsStore::new(Arc::new(MemorySettingsStore::default()));
        let err = store
            .save(&PrintSettings {
                copies: Setting::Value(0),
                ..PrintSettings::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, PrintError::Settings(_)));
    }

    #[tokio::test]
    async fn test_store_failure_is_reported() {
        let store = PrintSettingsStore::new(Arc::new(MemorySettingsStore {
            broken: true,
            ..Default::default()
        }));
        assert!(matches!(
            store.load().await.unwrap_err(),
            PrintError::Settings(_)
        ));
    }

    #[tokio::test]
    async fn test_corrupt_settings_file_falls_back_and_is_overwritten() {
        let dir = std::env::temp_dir().join(format!(
            "drive-print-corrupt-settings-{}",
            std::process::id()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("settings.json");
        std::fs::write(&path, b"{ not json").unwrap();

        let store = PrintSettingsStore::new(Arc::new(
            bridge_desktop::JsonFileSettingsStore::new(&path),
        ));
        assert_eq!(store.load().await.unwrap(), PrintSettings::default());

        store.save(&PrintSettings::default()).await.unwrap();
        let updated = store
            .update(&PrintSettingsPatch {
                copies: Some(Setting::Value(3)),
                ..PrintSettingsPatch::default()
            })
            .await
            .unwrap();
        assert_eq!(store.load().await.unwrap(), updated);

        let _ = std::fs::remove_dir_all(&dir);
    }
}

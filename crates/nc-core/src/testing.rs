// Test doubles for the storage and platform seams.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{PlatformError, StorageError};
use crate::platform::{Badge, PageHost, RedirectRules, TabNavigator, UiNotifier};
use crate::storage::{KeyValueStore, MemoryStore};
use crate::types::BadgeColor;

// =============================================================================
// Storage
// =============================================================================

/// Wraps a MemoryStore and fails reads and/or writes on demand.
#[derive(Default)]
pub struct FlakyStore {
    pub inner: MemoryStore,
    pub fail_reads: AtomicBool,
    pub fail_writes: AtomicBool,
}

impl FlakyStore {
    pub fn failing_reads() -> Self {
        let store = Self::default();
        store.fail_reads.store(true, Ordering::SeqCst);
        store
    }

    pub fn failing_writes() -> Self {
        let store = Self::default();
        store.fail_writes.store(true, Ordering::SeqCst);
        store
    }
}

#[async_trait]
impl KeyValueStore for FlakyStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, StorageError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable("read refused".to_string()));
        }
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), StorageError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable("write refused".to_string()));
        }
        self.inner.set(key, value).await
    }
}

// =============================================================================
// Platform
// =============================================================================

#[derive(Default)]
pub struct RecordingRules {
    pub calls: Mutex<Vec<bool>>,
    pub fail: AtomicBool,
}

#[async_trait]
impl RedirectRules for RecordingRules {
    async fn set_ruleset_enabled(&self, enabled: bool) -> Result<(), PlatformError> {
        self.calls.lock().unwrap().push(enabled);
        if self.fail.load(Ordering::SeqCst) {
            return Err(PlatformError::RuleUpdate("ruleset rejected".to_string()));
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingBadge {
    pub calls: Mutex<Vec<(String, BadgeColor)>>,
}

impl RecordingBadge {
    pub fn last_text(&self) -> Option<String> {
        self.calls.lock().unwrap().last().map(|(text, _)| text.clone())
    }
}

#[async_trait]
impl Badge for RecordingBadge {
    async fn set_badge(&self, text: &str, color: BadgeColor) -> Result<(), PlatformError> {
        self.calls.lock().unwrap().push((text.to_string(), color));
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    pub count: Mutex<usize>,
}

#[async_trait]
impl UiNotifier for RecordingNotifier {
    async fn stats_updated(&self) -> Result<(), PlatformError> {
        *self.count.lock().unwrap() += 1;
        // Nobody listening is the common case.
        Err(PlatformError::Notify("no receiver".to_string()))
    }
}

#[derive(Default)]
pub struct RecordingNavigator {
    pub calls: Mutex<Vec<(i64, String)>>,
    pub fail: AtomicBool,
}

#[async_trait]
impl TabNavigator for RecordingNavigator {
    async fn update_tab(&self, tab_id: i64, url: &str) -> Result<(), PlatformError> {
        self.calls.lock().unwrap().push((tab_id, url.to_string()));
        if self.fail.load(Ordering::SeqCst) {
            return Err(PlatformError::Navigation {
                tab_id,
                reason: "no tab with id".to_string(),
            });
        }
        Ok(())
    }
}

/// Page whose location the test moves around.
#[derive(Clone, Default)]
pub struct FakePage {
    pub location: Arc<Mutex<String>>,
    pub replaced: Arc<Mutex<Vec<String>>>,
}

impl FakePage {
    pub fn at(url: &str) -> Self {
        let page = Self::default();
        page.navigate(url);
        page
    }

    pub fn navigate(&self, url: &str) {
        *self.location.lock().unwrap() = url.to_string();
    }

    pub fn replaced(&self) -> Vec<String> {
        self.replaced.lock().unwrap().clone()
    }
}

#[async_trait]
impl PageHost for FakePage {
    fn current_url(&self) -> String {
        self.location.lock().unwrap().clone()
    }

    async fn replace_location(&self, url: &str) -> Result<(), PlatformError> {
        self.replaced.lock().unwrap().push(url.to_string());
        self.navigate(url);
        Ok(())
    }
}

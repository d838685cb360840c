//! Enablement gate
//!
//! A single persisted flag, read before every redirect decision. Turning it
//! on or off also flips the declarative redirect ruleset so both redirect
//! paths agree.

use std::sync::Arc;

use serde_json::Value;

use crate::error::Result;
use crate::platform::RedirectRules;
use crate::storage::{keys, KeyValueStore};

/// Flag value when nothing has been stored yet.
pub const DEFAULT_ENABLED: bool = true;

pub struct EnablementGate {
    store: Arc<dyn KeyValueStore>,
    rules: Arc<dyn RedirectRules>,
}

impl EnablementGate {
    pub fn new(store: Arc<dyn KeyValueStore>, rules: Arc<dyn RedirectRules>) -> Self {
        Self { store, rules }
    }

    /// Read the flag. Unset or non-boolean values count as enabled.
    pub async fn is_enabled(&self) -> Result<bool> {
        let value = self.store.get(keys::ENABLED).await?;
        Ok(match value {
            Some(Value::Bool(enabled)) => enabled,
            _ => DEFAULT_ENABLED,
        })
    }

    /// Persist the flag and mirror it onto the redirect ruleset.
    ///
    /// If the ruleset refuses the change the previous flag is written back
    /// before the error is returned, so the store never disagrees with the
    /// rules the browser is applying.
    pub async fn set_enabled(&self, enabled: bool) -> Result<()> {
        let previous = self.is_enabled().await?;
        self.store.set(keys::ENABLED, Value::Bool(enabled)).await?;

        if let Err(e) = self.rules.set_ruleset_enabled(enabled).await {
            log::warn!("ruleset update failed, restoring enabled={}: {}", previous, e);
            if let Err(restore) = self.store.set(keys::ENABLED, Value::Bool(previous)).await {
                log::warn!("failed to restore enabled flag: {}", restore);
            }
            return Err(e.into());
        }

        log::info!("redirects {}", if enabled { "enabled" } else { "disabled" });
        Ok(())
    }

    /// Re-apply the stored flag to the ruleset (install/upgrade).
    pub async fn sync_rules(&self) -> Result<bool> {
        let enabled = self.is_enabled().await?;
        self.rules.set_ruleset_enabled(enabled).await?;
        Ok(enabled)
    }
}

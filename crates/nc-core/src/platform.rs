//! Browser-side effects the core calls out to
//!
//! Each trait is one capability of the host browser. The extension shell
//! implements them over the WebExtension APIs; the CLI and tests plug in
//! their own.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::PlatformError;
use crate::types::BadgeColor;

/// Declarative redirect rules mirrored from the enablement flag.
#[async_trait]
pub trait RedirectRules: Send + Sync {
    async fn set_ruleset_enabled(&self, enabled: bool) -> Result<(), PlatformError>;
}

/// Toolbar badge.
#[async_trait]
pub trait Badge: Send + Sync {
    async fn set_badge(&self, text: &str, color: BadgeColor) -> Result<(), PlatformError>;
}

/// Push channel to open UI surfaces (popup, settings page).
#[async_trait]
pub trait UiNotifier: Send + Sync {
    async fn stats_updated(&self) -> Result<(), PlatformError>;
}

/// Privileged tab navigation.
#[async_trait]
pub trait TabNavigator: Send + Sync {
    async fn update_tab(&self, tab_id: i64, url: &str) -> Result<(), PlatformError>;
}

/// The page an in-page observer runs in.
#[async_trait]
pub trait PageHost: Send + Sync {
    /// Current `location.href`.
    fn current_url(&self) -> String;

    /// Replace the current history entry with `url`.
    async fn replace_location(&self, url: &str) -> Result<(), PlatformError>;
}

/// Platform with no rule layer, badge, or UI. Every call succeeds.
#[derive(Debug, Clone, Copy, Default)]
pub struct Headless;

#[async_trait]
impl RedirectRules for Headless {
    async fn set_ruleset_enabled(&self, _enabled: bool) -> Result<(), PlatformError> {
        Ok(())
    }
}

#[async_trait]
impl Badge for Headless {
    async fn set_badge(&self, _text: &str, _color: BadgeColor) -> Result<(), PlatformError> {
        Ok(())
    }
}

#[async_trait]
impl UiNotifier for Headless {
    async fn stats_updated(&self) -> Result<(), PlatformError> {
        Ok(())
    }
}

/// Every platform capability the background needs, bundled for injection.
#[derive(Clone)]
pub struct Platform {
    pub rules: Arc<dyn RedirectRules>,
    pub badge: Arc<dyn Badge>,
    pub notifier: Arc<dyn UiNotifier>,
    pub navigator: Arc<dyn TabNavigator>,
}

impl Platform {
    /// A platform that can only navigate tabs.
    pub fn headless(navigator: Arc<dyn TabNavigator>) -> Self {
        Self {
            rules: Arc::new(Headless),
            badge: Arc::new(Headless),
            notifier: Arc::new(Headless),
            navigator,
        }
    }
}

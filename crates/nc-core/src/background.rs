//! Background worker
//!
//! Owns the gate and the counters, answers popup messages, and hosts the
//! privileged pre-navigation hook. The hook and the in-page monitor can both
//! fire for one logical navigation; the classifier's idempotence keeps that
//! safe, so neither side coordinates with the other.

use std::collections::HashMap;
use std::ops::RangeInclusive;
use std::sync::{Arc, Mutex, MutexGuard};

use serde_json::Value;

use crate::clock::Clock;
use crate::error::Result;
use crate::gate::{EnablementGate, DEFAULT_ENABLED};
use crate::message::{Request, Response, UNKNOWN_MESSAGE};
use crate::platform::{Badge, Platform, TabNavigator, UiNotifier};
use crate::stats::StatsAggregator;
use crate::storage::{keys, KeyValueStore};
use crate::types::{BadgeState, NavigationEvent, NavigationSource, RedirectStats};
use crate::url::{classify, is_monitored_host};

/// Declarative rule ids whose matches count as redirects.
pub const COUNTED_RULE_IDS: RangeInclusive<i64> = 1..=5;

/// What the pre-navigation hook did with an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationOutcome {
    /// Subframe, or a host the hook does not watch
    Ignored,
    /// Redirects are turned off
    Disabled,
    /// Not a video, or already rewritten
    NoRewrite,
    /// Same URL as a redirect already in flight on this tab
    Duplicate,
    /// Tab was sent to the given URL
    Redirected(String),
    /// Gate unreadable or tab update rejected
    Failed,
}

/// Redirect issued on a tab whose follow-up events have not arrived yet.
#[derive(Debug, Clone)]
struct PendingRedirect {
    source: String,
}

pub struct Background {
    store: Arc<dyn KeyValueStore>,
    gate: Arc<EnablementGate>,
    stats: StatsAggregator,
    badge: Arc<dyn Badge>,
    notifier: Arc<dyn UiNotifier>,
    navigator: Arc<dyn TabNavigator>,
    pending: Mutex<HashMap<i64, PendingRedirect>>,
}

impl Background {
    pub fn new(store: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>, platform: Platform) -> Self {
        Self {
            gate: Arc::new(EnablementGate::new(store.clone(), platform.rules)),
            stats: StatsAggregator::new(store.clone(), clock),
            store,
            badge: platform.badge,
            notifier: platform.notifier,
            navigator: platform.navigator,
            pending: Mutex::new(HashMap::new()),
        }
    }

    /// Shared handle to the gate, for in-page monitors in the same process.
    pub fn gate(&self) -> Arc<EnablementGate> {
        self.gate.clone()
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Extension installed or updated: write missing defaults, bring the
    /// ruleset in line with the stored flag, refresh the badge.
    pub async fn on_installed(&self) -> Result<()> {
        if self.store.get(keys::ENABLED).await?.is_none() {
            self.store.set(keys::ENABLED, Value::Bool(DEFAULT_ENABLED)).await?;
        }
        // Creates the stats record when absent.
        self.stats.load().await?;
        if self.store.get(keys::FIRST_RUN).await?.is_none() {
            self.store.set(keys::FIRST_RUN, Value::Bool(true)).await?;
        }

        let enabled = self.gate.sync_rules().await?;
        log::info!("installed, redirects enabled={}", enabled);
        self.update_badge().await;
        Ok(())
    }

    /// Browser started with the extension already installed.
    pub async fn on_startup(&self) {
        self.update_badge().await;
    }

    /// Push the current count to the toolbar badge. Failures are logged only.
    pub async fn update_badge(&self) {
        let state = match self.state().await {
            Ok((enabled, stats)) => BadgeState::from_state(enabled, &stats),
            Err(e) => {
                log::warn!("badge not updated: {}", e);
                return;
            }
        };
        if let Err(e) = self.badge.set_badge(&state.text, state.color).await {
            log::debug!("{}", e);
        }
    }

    // =========================================================================
    // Popup Messages
    // =========================================================================

    pub async fn state(&self) -> Result<(bool, RedirectStats)> {
        let enabled = self.gate.is_enabled().await?;
        let stats = self.stats.load().await?;
        Ok((enabled, stats))
    }

    /// Toggle redirects. The counters are read first so that a failed read
    /// leaves the flag untouched.
    pub async fn set_enabled(&self, enabled: bool) -> Result<(bool, RedirectStats)> {
        let stats = self.stats.load().await?;
        self.gate.set_enabled(enabled).await?;
        self.update_badge().await;
        Ok((enabled, stats))
    }

    /// Answer a popup message. Always produces a response.
    pub async fn handle_message(&self, message: &Value) -> Response {
        let result = match Request::from_value(message) {
            Some(Request::GetState) => self.state().await,
            Some(Request::SetEnabled { enabled }) => self.set_enabled(enabled).await,
            None => return Response::error(UNKNOWN_MESSAGE),
        };

        match result {
            Ok((enabled, stats)) => Response::state(enabled, stats),
            Err(e) => {
                log::warn!("message failed: {}", e);
                Response::error(e.to_string())
            }
        }
    }

    // =========================================================================
    // Matches
    // =========================================================================

    /// Count a redirect, refresh the badge and tell any open popup.
    pub async fn record_match(&self) -> Result<RedirectStats> {
        let stats = self.stats.record_redirect().await?;
        self.update_badge().await;
        if let Err(e) = self.notifier.stats_updated().await {
            // No popup open.
            log::trace!("{}", e);
        }
        Ok(stats)
    }

    /// Match feedback from the declarative ruleset.
    pub async fn on_rule_matched(&self, rule_id: i64) {
        if !COUNTED_RULE_IDS.contains(&rule_id) {
            return;
        }
        if let Err(e) = self.record_match().await {
            log::warn!("rule match {} not counted: {}", rule_id, e);
        }
    }

    // =========================================================================
    // Pre-navigation Hook
    // =========================================================================

    pub async fn on_before_navigate(&self, event: &NavigationEvent) -> NavigationOutcome {
        self.handle_navigation(event, NavigationSource::BeforeNavigate).await
    }

    pub async fn on_history_state_updated(&self, event: &NavigationEvent) -> NavigationOutcome {
        self.handle_navigation(event, NavigationSource::HistoryStateUpdated).await
    }

    async fn handle_navigation(&self, event: &NavigationEvent, source: NavigationSource) -> NavigationOutcome {
        if !event.is_main_frame() {
            return NavigationOutcome::Ignored;
        }

        {
            let mut pending = self.pending();
            match pending.get(&event.tab_id).map(|p| p.source == event.url) {
                Some(true) => return NavigationOutcome::Duplicate,
                Some(false) => {
                    pending.remove(&event.tab_id);
                }
                None => {}
            }
        }

        if !is_monitored_host(&event.url) {
            return NavigationOutcome::Ignored;
        }

        match self.gate.is_enabled().await {
            Ok(true) => {}
            Ok(false) => {
                log::debug!("[{}] disabled, skipping {}", source.as_str(), event.url);
                return NavigationOutcome::Disabled;
            }
            Err(e) => {
                log::warn!("[{}] could not read enabled flag: {}", source.as_str(), e);
                return NavigationOutcome::Failed;
            }
        }

        let Some(target) = classify(&event.url).rewritten else {
            return NavigationOutcome::NoRewrite;
        };

        self.pending().insert(
            event.tab_id,
            PendingRedirect {
                source: event.url.clone(),
            },
        );

        log::info!("[{}] tab {}: {} -> {}", source.as_str(), event.tab_id, event.url, target);
        if let Err(e) = self.navigator.update_tab(event.tab_id, &target).await {
            log::warn!("{}", e);
            self.pending().remove(&event.tab_id);
            return NavigationOutcome::Failed;
        }

        if let Err(e) = self.record_match().await {
            log::warn!("redirect not counted: {}", e);
        }
        NavigationOutcome::Redirected(target)
    }

    fn pending(&self) -> MutexGuard<'_, HashMap<i64, PendingRedirect>> {
        match self.pending.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[cfg(feature = "runtime")]
#[async_trait::async_trait]
impl crate::monitor::MatchReporter for Background {
    async fn redirect_issued(&self, from: &str, to: &str) {
        log::debug!("page redirected {} -> {}", from, to);
        if let Err(e) = self.record_match().await {
            log::warn!("redirect not counted: {}", e);
        }
    }
}

//! Core type definitions for NoCookie
//!
//! These types cross the boundary to the extension shell, so the serde
//! representations match what the JS side reads and writes.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// Classification
// =============================================================================

/// Result of classifying a single URL.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UrlClassification {
    /// The URL points at a playable video on the canonical site
    pub is_video: bool,
    /// No-cookie equivalent, present only when it differs from the input
    pub rewritten: Option<String>,
}

// =============================================================================
// Navigation Events
// =============================================================================

/// Frame id the browser assigns to a tab's top-level document.
pub const MAIN_FRAME_ID: i64 = 0;

/// Navigation notification delivered by the host browser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigationEvent {
    pub url: String,
    pub frame_id: i64,
    pub tab_id: i64,
}

impl NavigationEvent {
    pub fn new(url: impl Into<String>, frame_id: i64, tab_id: i64) -> Self {
        Self {
            url: url.into(),
            frame_id,
            tab_id,
        }
    }

    /// Only top-level documents are redirected.
    #[inline]
    pub fn is_main_frame(&self) -> bool {
        self.frame_id == MAIN_FRAME_ID
    }
}

/// Which browser signal produced a navigation check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NavigationSource {
    /// Privileged hook fired before the document loads
    BeforeNavigate,
    /// Privileged hook fired for a history API route change
    HistoryStateUpdated,
}

impl NavigationSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BeforeNavigate => "before-navigate",
            Self::HistoryStateUpdated => "history-state",
        }
    }
}

// =============================================================================
// Redirect Statistics
// =============================================================================

/// Persisted redirect counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RedirectStats {
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub today: u64,
    #[serde(default)]
    pub last_redirect_at: Option<DateTime<Utc>>,
    // A record without a reset date never matches today, so the first load
    // rolls it over and writes it back complete.
    #[serde(default = "unknown_reset_date")]
    pub last_reset_date: NaiveDate,
}

fn unknown_reset_date() -> NaiveDate {
    NaiveDate::MIN
}

impl RedirectStats {
    /// Fresh counters whose day starts on `today`.
    pub fn new(today: NaiveDate) -> Self {
        Self {
            total: 0,
            today: 0,
            last_redirect_at: None,
            last_reset_date: today,
        }
    }

    /// Reset the daily counter if `today` differs from the stored reset date.
    /// Returns true when anything changed.
    pub fn roll_over(&mut self, today: NaiveDate) -> bool {
        if self.last_reset_date == today {
            return false;
        }
        self.today = 0;
        self.last_reset_date = today;
        true
    }

    /// Clamp a record read from storage so that `today <= total` holds.
    /// Returns true when the record had to be repaired.
    pub fn repair(&mut self) -> bool {
        if self.today > self.total {
            self.today = self.total;
            return true;
        }
        false
    }

    /// Count one redirect at `now`.
    pub fn record(&mut self, now: DateTime<Utc>) {
        self.total = self.total.saturating_add(1);
        self.today = self.today.saturating_add(1);
        self.last_redirect_at = Some(now);
    }
}

// =============================================================================
// Badge
// =============================================================================

/// RGBA badge background.
pub type BadgeColor = [u8; 4];

/// Badge colour while redirects are enabled.
pub const BADGE_ENABLED_COLOR: BadgeColor = [0, 200, 83, 255];

/// Badge colour while redirects are disabled.
pub const BADGE_DISABLED_COLOR: BadgeColor = [128, 128, 128, 255];

/// Text and colour for the toolbar badge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BadgeState {
    pub text: String,
    pub color: BadgeColor,
}

impl BadgeState {
    /// Today's count when enabled, blank when disabled.
    pub fn from_state(enabled: bool, stats: &RedirectStats) -> Self {
        if enabled {
            Self {
                text: stats.today.to_string(),
                color: BADGE_ENABLED_COLOR,
            }
        } else {
            Self {
                text: String::new(),
                color: BADGE_DISABLED_COLOR,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn stats_serialize_camel_case() {
        let stats = RedirectStats::new(date(2026, 10, 16));
        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "total": 0,
                "today": 0,
                "lastRedirectAt": null,
                "lastResetDate": "2026-10-16"
            })
        );
    }

    #[test]
    fn roll_over_resets_only_today() {
        let mut stats = RedirectStats {
            total: 9,
            today: 5,
            last_redirect_at: None,
            last_reset_date: date(2026, 10, 15),
        };
        assert!(stats.roll_over(date(2026, 10, 16)));
        assert_eq!(stats.today, 0);
        assert_eq!(stats.total, 9);
        assert!(!stats.roll_over(date(2026, 10, 16)));
    }

    #[test]
    fn repair_clamps_today() {
        let mut stats = RedirectStats {
            total: 2,
            today: 7,
            last_redirect_at: None,
            last_reset_date: date(2026, 10, 16),
        };
        assert!(stats.repair());
        assert_eq!(stats.today, 2);
        assert!(!stats.repair());
    }

    #[test]
    fn navigation_event_from_browser_json() {
        let event: NavigationEvent = serde_json::from_str(
            r#"{"url":"https://youtu.be/x","frameId":0,"tabId":12}"#,
        )
        .unwrap();
        assert!(event.is_main_frame());
        assert_eq!(event.tab_id, 12);
    }

    #[test]
    fn badge_blank_when_disabled() {
        let mut stats = RedirectStats::new(date(2026, 10, 16));
        stats.today = 3;
        stats.total = 3;
        assert_eq!(BadgeState::from_state(true, &stats).text, "3");
        let off = BadgeState::from_state(false, &stats);
        assert_eq!(off.text, "");
        assert_eq!(off.color, BADGE_DISABLED_COLOR);
    }
}

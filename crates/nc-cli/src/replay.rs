//! Replay recorded navigation events through the pre-navigation hook
//!
//! Input is JSON lines, one event per line:
//!
//! ```text
//! {"url": "https://www.youtube.com/watch?v=abc", "tabId": 3, "frameId": 0}
//! {"url": "https://www.youtube.com/shorts/xyz", "tabId": 3, "frameId": 0, "kind": "historyStateUpdated"}
//! ```

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use nc_core::background::{Background, NavigationOutcome};
use nc_core::error::PlatformError;
use nc_core::platform::TabNavigator;
use nc_core::types::NavigationEvent;
use serde::Deserialize;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EventKind {
    #[default]
    BeforeNavigate,
    HistoryStateUpdated,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReplayRecord {
    #[serde(flatten)]
    pub event: NavigationEvent,
    #[serde(default)]
    pub kind: EventKind,
}

/// Navigator that records tab updates instead of performing them.
#[derive(Default)]
pub struct RecordingNavigator {
    updates: Mutex<Vec<(i64, String)>>,
}

impl RecordingNavigator {
    pub fn updates(&self) -> Vec<(i64, String)> {
        match self.updates.lock() {
            Ok(updates) => updates.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

#[async_trait]
impl TabNavigator for RecordingNavigator {
    async fn update_tab(&self, tab_id: i64, url: &str) -> Result<(), PlatformError> {
        let mut updates = self.updates.lock().map_err(|_| PlatformError::Navigation {
            tab_id,
            reason: "navigator lock poisoned".to_string(),
        })?;
        updates.push((tab_id, url.to_string()));
        Ok(())
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReplayReport {
    pub events: usize,
    pub redirects: usize,
    pub skipped_lines: usize,
}

pub fn parse_events(content: &str) -> (Vec<ReplayRecord>, usize) {
    let mut records = Vec::new();
    let mut skipped = 0;

    for (lineno, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        match serde_json::from_str::<ReplayRecord>(line) {
            Ok(record) => records.push(record),
            Err(e) => {
                log::warn!("line {}: {}", lineno + 1, e);
                skipped += 1;
            }
        }
    }

    (records, skipped)
}

/// Feed every record through the hook, printing each redirect.
pub async fn replay(background: &Background, records: &[ReplayRecord]) -> ReplayReport {
    let mut report = ReplayReport::default();

    for record in records {
        report.events += 1;
        let outcome = match record.kind {
            EventKind::BeforeNavigate => background.on_before_navigate(&record.event).await,
            EventKind::HistoryStateUpdated => background.on_history_state_updated(&record.event).await,
        };

        match outcome {
            NavigationOutcome::Redirected(target) => {
                report.redirects += 1;
                println!("tab {}: {} -> {}", record.event.tab_id, record.event.url, target);
            }
            other => log::debug!("tab {}: {} ({:?})", record.event.tab_id, record.event.url, other),
        }
    }

    report
}

//! Drive the in-page monitor from a line stream
//!
//! Each input line is a new `location.href`. The first line is the initial
//! document load; later lines arrive as `history.pushState` calls, the way a
//! single-page app changes routes.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use nc_core::background::Background;
use nc_core::config::MonitorConfig;
use nc_core::error::PlatformError;
use nc_core::monitor::{MonitorSummary, NavigationMonitor, PageSignal};
use nc_core::platform::PageHost;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc;

/// Simulated page whose location is set from input lines.
#[derive(Default)]
pub struct LinePage {
    location: Mutex<String>,
    replaced: Mutex<Vec<String>>,
}

impl LinePage {
    pub fn navigate(&self, url: &str) {
        if let Ok(mut location) = self.location.lock() {
            *location = url.to_string();
        }
    }

    pub fn replaced(&self) -> Vec<String> {
        self.replaced.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl PageHost for LinePage {
    fn current_url(&self) -> String {
        self.location.lock().map(|l| l.clone()).unwrap_or_default()
    }

    async fn replace_location(&self, url: &str) -> Result<(), PlatformError> {
        let mut location = self
            .location
            .lock()
            .map_err(|_| PlatformError::Location("page lock poisoned".to_string()))?;
        println!("{} -> {}", location, url);
        *location = url.to_string();
        drop(location);

        if let Ok(mut replaced) = self.replaced.lock() {
            replaced.push(url.to_string());
        }
        Ok(())
    }
}

pub async fn watch<R>(
    background: Arc<Background>,
    page: Arc<LinePage>,
    config: MonitorConfig,
    input: R,
) -> Result<MonitorSummary, String>
where
    R: AsyncBufRead + Unpin,
{
    let (tx, rx) = mpsc::channel(64);
    // Lets the last pending check fire before the channel closes.
    let drain = config.history_delay() + config.settle_delay() * 2;

    let monitor = NavigationMonitor::new(page.clone(), background.gate(), config).with_reporter(background);
    let task = tokio::spawn(monitor.run(rx));

    let mut lines = input.lines();
    let mut loaded = false;
    while let Some(line) = lines
        .next_line()
        .await
        .map_err(|e| format!("Failed to read input: {}", e))?
    {
        let url = line.trim();
        if url.is_empty() {
            continue;
        }
        page.navigate(url);

        let signal = if loaded { PageSignal::HistoryPushed } else { PageSignal::Loaded };
        loaded = true;
        if tx.send(signal).await.is_err() {
            break;
        }
    }

    tokio::time::sleep(drain).await;
    drop(tx);

    task.await.map_err(|e| format!("Monitor task failed: {}", e))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use nc_core::clock::SystemClock;
    use nc_core::platform::Platform;
    use nc_core::storage::{keys, KeyValueStore, MemoryStore};
    use serde_json::json;
    use tokio::io::{AsyncWriteExt, BufReader};

    use super::*;
    use crate::replay::RecordingNavigator;

    fn background(store: Arc<MemoryStore>) -> Arc<Background> {
        Arc::new(Background::new(
            store,
            Arc::new(SystemClock),
            Platform::headless(Arc::new(RecordingNavigator::default())),
        ))
    }

    #[tokio::test(start_paused = true)]
    async fn same_document_route_change_is_redirected() {
        let background = background(Arc::new(MemoryStore::new()));
        let page = Arc::new(LinePage::default());

        // Second location arrives well after the first check has settled.
        let (mut writer, reader) = tokio::io::duplex(256);
        let feeder = tokio::spawn(async move {
            writer.write_all(b"https://www.youtube.com/\n").await.unwrap();
            tokio::time::sleep(Duration::from_millis(500)).await;
            writer.write_all(b"\nhttps://www.youtube.com/watch?v=abc\n").await.unwrap();
        });

        let summary = watch(
            background.clone(),
            page.clone(),
            MonitorConfig::default(),
            BufReader::new(reader),
        )
        .await
        .unwrap();
        feeder.await.unwrap();

        assert_eq!(summary.checks, 2);
        assert_eq!(summary.redirects, 1);
        assert_eq!(page.replaced(), vec!["https://www.yout-ube.com/watch?v=abc".to_string()]);
        assert_eq!(page.current_url(), "https://www.yout-ube.com/watch?v=abc");

        let (_, stats) = background.state().await.unwrap();
        assert_eq!(stats.total, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn initial_load_of_video_is_redirected() {
        let background = background(Arc::new(MemoryStore::new()));
        let page = Arc::new(LinePage::default());

        let input: &[u8] = b"https://www.youtube.com/watch?v=abc\n";
        let summary = watch(background, page.clone(), MonitorConfig::default(), input)
            .await
            .unwrap();

        assert_eq!((summary.checks, summary.redirects), (1, 1));
        assert_eq!(page.replaced(), vec!["https://www.yout-ube.com/watch?v=abc".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn disabled_store_leaves_page_alone() {
        let store = Arc::new(MemoryStore::new());
        store.set(keys::ENABLED, json!(false)).await.unwrap();
        let page = Arc::new(LinePage::default());

        let input: &[u8] = b"https://youtu.be/abc\n";
        let summary = watch(background(store), page.clone(), MonitorConfig::default(), input)
            .await
            .unwrap();

        assert_eq!(summary.redirects, 0);
        assert!(page.replaced().is_empty());
    }
}

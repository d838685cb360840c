//! In-page navigation monitor
//!
//! The host site routes client-side, so a page can move to a video without
//! a real navigation. The monitor collects every hint that the location may
//! have changed (initial load, history API calls, DOM mutations, a slow
//! poll), waits for the page to settle, and runs the classifier once per
//! distinct URL.
//!
//! [`MonitorMachine`] holds the state and does no I/O; time is passed in as
//! an offset from an arbitrary origin. [`NavigationMonitor`] drives it with
//! tokio timers (feature `runtime`). The wasm bindings drive the same
//! machine from JS timers.

use std::time::Duration;

// =============================================================================
// State Machine
// =============================================================================

/// Monitor state for one page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MonitorState {
    /// Nothing to do.
    Idle,
    /// A check for `url` is scheduled at `due`, or running when `due` is None.
    CheckPending {
        url: String,
        due: Option<Duration>,
        ticket: u64,
    },
    /// A redirect to `target` has been requested and not yet returned.
    Redirecting { target: String },
}

/// Handle for a check that has started. Results for superseded tickets are
/// discarded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckTicket {
    pub url: String,
    id: u64,
}

#[derive(Debug, Clone)]
pub struct MonitorMachine {
    state: MonitorState,
    settle_delay: Duration,
    last_observed: Option<String>,
    last_processed: Option<String>,
    next_ticket: u64,
}

impl MonitorMachine {
    pub fn new(settle_delay: Duration) -> Self {
        Self {
            state: MonitorState::Idle,
            settle_delay,
            last_observed: None,
            last_processed: None,
            next_ticket: 0,
        }
    }

    pub fn state(&self) -> &MonitorState {
        &self.state
    }

    pub fn is_redirecting(&self) -> bool {
        matches!(self.state, MonitorState::Redirecting { .. })
    }

    /// Initial page load. Schedules a check even though nothing changed yet.
    pub fn page_loaded(&mut self, url: &str, now: Duration) -> bool {
        if self.is_redirecting() {
            return false;
        }
        self.last_observed = Some(url.to_string());
        self.schedule(url, now);
        true
    }

    /// A location reading from any signal. Schedules a check when it differs
    /// from the previous reading. Returns true if a check was (re)scheduled.
    pub fn url_observed(&mut self, url: &str, now: Duration) -> bool {
        if self.is_redirecting() {
            return false;
        }
        if self.last_observed.as_deref() == Some(url) {
            return false;
        }
        log::debug!("url changed from {:?} to {}", self.last_observed, url);
        self.last_observed = Some(url.to_string());
        self.schedule(url, now);
        true
    }

    /// Replace any pending check with one for `url`.
    fn schedule(&mut self, url: &str, now: Duration) {
        self.next_ticket += 1;
        self.state = MonitorState::CheckPending {
            url: url.to_string(),
            due: Some(now + self.settle_delay),
            ticket: self.next_ticket,
        };
    }

    /// When the pending check becomes due.
    pub fn deadline(&self) -> Option<Duration> {
        match &self.state {
            MonitorState::CheckPending { due, .. } => *due,
            _ => None,
        }
    }

    /// Start the pending check if it is due.
    ///
    /// Returns None when nothing is due, or when the candidate was already
    /// processed (the state drops back to idle in that case).
    pub fn begin_check(&mut self, now: Duration) -> Option<CheckTicket> {
        match self.deadline() {
            Some(at) if at <= now => {}
            _ => return None,
        }

        let (url, ticket) = match &mut self.state {
            MonitorState::CheckPending { url, due, ticket } => {
                *due = None;
                (url.clone(), *ticket)
            }
            _ => return None,
        };

        if self.last_processed.as_deref() == Some(url.as_str()) {
            log::debug!("skipping already processed url {}", url);
            self.state = MonitorState::Idle;
            return None;
        }

        Some(CheckTicket { url, id: ticket })
    }

    /// Record the result of a check. `rewrite` is the classifier output, or
    /// None when redirects are disabled.
    ///
    /// Returns the redirect target when the page must be redirected.
    pub fn finish_check(&mut self, ticket: CheckTicket, rewrite: Option<String>) -> Option<String> {
        let current = match &self.state {
            MonitorState::CheckPending { ticket: id, due: None, .. } => *id,
            _ => 0,
        };
        if current != ticket.id {
            log::debug!("discarding stale check for {}", ticket.url);
            return None;
        }

        self.last_processed = Some(ticket.url.clone());
        match rewrite {
            Some(target) if target != ticket.url => {
                self.state = MonitorState::Redirecting {
                    target: target.clone(),
                };
                Some(target)
            }
            _ => {
                self.state = MonitorState::Idle;
                None
            }
        }
    }

    /// The redirect call returned. Failures are not retried.
    pub fn redirect_finished(&mut self) {
        if self.is_redirecting() {
            self.state = MonitorState::Idle;
        }
    }
}

// =============================================================================
// Async Runner
// =============================================================================

#[cfg(feature = "runtime")]
pub use runner::*;

#[cfg(feature = "runtime")]
mod runner {
    use std::sync::Arc;

    use async_trait::async_trait;
    use tokio::sync::mpsc;
    use tokio::time::{self, Instant, MissedTickBehavior};

    use super::MonitorMachine;
    use crate::config::MonitorConfig;
    use crate::gate::EnablementGate;
    use crate::platform::PageHost;
    use crate::url::rewrite_url;

    /// Hints from the page that the location may have changed.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum PageSignal {
        /// Document finished its initial load
        Loaded,
        /// `history.pushState` was called
        HistoryPushed,
        /// `history.replaceState` was called
        HistoryReplaced,
        /// Back/forward navigation
        PopState,
        /// The document head changed (title, meta)
        DomMutated,
    }

    impl PageSignal {
        fn is_history(&self) -> bool {
            matches!(self, Self::HistoryPushed | Self::HistoryReplaced | Self::PopState)
        }
    }

    /// Receives redirects the monitor issued.
    #[async_trait]
    pub trait MatchReporter: Send + Sync {
        async fn redirect_issued(&self, from: &str, to: &str);
    }

    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
    pub struct MonitorSummary {
        pub checks: usize,
        pub redirects: usize,
    }

    pub struct NavigationMonitor {
        page: Arc<dyn PageHost>,
        gate: Arc<EnablementGate>,
        reporter: Option<Arc<dyn MatchReporter>>,
        config: MonitorConfig,
    }

    impl NavigationMonitor {
        pub fn new(page: Arc<dyn PageHost>, gate: Arc<EnablementGate>, config: MonitorConfig) -> Self {
            Self {
                page,
                gate,
                reporter: None,
                config,
            }
        }

        pub fn with_reporter(mut self, reporter: Arc<dyn MatchReporter>) -> Self {
            self.reporter = Some(reporter);
            self
        }

        /// Run until the signal channel closes.
        pub async fn run(self, mut signals: mpsc::Receiver<PageSignal>) -> MonitorSummary {
            let origin = Instant::now();
            let mut machine = MonitorMachine::new(self.config.settle_delay());
            let mut summary = MonitorSummary::default();

            let mut poll = time::interval_at(origin + self.config.poll_interval(), self.config.poll_interval());
            poll.set_missed_tick_behavior(MissedTickBehavior::Delay);

            // Pending re-read after a history call; a newer call replaces it.
            let mut history_recheck: Option<Instant> = None;

            loop {
                let check_at = machine.deadline().map(|due| origin + due);

                tokio::select! {
                    signal = signals.recv() => match signal {
                        None => break,
                        Some(PageSignal::Loaded) => {
                            machine.page_loaded(&self.page.current_url(), origin.elapsed());
                        }
                        Some(signal) if signal.is_history() => {
                            history_recheck = Some(Instant::now() + self.config.history_delay());
                        }
                        Some(_) => {
                            machine.url_observed(&self.page.current_url(), origin.elapsed());
                        }
                    },
                    _ = poll.tick() => {
                        machine.url_observed(&self.page.current_url(), origin.elapsed());
                    }
                    _ = sleep_until_opt(history_recheck) => {
                        history_recheck = None;
                        machine.url_observed(&self.page.current_url(), origin.elapsed());
                    }
                    _ = sleep_until_opt(check_at) => {
                        self.check(&mut machine, origin, &mut summary).await;
                    }
                }
            }

            summary
        }

        async fn check(&self, machine: &mut MonitorMachine, origin: Instant, summary: &mut MonitorSummary) {
            let Some(ticket) = machine.begin_check(origin.elapsed()) else {
                return;
            };
            summary.checks += 1;

            let rewrite = match self.gate.is_enabled().await {
                Ok(true) => rewrite_url(&ticket.url),
                Ok(false) => {
                    log::debug!("redirects disabled, leaving {}", ticket.url);
                    None
                }
                Err(e) => {
                    log::warn!("could not read enabled flag, leaving {}: {}", ticket.url, e);
                    None
                }
            };

            let from = ticket.url.clone();
            let Some(target) = machine.finish_check(ticket, rewrite) else {
                return;
            };

            log::info!("redirecting page {} -> {}", from, target);
            match self.page.replace_location(&target).await {
                Ok(()) => {
                    summary.redirects += 1;
                    if let Some(reporter) = &self.reporter {
                        reporter.redirect_issued(&from, &target).await;
                    }
                }
                Err(e) => log::warn!("page redirect failed: {}", e),
            }
            machine.redirect_finished();
        }
    }

    async fn sleep_until_opt(at: Option<Instant>) {
        match at {
            Some(at) => time::sleep_until(at).await,
            None => std::future::pending().await,
        }
    }
}

//! The reload agent event loop.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use notify::Event;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, Interval, MissedTickBehavior};

use crate::agent::debounce::Debouncer;
use crate::agent::state::AgentState;
use crate::agent::watch::{WatchEvents, WatchTargets};
use crate::config::Config;
use crate::lifecycle::trigger::{FireOnDrop, Trigger, TriggerListener};
use crate::observability::metrics;
use crate::tls::pair::unix_seconds;
use crate::tls::{CertificatePair, CertificateStore};

/// Agent tuning, fixed at construction.
#[derive(Debug, Clone)]
pub struct AgentSettings {
    pub cert_path: PathBuf,
    pub key_path: PathBuf,
    /// Minimum spacing between successful file-triggered reloads. Zero disables.
    pub debounce: Duration,
    /// Period of the expiry fallback check. `None` disables it.
    pub check_interval: Option<Duration>,
    /// Reload on the fallback tick when less validity than this remains.
    pub expiry_warning: Duration,
}

impl AgentSettings {
    pub fn from_config(config: &Config) -> Self {
        let features = &config.features;
        Self {
            cert_path: PathBuf::from(&config.tls.cert_path),
            key_path: PathBuf::from(&config.tls.key_path),
            debounce: if features.debounce_file_changes {
                config.timings.debounce_interval()
            } else {
                Duration::ZERO
            },
            check_interval: features
                .periodic_cert_check
                .then(|| config.timings.cert_watch_interval()),
            expiry_warning: config.timings.cert_expiry_warning(),
        }
    }
}

/// Why the agent loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentExit {
    /// The stop signal fired.
    Stopped,
    /// The watcher's event feed closed.
    EventsClosed,
    /// The watcher's error feed closed.
    ErrorsClosed,
    /// The watcher could not be created; the loop never ran.
    WatchUnavailable,
}

/// Final report handed back when the agent task finishes.
#[derive(Debug)]
pub struct AgentOutcome {
    pub exit: AgentExit,
    pub state: AgentState,
}

#[derive(Debug, Clone, Copy)]
enum ReloadTrigger {
    FileChange,
    Fallback,
}

impl ReloadTrigger {
    fn as_str(self) -> &'static str {
        match self {
            ReloadTrigger::FileChange => "file_change",
            ReloadTrigger::Fallback => "fallback",
        }
    }
}

/// Watches the certificate files and keeps the store current.
pub struct ReloadAgent {
    settings: AgentSettings,
    targets: WatchTargets,
    store: Arc<CertificateStore>,
    state: AgentState,
    debouncer: Debouncer,
}

impl ReloadAgent {
    /// The store's current pair becomes the agent's bootstrap pair.
    pub fn new(settings: AgentSettings, store: Arc<CertificateStore>) -> Self {
        let state = AgentState::new(store.lookup());
        Self {
            targets: WatchTargets::new(&settings.cert_path, &settings.key_path),
            debouncer: Debouncer::new(settings.debounce),
            settings,
            store,
            state,
        }
    }

    /// Run on a Tokio task; `done` fires when the task ends, however it ends.
    pub fn spawn(self, stop: TriggerListener, done: Trigger) -> JoinHandle<AgentOutcome> {
        tokio::spawn(async move {
            let _done = FireOnDrop(done);
            self.run(stop).await
        })
    }

    /// Start the file watcher and run the loop until stopped.
    ///
    /// A watcher that cannot be created ends the agent immediately; the
    /// store keeps its current pair.
    pub async fn run(self, stop: TriggerListener) -> AgentOutcome {
        match WatchEvents::start(&self.targets) {
            Ok(watch) => self.run_with(watch, stop).await,
            Err(e) => {
                tracing::error!(
                    error = %e,
                    cert = %self.settings.cert_path.display(),
                    key = %self.settings.key_path.display(),
                    "Failed to start certificate watcher, current certificate stays in service"
                );
                AgentOutcome {
                    exit: AgentExit::WatchUnavailable,
                    state: self.state,
                }
            }
        }
    }

    /// Run the loop over an existing event feed.
    pub async fn run_with(mut self, mut watch: WatchEvents, mut stop: TriggerListener) -> AgentOutcome {
        let mut ticker = self.settings.check_interval.and_then(expiry_ticker);

        tracing::info!(
            debounce_ms = self.debouncer.window().as_millis() as u64,
            check_interval_secs = self.settings.check_interval.map(|d| d.as_secs()),
            "Reload agent running"
        );

        let exit = loop {
            if stop.is_fired() {
                break AgentExit::Stopped;
            }

            tokio::select! {
                _ = stop.fired() => break AgentExit::Stopped,
                event = watch.events.recv() => match event {
                    Some(event) => self.on_file_event(event).await,
                    None => {
                        tracing::warn!("Watcher event feed closed, agent exiting");
                        break AgentExit::EventsClosed;
                    }
                },
                error = watch.errors.recv() => match error {
                    Some(e) => tracing::warn!(error = %e, "Watcher error"),
                    None => {
                        tracing::warn!("Watcher error feed closed, agent exiting");
                        break AgentExit::ErrorsClosed;
                    }
                },
                _ = next_tick(&mut ticker) => self.on_tick().await,
            }

            self.state.last_run = Some(Instant::now());
        };

        drop(watch);
        tracing::info!(
            exit = ?exit,
            reloads = self.state.stats.successes,
            failures = self.state.stats.failures,
            "Reload agent stopped"
        );

        AgentOutcome {
            exit,
            state: self.state,
        }
    }

    async fn on_file_event(&mut self, event: Event) {
        if !self.targets.is_relevant(&event) {
            tracing::trace!(kind = ?event.kind, paths = ?event.paths, "Ignoring file event");
            return;
        }

        if !self.debouncer.admits(Instant::now()) {
            self.state.stats.debounced += 1;
            metrics::record_debounced();
            tracing::debug!(paths = ?event.paths, "Debouncing rapid certificate file change");
            return;
        }

        tracing::info!(paths = ?event.paths, "Certificate file change detected");
        if self.reload(ReloadTrigger::FileChange).await {
            self.debouncer.record_success(Instant::now());
        }
    }

    async fn on_tick(&mut self) {
        let validity = self.state.current.validity();
        if !validity.expires_within(self.settings.expiry_warning, SystemTime::now()) {
            return;
        }

        tracing::warn!(
            not_after = unix_seconds(validity.not_after),
            "Certificate nearing expiry, attempting reload"
        );
        self.state.stats.fallback_attempts += 1;
        if self.reload(ReloadTrigger::Fallback).await {
            self.debouncer.record_success(Instant::now());
        }
    }

    /// Load, then publish. On failure nothing changes.
    async fn reload(&mut self, trigger: ReloadTrigger) -> bool {
        self.state.stats.attempts += 1;

        match CertificatePair::load(&self.settings.cert_path, &self.settings.key_path).await {
            Ok(pair) => {
                let pair = Arc::new(pair);
                let not_after = unix_seconds(pair.validity().not_after);
                self.state.advance(Arc::clone(&pair));
                self.store.publish(pair);
                self.state.stats.successes += 1;

                metrics::record_reload(trigger.as_str(), true);
                metrics::record_certificate_expiry(not_after);
                tracing::info!(trigger = trigger.as_str(), not_after, "Certificate reloaded");
                true
            }
            Err(e) => {
                self.state.stats.failures += 1;
                metrics::record_reload(trigger.as_str(), false);
                tracing::warn!(
                    trigger = trigger.as_str(),
                    error = %e,
                    "Certificate reload failed, keeping current certificate"
                );
                false
            }
        }
    }
}

/// Ticker for the expiry check, first firing one period from now.
///
/// A period too large to schedule disables the check instead of panicking.
fn expiry_ticker(period: Duration) -> Option<Interval> {
    let Some(start) = Instant::now().checked_add(period) else {
        tracing::warn!(
            period_secs = period.as_secs(),
            "Expiry check interval too large to schedule, periodic check disabled"
        );
        return None;
    };
    let mut ticker = time::interval_at(start, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    Some(ticker)
}

async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => std::future::pending().await,
    }
}

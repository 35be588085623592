//! Background reminder trigger loop.
//!
//! The loop polls the store on a fixed interval.  Each poll marks every due
//! reminder as triggered (under the store's lock) and then announces it
//! through the configured [`Notifier`].  Because marking happens before
//! notifying, a reminder is announced at most once even if announcing is
//! slow or fails.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::{DateTime, Local};
use ethos_adapters::Notifier;
use ethos_store::ReminderStore;
use tokio::sync::Notify;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::error::{IntentError, Result};

/// Default poll interval.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Polls a [`ReminderStore`] and announces due reminders.
pub struct ReminderScheduler {
    store: Arc<ReminderStore>,
    notifier: Arc<dyn Notifier>,
    interval: Duration,
    running: Arc<AtomicBool>,
    shutdown: Arc<Notify>,
    handle: Option<tokio::task::JoinHandle<()>>,
}

impl ReminderScheduler {
    /// Create a stopped scheduler with the default interval.
    pub fn new(store: Arc<ReminderStore>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            store,
            notifier,
            interval: DEFAULT_POLL_INTERVAL,
            running: Arc::new(AtomicBool::new(false)),
            shutdown: Arc::new(Notify::new()),
            handle: None,
        }
    }

    /// Override the poll interval.  Zero is raised to one second.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval.max(Duration::from_secs(1));
        self
    }

    /// The configured poll interval.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Run one poll as of `now`; returns how many reminders fired.
    pub async fn scan_at(&self, now: DateTime<Local>) -> usize {
        scan(&self.store, self.notifier.as_ref(), now).await
    }

    /// Start the background loop.
    ///
    /// The first poll runs immediately.  Errors if the loop is already
    /// running.
    pub fn start(&mut self) -> Result<()> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(IntentError::SchedulerRunning);
        }

        // Fresh signal so a permit left over from an earlier stop is dropped.
        self.shutdown = Arc::new(Notify::new());

        let store = Arc::clone(&self.store);
        let notifier = Arc::clone(&self.notifier);
        let running = Arc::clone(&self.running);
        let shutdown = Arc::clone(&self.shutdown);
        let period = self.interval;

        let handle = tokio::spawn(async move {
            info!(interval_secs = period.as_secs(), "reminder scheduler started");

            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            while running.load(Ordering::SeqCst) {
                tokio::select! {
                    _ = ticker.tick() => {
                        let fired = scan(&store, notifier.as_ref(), Local::now()).await;
                        if fired > 0 {
                            debug!(fired, "poll complete");
                        }
                    }
                    _ = shutdown.notified() => break,
                }
            }

            info!("reminder scheduler stopped");
        });

        self.handle = Some(handle);
        Ok(())
    }

    /// Stop the background loop and wait for it to finish.
    pub async fn stop(&mut self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            warn!("stop called but reminder scheduler is not running");
            return;
        }

        self.shutdown.notify_one();

        if let Some(handle) = self.handle.take()
            && let Err(e) = handle.await
        {
            error!(error = %e, "reminder scheduler task panicked during shutdown");
        }
    }

    /// Whether the background loop is running.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

impl std::fmt::Debug for ReminderScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReminderScheduler")
            .field("store", &self.store.path())
            .field("interval", &self.interval)
            .field("running", &self.is_running())
            .finish()
    }
}

async fn scan(store: &ReminderStore, notifier: &dyn Notifier, now: DateTime<Local>) -> usize {
    let due = store.mark_and_collect_due(now);
    for reminder in &due {
        info!(
            task = %reminder.task,
            tag = %reminder.tag,
            scheduled = %reminder.time,
            "reminder triggered"
        );
        notifier.notify(&format!("Reminder: {}", reminder.task)).await;
    }
    due.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use chrono::TimeZone;

    #[derive(Default)]
    struct Recording(Mutex<Vec<String>>);

    #[async_trait]
    impl Notifier for Recording {
        async fn notify(&self, text: &str) {
            self.0.lock().unwrap().push(text.to_owned());
        }
    }

    fn at(h: u32, m: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 6, 12, h, m, 0).unwrap()
    }

    fn fixture() -> (tempfile::TempDir, Arc<ReminderStore>, Arc<Recording>) {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(ReminderStore::open(dir.path().join("reminders.json")));
        (dir, store, Arc::new(Recording::default()))
    }

    #[tokio::test]
    async fn due_reminders_fire_once() {
        let (_dir, store, notes) = fixture();
        store.add("stretch", at(9, 0), None).unwrap();
        store.add("lunch", at(12, 0), None).unwrap();

        let scheduler = ReminderScheduler::new(Arc::clone(&store), notes.clone());
        assert_eq!(scheduler.scan_at(at(10, 0)).await, 1);
        assert_eq!(scheduler.scan_at(at(10, 0)).await, 0);
        assert_eq!(scheduler.scan_at(at(12, 0)).await, 1);

        assert_eq!(*notes.0.lock().unwrap(), vec!["Reminder: stretch", "Reminder: lunch"]);
    }

    #[tokio::test]
    async fn start_stop_lifecycle() {
        let (_dir, store, notes) = fixture();
        let mut scheduler = ReminderScheduler::new(store, notes);
        assert!(!scheduler.is_running());

        scheduler.start().unwrap();
        assert!(scheduler.is_running());
        assert!(matches!(scheduler.start(), Err(IntentError::SchedulerRunning)));

        scheduler.stop().await;
        assert!(!scheduler.is_running());

        // Restartable after a stop.
        scheduler.start().unwrap();
        scheduler.stop().await;
    }

    #[tokio::test]
    async fn loop_fires_past_reminders() {
        let (_dir, store, notes) = fixture();
        store
            .add("overdue", Local::now() - chrono::Duration::minutes(1), None)
            .unwrap();

        let mut scheduler = ReminderScheduler::new(Arc::clone(&store), notes.clone());
        scheduler.start().unwrap();

        // The first tick is immediate.
        for _ in 0..50 {
            if !notes.0.lock().unwrap().is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        scheduler.stop().await;

        assert_eq!(*notes.0.lock().unwrap(), vec!["Reminder: overdue"]);
        assert!(store.list(ethos_store::ReminderView::Pending).is_empty());
    }

    #[test]
    fn interval_has_a_floor() {
        let (_dir, store, notes) = fixture();
        let scheduler = ReminderScheduler::new(store, notes).with_interval(Duration::ZERO);
        assert_eq!(scheduler.interval(), Duration::from_secs(1));
    }
}

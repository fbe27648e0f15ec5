use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Holds the latest candidate and commits it once no newer input has
/// arrived for `delay`.
#[derive(Debug, Clone)]
pub struct FixedDebounce<T> {
    delay: Duration,
    pending: Option<(T, Instant)>,
    committed: Option<T>,
}

impl<T: Clone> FixedDebounce<T> {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
            committed: None,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Applies to timers started after this call
    pub fn set_delay(&mut self, delay: Duration) {
        self.delay = delay;
    }

    /// Replaces the candidate and restarts the timer
    pub fn push(&mut self, value: T, now: Instant) {
        let delay = self.delay;
        self.push_with_delay(value, now, delay);
    }

    pub fn push_with_delay(&mut self, value: T, now: Instant, delay: Duration) {
        self.pending = Some((value, now + delay));
    }

    /// Commits and returns the candidate if its timer has fired
    pub fn poll(&mut self, now: Instant) -> Option<T> {
        match &self.pending {
            Some((_, deadline)) if now >= *deadline => {
                let (value, _) = self.pending.take()?;
                self.committed = Some(value.clone());
                Some(value)
            }
            _ => None,
        }
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|(_, deadline)| *deadline)
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Drops the candidate without committing it
    pub fn cancel(&mut self) {
        self.pending = None;
    }

    /// Last committed value
    pub fn committed(&self) -> Option<&T> {
        self.committed.as_ref()
    }
}

/// Tokio-driven debouncer publishing committed values on a `watch` channel.
/// Dropping it aborts the pending timer.
pub struct Debouncer<T> {
    delay: Duration,
    tx: Arc<watch::Sender<Option<T>>>,
    pending: Option<JoinHandle<()>>,
}

impl<T: Clone + Send + Sync + 'static> Debouncer<T> {
    pub fn new(delay: Duration) -> (Self, watch::Receiver<Option<T>>) {
        let (tx, rx) = watch::channel(None);
        (
            Self {
                delay,
                tx: Arc::new(tx),
                pending: None,
            },
            rx,
        )
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<T>> {
        self.tx.subscribe()
    }

    pub fn set_delay(&mut self, delay: Duration) {
        self.delay = delay;
    }

    pub fn push(&mut self, value: T) {
        let delay = self.delay;
        self.push_with_delay(value, delay);
    }

    pub fn push_with_delay(&mut self, value: T, delay: Duration) {
        self.cancel();
        let tx = self.tx.clone();
        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            tx.send_replace(Some(value));
        }));
    }

    pub fn cancel(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending
            .as_ref()
            .map(|handle| !handle.is_finished())
            .unwrap_or(false)
    }
}

impl<T> Drop for Debouncer<T> {
    fn drop(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }
}

//! One-shot signals used for agent stop/done and shutdown completion.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::watch;

/// A signal that fires at most once.
///
/// Firing it again is a no-op, so any number of callers may race to fire.
/// Listeners created before or after firing all observe it.
#[derive(Debug, Clone)]
pub struct Trigger {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    fired: AtomicBool,
    tx: watch::Sender<bool>,
}

impl Trigger {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self {
            inner: Arc::new(Inner {
                fired: AtomicBool::new(false),
                tx,
            }),
        }
    }

    /// Fire the signal. Returns `true` only for the call that actually fired it.
    pub fn fire(&self) -> bool {
        if self
            .inner
            .fired
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }
        self.inner.tx.send_replace(true);
        true
    }

    pub fn is_fired(&self) -> bool {
        self.inner.fired.load(Ordering::Acquire)
    }

    /// Create a listener for this signal.
    pub fn listener(&self) -> TriggerListener {
        TriggerListener {
            rx: self.inner.tx.subscribe(),
        }
    }
}

impl Default for Trigger {
    fn default() -> Self {
        Self::new()
    }
}

/// Waiting side of a [`Trigger`].
#[derive(Debug, Clone)]
pub struct TriggerListener {
    rx: watch::Receiver<bool>,
}

impl TriggerListener {
    /// Resolve once the trigger has fired.
    ///
    /// Also resolves when every `Trigger` handle was dropped without firing;
    /// nobody is left who could fire it.
    pub async fn fired(&mut self) {
        let _ = self.rx.wait_for(|fired| *fired).await;
    }

    pub fn is_fired(&self) -> bool {
        *self.rx.borrow()
    }
}

/// Fires the wrapped trigger when dropped, including during a panic unwind.
#[derive(Debug)]
pub struct FireOnDrop(pub Trigger);

impl Drop for FireOnDrop {
    fn drop(&mut self) {
        self.0.fire();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn fires_once() {
        let trigger = Trigger::new();
        assert!(!trigger.is_fired());
        assert!(trigger.fire());
        assert!(!trigger.fire());
        assert!(trigger.is_fired());
    }

    #[tokio::test]
    async fn listeners_before_and_after() {
        let trigger = Trigger::new();
        let mut early = trigger.listener();
        trigger.fire();
        let mut late = trigger.listener();

        tokio::time::timeout(Duration::from_secs(1), early.fired()).await.unwrap();
        tokio::time::timeout(Duration::from_secs(1), late.fired()).await.unwrap();
        assert!(late.is_fired());
    }

    #[tokio::test]
    async fn concurrent_fire_has_one_winner() {
        let trigger = Trigger::new();
        let mut handles = Vec::new();
        for _ in 0..8 {
            let t = trigger.clone();
            handles.push(tokio::spawn(async move { t.fire() }));
        }
        let mut winners = 0;
        for h in handles {
            if h.await.unwrap() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
    }

    #[tokio::test]
    async fn dropped_trigger_releases_listener() {
        let trigger = Trigger::new();
        let mut listener = trigger.listener();
        drop(trigger);
        tokio::time::timeout(Duration::from_secs(1), listener.fired()).await.unwrap();
    }

    #[test]
    fn fire_on_drop() {
        let trigger = Trigger::new();
        {
            let _guard = FireOnDrop(trigger.clone());
        }
        assert!(trigger.is_fired());
    }
}

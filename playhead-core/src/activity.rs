//! Ephemeral visibility state for transient playback controls.
//!
//! Purely reacts to user-activity signals; independent of playback phase.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::watch;

struct Inner {
    visible_tx: watch::Sender<bool>,
    // Generation guard: a hide timer only fires if no later activity
    // superseded it. Locked around every visibility write so a stale timer
    // cannot interleave with a racing touch().
    generation: Mutex<u64>,
}

/// Debounced show/hide state machine for on-screen controls.
///
/// Any activity shows the controls and (re)arms a hide timer; the timer
/// expiring with no intervening activity hides them again. Controls start
/// visible with no timer armed.
pub struct ActivityTimer {
    hide_after: Duration,
    inner: Arc<Inner>,
}

impl ActivityTimer {
    /// Creates a timer that hides controls `hide_after` after the last
    /// activity signal.
    pub fn new(hide_after: Duration) -> Self {
        let (visible_tx, _) = watch::channel(true);
        Self {
            hide_after,
            inner: Arc::new(Inner {
                visible_tx,
                generation: Mutex::new(0),
            }),
        }
    }

    /// Motion or keyboard activity: show the controls and (re)arm the hide
    /// timer, superseding any timer still pending.
    pub fn touch(&self) {
        let generation = {
            let mut generation = self.inner.generation.lock();
            *generation += 1;
            self.inner.visible_tx.send_replace(true);
            *generation
        };

        let inner = Arc::clone(&self.inner);
        let hide_after = self.hide_after;
        tokio::spawn(async move {
            tokio::time::sleep(hide_after).await;
            let current = inner.generation.lock();
            if *current == generation {
                inner.visible_tx.send_replace(false);
            }
        });
    }

    /// Pointer entered the controls area: force visibility without arming a
    /// hide timer. A timer already armed by earlier activity still fires;
    /// only activity signals re-arm it.
    pub fn pointer_enter(&self) {
        let _guard = self.inner.generation.lock();
        self.inner.visible_tx.send_replace(true);
    }

    pub fn is_visible(&self) -> bool {
        *self.inner.visible_tx.borrow()
    }

    /// Visibility stream for the presentation layer.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.inner.visible_tx.subscribe()
    }
}

//! Composing delay: the "typing..." pause before each step is shown.
//!
//! `Conversation` wraps a [`FlowController`] for async callers. After every
//! operation it compares the controller's pending reveal ticket against the
//! timer it is running; a changed ticket aborts the old timer and spawns a
//! new one. A timer that fires late still has to present its ticket to the
//! controller, which refuses anything but the latest.

use std::sync::{Arc, Weak};
use std::time::Duration;

use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tracing::debug;

use super::controller::FlowController;
use super::responses::{FormValues, ResponseValue};
use super::state::{FlowSnapshot, RevealTicket};
use super::transition::Transition;
use super::validate::ValidationResult;
use crate::error::FlowError;

/// Default pause before a step is revealed.
pub const DEFAULT_REVEAL_DELAY: Duration = Duration::from_millis(1200);

struct Inner {
    controller: FlowController,
    timer: Option<(RevealTicket, JoinHandle<()>)>,
    updates: watch::Sender<FlowSnapshot>,
}

impl Inner {
    fn publish(&self) {
        self.updates.send_replace(self.controller.snapshot());
    }

    fn cancel_timer(&mut self) {
        if let Some((ticket, handle)) = self.timer.take() {
            handle.abort();
            debug!(step = %ticket.step, generation = ticket.generation, "Reveal timer cancelled");
        }
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        self.cancel_timer();
    }
}

/// One respondent's conversation, with the reveal timer attached.
pub struct Conversation {
    inner: Arc<Mutex<Inner>>,
    delay: Duration,
    updates: watch::Receiver<FlowSnapshot>,
}

impl Conversation {
    /// Wrap `controller`. Call [`start`](Self::start) to begin.
    ///
    /// A zero `delay` reveals each step as soon as it is entered.
    pub fn new(controller: FlowController, delay: Duration) -> Self {
        let (tx, rx) = watch::channel(controller.snapshot());
        Self {
            inner: Arc::new(Mutex::new(Inner {
                controller,
                timer: None,
                updates: tx,
            })),
            delay,
            updates: rx,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub async fn start(&self) -> FlowSnapshot {
        let mut inner = self.inner.lock().await;
        inner.controller.start();
        self.settle(&mut inner)
    }

    pub async fn restart(&self) -> FlowSnapshot {
        let mut inner = self.inner.lock().await;
        inner.controller.restart();
        self.settle(&mut inner)
    }

    pub async fn choose(&self, value: &str) -> Result<Transition, FlowError> {
        let mut inner = self.inner.lock().await;
        let transition = inner.controller.choose(value)?;
        self.settle(&mut inner);
        Ok(transition)
    }

    pub async fn choose_many(&self, values: &[String]) -> Result<Transition, FlowError> {
        let mut inner = self.inner.lock().await;
        let transition = inner.controller.choose_many(values)?;
        self.settle(&mut inner);
        Ok(transition)
    }

    pub async fn update_field(&self, name: &str, value: ResponseValue) -> Result<(), FlowError> {
        let mut inner = self.inner.lock().await;
        inner.controller.update_field(name, value)?;
        inner.publish();
        Ok(())
    }

    pub async fn submit_form(&self, values: FormValues) -> Result<ValidationResult, FlowError> {
        let mut inner = self.inner.lock().await;
        let result = inner.controller.submit_form(values)?;
        self.settle(&mut inner);
        Ok(result)
    }

    pub async fn snapshot(&self) -> FlowSnapshot {
        self.inner.lock().await.controller.snapshot()
    }

    /// Snapshots published after every change, including reveals.
    pub fn subscribe(&self) -> watch::Receiver<FlowSnapshot> {
        self.updates.clone()
    }

    /// Wait until the current step has been revealed.
    pub async fn wait_revealed(&self) -> FlowSnapshot {
        let mut rx = self.updates.clone();
        let revealed = rx
            .wait_for(|s| !s.awaiting_display)
            .await
            .map(|snapshot| snapshot.clone());
        match revealed {
            Ok(snapshot) => snapshot,
            Err(_) => self.snapshot().await,
        }
    }

    /// Bring the timer in line with the controller's pending ticket and
    /// publish the new state.
    fn settle(&self, inner: &mut Inner) -> FlowSnapshot {
        let pending = inner.controller.pending_reveal().cloned();
        let running = inner.timer.as_ref().map(|(t, _)| t);

        if pending.as_ref() != running {
            inner.cancel_timer();
            if let Some(ticket) = pending {
                if self.delay.is_zero() {
                    inner.controller.reveal(&ticket);
                } else {
                    let handle =
                        spawn_timer(Arc::downgrade(&self.inner), ticket.clone(), self.delay);
                    inner.timer = Some((ticket, handle));
                }
            }
        }

        let snapshot = inner.controller.snapshot();
        inner.updates.send_replace(snapshot.clone());
        snapshot
    }
}

fn spawn_timer(inner: Weak<Mutex<Inner>>, ticket: RevealTicket, delay: Duration) -> JoinHandle<()> {
    debug!(
        step = %ticket.step,
        generation = ticket.generation,
        delay_ms = delay.as_millis() as u64,
        "Reveal scheduled"
    );
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        let Some(inner) = inner.upgrade() else {
            return;
        };
        let mut inner = inner.lock().await;
        if inner.controller.reveal(&ticket) {
            // Drop our own handle without aborting the running task.
            if inner.timer.as_ref().is_some_and(|(t, _)| *t == ticket) {
                inner.timer = None;
            }
            inner.publish();
        }
    })
}

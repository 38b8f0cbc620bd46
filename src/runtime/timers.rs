//! Tokio-backed periodic timers.
//!
//! Each armed timer is an interval task that pushes its event into the
//! supervisor queue. Handlers never run on the timer task itself.

use super::Event;
use crate::bridge::{TimerDriver, TimerId};
use crossbeam::channel::Sender;
use std::collections::HashMap;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant as TokioInstant, MissedTickBehavior};

/// Spawn a task that sends `event` every `period`, first after one full period.
///
/// The task ends on its own once the receiving side of the queue is gone.
pub fn spawn_ticker(
    handle: &Handle,
    period: Duration,
    events: Sender<Event>,
    event: Event,
) -> JoinHandle<()> {
    handle.spawn(async move {
        let mut ticker = interval_at(TokioInstant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            if events.send(event.clone()).is_err() {
                tracing::debug!("Event queue closed, ticker exiting");
                break;
            }
        }
    })
}

/// `TimerDriver` that maps bridge timers onto interval tasks.
pub struct TokioTimers {
    handle: Handle,
    events: Sender<Event>,
    created: Vec<TimerId>,
    running: HashMap<TimerId, JoinHandle<()>>,
}

impl TokioTimers {
    pub fn new(handle: Handle, events: Sender<Event>) -> Self {
        Self {
            handle,
            events,
            created: Vec::new(),
            running: HashMap::new(),
        }
    }

    /// Whether a timer currently has a live task.
    pub fn is_armed(&self, timer: TimerId) -> bool {
        self.running.contains_key(&timer)
    }

    fn event_for(timer: TimerId) -> Event {
        match timer {
            TimerId::OutputTick => Event::Tick,
            TimerId::InactivityCheck => Event::InactivityCheck,
        }
    }
}

impl TimerDriver for TokioTimers {
    fn create(&mut self, timer: TimerId) {
        if !self.created.contains(&timer) {
            self.created.push(timer);
            tracing::debug!("Timer {:?} created", timer);
        }
    }

    fn arm(&mut self, timer: TimerId, period: Duration) {
        if !self.created.contains(&timer) {
            tracing::warn!("Arming timer {:?} that was never created", timer);
            self.created.push(timer);
        }

        let task = spawn_ticker(
            &self.handle,
            period,
            self.events.clone(),
            Self::event_for(timer),
        );
        if let Some(previous) = self.running.insert(timer, task) {
            previous.abort();
        }

        tracing::debug!("Timer {:?} armed every {:?}", timer, period);
    }

    fn disarm(&mut self, timer: TimerId) {
        if let Some(task) = self.running.remove(&timer) {
            task.abort();
            tracing::debug!("Timer {:?} disarmed", timer);
        }
    }
}

impl Drop for TokioTimers {
    fn drop(&mut self) {
        for (_, task) in self.running.drain() {
            task.abort();
        }
    }
}

//! L4 Atomic Layer: Frame and timer queues
//!
//! Stands in for `requestAnimationFrame` and short timeouts. Frame tasks
//! queued while a frame runs wait for the next frame; timers fire in
//! deadline order, ties broken by scheduling order.

use std::collections::VecDeque;
use std::time::Instant;

#[derive(Debug)]
struct Timer<T> {
    due: Instant,
    seq: u64,
    task: T,
}

#[derive(Debug)]
pub struct Scheduler<F, T> {
    frame: VecDeque<F>,
    timers: Vec<Timer<T>>,
    seq: u64,
}

impl<F, T> Scheduler<F, T> {
    pub fn new() -> Self {
        Self {
            frame: VecDeque::new(),
            timers: Vec::new(),
            seq: 0,
        }
    }

    /// Run `task` on the next animation frame
    pub fn request_frame(&mut self, task: F) {
        self.frame.push_back(task);
    }

    /// Run `task` once the clock reaches `due`
    pub fn set_timeout(&mut self, due: Instant, task: T) {
        self.seq += 1;
        self.timers.push(Timer {
            due,
            seq: self.seq,
            task,
        });
    }

    /// Take every task queued for the frame that is about to run
    pub fn take_frame(&mut self) -> Vec<F> {
        self.frame.drain(..).collect()
    }

    /// Remove and return the earliest timer due at `now`
    pub fn pop_due(&mut self, now: Instant) -> Option<T> {
        let index = self
            .timers
            .iter()
            .enumerate()
            .filter(|(_, timer)| timer.due <= now)
            .min_by_key(|(_, timer)| (timer.due, timer.seq))
            .map(|(index, _)| index)?;
        Some(self.timers.swap_remove(index).task)
    }

    pub fn has_frame_tasks(&self) -> bool {
        !self.frame.is_empty()
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.timers.iter().map(|timer| timer.due).min()
    }

    pub fn clear(&mut self) {
        self.frame.clear();
        self.timers.clear();
    }
}

impl<F, T> Default for Scheduler<F, T> {
    fn default() -> Self {
        Self::new()
    }
}

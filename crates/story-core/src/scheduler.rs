//! Delivery scheduler: the single owner of all pending delayed deliveries.
//!
//! Tasks are ordered by (fire_at_ms, task_id), so same-instant tasks fire in
//! the order they were scheduled. Cancellation is by task id token; a full
//! `cancel_all` backs the terminal session reset.

use std::cmp::Reverse;
use std::collections::{BTreeSet, BinaryHeap};

use contracts::{Delivery, PendingDelivery};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledTask {
    pub task_id: u64,
    pub fire_at_ms: u64,
    pub delivery: Delivery,
}

/// Ordering wrapper: (fire_at_ms ASC, task_id ASC) via `Reverse` in the heap.
#[derive(Debug, Clone, PartialEq, Eq)]
struct OrderedTask(ScheduledTask);

impl PartialOrd for OrderedTask {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OrderedTask {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0
            .fire_at_ms
            .cmp(&other.0.fire_at_ms)
            .then_with(|| self.0.task_id.cmp(&other.0.task_id))
    }
}

#[derive(Debug)]
pub struct DeliveryScheduler {
    queue: BinaryHeap<Reverse<OrderedTask>>,
    live: BTreeSet<u64>,
    cancelled: BTreeSet<u64>,
    next_task_id: u64,
    now_ms: u64,
}

impl DeliveryScheduler {
    pub fn new() -> Self {
        Self {
            queue: BinaryHeap::new(),
            live: BTreeSet::new(),
            cancelled: BTreeSet::new(),
            next_task_id: 1,
            now_ms: 0,
        }
    }

    pub fn now_ms(&self) -> u64 {
        self.now_ms
    }

    /// Schedule a delivery `delay_ms` after the current clock. Returns the
    /// cancellation token.
    pub fn schedule(&mut self, delay_ms: u64, delivery: Delivery) -> u64 {
        let task_id = self.next_task_id;
        self.next_task_id += 1;
        self.live.insert(task_id);
        self.queue.push(Reverse(OrderedTask(ScheduledTask {
            task_id,
            fire_at_ms: self.now_ms.saturating_add(delay_ms),
            delivery,
        })));
        task_id
    }

    /// Cancel a pending task by token. Returns false if the task already
    /// fired or was cancelled before.
    pub fn cancel(&mut self, task_id: u64) -> bool {
        if self.live.remove(&task_id) {
            self.cancelled.insert(task_id);
            true
        } else {
            false
        }
    }

    /// Drop every pending task. The only callers are terminal transitions.
    pub fn cancel_all(&mut self) {
        self.queue.clear();
        self.live.clear();
        self.cancelled.clear();
    }

    /// Pop the next task due at or before `deadline_ms`, advancing the clock
    /// to its fire time so work done while applying it schedules relative to
    /// the fire instant, not the deadline.
    pub fn pop_due(&mut self, deadline_ms: u64) -> Option<ScheduledTask> {
        loop {
            let next = self.queue.peek()?;
            if next.0 .0.fire_at_ms > deadline_ms {
                return None;
            }

            let task = self.queue.pop().expect("peeked task present").0 .0;
            if self.cancelled.remove(&task.task_id) {
                continue;
            }
            self.live.remove(&task.task_id);
            if task.fire_at_ms > self.now_ms {
                self.now_ms = task.fire_at_ms;
            }
            return Some(task);
        }
    }

    /// Advance the clock to `now_ms` (monotone; earlier values are no-ops).
    pub fn advance_clock(&mut self, now_ms: u64) {
        if now_ms > self.now_ms {
            self.now_ms = now_ms;
        }
    }

    pub fn peek_next_fire_ms(&self) -> Option<u64> {
        self.pending().first().map(|task| task.fire_at_ms)
    }

    pub fn pending_len(&self) -> usize {
        self.live.len()
    }

    pub fn has_pending(&self) -> bool {
        !self.live.is_empty()
    }

    /// Live tasks, soonest first.
    pub fn pending(&self) -> Vec<PendingDelivery> {
        let mut tasks = self
            .queue
            .iter()
            .filter(|entry| self.live.contains(&entry.0 .0.task_id))
            .map(|entry| PendingDelivery {
                task_id: entry.0 .0.task_id,
                fire_at_ms: entry.0 .0.fire_at_ms,
                delivery: entry.0 .0.delivery.clone(),
            })
            .collect::<Vec<_>>();
        tasks.sort_by(|a, b| {
            a.fire_at_ms
                .cmp(&b.fire_at_ms)
                .then_with(|| a.task_id.cmp(&b.task_id))
        });
        tasks
    }
}

impl Default for DeliveryScheduler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn template(name: &str) -> Delivery {
        Delivery::Template {
            name: name.to_string(),
        }
    }

    #[test]
    fn pops_tasks_in_fire_time_order() {
        let mut scheduler = DeliveryScheduler::new();
        scheduler.schedule(5_000, template("b"));
        scheduler.schedule(3_000, template("a"));
        scheduler.schedule(7_000, template("c"));

        let first = scheduler.pop_due(10_000).unwrap();
        assert_eq!(first.fire_at_ms, 3_000);
        assert_eq!(scheduler.now_ms(), 3_000);

        let second = scheduler.pop_due(10_000).unwrap();
        assert_eq!(second.fire_at_ms, 5_000);

        let third = scheduler.pop_due(10_000).unwrap();
        assert_eq!(third.fire_at_ms, 7_000);

        assert!(scheduler.pop_due(10_000).is_none());
    }

    #[test]
    fn same_instant_tasks_fire_in_scheduling_order() {
        let mut scheduler = DeliveryScheduler::new();
        let first = scheduler.schedule(1_000, template("first"));
        let second = scheduler.schedule(1_000, template("second"));

        assert_eq!(scheduler.pop_due(1_000).unwrap().task_id, first);
        assert_eq!(scheduler.pop_due(1_000).unwrap().task_id, second);
    }

    #[test]
    fn deadline_holds_back_future_tasks() {
        let mut scheduler = DeliveryScheduler::new();
        scheduler.schedule(4_000, template("later"));

        assert!(scheduler.pop_due(3_999).is_none());
        assert!(scheduler.pop_due(4_000).is_some());
    }

    #[test]
    fn cancelled_task_never_fires() {
        let mut scheduler = DeliveryScheduler::new();
        let doomed = scheduler.schedule(1_000, template("doomed"));
        scheduler.schedule(2_000, template("kept"));

        assert!(scheduler.cancel(doomed));
        assert!(!scheduler.cancel(doomed));

        let fired = scheduler.pop_due(10_000).unwrap();
        assert_eq!(fired.delivery, template("kept"));
        assert!(scheduler.pop_due(10_000).is_none());
    }

    #[test]
    fn cancel_after_fire_reports_false() {
        let mut scheduler = DeliveryScheduler::new();
        let task = scheduler.schedule(100, template("x"));
        assert!(scheduler.pop_due(100).is_some());
        assert!(!scheduler.cancel(task));
    }

    #[test]
    fn cancel_all_empties_the_registry() {
        let mut scheduler = DeliveryScheduler::new();
        scheduler.schedule(1_000, template("a"));
        scheduler.schedule(2_000, template("b"));
        let cancelled = scheduler.schedule(3_000, template("c"));
        scheduler.cancel(cancelled);

        scheduler.cancel_all();
        assert!(!scheduler.has_pending());
        assert_eq!(scheduler.pending_len(), 0);
        assert!(scheduler.pop_due(u64::MAX).is_none());
    }

    #[test]
    fn pending_lists_live_tasks_soonest_first() {
        let mut scheduler = DeliveryScheduler::new();
        scheduler.schedule(5_000, template("b"));
        let cancelled = scheduler.schedule(1_000, template("dead"));
        scheduler.schedule(2_000, template("a"));
        scheduler.cancel(cancelled);

        let pending = scheduler.pending();
        assert_eq!(pending.len(), 2);
        assert_eq!(pending[0].fire_at_ms, 2_000);
        assert_eq!(pending[1].fire_at_ms, 5_000);
    }

    #[test]
    fn tasks_scheduled_while_firing_use_the_fire_instant() {
        let mut scheduler = DeliveryScheduler::new();
        scheduler.schedule(1_000, template("tick"));

        let task = scheduler.pop_due(60_000).unwrap();
        assert_eq!(task.fire_at_ms, 1_000);
        // Re-scheduling from a fired task chains off its fire time.
        scheduler.schedule(1_000, template("tick"));
        let next = scheduler.pop_due(60_000).unwrap();
        assert_eq!(next.fire_at_ms, 2_000);
    }

    #[test]
    fn clock_never_moves_backwards() {
        let mut scheduler = DeliveryScheduler::new();
        scheduler.advance_clock(5_000);
        scheduler.advance_clock(1_000);
        assert_eq!(scheduler.now_ms(), 5_000);
    }
}

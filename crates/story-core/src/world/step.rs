use super::*;

use crate::scheduler::ScheduledTask;

impl GameWorld {
    /// Advance the logical clock to `now_ms`, firing every due task in
    /// deterministic order. Each fired task re-reads live state; nothing is
    /// captured at scheduling time beyond the task payload itself.
    pub fn advance_to(&mut self, now_ms: u64) -> usize {
        let mut fired = 0;
        while let Some(task) = self.scheduler.pop_due(now_ms) {
            self.fire(task);
            fired += 1;
        }
        self.scheduler.advance_clock(now_ms);
        fired
    }

    pub fn advance_by(&mut self, delta_ms: u64) -> usize {
        self.advance_to(self.scheduler.now_ms().saturating_add(delta_ms))
    }

    pub fn pending_deliveries(&self) -> usize {
        self.scheduler.pending_len()
    }

    pub fn peek_next_fire_ms(&self) -> Option<u64> {
        self.scheduler.peek_next_fire_ms()
    }

    fn fire(&mut self, task: ScheduledTask) {
        // Clear ownership tokens before applying so a step that re-arms a
        // cascade does not cancel itself.
        if self.cascade_task == Some(task.task_id) {
            self.cascade_task = None;
        }
        if self.fallback_task == Some(task.task_id) {
            self.fallback_task = None;
        }

        match task.delivery {
            Delivery::Template { name } => {
                self.deliver_template(&name);
            }
            Delivery::StoryNext => self.deliver_story_next(),
            Delivery::SpamStep { step } => self.deliver_spam_step(step),
            Delivery::ItSupport { cause } => self.deliver_it_support(cause),
            Delivery::ResetNotice => self.deliver_reset_notice(),
            Delivery::CountdownTick { remaining } => self.countdown_tick(remaining),
            Delivery::CascadeFallback => self.trigger_clearance_cascade(0),
        }
    }
}

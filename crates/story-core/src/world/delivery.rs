use super::*;

impl GameWorld {
    /// Instantiate a template into the inbox and apply its role's milestone
    /// side effects. A missing template is logged and skipped; the session
    /// never fails over a delivery.
    pub(super) fn deliver_template(&mut self, name: &str) -> Option<String> {
        let stamp = self.next_stamp();
        let Some(mut email) = self.catalog.instantiate(name, self.scheduler.now_ms(), stamp)
        else {
            log::warn!("template {name} not found; delivery skipped");
            self.push_event(
                StoryEventKind::DeliverySkipped,
                Some(json!({ "template": name })),
            );
            return None;
        };

        // Repeat deliveries of the same template (a second clearance
        // request, say) get a uniquifying suffix; story ids stay stable.
        if self.get_email_by_id(&email.id).is_some() {
            email.id = format!("{}-{stamp}", email.id);
        }

        let email_id = email.id.clone();
        let role = email.role;
        self.add_email(email);
        self.apply_delivery_milestones(role);
        Some(email_id)
    }

    fn apply_delivery_milestones(&mut self, role: NarrativeRole) {
        match role {
            NarrativeRole::Welcome => {
                self.progress.has_received_welcome = true;
                self.set_phase(StoryPhase::AwaitingWelcomeReply);
            }
            NarrativeRole::SecurityNotice => {
                self.progress.has_received_security_notice = true;
            }
            NarrativeRole::SecurityFollowup => {
                // The follow-up opens a window: contact IT before the
                // timeout or the cascade starts on its own.
                self.arm_cascade_fallback();
            }
            NarrativeRole::Research => {
                self.progress.has_received_research = true;
            }
            NarrativeRole::Spam => {
                self.progress.has_received_spam = true;
            }
            NarrativeRole::LeadReply => {
                self.progress.has_received_lead_reply = true;
                self.progress.log_request_unlocked = true;
                let delay = self.config.timing.exec_checkin_delay_ms;
                self.scheduler.schedule(
                    delay,
                    Delivery::Template {
                        name: names::EXEC_CHECKIN.to_string(),
                    },
                );
            }
            NarrativeRole::ExecCheckin => {
                self.progress.has_received_exec_checkin = true;
                self.set_phase(StoryPhase::AwaitingFollowupChoice);
            }
            NarrativeRole::CeoNotice => {
                self.progress.has_received_ceo = true;
            }
            NarrativeRole::HrNotice => {
                self.progress.has_received_hr = true;
                self.set_phase(StoryPhase::Resolution);
            }
            NarrativeRole::Memo
            | NarrativeRole::ItSupport
            | NarrativeRole::ItClearance
            | NarrativeRole::ItLogReport
            | NarrativeRole::ResetNotice
            | NarrativeRole::Outbound => {}
        }
    }

    pub(super) fn deliver_story_next(&mut self) {
        let Some(name) = self.catalog.story_queue().get(self.next_story_index).cloned() else {
            return;
        };
        if self.deliver_template(&name).is_some() {
            self.next_story_index += 1;
        }
    }

    /// One cascade step: deliver spam #`step` unless the bound is exceeded.
    pub(super) fn deliver_spam_step(&mut self, step: u8) {
        if step > self.config.spam_limit {
            return;
        }
        self.deliver_template(&TemplateCatalog::spam_template_name(step));
    }

    /// Schedule the next cascade step, superseding any step still pending.
    /// This is the guard against double-triggering from overlapping player
    /// actions: at most one cascade timer is ever live.
    pub(super) fn schedule_cascade_step(&mut self, step: u8, delay_ms: u64) {
        if let Some(previous) = self.cascade_task.take() {
            self.scheduler.cancel(previous);
        }
        self.cascade_task = Some(
            self.scheduler
                .schedule(delay_ms, Delivery::SpamStep { step }),
        );
    }

    pub(super) fn cancel_pending_cascade(&mut self) {
        if let Some(task) = self.cascade_task.take() {
            self.scheduler.cancel(task);
        }
    }

    fn arm_cascade_fallback(&mut self) {
        if let Some(previous) = self.fallback_task.take() {
            self.scheduler.cancel(previous);
        }
        self.fallback_task = Some(self.scheduler.schedule(
            self.config.timing.fallback_cascade_timeout_ms,
            Delivery::CascadeFallback,
        ));
    }

    /// One-shot cascade trigger shared by the fallback timeout and the
    /// clearance compose path; whichever runs first wins and the other
    /// becomes a no-op.
    pub(super) fn trigger_clearance_cascade(&mut self, delay_ms: u64) {
        if self.cascade_fired {
            return;
        }
        self.cascade_fired = true;
        if let Some(task) = self.fallback_task.take() {
            self.scheduler.cancel(task);
        }
        self.set_phase(StoryPhase::SpamCascade);
        self.schedule_cascade_step(1, delay_ms);
    }

    /// The IT "report junk" response is delivered at most once per session.
    pub(super) fn deliver_it_support(&mut self, cause: Consequence) {
        if self.it_email_sent {
            return;
        }
        let stamp = self.next_stamp();
        let Some(mut email) =
            self.catalog
                .instantiate(names::IT_SUPPORT, self.scheduler.now_ms(), stamp)
        else {
            log::warn!("template {} not found; delivery skipped", names::IT_SUPPORT);
            self.push_event(
                StoryEventKind::DeliverySkipped,
                Some(json!({ "template": names::IT_SUPPORT })),
            );
            return;
        };

        email.body = it_support_body(cause);
        self.it_email_sent = true;
        self.progress.has_received_it = true;
        self.add_email(email);
    }

    /// Terminal failure email; starts the reset countdown.
    pub(super) fn deliver_reset_notice(&mut self) {
        if self.deliver_template(names::RESET_NOTICE).is_none() {
            return;
        }
        self.set_phase(StoryPhase::Reset);
        let remaining = self.config.reset_countdown_seconds;
        let tick = self.config.timing.countdown_tick_ms;
        self.scheduler
            .schedule(tick, Delivery::CountdownTick { remaining });
    }

    pub(super) fn countdown_tick(&mut self, remaining: u32) {
        let remaining = remaining.saturating_sub(1);
        self.push_event(
            StoryEventKind::ResetCountdownTicked,
            Some(json!({ "remaining_seconds": remaining })),
        );
        if remaining == 0 {
            self.restart();
            return;
        }
        let tick = self.config.timing.countdown_tick_ms;
        self.scheduler
            .schedule(tick, Delivery::CountdownTick { remaining });
    }

    /// Full teardown: the only non-additive mutation in the session. Every
    /// scheduler-owned timer is cleared unconditionally, then the opening
    /// email is re-queued.
    pub(super) fn restart(&mut self) {
        self.scheduler.cancel_all();
        self.cascade_task = None;
        self.fallback_task = None;

        self.emails.clear();
        self.current_folder = Folder::Inbox;
        self.next_story_index = 0;
        self.it_email_sent = false;
        self.story_contacted = false;
        self.cascade_fired = false;
        self.interacted_contacts.clear();
        self.coins = 0;
        self.progress = GameProgress::default();

        self.push_event(StoryEventKind::SessionReset, None);
        self.set_phase(StoryPhase::AwaitingWelcomeReply);

        let delay = self.config.timing.restart_delay_ms;
        self.scheduler.schedule(
            delay,
            Delivery::Template {
                name: names::WELCOME.to_string(),
            },
        );
    }
}

fn it_support_body(cause: Consequence) -> String {
    if cause == Consequence::ReportJunk {
        concat!(
            "<h3>Great catch, Investigator!</h3>",
            "<p>Thanks for reporting that junk email. Vigilance like yours keeps the ",
            "floor safe. We analyzed the message and took action on our side.</p>",
            "<p>To help with your investigation we have approved the Deep Lens ",
            "forensics tool for your terminal. It grants elevated access to uncover ",
            "hidden data in our systems.</p>",
            "<p>Click install below to begin. It only takes a moment.</p>",
            "<p>Stay sharp,<br>IT Support</p>"
        )
        .to_string()
    } else {
        concat!(
            "<h3>Action required: security refresher mandated</h3>",
            "<p>Investigator,</p>",
            "<p>We noticed you responded to a phishing attempt. Interacting with these ",
            "messages is risky and against policy, so a security refresher has been ",
            "scheduled for you.</p>",
            "<p>We have also approved the Deep Lens forensics tool for your terminal ",
            "to help you identify hidden threats going forward. Use it wisely.</p>",
            "<p>Be more careful,<br>IT Support</p>"
        )
        .to_string()
    }
}

use super::*;

/// Target of a validated compose action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum ComposeTarget {
    Lead,
    Support,
}

/// One step the resolver asks the world to take. Branches are data, so the
/// mapping from (role, consequence) to behavior stays inspectable and
/// testable without firing timers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) enum Followup {
    Schedule { delay_ms: u64, delivery: Delivery },
    Cascade { step: u8, delay_ms: u64 },
    ClearanceCascade { delay_ms: u64 },
    Award { amount: i64 },
    Phase(StoryPhase),
}

fn template(name: &str) -> Delivery {
    Delivery::Template {
        name: name.to_string(),
    }
}

impl GameWorld {
    /// Branch for a multiple-choice reply. Dispatch is on the email's
    /// narrative role and the chosen option's consequence tag, never on ids
    /// or display text.
    pub(super) fn resolve_choice(&self, email: &Email, consequence: Consequence) -> Vec<Followup> {
        let timing = &self.config.timing;
        match email.role {
            NarrativeRole::Spam => match consequence {
                Consequence::ReportJunk => vec![
                    Followup::Award {
                        amount: self.config.junk_report_reward,
                    },
                    Followup::Schedule {
                        delay_ms: timing.it_response_delay_ms,
                        delivery: Delivery::ItSupport {
                            cause: Consequence::ReportJunk,
                        },
                    },
                ],
                Consequence::Scam => {
                    let step = email.spam_step.unwrap_or(1);
                    if step >= self.config.spam_limit {
                        // Fell for the last spam: terminal reset, never
                        // spam #(limit + 1).
                        vec![Followup::Schedule {
                            delay_ms: timing.scam_followup_delay_ms,
                            delivery: Delivery::ResetNotice,
                        }]
                    } else {
                        vec![Followup::Cascade {
                            step: step + 1,
                            delay_ms: timing.scam_followup_delay_ms,
                        }]
                    }
                }
                _ => Vec::new(),
            },
            NarrativeRole::SecurityNotice => match consequence {
                Consequence::Acknowledge => vec![
                    Followup::Phase(StoryPhase::SpamCascade),
                    Followup::Cascade {
                        step: 1,
                        delay_ms: timing.cascade_ack_delay_ms,
                    },
                ],
                Consequence::Concern => vec![Followup::Schedule {
                    delay_ms: timing.security_followup_delay_ms,
                    delivery: template(names::SECURITY_FOLLOWUP),
                }],
                _ => vec![
                    Followup::Phase(StoryPhase::SpamCascade),
                    Followup::Cascade {
                        step: 1,
                        delay_ms: timing.cascade_step_delay_ms,
                    },
                ],
            },
            // Every status flavor resolves to the same closing sequence.
            NarrativeRole::ExecCheckin => self.resolution_sequence(),
            _ => self.advance_story(),
        }
    }

    /// Branch for a free-text reply.
    pub(super) fn resolve_interactive(&self, email: &Email) -> Vec<Followup> {
        match email.role {
            NarrativeRole::Welcome => {
                let mut followups = vec![Followup::Phase(StoryPhase::AwaitingFirstChoice)];
                followups.extend(self.advance_story());
                followups
            }
            NarrativeRole::ExecCheckin => self.resolution_sequence(),
            _ => self.advance_story(),
        }
    }

    /// Branch for a validated compose. The support path forks on whether
    /// the lead's reply has unlocked the log request yet.
    pub(super) fn resolve_compose(&self, target: ComposeTarget) -> Vec<Followup> {
        let timing = &self.config.timing;
        match target {
            ComposeTarget::Lead => vec![
                Followup::Award {
                    amount: self.config.lead_contact_reward,
                },
                Followup::Phase(StoryPhase::AwaitingContactReply),
                Followup::Schedule {
                    delay_ms: timing.lead_reply_delay_ms,
                    delivery: template(names::LEAD_REPLY),
                },
            ],
            ComposeTarget::Support if self.progress.log_request_unlocked => {
                vec![Followup::Schedule {
                    delay_ms: timing.it_response_delay_ms,
                    delivery: template(names::IT_LOG_REPORT),
                }]
            }
            ComposeTarget::Support => vec![
                Followup::ClearanceCascade {
                    delay_ms: timing.clearance_cascade_delay_ms,
                },
                Followup::Schedule {
                    delay_ms: timing.it_response_delay_ms,
                    delivery: template(names::IT_CLEARANCE),
                },
            ],
        }
    }

    fn advance_story(&self) -> Vec<Followup> {
        vec![Followup::Schedule {
            delay_ms: self.config.timing.story_advance_delay_ms,
            delivery: Delivery::StoryNext,
        }]
    }

    fn resolution_sequence(&self) -> Vec<Followup> {
        let timing = &self.config.timing;
        vec![
            Followup::Schedule {
                delay_ms: timing.ceo_delay_ms,
                delivery: template(names::CEO_NOTICE),
            },
            Followup::Schedule {
                delay_ms: timing.hr_delay_ms,
                delivery: template(names::HR_NOTICE),
            },
        ]
    }

    pub(super) fn apply_followups(&mut self, followups: Vec<Followup>) {
        for followup in followups {
            match followup {
                Followup::Schedule { delay_ms, delivery } => {
                    self.scheduler.schedule(delay_ms, delivery);
                }
                Followup::Cascade { step, delay_ms } => {
                    self.schedule_cascade_step(step, delay_ms);
                }
                Followup::ClearanceCascade { delay_ms } => {
                    self.trigger_clearance_cascade(delay_ms);
                }
                Followup::Award { amount } => self.award_coins(amount),
                Followup::Phase(phase) => self.set_phase(phase),
            }
        }
    }
}

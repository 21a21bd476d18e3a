use std::fmt;

use super::resolve::ComposeTarget;
use super::state::EmailPatch;
use super::*;

/// A rejected player action. `Display` text is what the client shows the
/// player; nothing here is a crash path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionError {
    UnknownEmail(String),
    AlreadyReplied(String),
    NotReplyable(String),
    InvalidOption { email_id: String, index: usize },
    UnknownRecipient(String),
    EmptySubject,
    LeadAlreadyContacted,
    ToolAlreadyInstalled,
    NoToolOffer,
}

impl fmt::Display for ActionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownEmail(id) => write!(f, "That email ({id}) no longer exists."),
            Self::AlreadyReplied(_) => {
                write!(f, "You have already replied to this email.")
            }
            Self::NotReplyable(_) => {
                write!(f, "This email cannot be replied to.")
            }
            Self::InvalidOption { index, .. } => {
                write!(f, "That reply option ({index}) is not available.")
            }
            Self::UnknownRecipient(_) => write!(
                f,
                "Your 'To' field seems incorrect. Are you contacting the right person?"
            ),
            Self::EmptySubject => write!(f, "The subject line is empty."),
            Self::LeadAlreadyContacted => {
                write!(f, "You've already followed up on your lead.")
            }
            Self::ToolAlreadyInstalled => {
                write!(f, "The Deep Lens forensics tool is already installed.")
            }
            Self::NoToolOffer => {
                write!(f, "There is no pending tool installation.")
            }
        }
    }
}

impl std::error::Error for ActionError {}

impl GameWorld {
    /// Free-text reply. An empty body falls back to the canned per-role
    /// reply text the client types out on screen.
    pub fn submit_interactive_reply(
        &mut self,
        email_id: &str,
        body: &str,
    ) -> Result<String, ActionError> {
        let original = self.replyable_email(email_id, EmailKind::InteractiveReply)?;

        let text = if body.trim().is_empty() {
            self.default_reply_body(&original)
        } else {
            body.to_string()
        };
        let reply_id = self.send_reply(&original, &text, Folder::Trash);

        let followups = self.resolve_interactive(&original);
        self.apply_followups(followups);
        Ok(reply_id)
    }

    /// Multiple-choice reply. The chosen option's consequence picks both
    /// the destination folder of the original (junk reports archive to
    /// spam, everything else to trash) and the narrative branch.
    pub fn submit_choice_reply(
        &mut self,
        email_id: &str,
        option_index: usize,
    ) -> Result<String, ActionError> {
        let original = self.replyable_email(email_id, EmailKind::MultipleChoice)?;
        let option = original
            .reply_options
            .get(option_index)
            .cloned()
            .ok_or_else(|| ActionError::InvalidOption {
                email_id: email_id.to_string(),
                index: option_index,
            })?;

        let destination = if option.consequence == Consequence::ReportJunk {
            Folder::Spam
        } else {
            Folder::Trash
        };
        let text = format!(
            "Hi {},\n\n{}\n\nBest, {}, Special Investigator",
            sender_first_name(&original.sender),
            option.text,
            self.config.player_name
        );
        let reply_id = self.send_reply(&original, &text, destination);

        // Any spam interaction supersedes a cascade step still in flight;
        // the resolver decides whether a new one is armed.
        if original.role == NarrativeRole::Spam {
            self.cancel_pending_cascade();
        }

        let followups = self.resolve_choice(&original, option.consequence);
        self.apply_followups(followups);
        Ok(reply_id)
    }

    /// Compose to a contact. Recipients are an allow-list gated by
    /// narrative flags; anything else is rejected without state change.
    pub fn submit_compose(
        &mut self,
        to: &str,
        subject: &str,
        body: &str,
    ) -> Result<String, ActionError> {
        if subject.trim().is_empty() {
            return Err(ActionError::EmptySubject);
        }

        let recipient = to.trim();
        let target = if recipient.eq_ignore_ascii_case(LEAD_CONTACT) {
            if !(self.progress.has_received_research && self.progress.has_revealed_lead_clue) {
                return Err(ActionError::UnknownRecipient(recipient.to_string()));
            }
            if self.story_contacted {
                return Err(ActionError::LeadAlreadyContacted);
            }
            ComposeTarget::Lead
        } else if recipient.eq_ignore_ascii_case(SUPPORT_CONTACT) {
            if !(self.progress.has_received_security_notice || self.progress.log_request_unlocked) {
                return Err(ActionError::UnknownRecipient(recipient.to_string()));
            }
            ComposeTarget::Support
        } else {
            return Err(ActionError::UnknownRecipient(recipient.to_string()));
        };

        let email_id = self.send_composed(recipient, subject, body);
        self.interacted_contacts
            .insert(recipient.to_lowercase());
        if target == ComposeTarget::Lead {
            self.story_contacted = true;
        }

        let followups = self.resolve_compose(target);
        self.apply_followups(followups);
        Ok(email_id)
    }

    /// Install the offered forensics tool. Idempotent: a second invocation
    /// is rejected and schedules nothing.
    pub fn submit_install(&mut self) -> Result<(), ActionError> {
        if self.progress.has_installed_tool {
            return Err(ActionError::ToolAlreadyInstalled);
        }
        let offer_id = self
            .emails
            .iter()
            .find(|email| email.role == NarrativeRole::ItSupport)
            .map(|email| email.id.clone())
            .ok_or(ActionError::NoToolOffer)?;

        self.progress.has_installed_tool = true;
        self.update_email(
            &offer_id,
            EmailPatch {
                folder: Some(Folder::Trash),
                replied: Some(true),
                read: None,
            },
        );
        self.push_event(StoryEventKind::InstallationCompleted, None);
        self.set_phase(StoryPhase::AwaitingClueDiscovery);

        let delay = self.config.timing.research_delay_ms;
        self.scheduler.schedule(
            delay,
            Delivery::Template {
                name: names::RESEARCH.to_string(),
            },
        );
        Ok(())
    }

    /// The presentation layer reports that the player uncovered the hidden
    /// lead clue; this unlocks composing to the lead contact.
    pub fn record_clue_revealed(&mut self) {
        if self.progress.has_revealed_lead_clue {
            return;
        }
        self.progress.has_revealed_lead_clue = true;
        if self.phase == StoryPhase::AwaitingClueDiscovery {
            self.set_phase(StoryPhase::AwaitingContactCompose);
        }
    }

    fn replyable_email(&self, email_id: &str, kind: EmailKind) -> Result<Email, ActionError> {
        let email = self
            .get_email_by_id(email_id)
            .ok_or_else(|| ActionError::UnknownEmail(email_id.to_string()))?;
        if email.kind != kind {
            return Err(ActionError::NotReplyable(email_id.to_string()));
        }
        if email.replied {
            return Err(ActionError::AlreadyReplied(email_id.to_string()));
        }
        Ok(email.clone())
    }

    /// Create the sent copy, retire the original, announce the reply.
    fn send_reply(&mut self, original: &Email, text: &str, destination: Folder) -> String {
        let stamp = self.next_stamp();
        let reply_id = format!("reply-{}-{}", original.id, stamp);
        let reply = Email {
            id: reply_id.clone(),
            sender: format!("{}, Special Investigator", self.config.player_name),
            subject: format!("Re: {}", original.subject),
            body: format!("<pre>{text}</pre>"),
            date: crate::templates::synthetic_date(self.scheduler.now_ms()),
            received_time: crate::templates::synthetic_time(self.scheduler.now_ms()),
            timestamp: stamp,
            folder: Folder::Sent,
            read: true,
            replied: false,
            kind: EmailKind::ReadOnly,
            role: NarrativeRole::Outbound,
            reply_options: Vec::new(),
            spam_step: None,
        };
        self.add_email(reply);
        self.update_email(
            &original.id,
            EmailPatch {
                folder: Some(destination),
                replied: Some(true),
                read: None,
            },
        );
        self.push_event(
            StoryEventKind::ReplySent,
            Some(json!({ "email_id": original.id, "reply_id": reply_id })),
        );
        reply_id
    }

    fn send_composed(&mut self, to: &str, subject: &str, body: &str) -> String {
        let stamp = self.next_stamp();
        let email_id = format!("composed-{stamp}");
        let email = Email {
            id: email_id.clone(),
            sender: format!("{}, Special Investigator", self.config.player_name),
            subject: subject.to_string(),
            body: format!("<pre>{body}</pre>"),
            date: crate::templates::synthetic_date(self.scheduler.now_ms()),
            received_time: crate::templates::synthetic_time(self.scheduler.now_ms()),
            timestamp: stamp,
            folder: Folder::Sent,
            read: true,
            replied: false,
            kind: EmailKind::ReadOnly,
            role: NarrativeRole::Outbound,
            reply_options: Vec::new(),
            spam_step: None,
        };
        self.add_email(email);
        self.push_event(
            StoryEventKind::EmailSent,
            Some(json!({ "email_id": email_id, "to": to })),
        );
        email_id
    }

    fn default_reply_body(&self, original: &Email) -> String {
        let first_name = sender_first_name(&original.sender);
        let player = &self.config.player_name;
        let content = match original.role {
            NarrativeRole::Welcome => format!(
                "Thanks for the welcome, {first_name}! I'm settled in and ready \
                 to dig into this quietly. Consider the case open."
            ),
            NarrativeRole::ExecCheckin => concat!(
                "Status update: I have made contact with key personnel, reviewed ",
                "the archive access patterns, and identified a promising lead in ",
                "the R&D wing. I need a little more time to tie the pieces ",
                "together, but the picture is forming."
            )
            .to_string(),
            _ => "Got it. On the case!".to_string(),
        };
        format!("Hi {first_name},\n\n{content}\n\nBest, {player}, Special Investigator")
    }
}

fn sender_first_name(sender: &str) -> String {
    sender
        .split([',', ' '])
        .find(|part| !part.trim().is_empty())
        .unwrap_or("there")
        .trim()
        .to_string()
}

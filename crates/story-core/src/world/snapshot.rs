use contracts::{Contact, ContactPriority, SessionStatus, Snapshot};

use super::*;

impl GameWorld {
    pub fn status(&self) -> SessionStatus {
        SessionStatus {
            schema_version: SCHEMA_VERSION_V1.to_string(),
            session_id: self.config.session_id.clone(),
            now_ms: self.scheduler.now_ms(),
            phase: self.phase,
            coins: self.coins,
            emails_total: self.emails.len(),
            unread: self.unread_counts(),
            pending_deliveries: self.scheduler.pending_len(),
        }
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            schema_version: SCHEMA_VERSION_V1.to_string(),
            session_id: self.config.session_id.clone(),
            now_ms: self.scheduler.now_ms(),
            player_name: self.config.player_name.clone(),
            phase: self.phase,
            coins: self.coins,
            next_story_index: self.next_story_index,
            it_email_sent: self.it_email_sent,
            story_contacted: self.story_contacted,
            interacted_contacts: self.interacted_contacts.iter().cloned().collect(),
            progress: self.progress,
            emails: self.emails.clone(),
            unread: self.unread_counts(),
            pending: self.scheduler.pending(),
        }
    }

    /// Contacts currently offered in the compose dropdown, derived from
    /// milestone flags. Listing is broader than composability: staff
    /// entries are flavor and composing to them is rejected.
    pub fn contacts(&self) -> Vec<Contact> {
        let mut contacts = Vec::new();

        if self.progress.has_received_research
            && self.progress.has_revealed_lead_clue
            && !self.story_contacted
        {
            contacts.push(Contact {
                name: LEAD_CONTACT.to_string(),
                role: "Junior Researcher".to_string(),
                description: "Named in the research bulletin as a potential lead".to_string(),
                priority: ContactPriority::High,
            });
        }

        if self.progress.log_request_unlocked {
            contacts.push(Contact {
                name: SUPPORT_CONTACT.to_string(),
                role: "Technical Support".to_string(),
                description: "Can pull raw access logs for comparison".to_string(),
                priority: ContactPriority::High,
            });
        } else if self.progress.has_received_security_notice && !self.progress.has_installed_tool {
            contacts.push(Contact {
                name: SUPPORT_CONTACT.to_string(),
                role: "Technical Support".to_string(),
                description: "Handles clearance requests per security protocol".to_string(),
                priority: ContactPriority::Medium,
            });
        }

        if self.progress.has_received_welcome {
            contacts.push(Contact {
                name: "June Albright".to_string(),
                role: "HR Manager".to_string(),
                description: "Sent your onboarding email".to_string(),
                priority: ContactPriority::Medium,
            });
        }

        if self.progress.has_received_hr {
            contacts.push(Contact {
                name: "HR Department".to_string(),
                role: "Human Resources".to_string(),
                description: "Sent the engagement update".to_string(),
                priority: ContactPriority::Medium,
            });
        }

        if self.progress.has_received_ceo {
            contacts.push(Contact {
                name: "CEO Office".to_string(),
                role: "Executive Team".to_string(),
                description: "Sent an executive communication".to_string(),
                priority: ContactPriority::High,
            });
        }

        contacts
    }
}

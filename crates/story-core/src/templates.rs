//! Immutable email template catalog, loaded once at session startup.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use contracts::{Email, EmailTemplate, Folder};
use serde::Deserialize;

/// Well-known template names the resolver schedules directly.
pub mod names {
    pub const WELCOME: &str = "welcome";
    pub const SECURITY_FOLLOWUP: &str = "security-followup";
    pub const IT_SUPPORT: &str = "it-support";
    pub const IT_CLEARANCE: &str = "it-clearance";
    pub const IT_LOG_REPORT: &str = "it-log-report";
    pub const RESET_NOTICE: &str = "reset-notice";
    pub const RESEARCH: &str = "research";
    pub const LEAD_REPLY: &str = "lead-reply";
    pub const EXEC_CHECKIN: &str = "exec-checkin";
    pub const CEO_NOTICE: &str = "ceo-notice";
    pub const HR_NOTICE: &str = "hr-notice";
}

const BUILTIN_CATALOG: &str = include_str!("../assets/templates.json");

/// Names the resolver requires regardless of the story queue contents.
const REQUIRED_TEMPLATES: [&str; 11] = [
    names::WELCOME,
    names::SECURITY_FOLLOWUP,
    names::IT_SUPPORT,
    names::IT_CLEARANCE,
    names::IT_LOG_REPORT,
    names::RESET_NOTICE,
    names::RESEARCH,
    names::LEAD_REPLY,
    names::EXEC_CHECKIN,
    names::CEO_NOTICE,
    names::HR_NOTICE,
];

#[derive(Debug)]
pub enum TemplateError {
    Io(std::io::Error),
    Parse(serde_json::Error),
    MissingTemplate(String),
    MissingSpamStep(u8),
}

impl fmt::Display for TemplateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(err) => write!(f, "catalog io error: {err}"),
            Self::Parse(err) => write!(f, "catalog parse error: {err}"),
            Self::MissingTemplate(name) => write!(f, "catalog is missing template: {name}"),
            Self::MissingSpamStep(step) => {
                write!(f, "catalog is missing spam template for step {step}")
            }
        }
    }
}

impl std::error::Error for TemplateError {}

impl From<std::io::Error> for TemplateError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<serde_json::Error> for TemplateError {
    fn from(value: serde_json::Error) -> Self {
        Self::Parse(value)
    }
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    story_queue: Vec<String>,
    templates: BTreeMap<String, EmailTemplate>,
}

/// Read-only catalog of email prototypes plus the ordered story queue.
/// The template name doubles as the fixed id of the instantiated email.
#[derive(Debug, Clone)]
pub struct TemplateCatalog {
    templates: BTreeMap<String, EmailTemplate>,
    story_queue: Vec<String>,
}

impl TemplateCatalog {
    /// The catalog embedded in the crate.
    pub fn builtin() -> Result<Self, TemplateError> {
        Self::from_json_str(BUILTIN_CATALOG)
    }

    pub fn from_json_str(raw: &str) -> Result<Self, TemplateError> {
        let file: CatalogFile = serde_json::from_str(raw)?;
        Ok(Self {
            templates: file.templates,
            story_queue: file.story_queue,
        })
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, TemplateError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    /// Startup validation: every name the engine can ever schedule must
    /// resolve. Failing here aborts session initialization; nothing else in
    /// the catalog path is allowed to fail loudly.
    pub fn validate(&self, spam_limit: u8) -> Result<(), TemplateError> {
        for name in REQUIRED_TEMPLATES {
            if !self.templates.contains_key(name) {
                return Err(TemplateError::MissingTemplate(name.to_string()));
            }
        }
        for name in &self.story_queue {
            if !self.templates.contains_key(name) {
                return Err(TemplateError::MissingTemplate(name.clone()));
            }
        }
        for step in 1..=spam_limit {
            if !self.templates.contains_key(&Self::spam_template_name(step)) {
                return Err(TemplateError::MissingSpamStep(step));
            }
        }
        Ok(())
    }

    pub fn spam_template_name(step: u8) -> String {
        format!("spam-{step}")
    }

    pub fn get(&self, name: &str) -> Option<&EmailTemplate> {
        self.templates.get(name)
    }

    pub fn story_queue(&self) -> &[String] {
        &self.story_queue
    }

    /// Copy a template into a concrete inbox email, stamping live clock
    /// fields. `None` when the name is unknown; callers log and skip the
    /// delivery rather than failing the session.
    pub fn instantiate(&self, name: &str, at_ms: u64, stamp: u64) -> Option<Email> {
        let template = self.templates.get(name)?;
        Some(Email {
            id: name.to_string(),
            sender: template.sender.clone(),
            subject: template.subject.clone(),
            body: template.body.clone(),
            date: synthetic_date(at_ms),
            received_time: synthetic_time(at_ms),
            timestamp: stamp,
            folder: Folder::Inbox,
            read: false,
            replied: false,
            kind: template.kind,
            role: template.role,
            reply_options: template.reply_options.clone(),
            spam_step: template.spam_step,
        })
    }
}

// The session fiction starts at 09:00 on day 1; clock fields are derived
// from the logical clock so replays are reproducible.
const SESSION_START_MINUTES: u64 = 9 * 60;

pub fn synthetic_date(at_ms: u64) -> String {
    let minutes = SESSION_START_MINUTES + at_ms / 60_000;
    format!("Day {}", minutes / (24 * 60) + 1)
}

pub fn synthetic_time(at_ms: u64) -> String {
    let minutes = (SESSION_START_MINUTES + at_ms / 60_000) % (24 * 60);
    let hour24 = minutes / 60;
    let minute = minutes % 60;
    let (hour12, meridiem) = match hour24 {
        0 => (12, "AM"),
        1..=11 => (hour24, "AM"),
        12 => (12, "PM"),
        _ => (hour24 - 12, "PM"),
    };
    format!("{hour12:02}:{minute:02} {meridiem}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{EmailKind, NarrativeRole};

    #[test]
    fn builtin_catalog_parses_and_validates() {
        let catalog = TemplateCatalog::builtin().expect("builtin catalog");
        catalog.validate(4).expect("validates at spam limit 4");
        assert!(!catalog.story_queue().is_empty());
    }

    #[test]
    fn instantiate_stamps_clock_fields() {
        let catalog = TemplateCatalog::builtin().expect("builtin catalog");
        let email = catalog
            .instantiate(names::WELCOME, 180_000, 180_000)
            .expect("welcome template");

        assert_eq!(email.id, names::WELCOME);
        assert_eq!(email.folder, Folder::Inbox);
        assert_eq!(email.role, NarrativeRole::Welcome);
        assert_eq!(email.kind, EmailKind::InteractiveReply);
        assert_eq!(email.timestamp, 180_000);
        assert_eq!(email.date, "Day 1");
        assert_eq!(email.received_time, "09:03 AM");
        assert!(!email.read);
        assert!(!email.replied);
    }

    #[test]
    fn instantiate_unknown_template_is_none() {
        let catalog = TemplateCatalog::builtin().expect("builtin catalog");
        assert!(catalog.instantiate("ghost-mail", 0, 0).is_none());
    }

    #[test]
    fn validate_rejects_catalog_missing_spam_steps() {
        let raw = r#"{
            "story_queue": [],
            "templates": {
                "welcome": {
                    "sender": "HR",
                    "subject": "Hello",
                    "body": "<p>Hi.</p>",
                    "kind": "interactive_reply",
                    "role": "welcome"
                }
            }
        }"#;
        let catalog = TemplateCatalog::from_json_str(raw).expect("parses");
        assert!(matches!(
            catalog.validate(1),
            Err(TemplateError::MissingTemplate(_))
        ));
    }

    #[test]
    fn spam_steps_carry_their_step_number() {
        let catalog = TemplateCatalog::builtin().expect("builtin catalog");
        for step in 1..=4_u8 {
            let email = catalog
                .instantiate(&TemplateCatalog::spam_template_name(step), 0, 0)
                .expect("spam template");
            assert_eq!(email.role, NarrativeRole::Spam);
            assert_eq!(email.spam_step, Some(step));
        }
    }

    #[test]
    fn synthetic_time_wraps_past_midnight() {
        assert_eq!(synthetic_time(0), "09:00 AM");
        assert_eq!(synthetic_time(15 * 60 * 60_000), "12:00 AM");
        assert_eq!(synthetic_date(15 * 60 * 60_000), "Day 2");
    }
}

//! v1 cross-boundary contracts for the story kernel, API, and presentation shell.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const SCHEMA_VERSION_V1: &str = "1.0";

/// Mail folders visible in the client. Emails move between folders but are
/// never removed outside a full session reset.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Folder {
    Inbox,
    Sent,
    Drafts,
    Spam,
    Trash,
}

impl Folder {
    pub const ALL: [Folder; 5] = [
        Folder::Inbox,
        Folder::Sent,
        Folder::Drafts,
        Folder::Spam,
        Folder::Trash,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Folder::Inbox => "inbox",
            Folder::Sent => "sent",
            Folder::Drafts => "drafts",
            Folder::Spam => "spam",
            Folder::Trash => "trash",
        }
    }

    pub fn parse(value: &str) -> Option<Folder> {
        match value.trim().to_lowercase().as_str() {
            "inbox" => Some(Folder::Inbox),
            "sent" => Some(Folder::Sent),
            "drafts" => Some(Folder::Drafts),
            "spam" => Some(Folder::Spam),
            "trash" => Some(Folder::Trash),
            _ => None,
        }
    }
}

impl fmt::Display for Folder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the client may interact with an email.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum EmailKind {
    InteractiveReply,
    MultipleChoice,
    ReadOnly,
}

/// Symbolic branch tag carried by a reply option. The resolver dispatches on
/// this tag, never on display text.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Consequence {
    Acknowledge,
    Concern,
    Protocol,
    ReportJunk,
    Scam,
    Bureaucracy,
    Security,
    Smooth,
    Authority,
}

/// Narrative role of a template/email. Replaces id-prefix dispatch: the
/// resolver switches on this enum, so the exact string shape of generated
/// ids never matters.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum NarrativeRole {
    Welcome,
    SecurityNotice,
    SecurityFollowup,
    Memo,
    Spam,
    ItSupport,
    ItClearance,
    ItLogReport,
    ResetNotice,
    Research,
    LeadReply,
    ExecCheckin,
    CeoNotice,
    HrNotice,
    Outbound,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReplyOption {
    pub text: String,
    pub consequence: Consequence,
}

/// One concrete message instance in the session.
///
/// `id` is stable once created; only `folder`, `read`, and `replied` mutate
/// after creation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Email {
    pub id: String,
    pub sender: String,
    pub subject: String,
    pub body: String,
    pub date: String,
    pub received_time: String,
    pub timestamp: u64,
    pub folder: Folder,
    pub read: bool,
    pub replied: bool,
    pub kind: EmailKind,
    pub role: NarrativeRole,
    #[serde(default)]
    pub reply_options: Vec<ReplyOption>,
    #[serde(default)]
    pub spam_step: Option<u8>,
}

/// Immutable prototype for an email. Instantiation stamps the live
/// date/time/timestamp fields and places the copy in the inbox.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EmailTemplate {
    pub sender: String,
    pub subject: String,
    pub body: String,
    pub kind: EmailKind,
    pub role: NarrativeRole,
    #[serde(default)]
    pub reply_options: Vec<ReplyOption>,
    #[serde(default)]
    pub spam_step: Option<u8>,
}

/// Delay constants, all in logical milliseconds. None of these are
/// load-bearing contracts; tests compress them freely.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TimingConfig {
    pub welcome_delay_ms: u64,
    pub story_advance_delay_ms: u64,
    pub cascade_ack_delay_ms: u64,
    pub cascade_step_delay_ms: u64,
    pub scam_followup_delay_ms: u64,
    pub it_response_delay_ms: u64,
    pub research_delay_ms: u64,
    pub lead_reply_delay_ms: u64,
    pub exec_checkin_delay_ms: u64,
    pub ceo_delay_ms: u64,
    pub hr_delay_ms: u64,
    pub security_followup_delay_ms: u64,
    pub fallback_cascade_timeout_ms: u64,
    pub clearance_cascade_delay_ms: u64,
    pub countdown_tick_ms: u64,
    pub restart_delay_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            welcome_delay_ms: 3_000,
            story_advance_delay_ms: 3_000,
            cascade_ack_delay_ms: 6_000,
            cascade_step_delay_ms: 6_000,
            scam_followup_delay_ms: 2_000,
            it_response_delay_ms: 5_000,
            research_delay_ms: 3_000,
            lead_reply_delay_ms: 4_000,
            exec_checkin_delay_ms: 8_000,
            ceo_delay_ms: 10_000,
            hr_delay_ms: 20_000,
            security_followup_delay_ms: 10_000,
            fallback_cascade_timeout_ms: 15_000,
            clearance_cascade_delay_ms: 10_000,
            countdown_tick_ms: 1_000,
            restart_delay_ms: 1_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionConfig {
    pub schema_version: String,
    pub session_id: String,
    pub player_name: String,
    #[serde(default)]
    pub timing: TimingConfig,
    pub spam_limit: u8,
    pub junk_report_reward: i64,
    pub lead_contact_reward: i64,
    pub reset_countdown_seconds: u32,
    pub notes: Option<String>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            schema_version: SCHEMA_VERSION_V1.to_string(),
            session_id: "session_local_001".to_string(),
            player_name: String::new(),
            timing: TimingConfig::default(),
            spam_limit: 4,
            junk_report_reward: 100,
            lead_contact_reward: 100,
            reset_countdown_seconds: 15,
            notes: None,
        }
    }
}

/// Milestone flags. Strictly additive: each flips false→true at most once
/// per session and only a full reset clears them.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct GameProgress {
    #[serde(default)]
    pub has_received_welcome: bool,
    #[serde(default)]
    pub has_received_security_notice: bool,
    #[serde(default)]
    pub has_received_research: bool,
    #[serde(default)]
    pub has_received_it: bool,
    #[serde(default)]
    pub has_received_spam: bool,
    #[serde(default)]
    pub has_received_lead_reply: bool,
    #[serde(default)]
    pub has_received_exec_checkin: bool,
    #[serde(default)]
    pub has_received_ceo: bool,
    #[serde(default)]
    pub has_received_hr: bool,
    #[serde(default)]
    pub has_installed_tool: bool,
    #[serde(default)]
    pub log_request_unlocked: bool,
    #[serde(default)]
    pub has_revealed_lead_clue: bool,
}

/// Coarse story phase, made explicit so terminal transitions can cancel
/// timers that belong to branches the player can no longer reach.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StoryPhase {
    AwaitingWelcomeReply,
    AwaitingFirstChoice,
    SpamCascade,
    AwaitingClueDiscovery,
    AwaitingContactCompose,
    AwaitingContactReply,
    AwaitingFollowupChoice,
    Resolution,
    Reset,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct FolderCounts {
    pub inbox: usize,
    pub sent: usize,
    pub drafts: usize,
    pub spam: usize,
    pub trash: usize,
}

impl FolderCounts {
    pub fn get(&self, folder: Folder) -> usize {
        match folder {
            Folder::Inbox => self.inbox,
            Folder::Sent => self.sent,
            Folder::Drafts => self.drafts,
            Folder::Spam => self.spam,
            Folder::Trash => self.trash,
        }
    }

    pub fn bump(&mut self, folder: Folder) {
        match folder {
            Folder::Inbox => self.inbox += 1,
            Folder::Sent => self.sent += 1,
            Folder::Drafts => self.drafts += 1,
            Folder::Spam => self.spam += 1,
            Folder::Trash => self.trash += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.inbox + self.sent + self.drafts + self.spam + self.trash
    }
}

/// Payload of a scheduled task: the narrative step to apply when the task
/// fires. Fired tasks re-read live world state; the payload only names the
/// step, it never captures state.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Delivery {
    Template { name: String },
    StoryNext,
    SpamStep { step: u8 },
    ItSupport { cause: Consequence },
    ResetNotice,
    CountdownTick { remaining: u32 },
    CascadeFallback,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PendingDelivery {
    pub task_id: u64,
    pub fire_at_ms: u64,
    pub delivery: Delivery,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum StoryEventKind {
    EmailDelivered,
    EmailSent,
    ReplySent,
    InstallationCompleted,
    CoinsAwarded,
    ResetCountdownTicked,
    SessionReset,
    PhaseChanged,
    DeliverySkipped,
}

/// One entry in the session's append-only event log. The embedding layer
/// consumes new entries to refresh the view and play notification cues.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoryEvent {
    pub schema_version: String,
    pub session_id: String,
    pub event_id: String,
    pub at_ms: u64,
    pub sequence: u64,
    pub kind: StoryEventKind,
    pub details: Option<Value>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum ContactPriority {
    High,
    Medium,
    Low,
}

/// Entry in the compose dropdown, computed from narrative flags.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Contact {
    pub name: String,
    pub role: String,
    pub description: String,
    pub priority: ContactPriority,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionStatus {
    pub schema_version: String,
    pub session_id: String,
    pub now_ms: u64,
    pub phase: StoryPhase,
    pub coins: i64,
    pub emails_total: usize,
    pub unread: FolderCounts,
    pub pending_deliveries: usize,
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "session_id={} now_ms={} phase={:?} coins={} emails={} unread_inbox={} pending={}",
            self.session_id,
            self.now_ms,
            self.phase,
            self.coins,
            self.emails_total,
            self.unread.inbox,
            self.pending_deliveries
        )
    }
}

/// Full state dump for the presentation layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Snapshot {
    pub schema_version: String,
    pub session_id: String,
    pub now_ms: u64,
    pub player_name: String,
    pub phase: StoryPhase,
    pub coins: i64,
    pub next_story_index: usize,
    pub it_email_sent: bool,
    pub story_contacted: bool,
    pub interacted_contacts: Vec<String>,
    pub progress: GameProgress,
    pub emails: Vec<Email>,
    pub unread: FolderCounts,
    pub pending: Vec<PendingDelivery>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    SessionNotFound,
    InvalidAction,
    InvalidQuery,
    SessionStateConflict,
    InternalError,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApiError {
    pub schema_version: String,
    pub error_code: ErrorCode,
    pub message: String,
    pub details: Option<String>,
}

impl ApiError {
    pub fn new(error_code: ErrorCode, message: impl Into<String>, details: Option<String>) -> Self {
        Self {
            schema_version: SCHEMA_VERSION_V1.to_string(),
            error_code,
            message: message.into(),
            details,
        }
    }
}

/// Outcome envelope for one submitted player action.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ActionResult {
    pub schema_version: String,
    pub session_id: String,
    pub action: String,
    pub accepted: bool,
    pub email_id: Option<String>,
    pub error: Option<ApiError>,
}

impl ActionResult {
    pub fn accepted(
        session_id: impl Into<String>,
        action: impl Into<String>,
        email_id: Option<String>,
    ) -> Self {
        Self {
            schema_version: SCHEMA_VERSION_V1.to_string(),
            session_id: session_id.into(),
            action: action.into(),
            accepted: true,
            email_id,
            error: None,
        }
    }

    pub fn rejected(
        session_id: impl Into<String>,
        action: impl Into<String>,
        error: ApiError,
    ) -> Self {
        Self {
            schema_version: SCHEMA_VERSION_V1.to_string(),
            session_id: session_id.into(),
            action: action.into(),
            accepted: false,
            email_id: None,
            error: Some(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn folder_parse_round_trips_every_folder() {
        for folder in Folder::ALL {
            assert_eq!(Folder::parse(folder.as_str()), Some(folder));
        }
        assert_eq!(Folder::parse("outbox"), None);
        assert_eq!(Folder::parse(" Inbox "), Some(Folder::Inbox));
    }

    #[test]
    fn email_serde_round_trip() {
        let email = Email {
            id: "security-notice".to_string(),
            sender: "Marcus Vale, Chief Security Officer".to_string(),
            subject: "Mandatory security protocols".to_string(),
            body: "<p>Read carefully.</p>".to_string(),
            date: "Day 1".to_string(),
            received_time: "09:02 AM".to_string(),
            timestamp: 120_000,
            folder: Folder::Inbox,
            read: false,
            replied: false,
            kind: EmailKind::MultipleChoice,
            role: NarrativeRole::SecurityNotice,
            reply_options: vec![ReplyOption {
                text: "Understood, thanks for the heads up.".to_string(),
                consequence: Consequence::Acknowledge,
            }],
            spam_step: None,
        };

        let raw = serde_json::to_string(&email).expect("serialize");
        let decoded: Email = serde_json::from_str(&raw).expect("deserialize");
        assert_eq!(email, decoded);
    }

    #[test]
    fn delivery_serde_uses_tagged_representation() {
        let raw = serde_json::to_value(Delivery::SpamStep { step: 2 }).expect("serialize");
        assert_eq!(raw.get("type").and_then(Value::as_str), Some("spam_step"));

        let decoded: Delivery = serde_json::from_value(serde_json::json!({ "type": "story_next" }))
            .expect("deserialize");
        assert_eq!(decoded, Delivery::StoryNext);
    }

    #[test]
    fn template_defaults_omit_reply_options() {
        let decoded: EmailTemplate = serde_json::from_str(
            r#"{
                "sender": "IT Support",
                "subject": "Clearance request received",
                "body": "<p>We are on it.</p>",
                "kind": "read_only",
                "role": "it_clearance"
            }"#,
        )
        .expect("deserialize");
        assert!(decoded.reply_options.is_empty());
        assert_eq!(decoded.spam_step, None);
    }

    #[test]
    fn session_config_default_is_v1() {
        let config = SessionConfig::default();
        assert_eq!(config.schema_version, SCHEMA_VERSION_V1);
        assert_eq!(config.spam_limit, 4);
        assert!(config.player_name.is_empty());
    }
}

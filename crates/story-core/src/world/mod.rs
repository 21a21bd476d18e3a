use std::collections::BTreeSet;

mod actions;
mod delivery;
mod resolve;
mod snapshot;
mod state;
mod step;

use contracts::{
    Consequence, Delivery, Email, EmailKind, Folder, GameProgress, NarrativeRole, SessionConfig,
    StoryEvent, StoryEventKind, StoryPhase, SCHEMA_VERSION_V1,
};
use serde_json::{json, Value};

use crate::scheduler::DeliveryScheduler;
use crate::templates::{names, TemplateCatalog, TemplateError};

pub use actions::ActionError;
pub use state::EmailPatch;

/// Contact the research clue points at; the only recipient that advances the
/// main story when composed to.
pub const LEAD_CONTACT: &str = "Sam Okafor";
/// Support desk recipient; composing to it branches on narrative flags.
pub const SUPPORT_CONTACT: &str = "IT Support";

const DEFAULT_PLAYER_NAME: &str = "Detective";

/// The narrative session: every piece of mutable game state lives here and
/// is reached only through the action/query surface. There are no
/// module-level globals; handlers receive this world by reference.
#[derive(Debug)]
pub struct GameWorld {
    config: SessionConfig,
    catalog: TemplateCatalog,
    phase: StoryPhase,
    emails: Vec<Email>,
    current_folder: Folder,
    next_story_index: usize,
    it_email_sent: bool,
    story_contacted: bool,
    cascade_fired: bool,
    interacted_contacts: BTreeSet<String>,
    coins: i64,
    progress: GameProgress,
    scheduler: DeliveryScheduler,
    /// Token of the single pending cascade step, if any. Scheduling a new
    /// step supersedes (cancels) this one.
    cascade_task: Option<u64>,
    /// Token of the armed cascade-fallback timeout, if any.
    fallback_task: Option<u64>,
    event_log: Vec<StoryEvent>,
    next_sequence: u64,
    last_stamp: u64,
}

impl GameWorld {
    /// Build a session over the built-in catalog. The catalog is validated
    /// up front; this is the only fallible step of initialization.
    pub fn new(config: SessionConfig) -> Result<Self, TemplateError> {
        let catalog = TemplateCatalog::builtin()?;
        Self::with_catalog(config, catalog)
    }

    pub fn with_catalog(
        mut config: SessionConfig,
        catalog: TemplateCatalog,
    ) -> Result<Self, TemplateError> {
        catalog.validate(config.spam_limit)?;
        if config.player_name.trim().is_empty() {
            config.player_name = DEFAULT_PLAYER_NAME.to_string();
        }

        let mut world = Self {
            config,
            catalog,
            phase: StoryPhase::AwaitingWelcomeReply,
            emails: Vec::new(),
            current_folder: Folder::Inbox,
            next_story_index: 0,
            it_email_sent: false,
            story_contacted: false,
            cascade_fired: false,
            interacted_contacts: BTreeSet::new(),
            coins: 0,
            progress: GameProgress::default(),
            scheduler: DeliveryScheduler::new(),
            cascade_task: None,
            fallback_task: None,
            event_log: Vec::new(),
            next_sequence: 0,
            last_stamp: 0,
        };
        world.schedule_welcome();
        Ok(world)
    }

    pub fn session_id(&self) -> &str {
        &self.config.session_id
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn player_name(&self) -> &str {
        &self.config.player_name
    }

    pub fn now_ms(&self) -> u64 {
        self.scheduler.now_ms()
    }

    pub fn phase(&self) -> StoryPhase {
        self.phase
    }

    pub fn coins(&self) -> i64 {
        self.coins
    }

    pub fn progress(&self) -> &GameProgress {
        &self.progress
    }

    pub fn events(&self) -> &[StoryEvent] {
        &self.event_log
    }

    pub fn current_folder(&self) -> Folder {
        self.current_folder
    }

    pub fn story_contacted(&self) -> bool {
        self.story_contacted
    }

    fn schedule_welcome(&mut self) {
        self.scheduler.schedule(
            self.config.timing.welcome_delay_ms,
            Delivery::Template {
                name: names::WELCOME.to_string(),
            },
        );
    }

    fn push_event(&mut self, kind: StoryEventKind, details: Option<Value>) -> String {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        let at_ms = self.scheduler.now_ms();
        let event_id = format!("evt:{at_ms}:{sequence}");
        self.event_log.push(StoryEvent {
            schema_version: SCHEMA_VERSION_V1.to_string(),
            session_id: self.config.session_id.clone(),
            event_id: event_id.clone(),
            at_ms,
            sequence,
            kind,
            details,
        });
        event_id
    }

    /// Strictly increasing ordering stamp for new emails. Ties with the
    /// clock are broken upward so display order matches creation order.
    fn next_stamp(&mut self) -> u64 {
        let stamp = self.scheduler.now_ms().max(self.last_stamp + 1);
        self.last_stamp = stamp;
        stamp
    }

    fn award_coins(&mut self, amount: i64) {
        self.coins += amount;
        let total = self.coins;
        self.push_event(
            StoryEventKind::CoinsAwarded,
            Some(json!({ "amount": amount, "total": total })),
        );
    }

    fn set_phase(&mut self, phase: StoryPhase) {
        if self.phase == phase {
            return;
        }
        let from = self.phase;
        self.phase = phase;
        self.push_event(
            StoryEventKind::PhaseChanged,
            Some(json!({
                "from": format!("{from:?}"),
                "to": format!("{phase:?}"),
            })),
        );

        // Reaching a terminal phase makes every cascade timer moot; cancel
        // them so nothing fires into a finished (or resetting) story.
        if matches!(phase, StoryPhase::Resolution | StoryPhase::Reset) {
            if let Some(task) = self.cascade_task.take() {
                self.scheduler.cancel(task);
            }
            if let Some(task) = self.fallback_task.take() {
                self.scheduler.cancel(task);
            }
        }
    }
}

//! In-process session facade with action validation, preference persistence,
//! and the HTTP/WebSocket server.

mod persistence;
mod server;

use std::path::Path;

use contracts::{
    ActionResult, ApiError, Contact, Email, ErrorCode, Folder, SessionConfig, SessionStatus,
    Snapshot, StoryEvent,
};
use story_core::world::GameWorld;
use story_core::{ActionError, TemplateError};

use persistence::SqlitePrefsStore;
pub use persistence::PersistenceError;
pub use server::{serve, ServerError};

pub const DISPLAY_NAME_KEY: &str = "display_name";
pub const THEME_KEY: &str = "theme";

/// Session initialization failure: either the catalog is unusable or the
/// preference store cannot be opened. Both abort startup loudly; nothing
/// downstream of a constructed session fails this way.
#[derive(Debug)]
pub enum SessionInitError {
    Template(TemplateError),
    Persistence(PersistenceError),
}

impl std::fmt::Display for SessionInitError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Template(err) => write!(f, "failed to start session: {err}"),
            Self::Persistence(err) => write!(f, "failed to start session: {err}"),
        }
    }
}

impl std::error::Error for SessionInitError {}

impl From<TemplateError> for SessionInitError {
    fn from(value: TemplateError) -> Self {
        Self::Template(value)
    }
}

impl From<PersistenceError> for SessionInitError {
    fn from(value: PersistenceError) -> Self {
        Self::Persistence(value)
    }
}

/// Facade over one `GameWorld`: validates actions into `ActionResult`
/// envelopes, exposes the query surface, and owns the optional preference
/// store.
#[derive(Debug)]
pub struct SessionApi {
    world: GameWorld,
    prefs: Option<SqlitePrefsStore>,
}

impl SessionApi {
    pub fn from_config(config: SessionConfig) -> Result<Self, SessionInitError> {
        Ok(Self {
            world: GameWorld::new(config)?,
            prefs: None,
        })
    }

    /// Build a session with a preference store attached. A config without a
    /// player name reads the stored display name once, here; a config that
    /// carries one persists it for the next session.
    pub fn from_config_with_prefs(
        mut config: SessionConfig,
        prefs_path: impl AsRef<Path>,
    ) -> Result<Self, SessionInitError> {
        let prefs = SqlitePrefsStore::open(prefs_path)?;
        if config.player_name.trim().is_empty() {
            if let Some(stored) = prefs.get(DISPLAY_NAME_KEY)? {
                config.player_name = stored;
            }
        } else {
            prefs.set(DISPLAY_NAME_KEY, config.player_name.trim())?;
        }

        Ok(Self {
            world: GameWorld::new(config)?,
            prefs: Some(prefs),
        })
    }

    pub fn session_id(&self) -> &str {
        self.world.session_id()
    }

    pub fn player_name(&self) -> &str {
        self.world.player_name()
    }

    // -- time ------------------------------------------------------------

    pub fn advance_to(&mut self, now_ms: u64) -> usize {
        self.world.advance_to(now_ms)
    }

    pub fn advance_by(&mut self, delta_ms: u64) -> usize {
        self.world.advance_by(delta_ms)
    }

    // -- actions ---------------------------------------------------------

    pub fn submit_interactive_reply(&mut self, email_id: &str, body: &str) -> ActionResult {
        let outcome = self.world.submit_interactive_reply(email_id, body);
        self.action_result("reply", outcome.map(Some))
    }

    pub fn submit_choice_reply(&mut self, email_id: &str, option_index: usize) -> ActionResult {
        let outcome = self.world.submit_choice_reply(email_id, option_index);
        self.action_result("choice", outcome.map(Some))
    }

    pub fn submit_compose(&mut self, to: &str, subject: &str, body: &str) -> ActionResult {
        let outcome = self.world.submit_compose(to, subject, body);
        self.action_result("compose", outcome.map(Some))
    }

    pub fn submit_install(&mut self) -> ActionResult {
        let outcome = self.world.submit_install();
        self.action_result("install", outcome.map(|()| None))
    }

    pub fn record_clue_revealed(&mut self) -> ActionResult {
        self.world.record_clue_revealed();
        ActionResult::accepted(self.world.session_id(), "clue", None)
    }

    pub fn open_email(&mut self, email_id: &str) {
        self.world.mark_read(email_id);
    }

    pub fn delete_email(&mut self, email_id: &str) {
        self.world.delete_email(email_id);
    }

    pub fn set_current_folder(&mut self, folder: Folder) {
        self.world.set_current_folder(folder);
    }

    // -- queries ---------------------------------------------------------

    pub fn status(&self) -> SessionStatus {
        self.world.status()
    }

    pub fn snapshot(&self) -> Snapshot {
        self.world.snapshot()
    }

    pub fn contacts(&self) -> Vec<Contact> {
        self.world.contacts()
    }

    pub fn events(&self) -> &[StoryEvent] {
        self.world.events()
    }

    pub fn email(&self, email_id: &str) -> Option<&Email> {
        self.world.get_email_by_id(email_id)
    }

    /// Folder contents in display order: timestamp descending, newest
    /// first.
    pub fn folder_emails(&self, folder: Folder) -> Vec<Email> {
        let mut emails = self
            .world
            .get_emails_for_folder(folder)
            .into_iter()
            .cloned()
            .collect::<Vec<_>>();
        emails.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        emails
    }

    // -- preferences -----------------------------------------------------

    pub fn preference(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        match &self.prefs {
            Some(prefs) => prefs.get(key),
            None => Err(PersistenceError::NotAttached),
        }
    }

    pub fn set_preference(&mut self, key: &str, value: &str) -> Result<(), PersistenceError> {
        match &self.prefs {
            Some(prefs) => prefs.set(key, value),
            None => Err(PersistenceError::NotAttached),
        }
    }

    fn action_result(
        &self,
        action: &str,
        outcome: Result<Option<String>, ActionError>,
    ) -> ActionResult {
        match outcome {
            Ok(email_id) => ActionResult::accepted(self.world.session_id(), action, email_id),
            Err(err) => ActionResult::rejected(
                self.world.session_id(),
                action,
                ApiError::new(ErrorCode::InvalidAction, err.to_string(), None),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::TimingConfig;

    fn fast_config() -> SessionConfig {
        SessionConfig {
            session_id: "session_api_test".to_string(),
            player_name: "Robin Vega".to_string(),
            timing: TimingConfig {
                welcome_delay_ms: 10,
                story_advance_delay_ms: 10,
                ..TimingConfig::default()
            },
            ..SessionConfig::default()
        }
    }

    #[test]
    fn actions_map_errors_into_rejection_envelopes() {
        let mut api = SessionApi::from_config(fast_config()).expect("session builds");
        api.advance_by(10);

        let accepted = api.submit_interactive_reply("welcome", "Hello!");
        assert!(accepted.accepted);
        assert!(accepted.email_id.is_some());

        let rejected = api.submit_interactive_reply("welcome", "Hello again!");
        assert!(!rejected.accepted);
        let error = rejected.error.expect("error envelope");
        assert_eq!(error.error_code, ErrorCode::InvalidAction);
        assert!(error.message.contains("already replied"));
    }

    #[test]
    fn folder_listing_is_newest_first() {
        let mut api = SessionApi::from_config(fast_config()).expect("session builds");
        api.advance_by(10);
        api.submit_interactive_reply("welcome", "Hello!");
        api.advance_by(10);

        let inbox = api.folder_emails(Folder::Inbox);
        for pair in inbox.windows(2) {
            assert!(pair[0].timestamp >= pair[1].timestamp);
        }
    }

    #[test]
    fn preference_queries_require_an_attached_store() {
        let api = SessionApi::from_config(fast_config()).expect("session builds");
        assert!(matches!(
            api.preference(DISPLAY_NAME_KEY),
            Err(PersistenceError::NotAttached)
        ));
    }
}

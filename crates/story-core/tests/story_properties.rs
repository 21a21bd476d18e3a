use contracts::{
    Consequence, Delivery, Folder, GameProgress, NarrativeRole, SessionConfig, StoryEventKind,
    StoryPhase, TimingConfig,
};
use proptest::prelude::*;
use story_core::world::{GameWorld, LEAD_CONTACT, SUPPORT_CONTACT};
use story_core::ActionError;

fn fast_timing() -> TimingConfig {
    TimingConfig {
        welcome_delay_ms: 10,
        story_advance_delay_ms: 10,
        cascade_ack_delay_ms: 10,
        cascade_step_delay_ms: 10,
        scam_followup_delay_ms: 10,
        it_response_delay_ms: 10,
        research_delay_ms: 10,
        lead_reply_delay_ms: 10,
        exec_checkin_delay_ms: 10,
        ceo_delay_ms: 10,
        hr_delay_ms: 20,
        security_followup_delay_ms: 10,
        fallback_cascade_timeout_ms: 50,
        clearance_cascade_delay_ms: 10,
        countdown_tick_ms: 5,
        restart_delay_ms: 10,
    }
}

fn base_config() -> SessionConfig {
    SessionConfig {
        session_id: "session_props".to_string(),
        player_name: "Robin Vega".to_string(),
        timing: fast_timing(),
        reset_countdown_seconds: 3,
        ..SessionConfig::default()
    }
}

fn choose(world: &mut GameWorld, email_id: &str, consequence: Consequence) {
    let index = world
        .get_email_by_id(email_id)
        .expect("email present")
        .reply_options
        .iter()
        .position(|option| option.consequence == consequence)
        .expect("option present");
    world
        .submit_choice_reply(email_id, index)
        .expect("choice accepted");
}

/// Drive a fresh world to the delivered security notice.
fn world_at_security_notice() -> GameWorld {
    let mut world = GameWorld::new(base_config()).expect("world builds");
    world.advance_by(10);
    world
        .submit_interactive_reply("welcome", "Ready to start.")
        .expect("welcome reply");
    world.advance_by(10);
    assert!(world.get_email_by_id("security-notice").is_some());
    world
}

fn world_at_first_spam() -> GameWorld {
    let mut world = world_at_security_notice();
    choose(&mut world, "security-notice", Consequence::Acknowledge);
    world.advance_by(10);
    world
}

fn spam_emails(world: &GameWorld) -> usize {
    world
        .snapshot()
        .emails
        .iter()
        .filter(|email| email.role == NarrativeRole::Spam)
        .count()
}

#[test]
fn property_1_install_never_schedules_two_followups() {
    let mut world = world_at_first_spam();
    choose(&mut world, "spam-1", Consequence::ReportJunk);
    world.advance_by(10);

    world.submit_install().expect("first install");
    assert_eq!(
        world.submit_install(),
        Err(ActionError::ToolAlreadyInstalled)
    );
    world.submit_install().expect_err("still rejected");

    world.advance_by(1_000);
    let research = world
        .snapshot()
        .emails
        .iter()
        .filter(|email| email.role == NarrativeRole::Research)
        .count();
    assert_eq!(research, 1);
}

#[test]
fn property_2_replied_email_never_accepts_another_reply() {
    let mut world = world_at_first_spam();
    choose(&mut world, "spam-1", Consequence::ReportJunk);

    let sent_before = world.get_emails_for_folder(Folder::Sent).len();
    for index in 0..2 {
        assert!(matches!(
            world.submit_choice_reply("spam-1", index),
            Err(ActionError::AlreadyReplied(_))
        ));
    }
    assert!(matches!(
        world.submit_interactive_reply("security-notice", "hi"),
        Err(ActionError::AlreadyReplied(_)) | Err(ActionError::NotReplyable(_))
    ));
    assert_eq!(world.get_emails_for_folder(Folder::Sent).len(), sent_before);
}

#[test]
fn property_3_cascade_is_bounded_and_ends_in_reset() {
    let mut world = world_at_first_spam();
    let limit = world.config().spam_limit;

    for step in 1..=limit {
        choose(&mut world, &format!("spam-{step}"), Consequence::Scam);
        world.advance_by(10);
    }

    assert_eq!(spam_emails(&world), limit as usize);
    assert!(world.get_email_by_id(&format!("spam-{}", limit + 1)).is_none());
    assert!(world.get_email_by_id("reset-notice").is_some());
    assert_eq!(world.phase(), StoryPhase::Reset);
}

#[test]
fn property_4_at_most_one_cascade_timer_is_ever_live() {
    let mut world = world_at_security_notice();
    choose(&mut world, "security-notice", Consequence::Concern);
    world.advance_by(10);

    // Burst of overlapping support composes while the fallback is armed.
    for attempt in 0..3 {
        world
            .submit_compose(
                SUPPORT_CONTACT,
                &format!("Clearance request {attempt}"),
                "Requesting access.",
            )
            .expect("compose accepted");
        let live_cascade_steps = world
            .snapshot()
            .pending
            .iter()
            .filter(|pending| matches!(pending.delivery, Delivery::SpamStep { .. }))
            .count();
        assert!(live_cascade_steps <= 1, "burst left {live_cascade_steps} cascade timers");
    }

    world.advance_by(1_000);
    assert_eq!(spam_emails(&world), 1);
}

#[test]
fn property_5_folder_moves_preserve_identity() {
    let mut world = world_at_first_spam();
    let before = world.get_email_by_id("spam-1").expect("spam").clone();

    choose(&mut world, "spam-1", Consequence::ReportJunk);

    let after = world.get_email_by_id("spam-1").expect("spam");
    assert_eq!(after.folder, Folder::Spam);
    assert!(after.replied);
    assert_eq!(after.id, before.id);
    assert_eq!(after.sender, before.sender);
    assert_eq!(after.subject, before.subject);
    assert_eq!(after.body, before.body);
    assert_eq!(after.timestamp, before.timestamp);

    let notice = world.get_email_by_id("security-notice").expect("notice");
    assert_eq!(notice.folder, Folder::Trash, "non-junk replies go to trash");
}

#[test]
fn property_6_reset_restores_initial_state_and_redelivers_welcome_once() {
    let mut world = world_at_first_spam();
    let limit = world.config().spam_limit;
    for step in 1..=limit {
        choose(&mut world, &format!("spam-{step}"), Consequence::Scam);
        world.advance_by(10);
    }

    // Let the countdown run out and the welcome redeliver.
    world.advance_by(5_000);

    let snapshot = world.snapshot();
    assert_eq!(snapshot.coins, 0);
    assert_eq!(snapshot.next_story_index, 0);
    assert!(!snapshot.it_email_sent);
    assert!(!snapshot.story_contacted);
    assert_eq!(snapshot.progress, GameProgress {
        has_received_welcome: true,
        ..GameProgress::default()
    });
    assert_eq!(snapshot.emails.len(), 1);
    assert_eq!(snapshot.emails[0].role, NarrativeRole::Welcome);
    assert!(!snapshot.emails[0].replied);

    let resets = world
        .events()
        .iter()
        .filter(|event| event.kind == StoryEventKind::SessionReset)
        .count();
    assert_eq!(resets, 1);
}

#[test]
fn property_8_report_junk_scenario() {
    let mut world = world_at_first_spam();
    let reward = world.config().junk_report_reward;

    choose(&mut world, "spam-1", Consequence::ReportJunk);
    assert_eq!(world.coins(), reward);
    assert_eq!(
        world.get_email_by_id("spam-1").expect("spam").folder,
        Folder::Spam
    );

    world.advance_by(10);
    let it_emails = world
        .snapshot()
        .emails
        .iter()
        .filter(|email| email.role == NarrativeRole::ItSupport)
        .count();
    assert_eq!(it_emails, 1);
}

#[test]
fn property_9_lead_compose_scenario() {
    let mut world = world_at_first_spam();
    choose(&mut world, "spam-1", Consequence::ReportJunk);
    world.advance_by(10);
    world.submit_install().expect("install");
    world.advance_by(10);
    world.record_clue_revealed();

    let reward = world.config().lead_contact_reward;
    let coins_before = world.coins();
    world
        .submit_compose(LEAD_CONTACT, "A quick question", "Could we talk?")
        .expect("lead compose");
    assert!(world.story_contacted());
    assert_eq!(world.coins(), coins_before + reward);

    assert_eq!(
        world.submit_compose(LEAD_CONTACT, "Another question", "More?"),
        Err(ActionError::LeadAlreadyContacted)
    );
    assert_eq!(world.coins(), coins_before + reward, "reward paid once");

    world.advance_by(10);
    assert!(world.get_email_by_id("lead-reply").is_some());
}

#[test]
fn full_success_playthrough_reaches_resolution_with_no_stray_timers() {
    let mut world = world_at_first_spam();
    choose(&mut world, "spam-1", Consequence::ReportJunk);
    world.advance_by(10);
    world.submit_install().expect("install");
    world.advance_by(10);
    world.record_clue_revealed();
    world
        .submit_compose(LEAD_CONTACT, "A quick question", "Could we talk?")
        .expect("lead compose");
    world.advance_by(20);
    world
        .submit_interactive_reply("exec-checkin", "")
        .expect("exec reply");
    world.advance_by(20);

    assert_eq!(world.phase(), StoryPhase::Resolution);
    assert_eq!(world.pending_deliveries(), 0);
    assert!(world.progress().has_received_ceo);
    assert!(world.progress().has_received_hr);

    // Long idle changes nothing once the story is resolved.
    let emails_at_resolution = world.snapshot().emails.len();
    world.advance_by(600_000);
    assert_eq!(world.snapshot().emails.len(), emails_at_resolution);
}

// -- property: derived unread counts never drift ---------------------------

/// One step of a randomized play session: advance time, flip folders, mark
/// things read. After any prefix the derived counts must equal a recount.
#[derive(Debug, Clone)]
enum PlayerOp {
    Advance(u64),
    MarkRead(usize),
    SetFolder(Folder),
    JunkFirstSpam,
    ReplyWelcome,
}

fn player_op() -> impl Strategy<Value = PlayerOp> {
    prop_oneof![
        (0_u64..40).prop_map(PlayerOp::Advance),
        (0_usize..8).prop_map(PlayerOp::MarkRead),
        prop_oneof![
            Just(Folder::Inbox),
            Just(Folder::Sent),
            Just(Folder::Spam),
            Just(Folder::Trash),
        ]
        .prop_map(PlayerOp::SetFolder),
        Just(PlayerOp::JunkFirstSpam),
        Just(PlayerOp::ReplyWelcome),
    ]
}

proptest! {
    #[test]
    fn property_7_unread_counts_always_match_recount(ops in prop::collection::vec(player_op(), 1..40)) {
        let mut world = GameWorld::new(base_config()).expect("world builds");

        for op in ops {
            match op {
                PlayerOp::Advance(delta) => {
                    world.advance_by(delta);
                }
                PlayerOp::MarkRead(index) => {
                    let id = world.snapshot().emails.get(index).map(|email| email.id.clone());
                    if let Some(id) = id {
                        world.mark_read(&id);
                    }
                }
                PlayerOp::SetFolder(folder) => world.set_current_folder(folder),
                PlayerOp::JunkFirstSpam => {
                    let target = world
                        .snapshot()
                        .emails
                        .iter()
                        .find(|email| email.role == NarrativeRole::Spam && !email.replied)
                        .map(|email| email.id.clone());
                    if let Some(id) = target {
                        choose(&mut world, &id, Consequence::ReportJunk);
                    }
                }
                PlayerOp::ReplyWelcome => {
                    let _ = world.submit_interactive_reply("welcome", "");
                }
            }

            let counts = world.unread_counts();
            let snapshot = world.snapshot();
            for folder in Folder::ALL {
                let expected = snapshot
                    .emails
                    .iter()
                    .filter(|email| email.folder == folder && !email.read)
                    .count();
                prop_assert_eq!(counts.get(folder), expected);
            }
            prop_assert_eq!(snapshot.unread, counts);
        }
    }
}

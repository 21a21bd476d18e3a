use std::env;
use std::net::SocketAddr;

use contracts::{Consequence, SessionConfig};
use story_api::{serve, SessionApi};

fn print_usage() {
    println!("casefile <command>");
    println!("commands:");
    println!("  serve [addr]");
    println!("    default addr: 127.0.0.1:8080");
    println!("  simulate <scenario> [player_name]");
    println!("    scenarios: success | reset");
    println!("    runs a scripted playthrough on the logical clock and prints events");
}

fn parse_socket_addr(value: Option<&String>) -> Result<SocketAddr, String> {
    let raw = value.map(String::as_str).unwrap_or("127.0.0.1:8080");
    raw.parse::<SocketAddr>()
        .map_err(|_| format!("invalid addr: {raw}"))
}

/// Print event-log entries appended since the last call.
fn drain_events(api: &SessionApi, printed: &mut usize) {
    for event in &api.events()[*printed..] {
        let details = event
            .details
            .as_ref()
            .map(|details| details.to_string())
            .unwrap_or_default();
        println!("[{:>7}ms] {:?} {}", event.at_ms, event.kind, details);
    }
    *printed = api.events().len();
}

fn find_option(api: &SessionApi, email_id: &str, consequence: Consequence) -> Result<usize, String> {
    let email = api
        .email(email_id)
        .ok_or_else(|| format!("email not delivered: {email_id}"))?;
    email
        .reply_options
        .iter()
        .position(|option| option.consequence == consequence)
        .ok_or_else(|| format!("email {email_id} has no {consequence:?} option"))
}

fn checked(result: contracts::ActionResult) -> Result<(), String> {
    if result.accepted {
        Ok(())
    } else {
        let message = result
            .error
            .map(|error| error.message)
            .unwrap_or_else(|| "action rejected".to_string());
        Err(format!("{} rejected: {message}", result.action))
    }
}

fn run_simulation(args: &[String]) -> Result<(), String> {
    let scenario = args
        .get(2)
        .cloned()
        .ok_or_else(|| "missing scenario".to_string())?;
    let player_name = args.get(3).cloned().unwrap_or_else(|| "Quinn Marlowe".to_string());

    let config = SessionConfig {
        session_id: "session_sim_001".to_string(),
        player_name,
        ..SessionConfig::default()
    };
    let timing = config.timing.clone();
    let spam_limit = config.spam_limit;
    let countdown_ms =
        u64::from(config.reset_countdown_seconds + 1) * timing.countdown_tick_ms;

    let mut api = SessionApi::from_config(config).map_err(|err| err.to_string())?;
    let mut printed = 0_usize;

    // Shared opening: welcome arrives, we answer, the security notice lands.
    api.advance_by(timing.welcome_delay_ms);
    drain_events(&api, &mut printed);
    checked(api.submit_interactive_reply("welcome", ""))?;
    api.advance_by(timing.story_advance_delay_ms);
    drain_events(&api, &mut printed);

    checked(api.submit_choice_reply(
        "security-notice",
        find_option(&api, "security-notice", Consequence::Acknowledge)?,
    ))?;
    api.advance_by(timing.cascade_ack_delay_ms);
    drain_events(&api, &mut printed);

    match scenario.as_str() {
        "success" => {
            checked(api.submit_choice_reply(
                "spam-1",
                find_option(&api, "spam-1", Consequence::ReportJunk)?,
            ))?;
            api.advance_by(timing.it_response_delay_ms);
            drain_events(&api, &mut printed);

            checked(api.submit_install())?;
            api.advance_by(timing.research_delay_ms);
            drain_events(&api, &mut printed);

            checked(api.record_clue_revealed())?;
            checked(api.submit_compose(
                "Sam Okafor",
                "A quick question",
                "I'm looking into the archive irregularities. Could we talk?",
            ))?;
            api.advance_by(timing.lead_reply_delay_ms);
            api.advance_by(timing.exec_checkin_delay_ms);
            drain_events(&api, &mut printed);

            checked(api.submit_interactive_reply("exec-checkin", ""))?;
            api.advance_by(timing.ceo_delay_ms.max(timing.hr_delay_ms));
            drain_events(&api, &mut printed);
        }
        "reset" => {
            for step in 1..=spam_limit {
                let email_id = format!("spam-{step}");
                checked(api.submit_choice_reply(
                    &email_id,
                    find_option(&api, &email_id, Consequence::Scam)?,
                ))?;
                api.advance_by(timing.scam_followup_delay_ms + timing.cascade_step_delay_ms);
                drain_events(&api, &mut printed);
            }
            // Let the countdown run out and the session restart.
            api.advance_by(countdown_ms + timing.restart_delay_ms + timing.welcome_delay_ms);
            drain_events(&api, &mut printed);
        }
        other => return Err(format!("unknown scenario: {other}")),
    }

    println!("{}", api.status());
    Ok(())
}

#[tokio::main]
async fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let command = args.get(1).map(String::as_str);

    match command {
        Some("serve") => match parse_socket_addr(args.get(2)) {
            Ok(addr) => {
                println!("serving api on http://{addr}");
                if let Err(err) = serve(addr).await {
                    eprintln!("server error: {err}");
                    std::process::exit(1);
                }
            }
            Err(err) => {
                eprintln!("error: {err}");
                print_usage();
                std::process::exit(2);
            }
        },
        Some("simulate") => {
            if let Err(err) = run_simulation(&args) {
                eprintln!("error: {err}");
                print_usage();
                std::process::exit(2);
            }
        }
        _ => {
            print_usage();
        }
    }
}

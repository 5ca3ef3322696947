use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};

use weathernow_core::{AppError, Config};
use weathernow_session::{CapabilityState, EventReceiver, SessionEvent, WeatherSession};

mod render;

/// One line of terminal input
#[derive(Debug, PartialEq)]
enum Command<'a> {
    Query(&'a str),
    /// 1-based position in the listed results
    Pick(usize),
    First,
    Here,
    ToggleTemperature,
    CycleWind,
    EnableAdvisory,
    Show,
    Help,
    Quit,
    Unknown(&'a str),
}

impl<'a> Command<'a> {
    fn parse(line: &'a str) -> Self {
        let Some(rest) = line.strip_prefix(':') else {
            return Command::Query(line);
        };
        let mut parts = rest.split_whitespace();
        match (parts.next(), parts.next()) {
            (Some("pick"), Some(n)) => match n.parse::<usize>() {
                Ok(n) if n > 0 => Command::Pick(n),
                _ => Command::Unknown(line),
            },
            (Some("first"), None) => Command::First,
            (Some("here"), None) => Command::Here,
            (Some("temp"), None) => Command::ToggleTemperature,
            (Some("wind"), None) => Command::CycleWind,
            (Some("ai"), None) => Command::EnableAdvisory,
            (Some("show"), None) => Command::Show,
            (Some("help"), None) => Command::Help,
            (Some("quit" | "q"), None) => Command::Quit,
            _ => Command::Unknown(line),
        }
    }
}

fn main() -> Result<()> {
    weathernow_core::init()?;

    let (config, _) = Config::load_validated()?;
    let runtime = tokio::runtime::Runtime::new().context("Failed to start async runtime")?;
    let (session, events) = WeatherSession::from_config(&config, runtime.handle().clone())?;

    tracing::info!("Weather Now started");

    let result = runtime.block_on(async {
        let printer = tokio::spawn(print_events(events));
        let result = run_prompt(&session).await;
        printer.abort();
        result
    });

    // stdin reads run on a blocking thread that would hold up a normal shutdown
    runtime.shutdown_background();
    result
}

async fn run_prompt(session: &WeatherSession) -> Result<()> {
    println!("{}", render::HELP);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await? {
        match Command::parse(line.trim()) {
            Command::Query(text) => session.set_query(text),
            Command::Pick(n) => {
                if session.select(n - 1).is_none() {
                    println!("No result #{n}");
                }
            }
            Command::First => {
                if session.select_first().is_none() {
                    println!("No results to pick from");
                }
            }
            Command::Here => {
                if let Err(e) = session.use_my_location().await {
                    println!("{}", AppError::from(e).user_message());
                }
            }
            Command::ToggleTemperature => {
                let units = session.toggle_temperature_unit();
                println!("Temperature in {}", units.temperature.label());
            }
            Command::CycleWind => {
                let units = session.cycle_wind_unit();
                println!("Wind in {}", units.wind_speed.label());
            }
            Command::EnableAdvisory => session.enable_advisory(),
            Command::Show => match (session.selected_place(), session.snapshot()) {
                (Some(place), Some(snapshot)) => {
                    println!("{}", render::snapshot(&place, &snapshot));
                    let advisory = session.advisory();
                    if !advisory.is_empty() {
                        println!("\n{advisory}");
                    } else if session.is_advisory_thinking() {
                        println!("\nAI is thinking...");
                    }
                }
                _ => println!("Nothing selected yet"),
            },
            Command::Help => println!("{}", render::HELP),
            Command::Quit => break,
            Command::Unknown(text) => println!("Unknown command: {text} (try :help)"),
        }
    }

    Ok(())
}

async fn print_events(mut events: EventReceiver) {
    while let Some(event) = events.recv().await {
        match event {
            SessionEvent::SearchStarted { query } => println!("Searching for '{query}'..."),
            SessionEvent::PlacesUpdated(places) => {
                if !places.is_empty() {
                    println!("{}", render::place_list(&places));
                }
            }
            SessionEvent::FetchStarted { place, .. } => {
                println!("Loading weather for {}...", place.label());
            }
            SessionEvent::SnapshotUpdated { place, snapshot } => {
                println!("{}", render::snapshot(&place, &snapshot));
            }
            SessionEvent::FetchFailed { message } => println!("! {message}"),
            SessionEvent::AdvisoryStatusChanged(CapabilityState::Failed(reason)) => {
                println!("AI unavailable: {reason}. You can still use the weather features.");
            }
            SessionEvent::AdvisoryStatusChanged(state) => println!("AI {state}"),
            SessionEvent::AdvisoryCleared => {}
            SessionEvent::AdvisoryThinking(true) => println!("AI is thinking..."),
            SessionEvent::AdvisoryThinking(false) => {}
            SessionEvent::AdvisoryUpdated(text) => println!("\n{text}\n"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_is_query() {
        assert_eq!(Command::parse("San Francisco"), Command::Query("San Francisco"));
        assert_eq!(Command::parse(""), Command::Query(""));
    }

    #[test]
    fn test_commands() {
        assert_eq!(Command::parse(":pick 3"), Command::Pick(3));
        assert_eq!(Command::parse(":first"), Command::First);
        assert_eq!(Command::parse(":here"), Command::Here);
        assert_eq!(Command::parse(":temp"), Command::ToggleTemperature);
        assert_eq!(Command::parse(":wind"), Command::CycleWind);
        assert_eq!(Command::parse(":ai"), Command::EnableAdvisory);
        assert_eq!(Command::parse(":show"), Command::Show);
        assert_eq!(Command::parse(":q"), Command::Quit);
    }

    #[test]
    fn test_bad_pick_is_unknown() {
        assert_eq!(Command::parse(":pick 0"), Command::Unknown(":pick 0"));
        assert_eq!(Command::parse(":pick x"), Command::Unknown(":pick x"));
        assert_eq!(Command::parse(":pick"), Command::Unknown(":pick"));
    }
}

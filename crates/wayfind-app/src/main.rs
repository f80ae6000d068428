//! Wayfind application binary - composition root.
//!
//! Two commands share one configuration:
//! - `serve` runs the places proxy that keeps the Google Maps key server-side
//! - `chat` runs an interactive session: local model for intent extraction,
//!   the proxy for search, and a text map in the terminal

mod cli;
mod terminal;

use std::io::Write;
use std::time::Duration;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast;

use wayfind_chat::{
    Conversation, FixedLocation, IntentExtractor, MapWidget, ModelClient, OllamaClient,
    TurnOutcome, TurnRejected,
};
use wayfind_core::{SessionEvent, WayfindConfig};
use wayfind_places::{HttpPlacesService, PlaceSearchClient, PlacesService};
use wayfind_proxy::{start_server, AppState};

use crate::cli::{CliArgs, Command};
use crate::terminal::{render_message, TerminalMap};

const HELP: &str = "Type a request such as \"coffee shops near me\".\n\
    Commands: /N selects place N on the map, /list shows the markers, /quit exits.";

fn init_tracing(level: &str, to_stderr: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(level))
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if to_stderr {
        builder.with_writer(std::io::stderr).init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();
    let args = CliArgs::parse();

    let config_file = args.resolve_config_path();
    let mut config = WayfindConfig::load_or_default(&config_file);
    args.apply(&mut config);

    init_tracing(
        &config.general.log_level,
        matches!(args.command, Command::Chat { .. }),
    );
    tracing::info!("Starting Wayfind v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(path = %config_file.display(), "Configuration loaded");
    config.validate()?;

    match args.command {
        Command::Serve { .. } => serve(config).await,
        Command::Chat { .. } => chat(config).await,
    }
}

async fn serve(config: WayfindConfig) -> Result<(), Box<dyn std::error::Error>> {
    let port = config.proxy.port;
    let state = AppState::google(config.proxy)?;
    if let Err(e) = start_server(state).await {
        tracing::error!(port, error = %e, "Proxy stopped");
        tracing::error!("Try: WAYFIND_PORT={} wayfind serve", port.saturating_add(1));
        return Err(e.into());
    }
    Ok(())
}

async fn chat(config: WayfindConfig) -> Result<(), Box<dyn std::error::Error>> {
    let places = HttpPlacesService::new(
        &config.places.backend_url,
        Duration::from_secs(config.places.timeout_secs),
    )?;
    match places.health().await {
        Ok(health) => tracing::info!(url = %places.base_url(), status = %health.status, "Places proxy reachable"),
        Err(e) => tracing::warn!(
            url = %places.base_url(),
            error = %e,
            "Places proxy unreachable; searches will fail until it is running"
        ),
    }

    let model = OllamaClient::from_config(&config.assistant)?;
    tracing::info!(model = %model.model_name(), url = %config.assistant.base_url, "Using local model");

    let mut map = TerminalMap::new();
    map.focus(config.map.default_center, config.map.initial_zoom);
    let conversation = Conversation::new(
        IntentExtractor::new(model, Duration::from_secs(config.assistant.timeout_secs)),
        PlaceSearchClient::from_config(places, &config.places),
        map.clone(),
        &config,
    );
    let mut events = conversation.subscribe();

    let mut stdout = std::io::stdout();
    for message in conversation.transcript() {
        render_message(&mut stdout, &message)?;
    }
    println!("{}", HELP);

    conversation
        .locate(&FixedLocation::from_config(&config.location))
        .await;
    drain_events(&mut events, &map)?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        stdout.flush()?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let input = line.trim();

        if let Some(command) = input.strip_prefix('/') {
            match command {
                "quit" | "exit" => break,
                "help" => println!("{}", HELP),
                "list" => list_markers(&conversation),
                n => select_by_number(&conversation, n),
            }
            drain_events(&mut events, &map)?;
            continue;
        }

        let outcome = run_turn(&conversation, input, &mut events, &map).await?;
        match outcome {
            Err(TurnRejected::Busy) => println!("Still working on the previous request."),
            Err(TurnRejected::Blank) => {}
            Ok(outcome) => tracing::debug!(?outcome, "Turn finished"),
        }
    }

    tracing::info!("Session ended");
    Ok(())
}

/// Submit one line, rendering transcript changes while the turn runs.
async fn run_turn<M, S>(
    conversation: &Conversation<M, S, TerminalMap>,
    input: &str,
    events: &mut broadcast::Receiver<SessionEvent>,
    map: &TerminalMap,
) -> std::io::Result<Result<TurnOutcome, TurnRejected>>
where
    M: ModelClient,
    S: PlacesService,
{
    let turn = conversation.submit(input);
    tokio::pin!(turn);
    let outcome = loop {
        tokio::select! {
            outcome = &mut turn => break outcome,
            event = events.recv() => {
                if let Ok(event) = event {
                    render_event(&event)?;
                }
            }
        }
    };
    drain_events(events, map)?;
    Ok(outcome)
}

/// Print everything published so far, then the buffered map lines.
fn drain_events(
    events: &mut broadcast::Receiver<SessionEvent>,
    map: &TerminalMap,
) -> std::io::Result<()> {
    loop {
        match events.try_recv() {
            Ok(event) => render_event(&event)?,
            Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "Terminal fell behind session events");
            }
            Err(_) => break,
        }
    }
    for line in map.take_lines() {
        println!("{}", line);
    }
    Ok(())
}

fn render_event(event: &SessionEvent) -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    match event {
        // The user's own line is already on screen.
        SessionEvent::MessageAppended { message, .. }
            if message.kind != wayfind_core::MessageKind::User =>
        {
            render_message(&mut stdout, message)
        }
        SessionEvent::TransientReplaced { message, .. } => render_message(&mut stdout, message),
        SessionEvent::TurnStateChanged { from, to } => {
            tracing::debug!(%from, %to, "Turn state");
            Ok(())
        }
        _ => Ok(()),
    }
}

fn list_markers<M, S>(conversation: &Conversation<M, S, TerminalMap>)
where
    M: ModelClient,
    S: PlacesService,
{
    let markers = conversation.markers();
    if markers.is_empty() {
        println!("No places on the map yet.");
        return;
    }
    for m in markers {
        let mark = if conversation.is_highlighted(&m.place_id) { "*" } else { " " };
        println!(" {} ({:>2}) {}", mark, m.label, m.title);
    }
}

fn select_by_number<M, S>(conversation: &Conversation<M, S, TerminalMap>, arg: &str)
where
    M: ModelClient,
    S: PlacesService,
{
    let Ok(n) = arg.parse::<usize>() else {
        println!("Unknown command: /{}", arg);
        return;
    };
    let markers = conversation.markers();
    match n.checked_sub(1).and_then(|i| markers.get(i)) {
        Some(marker) => {
            if !conversation.select(&marker.place_id) {
                println!("({}) {} is already selected.", marker.label, marker.title);
            }
        }
        None => println!("No place {} on the map.", n),
    }
}

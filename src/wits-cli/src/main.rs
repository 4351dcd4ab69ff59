//! Battle of Wits CLI.
//!
//! Runs an AI-vs-AI debate on a chosen topic, generating turns (text +
//! speech) in the background while the user advances the exchange
//! manually. The first turn is released automatically; every later turn
//! waits for the user so audio is never cut off by a timer.

use clap::Parser;
use colored::Colorize;
use std::env;
use std::io::Write as _;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use wits_core::{
    Advance, ApiSettings, DebateConfig, DebateError, DebateFormat, DebateOrchestrator, Defaults,
    Message, OpenAiGenerator, Speaker,
};

#[derive(Parser)]
#[command(
    name = "wits",
    version,
    about = "Battle of Wits - watch two AI personas debate a topic",
    long_about = "Generates a turn-by-turn AI debate with synthesized speech. \
                  Turns are produced ahead of time in the background; you advance \
                  the debate at your own pace."
)]
struct Cli {
    /// The topic to debate
    #[arg(value_name = "TOPIC")]
    topic: String,

    /// Position the first debater defends
    #[arg(long, value_name = "STANCE")]
    stance_a: Option<String>,

    /// Position the second debater defends
    #[arg(long, value_name = "STANCE")]
    stance_b: Option<String>,

    /// Display name for the first debater
    #[arg(long, default_value = "Debater A")]
    name_a: String,

    /// Display name for the second debater
    #[arg(long, default_value = "Debater B")]
    name_b: String,

    /// Debate format: formal, casual, rapid-fire, roleplay
    #[arg(long, value_name = "FORMAT")]
    debate_format: Option<String>,

    /// Turns per debater
    #[arg(short, long, value_name = "TURNS")]
    turns: Option<u32>,

    /// Chat model identifier
    #[arg(short, long, value_name = "MODEL")]
    model: Option<String>,

    /// TTS voice for the first debater
    #[arg(long, value_name = "VOICE")]
    voice_a: Option<String>,

    /// TTS voice for the second debater
    #[arg(long, value_name = "VOICE")]
    voice_b: Option<String>,

    /// Speech speed (0.25 - 4.0)
    #[arg(long, value_name = "SPEED")]
    speed: Option<f32>,

    /// How many turns to generate ahead of playback
    #[arg(long, value_name = "DEPTH")]
    lookahead: Option<usize>,

    /// Optional TOML defaults file
    #[arg(long, value_name = "FILE")]
    defaults: Option<PathBuf>,

    /// Directory to write per-turn audio files into
    #[arg(long, value_name = "DIR")]
    audio_dir: Option<PathBuf>,

    /// File to write the transcript to when the debate ends
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let api_base = env::var("OPENAI_API_BASE")
        .or_else(|_| env::var("OPENAI_BASE_URL"))
        .unwrap_or_else(|_| "https://api.openai.com/v1".to_string());
    let api_key = env::var("OPENAI_API_KEY").unwrap_or_else(|_| {
        eprintln!(
            "{}",
            "Warning: OPENAI_API_KEY not set. API calls may fail.".yellow()
        );
        String::new()
    });

    let config = build_config(&cli)?;

    let settings = ApiSettings::new(api_base, api_key);
    let generator = Arc::new(OpenAiGenerator::new(&settings)?);
    let mut orchestrator = DebateOrchestrator::new(generator);
    orchestrator.start(config.clone())?;

    print_header(&config);

    if let Some(dir) = &cli.audio_dir {
        std::fs::create_dir_all(dir)?;
    }

    // The first turn is released automatically; everything after waits
    // for the user.
    println!("{}", "Generating opening statement...".dimmed());
    let mut stopped = false;
    match next_turn(&mut orchestrator).await? {
        Some(turn) => render_turn(&config, &turn, cli.audio_dir.as_deref()),
        None => stopped = true,
    }

    while !stopped && !orchestrator.status()?.is_complete {
        print!(
            "{}",
            "Press Enter for the next turn, or type 'q' to stop: ".bold()
        );
        std::io::stdout().flush()?;
        let mut line = String::new();
        std::io::stdin().read_line(&mut line)?;
        if line.trim().eq_ignore_ascii_case("q") {
            orchestrator.stop();
            stopped = true;
            break;
        }

        match next_turn(&mut orchestrator).await? {
            Some(turn) => render_turn(&config, &turn, cli.audio_dir.as_deref()),
            None => break,
        }
    }

    let status = orchestrator.status()?;
    println!();
    if status.is_complete {
        println!("{}", "═".repeat(70).bright_green());
        println!(
            "{}",
            format!(
                "  Debate complete: {} of {} turns delivered",
                status.turns_done, status.turns_total
            )
            .bright_green()
            .bold()
        );
        println!("{}", "═".repeat(70).bright_green());
    } else {
        println!(
            "{}",
            format!(
                "Debate stopped after {} of {} turns.",
                status.turns_done, status.turns_total
            )
            .yellow()
        );
    }

    let transcript = orchestrator.export_transcript()?;
    match &cli.output {
        Some(path) => {
            std::fs::write(path, &transcript)?;
            println!("Transcript written to {}", path.display());
        }
        None => {
            println!();
            println!("{transcript}");
        }
    }

    Ok(())
}

/// Resolve configuration: CLI flags beat the defaults file, which beats
/// the stock values.
fn build_config(cli: &Cli) -> Result<DebateConfig, DebateError> {
    let stance_a = cli
        .stance_a
        .clone()
        .unwrap_or_else(|| format!("in favor of: {}", cli.topic));
    let stance_b = cli
        .stance_b
        .clone()
        .unwrap_or_else(|| format!("against: {}", cli.topic));

    let mut config = DebateConfig::new(cli.topic.clone(), stance_a, stance_b);
    config.persona_a.name = cli.name_a.clone();
    config.persona_b.name = cli.name_b.clone();

    if let Some(path) = &cli.defaults {
        Defaults::load(path)?.apply(&mut config);
    }

    if let Some(format) = &cli.debate_format {
        config.format = DebateFormat::parse(format).ok_or_else(|| {
            DebateError::InvalidConfig(format!(
                "unknown format '{format}'. Available: formal, casual, rapid-fire, roleplay"
            ))
        })?;
    }
    if let Some(turns) = cli.turns {
        config.max_turns = turns;
    }
    if let Some(model) = &cli.model {
        config.model = model.clone();
    }
    if let Some(voice) = &cli.voice_a {
        config.persona_a.voice = voice.clone();
    }
    if let Some(voice) = &cli.voice_b {
        config.persona_b.voice = voice.clone();
    }
    if let Some(speed) = cli.speed {
        config.tts_speed = speed;
    }
    if let Some(lookahead) = cli.lookahead {
        config.lookahead = lookahead;
    }

    config.validate()?;
    Ok(config)
}

/// Poll until the next turn is released, the debate completes, or a
/// stopped debate runs out of buffered turns.
async fn next_turn(
    orchestrator: &mut DebateOrchestrator,
) -> Result<Option<Message>, DebateError> {
    let mut idle_polls = 0u32;
    loop {
        match orchestrator.advance() {
            Ok(Advance::Delivered(turn)) => return Ok(Some(turn)),
            Ok(Advance::NotReady) => {
                if !orchestrator.status()?.is_active {
                    idle_polls += 1;
                    if idle_polls > 10 {
                        return Ok(None);
                    }
                }
                tokio::time::sleep(Duration::from_millis(200)).await;
            }
            Err(DebateError::AlreadyComplete) => return Ok(None),
            Err(err) => return Err(err),
        }
    }
}

fn print_header(config: &DebateConfig) {
    println!();
    println!("{}", "═".repeat(70).bright_blue());
    println!(
        "{}",
        format!(
            "  {} - {} Debate",
            "Battle of Wits".bold(),
            config.format.display_name()
        )
        .bright_blue()
        .bold()
    );
    println!("{}", "═".repeat(70).bright_blue());
    println!();
    println!("{} {}", "Topic:".bold(), config.topic.bright_white());
    println!(
        "  {} {} ({})",
        "1.".bold(),
        config.persona_a.name.bright_cyan(),
        config.persona_a.stance
    );
    println!(
        "  {} {} ({})",
        "2.".bold(),
        config.persona_b.name.bright_magenta(),
        config.persona_b.stance
    );
    println!(
        "{} {} turns each, model {}",
        "Length:".bold(),
        config.max_turns,
        config.model
    );
    println!();
}

fn render_turn(config: &DebateConfig, turn: &Message, audio_dir: Option<&std::path::Path>) {
    let persona = match turn.speaker {
        Speaker::DebaterA => &config.persona_a,
        Speaker::DebaterB => &config.persona_b,
    };
    let name = match turn.speaker {
        Speaker::DebaterA => persona.name.bright_cyan().bold(),
        Speaker::DebaterB => persona.name.bright_magenta().bold(),
    };

    let total = config.total_messages();
    println!();
    println!(
        "{} {} {}",
        format!("[Turn {}/{}]", turn.turn_index + 1, total).dimmed(),
        name,
        if turn.degraded {
            "(partially generated)".yellow().to_string()
        } else {
            String::new()
        }
    );
    println!("{}", turn.text);

    match (&turn.audio, audio_dir) {
        (Some(bytes), Some(dir)) => {
            let path = dir.join(format!("turn_{:02}.mp3", turn.turn_index + 1));
            match std::fs::write(&path, bytes) {
                Ok(()) => println!("{}", format!("  audio: {}", path.display()).dimmed()),
                Err(err) => warn!(error = %err, "failed to write audio file"),
            }
        }
        (None, _) => println!("{}", "  (no audio for this turn)".yellow().dimmed()),
        _ => {}
    }
}

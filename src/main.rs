use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use aspiral_reflection::{
    config::{Config, LogFormat},
    director::{Director, DirectorEvent, Phase, PrewarmRequest, QualityTier},
    frustration::{detect_frustration_level, should_short_circuit, wants_to_skip},
    generation::{LangbaseGenerator, QuestionGenerator, ScriptedGenerator},
    langbase::LangbaseClient,
    omnilink::{EventKind, OmniLinkClient},
    patterns::match_energy,
    session::{MemorySessionStore, SessionStore},
    stage::detect_patterns_early,
    ReflectionFlow, TurnOutcome,
};

/// Guided reflection in the terminal.
#[derive(Parser, Debug)]
#[command(name = "aspiral", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug, Clone)]
enum Commands {
    /// Start an interactive session; one line per turn, /reset or /quit
    Chat {
        /// Quality tier for the breakthrough cinematic: low, mid, high
        #[arg(long, default_value = "mid")]
        tier: QualityTier,

        /// Trim motion in the breakthrough cinematic
        #[arg(long)]
        reduced_motion: bool,

        /// Use the scripted generator even if a Langbase key is configured
        #[arg(long)]
        offline: bool,
    },

    /// Classify one utterance and print the result as JSON
    Analyze {
        /// Text to analyze
        text: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    init_logging(&config);

    match cli.command {
        Commands::Analyze { text } => analyze(&text),
        Commands::Chat {
            tier,
            reduced_motion,
            offline,
        } => {
            let options = ChatOptions {
                tier,
                reduced_motion,
            };
            match (&config.generation.langbase, offline) {
                (Some(langbase), false) => {
                    let client = match LangbaseClient::new(langbase, config.request.clone()) {
                        Ok(c) => {
                            info!(base_url = %langbase.base_url, "Langbase client initialized");
                            c
                        }
                        Err(e) => {
                            error!(error = %e, "Failed to initialize Langbase client");
                            return Err(e.into());
                        }
                    };
                    let generator = LangbaseGenerator::new(client, &config.generation);
                    chat(&config, generator, options).await
                }
                _ => {
                    info!("Running with the offline scripted generator");
                    chat(&config, ScriptedGenerator::new(), options).await
                }
            }
        }
    }
}

fn analyze(text: &str) -> anyhow::Result<()> {
    let report = serde_json::json!({
        "frustration": detect_frustration_level(text),
        "wants_to_skip": wants_to_skip(text),
        "short_circuit": should_short_circuit(text),
        "energy": match_energy(text),
        "patterns": detect_patterns_early(text, &[]),
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

#[derive(Debug, Clone, Copy)]
struct ChatOptions {
    tier: QualityTier,
    reduced_motion: bool,
}

async fn chat<G: QuestionGenerator>(
    config: &Config,
    generator: G,
    options: ChatOptions,
) -> anyhow::Result<()> {
    let mut flow = ReflectionFlow::new(config, MemorySessionStore::new(), generator);
    if config.omnilink.enabled {
        flow = flow.with_omnilink(OmniLinkClient::new(&config.omnilink, &config.request)?);
    }
    let mut director = Director::new(&config.director);

    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    stdout
        .write_all(b"What feels stuck right now? (/reset to start over, /quit to exit)\n> ")
        .await?;
    stdout.flush().await?;

    while let Some(line) = lines.next_line().await? {
        match line.trim() {
            "/quit" => break,
            "/reset" => {
                flow.start_over();
                if director.phase() == Phase::Complete {
                    director.reset()?;
                } else {
                    director.abort("reset");
                }
                stdout.write_all(b"Starting over. What feels stuck?\n").await?;
            }
            text => match flow.handle_turn(text).await? {
                TurnOutcome::Ignored => {}
                TurnOutcome::Complete => {
                    stdout
                        .write_all(b"This reflection is complete. Type /reset to start another.\n")
                        .await?;
                }
                TurnOutcome::Question { text, .. } => {
                    stdout.write_all(format!("{}\n", text).as_bytes()).await?;
                }
                TurnOutcome::Breakthrough {
                    insight, fallback, ..
                } => {
                    let card = format!(
                        "\n  Friction: {}\n  Grease:   {}\n  Insight:  {}\n{}\n",
                        insight.friction,
                        insight.grease,
                        insight.insight,
                        if fallback { "  (offline card)" } else { "" }
                    );
                    stdout.write_all(card.as_bytes()).await?;

                    let entities = flow
                        .store()
                        .current_session()
                        .map(|s| s.entities.clone())
                        .unwrap_or_default();
                    for event in run_cinematic(&mut director, entities, options) {
                        match &event {
                            DirectorEvent::Completed => {
                                flow.notify(EventKind::BreakthroughCompleted, serde_json::json!({}))
                            }
                            DirectorEvent::Aborted { reason, .. } => flow.notify(
                                EventKind::BreakthroughAborted,
                                serde_json::json!({ "reason": reason }),
                            ),
                            _ => {}
                        }
                        stdout
                            .write_all(format!("  [director] {}\n", serde_json::to_string(&event)?).as_bytes())
                            .await?;
                    }
                    stdout
                        .write_all(b"Type /reset to reflect on something else.\n")
                        .await?;
                }
            },
        }

        if let Some(report) = flow.flush_omnilink().await {
            if let Some(err) = report.error {
                warn!(error = %err, remaining = report.remaining, "OmniLink flush incomplete");
            }
        }

        stdout.write_all(b"> ").await?;
        stdout.flush().await?;
    }

    info!("Chat session ended");
    Ok(())
}

/// Drive the director through one cinematic and collect its events.
fn run_cinematic(
    director: &mut Director,
    entities: Vec<aspiral_reflection::session::Entity>,
    options: ChatOptions,
) -> Vec<DirectorEvent> {
    let mut rx = director.subscribe();

    let result = director
        .prewarm(PrewarmRequest {
            entities,
            breakthrough_type: None,
            quality_tier: options.tier,
            reduced_motion: options.reduced_motion,
        })
        .and_then(|_| director.play(None, options.tier))
        .and_then(|_| director.complete());
    if let Err(e) = result {
        warn!(error = %e, "Breakthrough cinematic did not complete");
    }

    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

/// Initialize tracing/logging
fn init_logging(config: &Config) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        LogFormat::Pretty => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
}

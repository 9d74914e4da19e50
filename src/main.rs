use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

use tutor_voice::api::{ApiServer, ApiState};
use tutor_voice::voice::{
    AudioInput, AudioPlayback, CaptureController, ClipHints, LEVEL_WINDOW, MicInput, Player,
    Release, TalkSession, normalized_level,
};
use tutor_voice::{ApiClient, Config, Error, Gateways, Providers, TurnPipeline};

/// Tutor - push-to-talk English practice with spoken feedback
#[derive(Parser)]
#[command(name = "tutor", version, about)]
struct Cli {
    /// Path to a config file (default: ~/.config/tutor-voice/config.toml)
    #[arg(short, long, env = "TUTOR_CONFIG")]
    config: Option<PathBuf>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the speech API (default)
    Serve,
    /// Talk with the tutor from this terminal
    Talk {
        /// Call the hosted services directly instead of a tutor server
        #[arg(long)]
        direct: bool,
        /// Tutor server URL (overrides TUTOR_SERVER_URL)
        #[arg(long)]
        server: Option<String>,
    },
    /// Speak a line of text in the tutor's voice
    Say {
        /// Text to speak
        text: String,
        /// Call ElevenLabs directly instead of a tutor server
        #[arg(long)]
        direct: bool,
    },
    /// Test microphone input
    TestMic {
        /// Duration in seconds
        #[arg(short, long, default_value = "5")]
        duration: u64,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "info,tutor_voice=info",
        1 => "info,tutor_voice=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

#[allow(clippy::future_not_send)]
async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = Config::load(cli.config.as_deref())?;
    tracing::debug!(?config, "loaded configuration");

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(&config).await,
        Command::Talk { direct, server } => talk(&config, direct, server).await,
        Command::Say { text, direct } => say(&config, &text, direct).await,
        Command::TestMic { duration } => test_mic(duration).await,
    }
}

/// Run the speech API server until interrupted
async fn serve(config: &Config) -> anyhow::Result<()> {
    let providers = Providers::from_config(config);
    let server = ApiServer::new(ApiState::from_providers(&providers), &config.server);

    tokio::select! {
        result = server.run() => result?,
        _ = tokio::signal::ctrl_c() => tracing::info!("shutting down"),
    }

    Ok(())
}

/// Pick the gateways for a client session
fn gateways(config: &Config, direct: bool, server: Option<String>) -> Gateways {
    if direct {
        let providers = Providers::from_config(config);
        Gateways {
            transcriber: providers.openai.clone(),
            feedback: providers.openai,
            synthesizer: providers.elevenlabs,
        }
    } else {
        let url = server.unwrap_or_else(|| config.client.server_url.clone());
        tracing::info!(server = %url, "using tutor server");
        let client = Arc::new(ApiClient::new(url));
        Gateways {
            transcriber: client.clone(),
            feedback: client.clone(),
            synthesizer: client,
        }
    }
}

/// Interactive push-to-talk session
///
/// Enter starts a press; recording begins once the press has been held for
/// the hold threshold, and the next Enter releases it.
#[allow(clippy::future_not_send)]
async fn talk(config: &Config, direct: bool, server: Option<String>) -> anyhow::Result<()> {
    let pipeline = TurnPipeline::new(
        gateways(config, direct, server),
        Box::new(AudioPlayback::new()),
    );
    tracing::info!(session_id = %pipeline.session_id(), "session started");

    let hints = ClipHints {
        model: config.speech.stt_model.clone(),
        language: config.speech.language.clone(),
    };
    let capture = CaptureController::new(MicInput::new()?, hints, config.capture.level_interval);
    let mut session = TalkSession::new(capture, pipeline, config.capture.hold_threshold);
    let meter = tokio::spawn(show_level(session.capture().level()));

    let mut deadline: Option<tokio::time::Instant> = None;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    println!("Press Enter to start talking and Enter again when you are done.");
    println!("Type q to quit.\n");

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                if matches!(line.trim(), "q" | "quit") {
                    break;
                }

                if session.is_holding() {
                    deadline = None;
                    if session.is_recording() {
                        println!("Thinking...");
                    }
                    report(session.release_discarding_input(&mut lines).await);
                } else {
                    deadline = session.press(Instant::now()).map(tokio::time::Instant::from_std);
                }
            }
            () = wait_until(deadline) => {
                deadline = None;
                match session.poll(Instant::now()) {
                    Ok(true) => println!("Recording... press Enter to stop"),
                    Ok(false) => {}
                    Err(e) => eprintln!("Could not open the microphone: {e}"),
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    session.cancel();
    meter.abort();
    println!("Bye!");
    Ok(())
}

fn report(result: tutor_voice::Result<Release>) {
    match result {
        Ok(Release::Completed(outcome)) => {
            println!("You:   {}", outcome.transcript);
            println!("Tutor: {}\n", outcome.feedback);
        }
        Ok(Release::Cancelled) => println!("(hold a little longer)"),
        Ok(Release::Ignored) => {}
        Err(e @ (Error::InputMissing(_) | Error::InvalidState(_))) => {
            eprintln!("Nothing recorded: {e}");
        }
        Err(e) => eprintln!("Sorry, that did not work: {e}\n"),
    }
}

async fn wait_until(deadline: Option<tokio::time::Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

/// Draw the live input level on stderr while recording
async fn show_level(mut level: watch::Receiver<f32>) {
    while level.changed().await.is_ok() {
        let value = *level.borrow_and_update();
        if value > 0.0 {
            eprint!("\r[{}]", meter_bar(value, 30));
        } else {
            eprint!("\r{}\r", " ".repeat(32));
        }
    }
}

#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
fn meter_bar(level: f32, width: usize) -> String {
    let filled = ((level.clamp(0.0, 1.0) * width as f32).round() as usize).min(width);
    "#".repeat(filled) + &" ".repeat(width - filled)
}

/// Synthesize and play one line of text
async fn say(config: &Config, text: &str, direct: bool) -> anyhow::Result<()> {
    let synthesizer = gateways(config, direct, None).synthesizer;

    println!("Synthesizing speech...");
    let audio = synthesizer.synthesize(text).await?;
    println!("Got {} bytes of audio data", audio.content_length());

    let mut playback = AudioPlayback::new();
    playback.start(audio)?;
    while playback.is_playing() {
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    Ok(())
}

/// Test microphone input
#[allow(clippy::future_not_send)]
async fn test_mic(duration: u64) -> anyhow::Result<()> {
    println!("Testing microphone for {duration} seconds...");
    println!("Speak into your microphone!\n");

    let mut input = MicInput::new()?;
    input.start()?;
    let tap = input.tap();

    println!("Sample rate: {} Hz", input.sample_rate());
    println!("---");

    for i in 0..duration {
        tokio::time::sleep(Duration::from_secs(1)).await;

        let level = normalized_level(&tap.recent(LEVEL_WINDOW));
        let samples = tap.take();
        let peak = samples.iter().map(|s| s.abs()).fold(0.0f32, f32::max);

        println!(
            "[{:2}s] level: {level:.2} | peak: {peak:.4} | [{}]",
            i + 1,
            meter_bar(level, 50)
        );
    }

    input.stop();

    println!("\n---");
    println!("If you saw movement in the meter, your mic is working!");
    println!("If the level stayed near 0, check:");
    println!("  1. Is your mic plugged in?");
    println!("  2. Run: pactl info | grep 'Default Source'");
    println!("  3. Run: arecord -l (to list devices)");

    Ok(())
}

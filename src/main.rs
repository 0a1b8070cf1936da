use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

use parley::speech::{AudioCapture, AudioPlayback, playback::PLAYBACK_SAMPLE_RATE};
use parley::{
    CannedResponder, Config, Conversation, MicRecognition, OpenAiSynthesizer, RecognitionBackend,
    Responder, SpeakerSynthesis, SpeechCapture, SpeechOutput, SynthesisBackend, SynthesisEvent,
    WhisperTranscriber, ui,
};

/// Parley - voice and text conversation widget
#[derive(Parser)]
#[command(name = "parley", version, about)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Disable voice features (for machines without audio hardware)
    #[arg(long, env = "PARLEY_DISABLE_VOICE")]
    disable_voice: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Test microphone input
    TestMic {
        /// Duration in seconds
        #[arg(short, long, default_value = "5")]
        duration: u64,
    },
    /// Test speaker output
    TestSpeaker,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "warn,parley=warn",
        1 => "info,parley=debug",
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

async fn run(cli: Cli) -> anyhow::Result<()> {
    if let Some(cmd) = cli.command {
        return match cmd {
            Command::TestMic { duration } => test_mic(duration).await,
            Command::TestSpeaker => test_speaker().await,
        };
    }

    let config = Config::load_with_options(cli.disable_voice)?;
    tracing::debug!(
        voice_enabled = config.voice.enabled,
        auto_speak = config.auto_speak,
        "loaded configuration"
    );

    run_chat(config).await
}

/// Probe the speech backends configured for this machine
fn build_speech(config: &Config) -> (SpeechCapture, SpeechOutput) {
    if !config.voice.enabled {
        return (SpeechCapture::new(None), SpeechOutput::new(None));
    }

    let Some(api_key) = config.api_keys.openai.clone() else {
        tracing::warn!("no OpenAI API key configured, voice features disabled");
        return (SpeechCapture::new(None), SpeechOutput::new(None));
    };

    let recognition = match WhisperTranscriber::new(api_key.clone(), config.voice.stt_model.clone())
        .and_then(|t| MicRecognition::probe(Arc::new(t)))
    {
        Ok(mic) => Some(Arc::new(mic) as Arc<dyn RecognitionBackend>),
        Err(e) => {
            tracing::warn!(error = %e, "speech recognition unavailable");
            None
        }
    };

    let synthesis = match OpenAiSynthesizer::new(api_key, config.voice.tts_model.clone())
        .and_then(|s| SpeakerSynthesis::probe(Arc::new(s), OpenAiSynthesizer::provider_voices()))
    {
        Ok(speaker) => Some(Arc::new(speaker) as Arc<dyn SynthesisBackend>),
        Err(e) => {
            tracing::warn!(error = %e, "speech synthesis unavailable");
            None
        }
    };

    (SpeechCapture::new(recognition), SpeechOutput::new(synthesis))
}

/// The interactive conversation loop
async fn run_chat(config: Config) -> anyhow::Result<()> {
    let (capture, output) = build_speech(&config);

    if let Some(id) = &config.voice.voice {
        output.set_preferred(id);
    }

    let mic_supported = capture.is_supported();
    let responder: Arc<dyn Responder> = Arc::new(CannedResponder::new());
    let (mut conversation, mut events) =
        Conversation::with_receiver(responder, capture, output, config.auto_speak);

    println!("Parley ready. Type a message, or /help for commands.");
    if !mic_supported {
        println!("{}", ui::UNSUPPORTED_NOTICE);
    }

    // Reading stdin on its own task keeps the select loop cancel-safe
    let (input_tx, mut input_rx) = tokio::sync::mpsc::channel::<String>(8);
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            if input_tx.send(line).await.is_err() {
                break;
            }
        }
    });

    let mut tick = tokio::time::interval(Duration::from_millis(200));
    let mut printed = 0usize;
    let mut was_busy = false;

    loop {
        tokio::select! {
            line = input_rx.recv() => {
                match line {
                    Some(line) => {
                        if handle_line(&mut conversation, line.trim()) {
                            break;
                        }
                    }
                    None => break,
                }
            }
            Some(event) = events.recv() => {
                conversation.handle_event(event);
            }
            _ = tick.tick() => {
                conversation.sync_transcript();
            }
            _ = tokio::signal::ctrl_c() => {
                println!();
                break;
            }
        }

        printed = render_updates(&mut conversation, printed);

        if conversation.is_busy() && !was_busy {
            println!("{}", ui::busy_indicator());
        }
        was_busy = conversation.is_busy();
    }

    conversation.output().cancel();
    tracing::info!("goodbye");
    Ok(())
}

/// Print anything that changed since the last pass
fn render_updates(conversation: &mut Conversation, printed: usize) -> usize {
    for notification in conversation.drain_notifications() {
        println!("{}", ui::render_notification(&notification));
    }

    let messages = conversation.messages();
    for message in &messages[printed..] {
        println!("{}", ui::render_message(message));
    }
    messages.len()
}

/// Apply one line of input; returns true to exit
fn handle_line(conversation: &mut Conversation, line: &str) -> bool {
    match line {
        "" => {}
        "/quit" | "/exit" => return true,
        "/help" => println!("{}", ui::render_help()),
        "/mic" => {
            if conversation.capture().is_supported() {
                conversation.set_text_mode(false);
                conversation.toggle_listening();
                if conversation.capture().is_listening() {
                    println!("listening... (/mic again to stop and send)");
                }
            } else {
                println!("{}", ui::UNSUPPORTED_NOTICE);
            }
        }
        "/speak" => conversation.toggle_speaking(),
        "/voices" => {
            let output = conversation.output();
            let voices = output.voices();
            println!("{}", ui::render_voices(&voices, output.selected_voice().as_ref()));
        }
        "/autospeak" => {
            let auto_speak = !conversation.auto_speak();
            conversation.set_auto_speak(auto_speak);
            println!("auto-speak {}", if auto_speak { "on" } else { "off" });
        }
        "/text" => {
            conversation.set_text_mode(true);
            println!("text-only input");
        }
        "/settings" => {
            conversation.toggle_settings();
            if conversation.is_settings_open() {
                println!("{}", ui::render_settings(conversation));
            }
        }
        _ => {
            if let Some(id) = line.strip_prefix("/voice ") {
                let id = id.trim();
                if conversation.output().select_voice(id) {
                    println!("voice set to {id}");
                } else {
                    println!("unknown voice: {id} (see /voices)");
                }
            } else if line.starts_with('/') {
                println!("unknown command: {line} (see /help)");
            } else {
                conversation.set_input(line);
                conversation.submit();
            }
        }
    }
    false
}

/// Test microphone input with a live level meter
async fn test_mic(duration: u64) -> anyhow::Result<()> {
    println!("Testing microphone for {duration} seconds...");
    println!("Speak into your microphone!\n");

    let mut capture = AudioCapture::new()?;
    capture.start()?;

    for i in 0..duration {
        tokio::time::sleep(Duration::from_secs(1)).await;

        let samples = capture.take_buffer();
        let energy = calculate_rms(&samples);
        let peak = samples.iter().map(|s| s.abs()).fold(0.0f32, f32::max);

        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let meter_len = (energy * 100.0).min(50.0) as usize;
        let meter: String = "#".repeat(meter_len) + &" ".repeat(50 - meter_len);

        println!("[{:2}s] RMS: {energy:.4} | Peak: {peak:.4} | [{meter}]", i + 1);
    }

    capture.stop();

    println!("\n---");
    println!("If you saw movement in the meter, your mic is working.");
    println!("If RMS stayed near 0, check your input device and levels.");

    Ok(())
}

/// Calculate RMS energy
#[allow(clippy::cast_precision_loss)]
fn calculate_rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_squares: f32 = samples.iter().map(|s| s * s).sum();
    (sum_squares / samples.len() as f32).sqrt()
}

/// Test speaker output with a sine wave
async fn test_speaker() -> anyhow::Result<()> {
    println!("Testing speaker output...");
    println!("You should hear a 440Hz tone for 2 seconds\n");

    let playback = AudioPlayback::new()?;

    let frequency = 440.0_f32;
    let duration_secs = 2.0_f32;
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    let num_samples = (PLAYBACK_SAMPLE_RATE as f32 * duration_secs) as usize;

    #[allow(clippy::cast_precision_loss)]
    let samples: Vec<f32> = (0..num_samples)
        .map(|i| {
            let t = i as f32 / PLAYBACK_SAMPLE_RATE as f32;
            (2.0 * std::f32::consts::PI * frequency * t).sin() * 0.3
        })
        .collect();

    let (events_tx, mut events_rx) = tokio::sync::mpsc::channel(4);
    playback.play(samples, 1, events_tx);

    while let Some(event) = events_rx.recv().await {
        match event {
            SynthesisEvent::Started { .. } => println!("Playing..."),
            SynthesisEvent::Ended { .. } => break,
            SynthesisEvent::Error { message, .. } => anyhow::bail!("playback failed: {message}"),
        }
    }

    println!("\n---");
    println!("If you heard the tone, your speakers are working.");

    Ok(())
}

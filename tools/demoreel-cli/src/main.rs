//! DemoReel CLI: script-driven demo recording with narration and captions.
//!
//! Usage:
//!   demoreel validate <SCRIPT>                 Check a script for problems
//!   demoreel record <SCRIPT> -o <DIR>          Run a script and record the screen
//!   demoreel narrate <SCRIPT> -o <DIR>         Synthesize narration clips
//!   demoreel align <TIMING> <NARRATION> -o F   Build the aligned narration track
//!   demoreel captions <SCRIPT> <TIMING> -o F   Write SRT/VTT captions
//!   demoreel merge <CAPTURE> <AUDIO> -o F      Mux capture and narration
//!   demoreel produce <SCRIPT> -o <DIR>         All of the above
//!   demoreel check                             Check external tools

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use demoreel_common::config::AppConfig;

mod commands;

#[derive(Parser)]
#[command(
    name = "demoreel",
    about = "Scripted product demos with synchronized narration",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (defaults to $XDG_CONFIG_HOME/demoreel/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check a script for authoring problems
    Validate {
        /// Script JSON file
        script: PathBuf,
    },

    /// Run a script against the browser and record timing
    Record {
        /// Script JSON file
        script: PathBuf,

        /// Output directory
        #[arg(short, long, default_value = ".")]
        output: PathBuf,

        /// Rehearse against an in-memory document instead of a browser
        #[arg(long)]
        dry_run: bool,

        /// Do not record the screen
        #[arg(long)]
        no_capture: bool,
    },

    /// Synthesize narration clips for every section
    Narrate {
        /// Script JSON file
        script: PathBuf,

        /// Output directory
        #[arg(short, long, default_value = ".")]
        output: PathBuf,

        /// Voice override
        #[arg(long)]
        voice: Option<String>,
    },

    /// Place narration clips on the recorded timeline
    Align {
        /// timing.json from a recording
        timing: PathBuf,

        /// narration.json from `narrate`
        narration: PathBuf,

        /// Output audio file
        #[arg(short, long, default_value = "narration.wav")]
        output: PathBuf,
    },

    /// Write captions for the recorded timeline
    Captions {
        /// Script JSON file
        script: PathBuf,

        /// timing.json from a recording
        timing: PathBuf,

        /// Output file (.srt or .vtt)
        #[arg(short, long, default_value = "captions.srt")]
        output: PathBuf,

        /// Words per caption cue
        #[arg(long)]
        words_per_cue: Option<usize>,
    },

    /// Merge a screen capture with the aligned narration track
    Merge {
        /// Screen capture
        capture: PathBuf,

        /// Aligned narration track
        audio: PathBuf,

        /// Output video (.mp4, .webm, .mkv)
        #[arg(short, long, default_value = "demo.mp4")]
        output: PathBuf,

        /// Lead-in to cut from the start of the capture (ms)
        #[arg(long, default_value = "0")]
        offset_ms: u64,
    },

    /// Record, narrate, align, caption, and merge in one go
    Produce {
        /// Script JSON file
        script: PathBuf,

        /// Output directory
        #[arg(short, long, default_value = ".")]
        output: PathBuf,

        /// Voice override
        #[arg(long)]
        voice: Option<String>,

        /// Final video file name inside the output directory
        #[arg(long, default_value = "demo.mp4")]
        video: String,

        /// Rehearse against an in-memory document; skips capture and merge
        #[arg(long)]
        dry_run: bool,
    },

    /// Check for ffmpeg, ffprobe, WebDriver, and speech credentials
    Check,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => AppConfig::load_from(path)?,
        None => AppConfig::load(),
    };
    if cli.verbose {
        config.logging.level = "debug".to_string();
    }
    demoreel_common::logging::init_logging(&config.logging);

    match cli.command {
        Commands::Validate { script } => commands::validate::run(script),
        Commands::Record {
            script,
            output,
            dry_run,
            no_capture,
        } => commands::record::run(&config, script, output, dry_run, no_capture).await,
        Commands::Narrate {
            script,
            output,
            voice,
        } => commands::narrate::run(&config, script, output, voice).await,
        Commands::Align {
            timing,
            narration,
            output,
        } => commands::align::run(&config, timing, narration, output).await,
        Commands::Captions {
            script,
            timing,
            output,
            words_per_cue,
        } => commands::captions::run(&config, script, timing, output, words_per_cue),
        Commands::Merge {
            capture,
            audio,
            output,
            offset_ms,
        } => commands::merge::run(&config, capture, audio, output, offset_ms).await,
        Commands::Produce {
            script,
            output,
            voice,
            video,
            dry_run,
        } => commands::produce::run(&config, script, output, voice, video, dry_run).await,
        Commands::Check => commands::check::run(&config).await,
    }
}

#![recursion_limit = "256"]

use std::path::PathBuf;

use chordrec::core::base::Void;
use chordrec::core::decoder::Decoder;
use chordrec::loader::load_score;
use chordrec::recognize::recognize_chords_with;
use clap::{Parser, Subcommand};
use tracing_subscriber::{filter::LevelFilter, fmt::SubscriberBuilder};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Flag that specifies verbose logging.
    #[arg(short, long, conflicts_with = "quiet")]
    verbose: bool,

    /// Flag that suppresses all tracing output.
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Recognizes a chord progression from a MIDI file.
    Recognize {
        /// Path to a standard MIDI file.
        source: PathBuf,

        /// Frames per beat is `1 / precision`; `0.25` is one frame per quarter note.
        #[arg(short, long, default_value_t = 0.25)]
        precision: f32,

        /// Maximum span length considered by the decoder, in frames.
        #[arg(long, default_value_t = 8)]
        max_prev: usize,
    },
}

fn main() -> Void {
    let args = Args::parse();

    init_tracing(args.verbose, args.quiet);

    start(args)?;

    Ok(())
}

fn init_tracing(verbose: bool, quiet: bool) {
    let level_filter = if quiet {
        LevelFilter::OFF
    } else if verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };

    SubscriberBuilder::default()
        .with_ansi(true)
        .with_level(!quiet)
        .with_file(false)
        .with_target(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_max_level(level_filter)
        .init();

    if quiet {
        return;
    }

    if verbose {
        tracing::debug!("Tracing initialized at DEBUG level");
    } else {
        tracing::info!("Tracing initialized at INFO level");
    }
}

fn start(args: Args) -> Void {
    match args.command {
        Command::Recognize { source, precision, max_prev } => {
            let score = load_score(&source)?;
            let decoder = Decoder::with_max_prev(max_prev);
            let spans = recognize_chords_with(&score, precision, &decoder)?;

            for span in spans {
                println!("{:>5} - {:<5} {}", span.start, span.end, span.name);
            }
        }
    }

    Ok(())
}

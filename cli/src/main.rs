mod commands;
mod logging;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "ankigen", about = "Generate Anki flashcard decks from documents", version)]
struct Cli {
    /// Config file (TOML). Missing file means built-in defaults.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Extract, generate cards with the model, and write an .apkg
    Generate {
        /// Source document (.txt, .md, .pdf, .docx)
        input: PathBuf,
        /// Output package (defaults to <input stem>.apkg)
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(long)]
        max_chars: Option<usize>,
        #[arg(long)]
        max_decks: Option<usize>,
        /// Model name override
        #[arg(long)]
        model: Option<String>,
    },
    /// Extract and segment only; print chunk sizes
    Preview {
        input: PathBuf,
        #[arg(long)]
        max_chars: Option<usize>,
    },
    /// Parse a saved model reply and print its decks as JSON
    Parse { reply: PathBuf },
    /// Check that the model service is reachable
    Health,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut cfg = match ankigen_core::config::load_config(cli.config.as_deref()) {
        Ok(c) => c,
        Err(e) => return report(&e),
    };
    logging::init_logging(&cfg.logging.level, cli.log_json);

    let result = match cli.command {
        Command::Generate {
            input,
            output,
            max_chars,
            max_decks,
            model,
        } => {
            commands::apply_overrides(&mut cfg, max_chars, max_decks, model);
            let output = output.unwrap_or_else(|| commands::default_output_path(&input));
            commands::generate(&cfg, &input, &output)
        }
        Command::Preview { input, max_chars } => {
            commands::apply_overrides(&mut cfg, max_chars, None, None);
            commands::preview(&cfg, &input)
        }
        Command::Parse { reply } => commands::parse(&cfg, &reply),
        Command::Health => commands::health(&cfg),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => report(&e),
    }
}

fn report(err: &ankigen_core::error::AppError) -> ExitCode {
    eprintln!("error: {err}");
    ExitCode::FAILURE
}

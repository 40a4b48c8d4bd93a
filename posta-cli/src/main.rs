use std::error::Error;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use posta::corpus::Corpus;
use posta::get_version;
use posta::tagger::Tagger;
use posta::trainer::Trainer;

#[derive(Debug, Args)]
#[clap(author,
    about = "Train a tagger",
    version = get_version(),
)]
struct TrainArgs {
    #[arg(short = 'i', long, default_value = "5")]
    num_iterations: usize,

    #[arg(short = 'm', long)]
    load_model_file: Option<PathBuf>,

    corpus_file: PathBuf,
    model_file: PathBuf,
}

#[derive(Debug, Args)]
#[clap(author,
    about = "Tag sentences read from stdin",
    version = get_version(),
)]
struct TagArgs {
    model_file: PathBuf,
}

#[derive(Debug, Args)]
#[clap(author,
    about = "Evaluate a tagger on a tagged corpus",
    version = get_version(),
)]
struct EvaluateArgs {
    model_file: PathBuf,
    corpus_file: PathBuf,
}

#[derive(Debug, Subcommand)]
enum Commands {
    Train(TrainArgs),
    Tag(TagArgs),
    Evaluate(EvaluateArgs),
}

#[derive(Debug, Parser)]
#[clap(
    name = "posta",
    author,
    about = "A part-of-speech tagging command line interface",
    version = get_version(),
)]
struct CommandArgs {
    #[clap(subcommand)]
    command: Commands,
}

fn train(args: TrainArgs) -> Result<(), Box<dyn Error>> {
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();

    ctrlc::set_handler(move || {
        if r.load(Ordering::SeqCst) {
            r.store(false, Ordering::SeqCst);
        } else {
            std::process::exit(0);
        }
    })?;

    let mut trainer = Trainer::new(args.num_iterations, args.corpus_file.as_path())?;

    if let Some(model_path) = &args.load_model_file {
        trainer.load_model(model_path.as_path())?;
    }

    let metrics = trainer.train(running, args.model_file.as_path())?;

    println!(
        "Training completed successfully. Accuracy: {:.2}% ({} / {})",
        metrics.accuracy, metrics.correct, metrics.total
    );
    Ok(())
}

fn tag(args: TagArgs) -> Result<(), Box<dyn Error>> {
    let tagger = Tagger::load_model(args.model_file.as_path())?;

    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut writer = io::BufWriter::new(stdout.lock());

    for line in stdin.lock().lines() {
        let line = line?;
        let sentence: Vec<String> = line.split_whitespace().map(str::to_string).collect();
        if sentence.is_empty() {
            continue;
        }
        let tags = tagger.tag_sentence(&sentence);
        let tokens: Vec<String> = sentence
            .iter()
            .zip(&tags)
            .map(|(word, tag)| format!("{}/{}", word, tag))
            .collect();
        writeln!(writer, "{}", tokens.join(" "))?;
    }

    Ok(())
}

fn evaluate(args: EvaluateArgs) -> Result<(), Box<dyn Error>> {
    let tagger = Tagger::load_model(args.model_file.as_path())?;
    let corpus = Corpus::load(args.corpus_file.as_path())?;

    let metrics = tagger.evaluate(corpus.sentences(), corpus.tags())?;

    println!(
        "Accuracy: {:.2}% ({} / {})",
        metrics.accuracy, metrics.correct, metrics.total
    );
    Ok(())
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = CommandArgs::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    match args.command {
        Commands::Train(args) => train(args),
        Commands::Tag(args) => tag(args),
        Commands::Evaluate(args) => evaluate(args),
    }
}

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

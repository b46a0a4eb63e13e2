use std::path::PathBuf;

use clap::Parser;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing_subscriber::fmt::init;

use annotation_api::services::batch_partition::{partition, read_questions, write_batches};

/// Splits a question sheet into shuffled JSON batches for the labeling tool.
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// CSV with a question_text (or text/question) column
    #[clap(short, long, value_parser, default_value = "questions.csv")]
    input: PathBuf,

    #[clap(long, value_parser, default_value = "batches")]
    out_dir: PathBuf,

    #[clap(long, value_parser, default_value_t = 20)]
    batch_size: usize,

    /// Seed for a reproducible shuffle
    #[clap(long, value_parser)]
    seed: Option<u64>,
}

fn main() -> anyhow::Result<()> {
    init();
    let args = Args::parse();

    let questions = read_questions(&args.input)?;
    tracing::info!("Read {} questions from {}", questions.len(), args.input.display());

    let mut rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };
    let batches = partition(questions, args.batch_size, &mut rng)?;
    let written = write_batches(&args.out_dir, batches)?;

    tracing::info!(
        "Done. Import the {} JSON files in {} into the labeling tool.",
        written.len(),
        args.out_dir.display()
    );
    Ok(())
}

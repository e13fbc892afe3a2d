use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use linguame::training::{evaluate, fit_model, load_dataset, stratified_split};
use linguame::{BuiltinModel, EmbedderKind, ModelManager, RuntimeConfig, TrainingOptions};
use log::info;

#[derive(Parser)]
#[command(author, version, about = "Train the tone classifier from a labeled CSV", long_about = None)]
struct Args {
    /// CSV file with `text` and `label` columns
    #[arg(short, long)]
    data: PathBuf,

    /// Where to write the trained model
    #[arg(short, long, default_value = "linguame_model.json")]
    output: PathBuf,

    /// Feature extractor feeding the logistic regression
    #[arg(short, long, value_enum, default_value_t = EmbedderKind::Tfidf)]
    embedder: EmbedderKind,

    /// Fraction of each label held out for evaluation
    #[arg(long, default_value_t = 0.2)]
    test_size: f64,

    /// Seed for the split and for class balancing
    #[arg(long, default_value_t = 42)]
    seed: u64,

    #[arg(long, default_value_t = 1000)]
    max_iterations: u64,

    /// Keep only the N most frequent terms (TF-IDF only)
    #[arg(long)]
    max_features: Option<usize>,

    /// Train on the raw class distribution instead of oversampling minority labels
    #[arg(long)]
    no_balance: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    linguame::init_logger();
    let args = Args::parse();

    let options = TrainingOptions {
        embedder: args.embedder,
        test_size: args.test_size,
        seed: args.seed,
        max_iterations: args.max_iterations,
        max_features: args.max_features,
        balance_classes: !args.no_balance,
    };

    let manager = ModelManager::new_default()?;
    if options.embedder == EmbedderKind::MiniLm {
        manager
            .ensure_downloaded(BuiltinModel::MiniLM)
            .await
            .context("Failed to download the MiniLM model")?;
    }
    let runtime = RuntimeConfig::default();

    let records = load_dataset(&args.data).with_context(|| format!("Could not read dataset {:?}", args.data))?;
    let (train, test) = stratified_split(&records, options.test_size, options.seed)?;
    info!("Training on {} examples, evaluating on {}", train.len(), test.len());

    let start = Instant::now();
    let bundle = fit_model(&train, &options, &manager, &runtime)?;
    info!("Model fitted in {:.2?}", start.elapsed());

    bundle.save(&args.output)?;
    println!("Model saved to {}", args.output.display());

    if test.is_empty() {
        println!("No held-out examples; skipping evaluation.");
        return Ok(());
    }
    let model = bundle.instantiate(&manager, &runtime)?;
    let report = evaluate(&model, &test)?;
    println!("{}", report);
    Ok(())
}

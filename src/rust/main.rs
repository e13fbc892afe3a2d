use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use linguame::{
    ClassificationOutcome, ModelBundle, ModelManager, RuntimeConfig, SessionService, ToneLabel, Verdict,
    WhatlangDetector,
};
use log::{debug, info};

const EXAMPLES: [&str; 3] = [
    "Hi Sarah,\n\nI noticed that once again the report was submitted without the necessary attachments...",
    "Hello team,\n\nI'm happy to report that we’ve met our targets this quarter. I appreciate everyone's effort.",
    "Sure, if that’s what you want. I guess it doesn’t matter what I think anyway.",
];

/// Ends a message started with `:paste`.
const PASTE_END: &str = ".";

#[derive(Parser)]
#[command(author, version, about = "Analyze the tone of your messages", long_about = None)]
struct Args {
    /// Trained model written by linguame_train
    #[arg(short, long, default_value = "linguame_model.json")]
    model: PathBuf,

    /// Where :export writes the feedback CSV (defaults to the temp directory)
    #[arg(short, long)]
    export_path: Option<PathBuf>,

    /// Force a fresh download of the embedding model files
    #[arg(short, long)]
    fresh: bool,

    /// Reject messages whose language cannot be identified with confidence
    #[arg(long)]
    strict_language: bool,
}

async fn ensure_model_downloaded(bundle: &ModelBundle, manager: &ModelManager, fresh: bool) -> Result<()> {
    let Some(model) = bundle.embedder.required_model() else {
        return Ok(());
    };

    if fresh {
        info!("Fresh download requested - removing any existing model files...");
        manager.remove_download(model)?;
    }
    manager
        .ensure_downloaded(model)
        .await
        .with_context(|| format!("Failed to download {:?}", model))?;
    Ok(())
}

/// The message most recently classified, for `:feedback`.
struct LastPrediction {
    text: String,
    label: ToneLabel,
}

#[tokio::main]
async fn main() -> Result<()> {
    linguame::init_logger();
    let args = Args::parse();

    let bundle = ModelBundle::load(&args.model)
        .with_context(|| format!("Could not load model {:?}; train one with linguame_train", args.model))?;
    let manager = ModelManager::new_default()?;
    debug!("Model cache at {:?}", manager.models_dir());
    ensure_model_downloaded(&bundle, &manager, args.fresh).await?;

    let model = bundle.instantiate(&manager, &RuntimeConfig::default())?;
    let info = model.info();
    info!("Model ready: {} labels, {} dimensions", info.class_labels.len(), info.embedding_size);

    let mut builder = SessionService::builder().with_model(model);
    if let Some(path) = args.export_path {
        builder = builder.with_export_path(path);
    }
    if args.strict_language {
        builder = builder.with_detector(Arc::new(WhatlangDetector::new().with_reliability_check(true)));
    }
    let session = builder.build()?;

    println!("Welcome to LINGUAME. Paste a message to analyze its tone, or :help for commands.");
    run(&session, io::stdin().lock(), io::stdout().lock())
}

fn run(session: &SessionService, input: impl BufRead, mut out: impl Write) -> Result<()> {
    let mut last: Option<LastPrediction> = None;
    let mut pasted: Option<Vec<String>> = None;

    prompt(&mut out)?;
    for line in input.lines() {
        let line = line?;

        if let Some(buffer) = pasted.as_mut() {
            if line.trim() != PASTE_END {
                buffer.push(line);
                continue;
            }
            let message = buffer.join("\n");
            pasted = None;
            let message = message.trim();
            if !message.is_empty() {
                classify(session, message, &mut last, &mut out)?;
            }
            prompt(&mut out)?;
            continue;
        }

        let trimmed = line.trim();
        match trimmed.split_once(' ').map_or((trimmed, ""), |(cmd, rest)| (cmd, rest.trim())) {
            (":quit", _) | (":q", _) => break,
            (":help", _) => print_help(&mut out)?,
            (":examples", _) => {
                for (i, example) in EXAMPLES.iter().enumerate() {
                    writeln!(out, "{}. {}", i + 1, example)?;
                }
            }
            (":paste", _) => {
                writeln!(out, "Enter the message; finish with a line containing only '{}'.", PASTE_END)?;
                pasted = Some(Vec::new());
                continue;
            }
            (":stats", _) => match session.summarize() {
                Some(stats) => write!(out, "{}", stats)?,
                None => writeln!(out, "No predictions yet.")?,
            },
            (":feedback", args) => feedback(session, args, last.as_ref(), &mut out)?,
            (":export", _) => match session.export_feedback() {
                Ok(Some(path)) => writeln!(out, "Feedback saved to {}", path.display())?,
                Ok(None) => writeln!(out, "No feedback collected yet.")?,
                Err(e) => writeln!(out, "Export failed: {}", e)?,
            },
            ("", _) => {}
            (cmd, _) if cmd.starts_with(':') => writeln!(out, "Unknown command {}; try :help", cmd)?,
            _ => classify(session, trimmed, &mut last, &mut out)?,
        }
        prompt(&mut out)?;
    }
    Ok(())
}

fn classify(
    session: &SessionService,
    text: &str,
    last: &mut Option<LastPrediction>,
    out: &mut impl Write,
) -> io::Result<()> {
    match session.classify(text) {
        Ok(outcome) => {
            print_outcome(out, &outcome)?;
            if let ClassificationOutcome::Classified(result) = outcome {
                *last = Some(LastPrediction {
                    text: text.to_string(),
                    label: result.label,
                });
            }
            Ok(())
        }
        Err(e) => writeln!(out, "Classification failed: {}", e),
    }
}

/// `:feedback <verdict>` rates the last prediction;
/// `:feedback <verdict> <label> <text>` records feedback on any message.
fn feedback(
    session: &SessionService,
    args: &str,
    last: Option<&LastPrediction>,
    out: &mut impl Write,
) -> io::Result<()> {
    let (verdict, rest) = args.split_once(' ').map_or((args, ""), |(v, rest)| (v, rest.trim()));
    let verdict = match verdict.parse::<Verdict>() {
        Ok(verdict) => verdict,
        Err(e) => return writeln!(out, "{}", e),
    };

    let reply = if rest.is_empty() {
        match last {
            Some(prediction) => session.submit_feedback(&prediction.text, prediction.label.as_str(), verdict),
            None => return writeln!(out, "Classify a message before giving feedback."),
        }
    } else {
        let (label, text) = rest.split_once(' ').map_or((rest, ""), |(label, text)| (label, text.trim()));
        session.submit_feedback(text, label, verdict)
    };
    writeln!(out, "{}", reply)
}

fn prompt(out: &mut impl Write) -> io::Result<()> {
    write!(out, "> ")?;
    out.flush()
}

fn print_outcome(out: &mut impl Write, outcome: &ClassificationOutcome) -> io::Result<()> {
    if let Some(result) = outcome.result() {
        writeln!(out, "Predicted tone: {}", result.label.display_name())?;
        writeln!(out, "Probabilities:")?;
        for (label, probability) in result.ranked() {
            writeln!(out, "  {:<22} {:>5.1}%", label.as_str(), probability * 100.0)?;
        }
    }
    writeln!(out, "Interpretation: {}", outcome.interpretation())?;
    writeln!(out, "Suggestion: {}", outcome.suggestion())
}

fn print_help(out: &mut impl Write) -> io::Result<()> {
    writeln!(out, "Type a message to classify it, or one of:")?;
    writeln!(out, "  :paste                         enter a multi-line message, ending with '{}'", PASTE_END)?;
    writeln!(out, "  :stats                         prediction statistics for this session")?;
    writeln!(out, "  :feedback correct|incorrect    rate the last prediction")?;
    writeln!(out, "  :feedback <verdict> <label> <text>")?;
    writeln!(out, "                                 record feedback on any message")?;
    writeln!(out, "  :export                        write collected feedback to CSV")?;
    writeln!(out, "  :examples                      sample messages")?;
    writeln!(out, "  :quit                          leave")
}

//! voxcorpus worker process
//!
//! Runs assessment and pipeline jobs in a separate process so a crash in
//! decoding or analysis cannot take the caller down.
//!
//! Communication is line-delimited JSON over stdin/stdout.

use anyhow::Result;
use std::io::{self, BufRead, Write};
use std::path::Path;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use voxcorpus_ml::{CorpusPipeline, QualityAssessor, SentenceGate, SidecarTranscript};
use voxcorpus_types::{SelectionPolicy, WorkerCommand, WorkerResponse};

fn main() {
    // Initialize tracing to stderr (stdout is for IPC)
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "warn".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    tracing::info!("voxcorpus worker starting");

    if let Err(e) = run_worker(io::stdin().lock(), io::stdout()) {
        tracing::error!("Worker error: {}", e);
        std::process::exit(1);
    }
}

fn run_worker(input: impl BufRead, mut output: impl Write) -> Result<()> {
    let gate = SentenceGate::default();

    tracing::info!("Worker ready, listening for commands");

    for line in input.lines() {
        let line = line?;

        if line.trim().is_empty() {
            continue;
        }

        let command: WorkerCommand = match serde_json::from_str(&line) {
            Ok(cmd) => cmd,
            Err(e) => {
                let response = WorkerResponse::Error {
                    message: format!("Invalid command: {}", e),
                };
                writeln!(output, "{}", serde_json::to_string(&response)?)?;
                output.flush()?;
                continue;
            }
        };

        let shutdown = matches!(command, WorkerCommand::Shutdown);
        let response = handle_command(command, &gate);

        writeln!(output, "{}", serde_json::to_string(&response)?)?;
        output.flush()?;

        if shutdown {
            break;
        }
    }

    tracing::info!("Worker shutting down");
    Ok(())
}

fn handle_command(command: WorkerCommand, gate: &SentenceGate) -> WorkerResponse {
    match command {
        WorkerCommand::Assess {
            samples,
            sample_rate,
            policy,
        } => {
            tracing::debug!("Assessing {} samples at {} Hz", samples.len(), sample_rate);

            let policy = policy.unwrap_or_default();
            let assessor = QualityAssessor::new(policy);
            match assessor.assess(&samples, sample_rate) {
                Ok(metrics) => WorkerResponse::Quality {
                    issues: policy.issues(&metrics),
                    metrics,
                },
                Err(e) => WorkerResponse::Error {
                    message: format!("Assessment failed: {}", e),
                },
            }
        }

        WorkerCommand::Gate { text } => WorkerResponse::Gate {
            complete: gate.is_complete(&text),
        },

        WorkerCommand::Process {
            path,
            transcript_path,
            output_dir,
            target,
        } => {
            tracing::debug!("Processing {} with transcript {}", path, transcript_path);

            let engine = match SidecarTranscript::open(Path::new(&transcript_path)) {
                Ok(engine) => engine,
                Err(e) => {
                    return WorkerResponse::Error {
                        message: format!("{:#}", e),
                    }
                }
            };

            let mut policy = SelectionPolicy::default();
            if let Some(target) = target {
                policy.target_corpus_size = target;
            }
            let pipeline = CorpusPipeline::new(
                policy,
                Default::default(),
                Default::default(),
                Default::default(),
            );

            match pipeline.process_file(Path::new(&path), &engine, Path::new(&output_dir)) {
                Ok(report) => WorkerResponse::Report(Box::new(report)),
                Err(e) => WorkerResponse::Error {
                    message: e.to_string(),
                },
            }
        }

        WorkerCommand::Shutdown => {
            tracing::info!("Shutdown command received");
            WorkerResponse::Ok
        }
    }
}

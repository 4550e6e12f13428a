//! voxcorpus command-line interface
//!
//! Builds quality-ranked speech corpora from recordings and queries the
//! resulting database.

mod exit_codes;

use anyhow::Result;
use clap::{Parser, Subcommand};
use exit_codes::ExitCode;
use serde::Serialize;
use std::path::{Path, PathBuf};
use voxcorpus_lib::commands::{self, ProcessRequest};
use voxcorpus_lib::config::{AppConfig, ProviderKind};
use voxcorpus_lib::store::CorpusStore;
use voxcorpus_types::{SegmentRecord, StoredSegment};

/// voxcorpus - speech corpus builder
#[derive(Parser, Debug)]
#[command(name = "voxcorpus")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (defaults to $VOXCORPUS_CONFIG, then the data directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output in JSON format for scripting
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Segment, score and select a recording, then store the result
    Process {
        /// Input audio file
        audio: PathBuf,

        /// Transcript file (Whisper-style JSON or plain text)
        #[arg(short, long)]
        transcript: Option<PathBuf>,

        /// Transcription source: sidecar or openai
        #[arg(short, long)]
        provider: Option<ProviderKind>,

        /// Number of segments to select
        #[arg(long)]
        target: Option<usize>,

        /// Directory for processed audio (defaults to a per-run directory)
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Do not write the run to the database
        #[arg(long)]
        no_store: bool,
    },
    /// Split a recording on speech energy and keep acceptable segments
    Acoustic {
        /// Input audio file
        audio: PathBuf,

        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },
    /// Score a whole recording
    Assess {
        /// Input audio file
        audio: PathBuf,
    },
    /// List processed files
    Files,
    /// List stored segments of a file
    Segments {
        /// File id (see 'voxcorpus files')
        file_id: i64,
    },
    /// List training-ready segments by priority
    MlReady {
        #[arg(long, default_value_t = 0.3)]
        min_quality: f64,

        #[arg(long, default_value_t = 100)]
        limit: usize,
    },
    /// Show corpus statistics
    Stats,
    /// Inspect or create the config file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Print the effective configuration
    Show,
    /// Write the default configuration if none exists
    Init,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Statistics {
    processing: voxcorpus_types::ProcessingStatistics,
    quality: voxcorpus_types::QualityStatistics,
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            let code = if e.use_stderr() {
                ExitCode::InvalidArguments
            } else {
                ExitCode::Success
            };
            std::process::exit(code.as_i32());
        }
    };

    let config_path = AppConfig::resolve_path(cli.config.as_deref());
    let config = AppConfig::load(config_path.as_deref());
    let _guard = voxcorpus_lib::init_logging(&config.log_dir);
    tracing::debug!("Using config {:?}", config_path);

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Failed to create Tokio runtime: {}", e);
            std::process::exit(ExitCode::GeneralError.as_i32());
        }
    };

    let exit_code = runtime.block_on(run(cli, config, config_path));
    std::process::exit(exit_code.as_i32());
}

async fn run(cli: Cli, config: AppConfig, config_path: Option<PathBuf>) -> ExitCode {
    let json = cli.json;
    let result = match cli.command {
        Commands::Process {
            audio,
            transcript,
            provider,
            target,
            output_dir,
            no_store,
        } => {
            let request = ProcessRequest {
                input: audio,
                transcript,
                provider,
                target,
                output_dir,
                store: !no_store,
            };
            match commands::process(&config, request).await {
                Ok(outcome) => emit(json, &outcome, || print_process(&outcome)),
                Err(e) => Err(e),
            }
        }
        Commands::Acoustic { audio, output_dir } => {
            commands::acoustic(&config, &audio, output_dir.as_deref())
                .and_then(|records| emit(json, &records, || print_segments(&records)))
        }
        Commands::Assess { audio } => commands::assess(&config, &audio).and_then(|outcome| {
            emit(json, &outcome, || {
                println!("{} ({:.2}s)", outcome.file, outcome.duration);
                print_metrics(&outcome.metrics);
                if !outcome.issues.is_empty() {
                    println!("  issues:          {:?}", outcome.issues);
                }
                if let Some(failure) = &outcome.failure {
                    println!("  analysis failed: {}", failure);
                }
            })
        }),
        Commands::Files => open_store(&config)
            .and_then(|store| Ok(store.all_files()?))
            .and_then(|files| {
                emit(json, &files, || {
                    for f in &files {
                        println!(
                            "{:>5}  {:<32} {:>8.2}s  {:>7.2} wpm  {}",
                            f.id, f.filename, f.duration, f.wpm, f.created_at
                        );
                    }
                })
            }),
        Commands::Segments { file_id } => {
            let store = match open_store(&config) {
                Ok(store) => store,
                Err(e) => return report_error(&e),
            };
            match store.file_by_id(file_id) {
                Ok(Some(_)) => {}
                Ok(None) => {
                    eprintln!("No file with id {}", file_id);
                    return ExitCode::NotFound;
                }
                Err(e) => return report_error(&anyhow::Error::from(e)),
            }
            store
                .segments_by_file(file_id)
                .map_err(anyhow::Error::from)
                .and_then(|segments| emit(json, &segments, || print_stored(&segments)))
        }
        Commands::MlReady { min_quality, limit } => open_store(&config)
            .and_then(|store| Ok(store.ml_ready_segments(min_quality, limit)?))
            .and_then(|segments| emit(json, &segments, || print_stored(&segments))),
        Commands::Stats => open_store(&config)
            .and_then(|store| {
                Ok(Statistics {
                    processing: store.statistics()?,
                    quality: store.quality_statistics()?,
                })
            })
            .and_then(|stats| emit(json, &stats, || print_statistics(&stats))),
        Commands::Config { action } => match action {
            ConfigAction::Show => emit(json, &config, || {
                if let Some(path) = &config_path {
                    println!("# {}", path.display());
                }
                match serde_json::to_string_pretty(&config) {
                    Ok(text) => println!("{}", text),
                    Err(e) => eprintln!("{}", e),
                }
            }),
            ConfigAction::Init => init_config(config_path.as_deref()),
        },
    };

    match result {
        Ok(()) => ExitCode::Success,
        Err(e) => report_error(&e),
    }
}

fn report_error(err: &anyhow::Error) -> ExitCode {
    let code = ExitCode::for_error(err);
    tracing::error!("{:#}", err);
    eprintln!("Error ({}): {:#}", code, err);
    code
}

fn open_store(config: &AppConfig) -> Result<CorpusStore> {
    Ok(CorpusStore::open(&config.database_path)?)
}

fn init_config(path: Option<&Path>) -> Result<()> {
    let Some(path) = path else {
        anyhow::bail!("No config location available; pass --config");
    };
    if path.exists() {
        println!("Config already exists at {}", path.display());
        return Ok(());
    }
    AppConfig::default().save(path)?;
    println!("Wrote default config to {}", path.display());
    Ok(())
}

/// JSON to stdout, or the human-readable rendering
fn emit<T: Serialize>(json: bool, value: &T, human: impl FnOnce()) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        human();
    }
    Ok(())
}

fn print_process(outcome: &commands::ProcessOutcome) {
    let report = &outcome.report;
    let summary = &report.summary;
    println!("{} [{}]", report.file.filename, outcome.run_id);
    println!("  strategy:        {}", report.strategy);
    println!("  candidates:      {}", summary.candidates);
    println!("  gate rejected:   {}", summary.rejected_by_gate);
    println!("  failed analysis: {}", summary.assessment_failures);
    println!(
        "  selected:        {} (avg {:.3}, min {:.3}, max {:.3}, {} high quality)",
        summary.selected,
        summary.average_quality,
        summary.min_quality,
        summary.max_quality,
        summary.high_quality
    );
    if let Some(threshold) = &summary.threshold {
        println!(
            "  threshold:       {:.3}{}",
            threshold.value(),
            if threshold.is_relaxed() { " (relaxed)" } else { "" }
        );
    }
    println!("  output:          {}", outcome.output_dir.display());
    if let Some(id) = outcome.file_id {
        println!("  file id:         {}", id);
    }
}

fn print_metrics(m: &voxcorpus_types::QualityMetrics) {
    println!(
        "  quality:         {:.3}{}",
        m.quality_score,
        if m.is_acceptable { "" } else { " (below bar)" }
    );
    println!("  volume:          {:.4} ({:.1} dB)", m.volume, m.volume_db);
    println!("  noise ratio:     {:.3}", m.noise_ratio);
    println!("  snr estimate:    {:.2} dB", m.snr_estimate);
    println!("  zcr:             {:.4}", m.zero_crossing_rate);
    println!("  centroid:        {:.0} Hz", m.spectral_centroid);
}

fn print_segment(prefix: &str, s: &SegmentRecord) {
    println!(
        "{}#{:<3} {:>7.2}-{:<7.2} q={:.3} p={:.2}  {}",
        prefix,
        s.segment_index,
        s.start_time,
        s.end_time,
        s.metrics.quality_score,
        s.training_priority,
        s.transcript
    );
}

fn print_segments(records: &[SegmentRecord]) {
    for record in records {
        print_segment("", record);
    }
    println!("{} segments", records.len());
}

fn print_stored(segments: &[StoredSegment]) {
    for segment in segments {
        let prefix = format!("{:>5} f{:<4} ", segment.id, segment.original_file_id);
        print_segment(&prefix, &segment.record);
    }
    println!("{} segments", segments.len());
}

fn print_statistics(stats: &Statistics) {
    let p = &stats.processing;
    let q = &stats.quality;
    println!("files:            {}", p.total_files);
    println!("segments:         {} ({} ML-ready)", p.total_segments, p.ml_ready_segments);
    println!("avg duration:     {:.2}s", p.average_duration);
    println!("avg wpm:          {:.2}", p.average_wpm);
    println!(
        "quality:          avg {:.3}, min {:.3}, max {:.3}, sd {:.3}",
        q.average_quality, q.min_quality, q.max_quality, q.quality_std_dev
    );
    println!(
        "volume:           {:.4} ({:.1} dB), noise ratio {:.3}",
        q.average_volume, q.average_volume_db, q.average_noise_ratio
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    /// Verify the CLI definition is valid
    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parse_process() {
        let cli = Cli::try_parse_from([
            "voxcorpus",
            "process",
            "talk.wav",
            "--provider",
            "openai",
            "--target",
            "20",
            "--no-store",
            "--json",
        ])
        .unwrap();
        assert!(cli.json);
        match cli.command {
            Commands::Process {
                audio,
                provider,
                target,
                no_store,
                transcript,
                ..
            } => {
                assert_eq!(audio, PathBuf::from("talk.wav"));
                assert_eq!(provider, Some(ProviderKind::OpenAi));
                assert_eq!(target, Some(20));
                assert!(no_store);
                assert!(transcript.is_none());
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn parse_ml_ready_defaults() {
        let cli = Cli::try_parse_from(["voxcorpus", "ml-ready"]).unwrap();
        match cli.command {
            Commands::MlReady { min_quality, limit } => {
                assert_eq!(min_quality, 0.3);
                assert_eq!(limit, 100);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn parse_global_config_after_subcommand() {
        let cli =
            Cli::try_parse_from(["voxcorpus", "stats", "--config", "/tmp/vc.json"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/vc.json")));
        assert!(matches!(cli.command, Commands::Stats));
    }

    #[test]
    fn parse_config_init() {
        let cli = Cli::try_parse_from(["voxcorpus", "config", "init"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Config {
                action: ConfigAction::Init
            }
        ));
    }

    #[test]
    fn reject_unknown_provider() {
        assert!(Cli::try_parse_from(["voxcorpus", "process", "a.wav", "--provider", "x"]).is_err());
    }
}

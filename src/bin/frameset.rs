use std::{fmt::Debug, path::PathBuf, sync::Arc};

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use colored::Colorize;
use env_logger::Env;
use frameset::{
    BatchReport, DEFAULT_CUTOFF, Dataset, ExtractOptions, MAX_CUTOFF, ProgressCallback, ProgressInfo,
    Strategy, WorkerPool,
};
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::json;

const CLI_AFTER_HELP: &str = "Examples:\n  frameset download https://example.com/dataset data --cleanup\n  frameset extract data --scope smooth --frame-cutoff 9 --progress\n  frameset plan https://example.com/dataset data --json\n  frameset completions zsh > _frameset";

#[derive(Debug, Parser)]
#[command(
    name = "frameset",
    version,
    about = "Download an event-annotated video dataset and extract training frames",
    after_help = CLI_AFTER_HELP
)]
struct Cli {
    #[command(flatten)]
    global: GlobalOptions,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Parser, Clone, Default)]
struct GlobalOptions {
    /// Show debug logging output.
    #[arg(long, global = true)]
    verbose: bool,

    /// Show a progress bar for each batch.
    #[arg(long, global = true)]
    progress: bool,

    /// Worker count (default: one per CPU).
    #[arg(long, global = true)]
    workers: Option<usize>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Download and unarchive the dataset.
    #[command(
        about = "Download and unarchive dataset files",
        after_help = "Examples:\n  frameset download https://example.com/dataset data\n  frameset download https://example.com/dataset data --cleanup"
    )]
    Download {
        /// Base URL of the remote dataset.
        download_url: String,
        /// Local dataset root.
        path: PathBuf,
        /// Delete archives once they are unpacked.
        #[arg(long)]
        cleanup: bool,
    },

    /// Extract frames from every downloaded video.
    #[command(
        about = "Extract images from the dataset videos",
        after_help = "Examples:\n  frameset extract data\n  frameset extract data --scope selected --frame-cutoff 12"
    )]
    Extract {
        /// Local dataset root.
        path: PathBuf,
        /// Frame selection: all | selected | smooth.
        #[arg(long, default_value = "all")]
        scope: String,
        /// Frames kept either side of an event for selected/smooth.
        #[arg(long, default_value_t = DEFAULT_CUTOFF, value_parser = cutoff_parser())]
        frame_cutoff: u32,
        /// Decode every video on a worker thread of this process instead of
        /// in its own child process.
        #[arg(long)]
        in_process: bool,
    },

    /// Extract one video and print its summary as JSON. Run by `extract`
    /// for each video.
    #[command(name = "extract-video", hide = true)]
    ExtractVideo {
        /// Video inside a prepared dataset tree.
        video: PathBuf,
        #[arg(long, default_value = "all")]
        scope: String,
        #[arg(long, default_value_t = DEFAULT_CUTOFF, value_parser = cutoff_parser())]
        frame_cutoff: u32,
    },

    /// Print the planned downloads without fetching anything.
    #[command(about = "Show the download plan")]
    Plan {
        /// Base URL of the remote dataset.
        download_url: String,
        /// Local dataset root.
        path: PathBuf,
        /// Output the plan as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Generate shell completion scripts.
    #[command(about = "Generate shell completions")]
    Completions {
        /// Target shell.
        shell: Shell,
    },
}

fn parse_strategy(value: &str) -> Option<Strategy> {
    value.parse().ok()
}

fn cutoff_parser() -> clap::builder::RangedI64ValueParser<u32> {
    clap::value_parser!(u32).range(1..=i64::from(MAX_CUTOFF))
}

fn extract_options(scope: &str, frame_cutoff: u32) -> Result<ExtractOptions, String> {
    let strategy = parse_strategy(scope)
        .ok_or(format!("unsupported --scope: {scope} (expected all, selected, or smooth)"))?;
    Ok(ExtractOptions::new()
        .with_strategy(strategy)
        .with_cutoff(frame_cutoff))
}

struct TerminalProgress {
    bar: ProgressBar,
}

impl TerminalProgress {
    fn new() -> Result<Self, Box<dyn std::error::Error>> {
        let bar = ProgressBar::new(0);
        let style = ProgressStyle::with_template("{spinner:.green} {bar:40.cyan/blue} {pos}/{len} {msg}")?;
        bar.set_style(style.progress_chars("##-"));
        Ok(Self { bar })
    }
}

impl ProgressCallback for TerminalProgress {
    fn on_progress(&self, info: &ProgressInfo) {
        self.bar.set_length(info.total);
        self.bar.set_position(info.current);
        self.bar.set_message(info.operation.to_string());
        if info.current >= info.total {
            self.bar
                .println(format!("{} {} {}/{}", "done".cyan().bold(), info.operation, info.current, info.total));
        }
    }
}

fn init_logging(global: &GlobalOptions) {
    let default_level = if global.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(default_level))
        .format_timestamp(None)
        .init();
}

fn build_pool(global: &GlobalOptions) -> Result<WorkerPool, Box<dyn std::error::Error>> {
    let pool = match global.workers {
        Some(workers) => WorkerPool::new(workers)?,
        None => WorkerPool::with_default_size()?,
    };
    if global.progress {
        Ok(pool.with_progress(Arc::new(TerminalProgress::new()?)))
    } else {
        Ok(pool)
    }
}

/// Print every failed item of a batch. Returns the number of failures.
fn print_failures<T: Debug, R>(report: &BatchReport<T, R>) -> usize {
    for (item, error) in report.failures() {
        eprintln!(
            "{} {} {item:?}: {error}",
            "failed:".red().bold(),
            report.kind()
        );
    }
    report.failed()
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(&cli.global);

    match cli.command {
        Commands::Download {
            download_url,
            path,
            cleanup,
        } => {
            let pool = build_pool(&cli.global)?;
            let dataset = Dataset::new(&path)?;
            let report = dataset.download(&download_url, &pool, cleanup)?;

            let mut failed = print_failures(&report.downloads) + print_failures(&report.unpacks);
            if let Some(Err(error)) = &report.cleanup {
                eprintln!("{} cleanup: {error}", "failed:".red().bold());
                failed += 1;
            }
            if failed > 0 {
                return Err(format!(
                    "{failed} item(s) failed; completed files were kept in {}",
                    path.display()
                )
                .into());
            }

            println!(
                "{} {}",
                "success:".green().bold(),
                format!(
                    "Downloaded {} file(s), unpacked {} archive(s), removed {} archive(s) in {}",
                    report.downloads.succeeded(),
                    report.unpacks.succeeded(),
                    report.archives_removed(),
                    path.display()
                )
                .green()
            );
        }
        Commands::Extract {
            path,
            scope,
            frame_cutoff,
            in_process,
        } => {
            let options = extract_options(&scope, frame_cutoff)?;
            let strategy = options.strategy();

            let pool = build_pool(&cli.global)?;
            let dataset = Dataset::new(&path)?;
            let report = if in_process {
                dataset.extract(&pool, &options)?
            } else {
                dataset.extract_isolated(&pool, &options, &std::env::current_exe()?)?
            };

            let failed = print_failures(&report);
            if failed > 0 {
                return Err(format!("{failed} of {} video(s) failed", report.total()).into());
            }

            let written: u64 = report
                .successes()
                .map(|(_, summary)| summary.frames_written)
                .sum();
            println!(
                "{} {}",
                "success:".green().bold(),
                format!(
                    "Extracted {written} frame(s) from {} video(s) with the {strategy} strategy",
                    report.total()
                )
                .green()
            );
        }
        Commands::ExtractVideo {
            video,
            scope,
            frame_cutoff,
        } => {
            let options = extract_options(&scope, frame_cutoff)?;
            let summary = frameset::extract(&video, &options)?;
            println!("{}", summary.to_json());
        }
        Commands::Plan {
            download_url,
            path,
            json,
        } => {
            let dataset = Dataset::new(&path)?;
            let resources = dataset.plan(&download_url);
            if json {
                let payload = json!(
                    resources
                        .iter()
                        .map(|(url, destination)| json!({
                            "url": url,
                            "destination": destination.display().to_string(),
                        }))
                        .collect::<Vec<_>>()
                );
                println!("{}", serde_json::to_string_pretty(&payload)?);
            } else {
                for (url, destination) in resources.iter() {
                    println!("{url} -> {}", destination.display());
                }
            }
        }
        Commands::Completions { shell } => {
            let mut command = Cli::command();
            clap_complete::generate(shell, &mut command, "frameset", &mut std::io::stdout());
        }
    }

    Ok(())
}

fn main() {
    if let Err(error) = run() {
        eprintln!("{} {error}", "error:".red().bold());
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::{Cli, Commands, parse_strategy};
    use clap::{CommandFactory, Parser};
    use frameset::Strategy;

    #[test]
    fn parse_strategy_aliases() {
        assert_eq!(parse_strategy("all"), Some(Strategy::All));
        assert_eq!(parse_strategy("Selected"), Some(Strategy::Selected));
        assert_eq!(parse_strategy("SMOOTH"), Some(Strategy::Smooth));
        assert_eq!(parse_strategy("every"), None);
    }

    #[test]
    fn extract_defaults() {
        let cli = Cli::try_parse_from(["frameset", "extract", "data"]).unwrap();
        match cli.command {
            Commands::Extract {
                scope, frame_cutoff, ..
            } => {
                assert_eq!(scope, "all");
                assert_eq!(frame_cutoff, 9);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn frame_cutoff_is_bounded() {
        for cutoff in ["0", "10001", "-3"] {
            let result = Cli::try_parse_from(["frameset", "extract", "data", "--frame-cutoff", cutoff]);
            assert!(result.is_err(), "cutoff {cutoff} should be rejected");
        }
        let cli = Cli::try_parse_from(["frameset", "extract", "data", "--frame-cutoff", "10000"]).unwrap();
        assert!(matches!(cli.command, Commands::Extract { frame_cutoff: 10_000, .. }));
    }

    #[test]
    fn extract_video_is_hidden() {
        let cli = Cli::try_parse_from([
            "frameset",
            "extract-video",
            "data/train/videos/game_1.mp4",
            "--scope",
            "smooth",
        ])
        .unwrap();
        assert!(matches!(cli.command, Commands::ExtractVideo { frame_cutoff: 9, .. }));

        let help = Cli::command().render_help().to_string();
        assert!(!help.contains("extract-video"));
    }

    #[test]
    fn download_cleanup_flag() {
        let cli = Cli::try_parse_from([
            "frameset",
            "--workers",
            "2",
            "download",
            "https://example.com/dataset",
            "data",
            "--cleanup",
        ])
        .unwrap();
        assert_eq!(cli.global.workers, Some(2));
        assert!(matches!(cli.command, Commands::Download { cleanup: true, .. }));
    }
}

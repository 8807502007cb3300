// src/main.rs
//
// CLI surface over the library pipelines.
// Exit code 1 on missing input or any pipeline error, 0 otherwise
// (a --check run that reports "incompatible" is still a successful run).

use clap::{Parser, Subcommand};
use eink_image::engine::{optimize_file, optimize_sprite_file, verify_file, CompatibilityReport};
use eink_image::inspect_header_from_path;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "eink-image", version, about = "Optimize images for e-ink displays")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Convert to a 600x800 grayscale PNG with stretched contrast
    Optimize {
        /// Input image path
        input: PathBuf,
        /// Output image path (default: input base name + "_eink_optimized")
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Only check compatibility, don't optimize
        #[arg(long)]
        check: bool,
    },
    /// Convert a sprite, flattening transparency onto white; keeps native size
    OptimizeSprite {
        /// Input sprite path
        input: PathBuf,
        /// Output image path (default: input base name + "_eink")
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn log_report(path: &std::path::Path, report: &CompatibilityReport) {
    let (w, h) = report.observed_resolution;
    let (tw, th) = report.target_resolution;
    info!(
        path = %path.display(),
        resolution = format!("{w}x{h}"),
        resolution_ok = report.resolution_ok(),
        mode = report.observed_mode.as_str(),
        mode_ok = report.mode_ok(),
        format_ok = report.format_ok(),
        alpha_ok = report.alpha_ok(),
        "compatibility check (target {tw}x{th} gray png, no alpha)"
    );
    if report.is_compatible() {
        info!("e-ink compatible");
    } else {
        info!("needs optimization");
    }
}

fn run(cli: Cli) -> eink_image::error::Result<()> {
    match cli.command {
        Command::Optimize {
            input,
            output,
            check,
        } => {
            if check {
                let report = verify_file(&input)?;
                log_report(&input, &report);
                return Ok(());
            }

            if let Ok(meta) = inspect_header_from_path(&input.to_string_lossy()) {
                info!(
                    width = meta.width,
                    height = meta.height,
                    format = meta.format.as_deref().unwrap_or("unknown"),
                    "input"
                );
            }

            let outcome = optimize_file(&input, output.as_deref())?;
            info!(
                path = %outcome.output_path.display(),
                width = outcome.width,
                height = outcome.height,
                bytes_in = outcome.bytes_in,
                bytes_out = outcome.bytes_out,
                size_change = format!("{:+.1}%", outcome.size_change_percent()),
                "optimization complete"
            );
            if let Some(report) = &outcome.report {
                log_report(&outcome.output_path, report);
            }
            Ok(())
        }
        Command::OptimizeSprite { input, output } => {
            let outcome = optimize_sprite_file(&input, output.as_deref())?;
            info!(
                path = %outcome.output_path.display(),
                width = outcome.width,
                height = outcome.height,
                bytes_in = outcome.bytes_in,
                bytes_out = outcome.bytes_out,
                size_change = format!("{:+.1}%", outcome.size_change_percent()),
                "sprite optimization complete"
            );
            Ok(())
        }
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(category = ?err.category(), "{err}");
            ExitCode::FAILURE
        }
    }
}

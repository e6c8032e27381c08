//! gemreco CLI: GEM tracker hit reconstruction.
//!
//! Reads a JSON run file (geometry, matching parameters and clustered u/v
//! hits), pairs the hits of every tracker and writes the GEM hits as CSV.
#![allow(clippy::uninlined_format_args, clippy::cast_precision_loss)]

use clap::{Parser, Subcommand};
use gemreco_algorithms::{reconstruct_event, EventStatistics, HitPairMatcher};
use gemreco_core::PRIMARY_TRACK_ID;
use gemreco_io::{EventHits, GemHitWriter, RunFile, RunSummary};
use log::{debug, info};
use std::path::PathBuf;
use std::time::Instant;
use thiserror::Error;

/// Result type for CLI operations.
type Result<T> = std::result::Result<T, CliError>;

/// CLI error types.
#[derive(Error, Debug)]
enum CliError {
    #[error("I/O error: {0}")]
    GemrecoIo(#[from] gemreco_io::Error),

    #[error("{0}")]
    Core(#[from] gemreco_core::Error),
}

/// GEM tracker hit reconstruction.
#[derive(Parser)]
#[command(name = "gemreco")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Pair u/v clusters into GEM hits
    Reconstruct {
        /// Input JSON run file
        input: PathBuf,

        /// Output CSV file
        #[arg(short, long)]
        output: PathBuf,

        /// Optional JSON run summary
        #[arg(long)]
        summary: Option<PathBuf>,

        /// Minimum match score (overrides the run file)
        #[arg(long)]
        min_score: Option<f64>,

        /// Expected v/u charge ratio (overrides the run file)
        #[arg(long)]
        charge_ratio_scale: Option<f64>,

        /// Active area edge tolerance in sigma (overrides the run file)
        #[arg(long)]
        edge_tolerance: Option<f64>,

        /// Maximum u/v combinations per tracker (overrides the run file)
        #[arg(long)]
        max_combinations: Option<usize>,

        /// MC track id counted as signal
        #[arg(long, default_value_t = PRIMARY_TRACK_ID)]
        primary_track: i32,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Show information about a run file
    Info {
        /// Input JSON run file
        input: PathBuf,
    },
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Reconstruct {
            input,
            output,
            summary,
            min_score,
            charge_ratio_scale,
            edge_tolerance,
            max_combinations,
            primary_track,
            verbose,
        } => {
            let run = RunFile::load(&input)?;

            let mut config = run.matching.clone();
            if let Some(value) = min_score {
                config = config.with_min_score(value);
            }
            if let Some(value) = charge_ratio_scale {
                config = config.with_charge_ratio_scale(value);
            }
            if let Some(value) = edge_tolerance {
                config = config.with_edge_tolerance_sigmas(value);
            }
            if let Some(value) = max_combinations {
                config = config.with_max_combinations(Some(value));
            }

            if verbose {
                eprintln!("Input: {}", input.display());
                eprintln!("Trackers: {}", run.geometry.trackers.len());
                eprintln!("Events: {}", run.events.len());
                eprintln!("Matching: {:?}", config);
            }

            let matcher = HitPairMatcher::try_new(config)?;
            let mut writer = GemHitWriter::create(&output, primary_track)?;
            let mut totals = EventStatistics::default();
            let mut signal_hits = 0usize;
            let start = Instant::now();

            for record in &run.events {
                let hits = EventHits::build(record, &run.geometry);
                let inputs = hits.inputs();
                let event = reconstruct_event(&matcher, &inputs);

                let rows = writer.write_event(hits.event_id, &event)?;
                let mut stats = event.statistics();
                stats.trackers += hits.failures().len();
                stats.failed_trackers += hits.failures().len();
                debug!(
                    "event {}: {} GEM hits, {} failed trackers",
                    hits.event_id, rows, stats.failed_trackers
                );
                if verbose {
                    for failure in hits.failures() {
                        eprintln!(
                            "  event {} chamber {} tracker {}: {}",
                            hits.event_id, failure.chamber_id, failure.tracker_id, failure.error
                        );
                    }
                    for (chamber_id, tracker_id, err) in event.failures() {
                        eprintln!(
                            "  event {} chamber {} tracker {}: {}",
                            hits.event_id, chamber_id, tracker_id, err
                        );
                    }
                }
                signal_hits += event.signal_count(primary_track);
                totals.merge(&stats);
            }
            writer.flush()?;

            let elapsed = start.elapsed();
            info!("reconstruction finished in {:.3}s", elapsed.as_secs_f64());

            if let Some(path) = summary {
                let summary = RunSummary {
                    events: run.events.len(),
                    signal_hits,
                    statistics: totals,
                };
                GemHitWriter::write_summary_json(&path, &summary)?;
                if verbose {
                    eprintln!("Summary written to: {}", path.display());
                }
            }

            let matching = &totals.matching;
            println!(
                "Processed {} events in {:.2}s",
                run.events.len(),
                elapsed.as_secs_f64()
            );
            println!("GEM hits: {}", totals.gem_hits);
            println!(
                "Unmatched: {} u / {} v",
                matching.unmatched_u(),
                matching.unmatched_v()
            );
            println!(
                "Rejected: {} below threshold, {} conflicts, {} outside area, {} unsolved, {} geometry",
                matching.below_threshold,
                matching.conflicts,
                matching.outside_area,
                matching.unsolved,
                matching.geometry_rejected
            );
            println!("Failed trackers: {}", totals.failed_trackers);
            if totals.gem_hits > 0 {
                println!(
                    "Signal fraction: {:.3}",
                    signal_hits as f64 / totals.gem_hits as f64
                );
            }
        }

        Commands::Info { input } => {
            let run = RunFile::load(&input)?;

            println!("File: {}", input.display());
            println!("Trackers: {}", run.geometry.trackers.len());
            for tracker in &run.geometry.trackers {
                println!(
                    "  chamber {} tracker {}: z = {} m, stereo angle = {:.2} deg ({} / {})",
                    tracker.chamber_id,
                    tracker.tracker_id,
                    tracker.z,
                    (tracker.v.strip_angle - tracker.u.strip_angle).to_degrees(),
                    tracker.u.name,
                    tracker.v.name
                );
            }

            let (u_hits, v_hits) = run.events.iter().fold((0, 0), |(u, v), event| {
                let (eu, ev) = event.hit_counts();
                (u + eu, v + ev)
            });
            println!("Events: {}", run.events.len());
            println!("Clusters: {} u / {} v", u_hits, v_hits);
        }
    }

    Ok(())
}

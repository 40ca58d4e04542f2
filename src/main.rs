//! dj-master - analyze, master, or produce a track end to end
//!
//! - analyze: score an audio file against a quality profile
//! - master: run the six-pass mastering chain on an audio file
//! - produce: render a composition with quality-controlled regeneration,
//!   repair, humanization and mastering

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use dj_master::audio::{read_audio_file, write_wav_file};
use dj_master::render::{Composition, CompositionSource};
use dj_master::{analyze, LoudnessTarget, MasteringStyle, Pipeline, PipelineConfig, QualityReport, ThresholdProfile};

#[derive(Parser)]
#[command(name = "dj-master")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Score an audio file and print the quality report
    Analyze {
        /// Audio file (WAV, FLAC, MP3, OGG)
        input: PathBuf,

        /// Threshold profile: strict, relaxed, or a genre name
        #[arg(long, default_value = "strict")]
        profile: String,

        /// Load the threshold profile from a JSON file instead
        #[arg(long)]
        profile_file: Option<PathBuf>,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Master an audio file to WAV
    Master {
        input: PathBuf,
        output: PathBuf,

        /// warm, balanced, bright or aggressive
        #[arg(long, default_value = "balanced")]
        style: String,

        /// streaming, club, loud, or a LUFS value
        #[arg(long, allow_hyphen_values = true)]
        target_lufs: Option<String>,

        #[arg(long)]
        no_saturation: bool,

        #[arg(long)]
        no_stereo: bool,

        /// 16, 24, or 32 (float)
        #[arg(long)]
        bit_depth: Option<u16>,
    },

    /// Render a composition through the full quality-controlled pipeline
    Produce {
        /// Composition JSON
        composition: PathBuf,
        output: PathBuf,

        #[arg(long)]
        seed: Option<u64>,

        #[arg(long)]
        max_attempts: Option<usize>,

        /// streaming, club, loud, or a LUFS value
        #[arg(long, allow_hyphen_values = true)]
        target_lufs: Option<String>,

        #[arg(long)]
        sample_rate: Option<u32>,

        #[arg(long)]
        bit_depth: Option<u16>,

        #[arg(long)]
        no_humanize: bool,

        #[arg(long)]
        no_master: bool,

        /// Skip regeneration, repair and the final report
        #[arg(long)]
        no_qc: bool,

        /// Load the threshold profile from a JSON file
        #[arg(long)]
        profile_file: Option<PathBuf>,

        /// Write the production summary as JSON
        #[arg(long)]
        report: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("dj_master=info".parse()?)
                .add_directive("warn".parse()?),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Analyze {
            input,
            profile,
            profile_file,
            json,
        } => run_analyze(&input, &profile, profile_file.as_deref(), json),
        Commands::Master {
            input,
            output,
            style,
            target_lufs,
            no_saturation,
            no_stereo,
            bit_depth,
        } => {
            let mut config = PipelineConfig::from_env();
            if let Some(target) = target_lufs {
                config.target_lufs = LoudnessTarget::from(target.as_str()).lufs_value();
            }
            if let Some(depth) = bit_depth {
                config.export_bit_depth = depth;
            }
            config.apply_saturation &= !no_saturation;
            config.enhance_stereo &= !no_stereo;
            run_master(&input, &output, MasteringStyle::from(style.as_str()), config)
        }
        Commands::Produce {
            composition,
            output,
            seed,
            max_attempts,
            target_lufs,
            sample_rate,
            bit_depth,
            no_humanize,
            no_master,
            no_qc,
            profile_file,
            report,
        } => {
            let mut config = PipelineConfig::from_env();
            if let Some(seed) = seed {
                config.seed = seed;
            }
            if let Some(attempts) = max_attempts {
                config.max_regeneration_attempts = attempts;
            }
            if let Some(target) = target_lufs {
                config.target_lufs = LoudnessTarget::from(target.as_str()).lufs_value();
            }
            if let Some(rate) = sample_rate {
                config.sample_rate = rate;
            }
            if let Some(depth) = bit_depth {
                config.export_bit_depth = depth;
            }
            config.humanize &= !no_humanize;
            config.master &= !no_master;
            config.quality_control &= !no_qc;
            run_produce(&composition, &output, config, profile_file.as_deref(), report.as_deref())
        }
    }
}

fn load_profile(name: &str, file: Option<&Path>) -> Result<ThresholdProfile> {
    match file {
        Some(path) => ThresholdProfile::from_json_file(path)
            .with_context(|| format!("Failed to load profile {}", path.display())),
        None => Ok(ThresholdProfile::from(name)),
    }
}

fn print_report(report: &QualityReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
    } else {
        println!("{}", report);
    }
    Ok(())
}

fn run_analyze(input: &Path, profile: &str, profile_file: Option<&Path>, json: bool) -> Result<()> {
    let profile = load_profile(profile, profile_file)?;
    let buffer = read_audio_file(input).with_context(|| format!("Failed to read {}", input.display()))?;
    let report = analyze(&buffer, &profile).context("Analysis failed")?;
    print_report(&report, json)
}

fn run_master(input: &Path, output: &Path, style: MasteringStyle, config: PipelineConfig) -> Result<()> {
    let buffer = read_audio_file(input).with_context(|| format!("Failed to read {}", input.display()))?;
    let bit_depth = config.export_bit_depth;
    let pipeline = Pipeline::new(config);

    let (mastered, report) = pipeline.master_only(&buffer, style).context("Mastering failed")?;
    write_wav_file(&mastered, output, bit_depth)
        .with_context(|| format!("Failed to write {}", output.display()))?;
    info!("Wrote {}", output.display());

    if let Some(report) = report {
        print_report(&report, false)?;
    }
    Ok(())
}

fn run_produce(
    composition_path: &Path,
    output: &Path,
    config: PipelineConfig,
    profile_file: Option<&Path>,
    report_path: Option<&Path>,
) -> Result<()> {
    let composition = Composition::from_file(composition_path)
        .with_context(|| format!("Failed to load composition {}", composition_path.display()))?;
    info!(
        "Loaded \"{}\" ({} instructions)",
        composition.title,
        composition.instructions.len()
    );

    let genre = composition.genre;
    let bit_depth = config.export_bit_depth;
    let source = CompositionSource::new(composition, config.sample_rate);

    let mut pipeline = Pipeline::new(config);
    if let Some(path) = profile_file {
        pipeline = pipeline.with_profile(load_profile("strict", Some(path))?);
    }

    let production = pipeline.produce(&source, genre).context("Production failed")?;
    write_wav_file(&production.buffer, output, bit_depth)
        .with_context(|| format!("Failed to write {}", output.display()))?;
    info!("Wrote {}", output.display());

    for fix in &production.fixes {
        info!("Repair [{}]: {}", fix.module, fix.description);
    }
    if let Some(report) = &production.report {
        print_report(report, false)?;
    }
    if let Some(path) = report_path {
        fs::write(path, serde_json::to_string_pretty(&production)?)
            .with_context(|| format!("Failed to write report {}", path.display()))?;
    }
    Ok(())
}

use std::path::PathBuf;

use chipforge_core::{
    Compiler, CompilerConfig,
    diagnostics::init_tracing_from_config,
    fingerprint::{fingerprint, read_fingerprint, write_fingerprint},
    fixtures::write_demo_assets,
    preview::analyze_wav,
};
use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "chipforge-cli")]
#[command(about = "Offline compiler for procedural game audio assets")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file; defaults to chipforge.config.toml discovery.
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// Only write the JSON session log; keep the console clean.
    #[arg(long)]
    quiet: bool,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Compile every definition in the input directory.
    Build {
        #[arg(long)]
        input_dir: Option<PathBuf>,

        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
    /// Compile a single SFX or track definition.
    Render {
        path: PathBuf,

        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
    /// Render a definition and write (or check against) its fingerprint.
    Fingerprint {
        path: PathBuf,

        #[arg(long)]
        output: PathBuf,

        /// Compare with the existing fingerprint instead of overwriting it.
        #[arg(long)]
        check: bool,
    },
    /// Summarize a WAV file as duration plus waveform peaks.
    Inspect {
        path: PathBuf,

        #[arg(long, default_value_t = 1024)]
        bucket_size: usize,
    },
    /// Write demo definitions and compile them.
    Demo {
        #[arg(long, default_value = "demo")]
        output_dir: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = match &cli.config {
        Some(path) => CompilerConfig::from_path(path)?,
        None => CompilerConfig::load_or_default()?,
    };
    let log_dir = cli
        .log_dir
        .clone()
        .unwrap_or_else(|| config.paths.logs_dir.clone());
    if cli.quiet {
        config.diagnostics.console_logs = false;
    }
    let _telemetry = init_tracing_from_config(&log_dir, &config.diagnostics)?;

    match cli.command {
        Commands::Build {
            input_dir,
            output_dir,
        } => {
            if let Some(output_dir) = output_dir {
                config.paths.output_dir = output_dir;
            }
            let input_dir = input_dir.unwrap_or_else(|| config.paths.input_dir.clone());
            let mut compiler = Compiler::from_config(&config)?;
            let report = compiler.build_directory(&input_dir)?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            if !report.is_clean() {
                anyhow::bail!("{} asset(s) failed to compile", report.failures.len());
            }
        }
        Commands::Render { path, output_dir } => {
            if let Some(output_dir) = output_dir {
                config.paths.output_dir = output_dir;
            }
            let mut compiler = Compiler::from_config(&config)?;
            if let Some(parent) = path.parent() {
                compiler.load_instruments(parent)?;
            }
            let asset = compiler.compile_file(&path)?;
            println!("{}", serde_json::to_string_pretty(&asset)?);
        }
        Commands::Fingerprint {
            path,
            output,
            check,
        } => {
            let mut compiler = Compiler::from_config(&config)?;
            if let Some(parent) = path.parent() {
                compiler.load_instruments(parent)?;
            }
            let (parsed, rendered) = compiler.render_file(&path)?;
            let report = fingerprint(&parsed.name, &rendered.samples, compiler.sample_rate());

            if check {
                let expected = read_fingerprint(&output)?;
                if !expected.matches(&report) {
                    anyhow::bail!(
                        "fingerprint mismatch for {}: expected {}, got {}",
                        parsed.name,
                        expected.pcm_hash,
                        report.pcm_hash
                    );
                }
                tracing::info!(asset = %parsed.name, "fingerprint matches");
            } else {
                write_fingerprint(&output, &report)?;
                tracing::info!(path = %output.display(), "fingerprint written");
            }
        }
        Commands::Inspect { path, bucket_size } => {
            let analysis = analyze_wav(&path, bucket_size)?;
            println!("{}", serde_json::to_string_pretty(&analysis)?);
        }
        Commands::Demo { output_dir } => {
            let source_dir = output_dir.join("assets");
            write_demo_assets(&source_dir)?;
            config.paths.output_dir = output_dir.join("build");
            let mut compiler = Compiler::from_config(&config)?;
            let report = compiler.build_directory(&source_dir)?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    Ok(())
}

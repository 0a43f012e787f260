// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! `ifc2glb`: convert IFC files on disk into GLB files
//!
//! The binary is a thin wrapper over [`run`], which is kept here so it can be
//! exercised without spawning a process.

use std::collections::HashSet;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context as _};
use ifc_glb_convert::{
    artifact_name, format_file_size, BackendMode, BatchSummary, Converter, ConverterConfig,
    JobStatus, Readiness,
};

/// Command line options
#[derive(Clone, Debug, clap::Parser)]
#[command(name = "ifc2glb", version, about = "Convert IFC building models to binary glTF")]
pub struct Args {
    /// IFC files to convert
    #[arg(required = true, value_name = "INPUT")]
    pub inputs: Vec<PathBuf>,

    /// Directory the GLB files are written to
    #[arg(long = "out-dir", short = 'o', value_name = "DIR", default_value = ".")]
    pub out_dir: PathBuf,

    /// JSON configuration file
    #[arg(long = "config", short = 'c', value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Backend selection: auto, native or fallback
    #[arg(long = "backend", value_name = "MODE")]
    pub backend: Option<BackendMode>,

    /// Elements extracted per IFC type by the native backend
    #[arg(long = "max-elements", value_name = "N")]
    pub max_elements: Option<usize>,

    /// More logging to stderr; repeat for more detail
    #[arg(long = "verbose", short = 'v', action = clap::ArgAction::Count)]
    pub verbose: u8,
}

/// What a run produced
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Report {
    pub readiness: Readiness,
    pub summary: BatchSummary,
    /// GLB files written, in input order
    pub written: Vec<PathBuf>,
}

impl Report {
    pub fn all_succeeded(&self) -> bool {
        self.summary.failed == 0
    }
}

/// Log level for a `-v` count
pub fn verbosity_level(verbose: u8) -> log::LevelFilter {
    use log::LevelFilter::{Debug, Info, Trace, Warn};
    match verbose {
        0 => Warn,
        1 => Info,
        2 => Debug,
        _ => Trace,
    }
}

/// Install the stderr logger
pub fn install_logging(verbose: u8) -> anyhow::Result<()> {
    use simplelog::LevelFilter::Off;
    simplelog::TermLogger::init(
        verbosity_level(verbose),
        simplelog::ConfigBuilder::new()
            .set_target_level(Off)
            .set_location_level(Off)
            .build(),
        simplelog::TerminalMode::Stderr,
        simplelog::ColorChoice::Auto,
    )
    .context("failed to initialize logging")?;
    Ok(())
}

/// Configuration file (or defaults) with command line overrides applied
pub fn load_config(args: &Args) -> anyhow::Result<ConverterConfig> {
    let mut config = match &args.config {
        Some(path) => ConverterConfig::from_path(path)
            .with_context(|| format!("failed to load configuration from {}", path.display()))?,
        None => ConverterConfig::default(),
    };
    if let Some(backend) = args.backend {
        config.backend = backend;
    }
    if let Some(max) = args.max_elements {
        config.max_elements_per_type = max;
    }
    config.validate()?;
    Ok(config)
}

fn display_name(path: &Path) -> anyhow::Result<String> {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .with_context(|| format!("{} does not name a file", path.display()))
}

/// Read every input up front so a missing file stops the run before it starts
pub fn read_inputs(paths: &[PathBuf]) -> anyhow::Result<Vec<(String, Vec<u8>)>> {
    let names = paths
        .iter()
        .map(|path| display_name(path))
        .collect::<anyhow::Result<Vec<_>>>()?;
    let mut seen = HashSet::new();
    for name in &names {
        let output = artifact_name(name);
        if !seen.insert(output.clone()) {
            bail!("more than one input would be written as {output}");
        }
    }

    paths
        .iter()
        .zip(names)
        .map(|(path, name)| {
            let bytes = std::fs::read(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            Ok((name, bytes))
        })
        .collect()
}

/// Convert `args.inputs`, write the artifacts and print one line per job to `out`
pub fn run(args: &Args, out: &mut dyn Write) -> anyhow::Result<Report> {
    let config = load_config(args)?;
    let files = read_inputs(&args.inputs)?;
    std::fs::create_dir_all(&args.out_dir)
        .with_context(|| format!("failed to create {}", args.out_dir.display()))?;

    let mut converter = Converter::new(config)?;
    let ids = converter.enqueue(files);

    let readiness = converter.initialize()?.clone();
    if let Readiness::Fallback { message } = &readiness {
        log::warn!("{message}");
    }

    let summary = converter.convert_all()?;

    let mut written = Vec::new();
    for id in ids {
        let Some(job) = converter.job(id) else {
            continue;
        };
        match (job.status, converter.artifact(id)) {
            (JobStatus::Success, Some(artifact)) => {
                let path = args.out_dir.join(&artifact.file_name);
                std::fs::write(&path, &artifact.glb)
                    .with_context(|| format!("failed to write {}", path.display()))?;
                let (meshes, millis) = job
                    .result
                    .as_ref()
                    .map_or((0, 0), |r| (r.geometry_count, r.conversion_time_ms));
                writeln!(
                    out,
                    "ok      {} -> {} ({}, {meshes} meshes, {millis} ms)",
                    job.name,
                    path.display(),
                    format_file_size(artifact.glb.len() as u64),
                )?;
                written.push(path);
            }
            _ => {
                writeln!(
                    out,
                    "failed  {}: {}",
                    job.name,
                    job.error.as_deref().unwrap_or("unknown error")
                )?;
            }
        }
    }
    writeln!(
        out,
        "{} of {} converted in {} ms",
        summary.succeeded, summary.total, summary.elapsed_ms
    )?;

    Ok(Report {
        readiness,
        summary,
        written,
    })
}

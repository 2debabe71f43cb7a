//! Command-line surface of the `beamsec` binary.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};

use beamsec::jobs::{generator, matcher, registrar};
use beamsec::{
    shared, Engine, GeneratorConfig, JobContext, JobKind, JobLog, JobRunner, JobsConfig,
    LocalEngine, MatcherConfig, RegistrarConfig, RunReport,
};

#[derive(Parser)]
#[command(name = "beamsec")]
#[command(
    author,
    version,
    about = "Build beam section libraries and assign beam properties in FEA models"
)]
pub struct Cli {
    /// Job configuration file (JSON); defaults apply when omitted
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Print the run report as JSON on stdout and the job log on stderr
    #[arg(long, global = true)]
    pub json: bool,

    /// Increase diagnostic output (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Convert every geometry file in a folder into a section file.
    Generate(GenerateArgs),

    /// Create one beam property per section file.
    Register(RegisterArgs),

    /// Assign beam properties by matching beam IDs to property names.
    Assign(AssignArgs),

    /// Write a configuration file holding every default.
    InitConfig {
        /// Destination of the configuration file
        #[arg(default_value = "beamsec.json")]
        path: PathBuf,
        /// Replace an existing file
        #[arg(long)]
        force: bool,
    },
}

#[derive(Args)]
pub struct GenerateArgs {
    /// Folder scanned for geometry files
    #[arg(long)]
    geometry: Option<PathBuf>,
    /// Folder the section files are written to
    #[arg(long)]
    output: Option<PathBuf>,
    /// Folder for scratch models
    #[arg(long)]
    scratch: Option<PathBuf>,
}

#[derive(Args)]
pub struct RegisterArgs {
    /// Model the properties are added to
    #[arg(long)]
    model: Option<PathBuf>,
    /// Folder scanned for section files
    #[arg(long)]
    sections: Option<PathBuf>,
    /// Property name prefix
    #[arg(long)]
    prefix: Option<String>,
}

#[derive(Args)]
pub struct AssignArgs {
    /// Model whose beams are assigned
    #[arg(long)]
    model: Option<PathBuf>,
    /// Property name prefix placed before each beam ID
    #[arg(long)]
    prefix: Option<String>,
}

/// A job with its final configuration.
enum Job {
    Generate(GeneratorConfig),
    Register(RegistrarConfig),
    Assign(MatcherConfig),
}

impl Job {
    /// Kind reported by this job.
    fn kind(&self) -> JobKind {
        match self {
            Job::Generate(_) => JobKind::Generator,
            Job::Register(_) => JobKind::Registrar,
            Job::Assign(_) => JobKind::Matcher,
        }
    }

    /// Run the job to completion on `engine`.
    fn run<E: Engine + ?Sized>(&self, engine: &mut E, context: &JobContext) -> RunReport {
        match self {
            Job::Generate(config) => generator::generate_sections(engine, config, context),
            Job::Register(config) => registrar::register_sections(engine, config, context),
            Job::Assign(config) => matcher::assign_by_id(engine, config, context),
        }
    }
}

/// Configuration from `path`, or the defaults when no file is given.
fn load_config(path: Option<&Path>) -> Result<JobsConfig> {
    match path {
        Some(path) => Ok(JobsConfig::load(path)?),
        None => Ok(JobsConfig::default()),
    }
}

impl GenerateArgs {
    /// Override `config` with the flags that were given.
    fn apply(self, mut config: GeneratorConfig) -> GeneratorConfig {
        if let Some(geometry) = self.geometry {
            config.geometry_folder = geometry;
        }
        if let Some(output) = self.output {
            config.output_folder = output;
        }
        if let Some(scratch) = self.scratch {
            config.scratch_folder = scratch;
        }
        config
    }
}

impl RegisterArgs {
    /// Override `config` with the flags that were given.
    fn apply(self, mut config: RegistrarConfig) -> RegistrarConfig {
        if let Some(model) = self.model {
            config.model_path = model;
        }
        if let Some(sections) = self.sections {
            config.section_folder = sections;
        }
        if let Some(prefix) = self.prefix {
            config.name_prefix = prefix;
        }
        config
    }
}

impl AssignArgs {
    /// Override `config` with the flags that were given.
    fn apply(self, mut config: MatcherConfig) -> MatcherConfig {
        if let Some(model) = self.model {
            config.model_path = model;
        }
        if let Some(prefix) = self.prefix {
            config.prefix = prefix;
        }
        config
    }
}

/// Write the default configuration to `path`.
fn init_config(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!("{} already exists; pass --force to replace it", path.display());
    }
    JobsConfig::default()
        .save(path)
        .with_context(|| format!("writing {}", path.display()))?;
    println!("Wrote default configuration to {}", path.display());
    Ok(())
}

/// Execute the selected command. Returns the report of a job run, or `None`
/// for commands that do not run a job.
pub fn execute(cli: Cli) -> Result<Option<RunReport>> {
    let config_path = cli.config;
    let job = match cli.command {
        Commands::InitConfig { path, force } => {
            init_config(&path, force)?;
            return Ok(None);
        }
        Commands::Generate(args) => {
            Job::Generate(args.apply(load_config(config_path.as_deref())?.generator))
        }
        Commands::Register(args) => {
            Job::Register(args.apply(load_config(config_path.as_deref())?.registrar))
        }
        Commands::Assign(args) => {
            Job::Assign(args.apply(load_config(config_path.as_deref())?.matcher))
        }
    };
    let kind = job.kind();

    let log = if cli.json {
        JobLog::new(kind.name()).with_sink(std::sync::Arc::new(|line: &str| eprintln!("{line}")))
    } else {
        JobLog::new(kind.name())
    };

    let engine = shared(LocalEngine::new());
    let runner = JobRunner::new(kind);
    let handle = match runner.start(log, move |context| {
        let mut engine = engine.lock();
        job.run(&mut *engine, &context)
    }) {
        Ok(handle) => handle,
        Err(error) => return Ok(Some(RunReport::from(error))),
    };
    Ok(Some(handle.join()))
}

//! `bindery` command line: evaluate XPath against an instance document and
//! validate instances against ad-hoc binds.
use std::io::Write as _;

use anyhow::Context as _;
use bindery_engine::{ActionEngine, EngineConfig};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

pub mod commands;
pub mod util;

#[cfg(test)]
pub(crate) mod test_support;

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "bindery", version, about = "Evaluate and validate XForms instance data")]
pub struct Cli {
    /// Log filter used when RUST_LOG is unset.
    #[arg(long = "log-level", global = true, default_value = "warn")]
    pub log_level: String,
    /// Upper bound on flush iterations.
    #[arg(long = "max-iterations", global = true, default_value_t = 1024)]
    pub max_iterations: usize,
    /// Print expression timings to stderr after the command.
    #[arg(long = "profile", global = true)]
    pub profile: bool,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Evaluate an XPath expression against an instance document.
    Eval(commands::eval::EvalArgs),
    /// Check every node of an instance against the given binds.
    Validate(commands::validate::ValidateArgs),
}

impl Cli {
    fn engine_config(&self) -> EngineConfig {
        EngineConfig::default().with_max_flush_iterations(self.max_iterations).with_profiling(self.profile)
    }
}

pub fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level)?;
    let config = cli.engine_config();

    let (output, engine, failed) = match &cli.command {
        Commands::Eval(args) => {
            let (output, engine) = commands::eval::run(config, args)?;
            (output, engine, 0)
        }
        Commands::Validate(args) => {
            let report = commands::validate::run(config, args)?;
            (report.output, report.engine, report.invalid)
        }
    };

    let mut stdout = std::io::stdout().lock();
    if !output.is_empty() {
        writeln!(stdout, "{output}").context("writing output")?;
    }
    if cli.profile {
        eprintln!("{}", util::render_profile(&engine));
    }
    for diagnostic in engine.diagnostics().iter() {
        eprintln!("warning: {}", diagnostic.message);
    }
    if failed > 0 {
        anyhow::bail!("{failed} invalid node(s)");
    }
    Ok(())
}

fn init_tracing(default: &str) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|error| anyhow::anyhow!(error))
        .context("initializing tracing subscriber")
}

/// Engine over one instance file, with optional extra named instances.
pub(crate) fn load_engine(
    config: EngineConfig,
    instance: &std::path::Path,
    extra: &[String],
    namespaces: &[String],
) -> anyhow::Result<(ActionEngine, bindery_engine::ModelId)> {
    let mut engine = ActionEngine::new(config)?;
    for (prefix, uri) in util::parse_pairs(namespaces, "namespace")? {
        engine.forms_mut().register_prefix(&prefix, &uri);
    }
    let model = engine.add_model("default");
    let xml = std::fs::read_to_string(instance).with_context(|| format!("reading {}", instance.display()))?;
    engine.add_instance(model, "data", &xml)?;
    for (name, path) in util::parse_pairs(extra, "instance")? {
        let xml = std::fs::read_to_string(&path).with_context(|| format!("reading {path}"))?;
        engine.add_instance(model, &name, &xml)?;
    }
    Ok((engine, model))
}

mod cli;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use log::{debug, error};

use ignition_core::activation::{PluginRunner, PluginState};
use ignition_core::config::{ConfigTier, ConfigUserAction, ConfigurationStore};
use ignition_core::kernel::constants::{APP_NAME, APP_VERSION};
use ignition_core::plugin_system::{Discoverer, PluginCatalog, PluginId};
use ignition_core::requirements::{RequirementLayer, RunningRequirement};
use ignition_core::resolver::ResolutionIssue;

use cli::ConsoleHost;

/// Ignition: resolve and activate plugins
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct CliArgs {
    /// Log resolution and activation details to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List the plugins found in a directory
    List {
        #[command(flatten)]
        source: SourceArgs,
    },
    /// Show the resolved target of every plugin without starting anything
    Plan {
        #[command(flatten)]
        source: SourceArgs,
        #[command(flatten)]
        inputs: InputArgs,
    },
    /// Run one activation pass and print the resulting plugin states
    Apply {
        #[command(flatten)]
        source: SourceArgs,
        #[command(flatten)]
        inputs: InputArgs,
        /// Make the start hook of this plugin fail
        #[arg(long = "fail", value_name = "ID")]
        fail: Vec<PluginId>,
    },
}

#[derive(Args, Debug)]
struct SourceArgs {
    /// Directory containing *.plugin.{json,yaml,yml,toml} manifests
    #[arg(long, value_name = "DIR")]
    plugins: PathBuf,
    /// Also scan sub-directories
    #[arg(long)]
    recursive: bool,
}

#[derive(Args, Debug)]
struct InputArgs {
    /// System tier document
    #[arg(long, value_name = "FILE")]
    system: Option<PathBuf>,
    /// User tier document
    #[arg(long, value_name = "FILE")]
    user: Option<PathBuf>,
    /// Live action: start this plugin
    #[arg(long = "start", value_name = "ID")]
    start: Vec<PluginId>,
    /// Live action: stop this plugin
    #[arg(long = "stop", value_name = "ID")]
    stop: Vec<PluginId>,
    /// Require this plugin to run
    #[arg(long = "require", value_name = "ID")]
    require: Vec<PluginId>,
    /// Require the implementer of this service to run
    #[arg(long = "require-service", value_name = "SERVICE")]
    require_service: Vec<String>,
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let env = env_logger::Env::default().default_filter_or(default_level);
    if let Err(e) = env_logger::Builder::from_env(env).try_init() {
        eprintln!("Failed to initialize logging: {}", e);
    }
}

fn discover(source: &SourceArgs) -> ignition_core::Result<PluginCatalog> {
    let mut catalog = PluginCatalog::new();
    catalog.discover(&source.plugins, source.recursive)?;
    Ok(catalog)
}

fn load_inputs(inputs: &InputArgs) -> ignition_core::Result<(ConfigurationStore, RequirementLayer)> {
    let config = ConfigurationStore::new();
    let tiers: [(ConfigTier, Option<&Path>); 2] = [
        (ConfigTier::System, inputs.system.as_deref()),
        (ConfigTier::User, inputs.user.as_deref()),
    ];
    for (tier, path) in tiers {
        if let Some(path) = path {
            let count = config.load_tier(tier, path)?;
            debug!("{} tier: {} entries from {}", tier, count, path.display());
        }
    }
    for id in &inputs.start {
        config.set_action(*id, ConfigUserAction::Started);
    }
    for id in &inputs.stop {
        config.set_action(*id, ConfigUserAction::Stopped);
    }

    let layer = RequirementLayer::new("command-line");
    for id in &inputs.require {
        layer.require_plugin(*id, RunningRequirement::MustExistAndRun);
    }
    for service in &inputs.require_service {
        layer.require_service(service.as_str(), RunningRequirement::MustExistAndRun);
    }
    Ok((config, layer))
}

fn plugin_name<D: Discoverer>(discoverer: &D, id: &PluginId) -> String {
    discoverer
        .find_plugin(id)
        .map(|descriptor| descriptor.name.clone())
        .unwrap_or_else(|| "<unknown>".to_string())
}

fn print_issues(issues: &[ResolutionIssue]) {
    for issue in issues {
        let marker = if issue.is_blocking() { "error" } else { "note" };
        println!("  {}: {}", marker, issue);
    }
}

fn list(source: &SourceArgs) -> ignition_core::Result<ExitCode> {
    let catalog = discover(source)?;
    if catalog.is_empty() {
        println!("No plugins found in {}", source.plugins.display());
        return Ok(ExitCode::SUCCESS);
    }
    println!("Plugins in {}:", source.plugins.display());
    for descriptor in catalog.plugins() {
        println!("  - {}", descriptor);
        for service in &descriptor.services {
            println!("      implements {}", service);
        }
        for reference in &descriptor.requires_services {
            println!("      requires service {} ({})", reference.service, reference.requirement);
        }
        for reference in &descriptor.requires_plugins {
            println!(
                "      requires plugin {} ({})",
                plugin_name(&catalog, &reference.plugin),
                reference.requirement
            );
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn build_runner(
    source: &SourceArgs,
    inputs: &InputArgs,
    host: ConsoleHost,
) -> ignition_core::Result<PluginRunner<PluginCatalog, ConsoleHost>> {
    let catalog = discover(source)?;
    let (config, layer) = load_inputs(inputs)?;
    let mut runner = PluginRunner::new(catalog, host, config);
    runner.add_layer(layer);
    Ok(runner)
}

fn plan(source: &SourceArgs, inputs: &InputArgs) -> ignition_core::Result<ExitCode> {
    let runner = build_runner(source, inputs, ConsoleHost::default())?;
    let resolution = runner.resolve();

    println!("Targets:");
    for descriptor in runner.discoverer().plugins() {
        let target = resolution.targets.effective(&descriptor.id);
        println!("  {:<24} {}", descriptor.name, target);
    }
    print_issues(&resolution.issues);
    Ok(ExitCode::SUCCESS)
}

fn apply(source: &SourceArgs, inputs: &InputArgs, fail: &[PluginId]) -> ignition_core::Result<ExitCode> {
    let mut runner = build_runner(source, inputs, ConsoleHost::new(fail.iter().copied()))?;
    let report = runner.apply_report();

    println!("Plugin states:");
    for descriptor in runner.discoverer().plugins() {
        let state = runner.plugin_state(&descriptor.id);
        match (state, runner.failure(&descriptor.id)) {
            (PluginState::Failed, Some(reason)) => println!("  {:<24} {} ({})", descriptor.name, state, reason),
            _ => println!("  {:<24} {}", descriptor.name, state),
        }
    }
    print_issues(&report.issues);

    if report.success {
        println!("Apply succeeded: {} started", report.started.len());
        Ok(ExitCode::SUCCESS)
    } else {
        println!("Apply failed: {} plugin(s) not running", report.unmet.len());
        Ok(ExitCode::FAILURE)
    }
}

fn main() -> ExitCode {
    let args = CliArgs::parse();
    init_logging(args.verbose);
    debug!("{} v{}", APP_NAME, APP_VERSION);

    let result = match &args.command {
        Commands::List { source } => list(source),
        Commands::Plan { source, inputs } => plan(source, inputs),
        Commands::Apply { source, inputs, fail } => apply(source, inputs, fail),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            error!("{}", e);
            eprintln!("Error: {}", e);
            ExitCode::from(2)
        }
    }
}

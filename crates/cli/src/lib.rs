#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![deny(unused_must_use)]

use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use codespan::Files;
use colored::*;
use let_diagnostics::Diag;
use let_resolve::{ModuleId, ModuleRole, Resolution, Resolver, ResolverConfig};
use let_syntax::{LoadedPackage, load_package};
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::EnvFilter;

pub mod check;
pub mod modules;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CliCommand {
    Check {
        packages: Vec<PathBuf>,
        json: bool,
        verbose: bool,
        config: ResolverConfig,
    },
    Modules {
        packages: Vec<PathBuf>,
        from: String,
        package: Option<String>,
        verbose: bool,
        config: ResolverConfig,
    },
    Tests {
        packages: Vec<PathBuf>,
        verbose: bool,
        config: ResolverConfig,
    },
}

impl CliCommand {
    pub fn verbose(&self) -> bool {
        match self {
            CliCommand::Check { verbose, .. }
            | CliCommand::Modules { verbose, .. }
            | CliCommand::Tests { verbose, .. } => *verbose,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "letc", version, about, disable_help_subcommand = true)]
pub struct Args {
    #[command(subcommand)]
    command: Command,

    #[arg(long, global = true, help = "Suffix that marks a test module (default: Test)")]
    test_suffix: Option<String>,

    #[arg(long, global = true, help = "Resolve imports on a single thread")]
    no_parallel: bool,

    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Resolve all packages and report every error
    Check {
        #[arg(required = true, value_name = "PACKAGE_DIR")]
        packages: Vec<PathBuf>,
        #[arg(long, help = "Print a JSON report instead of diagnostics")]
        json: bool,
    },
    /// List the modules visible from one module
    Modules {
        #[arg(required = true, value_name = "PACKAGE_DIR")]
        packages: Vec<PathBuf>,
        #[arg(long, value_name = "MODULE_PATH", help = "Requesting module, e.g. acme.app::Main")]
        from: String,
        #[arg(long, value_name = "NAME", help = "Package of the requesting module")]
        package: Option<String>,
    },
    /// List test pairings and their entry points
    Tests {
        #[arg(required = true, value_name = "PACKAGE_DIR")]
        packages: Vec<PathBuf>,
    },
}

/// Public: parse CLI args into a high-level command.
pub fn parse() -> Result<CliCommand> {
    command_from(Args::parse())
}

/// Parse from an explicit argument list (first item is the program name).
pub fn parse_from<I, T>(args: I) -> Result<CliCommand>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    command_from(Args::try_parse_from(args)?)
}

fn command_from(args: Args) -> Result<CliCommand> {
    let mut config = ResolverConfig::default();
    if let Some(suffix) = args.test_suffix {
        if suffix.is_empty() {
            return Err(anyhow!("--test-suffix must not be empty"));
        }
        config.test_suffix = suffix;
    }
    if args.no_parallel {
        config.parallel = false;
    }
    let verbose = args.verbose;

    Ok(match args.command {
        Command::Check { packages, json } => CliCommand::Check {
            packages,
            json,
            verbose,
            config,
        },
        Command::Modules {
            packages,
            from,
            package,
        } => CliCommand::Modules {
            packages,
            from,
            package,
            verbose,
            config,
        },
        Command::Tests { packages } => CliCommand::Tests {
            packages,
            verbose,
            config,
        },
    })
}

/// Install the `tracing` subscriber. `RUST_LOG` wins over `--verbose`.
pub fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Packages loaded from disk and resolved together.
pub struct Workspace {
    pub files: Files<String>,
    pub packages: Vec<LoadedPackage>,
    pub resolution: Resolution,
}

impl Workspace {
    /// Syntax diagnostics of every loaded file
    pub fn syntax_diagnostics(&self) -> impl Iterator<Item = &Diag> + '_ {
        self.packages.iter().flat_map(|p| p.diagnostics.iter())
    }

    /// Syntax diagnostics followed by resolution diagnostics
    pub fn all_diagnostics(&self) -> Vec<Diag> {
        let mut out: Vec<Diag> = self.syntax_diagnostics().cloned().collect();
        out.extend(self.resolution.diagnostics());
        out
    }

    /// Find a module by `pkg::A::B`, or by `A::B` inside `package`.
    ///
    /// Production modules win; a test module is returned only when no
    /// production module has that path.
    pub fn find_module(&self, path: &str, package: Option<&str>) -> Result<ModuleId> {
        let mut segments: Vec<String> = path
            .split("::")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        let package_name = match package {
            Some(name) => name.to_string(),
            None if segments.len() > 1 => segments.remove(0),
            None => {
                return Err(anyhow!(
                    "module path `{}` needs a package: write `package::{}` or pass --package",
                    path,
                    path
                ));
            }
        };

        let tree = &self.resolution.tree;
        let package_id = tree
            .package_by_name(&package_name)
            .ok_or_else(|| anyhow!("package `{}` is not loaded", package_name))?;

        tree.production_module(package_id, &segments)
            .or_else(|| {
                tree.modules()
                    .find(|m| m.package == package_id && m.role == ModuleRole::Test && m.path == segments)
                    .map(|m| m.id)
            })
            .ok_or_else(|| anyhow!("module `{}` not found in package `{}`", segments.join("::"), package_name))
    }
}

/// Load every package directory and resolve them as one workspace.
pub fn load_workspace(dirs: &[PathBuf], config: &ResolverConfig, verbose: bool) -> Result<Workspace> {
    let mut files = Files::<String>::new();
    let mut packages = Vec::with_capacity(dirs.len());

    for dir in dirs {
        let loaded = load_package(dir, &mut files, config)
            .with_context(|| format!("Failed to load package {}", dir.display()))?;
        if verbose {
            eprintln!(
                "{}",
                format!(
                    "Loaded package {} from {} ({} files)",
                    loaded.manifest.name,
                    dir.display(),
                    loaded.file_count
                )
                .cyan()
            );
        }
        packages.push(loaded);
    }

    let sources: Vec<_> = packages.iter().map(|p| p.source.clone()).collect();
    let resolution = Resolver::new(config.clone()).resolve(&sources);
    debug!(
        packages = packages.len(),
        modules = resolution.tree.module_count(),
        "workspace resolved"
    );
    if verbose {
        eprintln!(
            "{}",
            format!(
                "Resolved {} modules, {} import sites",
                resolution.tree.module_count(),
                resolution.bindings.len()
            )
            .cyan()
        );
    }

    Ok(Workspace {
        files,
        packages,
        resolution,
    })
}

/// Run a parsed command. Returns whether it found errors.
pub fn execute(command: CliCommand) -> Result<bool> {
    match command {
        CliCommand::Check {
            packages,
            json,
            verbose,
            config,
        } => check::run_check(&packages, json, verbose, &config),
        CliCommand::Modules {
            packages,
            from,
            package,
            verbose,
            config,
        } => modules::run_modules(&packages, &from, package.as_deref(), verbose, &config),
        CliCommand::Tests {
            packages,
            verbose,
            config,
        } => test::run_tests(&packages, verbose, &config),
    }
}

//! `letc check`

use anyhow::{Context, Result};
use codespan::Files;
use colored::*;
use let_diagnostics::termcolor::ColorChoice;
use let_diagnostics::{Diag, Reporter, Severity};
use let_resolve::ResolverConfig;
use serde::Serialize;
use std::path::PathBuf;

use crate::{Workspace, load_workspace};

/// Machine-readable result of `letc check --json`
#[derive(Debug, Clone, Serialize)]
pub struct CheckReport {
    pub packages: Vec<PackageSummary>,
    pub bindings: Vec<BindingRecord>,
    pub errors: Vec<DiagnosticRecord>,
    pub warnings: Vec<DiagnosticRecord>,
    pub entry_points: Vec<EntryPointRecord>,
    pub import_cycles: Vec<Vec<String>>,
}

impl CheckReport {
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PackageSummary {
    pub name: String,
    pub root: PathBuf,
    pub files: usize,
    pub dependencies: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BindingRecord {
    pub module: String,
    pub local_name: String,
    /// `package::Module::Path::name` of the concrete declaration
    pub declaration: String,
    pub via: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct DiagnosticRecord {
    pub code: Option<String>,
    pub message: String,
    pub file: Option<String>,
    pub line: Option<usize>,
    pub column: Option<usize>,
    pub notes: Vec<String>,
}

impl DiagnosticRecord {
    pub fn from_diagnostic(files: &Files<String>, diag: &Diag) -> Self {
        let primary = diag.labels.first();
        let location = primary.and_then(|label| files.location(label.file_id, label.range.start as u32).ok());
        Self {
            code: diag.code.clone(),
            message: diag.message.clone(),
            file: primary.map(|label| files.name(label.file_id).to_string_lossy().into_owned()),
            line: location.as_ref().map(|l| l.line.to_usize() + 1),
            column: location.as_ref().map(|l| l.column.to_usize() + 1),
            notes: diag.notes.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct EntryPointRecord {
    pub test_module: String,
    pub production_module: String,
    pub entry_points: Vec<String>,
}

pub fn build_report(workspace: &Workspace) -> CheckReport {
    let resolution = &workspace.resolution;
    let tree = &resolution.tree;
    let qualified = |decl| {
        let decl = tree.declaration(decl);
        format!("{}::{}", tree.display_path(decl.module), decl.name)
    };

    let packages = workspace
        .packages
        .iter()
        .map(|p| PackageSummary {
            name: p.manifest.name.clone(),
            root: p.root.clone(),
            files: p.file_count,
            dependencies: p.manifest.dependencies.clone(),
        })
        .collect();

    let bindings = resolution
        .bindings
        .iter()
        .filter_map(|(site, result)| {
            let binding = result.as_ref().ok()?;
            Some(BindingRecord {
                module: tree.display_path(site.module),
                local_name: binding.local_name.clone(),
                declaration: qualified(binding.decl),
                via: qualified(binding.via),
            })
        })
        .collect();

    let (errors, warnings): (Vec<_>, Vec<_>) = workspace
        .all_diagnostics()
        .iter()
        .map(|diag| (diag.severity, DiagnosticRecord::from_diagnostic(&workspace.files, diag)))
        .partition(|(severity, _)| matches!(severity, Severity::Error | Severity::Bug));

    let entry_points = resolution
        .pairings
        .iter()
        .map(|(test, production)| EntryPointRecord {
            test_module: tree.display_path(test),
            production_module: tree.display_path(production),
            entry_points: resolution
                .entry_points(test)
                .into_iter()
                .map(|decl| tree.declaration(decl).name.clone())
                .collect(),
        })
        .collect();

    let import_cycles = resolution
        .import_cycles()
        .into_iter()
        .map(|cycle| cycle.into_iter().map(|m| tree.display_path(m)).collect())
        .collect();

    CheckReport {
        packages,
        bindings,
        errors: errors.into_iter().map(|(_, record)| record).collect(),
        warnings: warnings.into_iter().map(|(_, record)| record).collect(),
        entry_points,
        import_cycles,
    }
}

/// Returns `true` when any error was found.
pub fn run_check(dirs: &[PathBuf], json: bool, verbose: bool, config: &ResolverConfig) -> Result<bool> {
    let workspace = load_workspace(dirs, config, verbose)?;

    if json {
        let report = build_report(&workspace);
        let text = serde_json::to_string_pretty(&report).context("Failed to serialize check report")?;
        println!("{}", text);
        return Ok(report.has_errors());
    }

    let diagnostics = workspace.all_diagnostics();
    let mut reporter = Reporter::new(ColorChoice::Auto);
    reporter
        .emit_all(&workspace.files, &diagnostics)
        .context("Failed to render diagnostics")?;

    if verbose {
        let cycles = workspace.resolution.import_cycles();
        if !cycles.is_empty() {
            eprintln!(
                "{}",
                format!("{} import cycle(s) (allowed)", cycles.len()).yellow()
            );
        }
    }

    let subject = format!("checked {} package(s)", workspace.packages.len());
    reporter.print_summary(&subject);
    Ok(reporter.tally().has_errors())
}

//! `letc modules`

use anyhow::Result;
use colored::*;
use let_resolve::ResolverConfig;
use std::path::PathBuf;

use crate::{Workspace, load_workspace};

/// Display paths of the modules visible from `from`, in path order.
pub fn visible_from(workspace: &Workspace, from: &str, package: Option<&str>) -> Result<Vec<String>> {
    let requester = workspace.find_module(from, package)?;
    let resolution = &workspace.resolution;
    Ok(resolution
        .visible_modules(requester)
        .into_iter()
        .map(|module| resolution.tree.display_path(module))
        .collect())
}

pub fn run_modules(
    dirs: &[PathBuf],
    from: &str,
    package: Option<&str>,
    verbose: bool,
    config: &ResolverConfig,
) -> Result<bool> {
    let workspace = load_workspace(dirs, config, verbose)?;
    let listed = visible_from(&workspace, from, package)?;

    if verbose {
        let requester = workspace.find_module(from, package)?;
        eprintln!(
            "{}",
            format!(
                "Modules visible from {}: {}",
                workspace.resolution.tree.display_path(requester),
                listed.len()
            )
            .cyan()
        );
    }
    for path in &listed {
        println!("{}", path);
    }
    Ok(false)
}

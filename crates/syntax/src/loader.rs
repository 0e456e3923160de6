//! Package loader
//!
//! Turns a package directory on disk into a [`PackageSource`]:
//!
//! ```text
//! <package>/let.json      optional manifest (name, dependencies, resolver)
//! <package>/src/**.let    production modules
//! <package>/test/**.let   test modules (optional)
//! ```
//!
//! Every source file is registered in the shared `Files` database so that
//! resolver diagnostics can point into it.

use codespan::Files;
use let_diagnostics::Diag;
use let_resolve::{DirectorySource, PackageSource, ResolverConfig};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, trace, warn};
use walkdir::WalkDir;

use crate::outline::read_outline;

pub const MANIFEST_FILE: &str = "let.json";

/// Contents of `let.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackageManifest {
    pub name: String,
    #[serde(default)]
    pub dependencies: Vec<String>,
    /// Per-package layout overrides
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolver: Option<ResolverConfig>,
}

impl PackageManifest {
    /// Manifest assumed for a package directory without `let.json`.
    pub fn implicit(dir: &Path) -> Self {
        let name = dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "package".to_string());
        Self {
            name,
            dependencies: Vec::new(),
            resolver: None,
        }
    }
}

#[derive(Debug)]
pub enum LoadError {
    Io { path: PathBuf, source: io::Error },
    Manifest { path: PathBuf, source: serde_json::Error },
    MissingSourceDir { path: PathBuf },
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadError::Io { path, source } => write!(f, "cannot read {}: {}", path.display(), source),
            LoadError::Manifest { path, source } => {
                write!(f, "invalid manifest {}: {}", path.display(), source)
            }
            LoadError::MissingSourceDir { path } => {
                write!(f, "package source directory {} does not exist", path.display())
            }
        }
    }
}

impl std::error::Error for LoadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LoadError::Io { source, .. } => Some(source),
            LoadError::Manifest { source, .. } => Some(source),
            LoadError::MissingSourceDir { .. } => None,
        }
    }
}

/// A package read from disk
#[derive(Debug, Clone)]
pub struct LoadedPackage {
    pub source: PackageSource,
    pub manifest: PackageManifest,
    pub root: PathBuf,
    /// Syntax diagnostics from the outline reader
    pub diagnostics: Vec<Diag>,
    pub file_count: usize,
}

pub fn read_manifest(dir: &Path) -> Result<PackageManifest, LoadError> {
    let path = dir.join(MANIFEST_FILE);
    if !path.is_file() {
        return Ok(PackageManifest::implicit(dir));
    }
    let text = std::fs::read_to_string(&path).map_err(|source| LoadError::Io {
        path: path.clone(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| LoadError::Manifest { path, source })
}

/// Load one package directory, registering its sources in `files`.
///
/// Layout settings come from the manifest's `resolver` section when present,
/// otherwise from `config`.
pub fn load_package(
    dir: &Path,
    files: &mut Files<String>,
    config: &ResolverConfig,
) -> Result<LoadedPackage, LoadError> {
    let manifest = read_manifest(dir)?;
    let layout = manifest.resolver.as_ref().unwrap_or(config);

    let source_dir = dir.join(&layout.source_dir);
    if !source_dir.is_dir() {
        return Err(LoadError::MissingSourceDir { path: source_dir });
    }

    let mut diagnostics = Vec::new();
    let mut file_count = 0;
    let source_root = load_root(&source_dir, layout, files, &mut diagnostics, &mut file_count)?;

    let test_dir = dir.join(&layout.test_dir);
    let test_root = if test_dir.is_dir() {
        Some(load_root(&test_dir, layout, files, &mut diagnostics, &mut file_count)?)
    } else {
        None
    };

    let mut source = PackageSource::new(manifest.name.clone(), source_root);
    source.dependencies = manifest.dependencies.clone();
    source.test_root = test_root;

    debug!(
        package = %manifest.name,
        files = file_count,
        syntax_errors = diagnostics.iter().filter(|d| let_diagnostics::is_error(d)).count(),
        "package loaded"
    );

    Ok(LoadedPackage {
        source,
        manifest,
        root: dir.to_path_buf(),
        diagnostics,
        file_count,
    })
}

/// Load several package directories in order.
pub fn load_packages<P: AsRef<Path>>(
    dirs: &[P],
    files: &mut Files<String>,
    config: &ResolverConfig,
) -> Result<Vec<LoadedPackage>, LoadError> {
    dirs.iter()
        .map(|dir| load_package(dir.as_ref(), files, config))
        .collect()
}

fn load_root(
    root: &Path,
    layout: &ResolverConfig,
    files: &mut Files<String>,
    diagnostics: &mut Vec<Diag>,
    file_count: &mut usize,
) -> Result<DirectorySource, LoadError> {
    let root_name = root
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let mut tree = DirectorySource::new(root_name);

    for entry in WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !e.file_name().to_string_lossy().starts_with('.'))
    {
        let entry = entry.map_err(|err| LoadError::Io {
            path: err.path().map(Path::to_path_buf).unwrap_or_else(|| root.to_path_buf()),
            source: err.into(),
        })?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let matches_extension = path
            .extension()
            .is_some_and(|ext| ext.to_string_lossy() == layout.extension.as_str());
        if !matches_extension {
            trace!(path = %path.display(), "skipping non-source file");
            continue;
        }
        let Some(module_name) = path.file_stem().map(|s| s.to_string_lossy().into_owned()) else {
            continue;
        };
        if module_name.is_empty() {
            warn!(path = %path.display(), "source file without a module name ignored");
            continue;
        }

        let text = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let file_id = files.add(path.display().to_string(), text);
        let outline = read_outline(files, file_id, &module_name);
        diagnostics.extend(outline.diagnostics);
        *file_count += 1;

        let relative = path.strip_prefix(root).unwrap_or(path);
        let components: Vec<String> = relative
            .parent()
            .map(|parent| {
                parent
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy().into_owned())
                    .collect()
            })
            .unwrap_or_default();
        directory_at(&mut tree, &components).files.push(outline.file);
    }

    Ok(tree)
}

/// Nested directory under `root`, created on first use.
fn directory_at<'d>(root: &'d mut DirectorySource, components: &[String]) -> &'d mut DirectorySource {
    let mut dir = root;
    for component in components {
        let index = match dir.directories.iter().position(|d| &d.name == component) {
            Some(index) => index,
            None => {
                dir.directories.push(DirectorySource::new(component.clone()));
                dir.directories.len() - 1
            }
        };
        dir = &mut dir.directories[index];
    }
    dir
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write(root: &Path, relative: &str, contents: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    #[test]
    fn test_missing_manifest_uses_directory_name() {
        let tmp = tempfile::tempdir().unwrap();
        let pkg = tmp.path().join("acme.text");
        write(&pkg, "src/StringUtils.let", "public fun trim(): String = \"\"");

        let mut files = Files::new();
        let loaded = load_package(&pkg, &mut files, &ResolverConfig::default()).unwrap();
        assert_eq!(loaded.manifest.name, "acme.text");
        assert!(loaded.source.dependencies.is_empty());
        assert!(loaded.source.test_root.is_none());
        assert_eq!(loaded.source.source_root.files[0].name, "StringUtils");
        assert_eq!(loaded.file_count, 1);
    }

    #[test]
    fn test_nested_directories_and_filters() {
        let tmp = tempfile::tempdir().unwrap();
        let pkg = tmp.path();
        write(pkg, "let.json", r#"{ "name": "acme.collections", "dependencies": ["acme.core"] }"#);
        write(pkg, "src/Iterables/List/List.let", "public fun size(): Int = 0");
        write(pkg, "src/Iterables/List/Partition.let", "internal fun partition(): Int = 0");
        write(pkg, "src/Iterables/List/notes.txt", "not a module");
        write(pkg, "src/.cache/Hidden.let", "public fun hidden(): Int = 0");
        write(pkg, "test/Iterables/List/PartitionTest.let", "public fun splits(): Unit = {}");

        let mut files = Files::new();
        let loaded = load_package(pkg, &mut files, &ResolverConfig::default()).unwrap();
        assert_eq!(loaded.source.name, "acme.collections");
        assert_eq!(loaded.source.dependencies, vec!["acme.core"]);
        assert_eq!(loaded.file_count, 3);

        let root = &loaded.source.source_root;
        assert_eq!(root.directories.len(), 1);
        let list = &root.directories[0].directories[0];
        assert_eq!(list.name, "List");
        let names: Vec<&str> = list.files.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["List", "Partition"]);

        let tests = loaded.source.test_root.as_ref().unwrap();
        assert_eq!(tests.directories[0].directories[0].files[0].name, "PartitionTest");
    }

    #[test]
    fn test_manifest_overrides_layout() {
        let tmp = tempfile::tempdir().unwrap();
        let pkg = tmp.path();
        write(
            pkg,
            "let.json",
            r#"{ "name": "acme.alt", "resolver": { "source_dir": "lib", "extension": "lt" } }"#,
        );
        write(pkg, "lib/Main.lt", "export fun main(): Unit = {}");

        let mut files = Files::new();
        let loaded = load_package(pkg, &mut files, &ResolverConfig::default()).unwrap();
        assert_eq!(loaded.source.source_root.files[0].name, "Main");
    }

    #[test]
    fn test_missing_source_dir_and_bad_manifest() {
        let tmp = tempfile::tempdir().unwrap();
        let mut files = Files::new();
        let err = load_package(tmp.path(), &mut files, &ResolverConfig::default()).unwrap_err();
        assert!(matches!(err, LoadError::MissingSourceDir { .. }));

        write(tmp.path(), "let.json", "{ \"dependencies\": [] }");
        let err = load_package(tmp.path(), &mut files, &ResolverConfig::default()).unwrap_err();
        assert!(matches!(err, LoadError::Manifest { .. }));
        assert!(err.to_string().contains("let.json"));
    }

    #[test]
    fn test_syntax_errors_are_collected() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "src/Broken.let", "import { from X;");

        let mut files = Files::new();
        let loaded = load_package(tmp.path(), &mut files, &ResolverConfig::default()).unwrap();
        assert_eq!(loaded.diagnostics.len(), 1);
        assert_eq!(loaded.diagnostics[0].code.as_deref(), Some("E0001"));
    }
}

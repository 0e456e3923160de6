//! Module tree for Let packages
//!
//! The tree is built once from the layout records and never mutated after
//! [`TreeBuilder::finish`]. Directories, modules and declarations live in
//! arena vectors indexed by their ids; names only appear in the per-directory
//! and per-module maps.
//!
//! A directory `D` that contains a file named `D` is *folded*: that file's
//! module takes the directory's qualified path and is recorded in
//! [`Directory::folded_by`] instead of the plain module listing. Package roots
//! never fold.

use codespan::{FileId, Span};
use indexmap::IndexMap;
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

use crate::errors::{ResolveError, ResolveErrorKind};
use crate::ids::{DeclId, DirId, ModuleId, PackageId};
use crate::layout::{DeclKind, DirectorySource, FileSource, ImportPath, ImportStatement, PackageSource};
use crate::visibility::Visibility;

/// Which root a directory or module hangs off
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RootKind {
    Source,
    Test,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModuleRole {
    Production,
    Test,
}

impl From<RootKind> for ModuleRole {
    fn from(root: RootKind) -> Self {
        match root {
            RootKind::Source => ModuleRole::Production,
            RootKind::Test => ModuleRole::Test,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Package {
    pub id: PackageId,
    pub name: String,
    pub dependencies: Vec<String>,
    pub source_root: DirId,
    pub test_root: Option<DirId>,
}

impl Package {
    pub fn root(&self, kind: RootKind) -> Option<DirId> {
        match kind {
            RootKind::Source => Some(self.source_root),
            RootKind::Test => self.test_root,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Directory {
    pub id: DirId,
    pub name: String,
    pub parent: Option<DirId>,
    pub package: PackageId,
    pub root: RootKind,
    /// Segments from the package root; empty for the roots themselves
    pub path: Vec<String>,
    /// Plain (non-folding) modules by simple name
    pub modules: IndexMap<String, ModuleId>,
    pub directories: IndexMap<String, DirId>,
    pub folded_by: Option<ModuleId>,
}

#[derive(Debug, Clone)]
pub struct Module {
    pub id: ModuleId,
    pub name: String,
    pub path: Vec<String>,
    /// Directory the file physically lives in
    pub directory: DirId,
    pub package: PackageId,
    pub role: ModuleRole,
    pub declarations: IndexMap<String, DeclId>,
    pub imports: Vec<ImportStatement>,
    /// Set when this module folds its directory
    pub folds: Option<DirId>,
    pub file_id: Option<FileId>,
}

impl Module {
    pub fn qualified_path(&self) -> String {
        self.path.join("::")
    }
}

#[derive(Debug, Clone)]
pub struct Declaration {
    pub id: DeclId,
    pub name: String,
    pub visibility: Visibility,
    pub kind: DeclKind,
    pub module: ModuleId,
    pub reexport: Option<ImportPath>,
    pub span: Option<Span>,
}

impl Declaration {
    pub fn is_reexport(&self) -> bool {
        self.kind == DeclKind::Reexport
    }
}

#[derive(Debug, Default)]
pub struct ModuleTree {
    packages: Vec<Package>,
    package_names: HashMap<String, PackageId>,
    dirs: Vec<Directory>,
    modules: Vec<Module>,
    decls: Vec<Declaration>,
    /// Production modules by (package, qualified path)
    production_paths: HashMap<(PackageId, Vec<String>), ModuleId>,
}

impl ModuleTree {
    pub fn package(&self, id: PackageId) -> &Package {
        &self.packages[id.index()]
    }

    pub fn packages(&self) -> impl Iterator<Item = &Package> {
        self.packages.iter()
    }

    pub fn package_by_name(&self, name: &str) -> Option<PackageId> {
        self.package_names.get(name).copied()
    }

    pub fn directory(&self, id: DirId) -> &Directory {
        &self.dirs[id.index()]
    }

    pub fn module(&self, id: ModuleId) -> &Module {
        &self.modules[id.index()]
    }

    pub fn modules(&self) -> impl Iterator<Item = &Module> {
        self.modules.iter()
    }

    pub fn module_count(&self) -> usize {
        self.modules.len()
    }

    pub fn declaration(&self, id: DeclId) -> &Declaration {
        &self.decls[id.index()]
    }

    pub fn declaration_count(&self) -> usize {
        self.decls.len()
    }

    pub fn declarations_of(&self, module: ModuleId) -> impl Iterator<Item = &Declaration> {
        self.module(module)
            .declarations
            .values()
            .map(|id| self.declaration(*id))
    }

    pub fn find_declaration(&self, module: ModuleId, name: &str) -> Option<DeclId> {
        self.module(module).declarations.get(name).copied()
    }

    /// `package::Qualified::Path`, for messages
    pub fn display_path(&self, module: ModuleId) -> String {
        let module = self.module(module);
        let prefix = match module.role {
            ModuleRole::Production => self.package(module.package).name.clone(),
            ModuleRole::Test => format!("{}[test]", self.package(module.package).name),
        };
        format!("{}::{}", prefix, module.qualified_path())
    }

    pub fn production_module(&self, package: PackageId, path: &[String]) -> Option<ModuleId> {
        self.production_paths
            .get(&(package, path.to_vec()))
            .copied()
    }

    /// `dir == ancestor` or `dir` lies somewhere below `ancestor`
    pub fn is_within(&self, dir: DirId, ancestor: DirId) -> bool {
        let mut current = Some(dir);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.directory(id).parent;
        }
        false
    }

    /// The module that answers for a subdirectory from outside it, if any
    pub fn representative(&self, dir: DirId) -> Option<ModuleId> {
        self.directory(dir).folded_by
    }

    /// Every directory of every package, children before their parent.
    pub fn post_order_dirs(&self) -> Vec<DirId> {
        fn visit(tree: &ModuleTree, dir: DirId, out: &mut Vec<DirId>) {
            for child in tree.directory(dir).directories.values() {
                visit(tree, *child, out);
            }
            out.push(dir);
        }

        let mut out = Vec::with_capacity(self.dirs.len());
        for package in &self.packages {
            visit(self, package.source_root, &mut out);
            if let Some(test_root) = package.test_root {
                visit(self, test_root, &mut out);
            }
        }
        out
    }

    /// Modules of a directory in listing order, folding module last.
    pub fn modules_in(&self, dir: DirId) -> impl Iterator<Item = ModuleId> + '_ {
        let dir = self.directory(dir);
        dir.modules.values().copied().chain(dir.folded_by)
    }
}

/// Builds a [`ModuleTree`] one package at a time.
///
/// Layout problems that make a package's shape ambiguous drop that package
/// entirely; every other package still lands in the tree.
#[derive(Default)]
pub struct TreeBuilder {
    tree: ModuleTree,
    errors: Vec<ResolveError>,
}

impl TreeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one package. Returns `None` when a fatal layout error dropped it.
    pub fn add_package(&mut self, source: &PackageSource) -> Option<PackageId> {
        if self.tree.package_names.contains_key(&source.name) {
            warn!(package = %source.name, "duplicate package dropped");
            self.errors
                .push(ResolveError::new(ResolveErrorKind::DuplicatePackage {
                    name: source.name.clone(),
                }));
            return None;
        }

        let mut layout_errors = Vec::new();
        check_layout(&source.source_root, &[], true, &mut layout_errors);
        if let Some(test_root) = &source.test_root {
            check_layout(test_root, &[], true, &mut layout_errors);
        }
        if !layout_errors.is_empty() {
            warn!(
                package = %source.name,
                errors = layout_errors.len(),
                "package dropped because of layout errors"
            );
            self.errors.extend(layout_errors);
            return None;
        }

        let id = PackageId::from_index(self.tree.packages.len());
        let source_root = self.insert_dir(&source.source_root, None, id, RootKind::Source, Vec::new());
        let test_root = source
            .test_root
            .as_ref()
            .map(|root| self.insert_dir(root, None, id, RootKind::Test, Vec::new()));

        self.tree.packages.push(Package {
            id,
            name: source.name.clone(),
            dependencies: source.dependencies.clone(),
            source_root,
            test_root,
        });
        self.tree.package_names.insert(source.name.clone(), id);

        debug!(package = %source.name, %id, "package added to module tree");
        Some(id)
    }

    pub fn finish(mut self) -> (ModuleTree, Vec<ResolveError>) {
        for package in &self.tree.packages {
            for dependency in &package.dependencies {
                if !self.tree.package_names.contains_key(dependency) {
                    self.errors
                        .push(ResolveError::new(ResolveErrorKind::UnknownPackage {
                            name: dependency.clone(),
                            dependent: package.name.clone(),
                        }));
                }
            }
        }
        debug!(
            packages = self.tree.packages.len(),
            modules = self.tree.modules.len(),
            declarations = self.tree.decls.len(),
            "module tree built"
        );
        (self.tree, self.errors)
    }

    fn insert_dir(
        &mut self,
        source: &DirectorySource,
        parent: Option<DirId>,
        package: PackageId,
        root: RootKind,
        path: Vec<String>,
    ) -> DirId {
        let id = DirId::from_index(self.tree.dirs.len());
        self.tree.dirs.push(Directory {
            id,
            name: source.name.clone(),
            parent,
            package,
            root,
            path: path.clone(),
            modules: IndexMap::new(),
            directories: IndexMap::new(),
            folded_by: None,
        });

        for file in &source.files {
            let folds = parent.is_some() && file.name == source.name;
            let module_path = if folds {
                path.clone()
            } else {
                child_path(&path, &file.name)
            };
            let module = self.insert_module(file, id, package, root, module_path, folds.then_some(id));
            if folds {
                debug!(directory = %path.join("::"), %module, "directory folded");
                self.tree.dirs[id.index()].folded_by = Some(module);
            } else {
                self.tree.dirs[id.index()]
                    .modules
                    .insert(file.name.clone(), module);
            }
        }

        for child in &source.directories {
            let child_id = self.insert_dir(child, Some(id), package, root, child_path(&path, &child.name));
            self.tree.dirs[id.index()]
                .directories
                .insert(child.name.clone(), child_id);
        }

        id
    }

    fn insert_module(
        &mut self,
        file: &FileSource,
        directory: DirId,
        package: PackageId,
        root: RootKind,
        path: Vec<String>,
        folds: Option<DirId>,
    ) -> ModuleId {
        let id = ModuleId::from_index(self.tree.modules.len());
        let mut declarations = IndexMap::new();

        for record in &file.declarations {
            if declarations.contains_key(&record.name) {
                let mut error = ResolveError::new(ResolveErrorKind::DuplicateDeclaration {
                    name: record.name.clone(),
                    module_path: path.join("::"),
                });
                if let Some(span) = record.span {
                    error = error.with_span(span);
                }
                if let Some(file_id) = file.file_id {
                    error = error.with_file(file_id);
                }
                self.errors.push(error);
                continue;
            }

            let decl = DeclId::from_index(self.tree.decls.len());
            self.tree.decls.push(Declaration {
                id: decl,
                name: record.name.clone(),
                visibility: record.visibility,
                kind: record.kind,
                module: id,
                reexport: record.reexport.clone(),
                span: record.span,
            });
            declarations.insert(record.name.clone(), decl);
        }

        if root == RootKind::Source {
            self.tree.production_paths.insert((package, path.clone()), id);
        }

        self.tree.modules.push(Module {
            id,
            name: file.name.clone(),
            path,
            directory,
            package,
            role: root.into(),
            declarations,
            imports: file.imports.clone(),
            folds,
            file_id: file.file_id,
        });
        id
    }
}

fn child_path(parent: &[String], name: &str) -> Vec<String> {
    let mut path = parent.to_vec();
    path.push(name.to_string());
    path
}

/// Collect fold and duplicate-module errors for one directory subtree.
fn check_layout(
    dir: &DirectorySource,
    parent_path: &[String],
    is_root: bool,
    errors: &mut Vec<ResolveError>,
) {
    let path = if is_root {
        parent_path.to_vec()
    } else {
        child_path(parent_path, &dir.name)
    };
    let display = path.join("::");

    let fold_candidates: Vec<&FileSource> = if is_root {
        Vec::new()
    } else {
        dir.files.iter().filter(|file| file.name == dir.name).collect()
    };
    if fold_candidates.len() > 1 {
        let mut error = ResolveError::new(ResolveErrorKind::AmbiguousFold {
            directory: display.clone(),
            candidates: fold_candidates.len(),
        });
        if let Some(file_id) = fold_candidates[1].file_id {
            error = error.with_file(file_id);
        }
        errors.push(error);
    }

    let mut seen = HashSet::new();
    for file in &dir.files {
        if !is_root && file.name == dir.name {
            continue;
        }
        if !seen.insert(file.name.as_str()) {
            let mut error = ResolveError::new(ResolveErrorKind::DuplicateModule {
                module_path: child_path(&path, &file.name).join("::"),
            });
            if let Some(file_id) = file.file_id {
                error = error.with_file(file_id);
            }
            errors.push(error);
        }
    }

    let mut seen_dirs = HashSet::new();
    for child in &dir.directories {
        let child_folded = child.files.iter().any(|file| file.name == child.name);
        if !seen_dirs.insert(child.name.as_str()) || (child_folded && seen.contains(child.name.as_str())) {
            errors.push(ResolveError::new(ResolveErrorKind::DuplicateModule {
                module_path: child_path(&path, &child.name).join("::"),
            }));
        }
        check_layout(child, &path, false, errors);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{DirectorySource, FileSource};

    fn iterables() -> PackageSource {
        PackageSource::new(
            "acme.collections",
            DirectorySource::new("src").with_dir(
                DirectorySource::new("Iterables")
                    .with_dir(
                        DirectorySource::new("List")
                            .with_file(FileSource::new("List").function("size", Visibility::Public))
                            .with_file(
                                FileSource::new("Partition").function("partition", Visibility::Internal),
                            ),
                    )
                    .with_dir(
                        DirectorySource::new("Set")
                            .with_file(FileSource::new("SetHelpers").function("union", Visibility::Public)),
                    ),
            ),
        )
    }

    fn build(sources: &[PackageSource]) -> (ModuleTree, Vec<ResolveError>) {
        let mut builder = TreeBuilder::new();
        for source in sources {
            builder.add_package(source);
        }
        builder.finish()
    }

    fn path(segments: &[&str]) -> Vec<String> {
        segments.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_folding_takes_directory_path() {
        let (tree, errors) = build(&[iterables()]);
        assert!(errors.is_empty());

        let pkg = tree.package_by_name("acme.collections").unwrap();
        let list = tree.production_module(pkg, &path(&["Iterables", "List"])).unwrap();
        let partition = tree
            .production_module(pkg, &path(&["Iterables", "List", "Partition"]))
            .unwrap();

        let list_module = tree.module(list);
        assert!(list_module.folds.is_some());
        assert_eq!(tree.directory(list_module.directory).folded_by, Some(list));
        assert!(!tree.directory(list_module.directory).modules.contains_key("List"));
        assert_eq!(tree.module(partition).directory, list_module.directory);
    }

    #[test]
    fn test_roots_never_fold() {
        let source = PackageSource::new(
            "solo",
            DirectorySource::new("src").with_file(FileSource::new("src")),
        );
        let (tree, errors) = build(&[source]);
        assert!(errors.is_empty());
        let pkg = tree.package_by_name("solo").unwrap();
        assert!(tree.production_module(pkg, &path(&["src"])).is_some());
        assert_eq!(tree.directory(tree.package(pkg).source_root).folded_by, None);
    }

    #[test]
    fn test_ambiguous_fold_drops_package() {
        let broken = PackageSource::new(
            "broken",
            DirectorySource::new("src").with_dir(
                DirectorySource::new("List")
                    .with_file(FileSource::new("List"))
                    .with_file(FileSource::new("List")),
            ),
        );
        let (tree, errors) = build(&[broken, iterables()]);

        assert!(tree.package_by_name("broken").is_none());
        assert!(tree.package_by_name("acme.collections").is_some());
        assert_eq!(errors.len(), 1);
        assert!(matches!(errors[0].kind, ResolveErrorKind::AmbiguousFold { candidates: 2, .. }));
    }

    #[test]
    fn test_module_shadowing_folded_directory() {
        let source = PackageSource::new(
            "clash",
            DirectorySource::new("src")
                .with_file(FileSource::new("List"))
                .with_dir(DirectorySource::new("List").with_file(FileSource::new("List"))),
        );
        let (tree, errors) = build(&[source]);
        assert!(tree.package_by_name("clash").is_none());
        assert!(matches!(errors[0].kind, ResolveErrorKind::DuplicateModule { .. }));
    }

    #[test]
    fn test_duplicate_declaration_keeps_first() {
        let source = PackageSource::new(
            "dups",
            DirectorySource::new("src").with_file(
                FileSource::new("Strings")
                    .function("trim", Visibility::Public)
                    .function("trim", Visibility::Private),
            ),
        );
        let (tree, errors) = build(&[source]);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].code(), "E0108");

        let pkg = tree.package_by_name("dups").unwrap();
        let strings = tree.production_module(pkg, &path(&["Strings"])).unwrap();
        let trim = tree.find_declaration(strings, "trim").unwrap();
        assert_eq!(tree.declaration(trim).visibility, Visibility::Public);
    }

    #[test]
    fn test_duplicate_and_unknown_packages() {
        let (tree, errors) = build(&[
            iterables().with_dependency("acme.missing"),
            iterables(),
        ]);
        assert_eq!(tree.packages().count(), 1);
        let codes: Vec<_> = errors.iter().map(|e| e.code()).collect();
        assert_eq!(codes, vec!["E0112", "E0113"]);
    }

    #[test]
    fn test_post_order_and_ancestry() {
        let (tree, _) = build(&[iterables()]);
        let order = tree.post_order_dirs();
        let names: Vec<_> = order.iter().map(|d| tree.directory(*d).name.as_str()).collect();
        assert_eq!(names, vec!["List", "Set", "Iterables", "src"]);

        let list = order[0];
        let iterables = order[2];
        assert!(tree.is_within(list, iterables));
        assert!(tree.is_within(list, list));
        assert!(!tree.is_within(iterables, list));
    }
}

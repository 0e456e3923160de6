//! Module path lookup
//!
//! Turns the path of an import statement or a re-export into the module it
//! names, as seen from the importing module:
//!
//! - a single segment is a *short-form* path and only reaches modules in the
//!   importer's directory or below it (folded subdirectories count under their
//!   directory name)
//! - two or more segments form a *full* path, rooted at the package root or,
//!   when the first segment is a dependency's identifier, at that package's
//!   root
//!
//! Folding is applied at every step: the last segment may name a plain module
//! or a directory with a folding module.

use indexmap::IndexSet;

use crate::errors::{PathHint, ResolveError};
use crate::ids::{DirId, ModuleId, PackageId};
use crate::layout::ImportPath;
use crate::registry::PackageRegistry;
use crate::test_binder::TestPairings;
use crate::tree::{ModuleRole, ModuleTree};

/// Why a walk from one root stopped
#[derive(Debug, Clone)]
struct WalkFailure {
    missing: String,
    hint: Option<PathHint>,
}

impl WalkFailure {
    fn missing(segment: &str) -> Self {
        Self {
            missing: segment.to_string(),
            hint: None,
        }
    }
}

#[derive(Clone, Copy)]
pub struct PathLocator<'r> {
    tree: &'r ModuleTree,
    registry: &'r dyn PackageRegistry,
    pairings: &'r TestPairings,
}

impl<'r> PathLocator<'r> {
    pub fn new(
        tree: &'r ModuleTree,
        registry: &'r dyn PackageRegistry,
        pairings: &'r TestPairings,
    ) -> Self {
        Self {
            tree,
            registry,
            pairings,
        }
    }

    /// Find the module `path` names from `from`. The error carries no span.
    pub fn locate(&self, path: &ImportPath, from: ModuleId) -> Result<ModuleId, ResolveError> {
        match path.segments.as_slice() {
            [] => Err(ResolveError::path_not_found(path.to_string(), "", None)),
            [name] => self.locate_short(name, from),
            _ => self.locate_full(path, from),
        }
    }

    fn locate_short(&self, name: &str, from: ModuleId) -> Result<ModuleId, ResolveError> {
        let module = self.tree.module(from);
        let mut anchors = vec![module.directory];
        if let Some(production) = self.pairings.production_of(from) {
            anchors.push(self.tree.module(production).directory);
        }

        let mut found = IndexSet::new();
        for anchor in anchors {
            let dir = self.tree.directory(anchor);
            if dir.name == name
                && let Some(fold) = dir.folded_by
            {
                found.insert(fold);
            }
            self.collect_below(anchor, name, &mut found);
        }

        match found.len() {
            1 => Ok(found[0]),
            0 => {
                let candidates = self
                    .tree
                    .modules()
                    .filter(|m| m.package == module.package && m.role == ModuleRole::Production && m.name == name)
                    .map(|m| m.qualified_path())
                    .collect();
                Err(ResolveError::not_in_scope(name, self.tree.display_path(from), candidates))
            }
            _ => Err(ResolveError::not_in_scope(
                name,
                self.tree.display_path(from),
                found.iter().map(|m| self.tree.module(*m).qualified_path()).collect(),
            )),
        }
    }

    fn collect_below(&self, dir: DirId, name: &str, found: &mut IndexSet<ModuleId>) {
        let dir = self.tree.directory(dir);
        if let Some(module) = dir.modules.get(name) {
            found.insert(*module);
        }
        for (child_name, child) in &dir.directories {
            if child_name == name
                && let Some(fold) = self.tree.representative(*child)
            {
                found.insert(fold);
            }
            self.collect_below(*child, name, found);
        }
    }

    fn locate_full(&self, path: &ImportPath, from: ModuleId) -> Result<ModuleId, ResolveError> {
        let module = self.tree.module(from);
        let segments = &path.segments;

        let own_failure = match self.walk_own(from, segments) {
            Ok(target) => return Ok(target),
            Err(failure) => failure,
        };

        if let Some(dependency) = self.registry.lookup(&segments[0])
            && dependency != module.package
        {
            if !self.registry.depends_on(module.package, dependency) {
                return Err(ResolveError::path_not_found(
                    path.to_string(),
                    segments[0].clone(),
                    Some(PathHint::NotADependency {
                        package: segments[0].clone(),
                    }),
                ));
            }
            let root = self.tree.package(dependency).source_root;
            return self
                .walk(root, &segments[1..])
                .map_err(|failure| self.failure(path, &segments[1..], failure, dependency));
        }

        Err(self.failure(path, segments, own_failure, module.package))
    }

    /// Walk from the importer's own roots; test modules see the test root first.
    fn walk_own(&self, from: ModuleId, segments: &[String]) -> Result<ModuleId, WalkFailure> {
        let module = self.tree.module(from);
        let package = self.tree.package(module.package);
        let mut roots = Vec::with_capacity(2);
        if module.role == ModuleRole::Test
            && let Some(test_root) = package.test_root
        {
            roots.push(test_root);
        }
        roots.push(package.source_root);

        let mut first_failure = None;
        for root in roots {
            match self.walk(root, segments) {
                Ok(target) => return Ok(target),
                Err(failure) => {
                    first_failure.get_or_insert(failure);
                }
            }
        }
        Err(first_failure.unwrap_or_else(|| WalkFailure::missing("")))
    }

    fn walk(&self, root: DirId, segments: &[String]) -> Result<ModuleId, WalkFailure> {
        let Some((last, directories)) = segments.split_last() else {
            return Err(WalkFailure::missing(""));
        };

        let mut dir = root;
        for segment in directories {
            dir = *self
                .tree
                .directory(dir)
                .directories
                .get(segment)
                .ok_or_else(|| WalkFailure::missing(segment))?;
        }

        let dir = self.tree.directory(dir);
        if let Some(module) = dir.modules.get(last) {
            return Ok(*module);
        }
        match dir.directories.get(last) {
            Some(child) => self.tree.representative(*child).ok_or_else(|| WalkFailure {
                missing: last.clone(),
                hint: Some(PathHint::NotFolded {
                    directory: self.tree.directory(*child).path.join("::"),
                }),
            }),
            None => Err(WalkFailure::missing(last)),
        }
    }

    fn failure(
        &self,
        path: &ImportPath,
        segments: &[String],
        failure: WalkFailure,
        package: PackageId,
    ) -> ResolveError {
        let hint = failure.hint.or_else(|| {
            self.suggest(package, segments)
                .map(PathHint::DidYouMean)
        });
        ResolveError::path_not_found(path.to_string(), failure.missing, hint)
    }

    /// The one production module whose path ends with `segments`, if unique
    fn suggest(&self, package: PackageId, segments: &[String]) -> Option<String> {
        let mut matches = self.tree.modules().filter(|m| {
            m.package == package
                && m.role == ModuleRole::Production
                && m.path.len() > segments.len()
                && m.path.ends_with(segments)
        });
        let first = matches.next()?;
        if matches.next().is_some() {
            return None;
        }
        Some(first.qualified_path())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ResolveErrorKind;
    use crate::layout::{DirectorySource, FileSource, PackageSource};
    use crate::registry::DependencyMap;
    use crate::tree::TreeBuilder;

    /// acme.collections/src/
    ///   Top
    ///   Iterables/
    ///     List/{List, Partition}
    ///     Set/{SetHelpers}
    ///     Bag/{Counter}
    ///   Root
    fn packages() -> Vec<PackageSource> {
        let collections = PackageSource::new(
            "acme.collections",
            DirectorySource::new("src")
                .with_file(FileSource::new("Root"))
                .with_file(FileSource::new("Top"))
                .with_dir(
                    DirectorySource::new("Iterables")
                        .with_dir(
                            DirectorySource::new("List")
                                .with_file(FileSource::new("List"))
                                .with_file(FileSource::new("Partition")),
                        )
                        .with_dir(DirectorySource::new("Set").with_file(FileSource::new("SetHelpers")))
                        .with_dir(DirectorySource::new("Bag").with_file(FileSource::new("Counter"))),
                ),
        );
        let app = PackageSource::new("acme.app", DirectorySource::new("src").with_file(FileSource::new("Main")))
            .with_dependency("acme.collections");
        let other = PackageSource::new("acme.other", DirectorySource::new("src").with_file(FileSource::new("Tool")));
        vec![collections, app, other]
    }

    struct Fixture {
        tree: ModuleTree,
        registry: DependencyMap,
        pairings: TestPairings,
    }

    impl Fixture {
        fn new() -> Self {
            let mut builder = TreeBuilder::new();
            for source in packages() {
                builder.add_package(&source);
            }
            let (tree, _) = builder.finish();
            let registry = DependencyMap::from_tree(&tree);
            Self {
                tree,
                registry,
                pairings: TestPairings::default(),
            }
        }

        fn locator(&self) -> PathLocator<'_> {
            PathLocator::new(&self.tree, &self.registry, &self.pairings)
        }

        fn module(&self, package: &str, path: &str) -> ModuleId {
            let pkg = self.tree.package_by_name(package).unwrap();
            self.tree
                .production_module(pkg, &ImportPath::parse(path).segments)
                .unwrap()
        }

        fn locate(&self, path: &str, from: ModuleId) -> Result<ModuleId, ResolveError> {
            self.locator().locate(&ImportPath::parse(path), from)
        }
    }

    #[test]
    fn test_short_form_reaches_siblings_and_below() {
        let fx = Fixture::new();
        let list = fx.module("acme.collections", "Iterables::List");
        let partition = fx.module("acme.collections", "Iterables::List::Partition");

        assert_eq!(fx.locate("Partition", list).unwrap(), partition);
        assert_eq!(fx.locate("List", partition).unwrap(), list);
    }

    #[test]
    fn test_short_form_outside_subtree_is_not_in_scope() {
        let fx = Fixture::new();
        let helpers = fx.module("acme.collections", "Iterables::Set::SetHelpers");

        let error = fx.locate("Partition", helpers).unwrap_err();
        match error.kind {
            ResolveErrorKind::NotInScope { candidates, .. } => {
                assert_eq!(candidates, vec!["Iterables::List::Partition"]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_short_form_reaches_deeply_nested_module() {
        let fx = Fixture::new();
        let top = fx.module("acme.collections", "Top");
        let partition = fx.module("acme.collections", "Iterables::List::Partition");
        let helpers = fx.module("acme.collections", "Iterables::Set::SetHelpers");

        assert_eq!(fx.locate("Partition", top).unwrap(), partition);
        assert_eq!(fx.locate("SetHelpers", top).unwrap(), helpers);
    }

    #[test]
    fn test_short_form_does_not_reach_package_root() {
        let fx = Fixture::new();
        let helpers = fx.module("acme.collections", "Iterables::Set::SetHelpers");

        let error = fx.locate("Root", helpers).unwrap_err();
        assert_eq!(error.code(), "E0101");
        match error.kind {
            ResolveErrorKind::NotInScope { candidates, .. } => assert_eq!(candidates, vec!["Root"]),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_full_path_with_folding() {
        let fx = Fixture::new();
        let helpers = fx.module("acme.collections", "Iterables::Set::SetHelpers");
        let partition = fx.module("acme.collections", "Iterables::List::Partition");
        let list = fx.module("acme.collections", "Iterables::List");

        assert_eq!(fx.locate("Iterables::List::Partition", helpers).unwrap(), partition);
        assert_eq!(fx.locate("Iterables::List", helpers).unwrap(), list);
    }

    #[test]
    fn test_ancestor_relative_path_is_rejected() {
        let fx = Fixture::new();
        let helpers = fx.module("acme.collections", "Iterables::Set::SetHelpers");

        let error = fx.locate("List::Partition", helpers).unwrap_err();
        match error.kind {
            ResolveErrorKind::PathNotFound {
                missing_segment,
                hint,
                ..
            } => {
                assert_eq!(missing_segment, "List");
                assert_eq!(
                    hint,
                    Some(PathHint::DidYouMean("Iterables::List::Partition".to_string()))
                );
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_unfolded_directory_is_not_a_module() {
        let fx = Fixture::new();
        let root = fx.module("acme.collections", "Root");
        let error = fx.locate("Iterables::Bag", root).unwrap_err();
        assert!(matches!(
            error.kind,
            ResolveErrorKind::PathNotFound {
                hint: Some(PathHint::NotFolded { .. }),
                ..
            }
        ));
    }

    #[test]
    fn test_cross_package_requires_dependency() {
        let fx = Fixture::new();
        let main = fx.module("acme.app", "Main");
        let tool = fx.module("acme.other", "Tool");
        let partition = fx.module("acme.collections", "Iterables::List::Partition");

        assert_eq!(
            fx.locate("acme.collections::Iterables::List::Partition", main).unwrap(),
            partition
        );

        let error = fx.locate("acme.collections::Iterables::List", tool).unwrap_err();
        assert!(matches!(
            error.kind,
            ResolveErrorKind::PathNotFound {
                hint: Some(PathHint::NotADependency { .. }),
                ..
            }
        ));
    }
}

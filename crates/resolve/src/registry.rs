//! Package registry
//!
//! Cross-package imports only ever ask two questions: which package owns an
//! identifier, and whether one package declared another as a dependency.

use indexmap::{IndexMap, IndexSet};

use crate::ids::PackageId;
use crate::tree::ModuleTree;

/// Read-only package lookup service consulted by path resolution.
pub trait PackageRegistry: Send + Sync {
    fn lookup(&self, name: &str) -> Option<PackageId>;

    /// `dependent` declared `dependency` directly.
    fn depends_on(&self, dependent: PackageId, dependency: PackageId) -> bool;

    fn dependencies(&self, dependent: PackageId) -> Vec<PackageId>;
}

/// Registry built from the packages that made it into the tree.
#[derive(Debug, Clone, Default)]
pub struct DependencyMap {
    names: IndexMap<String, PackageId>,
    edges: IndexMap<PackageId, IndexSet<PackageId>>,
}

impl DependencyMap {
    pub fn from_tree(tree: &ModuleTree) -> Self {
        let mut map = Self::default();
        for package in tree.packages() {
            map.names.insert(package.name.clone(), package.id);
        }
        for package in tree.packages() {
            let deps = package
                .dependencies
                .iter()
                .filter_map(|name| map.names.get(name).copied())
                .collect();
            map.edges.insert(package.id, deps);
        }
        map
    }
}

impl PackageRegistry for DependencyMap {
    fn lookup(&self, name: &str) -> Option<PackageId> {
        self.names.get(name).copied()
    }

    fn depends_on(&self, dependent: PackageId, dependency: PackageId) -> bool {
        self.edges
            .get(&dependent)
            .is_some_and(|deps| deps.contains(&dependency))
    }

    fn dependencies(&self, dependent: PackageId) -> Vec<PackageId> {
        self.edges
            .get(&dependent)
            .map(|deps| deps.iter().copied().collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{DirectorySource, PackageSource};
    use crate::tree::TreeBuilder;

    #[test]
    fn test_dependency_map() {
        let mut builder = TreeBuilder::new();
        builder.add_package(&PackageSource::new("acme.core", DirectorySource::new("src")));
        builder.add_package(
            &PackageSource::new("acme.app", DirectorySource::new("src"))
                .with_dependency("acme.core")
                .with_dependency("acme.gone"),
        );
        let (tree, _) = builder.finish();
        let registry = DependencyMap::from_tree(&tree);

        let core = registry.lookup("acme.core").unwrap();
        let app = registry.lookup("acme.app").unwrap();
        assert!(registry.depends_on(app, core));
        assert!(!registry.depends_on(core, app));
        assert_eq!(registry.dependencies(app), vec![core]);
        assert_eq!(registry.lookup("acme.gone"), None);
    }
}

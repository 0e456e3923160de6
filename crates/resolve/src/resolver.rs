//! Resolver driver
//!
//! Runs the phases in order, each one reading only the finished output of
//! the previous ones:
//!
//! 1. build the module tree (fatal layout errors drop a package)
//! 2. pair test modules with production modules
//! 3. compute export sets, children before the directories they fold into
//! 4. resolve imports, in parallel across importing modules
//! 5. record successful bindings in the import graph

use codespan::FileId;
use let_diagnostics::Diagnostic;
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

use crate::config::ResolverConfig;
use crate::errors::ResolveError;
use crate::existence::ExistencePruner;
use crate::exports::{ExportComputer, ExportSet, ExportTable};
use crate::ids::{DeclId, ModuleId};
use crate::imports::{Binding, ImportResolver, ImportSite, ModuleImports};
use crate::layout::PackageSource;
use crate::module_graph::ImportGraph;
use crate::registry::{DependencyMap, PackageRegistry};
use crate::test_binder::TestPairings;
use crate::tree::{ModuleTree, TreeBuilder};

/// Per-site outcome of import resolution, ordered by site
pub type BindingTable = BTreeMap<ImportSite, Result<Binding, ResolveError>>;

/// Everything one resolver run produced
pub struct Resolution {
    pub tree: ModuleTree,
    pub exports: ExportTable,
    pub pairings: TestPairings,
    pub bindings: BindingTable,
    /// Non-fatal errors of every phase, plus the fatal layout errors
    pub errors: Vec<ResolveError>,
    pub graph: ImportGraph,
    pruner: ExistencePruner,
    registry: Arc<dyn PackageRegistry>,
}

impl Resolution {
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn diagnostics(&self) -> Vec<Diagnostic<FileId>> {
        self.errors.iter().map(ResolveError::to_diagnostic).collect()
    }

    pub fn binding(&self, site: &ImportSite) -> Option<&Result<Binding, ResolveError>> {
        self.bindings.get(site)
    }

    /// Successful bindings of one module, in source order
    pub fn bindings_of(&self, module: ModuleId) -> impl Iterator<Item = &Binding> + '_ {
        self.bindings
            .iter()
            .filter(move |(site, _)| site.module == module)
            .filter_map(|(_, result)| result.as_ref().ok())
    }

    pub fn export_set(&self, module: ModuleId) -> &ExportSet {
        self.exports.get(module)
    }

    pub fn is_visible_module(&self, module: ModuleId, requester: ModuleId) -> bool {
        self.pruner
            .is_visible_module(&self.tree, &self.exports, module, requester)
    }

    pub fn visible_modules(&self, requester: ModuleId) -> Vec<ModuleId> {
        self.pruner
            .visible_modules(&self.tree, &self.exports, self.registry.as_ref(), requester)
    }

    pub fn entry_points(&self, test: ModuleId) -> Vec<DeclId> {
        self.pairings.entry_points(&self.tree, test)
    }

    /// Test module paired with a production module
    pub fn pairing_of(&self, production: ModuleId) -> Option<ModuleId> {
        self.pairings.test_of(production)
    }

    pub fn production_of(&self, test: ModuleId) -> Option<ModuleId> {
        self.pairings.production_of(test)
    }

    pub fn invalidation_set(&self, module: ModuleId) -> Vec<ModuleId> {
        self.graph.invalidation_set(module)
    }

    pub fn import_cycles(&self) -> Vec<Vec<ModuleId>> {
        self.graph.import_cycles()
    }

    /// Production module at `path` (`::`-separated) in `package`
    pub fn find_module(&self, package: &str, path: &str) -> Option<ModuleId> {
        let package = self.tree.package_by_name(package)?;
        let segments: Vec<String> = path.split("::").map(str::to_string).collect();
        self.tree.production_module(package, &segments)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Resolver {
    config: ResolverConfig,
}

impl Resolver {
    pub fn new(config: ResolverConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Resolve a set of packages with the registry built from them.
    pub fn resolve(&self, sources: &[PackageSource]) -> Resolution {
        let (tree, errors) = build_tree(sources);
        let registry = Arc::new(DependencyMap::from_tree(&tree));
        self.resolve_tree(tree, errors, registry)
    }

    /// Resolve a finished tree against an externally supplied registry.
    pub fn resolve_tree(
        &self,
        tree: ModuleTree,
        mut errors: Vec<ResolveError>,
        registry: Arc<dyn PackageRegistry>,
    ) -> Resolution {
        let started = Instant::now();

        let (pairings, pairing_errors) = TestPairings::pair(&tree, &self.config);
        debug!(pairings = pairings.len(), "test modules paired");
        errors.extend(pairing_errors);

        let (exports, export_errors) = ExportComputer::new(&tree, registry.as_ref(), &pairings).compute();
        errors.extend(export_errors);

        let pruner = ExistencePruner::new();
        let results = {
            let resolver = ImportResolver::new(&tree, &exports, registry.as_ref(), &pairings, &pruner);
            let modules: Vec<ModuleId> = tree.modules().map(|m| m.id).collect();
            if self.config.parallel {
                modules
                    .par_iter()
                    .map(|module| resolver.resolve_module(*module))
                    .collect::<Vec<ModuleImports>>()
            } else {
                modules
                    .iter()
                    .map(|module| resolver.resolve_module(*module))
                    .collect::<Vec<ModuleImports>>()
            }
        };

        let mut bindings = BindingTable::new();
        let mut graph = ImportGraph::new();
        for module_imports in results {
            errors.extend(module_imports.errors);
            for (site, result) in module_imports.sites {
                if let Ok(binding) = &result {
                    graph.add_import(site.module, binding.target);
                }
                bindings.insert(site, result);
            }
        }

        info!(
            modules = tree.module_count(),
            bindings = bindings.len(),
            import_edges = graph.edge_count(),
            visibility_checks = pruner.memo_len(),
            errors = errors.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "resolution finished"
        );

        Resolution {
            tree,
            exports,
            pairings,
            bindings,
            errors,
            graph,
            pruner,
            registry,
        }
    }
}

/// Build the module tree for all packages, collecting layout errors.
pub fn build_tree(sources: &[PackageSource]) -> (ModuleTree, Vec<ResolveError>) {
    let mut builder = TreeBuilder::new();
    for source in sources {
        builder.add_package(source);
    }
    builder.finish()
}

/// Convenience function to resolve packages with the default configuration
pub fn resolve_packages(sources: &[PackageSource]) -> Resolution {
    Resolver::default().resolve(sources)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{DirectorySource, FileSource};
    use crate::visibility::Visibility;

    fn workspace() -> Vec<PackageSource> {
        let core = PackageSource::new(
            "acme.core",
            DirectorySource::new("src")
                .with_file(FileSource::new("Math").function("add", Visibility::Public))
                .with_file(FileSource::new("Stats").import("Math", &["add"]).function("mean", Visibility::Public)),
        );
        let app = PackageSource::new(
            "acme.app",
            DirectorySource::new("src").with_file(
                FileSource::new("Main")
                    .import("acme.core::Stats", &["mean"])
                    .import("acme.core::Math", &["add"]),
            ),
        )
        .with_dependency("acme.core");
        vec![core, app]
    }

    #[test]
    fn test_sequential_and_parallel_agree() {
        let parallel = Resolver::default().resolve(&workspace());
        let sequential = Resolver::new(ResolverConfig {
            parallel: false,
            ..ResolverConfig::default()
        })
        .resolve(&workspace());

        assert!(!parallel.has_errors());
        assert_eq!(parallel.bindings, sequential.bindings);
    }

    #[test]
    fn test_invalidation_follows_bindings() {
        let resolution = resolve_packages(&workspace());
        let math = resolution.find_module("acme.core", "Math").unwrap();
        let stats = resolution.find_module("acme.core", "Stats").unwrap();
        let main = resolution.find_module("acme.app", "Main").unwrap();

        assert_eq!(resolution.invalidation_set(math), {
            let mut expected = vec![stats, main];
            expected.sort();
            expected
        });
        assert!(resolution.import_cycles().is_empty());
        assert_eq!(resolution.bindings_of(main).count(), 2);
    }

    #[test]
    fn test_visible_modules_span_dependencies() {
        let resolution = resolve_packages(&workspace());
        let main = resolution.find_module("acme.app", "Main").unwrap();
        let listed: Vec<String> = resolution
            .visible_modules(main)
            .into_iter()
            .map(|m| resolution.tree.display_path(m))
            .collect();
        assert_eq!(listed, vec!["acme.core::Math", "acme.core::Stats"]);
    }
}

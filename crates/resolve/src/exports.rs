//! Export sets
//!
//! A module exports its non-private declarations, including non-private
//! re-exports whose source could be resolved. A folded directory is seen from
//! outside through its folding module only, so its export set is exactly that
//! module's; sibling modules are never merged in.
//!
//! Re-exports are resolved per declaration with the same path rules as
//! imports. Chains are followed on demand and memoised, and a chain that comes
//! back to a declaration still being resolved is reported as circular.

use indexmap::IndexMap;
use std::collections::HashMap;
use tracing::{debug, trace};

use crate::errors::{ResolveError, ResolveErrorKind};
use crate::ids::{DeclId, ModuleId};
use crate::paths::PathLocator;
use crate::registry::PackageRegistry;
use crate::test_binder::TestPairings;
use crate::tree::ModuleTree;
use crate::visibility::VisibilityOracle;

/// One entry of an export set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Export {
    /// Declaration that publishes the name in this module
    pub decl: DeclId,
    /// Concrete declaration the name ultimately refers to
    pub origin: DeclId,
}

pub type ExportSet = IndexMap<String, Export>;

#[derive(Debug, Default)]
pub struct ExportTable {
    sets: Vec<ExportSet>,
    /// Every successfully resolved re-export, private ones included
    reexports: HashMap<DeclId, DeclId>,
}

impl ExportTable {
    pub fn get(&self, module: ModuleId) -> &ExportSet {
        &self.sets[module.index()]
    }

    pub fn lookup(&self, module: ModuleId, name: &str) -> Option<Export> {
        self.get(module).get(name).copied()
    }

    /// Concrete declaration behind `decl`; `None` for a failed re-export.
    pub fn origin_of(&self, tree: &ModuleTree, decl: DeclId) -> Option<DeclId> {
        if tree.declaration(decl).is_reexport() {
            self.reexports.get(&decl).copied()
        } else {
            Some(decl)
        }
    }

    pub fn names(&self, module: ModuleId) -> Vec<String> {
        self.get(module).keys().cloned().collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DeclState {
    Pending,
    InProgress,
    Resolved(DeclId),
    Failed,
}

/// Computes the [`ExportTable`] for a finished tree.
pub struct ExportComputer<'r> {
    tree: &'r ModuleTree,
    pairings: &'r TestPairings,
    locator: PathLocator<'r>,
    oracle: VisibilityOracle<'r>,
    states: Vec<DeclState>,
    /// Re-exports currently being followed, outermost first
    stack: Vec<DeclId>,
    errors: Vec<ResolveError>,
}

impl<'r> ExportComputer<'r> {
    pub fn new(
        tree: &'r ModuleTree,
        registry: &'r dyn PackageRegistry,
        pairings: &'r TestPairings,
    ) -> Self {
        Self {
            tree,
            pairings,
            locator: PathLocator::new(tree, registry, pairings),
            oracle: VisibilityOracle::new(tree),
            states: vec![DeclState::Pending; tree.declaration_count()],
            stack: Vec::new(),
            errors: Vec::new(),
        }
    }

    pub fn compute(mut self) -> (ExportTable, Vec<ResolveError>) {
        let tree = self.tree;
        let mut sets = vec![ExportSet::new(); tree.module_count()];
        let mut reexports = HashMap::new();

        for dir in tree.post_order_dirs() {
            for module in tree.modules_in(dir) {
                let mut set = ExportSet::new();
                for decl_id in tree.module(module).declarations.values().copied() {
                    let decl = tree.declaration(decl_id);
                    let origin = if decl.is_reexport() {
                        match self.resolve_reexport(decl_id) {
                            Some(origin) => {
                                reexports.insert(decl_id, origin);
                                origin
                            }
                            None => continue,
                        }
                    } else {
                        decl_id
                    };

                    if decl.visibility.is_private() || self.pairings.is_entry_point(tree, decl_id) {
                        continue;
                    }
                    set.insert(decl.name.clone(), Export { decl: decl_id, origin });
                }
                trace!(module = %tree.display_path(module), exports = set.len(), "export set computed");
                sets[module.index()] = set;
            }
        }

        debug!(
            modules = sets.len(),
            reexports = reexports.len(),
            errors = self.errors.len(),
            "export sets final"
        );
        (ExportTable { sets, reexports }, self.errors)
    }

    /// Resolve a re-export to its concrete origin, reporting failures once.
    fn resolve_reexport(&mut self, decl_id: DeclId) -> Option<DeclId> {
        match self.states[decl_id.index()] {
            DeclState::Resolved(origin) => return Some(origin),
            DeclState::Failed => return None,
            DeclState::InProgress => {
                self.report_cycle(decl_id);
                return None;
            }
            DeclState::Pending => {}
        }

        self.states[decl_id.index()] = DeclState::InProgress;
        self.stack.push(decl_id);
        let result = self.follow(decl_id);
        self.stack.pop();

        // A cycle already marked every member as failed
        if self.states[decl_id.index()] == DeclState::Failed {
            return None;
        }

        match result {
            Ok(origin) => {
                self.states[decl_id.index()] = DeclState::Resolved(origin);
                Some(origin)
            }
            Err(Some(error)) => {
                let tree = self.tree;
                let decl = tree.declaration(decl_id);
                let module = tree.module(decl.module);
                let span = decl.reexport.as_ref().and_then(|p| p.span).or(decl.span);
                self.errors.push(error.at(module.file_id, span));
                self.states[decl_id.index()] = DeclState::Failed;
                None
            }
            Err(None) => {
                self.states[decl_id.index()] = DeclState::Failed;
                None
            }
        }
    }

    /// `Err(None)` means the failure was already reported further down the chain.
    fn follow(&mut self, decl_id: DeclId) -> Result<DeclId, Option<ResolveError>> {
        let tree = self.tree;
        let pairings = self.pairings;
        let decl = tree.declaration(decl_id);
        let from = decl.module;
        let Some(path) = decl.reexport.as_ref() else {
            return Ok(decl_id);
        };

        let target = self.locator.locate(path, from).map_err(Some)?;
        if target == from {
            return Err(Some(ResolveError::new(ResolveErrorKind::SelfImport {
                module_path: tree.display_path(from),
            })));
        }

        let not_exported = || {
            ResolveError::name_not_exported(
                decl.name.clone(),
                tree.display_path(target),
                exported_names(tree, pairings, target),
            )
        };

        let Some(published) = tree.find_declaration(target, &decl.name) else {
            return Err(Some(not_exported()));
        };
        let published_decl = tree.declaration(published);
        if published_decl.visibility.is_private() || pairings.is_entry_point(tree, published) {
            return Err(Some(not_exported()));
        }

        let origin = if published_decl.is_reexport() {
            match self.resolve_reexport(published) {
                Some(origin) => origin,
                None if self.states[decl_id.index()] == DeclState::Failed => return Err(None),
                None => return Err(Some(not_exported())),
            }
        } else {
            published
        };

        if !self.oracle.visible(published, from) {
            return Err(Some(ResolveError::not_visible(
                decl.name.clone(),
                tree.display_path(target),
                tree.display_path(from),
                published_decl.visibility,
            )));
        }

        trace!(reexport = %decl_id, %origin, "re-export resolved");
        Ok(origin)
    }

    fn report_cycle(&mut self, repeated: DeclId) {
        let Some(start) = self.stack.iter().position(|d| *d == repeated) else {
            return;
        };
        let members: Vec<DeclId> = self.stack[start..].to_vec();
        let mut cycle: Vec<String> = members.iter().map(|d| self.describe(*d)).collect();
        cycle.push(self.describe(repeated));

        let tree = self.tree;
        let decl = tree.declaration(repeated);
        let module = tree.module(decl.module);
        let span = decl.reexport.as_ref().and_then(|p| p.span).or(decl.span);
        self.errors.push(
            ResolveError::new(ResolveErrorKind::CircularReexport { cycle }).at(module.file_id, span),
        );

        for member in members {
            self.states[member.index()] = DeclState::Failed;
        }
    }

    fn describe(&self, decl: DeclId) -> String {
        let decl = self.tree.declaration(decl);
        format!("{}::{}", self.tree.module(decl.module).qualified_path(), decl.name)
    }
}

/// Names a module publishes, listed without resolving its re-exports
fn exported_names(tree: &ModuleTree, pairings: &TestPairings, module: ModuleId) -> Vec<String> {
    tree.declarations_of(module)
        .filter(|d| !d.visibility.is_private() && !pairings.is_entry_point(tree, d.id))
        .map(|d| d.name.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{DirectorySource, FileSource, ImportPath, PackageSource};
    use crate::registry::DependencyMap;
    use crate::tree::TreeBuilder;
    use crate::visibility::Visibility;

    fn compute(source: PackageSource) -> (ModuleTree, ExportTable, Vec<ResolveError>) {
        let mut builder = TreeBuilder::new();
        builder.add_package(&source);
        let (tree, _) = builder.finish();
        let registry = DependencyMap::from_tree(&tree);
        let pairings = TestPairings::default();
        let (table, errors) = ExportComputer::new(&tree, &registry, &pairings).compute();
        (tree, table, errors)
    }

    fn module(tree: &ModuleTree, path: &str) -> ModuleId {
        let pkg = tree.packages().next().unwrap().id;
        tree.production_module(pkg, &ImportPath::parse(path).segments).unwrap()
    }

    #[test]
    fn test_private_declarations_are_not_exported() {
        let (tree, table, errors) = compute(PackageSource::new(
            "acme.text",
            DirectorySource::new("src").with_file(
                FileSource::new("Strings")
                    .function("trim", Visibility::Public)
                    .function("scan", Visibility::Private)
                    .type_decl("Rope", Visibility::Internal),
            ),
        ));
        assert!(errors.is_empty());
        assert_eq!(table.names(module(&tree, "Strings")), vec!["trim", "Rope"]);
    }

    #[test]
    fn test_folded_directory_surface_is_the_folding_module() {
        let (tree, table, errors) = compute(PackageSource::new(
            "acme.collections",
            DirectorySource::new("src").with_dir(
                DirectorySource::new("List")
                    .with_file(
                        FileSource::new("List")
                            .function("size", Visibility::Public)
                            .reexport("partition", Visibility::Public, "Partition"),
                    )
                    .with_file(
                        FileSource::new("Partition")
                            .function("partition", Visibility::Internal)
                            .function("pivot", Visibility::Public),
                    ),
            ),
        ));
        assert!(errors.is_empty());

        let list = module(&tree, "List");
        let partition = module(&tree, "List::Partition");
        assert_eq!(table.names(list), vec!["size", "partition"]);

        let export = table.lookup(list, "partition").unwrap();
        assert_eq!(tree.declaration(export.decl).module, list);
        assert_eq!(export.origin, tree.find_declaration(partition, "partition").unwrap());
        assert!(table.lookup(list, "pivot").is_none());
    }

    #[test]
    fn test_reexport_chain_and_cycle() {
        let (tree, table, errors) = compute(PackageSource::new(
            "acme.chain",
            DirectorySource::new("src")
                .with_file(FileSource::new("A").reexport("value", Visibility::Public, "B"))
                .with_file(FileSource::new("B").reexport("value", Visibility::Public, "C"))
                .with_file(FileSource::new("C").function("value", Visibility::Public))
                .with_file(FileSource::new("X").reexport("loop", Visibility::Public, "Y"))
                .with_file(FileSource::new("Y").reexport("loop", Visibility::Public, "X")),
        ));

        let origin = tree.find_declaration(module(&tree, "C"), "value").unwrap();
        assert_eq!(table.lookup(module(&tree, "A"), "value").unwrap().origin, origin);

        assert_eq!(errors.len(), 1);
        assert!(matches!(errors[0].kind, ResolveErrorKind::CircularReexport { .. }));
        assert!(table.lookup(module(&tree, "X"), "loop").is_none());
        assert!(table.lookup(module(&tree, "Y"), "loop").is_none());
    }

    #[test]
    fn test_reexport_must_see_its_source() {
        let (tree, table, errors) = compute(PackageSource::new(
            "acme.vis",
            DirectorySource::new("src")
                .with_file(FileSource::new("Facade").reexport("secret", Visibility::Public, "Core::Impl"))
                .with_dir(
                    DirectorySource::new("Core")
                        .with_file(FileSource::new("Impl").function("secret", Visibility::Protected)),
                ),
        ));
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].code(), "E0104");
        assert!(table.get(module(&tree, "Facade")).is_empty());
    }

    #[test]
    fn test_private_reexport_resolves_but_stays_hidden() {
        let (tree, table, errors) = compute(PackageSource::new(
            "acme.priv",
            DirectorySource::new("src")
                .with_file(FileSource::new("Wrapper").reexport("inner", Visibility::Private, "Inner"))
                .with_file(FileSource::new("Inner").function("inner", Visibility::Internal)),
        ));
        assert!(errors.is_empty());
        let wrapper = module(&tree, "Wrapper");
        let reexport = tree.find_declaration(wrapper, "inner").unwrap();
        assert!(table.get(wrapper).is_empty());
        assert_eq!(
            table.origin_of(&tree, reexport),
            tree.find_declaration(module(&tree, "Inner"), "inner")
        );
    }
}

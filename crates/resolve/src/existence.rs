//! Derived module existence
//!
//! A module "exists" for a requester only if something in it, or in one of
//! its submodules, is visible to that requester. Hidden modules are never
//! importable and are left out of module listings.
//!
//! Answers are memoised per `(module, requester)` in a concurrent map so the
//! parallel import phase can share one pruner.

use dashmap::DashMap;
use tracing::trace;

use crate::exports::ExportTable;
use crate::ids::{DirId, ModuleId};
use crate::registry::PackageRegistry;
use crate::tree::{ModuleRole, ModuleTree};
use crate::visibility::VisibilityOracle;

#[derive(Debug, Default)]
pub struct ExistencePruner {
    memo: DashMap<(ModuleId, ModuleId), bool>,
}

impl ExistencePruner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_visible_module(
        &self,
        tree: &ModuleTree,
        exports: &ExportTable,
        module: ModuleId,
        requester: ModuleId,
    ) -> bool {
        if module == requester {
            return true;
        }
        if let Some(known) = self.memo.get(&(module, requester)).map(|entry| *entry) {
            return known;
        }

        let oracle = VisibilityOracle::new(tree);
        let visible = exports
            .get(module)
            .values()
            .any(|export| oracle.visible(export.decl, requester))
            || submodules(tree, module)
                .into_iter()
                .any(|sub| self.is_visible_module(tree, exports, sub, requester));

        trace!(%module, %requester, visible, "module existence");
        self.memo.insert((module, requester), visible);
        visible
    }

    /// Production modules of the requester's package and its dependencies that
    /// the requester can see, in path order.
    pub fn visible_modules(
        &self,
        tree: &ModuleTree,
        exports: &ExportTable,
        registry: &dyn PackageRegistry,
        requester: ModuleId,
    ) -> Vec<ModuleId> {
        let own = tree.module(requester).package;
        let mut packages = vec![own];
        packages.extend(registry.dependencies(own));

        let mut visible: Vec<ModuleId> = tree
            .modules()
            .filter(|m| m.role == ModuleRole::Production && packages.contains(&m.package))
            .filter(|m| m.id != requester)
            .filter(|m| self.is_visible_module(tree, exports, m.id, requester))
            .map(|m| m.id)
            .collect();
        visible.sort_by(|a, b| {
            let (a, b) = (tree.module(*a), tree.module(*b));
            (&tree.package(a.package).name, &a.path).cmp(&(&tree.package(b.package).name, &b.path))
        });
        visible
    }

    pub fn memo_len(&self) -> usize {
        self.memo.len()
    }
}

/// Plain modules of a folded directory plus, per subdirectory, its folding
/// module or else that subdirectory's own submodules.
fn submodules(tree: &ModuleTree, module: ModuleId) -> Vec<ModuleId> {
    fn collect(tree: &ModuleTree, dir: DirId, out: &mut Vec<ModuleId>) {
        let directory = tree.directory(dir);
        out.extend(directory.modules.values().copied());
        for child in directory.directories.values() {
            match tree.representative(*child) {
                Some(fold) => out.push(fold),
                None => collect(tree, *child, out),
            }
        }
    }

    let mut out = Vec::new();
    if let Some(dir) = tree.module(module).folds {
        collect(tree, dir, &mut out);
    }
    out
}

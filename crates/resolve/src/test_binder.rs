//! Test module pairing
//!
//! A module `NTest` in test directory `P` claims the production module at
//! `P::N`, or the module folding `P` when `P` is itself named `N`. The first
//! claimant in path order wins; the pairing grants the test module access to
//! every declaration of its production module and turns its own public
//! declarations into entry points.

use indexmap::IndexMap;
use std::collections::HashMap;
use tracing::debug;

use crate::config::ResolverConfig;
use crate::errors::{ResolveError, ResolveErrorKind};
use crate::ids::{DeclId, ModuleId};
use crate::tree::{ModuleRole, ModuleTree};
use crate::visibility::{Visibility, VisibilityOracle};

#[derive(Debug, Clone, Default)]
pub struct TestPairings {
    /// test module -> production module, in path order of the test modules
    by_test: IndexMap<ModuleId, ModuleId>,
    by_production: HashMap<ModuleId, ModuleId>,
}

impl TestPairings {
    /// Pair every test module of every package.
    pub fn pair(tree: &ModuleTree, config: &ResolverConfig) -> (Self, Vec<ResolveError>) {
        let mut pairings = Self::default();
        let mut errors = Vec::new();

        let mut tests: Vec<_> = tree
            .modules()
            .filter(|module| module.role == ModuleRole::Test)
            .collect();
        tests.sort_by(|a, b| (a.package, &a.path).cmp(&(b.package, &b.path)));

        for test in tests {
            let Some(production_name) = config.production_name(&test.name) else {
                continue;
            };

            let directory = &test.path[..test.path.len().saturating_sub(1)];
            let mut target = directory.to_vec();
            target.push(production_name.to_string());
            // test/Format/FormatTest mirrors src/Format/Format, which folds to `Format`
            let production = tree.production_module(test.package, &target).or_else(|| {
                (directory.last().map(String::as_str) == Some(production_name))
                    .then(|| tree.production_module(test.package, directory))
                    .flatten()
            });
            let Some(production) = production else {
                debug!(test = %test.qualified_path(), "no production module to pair with");
                continue;
            };

            if let Some(existing) = pairings.by_production.get(&production) {
                let mut error = ResolveError::new(ResolveErrorKind::DuplicateTestPairing {
                    test_module: tree.display_path(test.id),
                    production_module: tree.display_path(production),
                    paired_with: tree.display_path(*existing),
                });
                if let Some(file_id) = test.file_id {
                    error = error.with_file(file_id);
                }
                errors.push(error);
                continue;
            }

            debug!(
                test = %tree.display_path(test.id),
                production = %tree.display_path(production),
                "test module paired"
            );
            pairings.by_test.insert(test.id, production);
            pairings.by_production.insert(production, test.id);
        }

        (pairings, errors)
    }

    pub fn production_of(&self, test: ModuleId) -> Option<ModuleId> {
        self.by_test.get(&test).copied()
    }

    pub fn test_of(&self, production: ModuleId) -> Option<ModuleId> {
        self.by_production.get(&production).copied()
    }

    pub fn is_paired_test(&self, module: ModuleId) -> bool {
        self.by_test.contains_key(&module)
    }

    /// `(test, production)` pairs in path order
    pub fn iter(&self) -> impl Iterator<Item = (ModuleId, ModuleId)> + '_ {
        self.by_test.iter().map(|(test, production)| (*test, *production))
    }

    pub fn len(&self) -> usize {
        self.by_test.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_test.is_empty()
    }

    /// Public declarations of a paired test module. Empty for anything else.
    pub fn entry_points(&self, tree: &ModuleTree, test: ModuleId) -> Vec<DeclId> {
        if !self.is_paired_test(test) {
            return Vec::new();
        }
        tree.declarations_of(test)
            .filter(|decl| decl.visibility == Visibility::Public && !decl.is_reexport())
            .map(|decl| decl.id)
            .collect()
    }

    /// Declarations of a paired test that stay out of its export set
    pub fn is_entry_point(&self, tree: &ModuleTree, decl: DeclId) -> bool {
        let decl = tree.declaration(decl);
        decl.visibility == Visibility::Public && !decl.is_reexport() && self.is_paired_test(decl.module)
    }
}

/// The oracle plus the paired-test override, applied at import sites only.
#[derive(Debug, Clone, Copy)]
pub struct AccessPolicy<'r> {
    oracle: VisibilityOracle<'r>,
    tree: &'r ModuleTree,
    pairings: &'r TestPairings,
}

impl<'r> AccessPolicy<'r> {
    pub fn new(tree: &'r ModuleTree, pairings: &'r TestPairings) -> Self {
        Self {
            oracle: VisibilityOracle::new(tree),
            tree,
            pairings,
        }
    }

    /// `requester` is a test module importing from its own production module
    pub fn is_privileged(&self, requester: ModuleId, target: ModuleId) -> bool {
        self.pairings.production_of(requester) == Some(target)
    }

    pub fn accessible(&self, decl: DeclId, requester: ModuleId) -> bool {
        let owner = self.tree.declaration(decl).module;
        self.is_privileged(requester, owner) || self.oracle.visible(decl, requester)
    }

    #[cfg(test)]
    fn oracle(&self) -> VisibilityOracle<'r> {
        self.oracle
    }
}

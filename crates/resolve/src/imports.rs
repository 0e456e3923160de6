//! Import resolution
//!
//! Each `import { items } from path;` statement is resolved in two steps:
//! locate the target module once, then bind every item against that module's
//! export set. A paired test module importing from its own production module
//! skips the export set and sees every declaration.

use codespan::Span;
use serde::Serialize;
use std::collections::HashSet;
use tracing::trace;

use crate::errors::{ResolveError, ResolveErrorKind};
use crate::existence::ExistencePruner;
use crate::exports::ExportTable;
use crate::ids::{DeclId, ModuleId};
use crate::layout::{ImportItem, ImportStatement};
use crate::paths::PathLocator;
use crate::registry::PackageRegistry;
use crate::test_binder::{AccessPolicy, TestPairings};
use crate::tree::ModuleTree;

/// One imported item: `(module, statement index, item index)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ImportSite {
    pub module: ModuleId,
    pub statement: usize,
    pub item: usize,
}

/// A local name bound to a concrete declaration
#[derive(Debug, Clone, PartialEq)]
pub struct Binding {
    pub local_name: String,
    pub imported: String,
    /// Concrete declaration, after following re-exports
    pub decl: DeclId,
    /// Declaration that published the name in the target module
    pub via: DeclId,
    pub target: ModuleId,
    pub span: Option<Span>,
}

pub type SiteResult = (ImportSite, Result<Binding, ResolveError>);

/// Everything resolving one module's imports produced
#[derive(Debug, Default)]
pub struct ModuleImports {
    pub sites: Vec<SiteResult>,
    /// Each failure once, plus duplicate-import reports
    pub errors: Vec<ResolveError>,
}

pub struct ImportResolver<'r> {
    tree: &'r ModuleTree,
    exports: &'r ExportTable,
    locator: PathLocator<'r>,
    policy: AccessPolicy<'r>,
    pruner: &'r ExistencePruner,
}

impl<'r> ImportResolver<'r> {
    pub fn new(
        tree: &'r ModuleTree,
        exports: &'r ExportTable,
        registry: &'r dyn PackageRegistry,
        pairings: &'r TestPairings,
        pruner: &'r ExistencePruner,
    ) -> Self {
        Self {
            tree,
            exports,
            locator: PathLocator::new(tree, registry, pairings),
            policy: AccessPolicy::new(tree, pairings),
            pruner,
        }
    }

    /// Find the statement's target module and check it exists for `from`.
    pub fn locate(&self, statement: &ImportStatement, from: ModuleId) -> Result<ModuleId, ResolveError> {
        let target = self.locator.locate(&statement.path, from)?;

        if target == from {
            return Err(ResolveError::new(ResolveErrorKind::SelfImport {
                module_path: self.tree.display_path(from),
            }));
        }

        if !self.policy.is_privileged(from, target)
            && !self
                .pruner
                .is_visible_module(self.tree, self.exports, target, from)
        {
            return Err(ResolveError::module_hidden(
                self.tree.display_path(target),
                self.tree.display_path(from),
            ));
        }

        Ok(target)
    }

    /// Bind one item against an already located target.
    pub fn bind_item(&self, item: &ImportItem, target: ModuleId, from: ModuleId) -> Result<Binding, ResolveError> {
        let (via, decl) = if self.policy.is_privileged(from, target) {
            self.privileged_lookup(&item.name, target)?
        } else {
            let export = self.exports.lookup(target, &item.name).ok_or_else(|| {
                ResolveError::name_not_exported(
                    item.name.clone(),
                    self.tree.display_path(target),
                    self.exports.names(target),
                )
            })?;

            if !self.policy.accessible(export.decl, from) {
                return Err(ResolveError::not_visible(
                    item.name.clone(),
                    self.tree.display_path(target),
                    self.tree.display_path(from),
                    self.tree.declaration(export.decl).visibility,
                ));
            }
            (export.decl, export.origin)
        };

        Ok(Binding {
            local_name: item.local_name().to_string(),
            imported: item.name.clone(),
            decl,
            via,
            target,
            span: item.span,
        })
    }

    /// A paired test sees every declaration of its production module.
    fn privileged_lookup(&self, name: &str, target: ModuleId) -> Result<(DeclId, DeclId), ResolveError> {
        let not_found = || {
            ResolveError::name_not_exported(
                name,
                self.tree.display_path(target),
                self.tree.declarations_of(target).map(|d| d.name.clone()).collect(),
            )
        };
        let via = self.tree.find_declaration(target, name).ok_or_else(not_found)?;
        let origin = self.exports.origin_of(self.tree, via).ok_or_else(not_found)?;
        Ok((via, origin))
    }

    /// Resolve every import statement of one module.
    pub fn resolve_module(&self, module: ModuleId) -> ModuleImports {
        let owner = self.tree.module(module);
        let mut out = ModuleImports::default();
        let mut bound_names = HashSet::new();

        for (statement_index, statement) in owner.imports.iter().enumerate() {
            let located = self.locate(statement, module);
            if let Err(error) = &located {
                let span = statement.path.span.or(statement.span);
                out.errors.push(error.clone().at(owner.file_id, span));
            }

            for (item_index, item) in statement.items.iter().enumerate() {
                let site = ImportSite {
                    module,
                    statement: statement_index,
                    item: item_index,
                };
                let span = item.span.or(statement.span);

                let result = match &located {
                    Ok(target) => self.bind_item(item, *target, module).map_err(|error| {
                        let error = error.at(owner.file_id, span);
                        out.errors.push(error.clone());
                        error
                    }),
                    Err(error) => Err(error.clone().at(owner.file_id, span)),
                };

                if result.is_ok() && !bound_names.insert(item.local_name().to_string()) {
                    out.errors.push(
                        ResolveError::new(ResolveErrorKind::DuplicateImport {
                            name: item.local_name().to_string(),
                            module_path: self.tree.display_path(module),
                        })
                        .at(owner.file_id, span),
                    );
                }

                trace!(%module, statement = statement_index, item = %item.name, ok = result.is_ok(), "import bound");
                out.sites.push((site, result));
            }
        }

        out
    }
}

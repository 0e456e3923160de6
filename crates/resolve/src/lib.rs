#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![deny(unused_must_use)]

//! Let Module Resolution and Visibility
//!
//! This crate provides:
//! - The module tree built from package layouts, with directory folding
//! - The four-tier visibility oracle (private/protected/internal/public)
//! - Export sets, including re-exports
//! - Import resolution (short-form, full-path, cross-package)
//! - Derived module existence (modules with nothing visible are hidden)
//! - Test module pairing with elevated access and entry points
//!
//! The resolver never looks at declaration bodies: a file is only its ordered
//! declaration headers and import statements, as described by [`layout`].

pub mod config;
pub mod errors;
pub mod existence;
pub mod exports;
pub mod ids;
pub mod imports;
pub mod layout;
pub mod module_graph;
pub mod paths;
pub mod registry;
pub mod resolver;
pub mod test_binder;
pub mod tree;
pub mod visibility;

// Re-export main types
pub use config::ResolverConfig;
pub use errors::{PathHint, ResolveError, ResolveErrorKind};
pub use existence::ExistencePruner;
pub use exports::{Export, ExportSet, ExportTable};
pub use ids::{DeclId, DirId, ModuleId, PackageId};
pub use imports::{Binding, ImportSite};
pub use layout::{
    DeclKind, DeclarationRecord, DirectorySource, FileSource, ImportItem, ImportPath,
    ImportStatement, PackageSource,
};
pub use module_graph::ImportGraph;
pub use registry::{DependencyMap, PackageRegistry};
pub use resolver::{BindingTable, Resolution, Resolver, build_tree, resolve_packages};
pub use test_binder::{AccessPolicy, TestPairings};
pub use tree::{Declaration, Directory, Module, ModuleRole, ModuleTree, Package, RootKind};
pub use visibility::{Visibility, VisibilityOracle};

/// Resolver version for compatibility checking
pub const RESOLVER_VERSION: u32 = 1;

//! Visibility tiers and the visibility oracle
//!
//! Tiers are compared structurally against the module tree, never by rank:
//! `protected` follows the directory hierarchy downward, `internal` the
//! package boundary.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::ids::{DeclId, ModuleId};
use crate::tree::{Declaration, ModuleTree};

/// Visibility tiers in the Let language
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    /// Only the owning module
    #[default]
    Private,
    /// The owner's directory and everything below it
    Protected,
    /// The owning package
    Internal,
    /// Everyone, including other packages
    Public,
}

impl Visibility {
    /// Parse a tier keyword; `export` is an alias for `public`.
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "private" => Some(Self::Private),
            "protected" => Some(Self::Protected),
            "internal" => Some(Self::Internal),
            "public" | "export" => Some(Self::Public),
            _ => None,
        }
    }

    pub fn keyword(self) -> &'static str {
        match self {
            Self::Private => "private",
            Self::Protected => "protected",
            Self::Internal => "internal",
            Self::Public => "public",
        }
    }

    pub fn is_private(self) -> bool {
        self == Self::Private
    }
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

/// Pure "may `requester` see this declaration" predicate.
///
/// Holds no state besides the tree, so it can be shared freely between
/// threads and consulted from any phase.
#[derive(Debug, Clone, Copy)]
pub struct VisibilityOracle<'t> {
    tree: &'t ModuleTree,
}

impl<'t> VisibilityOracle<'t> {
    pub fn new(tree: &'t ModuleTree) -> Self {
        Self { tree }
    }

    pub fn visible(&self, decl: DeclId, requester: ModuleId) -> bool {
        self.is_visible(self.tree.declaration(decl), requester)
    }

    pub fn is_visible(&self, decl: &Declaration, requester: ModuleId) -> bool {
        if decl.module == requester {
            return true;
        }

        let owner = self.tree.module(decl.module);
        let from = self.tree.module(requester);

        match decl.visibility {
            Visibility::Private => false,
            Visibility::Protected => {
                owner.package == from.package && self.tree.is_within(from.directory, owner.directory)
            }
            Visibility::Internal => owner.package == from.package,
            Visibility::Public => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{DirectorySource, FileSource, PackageSource};
    use crate::tree::TreeBuilder;

    /// src/
    ///   Top.let
    ///   Shapes/
    ///     Circle.let          protected radius, private area, internal draw, public unit
    ///     Square.let
    ///     Solid/Cube.let
    ///   Other/Line.let
    fn shapes() -> ModuleTree {
        let core = PackageSource::new(
            "acme.shapes",
            DirectorySource::new("src")
                .with_file(FileSource::new("Top"))
                .with_dir(
                    DirectorySource::new("Shapes")
                        .with_file(
                            FileSource::new("Circle")
                                .function("radius", Visibility::Protected)
                                .function("area", Visibility::Private)
                                .function("draw", Visibility::Internal)
                                .type_decl("Unit", Visibility::Public),
                        )
                        .with_file(FileSource::new("Square"))
                        .with_dir(DirectorySource::new("Solid").with_file(FileSource::new("Cube"))),
                )
                .with_dir(DirectorySource::new("Other").with_file(FileSource::new("Line"))),
        );
        let app = PackageSource::new("acme.app", DirectorySource::new("src").with_file(FileSource::new("Main")))
            .with_dependency("acme.shapes");

        let mut builder = TreeBuilder::new();
        builder.add_package(&core);
        builder.add_package(&app);
        builder.finish().0
    }

    fn module(tree: &ModuleTree, package: &str, path: &[&str]) -> ModuleId {
        let pkg = tree.package_by_name(package).unwrap();
        let path: Vec<String> = path.iter().map(|s| s.to_string()).collect();
        tree.production_module(pkg, &path).unwrap()
    }

    fn decl(tree: &ModuleTree, name: &str) -> DeclId {
        let circle = module(tree, "acme.shapes", &["Shapes", "Circle"]);
        tree.find_declaration(circle, name).unwrap()
    }

    #[test]
    fn test_keywords() {
        assert_eq!(Visibility::from_keyword("export"), Some(Visibility::Public));
        assert_eq!(Visibility::from_keyword("protected"), Some(Visibility::Protected));
        assert_eq!(Visibility::from_keyword("pub"), None);
        assert_eq!(Visibility::default(), Visibility::Private);
        assert_eq!(Visibility::Internal.to_string(), "internal");
    }

    #[test]
    fn test_private_only_owner() {
        let tree = shapes();
        let oracle = VisibilityOracle::new(&tree);
        let area = decl(&tree, "area");

        assert!(oracle.visible(area, module(&tree, "acme.shapes", &["Shapes", "Circle"])));
        assert!(!oracle.visible(area, module(&tree, "acme.shapes", &["Shapes", "Square"])));
    }

    #[test]
    fn test_protected_reaches_down_not_up() {
        let tree = shapes();
        let oracle = VisibilityOracle::new(&tree);
        let radius = decl(&tree, "radius");

        assert!(oracle.visible(radius, module(&tree, "acme.shapes", &["Shapes", "Square"])));
        assert!(oracle.visible(radius, module(&tree, "acme.shapes", &["Shapes", "Solid", "Cube"])));
        assert!(!oracle.visible(radius, module(&tree, "acme.shapes", &["Top"])));
        assert!(!oracle.visible(radius, module(&tree, "acme.shapes", &["Other", "Line"])));
    }

    #[test]
    fn test_internal_is_package_wide() {
        let tree = shapes();
        let oracle = VisibilityOracle::new(&tree);
        let draw = decl(&tree, "draw");

        assert!(oracle.visible(draw, module(&tree, "acme.shapes", &["Other", "Line"])));
        assert!(oracle.visible(draw, module(&tree, "acme.shapes", &["Top"])));
        assert!(!oracle.visible(draw, module(&tree, "acme.app", &["Main"])));
    }

    #[test]
    fn test_public_crosses_packages() {
        let tree = shapes();
        let oracle = VisibilityOracle::new(&tree);
        assert!(oracle.visible(decl(&tree, "Unit"), module(&tree, "acme.app", &["Main"])));
    }
}

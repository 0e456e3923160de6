//! Stable identifier types for the module tree
//!
//! The tree stores packages, directories, modules and declarations in arena
//! vectors; these newtypes index into them so lookups never go through names.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! arena_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub u32);

        impl $name {
            pub fn new(id: u32) -> Self {
                Self(id)
            }

            pub fn as_u32(self) -> u32 {
                self.0
            }

            pub(crate) fn index(self) -> usize {
                self.0 as usize
            }

            pub(crate) fn from_index(index: usize) -> Self {
                Self(index as u32)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "_{}"), self.0)
            }
        }
    };
}

arena_id!(
    /// Unique identifier for a module (one source file)
    ModuleId,
    "mod"
);

arena_id!(
    /// Unique identifier for a directory node
    DirId,
    "dir"
);

arena_id!(
    /// Unique identifier for a declaration
    DeclId,
    "decl"
);

arena_id!(
    /// Unique identifier for a package
    PackageId,
    "pkg"
);

//! Resolver configuration
//!
//! Defaults mirror the standard package layout: production sources under
//! `src/`, tests under `test/`, `.let` files, test modules suffixed `Test`.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Directory (relative to the package directory) holding production sources
    pub source_dir: String,
    /// Directory (relative to the package directory) holding test sources
    pub test_dir: String,
    /// Source file extension, without the dot
    pub extension: String,
    /// Suffix that turns a production module name into its test module name
    pub test_suffix: String,
    /// Resolve imports of distinct modules in parallel
    pub parallel: bool,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            source_dir: "src".to_string(),
            test_dir: "test".to_string(),
            extension: "let".to_string(),
            test_suffix: "Test".to_string(),
            parallel: true,
        }
    }
}

impl ResolverConfig {
    /// Production module name a test module name claims, if it carries the suffix.
    pub fn production_name<'a>(&self, test_module: &'a str) -> Option<&'a str> {
        test_module
            .strip_suffix(self.test_suffix.as_str())
            .filter(|name| !name.is_empty())
    }
}

//! Error types for the Let resolver
//!
//! Every failure is local to one import item, one re-export or one layout
//! decision. Layout failures (`AmbiguousFold`, `DuplicateModule`,
//! `DuplicatePackage`) abort construction of the enclosing package only.

use codespan::{FileId, Span};
use let_diagnostics::{Diagnostic, Label, help};
use std::fmt;

use crate::visibility::Visibility;

#[derive(Debug, Clone, PartialEq)]
pub struct ResolveError {
    pub kind: ResolveErrorKind,
    pub span: Option<Span>,
    pub file_id: Option<FileId>,
}

impl ResolveError {
    pub fn new(kind: ResolveErrorKind) -> Self {
        Self {
            kind,
            span: None,
            file_id: None,
        }
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }

    pub fn with_file(mut self, file_id: FileId) -> Self {
        self.file_id = Some(file_id);
        self
    }

    /// Attach whatever location information is available.
    pub fn at(mut self, file_id: Option<FileId>, span: Option<Span>) -> Self {
        if self.file_id.is_none() {
            self.file_id = file_id;
        }
        if self.span.is_none() {
            self.span = span;
        }
        self
    }

    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    pub fn is_fatal(&self) -> bool {
        self.kind.is_fatal()
    }

    /// Convert to a diagnostic for reporting
    pub fn to_diagnostic(&self) -> Diagnostic<FileId> {
        let mut diagnostic = Diagnostic::error()
            .with_message(self.kind.message())
            .with_code(self.kind.code());

        if let (Some(file_id), Some(span)) = (self.file_id, self.span) {
            diagnostic = diagnostic.with_labels(vec![
                Label::primary(file_id, span).with_message(self.kind.label_message()),
            ]);
        }

        if let Some(note) = self.kind.note() {
            diagnostic = diagnostic.with_notes(vec![note]);
        }

        diagnostic
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ResolveErrorKind {
    /// Short-form import whose target is outside the importer's directory subtree
    NotInScope {
        module_name: String,
        from_module: String,
        candidates: Vec<String>,
    },

    /// A full-path segment is missing
    PathNotFound {
        path: String,
        missing_segment: String,
        hint: Option<PathHint>,
    },

    /// The target module exists but does not export the name
    NameNotExported {
        name: String,
        module_path: String,
        available: Vec<String>,
    },

    /// The requester may not see the declaration, or the whole module is hidden
    /// from it (`name` is `None` in that case)
    NotVisible {
        name: Option<String>,
        module_path: String,
        from_module: String,
        visibility: Option<Visibility>,
    },

    /// More than one module named after its directory
    AmbiguousFold { directory: String, candidates: usize },

    /// More than one test module claims the same production module
    DuplicateTestPairing {
        test_module: String,
        production_module: String,
        paired_with: String,
    },

    /// Two modules would own the same qualified path
    DuplicateModule { module_path: String },

    /// A name declared twice in one module
    DuplicateDeclaration { name: String, module_path: String },

    /// Re-exports that lead back to themselves
    CircularReexport { cycle: Vec<String> },

    /// A module importing from itself
    SelfImport { module_path: String },

    /// Two imports binding the same local name
    DuplicateImport { name: String, module_path: String },

    /// Two packages with one identifier
    DuplicatePackage { name: String },

    /// A declared dependency that was never loaded
    UnknownPackage { name: String, dependent: String },
}

impl ResolveErrorKind {
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotInScope { .. } => "E0101",
            Self::PathNotFound { .. } => "E0102",
            Self::NameNotExported { .. } => "E0103",
            Self::NotVisible { .. } => "E0104",
            Self::AmbiguousFold { .. } => "E0105",
            Self::DuplicateTestPairing { .. } => "E0106",
            Self::DuplicateModule { .. } => "E0107",
            Self::DuplicateDeclaration { .. } => "E0108",
            Self::CircularReexport { .. } => "E0109",
            Self::SelfImport { .. } => "E0110",
            Self::DuplicateImport { .. } => "E0111",
            Self::DuplicatePackage { .. } => "E0112",
            Self::UnknownPackage { .. } => "E0113",
        }
    }

    /// Layout errors that abort construction of the enclosing package
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::AmbiguousFold { .. } | Self::DuplicateModule { .. } | Self::DuplicatePackage { .. }
        )
    }

    pub fn message(&self) -> String {
        match self {
            Self::NotInScope {
                module_name,
                from_module,
                ..
            } => format!(
                "Module `{}` is not in scope of `{}`",
                module_name, from_module
            ),
            Self::PathNotFound { path, .. } => format!("Module path `{}` not found", path),
            Self::NameNotExported {
                name, module_path, ..
            } => format!("`{}` is not exported by module `{}`", name, module_path),
            Self::NotVisible {
                name: Some(name),
                module_path,
                ..
            } => format!("`{}` from module `{}` is not visible here", name, module_path),
            Self::NotVisible {
                name: None,
                module_path,
                ..
            } => format!("Module `{}` is not visible here", module_path),
            Self::AmbiguousFold {
                directory,
                candidates,
            } => format!(
                "Directory `{}` has {} modules named `{}`",
                directory,
                candidates,
                directory.rsplit("::").next().unwrap_or(directory)
            ),
            Self::DuplicateTestPairing {
                test_module,
                production_module,
                ..
            } => format!(
                "Test module `{}` pairs with `{}`, which already has a test module",
                test_module, production_module
            ),
            Self::DuplicateModule { module_path } => {
                format!("Module `{}` is defined more than once", module_path)
            }
            Self::DuplicateDeclaration { name, module_path } => format!(
                "`{}` is already declared in module `{}`",
                name, module_path
            ),
            Self::CircularReexport { .. } => "Circular re-export detected".to_string(),
            Self::SelfImport { module_path } => {
                format!("Module `{}` cannot import from itself", module_path)
            }
            Self::DuplicateImport { name, module_path } => format!(
                "`{}` is imported more than once in module `{}`",
                name, module_path
            ),
            Self::DuplicatePackage { name } => {
                format!("Package `{}` is defined more than once", name)
            }
            Self::UnknownPackage { name, dependent } => format!(
                "Package `{}` depends on `{}`, which is not loaded",
                dependent, name
            ),
        }
    }

    pub fn label_message(&self) -> String {
        match self {
            Self::NotInScope { .. } => "not a sibling or nested module".to_string(),
            Self::PathNotFound {
                missing_segment, ..
            } => format!("no module `{}` at this path", missing_segment),
            Self::NameNotExported { name, .. } => format!("`{}` not exported", name),
            Self::NotVisible {
                visibility: Some(visibility),
                ..
            } => format!("{} declaration", visibility),
            Self::NotVisible { .. } => "hidden module".to_string(),
            Self::AmbiguousFold { .. } => "ambiguous fold target".to_string(),
            Self::DuplicateTestPairing { .. } => "second test module".to_string(),
            Self::DuplicateModule { .. } => "duplicate module".to_string(),
            Self::DuplicateDeclaration { name, .. } => format!("`{}` redeclared here", name),
            Self::CircularReexport { .. } => "re-export cycle".to_string(),
            Self::SelfImport { .. } => "self-import".to_string(),
            Self::DuplicateImport { name, .. } => format!("`{}` imported again", name),
            Self::DuplicatePackage { .. } => "duplicate package".to_string(),
            Self::UnknownPackage { .. } => "unknown package".to_string(),
        }
    }

    pub fn note(&self) -> Option<String> {
        match self {
            Self::NotInScope { candidates, .. } if !candidates.is_empty() => Some(help(format!(
                "use the full path of one of: {}",
                candidates.join(", ")
            ))),
            Self::NotInScope { .. } => Some(help(
                "short-form imports only reach sibling and nested modules",
            )),
            Self::PathNotFound {
                hint: Some(hint), ..
            } => Some(hint.note()),
            Self::NameNotExported { available, .. } if !available.is_empty() => {
                Some(format!("Exported items: {}", available.join(", ")))
            }
            Self::NotVisible {
                from_module,
                name: None,
                ..
            } => Some(format!(
                "nothing in this module is visible from `{}`",
                from_module
            )),
            Self::DuplicateTestPairing { paired_with, .. } => {
                Some(format!("already paired with `{}`", paired_with))
            }
            Self::CircularReexport { cycle } => {
                Some(format!("Re-export cycle: {}", cycle.join(" -> ")))
            }
            _ => None,
        }
    }
}

/// Extra context for a failed full-path walk
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathHint {
    /// The written path is the tail of exactly one module path
    DidYouMean(String),
    /// The first segment names a package the importer does not depend on
    NotADependency { package: String },
    /// The final segment names a directory without a folding module
    NotFolded { directory: String },
}

impl PathHint {
    pub fn note(&self) -> String {
        match self {
            Self::DidYouMean(path) => help(format!(
                "paths start at the package root: did you mean `{}`?",
                path
            )),
            Self::NotADependency { package } => help(format!(
                "add `{}` to the package dependencies to import from it",
                package
            )),
            Self::NotFolded { directory } => format!(
                "directory `{}` has no module named after it, so it cannot be imported",
                directory
            ),
        }
    }
}

impl fmt::Display for ResolveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind.code(), self.kind.message())
    }
}

impl std::error::Error for ResolveError {}

/// Helper functions for common error creation
impl ResolveError {
    pub fn not_in_scope(
        module_name: impl Into<String>,
        from_module: impl Into<String>,
        candidates: Vec<String>,
    ) -> Self {
        Self::new(ResolveErrorKind::NotInScope {
            module_name: module_name.into(),
            from_module: from_module.into(),
            candidates,
        })
    }

    pub fn path_not_found(
        path: impl Into<String>,
        missing_segment: impl Into<String>,
        hint: Option<PathHint>,
    ) -> Self {
        Self::new(ResolveErrorKind::PathNotFound {
            path: path.into(),
            missing_segment: missing_segment.into(),
            hint,
        })
    }

    pub fn name_not_exported(
        name: impl Into<String>,
        module_path: impl Into<String>,
        available: Vec<String>,
    ) -> Self {
        Self::new(ResolveErrorKind::NameNotExported {
            name: name.into(),
            module_path: module_path.into(),
            available,
        })
    }

    pub fn not_visible(
        name: impl Into<String>,
        module_path: impl Into<String>,
        from_module: impl Into<String>,
        visibility: Visibility,
    ) -> Self {
        Self::new(ResolveErrorKind::NotVisible {
            name: Some(name.into()),
            module_path: module_path.into(),
            from_module: from_module.into(),
            visibility: Some(visibility),
        })
    }

    pub fn module_hidden(module_path: impl Into<String>, from_module: impl Into<String>) -> Self {
        Self::new(ResolveErrorKind::NotVisible {
            name: None,
            module_path: module_path.into(),
            from_module: from_module.into(),
            visibility: None,
        })
    }
}

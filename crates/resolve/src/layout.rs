//! Layout records consumed by the tree builder
//!
//! These are the resolver's only inputs from the front end: a directory
//! listing per package and, per file, its ordered declaration headers and
//! import statements. Bodies never reach the resolver.

use codespan::{FileId, Span};
use std::fmt;

use crate::visibility::Visibility;

/// A package as supplied by the loader: identifier, declared dependencies and
/// the two roots.
#[derive(Debug, Clone)]
pub struct PackageSource {
    pub name: String,
    pub dependencies: Vec<String>,
    pub source_root: DirectorySource,
    pub test_root: Option<DirectorySource>,
}

impl PackageSource {
    pub fn new(name: impl Into<String>, source_root: DirectorySource) -> Self {
        Self {
            name: name.into(),
            dependencies: Vec::new(),
            source_root,
            test_root: None,
        }
    }

    pub fn with_dependency(mut self, name: impl Into<String>) -> Self {
        self.dependencies.push(name.into());
        self
    }

    pub fn with_tests(mut self, test_root: DirectorySource) -> Self {
        self.test_root = Some(test_root);
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct DirectorySource {
    pub name: String,
    pub files: Vec<FileSource>,
    pub directories: Vec<DirectorySource>,
}

impl DirectorySource {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            files: Vec::new(),
            directories: Vec::new(),
        }
    }

    pub fn with_file(mut self, file: FileSource) -> Self {
        self.files.push(file);
        self
    }

    pub fn with_dir(mut self, dir: DirectorySource) -> Self {
        self.directories.push(dir);
        self
    }
}

/// One source file: its module name (file stem) and outline.
#[derive(Debug, Clone, Default)]
pub struct FileSource {
    pub name: String,
    pub file_id: Option<FileId>,
    pub declarations: Vec<DeclarationRecord>,
    pub imports: Vec<ImportStatement>,
}

impl FileSource {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_file_id(mut self, file_id: FileId) -> Self {
        self.file_id = Some(file_id);
        self
    }

    pub fn function(mut self, name: &str, visibility: Visibility) -> Self {
        self.declarations
            .push(DeclarationRecord::new(name, visibility, DeclKind::Function));
        self
    }

    pub fn type_decl(mut self, name: &str, visibility: Visibility) -> Self {
        self.declarations
            .push(DeclarationRecord::new(name, visibility, DeclKind::Type));
        self
    }

    /// `visibility fun name from path;`
    pub fn reexport(mut self, name: &str, visibility: Visibility, path: &str) -> Self {
        self.declarations.push(
            DeclarationRecord::new(name, visibility, DeclKind::Reexport)
                .with_reexport(ImportPath::parse(path)),
        );
        self
    }

    /// `import { items } from path;` where an item may be written `name as alias`.
    pub fn import(mut self, path: &str, items: &[&str]) -> Self {
        let items = items.iter().map(|item| ImportItem::parse(item)).collect();
        self.imports.push(ImportStatement::new(ImportPath::parse(path), items));
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeclKind {
    Function,
    Type,
    Reexport,
}

impl DeclKind {
    pub fn description(self) -> &'static str {
        match self {
            Self::Function => "function",
            Self::Type => "type",
            Self::Reexport => "re-export",
        }
    }
}

#[derive(Debug, Clone)]
pub struct DeclarationRecord {
    pub name: String,
    pub visibility: Visibility,
    pub kind: DeclKind,
    /// Where a re-export republishes its name from
    pub reexport: Option<ImportPath>,
    pub span: Option<Span>,
}

impl DeclarationRecord {
    pub fn new(name: impl Into<String>, visibility: Visibility, kind: DeclKind) -> Self {
        Self {
            name: name.into(),
            visibility,
            kind,
            reexport: None,
            span: None,
        }
    }

    pub fn with_reexport(mut self, path: ImportPath) -> Self {
        self.kind = DeclKind::Reexport;
        self.reexport = Some(path);
        self
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }
}

/// `import { items } from path;`
#[derive(Debug, Clone)]
pub struct ImportStatement {
    pub path: ImportPath,
    pub items: Vec<ImportItem>,
    pub span: Option<Span>,
}

impl ImportStatement {
    pub fn new(path: ImportPath, items: Vec<ImportItem>) -> Self {
        Self {
            path,
            items,
            span: None,
        }
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }
}

/// A `::`-separated module path as written in source.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImportPath {
    pub segments: Vec<String>,
    pub span: Option<Span>,
}

impl ImportPath {
    pub fn new(segments: Vec<String>) -> Self {
        Self {
            segments,
            span: None,
        }
    }

    pub fn parse(text: &str) -> Self {
        Self::new(
            text.split("::")
                .map(|segment| segment.trim().to_string())
                .filter(|segment| !segment.is_empty())
                .collect(),
        )
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }

    /// A bare module name (no `::`) is written in short form.
    pub fn is_short_form(&self) -> bool {
        self.segments.len() == 1
    }
}

impl fmt::Display for ImportPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments.join("::"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportItem {
    pub name: String,
    pub alias: Option<String>,
    pub span: Option<Span>,
}

impl ImportItem {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            alias: None,
            span: None,
        }
    }

    /// `name` or `name as alias`
    pub fn parse(text: &str) -> Self {
        match text.split_once(" as ") {
            Some((name, alias)) => Self::new(name.trim()).with_alias(alias.trim()),
            None => Self::new(text.trim()),
        }
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }

    /// Name the binding introduces in the importing module.
    pub fn local_name(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }
}

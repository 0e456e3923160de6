#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![deny(unused_must_use)]

/*!
Let Syntax (outline front end)

This crate reads Let sources only as far as module resolution needs:
- `lexer`: a `logos` tokenizer with comments and whitespace skipped
- `outline`: import statements and top-level declaration headers; bodies are
  skipped by bracket balancing
- `loader`: package directories (`let.json`, `src/`, `test/`) into the layout
  records consumed by `let-resolve`

API notes:
- Readers take codespan `Files` and a `FileId` so diagnostics stay consistent
  with the resolver's.
- Syntax problems are returned as codespan-reporting diagnostics (code
  `E0001`); reading always recovers and yields a partial outline.
*/

pub mod lexer;
pub mod loader;
pub mod outline;

pub use lexer::{Lexer, Token, lex};
pub use loader::{
    LoadError, LoadedPackage, MANIFEST_FILE, PackageManifest, load_package, load_packages,
    read_manifest,
};
pub use outline::{Outline, SYNTAX_ERROR, parse_outline, read_outline};

use codespan::{FileId, Files};
use let_diagnostics::Diag;
use let_resolve::FileSource;

/// Outline a registered file, failing if it has any syntax error.
///
/// The module name is the file name's stem.
pub fn parse(files: &Files<String>, file_id: FileId) -> Result<FileSource, Vec<Diag>> {
    let name = files.name(file_id).to_string_lossy().into_owned();
    let stem = std::path::Path::new(&name)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or(name);
    let outline = read_outline(files, file_id, &stem);
    if outline.has_errors() {
        Err(outline.diagnostics)
    } else {
        Ok(outline.file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_uses_file_stem_as_module_name() {
        let mut files = Files::<String>::new();
        let fid = files.add(
            "src/Iterables/Set/SetHelpers.let".to_string(),
            "import { partition } from Iterables::List::Partition;\npublic fun union(): Int = 0".to_string(),
        );
        let file = parse(&files, fid).unwrap();
        assert_eq!(file.name, "SetHelpers");
        assert_eq!(file.file_id, Some(fid));
        assert_eq!(file.imports.len(), 1);
        assert_eq!(file.declarations.len(), 1);
    }

    #[test]
    fn parse_fails_on_syntax_error() {
        let mut files = Files::<String>::new();
        let fid = files.add("Bad.let".to_string(), "public 42".to_string());
        let diags = parse(&files, fid).unwrap_err();
        assert_eq!(diags[0].code.as_deref(), Some(SYNTAX_ERROR));
    }
}

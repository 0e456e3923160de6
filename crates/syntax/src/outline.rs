//! Declaration outline reader
//!
//! Reads only what module resolution needs from a source file: import
//! statements and the headers of top-level declarations. Everything after a
//! declaration header is a body; it is skipped by balancing brackets until
//! the next top-level keyword at depth zero.

use codespan::{FileId, Files, Span};
use let_diagnostics::{Diag, error_with, help, label_secondary};
use let_resolve::{DeclKind, DeclarationRecord, FileSource, ImportItem, ImportPath, ImportStatement, Visibility};
use tracing::trace;

use crate::lexer::{Lexer, Token, lex};

/// Syntax error code used by the outline reader.
pub const SYNTAX_ERROR: &str = "E0001";

/// The outline of one file plus any syntax problems found while reading it.
#[derive(Debug, Clone)]
pub struct Outline {
    pub file: FileSource,
    pub diagnostics: Vec<Diag>,
}

impl Outline {
    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(let_diagnostics::is_error)
    }
}

/// Read the outline of a file already registered in `files`.
pub fn read_outline(files: &Files<String>, file_id: FileId, module_name: &str) -> Outline {
    let tokens = Lexer::new(files, file_id).tokens();
    OutlineParser::new(tokens, file_id, module_name).run()
}

/// Read the outline of `source`, attributing spans to `file_id`.
pub fn parse_outline(module_name: &str, file_id: FileId, source: &str) -> Outline {
    OutlineParser::new(lex(source), file_id, module_name).run()
}

/// Raised inside the parser; converted to a diagnostic at the item boundary.
struct Unexpected {
    expected: &'static str,
    span: Span,
    found: Option<String>,
}

struct OutlineParser {
    tokens: Vec<(Token, Span)>,
    pos: usize,
    file_id: FileId,
    file: FileSource,
    diagnostics: Vec<Diag>,
}

impl OutlineParser {
    fn new(tokens: Vec<(Token, Span)>, file_id: FileId, module_name: &str) -> Self {
        Self {
            tokens,
            pos: 0,
            file_id,
            file: FileSource::new(module_name).with_file_id(file_id),
            diagnostics: Vec::new(),
        }
    }

    fn run(mut self) -> Outline {
        while let Some((token, span)) = self.peek().cloned() {
            let result = match token {
                Token::KwImport => self.import_statement(),
                t if t.starts_item() => self.declaration(),
                other => {
                    self.diagnostics.push(
                        error_with(
                            SYNTAX_ERROR,
                            format!("expected `import`, `fun` or `type`, found {}", other.describe()),
                            self.file_id,
                            span,
                        )
                        .with_notes(vec![help(
                            "top-level forms are import statements and `fun`/`type` declarations",
                        )]),
                    );
                    self.pos += 1;
                    self.skip_body();
                    continue;
                }
            };

            if let Err(unexpected) = result {
                self.report(unexpected);
                self.skip_body();
            }
        }

        trace!(
            module = %self.file.name,
            declarations = self.file.declarations.len(),
            imports = self.file.imports.len(),
            "outline read"
        );
        Outline {
            file: self.file,
            diagnostics: self.diagnostics,
        }
    }

    // ---------------------------------------------------------------------------------------------
    // Items
    // ---------------------------------------------------------------------------------------------

    /// `import { a, b as c } from Path ;?`
    fn import_statement(&mut self) -> Result<(), Unexpected> {
        let start = self.bump_span();
        self.expect(Token::LBrace, "`{`")?;

        let mut items = Vec::new();
        loop {
            if self.eat(&Token::RBrace).is_some() {
                break;
            }
            let (name, name_span) = self.ident("an imported name")?;
            let mut item = ImportItem::new(name);
            let mut end = name_span;
            if self.eat(&Token::KwAs).is_some() {
                let (alias, alias_span) = self.ident("an alias after `as`")?;
                item = item.with_alias(alias);
                end = alias_span;
            }
            items.push(item.with_span(join(name_span, end)));

            if self.eat(&Token::Comma).is_none() {
                self.expect(Token::RBrace, "`,` or `}`")?;
                break;
            }
        }

        let from = self.expect(Token::KwFrom, "`from`")?;
        let path = self.path()?;
        let end = self
            .eat(&Token::Semi)
            .or(path.span)
            .unwrap_or(from);

        if items.is_empty() {
            self.diagnostics.push(
                let_diagnostics::warning("import statement imports nothing", self.file_id, join(start, end)),
            );
        }

        self.file
            .imports
            .push(ImportStatement::new(path, items).with_span(join(start, end)));
        Ok(())
    }

    /// `[tier] (fun|type) name ...` or `[tier] (fun|type) name from Path ;?`
    fn declaration(&mut self) -> Result<(), Unexpected> {
        let (first, start) = self.peek().cloned().ok_or_else(|| self.eof("a declaration"))?;

        let visibility = match first {
            Token::KwPrivate => Some(Visibility::Private),
            Token::KwProtected => Some(Visibility::Protected),
            Token::KwInternal => Some(Visibility::Internal),
            Token::KwPublic | Token::KwExport => Some(Visibility::Public),
            _ => None,
        };
        if visibility.is_some() {
            self.pos += 1;
        }
        let visibility = visibility.unwrap_or_default();

        let kind = match self.peek() {
            Some((Token::KwFun, _)) => DeclKind::Function,
            Some((Token::KwType, _)) => DeclKind::Type,
            _ => return Err(self.unexpected("`fun` or `type`")),
        };
        self.pos += 1;

        let (name, name_span) = self.ident("a declaration name")?;
        let mut record = DeclarationRecord::new(name, visibility, kind);

        if self.eat(&Token::KwFrom).is_some() {
            let path = self.path()?;
            let end = self.eat(&Token::Semi).or(path.span).unwrap_or(name_span);
            record = record.with_reexport(path).with_span(join(start, end));
        } else {
            record = record.with_span(join(start, name_span));
            self.skip_body();
        }

        self.file.declarations.push(record);
        Ok(())
    }

    /// `Seg (:: Seg)*`, where only the first segment may be a dotted package name.
    fn path(&mut self) -> Result<ImportPath, Unexpected> {
        let (first, first_span) = match self.peek().cloned() {
            Some((Token::Ident(name) | Token::DottedIdent(name), span)) => {
                self.pos += 1;
                (name, span)
            }
            _ => return Err(self.unexpected("a module path")),
        };

        let mut segments = vec![first];
        let mut end = first_span;
        while self.eat(&Token::ColonColon).is_some() {
            let (segment, span) = self.ident("a path segment after `::`")?;
            segments.push(segment);
            end = span;
        }
        Ok(ImportPath::new(segments).with_span(join(first_span, end)))
    }

    /// Advance past a declaration body: stop before the next item starter at
    /// bracket depth zero. Semicolons do not end bodies.
    fn skip_body(&mut self) {
        let mut depth: usize = 0;
        while let Some((token, _)) = self.peek() {
            if depth == 0 && token.starts_item() {
                return;
            }
            if token.opens() {
                depth += 1;
            } else if token.closes() {
                depth = depth.saturating_sub(1);
            }
            self.pos += 1;
        }
    }

    // ---------------------------------------------------------------------------------------------
    // Token helpers
    // ---------------------------------------------------------------------------------------------

    fn peek(&self) -> Option<&(Token, Span)> {
        self.tokens.get(self.pos)
    }

    fn bump_span(&mut self) -> Span {
        let span = self
            .peek()
            .map(|(_, span)| *span)
            .unwrap_or_else(|| self.end_span());
        self.pos += 1;
        span
    }

    fn eat(&mut self, expected: &Token) -> Option<Span> {
        match self.peek() {
            Some((token, span)) if token == expected => {
                let span = *span;
                self.pos += 1;
                Some(span)
            }
            _ => None,
        }
    }

    fn expect(&mut self, expected: Token, what: &'static str) -> Result<Span, Unexpected> {
        self.eat(&expected).ok_or_else(|| self.unexpected(what))
    }

    fn ident(&mut self, what: &'static str) -> Result<(String, Span), Unexpected> {
        match self.peek().cloned() {
            Some((Token::Ident(name), span)) => {
                self.pos += 1;
                Ok((name, span))
            }
            _ => Err(self.unexpected(what)),
        }
    }

    fn unexpected(&self, expected: &'static str) -> Unexpected {
        match self.peek() {
            Some((token, span)) => Unexpected {
                expected,
                span: *span,
                found: Some(token.describe()),
            },
            None => self.eof(expected),
        }
    }

    fn eof(&self, expected: &'static str) -> Unexpected {
        Unexpected {
            expected,
            span: self.end_span(),
            found: None,
        }
    }

    fn end_span(&self) -> Span {
        self.tokens
            .last()
            .map(|(_, span)| Span::new(span.end(), span.end()))
            .unwrap_or_else(Span::initial)
    }

    fn report(&mut self, unexpected: Unexpected) {
        let found = unexpected
            .found
            .unwrap_or_else(|| "end of file".to_string());
        let mut diag = error_with(
            SYNTAX_ERROR,
            format!("expected {}, found {}", unexpected.expected, found),
            self.file_id,
            unexpected.span,
        );
        if let Some((_, start)) = self.item_start()
            && start != unexpected.span
        {
            diag = diag.with_labels(vec![label_secondary(self.file_id, start, "in this item")]);
        }
        self.diagnostics.push(diag);
    }

    /// Nearest item starter at or before the current position.
    fn item_start(&self) -> Option<(Token, Span)> {
        if self.tokens.is_empty() {
            return None;
        }
        let upto = self.pos.min(self.tokens.len().saturating_sub(1));
        self.tokens[..=upto]
            .iter()
            .rev()
            .find(|(token, _)| token.starts_item())
            .cloned()
    }
}

fn join(start: Span, end: Span) -> Span {
    start.merge(end)
}

use codespan::{FileId, Files, Span};
use logos::Logos;

#[derive(Logos, Debug, PartialEq, Clone)]
pub enum Token {
    #[token("import")]
    KwImport,
    #[token("from")]
    KwFrom,
    #[token("as")]
    KwAs,
    #[token("fun")]
    KwFun,
    #[token("type")]
    KwType,

    #[token("private")]
    KwPrivate,
    #[token("protected")]
    KwProtected,
    #[token("internal")]
    KwInternal,
    #[token("public")]
    KwPublic,
    #[token("export")]
    KwExport,

    #[token("::")]
    ColonColon,
    #[token(":")]
    Colon,
    #[token("=")]
    Eq,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token(",")]
    Comma,
    #[token(";")]
    Semi,

    #[regex(r#""([^"\\]|\\.)*""#, |lex| lex.slice()[1..lex.slice().len()-1].to_string())]
    Str(String),

    #[regex(r"[0-9]+(\.[0-9]+)?", |lex| lex.slice().to_string())]
    Number(String),

    /// Package identifiers such as `acme.collections`
    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*(\.[a-zA-Z_][a-zA-Z0-9_]*)+", |lex| lex.slice().to_string())]
    DottedIdent(String),

    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*", |lex| lex.slice().to_string())]
    Ident(String),

    #[regex(r"[ \t\r\n\f]+", logos::skip)]
    Whitespace,

    #[regex(r"//[^\n]*", logos::skip)]
    SingleLineComment,

    #[regex(r"/\*[^*]*\*+(?:[^/*][^*]*\*+)*/", logos::skip)]
    MultiLineComment,

    /// Any character the outline reader has no token for (operators in bodies)
    Unknown(String),
}

impl Token {
    /// Can this token begin a top-level form?
    pub fn starts_item(&self) -> bool {
        matches!(
            self,
            Token::KwImport
                | Token::KwFun
                | Token::KwType
                | Token::KwPrivate
                | Token::KwProtected
                | Token::KwInternal
                | Token::KwPublic
                | Token::KwExport
        )
    }

    pub fn is_tier(&self) -> bool {
        matches!(
            self,
            Token::KwPrivate
                | Token::KwProtected
                | Token::KwInternal
                | Token::KwPublic
                | Token::KwExport
        )
    }

    pub fn opens(&self) -> bool {
        matches!(self, Token::LParen | Token::LBrace | Token::LBracket)
    }

    pub fn closes(&self) -> bool {
        matches!(self, Token::RParen | Token::RBrace | Token::RBracket)
    }

    /// Short human description used in syntax errors.
    pub fn describe(&self) -> String {
        match self {
            Token::Ident(name) | Token::DottedIdent(name) => format!("identifier `{}`", name),
            Token::Str(_) => "string literal".to_string(),
            Token::Number(n) => format!("number `{}`", n),
            Token::Unknown(text) => format!("`{}`", text),
            Token::KwImport => "`import`".to_string(),
            Token::KwFrom => "`from`".to_string(),
            Token::KwAs => "`as`".to_string(),
            Token::KwFun => "`fun`".to_string(),
            Token::KwType => "`type`".to_string(),
            Token::KwPrivate => "`private`".to_string(),
            Token::KwProtected => "`protected`".to_string(),
            Token::KwInternal => "`internal`".to_string(),
            Token::KwPublic => "`public`".to_string(),
            Token::KwExport => "`export`".to_string(),
            Token::ColonColon => "`::`".to_string(),
            Token::Colon => "`:`".to_string(),
            Token::Eq => "`=`".to_string(),
            Token::LParen => "`(`".to_string(),
            Token::RParen => "`)`".to_string(),
            Token::LBrace => "`{`".to_string(),
            Token::RBrace => "`}`".to_string(),
            Token::LBracket => "`[`".to_string(),
            Token::RBracket => "`]`".to_string(),
            Token::Comma => "`,`".to_string(),
            Token::Semi => "`;`".to_string(),
            Token::Whitespace | Token::SingleLineComment | Token::MultiLineComment => {
                "whitespace".to_string()
            }
        }
    }
}

/// Tokenize `source`. Characters without a token become [`Token::Unknown`].
pub fn lex(source: &str) -> Vec<(Token, Span)> {
    let mut lexer = Token::lexer(source);
    let mut out = Vec::new();
    while let Some(result) = lexer.next() {
        let range = lexer.span();
        let span = Span::new(range.start as u32, range.end as u32);
        match result {
            Ok(token) => out.push((token, span)),
            Err(()) => out.push((Token::Unknown(lexer.slice().to_string()), span)),
        }
    }
    out
}

pub struct Lexer<'a> {
    pub(crate) files: &'a Files<String>,
    pub(crate) file_id: FileId,
}

impl<'a> Lexer<'a> {
    pub fn new(files: &'a Files<String>, file_id: FileId) -> Self {
        Self { files, file_id }
    }

    pub fn tokens(&self) -> Vec<(Token, Span)> {
        lex(self.files.source(self.file_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<Token> {
        lex(source).into_iter().map(|(token, _)| token).collect()
    }

    #[test]
    fn test_import_statement_tokens() {
        assert_eq!(
            kinds("import { a, b as c } from acme.text::StringUtils;"),
            vec![
                Token::KwImport,
                Token::LBrace,
                Token::Ident("a".into()),
                Token::Comma,
                Token::Ident("b".into()),
                Token::KwAs,
                Token::Ident("c".into()),
                Token::RBrace,
                Token::KwFrom,
                Token::DottedIdent("acme.text".into()),
                Token::ColonColon,
                Token::Ident("StringUtils".into()),
                Token::Semi,
            ]
        );
    }

    #[test]
    fn test_keywords_need_word_boundary() {
        assert_eq!(kinds("funny types"), vec![
            Token::Ident("funny".into()),
            Token::Ident("types".into()),
        ]);
    }

    #[test]
    fn test_comments_and_strings_skip_brackets() {
        let tokens = kinds("// { \n /* ( */ \"}\" fun");
        assert_eq!(tokens, vec![Token::Str("}".into()), Token::KwFun]);
    }

    #[test]
    fn test_unknown_characters_keep_spans() {
        let tokens = lex("a + 1");
        assert_eq!(tokens[1].0, Token::Unknown("+".into()));
        assert_eq!(tokens[1].1, Span::new(2, 3));
        assert_eq!(tokens[2].0, Token::Number("1".into()));
    }

    #[test]
    fn test_lexer_reads_from_files() {
        let mut files = Files::<String>::new();
        let file_id = files.add("Main.let".to_string(), "export fun main".to_string());
        let tokens = Lexer::new(&files, file_id).tokens();
        assert_eq!(tokens.len(), 3);
        assert_eq!(tokens[2].1, Span::new(11, 15));
    }
}

//! Recursive-descent parser producing [`CompiledTemplate`]s.

use std::path::Path;

use panc_common::{TemplateName, TreePath};
use panc_source::{LineIndex, SourceLocation};

use crate::ast::{CompiledTemplate, Expr, Statement, TemplateKind};
use crate::error::SyntaxError;
use crate::lexer::{lex, unquote};
use crate::token::{describe, Token, TokenKind};
use crate::types::{BaseType, FullType, TypeRange};

/// The declared kind and name of a template.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TemplateHeader {
    /// The template kind.
    pub kind: TemplateKind,
    /// The declared name.
    pub name: TemplateName,
}

/// Reads and compiles a template file.
pub fn compile_file(path: &Path) -> Result<CompiledTemplate, SyntaxError> {
    let source = std::fs::read_to_string(path).map_err(|source| SyntaxError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    compile(path, &source)
}

/// Compiles template source text.
///
/// The declared name must match the tail of `path`: `ns/a` must live in
/// `<dir>/ns/a.pan` or `<dir>/ns/a.tpl`.
pub fn compile(path: &Path, source: &str) -> Result<CompiledTemplate, SyntaxError> {
    let tokens = lex(source, path)?;
    let mut parser = Parser::new(&tokens, source, path);
    let header = parser.header()?;
    check_name_matches_path(&header.name, path)?;
    let mut statements = Vec::new();
    while !parser.at(TokenKind::Eof) {
        statements.push(parser.statement(header.kind)?);
    }
    Ok(CompiledTemplate {
        name: header.name,
        kind: header.kind,
        file: path.to_path_buf(),
        statements,
    })
}

/// Parses only the header of a template.
///
/// Used to learn an object's name without compiling the whole file.
pub fn parse_header(path: &Path, source: &str) -> Result<TemplateHeader, SyntaxError> {
    let tokens = lex(source, path)?;
    Parser::new(&tokens, source, path).header()
}

fn check_name_matches_path(name: &TemplateName, path: &Path) -> Result<(), SyntaxError> {
    let matches = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| path.ends_with(name.local_path(&format!(".{e}"))))
        .unwrap_or(false);
    if matches {
        Ok(())
    } else {
        Err(SyntaxError::NameMismatch {
            path: path.to_path_buf(),
            declared: name.to_string(),
        })
    }
}

struct Parser<'a> {
    tokens: &'a [Token],
    source: &'a str,
    file: &'a Path,
    lines: LineIndex,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(tokens: &'a [Token], source: &'a str, file: &'a Path) -> Self {
        Self {
            tokens,
            source,
            file,
            lines: LineIndex::new(source),
            pos: 0,
        }
    }

    fn peek(&self) -> Token {
        self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn at(&self, kind: TokenKind) -> bool {
        self.peek().kind == kind
    }

    fn at_word(&self, word: &str) -> bool {
        let t = self.peek();
        t.kind == TokenKind::Word && t.text(self.source) == word
    }

    fn advance(&mut self) -> Token {
        let t = self.peek();
        if t.kind != TokenKind::Eof {
            self.pos += 1;
        }
        t
    }

    fn location(&self, token: Token) -> SourceLocation {
        self.lines.location(self.file, token.start)
    }

    fn error(&self, token: Token, message: impl Into<String>) -> SyntaxError {
        SyntaxError::Parse {
            location: self.location(token),
            message: message.into(),
        }
    }

    fn expect(&mut self, kind: TokenKind) -> Result<Token, SyntaxError> {
        let t = self.peek();
        if t.kind == kind {
            Ok(self.advance())
        } else {
            Err(self.error(
                t,
                format!("expected {}, found {}", describe(kind), describe(t.kind)),
            ))
        }
    }

    fn expect_word(&mut self, word: &str) -> Result<Token, SyntaxError> {
        if self.at_word(word) {
            Ok(self.advance())
        } else {
            let t = self.peek();
            Err(self.error(t, format!("expected '{word}'")))
        }
    }

    fn header(&mut self) -> Result<TemplateHeader, SyntaxError> {
        let kind = match self.peek() {
            t if t.kind == TokenKind::Word => match t.text(self.source) {
                "object" => TemplateKind::Object,
                "structure" => TemplateKind::Structure,
                "declaration" => TemplateKind::Declaration,
                "unique" => TemplateKind::Unique,
                _ => TemplateKind::Ordinary,
            },
            _ => TemplateKind::Ordinary,
        };
        if kind != TemplateKind::Ordinary {
            self.advance();
        }
        self.expect_word("template")?;
        let name = self.template_name()?;
        self.expect(TokenKind::Semi)?;
        Ok(TemplateHeader { kind, name })
    }

    fn template_name(&mut self) -> Result<TemplateName, SyntaxError> {
        let t = self.advance();
        let text = match t.kind {
            TokenKind::Word => t.text(self.source).to_string(),
            TokenKind::Str => unquote(t.text(self.source)),
            other => {
                return Err(self.error(
                    t,
                    format!("expected template name, found {}", describe(other)),
                ))
            }
        };
        TemplateName::parse(&text).map_err(|e| self.error(t, e.to_string()))
    }

    fn tree_path(&mut self) -> Result<(TreePath, Token), SyntaxError> {
        let t = self.expect(TokenKind::Str)?;
        let path = TreePath::parse(&unquote(t.text(self.source)))
            .map_err(|e| self.error(t, e.to_string()))?;
        Ok((path, t))
    }

    fn statement(&mut self, kind: TemplateKind) -> Result<Statement, SyntaxError> {
        let start = self.peek();
        let location = self.location(start);
        let stmt = if self.at_word("include") {
            self.advance();
            let if_exists = self.at_word("if_exists");
            let name = if if_exists {
                self.advance();
                self.expect(TokenKind::LParen)?;
                let name = self.template_name()?;
                self.expect(TokenKind::RParen)?;
                name
            } else {
                self.template_name()?
            };
            Statement::Include {
                name,
                if_exists,
                location,
            }
        } else if self.at_word("bind") {
            self.advance();
            let (path, t) = self.tree_path()?;
            if !path.is_absolute() {
                return Err(self.error(t, "bind requires an absolute path"));
            }
            self.expect(TokenKind::Assign)?;
            let full_type = self.full_type()?;
            Statement::Bind {
                path,
                full_type,
                location,
            }
        } else if self.at(TokenKind::Str) {
            let (path, t) = self.tree_path()?;
            match (kind, &path) {
                (TemplateKind::Declaration, _) => {
                    return Err(self.error(t, "declaration templates cannot assign values"))
                }
                (TemplateKind::Structure, p) if !p.is_relative() => {
                    return Err(self.error(t, "structure templates must use relative paths"))
                }
                (TemplateKind::Structure, _) => {}
                (_, p) if !p.is_absolute() => {
                    return Err(self.error(t, "assignments require an absolute path"))
                }
                _ => {}
            }
            self.expect(TokenKind::Assign)?;
            let value = self.expr()?;
            Statement::Assign {
                path,
                value,
                location,
            }
        } else {
            return Err(self.error(
                start,
                format!("expected statement, found {}", describe(start.kind)),
            ));
        };
        self.expect(TokenKind::Semi)?;
        Ok(stmt)
    }

    fn full_type(&mut self) -> Result<FullType, SyntaxError> {
        let t = self.expect(TokenKind::Word)?;
        let word = t.text(self.source);
        let base =
            BaseType::from_keyword(word).ok_or_else(|| self.error(t, format!("unknown type '{word}'")))?;
        let range = if self.at(TokenKind::LParen) {
            self.advance();
            let min = self.optional_integer()?;
            let range = if self.at(TokenKind::DotDot) {
                self.advance();
                TypeRange {
                    min,
                    max: self.optional_integer()?,
                }
            } else {
                TypeRange { min, max: min }
            };
            self.expect(TokenKind::RParen)?;
            Some(range)
        } else {
            None
        };
        Ok(FullType { base, range })
    }

    fn optional_integer(&mut self) -> Result<Option<i64>, SyntaxError> {
        if !self.at(TokenKind::Long) && !self.at(TokenKind::Minus) {
            return Ok(None);
        }
        match self.number()? {
            Expr::Long(n) => Ok(Some(n)),
            _ => Ok(None),
        }
    }

    fn number(&mut self) -> Result<Expr, SyntaxError> {
        let negative = if self.at(TokenKind::Minus) {
            self.advance();
            true
        } else {
            false
        };
        let t = self.advance();
        let text = t.text(self.source);
        match t.kind {
            TokenKind::Long => {
                let n: i64 = text
                    .parse()
                    .map_err(|_| self.error(t, format!("integer '{text}' out of range")))?;
                Ok(Expr::Long(if negative { -n } else { n }))
            }
            TokenKind::Double => {
                let d: f64 = text
                    .parse()
                    .map_err(|_| self.error(t, format!("invalid number '{text}'")))?;
                Ok(Expr::Double(if negative { -d } else { d }))
            }
            other => Err(self.error(t, format!("expected number, found {}", describe(other)))),
        }
    }

    fn expr(&mut self) -> Result<Expr, SyntaxError> {
        let t = self.peek();
        match t.kind {
            TokenKind::Str => {
                self.advance();
                Ok(Expr::Str(unquote(t.text(self.source))))
            }
            TokenKind::Long | TokenKind::Double | TokenKind::Minus => self.number(),
            TokenKind::Word => {
                self.advance();
                match t.text(self.source) {
                    "true" => Ok(Expr::Bool(true)),
                    "false" => Ok(Expr::Bool(false)),
                    "undef" => Ok(Expr::Undef),
                    "null" => Ok(Expr::Null),
                    func => self.call(func, t),
                }
            }
            other => Err(self.error(t, format!("expected expression, found {}", describe(other)))),
        }
    }

    fn call(&mut self, func: &str, t: Token) -> Result<Expr, SyntaxError> {
        self.expect(TokenKind::LParen)?;
        let expr = match func {
            "list" => Expr::List(self.arguments()?),
            "dict" => {
                let args = self.arguments()?;
                if args.len() % 2 != 0 {
                    return Err(self.error(t, "dict requires key/value pairs"));
                }
                let mut pairs = Vec::with_capacity(args.len() / 2);
                let mut iter = args.into_iter();
                while let (Some(key), Some(value)) = (iter.next(), iter.next()) {
                    match key {
                        Expr::Str(k) => pairs.push((k, value)),
                        _ => return Err(self.error(t, "dict keys must be strings")),
                    }
                }
                Expr::Dict(pairs)
            }
            "value" => {
                let (path, _) = self.tree_path()?;
                Expr::Value(path)
            }
            "file_contents" => Expr::FileContents(self.template_name()?),
            "file_exists" => Expr::FileExists(self.template_name()?),
            "create" => Expr::Create(self.template_name()?),
            other => return Err(self.error(t, format!("unknown function '{other}'"))),
        };
        if !matches!(expr, Expr::List(_) | Expr::Dict(_)) {
            self.expect(TokenKind::RParen)?;
        }
        Ok(expr)
    }

    /// Parses a comma-separated argument list and the closing parenthesis.
    fn arguments(&mut self) -> Result<Vec<Expr>, SyntaxError> {
        let mut args = Vec::new();
        if self.at(TokenKind::RParen) {
            self.advance();
            return Ok(args);
        }
        loop {
            args.push(self.expr()?);
            if self.at(TokenKind::Comma) {
                self.advance();
                continue;
            }
            self.expect(TokenKind::RParen)?;
            return Ok(args);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compile_str(path: &str, src: &str) -> Result<CompiledTemplate, SyntaxError> {
        compile(Path::new(path), src)
    }

    #[test]
    fn object_template_with_statements() {
        let src = r#"
object template site/node01;

include 'site/base';
include if_exists('site/optional');
'/system/hostname' = 'node01';
'/system/ncpu' = 4;
'/system/load' = -0.5;
'/system/tags' = list('a', "b", true);
'/system/owner' = dict('name', 'ops', 'uid', 100);
'/system/kernel' = value('site/defaults:/kernel');
bind '/system/ncpu' = long(1..256);
"#;
        let t = compile_str("/repo/site/node01.pan", src).unwrap();
        assert_eq!(t.name.as_str(), "site/node01");
        assert!(t.is_object());
        assert_eq!(t.statements.len(), 9);
        match &t.statements[1] {
            Statement::Include {
                name, if_exists, ..
            } => {
                assert_eq!(name.as_str(), "site/optional");
                assert!(*if_exists);
            }
            other => panic!("unexpected {other:?}"),
        }
        match &t.statements[4] {
            Statement::Assign { value, .. } => assert_eq!(*value, Expr::Double(-0.5)),
            other => panic!("unexpected {other:?}"),
        }
        match &t.statements[6] {
            Statement::Assign { value, .. } => assert_eq!(
                *value,
                Expr::Dict(vec![
                    ("name".to_string(), Expr::Str("ops".to_string())),
                    ("uid".to_string(), Expr::Long(100)),
                ])
            ),
            other => panic!("unexpected {other:?}"),
        }
        match &t.statements[8] {
            Statement::Bind {
                full_type,
                location,
                ..
            } => {
                assert_eq!(full_type.to_string(), "long(1..256)");
                assert_eq!(location.line, 12);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn ordinary_template_header() {
        let t = compile_str("/r/ns/common.tpl", "template ns/common;\n").unwrap();
        assert_eq!(t.kind, TemplateKind::Ordinary);
        assert!(t.statements.is_empty());
    }

    #[test]
    fn name_must_match_path() {
        let err = compile_str("/r/ns/other.pan", "template ns/common;").unwrap_err();
        assert!(matches!(err, SyntaxError::NameMismatch { .. }));
    }

    #[test]
    fn structure_requires_relative_paths() {
        let err = compile_str(
            "/r/ns/s.pan",
            "structure template ns/s;\n'/abs' = 1;\n",
        )
        .unwrap_err();
        assert!(err.to_string().contains("relative paths"));
        compile_str("/r/ns/s.pan", "structure template ns/s;\n'rel/x' = 1;\n").unwrap();
    }

    #[test]
    fn object_rejects_relative_paths() {
        let err = compile_str("/r/o.pan", "object template o;\n'rel' = 1;\n").unwrap_err();
        assert!(err.to_string().contains("absolute path"));
    }

    #[test]
    fn declaration_rejects_assignments() {
        let err = compile_str("/r/d.pan", "declaration template d;\n'/a' = 1;\n").unwrap_err();
        assert!(err.to_string().contains("cannot assign"));
        compile_str("/r/d.pan", "declaration template d;\nbind '/a' = string;\n").unwrap();
    }

    #[test]
    fn missing_semicolon_reports_location() {
        let err = compile_str("/r/o.pan", "object template o;\n'/a' = 1\n").unwrap_err();
        assert_eq!(
            err.to_string(),
            "/r/o.pan:3:1: expected ';', found end of file"
        );
    }

    #[test]
    fn unknown_function_and_type() {
        assert!(compile_str("/r/o.pan", "object template o;\n'/a' = nope(1);")
            .unwrap_err()
            .to_string()
            .contains("unknown function 'nope'"));
        assert!(compile_str("/r/o.pan", "object template o;\nbind '/a' = widget;")
            .unwrap_err()
            .to_string()
            .contains("unknown type 'widget'"));
    }

    #[test]
    fn range_forms() {
        let t = compile_str(
            "/r/d.pan",
            "declaration template d;\nbind '/a' = string(..8);\nbind '/b' = list(2);\n",
        )
        .unwrap();
        let types: Vec<String> = t
            .statements
            .iter()
            .map(|s| match s {
                Statement::Bind { full_type, .. } => full_type.to_string(),
                _ => String::new(),
            })
            .collect();
        assert_eq!(types, vec!["string(..8)", "list(2..2)"]);
    }

    #[test]
    fn header_parse_stops_after_header() {
        let header =
            parse_header(Path::new("/r/o.pan"), "object template ns/o;\n'/a' = @@@").unwrap_err();
        assert!(header.to_string().contains("unexpected character"));
        let header = parse_header(Path::new("/r/o.pan"), "object template ns/o;\n'/a' = ;").unwrap();
        assert_eq!(header.kind, TemplateKind::Object);
        assert_eq!(header.name.as_str(), "ns/o");
    }

    #[test]
    fn file_functions_and_create() {
        let t = compile_str(
            "/r/o.pan",
            "object template o;\n'/motd' = file_contents('files/motd');\n'/has' = file_exists('files/x');\n'/s' = create('ns/s');\n'/gone' = null;\n'/later' = undef;\n",
        )
        .unwrap();
        let values: Vec<&Expr> = t
            .statements
            .iter()
            .filter_map(|s| match s {
                Statement::Assign { value, .. } => Some(value),
                _ => None,
            })
            .collect();
        assert!(matches!(values[0], Expr::FileContents(_)));
        assert!(matches!(values[1], Expr::FileExists(_)));
        assert!(matches!(values[2], Expr::Create(_)));
        assert_eq!(*values[3], Expr::Null);
        assert_eq!(*values[4], Expr::Undef);
    }

    #[test]
    fn statement_locations_in_long_template() {
        let mut text = String::from("object template big;\n");
        for i in 0..20_000 {
            text.push_str(&format!("'/v{i}' = {i};\n"));
        }
        let t = compile_str("/r/big.pan", &text).unwrap();
        assert_eq!(t.statements.len(), 20_000);
        let last = t.statements[19_999].location();
        assert_eq!((last.line, last.column), (20_001, 1));
    }

    #[test]
    fn compile_file_reads_disk() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("ns").join("a.pan");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "unique template ns/a;\n").unwrap();
        let t = compile_file(&path).unwrap();
        assert_eq!(t.kind, TemplateKind::Unique);
        let err = compile_file(&tmp.path().join("missing.pan")).unwrap_err();
        assert!(matches!(err, SyntaxError::Io { .. }));
    }
}

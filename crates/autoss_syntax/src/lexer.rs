//! Lexical analyzer for the built-in front end.
//!
//! Produces [`Lexeme`]s carrying the same [`TokenKind`] vocabulary as the
//! Verible export. Whitespace, comments and compiler directives are trivia:
//! they are not tokens, so the emitter reproduces them verbatim from the
//! source between tokens. Conditional compilation (`` `ifdef ``,
//! `` `ifndef ``, `` `elsif ``, `` `else ``, `` `endif ``) is evaluated
//! against the configured defines and inactive regions become trivia too.
//! Macro uses are kept as [`TokenKind::MacroIdentifier`] tokens and are not
//! expanded.

use crate::kinds::TokenKind;
use autoss_diagnostics::code::{Category, DiagnosticCode};
use autoss_diagnostics::{Diagnostic, DiagnosticSink};
use autoss_source::{FileId, Span};
use std::collections::HashSet;

/// A token with its kind and byte range.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Lexeme {
    /// The token tag.
    pub kind: TokenKind,
    /// Byte offset of the first character.
    pub start: u32,
    /// Byte offset one past the last character.
    pub end: u32,
}

const KEYWORDS: &[&str] = &[
    "always", "always_comb", "always_ff", "always_latch", "and", "assign", "automatic", "begin",
    "bit", "break", "buf", "byte", "case", "casex", "casez", "const", "continue", "default",
    "defparam", "disable", "do", "edge", "else", "end", "endcase", "endfunction", "endgenerate",
    "endinterface", "endmodule", "endpackage", "endtask", "enum", "final", "for", "forever",
    "fork", "function", "generate", "genvar", "if", "import", "initial", "inout", "input", "int",
    "integer", "interface", "join", "join_any", "join_none", "localparam", "logic", "longint",
    "macromodule", "module", "nand", "negedge", "nor", "not", "or", "output", "package",
    "packed", "parameter", "posedge", "priority", "real", "reg", "repeat", "return", "shortint",
    "signed", "static", "string", "struct", "supply0", "supply1", "task", "time", "tri",
    "typedef", "union", "unique", "unique0", "unsigned", "uwire", "var", "void", "wait", "wand",
    "while", "wire", "wor", "xnor", "xor",
];

/// Operators, longest first so that the first match is the longest.
const OPERATORS: &[&str] = &[
    "<<<=", ">>>=", "===", "!==", "==?", "!=?", "<<<", ">>>", "<<=", ">>=", "<->", "<=", ">=",
    "==", "!=", "&&", "||", "**", "<<", ">>", "~&", "~|", "~^", "^~", "->", "+:", "-:", "::",
    "++", "--", "+=", "-=", "*=", "/=", "%=", "&=", "|=", "^=", ".*", "'{",
];

/// Lexes `source`, evaluating conditional directives against `defines`
/// (`NAME` or `NAME=value`). Errors are reported to `sink`; the offending
/// characters become [`TokenKind::Other`] tokens.
pub fn lex(source: &str, file: FileId, defines: &[String], sink: &DiagnosticSink) -> Vec<Lexeme> {
    let mut lexer = Lexer {
        source: source.as_bytes(),
        pos: 0,
        file,
        sink,
        defines: defines
            .iter()
            .map(|d| d.split('=').next().unwrap_or_default().to_string())
            .collect(),
        conditions: Vec::new(),
    };
    lexer.lex_all()
}

/// State of one open `` `ifdef `` group.
struct Condition {
    /// Whether the enclosing region is active.
    parent_active: bool,
    /// Whether some branch of this group has already been taken.
    taken: bool,
    /// Whether the current branch is active.
    active: bool,
}

struct Lexer<'a> {
    source: &'a [u8],
    pos: usize,
    file: FileId,
    sink: &'a DiagnosticSink,
    defines: HashSet<String>,
    conditions: Vec<Condition>,
}

impl Lexer<'_> {
    fn lex_all(&mut self) -> Vec<Lexeme> {
        let mut tokens = Vec::new();
        loop {
            self.skip_trivia();
            if self.pos >= self.source.len() {
                break;
            }
            let token = self.next_token();
            if self.active() {
                tokens.push(token);
            }
        }
        if !self.conditions.is_empty() {
            self.error("unterminated `ifdef", self.span_from(self.source.len()));
        }
        tokens
    }

    fn active(&self) -> bool {
        self.conditions.last().map_or(true, |c| c.active)
    }

    fn peek(&self) -> u8 {
        self.peek_at(0)
    }

    fn peek_at(&self, offset: usize) -> u8 {
        self.source.get(self.pos + offset).copied().unwrap_or(0)
    }

    fn span_from(&self, start: usize) -> Span {
        Span::new(self.file, start as u32, self.pos as u32)
    }

    fn lexeme(&self, kind: TokenKind, start: usize) -> Lexeme {
        Lexeme {
            kind,
            start: start as u32,
            end: self.pos as u32,
        }
    }

    fn error(&self, msg: &str, span: Span) {
        self.sink.emit(Diagnostic::error(
            DiagnosticCode::new(Category::Error, 100),
            msg,
            span,
        ));
    }

    fn skip_trivia(&mut self) {
        loop {
            while self.pos < self.source.len() && self.source[self.pos].is_ascii_whitespace() {
                self.pos += 1;
            }
            if self.pos >= self.source.len() {
                return;
            }
            if self.peek() == b'/' && self.peek_at(1) == b'/' {
                self.skip_to_eol();
                continue;
            }
            if self.peek() == b'/' && self.peek_at(1) == b'*' {
                let start = self.pos;
                self.pos += 2;
                loop {
                    if self.pos >= self.source.len() {
                        self.error("unterminated block comment", self.span_from(start));
                        break;
                    }
                    if self.source[self.pos] == b'*' && self.peek_at(1) == b'/' {
                        self.pos += 2;
                        break;
                    }
                    self.pos += 1;
                }
                continue;
            }
            if self.peek() == b'`' && self.directive() {
                continue;
            }
            if !self.active() {
                // Inactive region: consume and drop whole tokens so that
                // strings and comments cannot hide directives.
                self.next_token();
                continue;
            }
            return;
        }
    }

    fn skip_to_eol(&mut self) {
        while self.pos < self.source.len() && self.source[self.pos] != b'\n' {
            self.pos += 1;
        }
    }

    fn skip_horizontal_space(&mut self) {
        while matches!(self.peek(), b' ' | b'\t') {
            self.pos += 1;
        }
    }

    fn word(&mut self) -> String {
        let start = self.pos;
        while is_ident_char(self.peek()) {
            self.pos += 1;
        }
        String::from_utf8_lossy(&self.source[start..self.pos]).into_owned()
    }

    /// Consumes a directive at `` ` `` if it is one the lexer handles as
    /// trivia. Returns `false` for macro uses, which are tokens.
    fn directive(&mut self) -> bool {
        let start = self.pos;
        self.pos += 1;
        let name = self.word();
        match name.as_str() {
            "ifdef" | "ifndef" => {
                self.skip_horizontal_space();
                let macro_name = self.word();
                let defined = self.defines.contains(&macro_name);
                let cond = if name == "ifdef" { defined } else { !defined };
                let parent_active = self.active();
                self.conditions.push(Condition {
                    parent_active,
                    taken: cond,
                    active: parent_active && cond,
                });
            }
            "elsif" => {
                self.skip_horizontal_space();
                let macro_name = self.word();
                let defined = self.defines.contains(&macro_name);
                match self.conditions.last_mut() {
                    Some(c) => {
                        c.active = c.parent_active && !c.taken && defined;
                        c.taken |= defined;
                    }
                    None => self.error("`elsif without `ifdef", self.span_from(start)),
                }
            }
            "else" => match self.conditions.last_mut() {
                Some(c) => {
                    c.active = c.parent_active && !c.taken;
                    c.taken = true;
                }
                None => self.error("`else without `ifdef", self.span_from(start)),
            },
            "endif" => {
                if self.conditions.pop().is_none() {
                    self.error("`endif without `ifdef", self.span_from(start));
                }
            }
            "define" => {
                self.skip_horizontal_space();
                let macro_name = self.word();
                if self.active() {
                    self.defines.insert(macro_name);
                }
                self.skip_macro_body();
            }
            "undef" => {
                self.skip_horizontal_space();
                let macro_name = self.word();
                if self.active() {
                    self.defines.remove(&macro_name);
                }
            }
            "include" | "timescale" | "default_nettype" | "resetall" | "celldefine"
            | "endcelldefine" | "line" | "pragma" | "begin_keywords" | "end_keywords"
            | "unconnected_drive" | "nounconnected_drive" | "undefineall" => {
                self.skip_to_eol();
            }
            _ => {
                self.pos = start;
                return false;
            }
        }
        true
    }

    fn skip_macro_body(&mut self) {
        while self.pos < self.source.len() {
            match self.source[self.pos] {
                b'\\' if self.peek_at(1) == b'\n' => self.pos += 2,
                b'\\' if self.peek_at(1) == b'\r' && self.peek_at(2) == b'\n' => self.pos += 3,
                b'\n' => return,
                _ => self.pos += 1,
            }
        }
    }

    fn next_token(&mut self) -> Lexeme {
        let start = self.pos;
        let b = self.peek();

        if is_ident_start(b) {
            while is_ident_char(self.peek()) {
                self.pos += 1;
            }
            let text = std::str::from_utf8(&self.source[start..self.pos]).unwrap_or("");
            let kind = if KEYWORDS.contains(&text) {
                TokenKind::Keyword
            } else {
                TokenKind::SymbolIdentifier
            };
            return self.lexeme(kind, start);
        }

        if b == b'\\' {
            self.pos += 1;
            while self.pos < self.source.len() && !self.source[self.pos].is_ascii_whitespace() {
                self.pos += 1;
            }
            return self.lexeme(TokenKind::EscapedIdentifier, start);
        }

        if b == b'$' && is_ident_start(self.peek_at(1)) {
            self.pos += 1;
            while is_ident_char(self.peek()) {
                self.pos += 1;
            }
            return self.lexeme(TokenKind::SystemIdentifier, start);
        }

        if b == b'`' {
            self.pos += 1;
            while is_ident_char(self.peek()) {
                self.pos += 1;
            }
            return self.lexeme(TokenKind::MacroIdentifier, start);
        }

        if b.is_ascii_digit() {
            return self.lex_number(start);
        }

        if b == b'\'' {
            let next = self.peek_at(1).to_ascii_lowercase();
            if matches!(next, b'b' | b'o' | b'd' | b'h' | b's') {
                self.pos += 1;
                if self.peek().to_ascii_lowercase() == b's' {
                    self.pos += 1;
                }
                let base = self.peek().to_ascii_lowercase();
                self.pos += 1;
                self.eat_based_digits(base);
                return self.lexeme(TokenKind::Number, start);
            }
            if matches!(next, b'0' | b'1' | b'x' | b'z') {
                self.pos += 2;
                return self.lexeme(TokenKind::Number, start);
            }
        }

        if b == b'"' {
            self.pos += 1;
            loop {
                match self.peek() {
                    0 | b'\n' => {
                        self.error("unterminated string literal", self.span_from(start));
                        return self.lexeme(TokenKind::Other("Error".to_string()), start);
                    }
                    b'\\' => self.pos += 2,
                    b'"' => {
                        self.pos += 1;
                        return self.lexeme(TokenKind::StringLiteral, start);
                    }
                    _ => self.pos += 1,
                }
            }
        }

        let rest = &self.source[self.pos..];
        if let Some(op) = OPERATORS.iter().find(|op| rest.starts_with(op.as_bytes())) {
            self.pos += op.len();
            return self.lexeme(TokenKind::Punct, start);
        }
        if b.is_ascii_punctuation() {
            self.pos += 1;
            return self.lexeme(TokenKind::Punct, start);
        }

        // Skip a whole UTF-8 sequence so offsets stay on char boundaries.
        self.pos += 1;
        while self.pos < self.source.len() && (self.source[self.pos] & 0xC0) == 0x80 {
            self.pos += 1;
        }
        self.error("unrecognized character", self.span_from(start));
        self.lexeme(TokenKind::Other("Error".to_string()), start)
    }

    fn lex_number(&mut self, start: usize) -> Lexeme {
        self.eat_decimal_digits();

        // Sized literal, allowing blanks before the base: `8'hFF`, `8 'hFF`.
        let save = self.pos;
        self.skip_horizontal_space();
        if self.peek() == b'\'' {
            let mut probe = 1;
            if self.peek_at(probe).to_ascii_lowercase() == b's' {
                probe += 1;
            }
            let base = self.peek_at(probe).to_ascii_lowercase();
            if matches!(base, b'b' | b'o' | b'd' | b'h') {
                self.pos += probe + 1;
                self.skip_horizontal_space();
                self.eat_based_digits(base);
                return self.lexeme(TokenKind::Number, start);
            }
        }
        self.pos = save;

        if self.peek() == b'.' && self.peek_at(1).is_ascii_digit() {
            self.pos += 1;
            self.eat_decimal_digits();
        }
        if matches!(self.peek(), b'e' | b'E') {
            self.pos += 1;
            if matches!(self.peek(), b'+' | b'-') {
                self.pos += 1;
            }
            self.eat_decimal_digits();
        }
        self.lexeme(TokenKind::Number, start)
    }

    fn eat_decimal_digits(&mut self) {
        while self.peek().is_ascii_digit() || self.peek() == b'_' {
            self.pos += 1;
        }
    }

    fn eat_based_digits(&mut self, base: u8) {
        loop {
            let ch = self.peek().to_ascii_lowercase();
            let valid = match base {
                b'b' => matches!(ch, b'0' | b'1'),
                b'o' => matches!(ch, b'0'..=b'7'),
                b'd' => ch.is_ascii_digit(),
                b'h' => ch.is_ascii_hexdigit(),
                _ => false,
            } || matches!(ch, b'x' | b'z' | b'?' | b'_');
            if !valid {
                break;
            }
            self.pos += 1;
        }
    }
}

fn is_ident_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_'
}

fn is_ident_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'$'
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex_ok(source: &str, defines: &[&str]) -> Vec<(TokenKind, String)> {
        let sink = DiagnosticSink::new();
        let defines: Vec<String> = defines.iter().map(|d| d.to_string()).collect();
        let tokens = lex(source, FileId::from_raw(0), &defines, &sink);
        assert!(!sink.has_errors(), "{:?}", sink.diagnostics());
        tokens
            .into_iter()
            .map(|t| (t.kind, source[t.start as usize..t.end as usize].to_string()))
            .collect()
    }

    fn texts(source: &str, defines: &[&str]) -> Vec<String> {
        lex_ok(source, defines).into_iter().map(|(_, t)| t).collect()
    }

    #[test]
    fn keywords_identifiers_and_numbers() {
        let tokens = lex_ok("reg [7:0] cnt_q = 8'hFF;", &[]);
        assert_eq!(tokens[0], (TokenKind::Keyword, "reg".to_string()));
        assert_eq!(tokens[2], (TokenKind::Number, "7".to_string()));
        assert_eq!(tokens[5], (TokenKind::SymbolIdentifier, "cnt_q".to_string()));
        assert_eq!(tokens[7], (TokenKind::Number, "8'hFF".to_string()));
    }

    #[test]
    fn multi_char_operators() {
        assert_eq!(
            texts("a <= b << 2 +: c::d", &[]),
            vec!["a", "<=", "b", "<<", "2", "+:", "c", "::", "d"]
        );
    }

    #[test]
    fn comments_are_trivia() {
        assert_eq!(
            texts("a // line\n /* block\n */ b", &[]),
            vec!["a", "b"]
        );
    }

    #[test]
    fn ifdef_selects_active_branch() {
        let src = "`ifdef USE_AUTO_SS\n a\n`else\n b\n`endif\n c";
        assert_eq!(texts(src, &["USE_AUTO_SS=1"]), vec!["a", "c"]);
        assert_eq!(texts(src, &[]), vec!["b", "c"]);
    }

    #[test]
    fn ifndef_and_elsif() {
        let src = "`ifndef X a `elsif Y b `else c `endif";
        assert_eq!(texts(src, &[]), vec!["a"]);
        assert_eq!(texts(src, &["X", "Y"]), vec!["b"]);
        assert_eq!(texts(src, &["X"]), vec!["c"]);
    }

    #[test]
    fn nested_conditions_respect_parent() {
        let src = "`ifdef A `ifdef B x `else y `endif `endif z";
        assert_eq!(texts(src, &["B"]), vec!["z"]);
        assert_eq!(texts(src, &["A"]), vec!["y", "z"]);
    }

    #[test]
    fn define_is_seen_by_later_ifdef() {
        let src = "`define FAST \\\n  1\n`ifdef FAST f `endif";
        assert_eq!(texts(src, &[]), vec!["f"]);
    }

    #[test]
    fn macro_use_is_a_token() {
        let tokens = lex_ok("x = `WIDTH;", &[]);
        assert_eq!(tokens[2], (TokenKind::MacroIdentifier, "`WIDTH".to_string()));
    }

    #[test]
    fn timescale_is_trivia() {
        assert_eq!(texts("`timescale 1ns/1ps\nmodule", &[]), vec!["module"]);
    }

    #[test]
    fn unterminated_string_reports_error() {
        let sink = DiagnosticSink::new();
        lex("\"abc\n", FileId::from_raw(0), &[], &sink);
        assert!(sink.has_errors());
    }
}

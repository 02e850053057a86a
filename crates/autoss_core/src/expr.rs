//! Symbolic integer expressions for bit ranges.
//!
//! An [`Expr`] is a polynomial: a sum of terms, each an integer coefficient
//! times a product of [`Atom`]s. Sums, differences and products of
//! parameters and constants stay exact and canonical, so `(W)+(8)-1` and
//! `7+W` are the same value and render the same way. Anything the
//! polynomial form cannot express (non-exact division, `$clog2` of a
//! parameter, a ternary on a parameter) becomes an opaque atom holding its
//! canonical text, which is re-parsed when symbols are substituted.
//!
//! Constants are folded with checked `i64` arithmetic.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;

/// Errors produced while parsing or evaluating an expression.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ExprError {
    /// The text is not a valid constant expression.
    #[error("cannot parse expression `{text}`: {message}")]
    Parse {
        /// The text being parsed.
        text: String,
        /// What went wrong.
        message: String,
    },
    /// A literal that has no integer value (`x`/`z` digits, reals).
    #[error("literal `{0}` has no integer value")]
    Literal(String),
    /// A folded value does not fit in 64 bits.
    #[error("arithmetic overflow in `{0}`")]
    Overflow(String),
    /// A constant division or modulus by zero.
    #[error("division by zero in `{0}`")]
    DivisionByZero(String),
}

/// A factor of a term.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Atom {
    /// A named parameter or loop variable.
    Symbol(String),
    /// An irreducible sub-expression, kept as canonical text.
    Opaque(String),
}

type Monomial = Vec<Atom>;

/// A canonical sum of products.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Expr {
    terms: BTreeMap<Monomial, i64>,
}

impl Expr {
    /// The constant 0.
    pub fn zero() -> Self {
        Self::default()
    }

    /// An integer constant.
    pub fn constant(value: i64) -> Self {
        let mut terms = BTreeMap::new();
        if value != 0 {
            terms.insert(Vec::new(), value);
        }
        Self { terms }
    }

    /// A named symbol.
    pub fn symbol(name: impl Into<String>) -> Self {
        Self::monomial(vec![Atom::Symbol(name.into())])
    }

    fn opaque(text: String) -> Self {
        Self::monomial(vec![Atom::Opaque(text)])
    }

    fn monomial(atoms: Monomial) -> Self {
        let mut terms = BTreeMap::new();
        terms.insert(atoms, 1);
        Self { terms }
    }

    /// The value, if the expression is an integer constant.
    pub fn as_const(&self) -> Option<i64> {
        match self.terms.len() {
            0 => Some(0),
            1 => self.terms.get(&Vec::new()).copied(),
            _ => None,
        }
    }

    /// Returns `true` for the constant 0.
    pub fn is_zero(&self) -> bool {
        self.terms.is_empty()
    }

    /// `self + other`.
    pub fn add(&self, other: &Expr) -> Result<Expr, ExprError> {
        let mut terms = self.terms.clone();
        for (mono, &coef) in &other.terms {
            accumulate(&mut terms, mono.clone(), coef)
                .ok_or_else(|| ExprError::Overflow(format!("{self} + {other}")))?;
        }
        Ok(Self { terms })
    }

    /// `self - other`.
    pub fn sub(&self, other: &Expr) -> Result<Expr, ExprError> {
        let negated = other.neg()?;
        self.add(&negated)
    }

    /// `self * other`.
    pub fn mul(&self, other: &Expr) -> Result<Expr, ExprError> {
        let overflow = || ExprError::Overflow(format!("({self})*({other})"));
        let mut terms = BTreeMap::new();
        for (lm, &lc) in &self.terms {
            for (rm, &rc) in &other.terms {
                let mut mono: Monomial = lm.iter().chain(rm).cloned().collect();
                mono.sort();
                let coef = lc.checked_mul(rc).ok_or_else(overflow)?;
                accumulate(&mut terms, mono, coef).ok_or_else(overflow)?;
            }
        }
        Ok(Self { terms })
    }

    /// `-self`.
    pub fn neg(&self) -> Result<Expr, ExprError> {
        let mut terms = BTreeMap::new();
        for (mono, &coef) in &self.terms {
            let negated = coef
                .checked_neg()
                .ok_or_else(|| ExprError::Overflow(format!("-({self})")))?;
            terms.insert(mono.clone(), negated);
        }
        Ok(Self { terms })
    }

    /// Divides every coefficient by `divisor` if all divide evenly.
    fn exact_div(&self, divisor: i64) -> Option<Expr> {
        let mut terms = BTreeMap::new();
        for (mono, &coef) in &self.terms {
            if coef.checked_rem(divisor)? != 0 {
                return None;
            }
            terms.insert(mono.clone(), coef.checked_div(divisor)?);
        }
        Some(Self { terms })
    }

    /// Names of every symbol, including those inside opaque atoms.
    pub fn symbols(&self) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        for atom in self.terms.keys().flatten() {
            match atom {
                Atom::Symbol(name) => {
                    out.insert(name.clone());
                }
                Atom::Opaque(text) => {
                    if let Ok(tokens) = lex(text) {
                        out.extend(tokens.into_iter().filter_map(|t| match t {
                            Tok::Ident(name) => Some(name),
                            _ => None,
                        }));
                    }
                }
            }
        }
        out
    }

    /// Replaces symbols by the expressions in `map`, all at once, and
    /// re-simplifies. Opaque atoms are re-parsed with the same map, so a
    /// `$clog2(DEPTH)` becomes a constant once `DEPTH` is known.
    pub fn substitute(&self, map: &HashMap<String, Expr>) -> Result<Expr, ExprError> {
        let mut out = Expr::zero();
        for (mono, &coef) in &self.terms {
            let mut term = Expr::constant(coef);
            for atom in mono {
                let factor = match atom {
                    Atom::Symbol(name) => match map.get(name) {
                        Some(value) => value.clone(),
                        None => Expr::symbol(name.clone()),
                    },
                    Atom::Opaque(text) => Expr::parse_with(text, map)?,
                };
                term = term.mul(&factor)?;
            }
            out = out.add(&term)?;
        }
        Ok(out)
    }

    /// Re-folds opaque atoms. Expressions built by this module are already
    /// canonical, so this only changes values assembled from raw atoms.
    pub fn simplify(&self) -> Result<Expr, ExprError> {
        self.substitute(&HashMap::new())
    }

    /// Parses Verilog constant-expression text.
    pub fn parse(text: &str) -> Result<Expr, ExprError> {
        Self::parse_with(text, &HashMap::new())
    }

    /// Parses `text`, replacing each identifier found in `env` by its value.
    /// Replacement works on whole identifier tokens only.
    pub fn parse_with(text: &str, env: &HashMap<String, Expr>) -> Result<Expr, ExprError> {
        let tokens = lex(text)?;
        let mut parser = Parser {
            text,
            tokens,
            pos: 0,
            env,
        };
        let expr = parser.ternary()?;
        if parser.pos < parser.tokens.len() {
            return Err(parser.error("unexpected trailing input"));
        }
        Ok(expr)
    }

    /// Parses and re-renders `text` in canonical form.
    pub fn simplify_text(text: &str) -> Result<String, ExprError> {
        Ok(Self::parse(text)?.to_string())
    }
}

fn accumulate(terms: &mut BTreeMap<Monomial, i64>, mono: Monomial, coef: i64) -> Option<()> {
    let sum = terms.get(&mono).copied().unwrap_or(0).checked_add(coef)?;
    if sum == 0 {
        terms.remove(&mono);
    } else {
        terms.insert(mono, sum);
    }
    Some(())
}

/// Whether opaque text must be parenthesized when used as a factor.
fn needs_parens(text: &str) -> bool {
    let mut depth = 0i32;
    let mut in_string = false;
    for c in text.chars() {
        match c {
            '"' => in_string = !in_string,
            _ if in_string => {}
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => depth -= 1,
            '+' | '-' | '*' | '/' | '%' | '<' | '>' | '=' | '!' | '&' | '|' | '^' | '~' | '?'
            | ':'
                if depth == 0 =>
            {
                return true
            }
            _ => {}
        }
    }
    false
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.terms.is_empty() {
            return f.write_str("0");
        }
        // A lone opaque atom is printed as is.
        if self.terms.len() == 1 {
            if let Some((mono, &1)) = self.terms.iter().next() {
                if let [Atom::Opaque(text)] = mono.as_slice() {
                    return f.write_str(text);
                }
            }
        }

        let mut terms: Vec<(&Monomial, i64)> = self.terms.iter().map(|(m, &c)| (m, c)).collect();
        terms.sort_by(|(a, _), (b, _)| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));

        for (i, (mono, coef)) in terms.into_iter().enumerate() {
            match (i, coef < 0) {
                (0, true) => f.write_str("-")?,
                (0, false) => {}
                (_, true) => f.write_str(" - ")?,
                (_, false) => f.write_str(" + ")?,
            }
            let magnitude = coef.unsigned_abs();
            if mono.is_empty() {
                write!(f, "{magnitude}")?;
                continue;
            }
            if magnitude != 1 {
                write!(f, "{magnitude}*")?;
            }
            for (j, atom) in mono.iter().enumerate() {
                if j > 0 {
                    f.write_str("*")?;
                }
                match atom {
                    Atom::Symbol(name) => f.write_str(name)?,
                    Atom::Opaque(text) if needs_parens(text) => write!(f, "({text})")?,
                    Atom::Opaque(text) => f.write_str(text)?,
                }
            }
        }
        Ok(())
    }
}

// ============================================================================
// Lexer
// ============================================================================

#[derive(Clone, Debug, PartialEq)]
enum Tok {
    Num(i64),
    Ident(String),
    System(String),
    Str(String),
    Op(&'static str),
}

const OPERATORS: &[&str] = &[
    "<<<", ">>>", "===", "!==", "**", "<<", ">>", "<=", ">=", "==", "!=", "&&", "||", "~&", "~|",
    "~^", "^~", "+:", "-:", "+", "-", "*", "/", "%", "&", "|", "^", "~", "!", "<", ">", "?", ":",
    "(", ")", "[", "]", "{", "}", ",",
];

fn lex(text: &str) -> Result<Vec<Tok>, ExprError> {
    let parse_error = |message: String| ExprError::Parse {
        text: text.to_string(),
        message,
    };
    let bytes = text.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        let c = bytes[i];
        if c.is_ascii_whitespace() {
            i += 1;
        } else if c.is_ascii_digit() || (c == b'\'' && i + 1 < bytes.len()) {
            let (value, next) = lex_number(text, i)?;
            tokens.push(Tok::Num(value));
            i = next;
        } else if c.is_ascii_alphabetic() || c == b'_' {
            let start = i;
            loop {
                while i < bytes.len() && is_ident_byte(bytes[i]) {
                    i += 1;
                }
                // Package-scoped names stay one identifier.
                if text[i..].starts_with("::") {
                    i += 2;
                } else {
                    break;
                }
            }
            tokens.push(Tok::Ident(text[start..i].to_string()));
        } else if c == b'\\' {
            let start = i;
            while i < bytes.len() && !bytes[i].is_ascii_whitespace() {
                i += 1;
            }
            tokens.push(Tok::Ident(text[start..i].to_string()));
        } else if c == b'$' {
            let start = i;
            i += 1;
            while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_') {
                i += 1;
            }
            tokens.push(Tok::System(text[start..i].to_string()));
        } else if c == b'"' {
            let start = i;
            i += 1;
            while i < bytes.len() && bytes[i] != b'"' {
                i += if bytes[i] == b'\\' { 2 } else { 1 };
            }
            if i >= bytes.len() {
                return Err(parse_error("unterminated string".to_string()));
            }
            i += 1;
            tokens.push(Tok::Str(text[start..i].to_string()));
        } else if let Some(op) = OPERATORS.iter().find(|op| text[i..].starts_with(**op)) {
            tokens.push(Tok::Op(*op));
            i += op.len();
        } else {
            let ch = text[i..].chars().next().unwrap_or('?');
            return Err(parse_error(format!("unexpected character `{ch}`")));
        }
    }
    Ok(tokens)
}

fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'$'
}

/// Lexes `123`, `1_000`, `8'hFF`, `8 'hFF`, `'b1`, `'0` starting at `start`.
fn lex_number(text: &str, start: usize) -> Result<(i64, usize), ExprError> {
    let bytes = text.as_bytes();
    let mut i = start;
    while i < bytes.len() && (bytes[i].is_ascii_digit() || bytes[i] == b'_') {
        i += 1;
    }
    let size_end = i;
    let mut j = i;
    while j < bytes.len() && bytes[j] == b' ' {
        j += 1;
    }

    if j < bytes.len() && bytes[j] == b'\'' {
        let mut k = j + 1;
        if k < bytes.len() && matches!(bytes[k], b's' | b'S') {
            k += 1;
        }
        let radix = match bytes.get(k) {
            Some(b'b' | b'B') => 2,
            Some(b'o' | b'O') => 8,
            Some(b'd' | b'D') => 10,
            Some(b'h' | b'H') => 16,
            Some(b'0') if size_end == start => return Ok((0, k + 1)),
            Some(b'1' | b'x' | b'X' | b'z' | b'Z') if size_end == start => {
                return Err(ExprError::Literal(text[start..k + 1].to_string()))
            }
            _ => {
                return Err(ExprError::Parse {
                    text: text.to_string(),
                    message: "malformed based literal".to_string(),
                })
            }
        };
        k += 1;
        while k < bytes.len() && bytes[k] == b' ' {
            k += 1;
        }
        let digits_start = k;
        while k < bytes.len() && (is_ident_byte(bytes[k]) || bytes[k] == b'?') {
            k += 1;
        }
        let literal = &text[start..k];
        let digits: String = text[digits_start..k].chars().filter(|&c| c != '_').collect();
        if digits.is_empty() {
            return Err(ExprError::Parse {
                text: text.to_string(),
                message: format!("literal `{literal}` has no digits"),
            });
        }
        if digits.chars().any(|c| matches!(c, 'x' | 'X' | 'z' | 'Z' | '?')) {
            return Err(ExprError::Literal(literal.to_string()));
        }
        let value = u64::from_str_radix(&digits, radix)
            .ok()
            .and_then(|v| i64::try_from(v).ok())
            .ok_or_else(|| ExprError::Overflow(literal.to_string()))?;
        return Ok((value, k));
    }

    if i < bytes.len() && (bytes[i] == b'.' || bytes[i] == b'e' || bytes[i] == b'E') {
        let mut k = i + 1;
        while k < bytes.len() && (bytes[k].is_ascii_alphanumeric() || bytes[k] == b'.') {
            k += 1;
        }
        return Err(ExprError::Literal(text[start..k].to_string()));
    }

    let digits: String = text[start..size_end].chars().filter(|&c| c != '_').collect();
    let value = digits
        .parse::<i64>()
        .map_err(|_| ExprError::Overflow(text[start..size_end].to_string()))?;
    Ok((value, size_end))
}

// ============================================================================
// Parser
// ============================================================================

struct Parser<'a> {
    text: &'a str,
    tokens: Vec<Tok>,
    pos: usize,
    env: &'a HashMap<String, Expr>,
}

fn binary_precedence(op: &str) -> Option<u8> {
    Some(match op {
        "||" => 1,
        "&&" => 2,
        "|" => 3,
        "^" | "~^" | "^~" => 4,
        "&" => 5,
        "==" | "!=" | "===" | "!==" => 6,
        "<" | "<=" | ">" | ">=" => 7,
        "<<" | ">>" | "<<<" | ">>>" => 8,
        "+" | "-" => 9,
        "*" | "/" | "%" => 10,
        "**" => 11,
        _ => return None,
    })
}

impl Parser<'_> {
    fn error(&self, message: &str) -> ExprError {
        ExprError::Parse {
            text: self.text.to_string(),
            message: message.to_string(),
        }
    }

    fn peek_op(&self) -> Option<&'static str> {
        match self.tokens.get(self.pos) {
            Some(Tok::Op(op)) => Some(op),
            _ => None,
        }
    }

    fn eat(&mut self, op: &str) -> bool {
        if self.peek_op() == Some(op) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, op: &str) -> Result<(), ExprError> {
        if self.eat(op) {
            Ok(())
        } else {
            Err(self.error(&format!("expected `{op}`")))
        }
    }

    fn ternary(&mut self) -> Result<Expr, ExprError> {
        let cond = self.binary(1)?;
        if !self.eat("?") {
            return Ok(cond);
        }
        let then = self.ternary()?;
        self.expect(":")?;
        let other = self.ternary()?;
        Ok(match cond.as_const() {
            Some(0) => other,
            Some(_) => then,
            None => Expr::opaque(format!("({cond})?({then}):({other})")),
        })
    }

    fn binary(&mut self, min_prec: u8) -> Result<Expr, ExprError> {
        let mut lhs = self.unary()?;
        while let Some(op) = self.peek_op() {
            let Some(prec) = binary_precedence(op) else {
                break;
            };
            if prec < min_prec {
                break;
            }
            self.pos += 1;
            let rhs = self.binary(prec + 1)?;
            lhs = apply(op, &lhs, &rhs)?;
        }
        Ok(lhs)
    }

    fn unary(&mut self) -> Result<Expr, ExprError> {
        let Some(op) = self.peek_op() else {
            return self.primary();
        };
        match op {
            "+" | "-" | "!" | "~" | "&" | "|" | "^" | "~&" | "~|" | "~^" => {
                self.pos += 1;
                let operand = self.unary()?;
                match (op, operand.as_const()) {
                    ("+", _) => Ok(operand),
                    ("-", _) => operand.neg(),
                    ("!", Some(v)) => Ok(Expr::constant(i64::from(v == 0))),
                    ("~", Some(v)) => Ok(Expr::constant(!v)),
                    _ => Ok(Expr::opaque(format!("{op}({operand})"))),
                }
            }
            _ => self.primary(),
        }
    }

    fn primary(&mut self) -> Result<Expr, ExprError> {
        let Some(tok) = self.tokens.get(self.pos).cloned() else {
            return Err(self.error("unexpected end of expression"));
        };
        self.pos += 1;
        match tok {
            Tok::Num(value) => Ok(Expr::constant(value)),
            Tok::Str(text) => Ok(Expr::opaque(text)),
            Tok::Ident(name) => {
                if self.peek_op() == Some("(") {
                    let args = self.call_args()?;
                    return Ok(Expr::opaque(format!("{name}({})", join(&args))));
                }
                if self.peek_op() == Some("[") {
                    // Elements of parameter arrays stay symbolic.
                    let select = self.select()?;
                    return Ok(Expr::opaque(format!("{name}{select}")));
                }
                Ok(match self.env.get(&name) {
                    Some(value) => value.clone(),
                    None => Expr::symbol(name),
                })
            }
            Tok::System(name) => {
                let args = if self.peek_op() == Some("(") {
                    self.call_args()?
                } else {
                    return Ok(Expr::opaque(name));
                };
                if name == "$clog2" {
                    if let [arg] = args.as_slice() {
                        if let Some(v) = arg.as_const() {
                            return Ok(Expr::constant(clog2(v)));
                        }
                    }
                }
                Ok(Expr::opaque(format!("{name}({})", join(&args))))
            }
            Tok::Op("(") => {
                let inner = self.ternary()?;
                self.expect(")")?;
                Ok(inner)
            }
            Tok::Op("{") => self.concatenation(),
            Tok::Op(op) => Err(self.error(&format!("unexpected `{op}`"))),
        }
    }

    /// `( args )`, current token is `(`.
    fn call_args(&mut self) -> Result<Vec<Expr>, ExprError> {
        self.expect("(")?;
        let mut args = Vec::new();
        if self.eat(")") {
            return Ok(args);
        }
        loop {
            args.push(self.ternary()?);
            if !self.eat(",") {
                break;
            }
        }
        self.expect(")")?;
        Ok(args)
    }

    /// `[i]`, `[hi:lo]`, `[base+:w]`; returns the canonical text.
    fn select(&mut self) -> Result<String, ExprError> {
        let mut out = String::new();
        while self.eat("[") {
            let first = self.ternary()?;
            let sep = ["+:", "-:", ":"]
                .into_iter()
                .find(|&sep| self.peek_op() == Some(sep));
            match sep {
                Some(sep) => {
                    self.pos += 1;
                    let second = self.ternary()?;
                    out.push_str(&format!("[{first}{sep}{second}]"));
                }
                None => out.push_str(&format!("[{first}]")),
            }
            self.expect("]")?;
        }
        Ok(out)
    }

    /// `{a, b}` or `{n{a, b}}`, opening brace consumed.
    fn concatenation(&mut self) -> Result<Expr, ExprError> {
        let first = self.ternary()?;
        if self.eat("{") {
            let inner = self.concatenation()?;
            self.expect("}")?;
            return Ok(Expr::opaque(format!("{{{first}{inner}}}")));
        }
        let mut items = vec![first];
        while self.eat(",") {
            items.push(self.ternary()?);
        }
        self.expect("}")?;
        Ok(Expr::opaque(format!("{{{}}}", join(&items))))
    }
}

fn join(items: &[Expr]) -> String {
    items
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Applies a binary operator, folding when possible.
fn apply(op: &'static str, lhs: &Expr, rhs: &Expr) -> Result<Expr, ExprError> {
    let text = || format!("({lhs}){op}({rhs})");
    let overflow = || ExprError::Overflow(text());
    let consts = (lhs.as_const(), rhs.as_const());
    let folded = match (op, consts) {
        ("+", _) => return lhs.add(rhs),
        ("-", _) => return lhs.sub(rhs),
        ("*", _) => return lhs.mul(rhs),
        ("/" | "%", (_, Some(0))) => return Err(ExprError::DivisionByZero(text())),
        ("/", (Some(a), Some(b))) => a.checked_div(b).ok_or_else(overflow)?,
        ("/", (_, Some(b))) => match lhs.exact_div(b) {
            Some(quotient) => return Ok(quotient),
            None => return Ok(Expr::opaque(text())),
        },
        ("%", (Some(a), Some(b))) => a.checked_rem(b).ok_or_else(overflow)?,
        ("**", (Some(a), Some(b))) if b >= 0 => {
            let exp = u32::try_from(b).map_err(|_| overflow())?;
            a.checked_pow(exp).ok_or_else(overflow)?
        }
        ("**", (_, Some(b))) if (0..=16).contains(&b) => {
            let mut result = Expr::constant(1);
            for _ in 0..b {
                result = result.mul(lhs)?;
            }
            return Ok(result);
        }
        ("<<" | "<<<", (_, Some(b))) if (0..63).contains(&b) => {
            return lhs.mul(&Expr::constant(1i64 << b));
        }
        (">>" | ">>>", (Some(a), Some(b))) if b >= 0 => {
            if b >= 64 {
                if a < 0 {
                    -1
                } else {
                    0
                }
            } else {
                a >> b
            }
        }
        (_, (Some(a), Some(b))) => match op {
            "==" | "===" => i64::from(a == b),
            "!=" | "!==" => i64::from(a != b),
            "<" => i64::from(a < b),
            "<=" => i64::from(a <= b),
            ">" => i64::from(a > b),
            ">=" => i64::from(a >= b),
            "&" => a & b,
            "|" => a | b,
            "^" => a ^ b,
            "~^" | "^~" => !(a ^ b),
            "&&" => i64::from(a != 0 && b != 0),
            "||" => i64::from(a != 0 || b != 0),
            _ => return Ok(Expr::opaque(text())),
        },
        _ => return Ok(Expr::opaque(text())),
    };
    Ok(Expr::constant(folded))
}

/// Ceiling of log2, with `clog2(0) == clog2(1) == 0` as in `$clog2`.
pub fn clog2(n: i64) -> i64 {
    if n <= 1 {
        return 0;
    }
    let mut result = 0i64;
    let mut val = n - 1;
    while val > 0 {
        result += 1;
        val >>= 1;
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn simp(text: &str) -> String {
        Expr::simplify_text(text).unwrap()
    }

    #[test]
    fn literals() {
        assert_eq!(Expr::parse("42").unwrap().as_const(), Some(42));
        assert_eq!(Expr::parse("1_000").unwrap().as_const(), Some(1000));
        assert_eq!(Expr::parse("8'hFF").unwrap().as_const(), Some(255));
        assert_eq!(Expr::parse("4'b1010").unwrap().as_const(), Some(10));
        assert_eq!(Expr::parse("8'o17").unwrap().as_const(), Some(15));
        assert_eq!(Expr::parse("32'd100").unwrap().as_const(), Some(100));
        assert_eq!(Expr::parse("'b1").unwrap().as_const(), Some(1));
        assert_eq!(Expr::parse("8 'shff").unwrap().as_const(), Some(255));
        assert_eq!(Expr::parse("'0").unwrap().as_const(), Some(0));
    }

    #[test]
    fn unknown_digits_and_reals_are_rejected() {
        assert!(matches!(Expr::parse("4'b10x0"), Err(ExprError::Literal(_))));
        assert!(matches!(Expr::parse("8'hzz"), Err(ExprError::Literal(_))));
        assert!(matches!(Expr::parse("1.5"), Err(ExprError::Literal(_))));
        assert!(matches!(Expr::parse("'x"), Err(ExprError::Literal(_))));
    }

    #[test]
    fn malformed_text_is_a_parse_error() {
        for text in ["", "W +", "(W", "W)", "8'q3", "a # b", "\"open"] {
            assert!(
                matches!(Expr::parse(text), Err(ExprError::Parse { .. })),
                "{text}"
            );
        }
    }

    #[test]
    fn constant_folding() {
        assert_eq!(simp("1+(7)-(0)"), "8");
        assert_eq!(simp("(3*4) / 5 % 3"), "2");
        assert_eq!(simp("2**10"), "1024");
        assert_eq!(simp("1 << 4"), "16");
        assert_eq!(simp("256 >> 2"), "64");
        assert_eq!(simp("$clog2(256)"), "8");
        assert_eq!(simp("$clog2(257)"), "9");
        assert_eq!(simp("3 > 2 ? 10 : 20"), "10");
        assert_eq!(simp("(5 & 3) | 8"), "9");
        assert_eq!(simp("!0 + -(-2)"), "3");
    }

    #[test]
    fn like_terms_cancel() {
        assert_eq!(simp("(W)+(8)-1"), "W + 7");
        assert_eq!(simp("1 + (W-1) - (0)"), "W");
        assert_eq!(simp("(N*W) - (W*N)"), "0");
        assert_eq!(simp("(W+1)*(W-1)"), "W*W - 1");
        assert_eq!(simp("2*A + 3*B - A"), "A + 3*B");
    }

    #[test]
    fn exact_division_by_constant() {
        assert_eq!(simp("(4*W + 8) / 4"), "W + 2");
        assert_eq!(simp("N / 3"), "(N)/(3)");
        assert_eq!(simp("2*(N/3)"), "2*((N)/(3))");
    }

    #[test]
    fn irreducible_forms_stay_opaque() {
        assert_eq!(simp("$clog2(DEPTH)"), "$clog2(DEPTH)");
        assert_eq!(simp("$clog2(DEPTH) + 1"), "$clog2(DEPTH) + 1");
        assert_eq!(simp("2**W"), "(2)**(W)");
        assert_eq!(simp("W > 8 ? W : 8"), "((W)>(8))?(W):(8)");
        assert_eq!(simp("{W{1'b1}}"), "{W{1}}");
        assert_eq!(simp("P[3] + 1"), "P[3] + 1");
    }

    #[test]
    fn division_by_zero_and_overflow() {
        assert!(matches!(Expr::parse("4 / 0"), Err(ExprError::DivisionByZero(_))));
        assert!(matches!(Expr::parse("W % 0"), Err(ExprError::DivisionByZero(_))));
        assert!(matches!(
            Expr::parse("9223372036854775807 + 1"),
            Err(ExprError::Overflow(_))
        ));
        assert!(matches!(Expr::parse("2**64"), Err(ExprError::Overflow(_))));
    }

    #[test]
    fn rendering_is_idempotent() {
        for text in [
            "W-1",
            "(A+B)*(A-B)",
            "N/3 + 2*M",
            "$clog2(DEPTH)*W - 1",
            "W > 8 ? W : 8",
            "-(N % 4) + 3",
            "pkg::WIDTH * 2",
            "{2{A}} + 1",
        ] {
            let once = Expr::parse(text).unwrap();
            let twice = Expr::parse(&once.to_string()).unwrap();
            assert_eq!(once, twice, "{text} -> {once}");
            assert_eq!(once.simplify().unwrap(), once);
        }
    }

    #[test]
    fn substitution_is_token_aware() {
        let map = HashMap::from([("W".to_string(), Expr::constant(4))]);
        let e = Expr::parse("WIDTH + W").unwrap().substitute(&map).unwrap();
        assert_eq!(e.to_string(), "WIDTH + 4");
        let e = Expr::parse_with("W*W_1", &map).unwrap();
        assert_eq!(e.to_string(), "4*W_1");
    }

    #[test]
    fn substitution_reaches_into_opaque_atoms() {
        let e = Expr::parse("$clog2(DEPTH) + N/3").unwrap();
        let map = HashMap::from([
            ("DEPTH".to_string(), Expr::constant(16)),
            ("N".to_string(), Expr::parse("3*K").unwrap()),
        ]);
        assert_eq!(e.substitute(&map).unwrap().to_string(), "K + 4");
    }

    #[test]
    fn substitution_is_simultaneous() {
        let map = HashMap::from([
            ("A".to_string(), Expr::symbol("B")),
            ("B".to_string(), Expr::symbol("A")),
        ]);
        let e = Expr::parse("A - 2*B").unwrap().substitute(&map).unwrap();
        assert_eq!(e.to_string(), "-2*A + B");
    }

    #[test]
    fn symbols_include_opaque_contents() {
        let e = Expr::parse("W + $clog2(DEPTH)").unwrap();
        let names: Vec<_> = e.symbols().into_iter().collect();
        assert_eq!(names, vec!["DEPTH".to_string(), "W".to_string()]);
    }

    #[test]
    fn arithmetic_api() {
        let w = Expr::symbol("W");
        let e = w.mul(&Expr::constant(2)).unwrap().add(&Expr::constant(-1)).unwrap();
        assert_eq!(e.to_string(), "2*W - 1");
        assert_eq!(e.sub(&e).unwrap(), Expr::zero());
        assert!(e.as_const().is_none());
        assert_eq!(Expr::zero().to_string(), "0");
        assert_eq!(Expr::constant(-3).to_string(), "-3");
    }

    #[test]
    fn clog2_values() {
        assert_eq!(clog2(0), 0);
        assert_eq!(clog2(1), 0);
        assert_eq!(clog2(2), 1);
        assert_eq!(clog2(3), 2);
        assert_eq!(clog2(4), 2);
        assert_eq!(clog2(1024), 10);
    }
}

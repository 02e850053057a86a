//! Bit ranges with symbolic bounds.

use crate::expr::{Expr, ExprError};
use std::fmt;

/// A bit range `[end:begin]`.
///
/// Bounds are normalized so that `end` is the upper one whenever that can be
/// decided: a literal `0` end with a non-zero begin, or two constants in
/// ascending order, are swapped. A missing `begin` makes `end` a bare count.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Dimension {
    end: Expr,
    begin: Option<Expr>,
}

impl Dimension {
    /// Creates a range, normalizing the bound order.
    pub fn new(end: Expr, begin: Option<Expr>) -> Self {
        let swap = match (&begin, end.as_const()) {
            (Some(b), Some(0)) => !b.is_zero(),
            (Some(b), Some(e)) => b.as_const().is_some_and(|b| e < b),
            _ => false,
        };
        match begin {
            Some(b) if swap => Self {
                end: b,
                begin: Some(end),
            },
            begin => Self { end, begin },
        }
    }

    /// `[hi:lo]` from constant bounds.
    pub fn range(hi: i64, lo: i64) -> Self {
        Self::new(Expr::constant(hi), Some(Expr::constant(lo)))
    }

    /// `[size - 1 : offset]`-style range covering `size` bits from `offset`.
    pub fn from_offset(offset: &Expr, size: &Expr) -> Result<Self, ExprError> {
        let end = offset.add(size)?.sub(&Expr::constant(1))?;
        Ok(Self::new(end, Some(offset.clone())))
    }

    /// Parses the two bounds of a `[hi:lo]` declaration.
    pub fn parse_range(hi: &str, lo: &str) -> Result<Self, ExprError> {
        Ok(Self::new(Expr::parse(hi)?, Some(Expr::parse(lo)?)))
    }

    /// The upper bound.
    pub fn end(&self) -> &Expr {
        &self.end
    }

    /// The lower bound; `0` when the dimension is a bare count.
    pub fn begin(&self) -> Expr {
        self.begin.clone().unwrap_or_default()
    }

    /// Number of bits: `1 + end - begin`, or `end` for a bare count.
    pub fn size(&self) -> Result<Expr, ExprError> {
        match &self.begin {
            Some(begin) => Expr::constant(1).add(&self.end)?.sub(begin),
            None => Ok(self.end.clone()),
        }
    }

    /// Substitutes symbols in both bounds.
    pub fn substitute(
        &self,
        map: &std::collections::HashMap<String, Expr>,
    ) -> Result<Self, ExprError> {
        let begin = match &self.begin {
            Some(b) => Some(b.substitute(map)?),
            None => None,
        };
        Ok(Self::new(self.end.substitute(map)?, begin))
    }

    /// Part-select text: `[i]` for a single bit, `[begin +: size]` otherwise.
    pub fn to_text(&self) -> Result<String, ExprError> {
        let begin = self.begin();
        if begin == self.end {
            return Ok(format!("[{begin}]"));
        }
        Ok(format!("[{begin} +: {}]", self.size()?))
    }

    /// Declaration text `[end:begin]`, used for port declarations.
    pub fn to_decl_text(&self) -> String {
        format!("[{}:{}]", self.end, self.begin())
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_decl_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dim(hi: &str, lo: &str) -> Dimension {
        Dimension::parse_range(hi, lo).unwrap()
    }

    #[test]
    fn size_of_constant_ranges() {
        for (hi, lo) in [(7, 0), (15, 8), (0, 0), (31, 1)] {
            let d = Dimension::range(hi, lo);
            assert_eq!(d.size().unwrap().as_const(), Some(hi - lo + 1));
            let text = d.to_decl_text();
            let inner = &text[1..text.len() - 1];
            let (h, l) = inner.split_once(':').unwrap();
            assert_eq!(dim(h, l), d);
        }
    }

    #[test]
    fn ascending_ranges_are_normalized() {
        assert_eq!(dim("0", "7"), dim("7", "0"));
        assert_eq!(dim("0", "N-1"), dim("N-1", "0"));
        assert_eq!(dim("1", "4").size().unwrap().as_const(), Some(4));
        assert_eq!(dim("1", "4").begin().as_const(), Some(1));
    }

    #[test]
    fn symbolic_size() {
        let d = dim("W-1", "0");
        assert_eq!(d.size().unwrap().to_string(), "W");
        assert_eq!(d.to_decl_text(), "[W - 1:0]");
        assert_eq!(d.to_text().unwrap(), "[0 +: W]");
    }

    #[test]
    fn part_select_text() {
        assert_eq!(Dimension::range(15, 8).to_text().unwrap(), "[8 +: 8]");
        assert_eq!(Dimension::range(3, 3).to_text().unwrap(), "[3]");
        let bare = Dimension::new(Expr::constant(4), None);
        assert_eq!(bare.size().unwrap().as_const(), Some(4));
    }

    #[test]
    fn equality_is_symbolic() {
        assert_eq!(dim("(W)+(8)-1", "8"), dim("W+7", "8"));
        assert_ne!(dim("W-1", "0"), dim("W", "0"));
    }

    #[test]
    fn from_offset_and_substitution() {
        let offset = Expr::parse("W").unwrap();
        let d = Dimension::from_offset(&offset, &Expr::constant(8)).unwrap();
        assert_eq!(d.to_decl_text(), "[W + 7:W]");
        let map = std::collections::HashMap::from([("W".to_string(), Expr::constant(8))]);
        assert_eq!(d.substitute(&map).unwrap(), Dimension::range(15, 8));
    }
}

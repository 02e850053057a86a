//! Node and token tags.
//!
//! Tags follow Verible's concrete-syntax-tree naming so that trees produced
//! by the external exporter and by the built-in front end can be queried the
//! same way. Tags the generator never asks for are kept verbatim in
//! [`NodeKind::Other`] / [`TokenKind::Other`].

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! node_kinds {
    ($($(#[$meta:meta])* $variant:ident => $tag:literal,)*) => {
        /// Tag of a branch node.
        #[derive(Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
        pub enum NodeKind {
            $($(#[$meta])* $variant,)*
            /// Any tag not listed above, kept as written.
            Other(String),
        }

        impl NodeKind {
            /// Maps a Verible tag to a kind.
            pub fn from_tag(tag: &str) -> Self {
                match tag {
                    $($tag => NodeKind::$variant,)*
                    other => NodeKind::Other(other.to_string()),
                }
            }

            /// The Verible tag of this kind.
            pub fn tag(&self) -> &str {
                match self {
                    $(NodeKind::$variant => $tag,)*
                    NodeKind::Other(tag) => tag,
                }
            }
        }
    };
}

node_kinds! {
    /// `module ... endmodule`
    ModuleDeclaration => "kModuleDeclaration",
    /// `module name #(...) (...);`
    ModuleHeader => "kModuleHeader",
    /// Items between the header and `endmodule`.
    ModuleItemList => "kModuleItemList",
    /// `#( ... )` in a module header.
    FormalParameterListDeclaration => "kFormalParameterListDeclaration",
    /// Comma-separated header parameters.
    FormalParameterList => "kFormalParameterList",
    /// The port list inside the header parentheses.
    PortDeclarationList => "kPortDeclarationList",
    /// An ANSI port declaration.
    PortDeclaration => "kPortDeclaration",
    /// A non-ANSI header port name.
    Port => "kPort",
    /// Reference to a port in a non-ANSI header.
    PortReference => "kPortReference",
    /// A non-ANSI `input`/`output`/`inout` body declaration.
    ModulePortDeclaration => "kModulePortDeclaration",
    /// Variable declaration or module instantiation.
    DataDeclaration => "kDataDeclaration",
    /// `wire`/`tri` declaration.
    NetDeclaration => "kNetDeclaration",
    /// Type part of a data declaration.
    InstantiationType => "kInstantiationType",
    /// A data type.
    DataType => "kDataType",
    /// An unqualified name.
    UnqualifiedId => "kUnqualifiedId",
    /// `#( ... )` after an instantiated module name.
    ActualParameterList => "kActualParameterList",
    /// Positional parameter overrides.
    ActualParameterPositionalList => "kActualParameterPositionalList",
    /// Named parameter overrides.
    ActualParameterByNameList => "kActualParameterByNameList",
    /// `.NAME(value)` parameter override.
    ParamByName => "kParamByName",
    /// Declared names of a data declaration.
    GateInstanceRegisterVariableList => "kGateInstanceRegisterVariableList",
    /// One instance of a module instantiation.
    GateInstance => "kGateInstance",
    /// One declared variable.
    RegisterVariable => "kRegisterVariable",
    /// Port connections of an instance.
    PortActualList => "kPortActualList",
    /// `.port(expr)` connection.
    ActualNamedPort => "kActualNamedPort",
    /// Packed dimensions (before the name).
    PackedDimensions => "kPackedDimensions",
    /// Unpacked dimensions (after the name).
    UnpackedDimensions => "kUnpackedDimensions",
    /// `[hi:lo]`
    DimensionRange => "kDimensionRange",
    /// `[n]`
    DimensionScalar => "kDimensionScalar",
    /// Names of a non-ANSI port declaration.
    IdentifierUnpackedDimensionsList => "kIdentifierUnpackedDimensionsList",
    /// One name of a non-ANSI port declaration.
    IdentifierUnpackedDimensions => "kIdentifierUnpackedDimensions",
    /// `always`, `always_ff`, `always_comb`, `always_latch`.
    AlwaysStatement => "kAlwaysStatement",
    /// `initial`
    InitialStatement => "kInitialStatement",
    /// A statement guarded by `@(...)` or `#delay`.
    ProceduralTimingControlStatement => "kProceduralTimingControlStatement",
    /// `@(...)`
    EventControl => "kEventControl",
    /// Events of an event control.
    EventExpressionList => "kEventExpressionList",
    /// `posedge clk`
    EventExpression => "kEventExpression",
    /// `#delay`
    DelayControl => "kDelay",
    /// `lhs <= rhs;`
    NonblockingAssignmentStatement => "kNonblockingAssignmentStatement",
    /// `lhs = rhs;`
    BlockingAssignmentStatement => "kNetVariableAssignment",
    /// Left-hand side of an assignment.
    LPValue => "kLPValue",
    /// `if ... else ...`
    ConditionalStatement => "kConditionalStatement",
    /// `if (cond) stmt`
    IfClause => "kIfClause",
    /// `if (cond)`
    IfHeader => "kIfHeader",
    /// Statement controlled by an `if`.
    IfBody => "kIfBody",
    /// `else stmt`
    ElseClause => "kElseClause",
    /// Statement controlled by an `else`.
    ElseBody => "kElseBody",
    /// `begin ... end`
    SeqBlock => "kSeqBlock",
    /// `begin [: label]`
    Begin => "kBegin",
    /// `end [: label]`
    End => "kEnd",
    /// `case ... endcase`
    CaseStatement => "kCaseStatement",
    /// Items of a case statement.
    CaseItemList => "kCaseItemList",
    /// `labels: stmt`
    CaseItem => "kCaseItem",
    /// `default: stmt`
    DefaultCaseItem => "kDefaultCaseItem",
    /// `for (...) stmt`
    ForLoopStatement => "kForLoopStatement",
    /// `while`/`repeat`/`forever` loops.
    LoopStatement => "kLoopStatement",
    /// `;`
    NullStatement => "kNullStatement",
    /// Any other statement, up to its `;`.
    Statement => "kStatement",
    /// `parameter`/`localparam` declaration.
    ParamDeclaration => "kParamDeclaration",
    /// Type and name of a parameter.
    ParamType => "kParamType",
    /// `= value`
    TrailingAssign => "kTrailingAssign",
    /// Additional `NAME = value` in one declaration.
    ParameterAssign => "kParameterAssign",
    /// An expression.
    Expression => "kExpression",
    /// `( ... )`
    ParenGroup => "kParenGroup",
    /// `assign ...;`
    ContinuousAssignmentStatement => "kContinuousAssignmentStatement",
    /// `generate ... endgenerate`
    GenerateRegion => "kGenerateRegion",
    /// Generate `for`.
    LoopGenerateConstruct => "kLoopGenerateConstruct",
    /// Generate `if`/`case`.
    ConditionalGenerateConstruct => "kConditionalGenerateConstruct",
    /// `begin ... end` inside a generate construct.
    GenerateBlock => "kGenerateBlock",
    /// `function ... endfunction`
    FunctionDeclaration => "kFunctionDeclaration",
    /// `task ... endtask`
    TaskDeclaration => "kTaskDeclaration",
    /// `genvar i;`
    GenvarDeclaration => "kGenvarDeclaration",
    /// Top-level list of a file.
    DescriptionList => "kDescriptionList",
}

/// Tag of a token (leaf) node.
#[derive(Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum TokenKind {
    /// A plain identifier.
    SymbolIdentifier,
    /// `\escaped+identifier `
    EscapedIdentifier,
    /// `$clog2`, `$display`, ...
    SystemIdentifier,
    /// `` `MACRO `` usage left in the text.
    MacroIdentifier,
    /// Any numeric literal or literal fragment.
    Number,
    /// `"..."`
    StringLiteral,
    /// A reserved word. The word itself is the token text.
    Keyword,
    /// An operator or punctuation. The symbol itself is the token text.
    Punct,
    /// Any other Verible token tag, kept as written.
    Other(String),
}

impl TokenKind {
    /// Maps a Verible token tag to a kind.
    ///
    /// Verible tags keywords and punctuation with their own spelling
    /// (`"module"`, `"<="`) and literals with `TK_*` names.
    pub fn from_tag(tag: &str) -> Self {
        let tag = match tag.strip_prefix('\'').and_then(|t| t.strip_suffix('\'')) {
            Some(inner) if !inner.is_empty() => inner,
            _ => tag,
        };
        match tag {
            "SymbolIdentifier" => TokenKind::SymbolIdentifier,
            "EscapedIdentifier" => TokenKind::EscapedIdentifier,
            "SystemTFIdentifier" => TokenKind::SystemIdentifier,
            "MacroIdentifier" | "MacroIdItem" | "MacroCallId" => TokenKind::MacroIdentifier,
            "TK_StringLiteral" => TokenKind::StringLiteral,
            "TK_DecNumber" | "TK_RealTime" | "TK_TimeLiteral" | "TK_UnBasedNumber"
            | "TK_DecBase" | "TK_BinBase" | "TK_OctBase" | "TK_HexBase" | "TK_DecDigits"
            | "TK_BinDigits" | "TK_OctDigits" | "TK_HexDigits" | "TK_XZDigits" => {
                TokenKind::Number
            }
            _ if tag.starts_with(|c: char| c.is_ascii_lowercase())
                && tag
                    .chars()
                    .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_') =>
            {
                TokenKind::Keyword
            }
            _ if !tag.is_empty() && tag.chars().all(|c| c.is_ascii_punctuation()) => {
                TokenKind::Punct
            }
            other => TokenKind::Other(other.to_string()),
        }
    }

    /// Returns `true` for plain and escaped identifiers.
    pub fn is_identifier(&self) -> bool {
        matches!(
            self,
            TokenKind::SymbolIdentifier | TokenKind::EscapedIdentifier
        )
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// A query matching either a branch kind or a token kind.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Tag {
    /// Matches branch nodes of this kind.
    Node(NodeKind),
    /// Matches tokens of this kind.
    Token(TokenKind),
}

impl From<NodeKind> for Tag {
    fn from(kind: NodeKind) -> Self {
        Tag::Node(kind)
    }
}

impl From<TokenKind> for Tag {
    fn from(kind: TokenKind) -> Self {
        Tag::Token(kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_tags_round_trip_through_names() {
        for kind in [
            NodeKind::ModuleDeclaration,
            NodeKind::IfClause,
            NodeKind::NonblockingAssignmentStatement,
            NodeKind::BlockingAssignmentStatement,
        ] {
            assert_eq!(NodeKind::from_tag(kind.tag()), kind);
        }
    }

    #[test]
    fn unknown_node_tag_is_kept() {
        let kind = NodeKind::from_tag("kCoverGroupDeclaration");
        assert_eq!(kind, NodeKind::Other("kCoverGroupDeclaration".to_string()));
        assert_eq!(kind.tag(), "kCoverGroupDeclaration");
    }

    #[test]
    fn token_tags() {
        assert_eq!(TokenKind::from_tag("SymbolIdentifier"), TokenKind::SymbolIdentifier);
        assert_eq!(TokenKind::from_tag("module"), TokenKind::Keyword);
        assert_eq!(TokenKind::from_tag("always_ff"), TokenKind::Keyword);
        assert_eq!(TokenKind::from_tag("<="), TokenKind::Punct);
        assert_eq!(TokenKind::from_tag("'posedge'"), TokenKind::Keyword);
        assert_eq!(TokenKind::from_tag("TK_HexDigits"), TokenKind::Number);
        assert_eq!(
            TokenKind::from_tag("TK_OTHER"),
            TokenKind::Other("TK_OTHER".to_string())
        );
    }
}

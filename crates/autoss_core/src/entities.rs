//! Registers, clocked blocks, instances and modules.

use crate::dimension::Dimension;
use crate::expr::{Expr, ExprError};
use crate::ids::{ModuleId, TreeId};
use autoss_source::Span;
use autoss_syntax::NodeId;

/// A variable or port that may hold state.
#[derive(Clone, Debug, PartialEq)]
pub struct Register {
    /// Declared name.
    pub name: String,
    /// Packed (vector) range.
    pub packed: Option<Dimension>,
    /// Unpacked (array) range.
    pub unpacked: Option<Dimension>,
    /// Range in the module's state vector, once allocated.
    pub allocated: Option<Dimension>,
    /// The declaring identifier.
    pub span: Span,
}

impl Register {
    /// A register with no allocation yet.
    pub fn new(name: impl Into<String>, packed: Option<Dimension>, unpacked: Option<Dimension>) -> Self {
        Self {
            name: name.into(),
            packed,
            unpacked,
            allocated: None,
            span: Span::DUMMY,
        }
    }

    /// Width of one element.
    pub fn packed_size(&self) -> Result<Expr, ExprError> {
        match &self.packed {
            Some(d) => d.size(),
            None => Ok(Expr::constant(1)),
        }
    }

    /// Total bits: packed size times element count.
    pub fn size(&self) -> Result<Expr, ExprError> {
        let elements = match &self.unpacked {
            Some(d) => d.size()?,
            None => Expr::constant(1),
        };
        self.packed_size()?.mul(&elements)
    }

    /// Returns `true` if declaration shapes match.
    pub fn same_shape(&self, other: &Register) -> bool {
        self.packed == other.packed && self.unpacked == other.unpacked
    }

    /// Declaration shape for messages, e.g. `reg [7:0] mem [0:3]`.
    pub fn shape(&self) -> String {
        let mut out = String::from("reg ");
        if let Some(p) = &self.packed {
            out.push_str(&p.to_decl_text());
            out.push(' ');
        }
        out.push_str(&self.name);
        if let Some(u) = &self.unpacked {
            out.push(' ');
            out.push_str(&u.to_decl_text());
        }
        out
    }

    /// Places the register at `offset` and returns the next free offset.
    pub fn allocate(&mut self, offset: &Expr) -> Result<Expr, ExprError> {
        let size = self.size()?;
        self.allocated = Some(Dimension::from_offset(offset, &size)?);
        offset.add(&size)
    }

    /// Range of array element `index` (an expression such as the loop
    /// variable) within the allocated range; `None` before allocation.
    pub fn unpacked_dim(&self, index: &Expr) -> Result<Option<Dimension>, ExprError> {
        let Some(allocated) = &self.allocated else {
            return Ok(None);
        };
        let base = allocated.begin();
        let width = self.packed_size()?;
        let lo = width.mul(index)?.add(&base)?;
        Ok(Some(Dimension::from_offset(&lo, &width)?))
    }
}

/// A clocked `always` block and the registers it assigns.
#[derive(Clone, Debug)]
pub struct Assignment {
    /// The `kAlwaysStatement` node.
    pub node: NodeId,
    /// Names assigned with `<=`, deduplicated and sorted.
    pub targets: Vec<String>,
    /// Reset signal found in the sensitivity list.
    pub reset_signal: Option<String>,
    /// `true` for `posedge` resets.
    pub reset_polarity: bool,
    /// Allocated targets, filled in by allocation.
    pub registers: Vec<String>,
}

/// One instantiation of a module.
#[derive(Clone, Debug)]
pub struct ModuleInstance {
    /// Instance name.
    pub name: String,
    /// Name of the instantiated module.
    pub module_name: String,
    /// Resolved definition.
    pub module: Option<ModuleId>,
    /// `#(8, 4)` overrides, as source text.
    pub params: Vec<String>,
    /// `#(.W(8))` overrides, as source text, in source order.
    pub named_params: Vec<(String, String)>,
    /// The `kGateInstance` node.
    pub node: NodeId,
    /// Range in the parent's state vector, once allocated.
    pub allocated: Option<Dimension>,
    /// Size of the instance's own registers with its parameters applied.
    pub reg_size: Option<Expr>,
    /// Size of the instance's sub-instances with its parameters applied.
    pub sub_size: Option<Expr>,
    /// The instance identifier.
    pub span: Span,
}

/// A `parameter` or `localparam` with its default value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Parameter {
    /// Parameter name.
    pub name: String,
    /// Default value as source text.
    pub default: String,
    /// `true` for `localparam`.
    pub local: bool,
}

/// A module definition and what allocation derived from it.
#[derive(Clone, Debug)]
pub struct Module {
    /// Module name.
    pub name: String,
    /// Tree the module was parsed into.
    pub tree: TreeId,
    /// The `kModuleDeclaration` node.
    pub node: NodeId,
    /// The module name in the header.
    pub span: Span,
    /// Parameters in declaration order.
    pub parameters: Vec<Parameter>,
    /// Candidate registers in declaration order. After allocation, only the
    /// allocated ones remain.
    pub registers: Vec<Register>,
    /// Clocked blocks that assign at least one name.
    pub assignments: Vec<Assignment>,
    /// Instances in declaration order.
    pub instances: Vec<ModuleInstance>,
    /// The whole state vector; `None` for stateless modules.
    pub state_dim: Option<Dimension>,
    /// The part holding the module's own registers.
    pub reg_dim: Option<Dimension>,
    /// The part holding sub-instances.
    pub sub_dim: Option<Dimension>,
    /// The module already exposes a hand-written state interface.
    pub predefined: bool,
    pub(crate) allocated: bool,
    pub(crate) ancestors: Option<usize>,
}

impl Module {
    /// An empty module definition.
    pub fn new(name: impl Into<String>, tree: TreeId, node: NodeId) -> Self {
        Self {
            name: name.into(),
            tree,
            node,
            span: Span::DUMMY,
            parameters: Vec::new(),
            registers: Vec::new(),
            assignments: Vec::new(),
            instances: Vec::new(),
            state_dim: None,
            reg_dim: None,
            sub_dim: None,
            predefined: false,
            allocated: false,
            ancestors: None,
        }
    }

    /// Returns `true` once [`Design::allocate`](crate::design::Design::allocate)
    /// has processed the module.
    pub fn is_allocated(&self) -> bool {
        self.allocated
    }

    /// Looks up a register by name.
    pub fn register(&self, name: &str) -> Option<&Register> {
        self.registers.iter().find(|r| r.name == name)
    }
}

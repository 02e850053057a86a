//! Entity extraction: registers, instances, clocked blocks and parameters of
//! each module declaration in a syntax tree.
//!
//! Extraction only reads the tree. Every query goes through the tagged
//! accessors of [`SyntaxTree`], so trees from the Verible exporter and from
//! the built-in front end are handled alike.

use crate::dimension::Dimension;
use crate::entities::{Assignment, Module, ModuleInstance, Parameter, Register};
use crate::error::StateError;
use crate::expr::{Expr, ExprError};
use crate::ids::TreeId;
use autoss_config::AutossConfig;
use autoss_syntax::{NodeId, NodeKind, SyntaxTree, Tag};
use std::collections::{BTreeSet, HashMap};

/// Implicit packed width of the integer keyword types.
const IMPLICIT_WIDTHS: &[(&str, i64)] = &[
    ("integer", 32),
    ("int", 32),
    ("shortint", 16),
    ("longint", 64),
    ("time", 64),
    ("byte", 8),
];

const DIRECTIONS: &[&str] = &["input", "output", "inout", "ref"];

const EDGES: &[&str] = &["posedge", "negedge"];

/// Extracts every module declared in `tree`.
pub fn extract_modules(
    tree: &SyntaxTree,
    tree_id: TreeId,
    config: &AutossConfig,
) -> Result<Vec<Module>, StateError> {
    let Some(root) = tree.root() else {
        return Ok(Vec::new());
    };
    tree.find_all(root, &[NodeKind::ModuleDeclaration.into()])
        .into_iter()
        .map(|node| extract_module(tree, tree_id, node, config))
        .collect()
}

/// Extracts the module declared at `node` (a `kModuleDeclaration`).
pub fn extract_module(
    tree: &SyntaxTree,
    tree_id: TreeId,
    node: NodeId,
    config: &AutossConfig,
) -> Result<Module, StateError> {
    let header = tree.expect_find(node, NodeKind::ModuleHeader)?;
    let name = tree
        .child_identifier(header)
        .ok_or_else(|| tree.shape_error(header, "a module name"))?;
    let mut module = Module::new(tree.text(name), tree_id, node);
    module.span = tree.span(name);

    let mut extractor = Extractor {
        tree,
        config,
        node,
        module,
        seen: HashMap::new(),
    };
    extractor.parameters()?;
    extractor.registers()?;
    extractor.instances()?;
    extractor.assignments();

    let module = extractor.module;
    tracing::debug!(
        module = %module.name,
        registers = module.registers.len(),
        instances = module.instances.len(),
        blocks = module.assignments.len(),
        "extracted module"
    );
    Ok(module)
}

struct Extractor<'a> {
    tree: &'a SyntaxTree,
    config: &'a AutossConfig,
    node: NodeId,
    module: Module,
    /// Register name to its index in `module.registers`.
    seen: HashMap<String, usize>,
}

impl Extractor<'_> {
    fn expr_error(&self, source: ExprError, at: NodeId) -> StateError {
        StateError::Expr {
            module: self.module.name.clone(),
            source,
            span: self.tree.span(at),
        }
    }

    /// Nodes of the given kinds in this module, skipping function and task
    /// bodies and nested module declarations.
    fn items(&self, tags: &[Tag]) -> Vec<NodeId> {
        self.tree
            .find_all(self.node, tags)
            .into_iter()
            .filter(|&n| !self.in_nested_scope(n))
            .collect()
    }

    fn in_nested_scope(&self, mut id: NodeId) -> bool {
        while let Some(parent) = self.tree.parent(id) {
            if parent == self.node {
                return false;
            }
            if self.tree.is(parent, &NodeKind::FunctionDeclaration)
                || self.tree.is(parent, &NodeKind::TaskDeclaration)
                || self.tree.is(parent, &NodeKind::ModuleDeclaration)
            {
                return true;
            }
            id = parent;
        }
        false
    }

    /// Source text spanning `nodes`.
    fn span_text(&self, nodes: &[NodeId]) -> String {
        let ranges: Vec<_> = nodes
            .iter()
            .filter_map(|&n| self.tree.byte_range(n))
            .collect();
        let (Some(start), Some(end)) = (
            ranges.iter().map(|r| r.0).min(),
            ranges.iter().map(|r| r.1).max(),
        ) else {
            return String::new();
        };
        self.tree
            .source()
            .get(start as usize..end as usize)
            .unwrap_or("")
            .to_string()
    }

    /// Text following the `=` child of `node`.
    fn value_after_eq(&self, node: NodeId) -> Option<String> {
        let children = self.tree.children(node);
        let eq = children.iter().position(|&c| self.tree.is_word(c, "="))?;
        let value = self.span_text(&children[eq + 1..]);
        (!value.is_empty()).then_some(value)
    }

    // ------------------------------------------------------------------
    // Dimensions
    // ------------------------------------------------------------------

    fn dimension(&self, dim: NodeId) -> Result<Dimension, StateError> {
        let tree = self.tree;
        let children = tree.children(dim);
        let op = children
            .iter()
            .copied()
            .find(|&c| [":", "+:", "-:"].iter().any(|w| tree.is_word(c, w)))
            .map(|c| tree.text(c));
        let parts: Vec<NodeId> = children
            .iter()
            .copied()
            .filter(|&c| !["[", "]", ":", "+:", "-:"].iter().any(|w| tree.is_word(c, w)))
            .collect();
        let parse = |n: NodeId| Expr::parse(tree.text(n)).map_err(|e| self.expr_error(e, n));
        let one = Expr::constant(1);
        let arith = |e: ExprError| self.expr_error(e, dim);

        match (op, parts.as_slice()) {
            (None, [count]) => {
                let count = parse(*count)?;
                Ok(Dimension::new(count.sub(&one).map_err(arith)?, Some(Expr::zero())))
            }
            (Some(":"), [hi, lo]) => Ok(Dimension::new(parse(*hi)?, Some(parse(*lo)?))),
            (Some("+:"), [base, width]) => {
                Dimension::from_offset(&parse(*base)?, &parse(*width)?).map_err(arith)
            }
            (Some("-:"), [top, width]) => {
                let top = parse(*top)?;
                let lo = top.sub(&parse(*width)?).map_err(arith)?.add(&one).map_err(arith)?;
                Ok(Dimension::new(top, Some(lo)))
            }
            _ => Err(tree.shape_error(dim, "a `[hi:lo]` or `[n]` range").into()),
        }
    }

    fn ranges(&self, dims: NodeId) -> Result<Vec<Dimension>, StateError> {
        self.tree
            .children(dims)
            .iter()
            .copied()
            .filter(|&c| {
                self.tree.is(c, &NodeKind::DimensionRange)
                    || self.tree.is(c, &NodeKind::DimensionScalar)
            })
            .map(|c| self.dimension(c))
            .collect()
    }

    /// Packed dimensions; several ranges fold into one `[n-1:0]`.
    fn packed(&self, dims: Option<NodeId>) -> Result<Option<Dimension>, StateError> {
        let Some(dims) = dims else {
            return Ok(None);
        };
        let mut ranges = self.ranges(dims)?;
        if ranges.len() <= 1 {
            return Ok(ranges.pop());
        }
        let arith = |e| self.expr_error(e, dims);
        let mut total = Expr::constant(1);
        for range in &ranges {
            total = total.mul(&range.size().map_err(arith)?).map_err(arith)?;
        }
        let end = total.sub(&Expr::constant(1)).map_err(arith)?;
        Ok(Some(Dimension::new(end, Some(Expr::zero()))))
    }

    /// Unpacked dimensions; only the first range is used.
    fn unpacked(&self, dims: Option<NodeId>) -> Result<Option<Dimension>, StateError> {
        let Some(dims) = dims else {
            return Ok(None);
        };
        let ranges = self.ranges(dims)?;
        if ranges.len() > 1 {
            tracing::warn!(
                module = %self.module.name,
                dims = self.tree.text(dims),
                "only the first unpacked dimension is saved"
            );
        }
        Ok(ranges.into_iter().next())
    }

    fn implicit_width(&self, type_node: NodeId) -> Option<Dimension> {
        self.tree.tokens(type_node).into_iter().find_map(|t| {
            IMPLICIT_WIDTHS
                .iter()
                .find(|(word, _)| self.tree.is_word(t, word))
                .map(|&(_, width)| Dimension::range(width - 1, 0))
        })
    }

    // ------------------------------------------------------------------
    // Registers
    // ------------------------------------------------------------------

    fn add_register(&mut self, name: NodeId, mut register: Register) -> Result<(), StateError> {
        register.span = self.tree.span(name);
        if let Some(&index) = self.seen.get(&register.name) {
            let first = &self.module.registers[index];
            if first.same_shape(&register) {
                return Ok(());
            }
            return Err(StateError::ConflictingDeclaration {
                module: self.module.name.clone(),
                register: register.name.clone(),
                first: first.shape(),
                second: register.shape(),
                span: register.span,
            });
        }
        self.seen
            .insert(register.name.clone(), self.module.registers.len());
        self.module.registers.push(register);
        Ok(())
    }

    fn registers(&mut self) -> Result<(), StateError> {
        let decls = self.items(&[
            NodeKind::PortDeclarationList.into(),
            NodeKind::ModulePortDeclaration.into(),
            NodeKind::DataDeclaration.into(),
        ]);
        for decl in decls {
            if self.tree.is(decl, &NodeKind::PortDeclarationList) {
                self.ansi_ports(decl)?;
            } else if self.tree.is(decl, &NodeKind::ModulePortDeclaration) {
                self.port_declaration(decl)?;
            } else {
                self.data_declaration(decl)?;
            }
        }
        Ok(())
    }

    /// ANSI header ports. A port without a direction continues the previous
    /// declaration and inherits its packed range.
    fn ansi_ports(&mut self, list: NodeId) -> Result<(), StateError> {
        let tree = self.tree;
        let mut inherited: Option<Dimension> = None;
        let mut ansi = false;
        for &item in tree.children(list) {
            if tree.is(item, &NodeKind::PortDeclaration) {
                let directed = tree.children(item).iter().any(|&c| {
                    DIRECTIONS.iter().any(|d| tree.is_word(c, d))
                });
                let own = tree
                    .children(item)
                    .iter()
                    .copied()
                    .find(|&c| tree.is(c, &NodeKind::PackedDimensions))
                    .or_else(|| tree.find(item, NodeKind::PackedDimensions));
                let packed = match self.packed(own)? {
                    Some(p) => Some(p),
                    None if !directed && ansi => inherited.clone(),
                    None => None,
                };
                inherited = packed.clone();
                ansi = true;

                let name = tree
                    .find(item, NodeKind::UnqualifiedId)
                    .and_then(|id| tree.child_identifier(id))
                    .or_else(|| {
                        tree.children(item)
                            .iter()
                            .copied()
                            .filter(|&c| tree.is_identifier(c))
                            .last()
                    })
                    .ok_or_else(|| tree.shape_error(item, "a port name"))?;
                let unpacked = self.unpacked(tree.find(item, NodeKind::UnpackedDimensions))?;
                let register = Register::new(tree.text(name), packed, unpacked);
                self.add_register(name, register)?;
            } else if ansi && tree.is(item, &NodeKind::Port) {
                let Some(name) = tree.tokens(item).into_iter().find(|&t| tree.is_identifier(t))
                else {
                    continue;
                };
                let register = Register::new(tree.text(name), inherited.clone(), None);
                self.add_register(name, register)?;
            }
        }
        Ok(())
    }

    /// Non-ANSI `input [7:0] a, b;` in the module body.
    fn port_declaration(&mut self, decl: NodeId) -> Result<(), StateError> {
        let tree = self.tree;
        let packed = self.packed(tree.find(decl, NodeKind::PackedDimensions))?;
        let items = tree.find_all(decl, &[NodeKind::IdentifierUnpackedDimensions.into()]);
        if items.is_empty() {
            for name in self.identifiers_outside_dims(decl) {
                let register = Register::new(tree.text(name), packed.clone(), None);
                self.add_register(name, register)?;
            }
            return Ok(());
        }
        for item in items {
            let name = tree
                .child_identifier(item)
                .ok_or_else(|| tree.shape_error(item, "a port name"))?;
            let unpacked = self.unpacked(tree.find(item, NodeKind::UnpackedDimensions))?;
            let register = Register::new(tree.text(name), packed.clone(), unpacked);
            self.add_register(name, register)?;
        }
        Ok(())
    }

    fn identifiers_outside_dims(&self, decl: NodeId) -> Vec<NodeId> {
        let tree = self.tree;
        let mut out = Vec::new();
        let mut stack = vec![decl];
        while let Some(node) = stack.pop() {
            if tree.is(node, &NodeKind::PackedDimensions)
                || tree.is(node, &NodeKind::UnpackedDimensions)
            {
                continue;
            }
            if tree.is_identifier(node) {
                out.push(node);
            }
            stack.extend(tree.children(node).iter().rev());
        }
        out
    }

    /// `reg [7:0] a, b [0:3];` and other variable declarations.
    fn data_declaration(&mut self, decl: NodeId) -> Result<(), StateError> {
        let tree = self.tree;
        if tree.find(decl, NodeKind::GateInstance).is_some() {
            return Ok(());
        }
        let Some(inst_type) = tree.find(decl, NodeKind::InstantiationType) else {
            return Ok(());
        };
        let packed = match self.packed(tree.find(inst_type, NodeKind::PackedDimensions))? {
            Some(p) => Some(p),
            None => self.implicit_width(inst_type),
        };
        for var in tree.find_all(decl, &[NodeKind::RegisterVariable.into()]) {
            let name = tree
                .child_identifier(var)
                .ok_or_else(|| tree.shape_error(var, "a variable name"))?;
            let unpacked = self.unpacked(tree.find(var, NodeKind::UnpackedDimensions))?;
            let register = Register::new(tree.text(name), packed.clone(), unpacked);
            self.add_register(name, register)?;
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Instances
    // ------------------------------------------------------------------

    fn instances(&mut self) -> Result<(), StateError> {
        let tree = self.tree;
        for decl in self.items(&[NodeKind::DataDeclaration.into()]) {
            let gates = tree.find_all(decl, &[NodeKind::GateInstance.into()]);
            if gates.is_empty() {
                continue;
            }
            let inst_type = tree.expect_find(decl, NodeKind::InstantiationType)?;
            let type_name = tree
                .find(inst_type, NodeKind::UnqualifiedId)
                .and_then(|id| tree.child_identifier(id))
                .or_else(|| tree.tokens(inst_type).into_iter().find(|&t| tree.is_identifier(t)))
                .ok_or_else(|| tree.shape_error(inst_type, "an instantiated module name"))?;
            let (params, named_params) =
                self.parameter_overrides(tree.find(inst_type, NodeKind::ActualParameterList));

            for gate in gates {
                let name = tree
                    .child_identifier(gate)
                    .ok_or_else(|| tree.shape_error(gate, "an instance name"))?;
                if !params.is_empty() && !named_params.is_empty() {
                    return Err(StateError::MixedParameterStyles {
                        module: self.module.name.clone(),
                        instance: tree.text(name).to_string(),
                        span: tree.span(name),
                    });
                }
                if let Some(dims) = tree.find(gate, NodeKind::UnpackedDimensions) {
                    tracing::warn!(
                        module = %self.module.name,
                        instance = tree.text(name),
                        dims = tree.text(dims),
                        "instance arrays are saved as a single instance"
                    );
                }
                self.module.instances.push(ModuleInstance {
                    name: tree.text(name).to_string(),
                    module_name: tree.text(type_name).to_string(),
                    module: None,
                    params: params.clone(),
                    named_params: named_params.clone(),
                    node: gate,
                    allocated: None,
                    reg_size: None,
                    sub_size: None,
                    span: tree.span(name),
                });
            }
        }
        Ok(())
    }

    /// Positional and named overrides of `#(...)`, as source text.
    fn parameter_overrides(
        &self,
        list: Option<NodeId>,
    ) -> (Vec<String>, Vec<(String, String)>) {
        let tree = self.tree;
        let (mut positional, mut named) = (Vec::new(), Vec::new());
        let Some(list) = list else {
            return (positional, named);
        };
        for param in tree.find_all(list, &[NodeKind::ParamByName.into()]) {
            let Some(name) = tree.child_identifier(param) else {
                continue;
            };
            let value = tree
                .find(param, NodeKind::ParenGroup)
                .map(|group| {
                    let inner: &[NodeId] = match tree.children(group) {
                        [_, middle @ .., _] => middle,
                        _ => &[],
                    };
                    self.span_text(inner)
                })
                .unwrap_or_default();
            if value.is_empty() {
                continue;
            }
            named.push((tree.text(name).to_string(), value));
        }
        let values = match tree.find(list, NodeKind::ActualParameterPositionalList) {
            Some(values) => tree.children(values).to_vec(),
            None if named.is_empty() => tree.children(list).to_vec(),
            None => Vec::new(),
        };
        positional.extend(
            values
                .into_iter()
                .filter(|&c| !["#", "(", ")", ","].iter().any(|w| tree.is_word(c, w)))
                .map(|c| tree.text(c).to_string())
                .filter(|text| !text.is_empty()),
        );
        (positional, named)
    }

    // ------------------------------------------------------------------
    // Clocked blocks
    // ------------------------------------------------------------------

    fn assignments(&mut self) {
        let tree = self.tree;
        for always in self.items(&[NodeKind::AlwaysStatement.into()]) {
            let Some(control) = tree.find(always, NodeKind::EventControl) else {
                continue;
            };
            let events: Vec<(String, Option<String>)> = tree
                .find_all(control, &[NodeKind::EventExpression.into()])
                .into_iter()
                .map(|event| {
                    let tokens = tree.tokens(event);
                    let edge = tokens
                        .first()
                        .filter(|&&t| EDGES.iter().any(|e| tree.is_word(t, e)) || tree.is_word(t, "edge"))
                        .map(|&t| tree.text(t).to_string())
                        .unwrap_or_default();
                    let signal = tokens
                        .into_iter()
                        .find(|&t| tree.is_identifier(t))
                        .map(|t| tree.text(t).to_string());
                    (edge, signal)
                })
                .collect();
            if !events.iter().any(|(edge, _)| EDGES.contains(&edge.as_str())) {
                continue;
            }

            let mut targets = BTreeSet::new();
            for nb in tree.find_all(always, &[NodeKind::NonblockingAssignmentStatement.into()]) {
                let lhs = tree
                    .find(nb, NodeKind::LPValue)
                    .or_else(|| tree.children(nb).first().copied());
                let names = lhs.map(|lhs| self.lhs_targets(lhs)).unwrap_or_default();
                if names.is_empty() {
                    tracing::warn!(
                        module = %self.module.name,
                        statement = tree.text(nb),
                        "non-blocking assignment without a target"
                    );
                }
                targets.extend(names);
            }
            if targets.is_empty() {
                continue;
            }

            let mut reset_signal = None;
            let mut reset_polarity = false;
            for (edge, signal) in &events {
                if let Some(signal) = signal.as_ref().filter(|s| self.config.is_reset_signal(s)) {
                    reset_signal = Some(signal.clone());
                    reset_polarity = edge == "posedge";
                }
            }
            tracing::debug!(
                module = %self.module.name,
                targets = ?targets,
                reset = ?reset_signal,
                "clocked block"
            );
            self.module.assignments.push(Assignment {
                node: always,
                targets: targets.into_iter().collect(),
                reset_signal,
                reset_polarity,
                registers: Vec::new(),
            });
        }
    }

    /// Names assigned by a left-hand side. Selects are skipped; every
    /// element of a concatenation counts.
    fn lhs_targets(&self, lhs: NodeId) -> Vec<String> {
        let tree = self.tree;
        let tokens = tree.tokens(lhs);
        let concatenation = tokens.first().is_some_and(|&t| tree.is_word(t, "{"));
        let mut depth = 0usize;
        let mut after_dot = false;
        let mut names = Vec::new();
        for t in tokens {
            if tree.is_word(t, "[") {
                depth += 1;
            } else if tree.is_word(t, "]") {
                depth = depth.saturating_sub(1);
            } else if depth == 0 && tree.is_identifier(t) && !after_dot {
                names.push(tree.text(t).to_string());
                if !concatenation {
                    break;
                }
            }
            after_dot = tree.is_word(t, ".");
        }
        names
    }

    // ------------------------------------------------------------------
    // Parameters
    // ------------------------------------------------------------------

    fn parameters(&mut self) -> Result<(), StateError> {
        let tree = self.tree;
        let mut local = false;
        let decls = self.items(&[
            NodeKind::ParamDeclaration.into(),
            NodeKind::ParameterAssign.into(),
        ]);
        for decl in decls {
            let (name, value) = if tree.is(decl, &NodeKind::ParamDeclaration) {
                let keyword = tree.children(decl).iter().find_map(|&c| {
                    if tree.is_word(c, "localparam") {
                        Some(true)
                    } else if tree.is_word(c, "parameter") {
                        Some(false)
                    } else {
                        None
                    }
                });
                local = keyword.unwrap_or(local);
                if tree.children(decl).iter().any(|&c| tree.is_word(c, "type")) {
                    continue;
                }
                let Some(name) = tree.find(decl, NodeKind::ParamType).and_then(|ty| {
                    tree.children(ty)
                        .iter()
                        .copied()
                        .filter(|&c| tree.is_identifier(c))
                        .last()
                }) else {
                    continue;
                };
                let value = tree
                    .find(decl, NodeKind::TrailingAssign)
                    .and_then(|assign| self.value_after_eq(assign));
                (name, value)
            } else {
                let name = tree
                    .child_identifier(decl)
                    .ok_or_else(|| tree.shape_error(decl, "a parameter name"))?;
                (name, self.value_after_eq(decl))
            };
            self.module.parameters.push(Parameter {
                name: tree.text(name).to_string(),
                default: value.unwrap_or_default(),
                local,
            });
        }
        Ok(())
    }
}

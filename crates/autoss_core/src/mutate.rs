//! Splicing synthesized logic into module trees and emitting the result.

use crate::design::Design;
use crate::dimension::Dimension;
use crate::entities::{Assignment, Module, Register};
use crate::error::StateError;
use crate::ids::ModuleId;
use crate::synth::Synthesizer;
use autoss_config::AutossConfig;
use autoss_syntax::{NodeId, NodeKind, SyntaxTree};

/// The generated text of one module.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EmittedModule {
    /// Module name.
    pub name: String,
    /// Banner, module text and trailing blank lines.
    pub text: String,
}

/// Runs the whole generator for `root`: resolution, allocation,
/// instrumentation of every reachable module and emission in dependency
/// order. Nothing is emitted unless every module was instrumented.
pub fn generate(
    design: &mut Design,
    root: &str,
    config: &AutossConfig,
) -> Result<Vec<EmittedModule>, StateError> {
    let root = design.resolve(root)?;
    design.allocate(root, config)?;
    let order = design.post_order(root);
    for &id in &order {
        if design.module(id).state_dim.is_some() {
            design.allocation_report(id);
        }
        instrument(design, id, config)?;
    }
    Ok(order
        .into_iter()
        .map(|id| EmittedModule {
            name: design.module(id).name.clone(),
            text: emit_module(design, id),
        })
        .collect())
}

/// Rule line opening every emitted module.
pub const BANNER_RULE: &str = "///////////////////////////////////////////";

/// [`BANNER_RULE`], `// MODULE <name>`, the module text and three newlines.
pub fn emit_module(design: &Design, id: ModuleId) -> String {
    let module = design.module(id);
    let tree = design.tree(module.tree);
    format!(
        "{BANNER_RULE}\n// MODULE {}\n{}\n\n\n",
        module.name,
        tree.emit(module.node)
    )
}

/// Inserts the state ports, the save/restore logic of every clocked block
/// and the connections of every stateful instance into module `id`.
///
/// Modules without state, modules with a hand-written interface and modules
/// never allocated are left untouched.
pub fn instrument(design: &mut Design, id: ModuleId, config: &AutossConfig) -> Result<(), StateError> {
    let (module, tree) = design.module_and_tree_mut(id);
    let Some(state) = module.state_dim.clone() else {
        return Ok(());
    };
    if !module.is_allocated() || module.predefined {
        return Ok(());
    }
    let synth = Synthesizer::new(config);
    let mut mutator = Mutator {
        tree,
        module,
        synth: &synth,
    };
    let expr_err = |e| StateError::expr(&module.name, e);

    let generate = module.registers.iter().any(|r| r.unpacked.is_some());
    for assignment in &module.assignments {
        if assignment.registers.is_empty() {
            continue;
        }
        let registers = assigned_registers(module, assignment)?;
        let write = synth.write_logic(&registers).map_err(expr_err)?;
        let read = synth.read_logic(&registers, generate).map_err(expr_err)?;
        mutator.inject_write(assignment, &write)?;
        mutator.tree.insert_after(assignment.node, &read)?;
    }

    mutator.add_ports(&state)?;

    for instance in &module.instances {
        if let Some(range) = &instance.allocated {
            let text = synth.connections(range).map_err(expr_err)?;
            mutator.connect(instance.node, &text)?;
        }
    }
    tracing::debug!(module = %module.name, "instrumented module");
    Ok(())
}

/// The registers written by `assignment`, all of which must have been
/// allocated.
fn assigned_registers<'m>(
    module: &'m Module,
    assignment: &Assignment,
) -> Result<Vec<&'m Register>, StateError> {
    assignment
        .registers
        .iter()
        .map(|name| match module.register(name) {
            Some(register) if register.allocated.is_some() => Ok(register),
            Some(_) => Err(StateError::Internal(format!(
                "register `{}.{name}` reached instrumentation unallocated",
                module.name
            ))),
            None => Err(StateError::Internal(format!(
                "clocked block of `{}` assigns unknown register `{name}`",
                module.name
            ))),
        })
        .collect()
}

struct Mutator<'a> {
    tree: &'a mut SyntaxTree,
    module: &'a Module,
    synth: &'a Synthesizer,
}

impl Mutator<'_> {
    fn child_of_kind(&self, node: NodeId, kind: &NodeKind) -> Option<NodeId> {
        self.tree
            .children(node)
            .iter()
            .copied()
            .find(|&c| self.tree.is(c, kind))
    }

    fn child_word(&self, node: NodeId, word: &str) -> Option<NodeId> {
        self.tree
            .children(node)
            .iter()
            .copied()
            .find(|&c| self.tree.is_word(c, word))
    }

    /// Adds the restore logic to a clocked block: as the `else` branch of
    /// the reset `if`, or at the end of the body without a reset.
    fn inject_write(&mut self, assignment: &Assignment, write: &str) -> Result<(), StateError> {
        let always = assignment.node;
        if let Some(signal) = &assignment.reset_signal {
            let clause = self.tree.find(always, NodeKind::IfClause);
            let condition = clause.and_then(|c| {
                self.tree
                    .find(c, NodeKind::IfHeader)
                    .and_then(|h| self.tree.find(h, NodeKind::ParenGroup))
            });
            let tests_reset = condition.is_some_and(|cond| {
                self.tree
                    .tokens(cond)
                    .into_iter()
                    .any(|t| self.tree.is_identifier(t) && self.tree.text(t) == signal.as_str())
            });
            let Some(clause) = clause.filter(|_| tests_reset) else {
                return Err(StateError::ResetAssumptionViolated {
                    module: self.module.name.clone(),
                    signal: signal.clone(),
                    condition: condition
                        .map(|c| self.tree.text(c).to_string())
                        .unwrap_or_default(),
                    span: self.tree.span(always),
                });
            };
            self.tree.insert_after(clause, &format!("else {write}"))?;
            return Ok(());
        }

        let timing = self
            .tree
            .find(always, NodeKind::ProceduralTimingControlStatement)
            .ok_or_else(|| self.tree.shape_error(always, "a timing control statement"))?;
        let control = self
            .child_of_kind(timing, &NodeKind::EventControl)
            .ok_or_else(|| self.tree.shape_error(timing, "an event control"))?;
        let body = self
            .tree
            .children(timing)
            .last()
            .copied()
            .filter(|&b| b != control)
            .ok_or_else(|| self.tree.shape_error(timing, "a statement"))?;

        if self.tree.is(body, &NodeKind::SeqBlock) {
            let end = self
                .child_of_kind(body, &NodeKind::End)
                .ok_or_else(|| self.tree.shape_error(body, "a kEnd child"))?;
            self.tree.insert_before(end, write)?;
        } else {
            self.tree.insert_after(control, "begin")?;
            self.tree.insert_after(body, &format!("{write}\nend"))?;
        }
        Ok(())
    }

    /// Adds the three state ports to the module header, plus the `genvar`
    /// used by generated loops.
    fn add_ports(&mut self, state: &Dimension) -> Result<(), StateError> {
        let node = self.module.node;
        let header = self.tree.expect_find(node, NodeKind::ModuleHeader)?;
        let non_ansi = self
            .tree
            .find_all(node, &[NodeKind::ModulePortDeclaration.into()])
            .into_iter()
            .any(|d| !self.inside_subroutine(d));
        let ports = if non_ansi {
            self.synth.port_names()
        } else {
            self.synth.ansi_ports(state)
        };

        let group = self.child_of_kind(header, &NodeKind::ParenGroup);
        let list = group.and_then(|g| self.child_of_kind(g, &NodeKind::PortDeclarationList));
        match (group, list) {
            (_, Some(list)) if !self.tree.tokens(list).is_empty() => {
                self.tree.insert_after(list, &format!(",\n{ports}"))?;
            }
            (Some(group), _) => {
                let open = self
                    .child_word(group, "(")
                    .ok_or_else(|| self.tree.shape_error(group, "`(`"))?;
                self.tree.insert_after(open, &ports)?;
            }
            (None, _) => {
                let semicolon = self
                    .child_word(header, ";")
                    .ok_or_else(|| self.tree.shape_error(header, "`;`"))?;
                self.tree.insert_before(semicolon, &format!("({ports})"))?;
            }
        }

        self.tree.insert_after(header, &self.synth.genvar())?;
        if non_ansi {
            self.tree
                .insert_after(header, &self.synth.port_declarations(state))?;
        }
        Ok(())
    }

    fn inside_subroutine(&self, mut id: NodeId) -> bool {
        while let Some(parent) = self.tree.parent(id) {
            if self.tree.is(parent, &NodeKind::FunctionDeclaration)
                || self.tree.is(parent, &NodeKind::TaskDeclaration)
            {
                return true;
            }
            if parent == self.module.node {
                break;
            }
            id = parent;
        }
        false
    }

    /// Appends state connections to an instance's port list.
    fn connect(&mut self, gate: NodeId, text: &str) -> Result<(), StateError> {
        match self.tree.find(gate, NodeKind::PortActualList) {
            Some(list) if !self.tree.tokens(list).is_empty() => {
                self.tree.insert_after(list, &format!(",\n{text}"))?;
            }
            Some(list) => {
                self.tree.insert_after(list, text)?;
            }
            None => {
                let open = self
                    .tree
                    .descendants(gate)
                    .into_iter()
                    .find(|&n| self.tree.is_word(n, "("))
                    .ok_or_else(|| self.tree.shape_error(gate, "a port connection list"))?;
                self.tree.insert_after(open, text)?;
            }
        }
        Ok(())
    }
}

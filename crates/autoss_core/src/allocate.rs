//! Hierarchical state allocation.
//!
//! Each module's state vector holds its own registers first, then the state
//! of every stateful instance, in declaration order. Sizes stay symbolic in
//! the module's parameters; an instance substitutes its effective parameter
//! values into the definition's sizes.

use crate::design::Design;
use crate::dimension::Dimension;
use crate::entities::{Module, ModuleInstance};
use crate::error::StateError;
use crate::expr::Expr;
use crate::ids::ModuleId;
use autoss_config::AutossConfig;
use std::collections::{BTreeSet, HashMap, HashSet};

impl Design {
    /// Allocates the state of module `id` and, recursively, of everything it
    /// instantiates. Returns the module's state range, `None` if it holds no
    /// state.
    ///
    /// Results are memoized on the module; later calls return the stored
    /// range.
    pub fn allocate(
        &mut self,
        id: ModuleId,
        config: &AutossConfig,
    ) -> Result<Option<Dimension>, StateError> {
        let mut stack = Vec::new();
        self.allocate_in(id, config, &mut stack)
    }

    fn allocate_in(
        &mut self,
        id: ModuleId,
        config: &AutossConfig,
        stack: &mut Vec<ModuleId>,
    ) -> Result<Option<Dimension>, StateError> {
        if self.module(id).allocated {
            return Ok(self.module(id).state_dim.clone());
        }
        if let Some(pos) = stack.iter().position(|&m| m == id) {
            let mut cycle: Vec<String> = stack[pos..]
                .iter()
                .map(|&m| self.module(m).name.clone())
                .collect();
            cycle.push(self.module(id).name.clone());
            return Err(StateError::InstantiationCycle { cycle });
        }
        stack.push(id);
        let result = self.allocate_module(id, config, stack);
        stack.pop();
        result
    }

    fn allocate_module(
        &mut self,
        id: ModuleId,
        config: &AutossConfig,
        stack: &mut Vec<ModuleId>,
    ) -> Result<Option<Dimension>, StateError> {
        let name = self.module(id).name.clone();
        let expr_err = |e| StateError::expr(&name, e);

        let out_port = config.out_port();
        if let Some(mut out) = self.module(id).register(&out_port).cloned() {
            out.allocate(&Expr::zero()).map_err(expr_err)?;
            let dim = out.allocated.clone();
            let module = self.module_mut(id);
            module.registers = vec![out];
            module.assignments.clear();
            module.state_dim = dim.clone();
            module.reg_dim = dim.clone();
            module.sub_dim = None;
            module.predefined = true;
            module.allocated = true;
            tracing::debug!(module = %name, state = ?dim.as_ref().map(Dimension::to_decl_text), "predefined state interface");
            return Ok(dim);
        }

        let module = self.module_mut(id);
        let assigned: BTreeSet<String> = module
            .assignments
            .iter()
            .flat_map(|a| a.targets.iter().cloned())
            .collect();
        module.registers.retain(|r| assigned.contains(&r.name));
        let mut offset = Expr::zero();
        for register in &mut module.registers {
            offset = register.allocate(&offset).map_err(expr_err)?;
        }
        let allocated: HashSet<String> = module.registers.iter().map(|r| r.name.clone()).collect();
        for assignment in &mut module.assignments {
            assignment.registers = assignment
                .targets
                .iter()
                .filter(|t| allocated.contains(*t))
                .cloned()
                .collect();
        }
        let reg_end = offset.clone();

        for index in 0..self.module(id).instances.len() {
            let child = self.instance_target(id, index)?;
            let Some(child_state) = self.allocate_in(child, config, stack)? else {
                continue;
            };
            let parent = self.module(id);
            let instance = &parent.instances[index];
            let child_module = self.module(child);
            let env = effective_parameters(parent, instance, child_module, &child_state)?;

            let size = child_state.size().map_err(expr_err)?.substitute(&env).map_err(expr_err)?;
            let scoped = |dim: &Option<Dimension>| -> Result<Option<Expr>, StateError> {
                match dim {
                    Some(d) => Ok(Some(d.size().and_then(|s| s.substitute(&env)).map_err(expr_err)?)),
                    None => Ok(None),
                }
            };
            let reg_size = scoped(&child_module.reg_dim)?;
            let sub_size = scoped(&child_module.sub_dim)?;
            let range = Dimension::from_offset(&offset, &size).map_err(expr_err)?;
            offset = offset.add(&size).map_err(expr_err)?;

            let instance = &mut self.module_mut(id).instances[index];
            tracing::debug!(module = %name, instance = %instance.name, range = %range, "allocated instance");
            instance.allocated = Some(range);
            instance.reg_size = reg_size;
            instance.sub_size = sub_size;
        }

        let one = Expr::constant(1);
        let upper = |end: &Expr| end.sub(&one).map_err(expr_err);
        let module = self.module_mut(id);
        module.reg_dim = if reg_end.is_zero() {
            None
        } else {
            Some(Dimension::new(upper(&reg_end)?, Some(Expr::zero())))
        };
        module.sub_dim = if offset == reg_end {
            None
        } else {
            Some(Dimension::new(upper(&offset)?, Some(reg_end)))
        };
        module.state_dim = if offset.is_zero() {
            None
        } else {
            Some(Dimension::new(upper(&offset)?, Some(Expr::zero())))
        };
        module.allocated = true;
        tracing::debug!(
            module = %name,
            state = ?module.state_dim.as_ref().map(Dimension::to_decl_text),
            "allocated module"
        );
        Ok(module.state_dim.clone())
    }

    /// The definition an instance refers to, looked up by name when the
    /// design has not been resolved.
    fn instance_target(&self, id: ModuleId, index: usize) -> Result<ModuleId, StateError> {
        let module = self.module(id);
        let instance = &module.instances[index];
        match instance.module {
            Some(target) => Ok(target),
            None => self.lookup(&instance.module_name).ok_or_else(|| StateError::ModuleNotFound {
                name: instance.module_name.clone(),
                referenced_by: Some(format!("{}.{}", module.name, instance.name)),
                span: instance.span,
            }),
        }
    }

    /// Number of stateful module instances below `id`, counted through the
    /// whole hierarchy. Memoized once `id` has been allocated; before that
    /// the count is 0.
    pub fn ancestor_count(&mut self, id: ModuleId) -> usize {
        if let Some(count) = self.module(id).ancestors {
            return count;
        }
        let children: Vec<ModuleId> = self
            .module(id)
            .instances
            .iter()
            .filter(|i| i.allocated.is_some())
            .filter_map(|i| i.module.or_else(|| self.lookup(&i.module_name)))
            .collect();
        let count: usize = children
            .into_iter()
            .map(|child| 1 + self.ancestor_count(child))
            .sum();
        if self.module(id).allocated {
            self.module_mut(id).ancestors = Some(count);
        }
        count
    }

    /// One line per stateful instance of `id`, logged at info level.
    pub fn allocation_report(&mut self, id: ModuleId) -> Vec<String> {
        let count = self.ancestor_count(id);
        let module = self.module(id);
        let mut lines = vec![format!(
            "{}: {} stateful instance(s), state {}",
            module.name,
            count,
            module
                .state_dim
                .as_ref()
                .map_or_else(|| "none".to_string(), Dimension::to_decl_text),
        )];
        for instance in &module.instances {
            if let Some(range) = &instance.allocated {
                lines.push(format!(
                    "  {} ({}) {}",
                    instance.name, instance.module_name, range
                ));
            }
        }
        for line in &lines {
            tracing::info!("{line}");
        }
        lines
    }
}

/// Values of the child parameters that `child_state` depends on, as seen by
/// `instance`.
///
/// Positional overrides fill the non-local parameters in declaration order,
/// named overrides replace by name and everything else falls back to the
/// default, itself resolved in the child's scope. Overrides are expressions
/// of the parent's parameters and stay symbolic in them.
fn effective_parameters(
    parent: &Module,
    instance: &ModuleInstance,
    child: &Module,
    child_state: &Dimension,
) -> Result<HashMap<String, Expr>, StateError> {
    let mut overrides: HashMap<&str, &str> = HashMap::new();
    let formal = child.parameters.iter().filter(|p| !p.local);
    for (param, value) in formal.zip(&instance.params) {
        overrides.insert(&param.name, value);
    }
    for (name, value) in &instance.named_params {
        overrides.insert(name, value);
    }
    let defaults: HashMap<&str, &str> = child
        .parameters
        .iter()
        .map(|p| (p.name.as_str(), p.default.as_str()))
        .collect();

    let mut scope = Scope {
        parent,
        instance,
        child,
        overrides,
        defaults,
        values: HashMap::new(),
        resolving: HashSet::new(),
    };
    let mut symbols = child_state.end().symbols();
    symbols.extend(child_state.begin().symbols());
    for sub in [&child.reg_dim, &child.sub_dim].into_iter().flatten() {
        symbols.extend(sub.end().symbols());
        symbols.extend(sub.begin().symbols());
    }
    for symbol in symbols {
        scope.resolve(&symbol)?;
    }
    Ok(scope.values)
}

struct Scope<'a> {
    parent: &'a Module,
    instance: &'a ModuleInstance,
    child: &'a Module,
    overrides: HashMap<&'a str, &'a str>,
    defaults: HashMap<&'a str, &'a str>,
    values: HashMap<String, Expr>,
    resolving: HashSet<String>,
}

impl Scope<'_> {
    /// Resolves one child parameter; names that are not parameters of the
    /// child are left alone.
    fn resolve(&mut self, name: &str) -> Result<(), StateError> {
        if self.values.contains_key(name) || self.resolving.contains(name) {
            return Ok(());
        }
        if let Some(text) = self.overrides.get(name) {
            let value = Expr::parse(text).map_err(|source| StateError::Expr {
                module: self.parent.name.clone(),
                source,
                span: self.instance.span,
            })?;
            self.values.insert(name.to_string(), value);
            return Ok(());
        }
        let Some(text) = self.defaults.get(name).copied() else {
            return Ok(());
        };
        let child_err = |e| StateError::expr(&self.child.name, e);
        let default = Expr::parse(text).map_err(child_err)?;
        self.resolving.insert(name.to_string());
        for symbol in default.symbols() {
            self.resolve(&symbol)?;
        }
        self.resolving.remove(name);
        let value = default
            .substitute(&self.values)
            .map_err(|e| StateError::expr(&self.child.name, e))?;
        self.values.insert(name.to_string(), value);
        Ok(())
    }
}

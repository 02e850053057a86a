//! The module table of one generator run.

use crate::arena::Arena;
use crate::entities::Module;
use crate::error::StateError;
use crate::ids::{ModuleId, TreeId};
use autoss_syntax::SyntaxTree;
use std::collections::HashMap;

/// A parsed input file.
#[derive(Debug)]
pub struct SourceTree {
    /// Display path of the input.
    pub path: String,
    /// Its syntax tree.
    pub tree: SyntaxTree,
}

/// All syntax trees and module definitions of a run.
///
/// Modules live in an arena and refer to each other by [`ModuleId`]; many
/// instances may share one definition.
#[derive(Debug, Default)]
pub struct Design {
    trees: Arena<TreeId, SourceTree>,
    modules: Arena<ModuleId, Module>,
    by_name: HashMap<String, ModuleId>,
}

impl Design {
    /// Creates an empty design.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a parsed file and returns its ID.
    pub fn add_tree(&mut self, path: impl Into<String>, tree: SyntaxTree) -> TreeId {
        self.trees.alloc(SourceTree {
            path: path.into(),
            tree,
        })
    }

    /// Registers a module definition.
    ///
    /// Fails with [`StateError::DuplicateModule`] if a module of the same
    /// name is already registered.
    pub fn add_module(&mut self, module: Module) -> Result<ModuleId, StateError> {
        if let Some(&existing) = self.by_name.get(&module.name) {
            let first = &self.modules[existing];
            return Err(StateError::DuplicateModule {
                name: module.name.clone(),
                first: self.trees[first.tree].path.clone(),
                second: self.trees[module.tree].path.clone(),
                span: module.span,
            });
        }
        let name = module.name.clone();
        let id = self.modules.alloc(module);
        self.by_name.insert(name, id);
        tracing::debug!(module = %self.modules[id].name, "registered module");
        Ok(id)
    }

    /// Finds a module by name.
    pub fn lookup(&self, name: &str) -> Option<ModuleId> {
        self.by_name.get(name).copied()
    }

    /// The module with ID `id`.
    pub fn module(&self, id: ModuleId) -> &Module {
        &self.modules[id]
    }

    /// Mutable access to module `id`.
    pub fn module_mut(&mut self, id: ModuleId) -> &mut Module {
        &mut self.modules[id]
    }

    /// Every module ID in registration order.
    pub fn module_ids(&self) -> impl Iterator<Item = ModuleId> + '_ {
        self.modules.ids()
    }

    /// Number of registered modules.
    pub fn module_count(&self) -> usize {
        self.modules.len()
    }

    /// The file with ID `id`.
    pub fn source(&self, id: TreeId) -> &SourceTree {
        &self.trees[id]
    }

    /// The syntax tree of file `id`.
    pub fn tree(&self, id: TreeId) -> &SyntaxTree {
        &self.trees[id].tree
    }

    /// Mutable access to the syntax tree of file `id`.
    pub fn tree_mut(&mut self, id: TreeId) -> &mut SyntaxTree {
        &mut self.trees[id].tree
    }

    /// The syntax tree holding module `id`, with the module, for callers
    /// that edit the tree while reading the module.
    pub fn module_and_tree_mut(&mut self, id: ModuleId) -> (&Module, &mut SyntaxTree) {
        let module = &self.modules[id];
        (module, &mut self.trees[module.tree].tree)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use autoss_source::FileId;
    use autoss_syntax::NodeId;

    fn empty_tree() -> SyntaxTree {
        SyntaxTree::new(FileId::from_raw(0), String::new())
    }

    #[test]
    fn lookup_by_name() {
        let mut design = Design::new();
        let t = design.add_tree("a.v", empty_tree());
        let id = design
            .add_module(Module::new("alu", t, NodeId::from_raw(0)))
            .unwrap();
        assert_eq!(design.lookup("alu"), Some(id));
        assert_eq!(design.lookup("fpu"), None);
        assert_eq!(design.module(id).name, "alu");
        assert_eq!(design.module_count(), 1);
        assert_eq!(design.source(t).path, "a.v");
    }

    #[test]
    fn duplicate_names_name_both_files() {
        let mut design = Design::new();
        let a = design.add_tree("a.v", empty_tree());
        let b = design.add_tree("b.v", empty_tree());
        design
            .add_module(Module::new("alu", a, NodeId::from_raw(0)))
            .unwrap();
        let err = design
            .add_module(Module::new("alu", b, NodeId::from_raw(0)))
            .unwrap_err();
        match err {
            StateError::DuplicateModule { name, first, second, .. } => {
                assert_eq!(name, "alu");
                assert_eq!(first, "a.v");
                assert_eq!(second, "b.v");
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}

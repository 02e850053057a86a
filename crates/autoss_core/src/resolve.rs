//! Binding instances to module definitions and ordering the hierarchy.

use crate::design::Design;
use crate::error::StateError;
use crate::ids::ModuleId;
use autoss_source::Span;
use petgraph::algo::kosaraju_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::{HashMap, HashSet, VecDeque};

impl Design {
    /// Binds every instance of every module to its definition and checks
    /// that the instance graph is acyclic. Returns the ID of `root`.
    pub fn resolve(&mut self, root: &str) -> Result<ModuleId, StateError> {
        let root_id = self.lookup(root).ok_or_else(|| StateError::ModuleNotFound {
            name: root.to_string(),
            referenced_by: None,
            span: Span::DUMMY,
        })?;

        let ids: Vec<ModuleId> = self.module_ids().collect();
        for id in ids {
            for index in 0..self.module(id).instances.len() {
                let module = self.module(id);
                let instance = &module.instances[index];
                let target = self.lookup(&instance.module_name).ok_or_else(|| {
                    StateError::ModuleNotFound {
                        name: instance.module_name.clone(),
                        referenced_by: Some(format!("{}.{}", module.name, instance.name)),
                        span: instance.span,
                    }
                })?;
                self.module_mut(id).instances[index].module = Some(target);
            }
        }

        self.check_acyclic()?;
        tracing::debug!(root, modules = self.module_count(), "resolved design");
        Ok(root_id)
    }

    /// The instance graph: an edge from each module to every module it
    /// instantiates.
    fn instance_graph(&self) -> (DiGraph<ModuleId, ()>, HashMap<ModuleId, NodeIndex>) {
        let mut graph = DiGraph::new();
        let mut nodes = HashMap::new();
        for id in self.module_ids() {
            nodes.insert(id, graph.add_node(id));
        }
        for id in self.module_ids() {
            for child in self.module(id).instances.iter().filter_map(|i| i.module) {
                graph.update_edge(nodes[&id], nodes[&child], ());
            }
        }
        (graph, nodes)
    }

    fn check_acyclic(&self) -> Result<(), StateError> {
        let (graph, _) = self.instance_graph();
        for scc in kosaraju_scc(&graph) {
            let looped = scc.len() > 1 || graph.contains_edge(scc[0], scc[0]);
            if !looped {
                continue;
            }
            let members: HashSet<NodeIndex> = scc.iter().copied().collect();
            let Some(&start) = scc.iter().min_by_key(|&&n| graph[n]) else {
                continue;
            };
            let cycle = cycle_through(&graph, start, &members)
                .into_iter()
                .map(|n| self.module(graph[n]).name.clone())
                .collect();
            return Err(StateError::InstantiationCycle { cycle });
        }
        Ok(())
    }

    /// Every module reachable from `root`, each once, instantiated modules
    /// before the modules instantiating them (instance declaration order).
    pub fn post_order(&self, root: ModuleId) -> Vec<ModuleId> {
        let mut order = Vec::new();
        let mut visited = HashSet::from([root]);
        let mut stack = vec![(root, 0usize)];
        while let Some((id, next)) = stack.pop() {
            let children = &self.module(id).instances;
            if let Some(child) = children.get(next) {
                stack.push((id, next + 1));
                if let Some(child) = child.module {
                    if visited.insert(child) {
                        stack.push((child, 0));
                    }
                }
            } else {
                order.push(id);
            }
        }
        order
    }
}

/// A shortest path from `start` back to itself inside one strongly
/// connected component, as a list that repeats `start` at the end.
fn cycle_through(
    graph: &DiGraph<ModuleId, ()>,
    start: NodeIndex,
    members: &HashSet<NodeIndex>,
) -> Vec<NodeIndex> {
    let mut previous: HashMap<NodeIndex, NodeIndex> = HashMap::new();
    let mut queue = VecDeque::from([start]);
    let mut last = None;
    'search: while let Some(node) = queue.pop_front() {
        let mut next: Vec<NodeIndex> = graph.neighbors(node).collect();
        next.sort_by_key(|&n| graph[n]);
        for n in next {
            if n == start {
                last = Some(node);
                break 'search;
            }
            if members.contains(&n) && !previous.contains_key(&n) {
                previous.insert(n, node);
                queue.push_back(n);
            }
        }
    }
    let mut path = vec![start];
    let mut node = last.unwrap_or(start);
    while node != start {
        path.push(node);
        node = previous[&node];
    }
    path.push(start);
    let end = path.len() - 1;
    path[1..end].reverse();
    path
}

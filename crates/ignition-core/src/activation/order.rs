//! Start and stop ordering over the service graph.
//!
//! Edges run consumer -> provider. Tarjan's algorithm emits a strongly
//! connected component only after every component it reaches, so its output
//! is already providers-first. Roots and edges are walked in discovery and
//! declaration order, which makes the result deterministic.
use std::collections::{HashMap, HashSet};

use crate::plugin_system::id::PluginId;
use crate::resolver::graph::ServiceGraph;

struct Tarjan<'g> {
    graph: &'g ServiceGraph,
    next_index: usize,
    index: HashMap<PluginId, usize>,
    lowlink: HashMap<PluginId, usize>,
    stack: Vec<PluginId>,
    on_stack: HashSet<PluginId>,
    components: Vec<Vec<PluginId>>,
}

impl<'g> Tarjan<'g> {
    fn new(graph: &'g ServiceGraph) -> Self {
        Self {
            graph,
            next_index: 0,
            index: HashMap::new(),
            lowlink: HashMap::new(),
            stack: Vec::new(),
            on_stack: HashSet::new(),
            components: Vec::new(),
        }
    }

    fn run(mut self) -> Vec<Vec<PluginId>> {
        for id in self.graph.plugins() {
            if !self.index.contains_key(id) {
                self.visit(*id);
            }
        }
        self.components
    }

    /// Depth-first walk from `root` with an explicit frame stack, so long
    /// dependency chains do not grow the call stack.
    fn visit(&mut self, root: PluginId) {
        let mut frames = vec![self.enter(root)];
        while let Some(frame) = frames.last_mut() {
            let id = frame.id;
            if let Some(&provider) = frame.providers.get(frame.next) {
                frame.next += 1;
                if !self.index.contains_key(&provider) {
                    let child = self.enter(provider);
                    frames.push(child);
                } else if self.on_stack.contains(&provider) {
                    let low = self.lowlink[&id].min(self.index[&provider]);
                    self.lowlink.insert(id, low);
                }
                continue;
            }

            frames.pop();
            if let Some(parent) = frames.last() {
                let low = self.lowlink[&parent.id].min(self.lowlink[&id]);
                self.lowlink.insert(parent.id, low);
            }
            if self.lowlink[&id] == self.index[&id] {
                let mut component = Vec::new();
                while let Some(member) = self.stack.pop() {
                    self.on_stack.remove(&member);
                    component.push(member);
                    if member == id {
                        break;
                    }
                }
                self.components.push(component);
            }
        }
    }

    fn enter(&mut self, id: PluginId) -> Frame {
        self.index.insert(id, self.next_index);
        self.lowlink.insert(id, self.next_index);
        self.next_index += 1;
        self.stack.push(id);
        self.on_stack.insert(id);
        Frame {
            id,
            providers: self.graph.providers_of(id).map(|(provider, _)| provider).collect(),
            next: 0,
        }
    }
}

struct Frame {
    id: PluginId,
    providers: Vec<PluginId>,
    next: usize,
}

/// Groups of `members` in start order: providers before consumers, each
/// reference cycle as one group sorted by discovery order.
///
/// Ordering is computed on the whole graph so that a dependency running
/// through a plugin outside `members` still orders the members around it.
pub fn start_groups(graph: &ServiceGraph, members: &HashSet<PluginId>) -> Vec<Vec<PluginId>> {
    Tarjan::new(graph)
        .run()
        .into_iter()
        .filter_map(|component| {
            let mut group: Vec<PluginId> = component.into_iter().filter(|id| members.contains(id)).collect();
            if group.is_empty() {
                return None;
            }
            group.sort_by_key(|id| graph.position(id));
            Some(group)
        })
        .collect()
}

/// `members` in stop order: consumers before providers
pub fn stop_order(graph: &ServiceGraph, members: &HashSet<PluginId>) -> Vec<PluginId> {
    let mut order: Vec<PluginId> = start_groups(graph, members).into_iter().flatten().collect();
    order.reverse();
    order
}

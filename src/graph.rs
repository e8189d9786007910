//! In-memory graph model: nodes, terminals, connections.
//!
//! The node/terminal/connection web is inherently cyclic, so nodes live in an
//! arena owned by the [`Graph`] and connections store plain
//! (node id, terminal id) endpoints resolved through graph lookups. All
//! structural mutation goes through graph methods so the mutual
//! back-reference invariant between an input's `connection` and the source
//! output's connection list is never observable half-installed.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use anyhow::{Result, anyhow, bail};
use serde_json::Value;

use crate::expr::DataType;
use crate::operator::Operator;
use crate::render::{GlResources, Renderer};

/// Node ids are unique within a graph and assigned monotonically. Zero means
/// "not yet added".
pub type NodeId = u32;

/// Change kinds propagated through the mark-and-coalesce notification model.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChangeType {
    ParamValueChanged,
    ConnectionChanged,
    NodeDeleted,
}

/// One endpoint of a connection, stored by id rather than by reference.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TerminalRef {
    pub node: NodeId,
    pub terminal: String,
}

impl TerminalRef {
    pub fn new(node: NodeId, terminal: impl Into<String>) -> Self {
        Self {
            node,
            terminal: terminal.into(),
        }
    }
}

/// A directed edge from an output terminal to an input terminal.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Connection {
    pub source: TerminalRef,
    pub dest: TerminalRef,
}

/// An input terminal holds at most one connection.
#[derive(Debug)]
pub struct InputTerminal {
    pub id: String,
    pub name: String,
    pub ty: DataType,
    pub connection: Option<Connection>,
}

/// An output terminal fans out to any number of destinations, de-duplicated
/// by destination.
#[derive(Debug)]
pub struct OutputTerminal {
    pub id: String,
    pub name: String,
    pub ty: DataType,
    pub connections: Vec<Connection>,
}

impl OutputTerminal {
    /// Remove one connection from the fan-out list.
    pub fn disconnect(&mut self, connection: &Connection) -> bool {
        if let Some(index) = self.connections.iter().position(|c| c == connection) {
            self.connections.remove(index);
            true
        } else {
            false
        }
    }
}

/// Either kind of terminal, for callers that probe by id.
pub enum Terminal<'a> {
    Input(&'a InputTerminal),
    Output(&'a OutputTerminal),
}

impl<'a> Terminal<'a> {
    pub fn id(&self) -> &str {
        match self {
            Terminal::Input(t) => &t.id,
            Terminal::Output(t) => &t.id,
        }
    }

    pub fn data_type(&self) -> DataType {
        match self {
            Terminal::Input(t) => t.ty,
            Terminal::Output(t) => t.ty,
        }
    }

    pub fn is_output(&self) -> bool {
        matches!(self, Terminal::Output(_))
    }
}

/// Token returned by [`Node::watch`], used to unregister.
pub type WatcherToken = u64;

pub type Watcher = Box<dyn FnMut(ChangeType)>;

/// A placed instance of an operator within a graph.
pub struct Node {
    pub id: NodeId,
    // Layout only, no semantic meaning.
    pub x: f64,
    pub y: f64,
    pub operator: Arc<dyn Operator>,
    /// Current parameter values; unset ids fall back to operator defaults.
    pub param_values: HashMap<String, Value>,
    pub selected: bool,
    pub deleted: bool,
    pub inputs: Vec<InputTerminal>,
    pub outputs: Vec<OutputTerminal>,
    /// GPU resources held on behalf of this node, released on delete.
    pub resources: GlResources,

    watchers: Vec<(WatcherToken, Watcher)>,
    next_watcher: WatcherToken,
    pending: Option<ChangeType>,
}

impl Node {
    /// Create a node with terminal instances derived from the operator's
    /// port declarations. The id is assigned when the node is added.
    pub fn new(operator: Arc<dyn Operator>) -> Self {
        let inputs = operator
            .inputs()
            .iter()
            .map(|input| InputTerminal {
                id: input.id.to_string(),
                name: input.name.to_string(),
                ty: input.ty,
                connection: None,
            })
            .collect();
        let outputs = operator
            .outputs()
            .iter()
            .map(|output| OutputTerminal {
                id: output.id.to_string(),
                name: output.name.to_string(),
                ty: output.ty,
                connections: Vec::new(),
            })
            .collect();
        Self {
            id: 0,
            x: 0.0,
            y: 0.0,
            operator,
            param_values: HashMap::new(),
            selected: false,
            deleted: false,
            inputs,
            outputs,
            resources: GlResources::default(),
            watchers: Vec::new(),
            next_watcher: 0,
            pending: None,
        }
    }

    /// The human-readable name of this node.
    pub fn name(&self) -> &str {
        self.operator.name()
    }

    pub fn find_input_terminal(&self, id: &str) -> Option<&InputTerminal> {
        self.inputs.iter().find(|t| t.id == id)
    }

    pub fn find_output_terminal(&self, id: &str) -> Option<&OutputTerminal> {
        self.outputs.iter().find(|t| t.id == id)
    }

    fn find_input_terminal_mut(&mut self, id: &str) -> Option<&mut InputTerminal> {
        self.inputs.iter_mut().find(|t| t.id == id)
    }

    fn find_output_terminal_mut(&mut self, id: &str) -> Option<&mut OutputTerminal> {
        self.outputs.iter_mut().find(|t| t.id == id)
    }

    pub fn find_terminal(&self, id: &str) -> Option<Terminal<'_>> {
        if let Some(t) = self.find_input_terminal(id) {
            return Some(Terminal::Input(t));
        }
        self.find_output_terminal(id).map(Terminal::Output)
    }

    /// Register a change watcher; returns a token for [`Node::unwatch`].
    pub fn watch(&mut self, watcher: Watcher) -> WatcherToken {
        let token = self.next_watcher;
        self.next_watcher += 1;
        self.watchers.push((token, watcher));
        token
    }

    pub fn unwatch(&mut self, token: WatcherToken) {
        self.watchers.retain(|(t, _)| *t != token);
    }

    fn mark_pending(&mut self, change: ChangeType) {
        if self.pending != Some(change) {
            self.pending = Some(change);
        }
    }

    fn notify_now(&mut self, change: ChangeType) {
        for (_, watcher) in &mut self.watchers {
            watcher(change);
        }
    }
}

/// Owns the nodes and enforces the structural invariants of the graph.
pub struct Graph {
    pub name: String,
    pub nodes: Vec<Node>,
    pub modified: bool,
    next_id: NodeId,
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}

impl Graph {
    pub fn new() -> Self {
        Self {
            name: "untitled".to_string(),
            nodes: Vec::new(),
            modified: false,
            next_id: 0,
        }
    }

    /// Add a node to the list, assigning a fresh id when it has none.
    pub fn add(&mut self, mut node: Node) -> NodeId {
        if node.id == 0 {
            self.next_id += 1;
            node.id = self.next_id;
        } else {
            self.next_id = self.next_id.max(node.id);
        }
        let id = node.id;
        self.nodes.push(node);
        self.modified = true;
        id
    }

    /// Locate a node by id; missing ids are a soft "not found".
    pub fn find_node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn find_node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.iter_mut().find(|n| n.id == id)
    }

    /// Locate a terminal by node and terminal id; soft "not found".
    pub fn find_terminal(&self, node_id: NodeId, terminal_id: &str) -> Option<Terminal<'_>> {
        self.find_node(node_id)?.find_terminal(terminal_id)
    }

    /// Resolve named endpoints and connect them.
    ///
    /// Unresolved node or terminal ids yield `Ok(false)` (interactive callers
    /// routinely probe names that do not exist); a resolved terminal with the
    /// wrong polarity is a hard error.
    pub fn connect(
        &mut self,
        src_node: NodeId,
        src_terminal: &str,
        dst_node: NodeId,
        dst_terminal: &str,
    ) -> Result<bool> {
        let (Some(sn), Some(dn)) = (self.find_node(src_node), self.find_node(dst_node)) else {
            return Ok(false);
        };
        let (Some(st), Some(dt)) = (sn.find_terminal(src_terminal), dn.find_terminal(dst_terminal))
        else {
            return Ok(false);
        };
        if !st.is_output() {
            bail!("attempt to connect from input terminal {src_node}:{src_terminal}");
        }
        if dt.is_output() {
            bail!("attempt to connect to output terminal {dst_node}:{dst_terminal}");
        }
        self.connect_terminals(
            TerminalRef::new(src_node, src_terminal),
            TerminalRef::new(dst_node, dst_terminal),
        )?;
        Ok(true)
    }

    /// Connect an output terminal to an input terminal.
    ///
    /// Reconnecting an input to the same source is a no-op; a different
    /// source replaces the prior connection, disconnecting it first. Both
    /// endpoint nodes receive a `ConnectionChanged` mark.
    pub fn connect_terminals(&mut self, source: TerminalRef, dest: TerminalRef) -> Result<()> {
        {
            let src_node = self
                .find_node(source.node)
                .ok_or_else(|| anyhow!("source node not found: {}", source.node))?;
            match src_node.find_terminal(&source.terminal) {
                Some(t) if t.is_output() => {}
                Some(_) => bail!(
                    "attempt to connect from input terminal {}:{}",
                    source.node,
                    source.terminal
                ),
                None => bail!("source terminal not found: {}:{}", source.node, source.terminal),
            }
        }
        let old = {
            let dst_node = self
                .find_node(dest.node)
                .ok_or_else(|| anyhow!("destination node not found: {}", dest.node))?;
            match dst_node.find_terminal(&dest.terminal) {
                Some(Terminal::Input(t)) => t.connection.clone(),
                Some(Terminal::Output(_)) => bail!(
                    "attempt to connect to output terminal {}:{}",
                    dest.node,
                    dest.terminal
                ),
                None => bail!(
                    "destination terminal not found: {}:{}",
                    dest.node,
                    dest.terminal
                ),
            }
        };

        if let Some(old) = &old {
            if old.source == source {
                return Ok(());
            }
        }
        if let Some(old) = old {
            self.remove_connection(&old);
        }

        let connection = Connection {
            source: source.clone(),
            dest: dest.clone(),
        };
        if let Some(out) = self
            .find_node_mut(source.node)
            .and_then(|n| n.find_output_terminal_mut(&source.terminal))
        {
            if !out.connections.iter().any(|c| c.dest == connection.dest) {
                out.connections.push(connection.clone());
            }
        }
        if let Some(input) = self
            .find_node_mut(dest.node)
            .and_then(|n| n.find_input_terminal_mut(&dest.terminal))
        {
            input.connection = Some(connection);
        }

        self.notify_change(source.node, ChangeType::ConnectionChanged);
        self.notify_change(dest.node, ChangeType::ConnectionChanged);
        self.modified = true;
        Ok(())
    }

    /// Remove a connection from both endpoints. Tolerates endpoints that no
    /// longer resolve.
    fn remove_connection(&mut self, connection: &Connection) {
        if let Some(out) = self
            .find_node_mut(connection.source.node)
            .and_then(|n| n.find_output_terminal_mut(&connection.source.terminal))
        {
            out.disconnect(connection);
        }
        if let Some(input) = self
            .find_node_mut(connection.dest.node)
            .and_then(|n| n.find_input_terminal_mut(&connection.dest.terminal))
        {
            if input.connection.as_ref() == Some(connection) {
                input.connection = None;
            }
        }
    }

    /// Disconnect whatever feeds the given input, if anything.
    pub fn disconnect_input(&mut self, node_id: NodeId, terminal_id: &str) -> bool {
        let connection = self
            .find_node(node_id)
            .and_then(|n| n.find_input_terminal(terminal_id))
            .and_then(|t| t.connection.clone());
        match connection {
            Some(connection) => {
                self.remove_connection(&connection);
                self.notify_change(connection.source.node, ChangeType::ConnectionChanged);
                self.notify_change(node_id, ChangeType::ConnectionChanged);
                self.modified = true;
                true
            }
            None => false,
        }
    }

    /// Set a parameter value and mark the node (and everything downstream)
    /// changed. Returns false when the node does not exist.
    pub fn set_param_value(&mut self, node_id: NodeId, param_id: &str, value: Value) -> bool {
        let Some(node) = self.find_node_mut(node_id) else {
            return false;
        };
        node.param_values.insert(param_id.to_string(), value);
        self.notify_change(node_id, ChangeType::ParamValueChanged);
        self.modified = true;
        true
    }

    /// Selection is a derived view over per-node `selected` flags.
    pub fn selection(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter().filter(|n| n.selected)
    }

    pub fn clear_selection(&mut self) {
        for node in &mut self.nodes {
            node.selected = false;
        }
    }

    /// Delete every selected node: disconnect all of its edges, release its
    /// GPU resources, then drop it from the list.
    pub fn delete_selection(&mut self, renderer: &mut dyn Renderer) {
        let targets: Vec<NodeId> = self.selection().map(|n| n.id).collect();
        self.remove_nodes(&targets, renderer);
    }

    /// Delete every node in the graph.
    pub fn clear(&mut self, renderer: &mut dyn Renderer) {
        let targets: Vec<NodeId> = self.nodes.iter().map(|n| n.id).collect();
        self.remove_nodes(&targets, renderer);
    }

    fn remove_nodes(&mut self, targets: &[NodeId], renderer: &mut dyn Renderer) {
        for &id in targets {
            let mut connections: Vec<Connection> = Vec::new();
            if let Some(node) = self.find_node(id) {
                for output in &node.outputs {
                    connections.extend(output.connections.iter().cloned());
                }
                for input in &node.inputs {
                    connections.extend(input.connection.iter().cloned());
                }
            }
            for connection in &connections {
                self.remove_connection(connection);
                let peer = if connection.source.node == id {
                    connection.dest.node
                } else {
                    connection.source.node
                };
                if !targets.contains(&peer) {
                    self.notify_change(peer, ChangeType::ConnectionChanged);
                }
            }
            if let Some(node) = self.find_node_mut(id) {
                if !node.deleted {
                    node.deleted = true;
                    node.resources.release(renderer);
                    // The node is gone before the next flush; notify now.
                    node.notify_now(ChangeType::NodeDeleted);
                }
            }
        }
        self.nodes.retain(|n| !targets.contains(&n.id));
        self.modified = true;
    }

    /// Visit all nodes which transitively feed into this node's inputs.
    /// Return false from the callback to stop descending past that node.
    pub fn visit_upstream_nodes(
        &self,
        start: NodeId,
        callback: &mut dyn FnMut(&Node, &str) -> bool,
    ) {
        let mut visited: HashSet<NodeId> = HashSet::new();
        let mut stack = vec![start];
        visited.insert(start);
        while let Some(id) = stack.pop() {
            let Some(node) = self.find_node(id) else {
                continue;
            };
            for input in &node.inputs {
                if let Some(connection) = &input.connection {
                    let source = &connection.source;
                    if let Some(upstream) = self.find_node(source.node) {
                        if callback(upstream, &source.terminal) && visited.insert(source.node) {
                            stack.push(source.node);
                        }
                    }
                }
            }
        }
    }

    /// Visit all nodes which transitively depend on this node's outputs.
    /// Return false from the callback to stop descending past that node.
    pub fn visit_downstream_nodes(
        &self,
        start: NodeId,
        callback: &mut dyn FnMut(&Node, &str) -> bool,
    ) {
        let mut visited: HashSet<NodeId> = HashSet::new();
        let mut stack = vec![start];
        visited.insert(start);
        while let Some(id) = stack.pop() {
            let Some(node) = self.find_node(id) else {
                continue;
            };
            for output in &node.outputs {
                for connection in &output.connections {
                    let dest = &connection.dest;
                    if let Some(downstream) = self.find_node(dest.node) {
                        if callback(downstream, &dest.terminal) && visited.insert(dest.node) {
                            stack.push(dest.node);
                        }
                    }
                }
            }
        }
    }

    /// Would adding an edge from an output on `source_node` to an input on
    /// `dest_node` create a directed cycle? True when `dest_node` is already
    /// upstream of `source_node` (or the edge is a self-loop). Runs in time
    /// proportional to the reachable subgraph.
    pub fn would_create_cycle(&self, source_node: NodeId, dest_node: NodeId) -> bool {
        if source_node == dest_node {
            return true;
        }
        let mut found = false;
        self.visit_upstream_nodes(source_node, &mut |node, _| {
            if node.id == dest_node {
                found = true;
                return false;
            }
            true
        });
        found
    }

    /// Defensive probe: does a cycle exist on the upstream paths from this
    /// node? Graph methods reject cycle-forming edges up front, but callers
    /// that bypassed `connect` can still ask.
    pub fn is_cyclic_from(&self, start: NodeId) -> bool {
        fn visit(
            graph: &Graph,
            id: NodeId,
            visiting: &mut HashSet<NodeId>,
            done: &mut HashSet<NodeId>,
        ) -> bool {
            if done.contains(&id) {
                return false;
            }
            if !visiting.insert(id) {
                return true;
            }
            if let Some(node) = graph.find_node(id) {
                for input in &node.inputs {
                    if let Some(connection) = &input.connection {
                        if visit(graph, connection.source.node, visiting, done) {
                            return true;
                        }
                    }
                }
            }
            visiting.remove(&id);
            done.insert(id);
            false
        }
        visit(self, start, &mut HashSet::new(), &mut HashSet::new())
    }

    /// Mark a node changed and propagate the mark to every downstream node,
    /// de-duplicated by a visited set. Recompute is deferred until the host
    /// calls [`Graph::flush_pending`] on its next scheduled pass.
    pub fn notify_change(&mut self, node_id: NodeId, change: ChangeType) {
        let mut targets = vec![node_id];
        if change != ChangeType::NodeDeleted {
            self.visit_downstream_nodes(node_id, &mut |node, _| {
                targets.push(node.id);
                true
            });
        }
        for id in targets {
            if let Some(node) = self.find_node_mut(id) {
                node.mark_pending(change);
            }
        }
    }

    /// Deliver all coalesced pending marks to node watchers, in node list
    /// order, and clear them.
    pub fn flush_pending(&mut self) {
        for node in &mut self.nodes {
            if let Some(change) = node.pending.take() {
                node.notify_now(change);
            }
        }
    }

    pub(crate) fn clear_pending(&mut self) {
        for node in &mut self.nodes {
            node.pending = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Registry;
    use crate::render::NullRenderer;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn test_graph() -> (Graph, Registry) {
        (Graph::new(), Registry::with_builtins())
    }

    fn add_op(graph: &mut Graph, registry: &Registry, op_id: &str) -> NodeId {
        graph.add(Node::new(registry.get(op_id).unwrap()))
    }

    #[test]
    fn add_assigns_monotonic_unique_ids() {
        let (mut graph, registry) = test_graph();
        let a = add_op(&mut graph, &registry, "pattern_bricks");
        let b = add_op(&mut graph, &registry, "filter_blend");
        assert_eq!(a, 1);
        assert_eq!(b, 2);
        assert!(graph.modified);
    }

    #[test]
    fn connect_installs_both_back_references() {
        let (mut graph, registry) = test_graph();
        let a = add_op(&mut graph, &registry, "pattern_bricks");
        let b = add_op(&mut graph, &registry, "filter_colorizer");
        assert!(graph.connect(a, "out", b, "in").unwrap());

        let dest = graph.find_node(b).unwrap().find_input_terminal("in").unwrap();
        let connection = dest.connection.clone().unwrap();
        assert_eq!(connection.source, TerminalRef::new(a, "out"));
        let src = graph.find_node(a).unwrap().find_output_terminal("out").unwrap();
        assert_eq!(src.connections, vec![connection]);
    }

    #[test]
    fn connect_unknown_names_is_soft_false() {
        let (mut graph, registry) = test_graph();
        let a = add_op(&mut graph, &registry, "pattern_bricks");
        let b = add_op(&mut graph, &registry, "filter_colorizer");
        assert!(!graph.connect(a, "nope", b, "in").unwrap());
        assert!(!graph.connect(99, "out", b, "in").unwrap());
    }

    #[test]
    fn connect_wrong_polarity_is_error() {
        let (mut graph, registry) = test_graph();
        let a = add_op(&mut graph, &registry, "filter_blend");
        let b = add_op(&mut graph, &registry, "filter_colorizer");
        // "a" is an input on filter_blend.
        assert!(graph.connect(a, "a", b, "in").is_err());
        assert!(
            graph
                .connect_terminals(TerminalRef::new(b, "out"), TerminalRef::new(a, "out"))
                .is_err()
        );
    }

    #[test]
    fn reconnect_replaces_prior_connection() {
        let (mut graph, registry) = test_graph();
        let a = add_op(&mut graph, &registry, "pattern_bricks");
        let b = add_op(&mut graph, &registry, "pattern_noise");
        let c = add_op(&mut graph, &registry, "filter_colorizer");
        graph.connect(a, "out", c, "in").unwrap();
        graph.connect(b, "out", c, "in").unwrap();

        let old_src = graph.find_node(a).unwrap().find_output_terminal("out").unwrap();
        assert!(old_src.connections.is_empty());
        let dest = graph.find_node(c).unwrap().find_input_terminal("in").unwrap();
        assert_eq!(
            dest.connection.as_ref().unwrap().source,
            TerminalRef::new(b, "out")
        );
    }

    #[test]
    fn reconnect_same_source_is_noop() {
        let (mut graph, registry) = test_graph();
        let a = add_op(&mut graph, &registry, "pattern_bricks");
        let c = add_op(&mut graph, &registry, "filter_colorizer");
        graph.connect(a, "out", c, "in").unwrap();
        graph.connect(a, "out", c, "in").unwrap();
        let src = graph.find_node(a).unwrap().find_output_terminal("out").unwrap();
        assert_eq!(src.connections.len(), 1);
    }

    #[test]
    fn would_create_cycle_detects_upstream_reachability() {
        let (mut graph, registry) = test_graph();
        let a = add_op(&mut graph, &registry, "pattern_bricks");
        let b = add_op(&mut graph, &registry, "filter_colorizer");
        let c = add_op(&mut graph, &registry, "filter_blend");
        graph.connect(a, "out", b, "in").unwrap();
        graph.connect(b, "out", c, "a").unwrap();

        // c -> a would close the loop a -> b -> c.
        assert!(graph.would_create_cycle(c, a));
        assert!(graph.would_create_cycle(b, b));
        assert!(!graph.would_create_cycle(a, c));
    }

    #[test]
    fn is_cyclic_from_catches_bypass_constructed_cycles() {
        let (mut graph, registry) = test_graph();
        let a = add_op(&mut graph, &registry, "filter_colorizer");
        let b = add_op(&mut graph, &registry, "filter_colorizer");
        graph.connect(a, "out", b, "in").unwrap();
        graph.connect(b, "out", a, "in").unwrap();
        assert!(graph.is_cyclic_from(a));
        assert!(graph.is_cyclic_from(b));
    }

    #[test]
    fn delete_selection_leaves_no_dangling_connections() {
        let (mut graph, registry) = test_graph();
        let a = add_op(&mut graph, &registry, "pattern_bricks");
        let b = add_op(&mut graph, &registry, "filter_colorizer");
        let c = add_op(&mut graph, &registry, "filter_blend");
        graph.connect(a, "out", b, "in").unwrap();
        graph.connect(b, "out", c, "a").unwrap();
        graph.find_node_mut(b).unwrap().selected = true;

        let mut renderer = NullRenderer::default();
        graph.delete_selection(&mut renderer);

        assert!(graph.find_node(b).is_none());
        let src = graph.find_node(a).unwrap().find_output_terminal("out").unwrap();
        assert!(src.connections.is_empty());
        let dest = graph.find_node(c).unwrap().find_input_terminal("a").unwrap();
        assert!(dest.connection.is_none());
    }

    #[test]
    fn clear_empties_the_graph_and_selection_is_derived() {
        let (mut graph, registry) = test_graph();
        let a = add_op(&mut graph, &registry, "pattern_bricks");
        let b = add_op(&mut graph, &registry, "filter_colorizer");
        graph.connect(a, "out", b, "in").unwrap();
        graph.find_node_mut(a).unwrap().selected = true;
        assert_eq!(graph.selection().count(), 1);
        graph.clear_selection();
        assert_eq!(graph.selection().count(), 0);

        let mut renderer = NullRenderer::default();
        graph.clear(&mut renderer);
        assert!(graph.nodes.is_empty());
    }

    #[test]
    fn param_change_marks_downstream_and_coalesces() {
        let (mut graph, registry) = test_graph();
        let a = add_op(&mut graph, &registry, "pattern_bricks");
        let b = add_op(&mut graph, &registry, "filter_colorizer");
        graph.connect(a, "out", b, "in").unwrap();
        graph.clear_pending();

        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        graph
            .find_node_mut(b)
            .unwrap()
            .watch(Box::new(move |change| sink.borrow_mut().push(change)));

        graph.set_param_value(a, "stagger", serde_json::json!(0.25));
        graph.set_param_value(a, "stagger", serde_json::json!(0.5));
        assert!(seen.borrow().is_empty(), "notification must be deferred");

        graph.flush_pending();
        assert_eq!(*seen.borrow(), vec![ChangeType::ParamValueChanged]);

        graph.flush_pending();
        assert_eq!(seen.borrow().len(), 1, "flush must clear pending marks");
    }
}

//! Property tests over random graph mutation sequences.

use proptest::prelude::*;

use texel_forge::graph::{Graph, Node, TerminalRef};
use texel_forge::registry::Registry;
use texel_forge::render::NullRenderer;

const KINDS: [&str; 5] = [
    "pattern_bricks",
    "pattern_noise",
    "filter_blend",
    "filter_colorizer",
    "filter_mask",
];

#[derive(Debug, Clone)]
enum Op {
    Add(usize),
    Connect(usize, usize, usize),
    Disconnect(usize, usize),
    Delete(usize),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0..KINDS.len()).prop_map(Op::Add),
        (0..16usize, 0..16usize, 0..4usize).prop_map(|(a, b, t)| Op::Connect(a, b, t)),
        (0..16usize, 0..4usize).prop_map(|(a, t)| Op::Disconnect(a, t)),
        (0..16usize).prop_map(Op::Delete),
    ]
}

/// Every stored connection must be mirrored on both endpoints and resolve to
/// live nodes, and no upstream path may contain a cycle.
fn check_invariants(graph: &Graph) {
    for node in &graph.nodes {
        for input in &node.inputs {
            if let Some(connection) = &input.connection {
                assert_eq!(
                    connection.dest,
                    TerminalRef::new(node.id, input.id.as_str())
                );
                let source = graph
                    .find_node(connection.source.node)
                    .expect("input connected to a deleted node");
                let output = source
                    .find_output_terminal(&connection.source.terminal)
                    .expect("input connected to a missing terminal");
                assert!(output.connections.contains(connection));
            }
        }
        for output in &node.outputs {
            for connection in &output.connections {
                assert_eq!(
                    connection.source,
                    TerminalRef::new(node.id, output.id.as_str())
                );
                let dest = graph
                    .find_node(connection.dest.node)
                    .expect("output connected to a deleted node");
                let input = dest
                    .find_input_terminal(&connection.dest.terminal)
                    .expect("output connected to a missing terminal");
                assert_eq!(input.connection.as_ref(), Some(connection));
            }
        }
        assert!(!graph.is_cyclic_from(node.id));
    }
}

fn apply(graph: &mut Graph, registry: &Registry, renderer: &mut NullRenderer, op: &Op) {
    match op {
        Op::Add(kind) => {
            graph.add(Node::new(registry.get(KINDS[*kind]).unwrap()));
        }
        Op::Connect(a, b, t) => {
            if graph.nodes.is_empty() {
                return;
            }
            let src = graph.nodes[a % graph.nodes.len()].id;
            let dst_node = &graph.nodes[b % graph.nodes.len()];
            let dst = dst_node.id;
            let slot = t % dst_node.inputs.len().max(1);
            let Some(input) = dst_node.inputs.get(slot) else {
                return;
            };
            let terminal = input.id.clone();
            if !graph.would_create_cycle(src, dst) {
                graph.connect(src, "out", dst, &terminal).unwrap();
            }
        }
        Op::Disconnect(a, t) => {
            if graph.nodes.is_empty() {
                return;
            }
            let node = &graph.nodes[a % graph.nodes.len()];
            let id = node.id;
            let slot = t % node.inputs.len().max(1);
            let Some(input) = node.inputs.get(slot) else {
                return;
            };
            let terminal = input.id.clone();
            graph.disconnect_input(id, &terminal);
        }
        Op::Delete(a) => {
            if graph.nodes.is_empty() {
                return;
            }
            let id = graph.nodes[a % graph.nodes.len()].id;
            if let Some(node) = graph.find_node_mut(id) {
                node.selected = true;
            }
            graph.delete_selection(renderer);
        }
    }
}

proptest! {
    #[test]
    fn mutation_sequences_preserve_structural_invariants(
        ops in proptest::collection::vec(op_strategy(), 1..48)
    ) {
        let registry = Registry::with_builtins();
        let mut renderer = NullRenderer::default();
        let mut graph = Graph::new();
        for op in &ops {
            apply(&mut graph, &registry, &mut renderer, op);
            check_invariants(&graph);
        }
    }

    #[test]
    fn serialization_round_trips_any_reachable_graph(
        ops in proptest::collection::vec(op_strategy(), 1..32)
    ) {
        let registry = Registry::with_builtins();
        let mut renderer = NullRenderer::default();
        let mut graph = Graph::new();
        for op in &ops {
            apply(&mut graph, &registry, &mut renderer, op);
        }
        let js = graph.to_js().unwrap();
        let restored = Graph::from_js(js.clone(), &registry).unwrap();
        check_invariants(&restored);
        prop_assert_eq!(restored.to_js().unwrap(), js);
    }

    #[test]
    fn builds_never_panic_on_reachable_graphs(
        ops in proptest::collection::vec(op_strategy(), 1..32)
    ) {
        let registry = Registry::with_builtins();
        let mut renderer = NullRenderer::default();
        let mut graph = Graph::new();
        for op in &ops {
            apply(&mut graph, &registry, &mut renderer, op);
        }
        for node in &graph.nodes {
            node.operator.build(&graph, node).unwrap();
        }
    }
}

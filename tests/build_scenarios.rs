//! End-to-end shader builds over small graphs.

use texel_forge::graph::{Graph, Node, NodeId};
use texel_forge::registry::Registry;

fn add(graph: &mut Graph, registry: &Registry, op_id: &str) -> NodeId {
    graph.add(Node::new(registry.get(op_id).unwrap()))
}

fn build(graph: &Graph, id: NodeId) -> String {
    let node = graph.find_node(id).unwrap();
    node.operator.build(graph, node).unwrap()
}

#[test]
fn linear_chain_inlines_single_consumer_outputs() {
    let registry = Registry::with_builtins();
    let mut graph = Graph::new();
    let bricks = add(&mut graph, &registry, "pattern_bricks");
    let colorizer = add(&mut graph, &registry, "filter_colorizer");
    graph.connect(bricks, "out", colorizer, "in").unwrap();

    let source = build(&graph, colorizer);

    // Uniforms for both nodes, declared once each, consumer first.
    assert_eq!(source.matches("uniform int uPattern_bricks1_count_x;").count(), 1);
    assert_eq!(
        source.matches("uniform vec4 uFilter_colorizer2_gradient_colors[32];").count(),
        1
    );
    let colorizer_at = source.find("uFilter_colorizer2_gradient_colors[32]").unwrap();
    let bricks_at = source.find("uniform int uPattern_bricks1_count_x;").unwrap();
    assert!(colorizer_at < bricks_at, "uniform blocks follow traversal pre-order");

    // Single consumer, so the bricks call is nested inside gradientColor
    // rather than cached in a local.
    assert!(source.contains("gradientColor("));
    assert!(source.contains("bricks("));
    assert!(!source.contains("tPattern_bricks1_out"));
}

#[test]
fn diamond_fanout_evaluates_shared_node_once() {
    let registry = Registry::with_builtins();
    let mut graph = Graph::new();
    let bricks = add(&mut graph, &registry, "pattern_bricks");
    let colorizer = add(&mut graph, &registry, "filter_colorizer");
    let blend = add(&mut graph, &registry, "filter_blend");
    graph.connect(bricks, "out", colorizer, "in").unwrap();
    graph.connect(colorizer, "out", blend, "a").unwrap();
    graph.connect(bricks, "out", blend, "b").unwrap();

    let source = build(&graph, blend);

    // The shared bricks output is computed into exactly one local.
    assert_eq!(source.matches("float tPattern_bricks1_out = ").count(), 1);
    assert_eq!(source.matches("= bricks(").count(), 1);
    // Referenced by the assignment plus both consumers.
    assert!(source.matches("tPattern_bricks1_out").count() >= 3);
    // The scalar local is broadcast where an RGBA input consumes it.
    assert!(source.contains("vec4(vec3(tPattern_bricks1_out), 1.0)"));
    // The shared library block appears once despite two gradient consumers.
    assert_eq!(source.matches("vec4 gradientColor(").count(), 1);
}

#[test]
fn builds_are_deterministic() {
    let registry = Registry::with_builtins();
    let mut graph = Graph::new();
    let bricks = add(&mut graph, &registry, "pattern_bricks");
    let noise = add(&mut graph, &registry, "pattern_noise");
    let blend = add(&mut graph, &registry, "filter_blend");
    graph.connect(bricks, "out", blend, "a").unwrap();
    graph.connect(noise, "out", blend, "b").unwrap();

    assert_eq!(build(&graph, blend), build(&graph, blend));
}

#[test]
fn disconnected_inputs_default_to_typed_zero() {
    let registry = Registry::with_builtins();
    let mut graph = Graph::new();
    let blend = add(&mut graph, &registry, "filter_blend");

    let source = build(&graph, blend);
    assert!(source.contains("vec4(0.0, 0.0, 0.0, 0.0)"));
}

#[test]
fn scalar_source_feeding_color_input_is_broadcast() {
    let registry = Registry::with_builtins();
    let mut graph = Graph::new();
    let bricks = add(&mut graph, &registry, "pattern_bricks");
    let blend = add(&mut graph, &registry, "filter_blend");
    graph.connect(bricks, "out", blend, "a").unwrap();

    let source = build(&graph, blend);
    assert!(source.contains("vec4(vec3(bricks("));
}

#[test]
fn derivative_extension_survives_an_intermediate_node() {
    let registry = Registry::with_builtins();
    let mut graph = Graph::new();
    let bricks = add(&mut graph, &registry, "pattern_bricks");
    let normal_map = add(&mut graph, &registry, "filter_normal_map");
    let blend = add(&mut graph, &registry, "filter_blend");
    graph.connect(bricks, "out", normal_map, "in").unwrap();
    graph.connect(normal_map, "out", blend, "a").unwrap();

    let source = build(&graph, blend);
    assert!(source.contains("#extension GL_OES_standard_derivatives : enable"));
    let ext_at = source.find("#extension").unwrap();
    let first_uniform_at = source.find("uniform ").unwrap();
    assert!(ext_at < first_uniform_at);
}

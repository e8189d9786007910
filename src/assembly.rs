//! Shader assembly: collects the fragments emitted by each operator during a
//! build and serializes them into one GLSL fragment shader.
//!
//! An assembly is ephemeral. Each build of a node's output starts from a
//! fresh instance, walks the upstream subgraph through
//! [`Operator::read_output_value`](crate::operator::Operator::read_output_value),
//! and serializes once with [`ShaderAssembly::to_source`]. Emission order is
//! fixed: precision header, extension directives, per-node uniform blocks in
//! traversal pre-order, shared library blocks in first-use order, then a
//! single `main` with cached assignments in first-request order.

use std::collections::{HashMap, HashSet};

use anyhow::{Result, anyhow, bail};

use crate::expr::{DataType, Expr, cast};
use crate::graph::{Graph, Node, NodeId};
use crate::operator::{ParamKind, flatten_params};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum TraversalState {
    InProcess,
    Finished,
}

/// Per-build shader construction state.
pub struct ShaderAssembly {
    states: HashMap<NodeId, TraversalState>,
    // Nodes currently being evaluated on the recursion stack. Graph methods
    // reject cycle-forming edges, but a graph assembled by other means must
    // still fail instead of recursing forever.
    evaluating: HashSet<NodeId>,
    extensions: Vec<String>,
    uniform_blocks: Vec<String>,
    common_keys: HashSet<String>,
    commons: Vec<(String, String)>,
    cached: HashSet<String>,
    // Fully rendered assignment lines, in first-request order.
    assignments: Vec<String>,
    main_line: Option<String>,
}

impl Default for ShaderAssembly {
    fn default() -> Self {
        Self::new()
    }
}

impl ShaderAssembly {
    pub fn new() -> Self {
        Self {
            states: HashMap::new(),
            evaluating: HashSet::new(),
            extensions: Vec::new(),
            uniform_blocks: Vec::new(),
            common_keys: HashSet::new(),
            commons: Vec::new(),
            cached: HashSet::new(),
            assignments: Vec::new(),
            main_line: None,
        }
    }

    /// Begin emitting for a node. Returns true only the first time a node is
    /// seen in this build; operators guard their uniform and library emission
    /// on it. Marks the node in-process until [`ShaderAssembly::finish`].
    pub fn start(&mut self, node: &Node) -> bool {
        match self.states.get(&node.id) {
            Some(_) => false,
            None => {
                self.states.insert(node.id, TraversalState::InProcess);
                true
            }
        }
    }

    /// Mark a node's emission complete. Idempotent.
    pub fn finish(&mut self, node: &Node) {
        self.states.insert(node.id, TraversalState::Finished);
    }

    /// Register an extension directive, de-duplicated by name.
    pub fn add_extension(&mut self, name: &str) {
        if !self.extensions.iter().any(|e| e == name) {
            self.extensions.push(name.to_string());
        }
    }

    /// Register a shared library block under a stable key. The first
    /// registration wins; later ones with the same key are dropped, so a
    /// helper shared by several node types appears once.
    pub fn add_common(&mut self, key: &str, src: &str) {
        if self.common_keys.insert(key.to_string()) {
            self.commons.push((key.to_string(), src.to_string()));
        }
    }

    /// Emit the uniform declaration block for one node's parameters, group
    /// children flattened. Gradient parameters expand to a color/position
    /// array pair. Called once per node, inside the start guard.
    pub fn declare_uniforms(&mut self, node: &Node) -> Result<()> {
        let mut block = String::new();
        for param in flatten_params(node.operator.params()) {
            let name = node.operator.uniform_name(node.id, param.id);
            match param.kind {
                ParamKind::ColorGradient => {
                    block.push_str(&format!("uniform vec4 {name}_colors[32];\n"));
                    block.push_str(&format!("uniform float {name}_positions[32];\n"));
                }
                kind => {
                    let glsl = kind.expr_type().glsl()?;
                    block.push_str(&format!("uniform {glsl} {name};\n"));
                }
            }
        }
        if !block.is_empty() {
            self.uniform_blocks.push(block);
        }
        Ok(())
    }

    /// Reference a node parameter's uniform as an expression.
    pub fn uniform(&self, node: &Node, param_id: &str) -> Result<Expr> {
        let param = node
            .operator
            .find_param(param_id)
            .ok_or_else(|| {
                anyhow!(
                    "operator parameter not found: {}:{param_id}",
                    node.operator.id()
                )
            })?;
        Ok(Expr::ident(
            node.operator.uniform_name(node.id, param.id),
            param.kind.expr_type(),
        ))
    }

    /// Bind an expression to a named local inside `main` and return an
    /// identifier for it. Used by operators that need to reference an
    /// intermediate several times within their own fragment.
    pub fn assign(&mut self, name: impl Into<String>, value: Expr) -> Result<Expr> {
        let name = name.into();
        let ty = value.ty();
        self.assignments
            .push(format!("  {} {} = {};", ty.glsl()?, name, value.emit(2)?));
        Ok(Expr::ident(name, ty))
    }

    /// Produce the expression feeding one of `node`'s inputs, evaluated at
    /// `uv` and coerced to the input's declared type.
    ///
    /// A disconnected input yields a typed zero literal. A connected source
    /// with fan-out greater than one is evaluated exactly once into a local
    /// named after the producing node and output; further requests reuse the
    /// cached identifier. Single-consumer sources are inlined.
    pub fn read_input_value(
        &mut self,
        graph: &Graph,
        node: &Node,
        input_id: &str,
        uv: &Expr,
    ) -> Result<Expr> {
        let input = node.operator.get_input(input_id)?;
        let terminal = node
            .find_input_terminal(input_id)
            .ok_or_else(|| anyhow!("input terminal not found: {}:{input_id}", node.id))?;
        let Some(connection) = terminal.connection.clone() else {
            return zero_value(input.ty);
        };
        // A connection whose source no longer resolves behaves as
        // disconnected rather than aborting the build.
        let Some(source_node) = graph.find_node(connection.source.node) else {
            eprintln!(
                "[assembly] input {}:{input_id} references a missing source node",
                node.id
            );
            return zero_value(input.ty);
        };
        let Some(output) = source_node.find_output_terminal(&connection.source.terminal) else {
            eprintln!(
                "[assembly] input {}:{input_id} references a missing source terminal",
                node.id
            );
            return zero_value(input.ty);
        };

        let expr = if output.connections.len() > 1 {
            // Cache key and local name come from the producing side, so every
            // consumer of the same output agrees on them.
            let cache_name = format!(
                "{}_{}",
                source_node.operator.local_prefix(source_node.id),
                output.id
            );
            if self.cached.contains(&cache_name) {
                Expr::ident(cache_name, output.ty)
            } else {
                let value =
                    self.evaluate(graph, source_node, &connection.source.terminal, uv)?;
                self.cached.insert(cache_name.clone());
                self.assign(cache_name, value)?
            }
        } else {
            self.evaluate(graph, source_node, &connection.source.terminal, uv)?
        };
        cast(expr, input.ty)
    }

    fn evaluate(
        &mut self,
        graph: &Graph,
        source_node: &Node,
        output_id: &str,
        uv: &Expr,
    ) -> Result<Expr> {
        if !self.evaluating.insert(source_node.id) {
            bail!("dependency cycle detected at node {}", source_node.id);
        }
        let result = source_node
            .operator
            .read_output_value(self, graph, source_node, output_id, uv);
        self.evaluating.remove(&source_node.id);
        result
    }

    /// Set the final color expression, coerced to RGBA.
    pub fn main(&mut self, expr: Expr) -> Result<()> {
        let color = cast(expr, DataType::Rgba)?;
        self.main_line = Some(format!("  gl_FragColor = {};", color.emit(2)?));
        Ok(())
    }

    /// Serialize the accumulated shader. Byte-identical for identical build
    /// sequences.
    pub fn to_source(&self) -> String {
        let mut out = String::from("precision mediump float;\n");
        for ext in &self.extensions {
            out.push_str(&format!("#extension {ext} : enable\n"));
        }
        out.push('\n');
        for block in &self.uniform_blocks {
            out.push_str(block);
            out.push('\n');
        }
        for (key, src) in &self.commons {
            out.push_str(&format!("// Common code for {key}\n"));
            out.push_str(src);
            if !src.ends_with('\n') {
                out.push('\n');
            }
            out.push('\n');
        }
        out.push_str("varying highp vec2 vTextureCoord;\n\n");
        out.push_str("void main() {\n");
        for line in &self.assignments {
            out.push_str(line);
            out.push('\n');
        }
        if let Some(main_line) = &self.main_line {
            out.push_str(main_line);
            out.push('\n');
        }
        out.push_str("}\n");
        out
    }
}

fn zero_value(ty: DataType) -> Result<Expr> {
    let text = match ty {
        DataType::Scalar => "0.0",
        DataType::Uv => "vec2(0.0, 0.0)",
        DataType::Xyz => "vec3(0.0, 0.0, 0.0)",
        DataType::Xyzw | DataType::Rgba => "vec4(0.0, 0.0, 0.0, 0.0)",
        other => bail!("no default value for input type {other:?}"),
    };
    Ok(Expr::literal(text, ty))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Node;
    use crate::registry::Registry;

    fn node_of(registry: &Registry, op_id: &str) -> Node {
        Node::new(registry.get(op_id).unwrap())
    }

    #[test]
    fn start_is_true_only_once_per_node() {
        let registry = Registry::with_builtins();
        let mut graph = Graph::new();
        let id = graph.add(node_of(&registry, "pattern_bricks"));
        let node = graph.find_node(id).unwrap();

        let mut assembly = ShaderAssembly::new();
        assert!(assembly.start(node));
        assert!(!assembly.start(node));
        assembly.finish(node);
        assembly.finish(node);
        assert!(!assembly.start(node));
    }

    #[test]
    fn common_blocks_deduplicate_by_key() {
        let mut assembly = ShaderAssembly::new();
        assembly.add_common("modulus", "float modulus(float a) { return a; }\n");
        assembly.add_common("modulus", "this text must not appear\n");
        let src = assembly.to_source();
        assert_eq!(src.matches("// Common code for modulus").count(), 1);
        assert!(!src.contains("must not appear"));
    }

    #[test]
    fn extensions_deduplicate_and_precede_uniforms() {
        let registry = Registry::with_builtins();
        let mut graph = Graph::new();
        let id = graph.add(node_of(&registry, "pattern_bricks"));
        let node = graph.find_node(id).unwrap();

        let mut assembly = ShaderAssembly::new();
        assembly.add_extension("GL_OES_standard_derivatives");
        assembly.add_extension("GL_OES_standard_derivatives");
        assembly.declare_uniforms(node).unwrap();
        let src = assembly.to_source();
        assert_eq!(src.matches("#extension").count(), 1);
        let ext_at = src.find("#extension").unwrap();
        let uniform_at = src.find("uniform").unwrap();
        assert!(src.starts_with("precision mediump float;\n"));
        assert!(ext_at < uniform_at);
    }

    #[test]
    fn disconnected_inputs_read_typed_zero() {
        let registry = Registry::with_builtins();
        let mut graph = Graph::new();
        let id = graph.add(node_of(&registry, "filter_blend"));
        let node = graph.find_node(id).unwrap();

        let mut assembly = ShaderAssembly::new();
        let uv = Expr::ident("vTextureCoord", DataType::Uv);
        let a = assembly.read_input_value(&graph, node, "a", &uv).unwrap();
        assert_eq!(a.emit(0).unwrap(), "vec4(0.0, 0.0, 0.0, 0.0)");
        assert_eq!(a.ty(), DataType::Rgba);
    }

    #[test]
    fn gradient_uniforms_expand_to_array_pair() {
        let registry = Registry::with_builtins();
        let mut graph = Graph::new();
        let id = graph.add(node_of(&registry, "filter_colorizer"));
        let node = graph.find_node(id).unwrap();

        let mut assembly = ShaderAssembly::new();
        assembly.declare_uniforms(node).unwrap();
        let src = assembly.to_source();
        let prefix = node.operator.uniform_name(node.id, "gradient");
        assert!(src.contains(&format!("uniform vec4 {prefix}_colors[32];")));
        assert!(src.contains(&format!("uniform float {prefix}_positions[32];")));
    }

    #[test]
    fn cyclic_wiring_fails_the_build_instead_of_recursing() {
        let registry = Registry::with_builtins();
        let mut graph = Graph::new();
        let a = graph.add(node_of(&registry, "filter_colorizer"));
        let b = graph.add(node_of(&registry, "filter_colorizer"));
        graph.connect(a, "out", b, "in").unwrap();
        graph.connect(b, "out", a, "in").unwrap();

        let node = graph.find_node(a).unwrap();
        let err = node.operator.build(&graph, node).unwrap_err();
        assert!(format!("{err}").contains("cycle"), "{err}");
    }

    #[test]
    fn assign_declares_typed_local_in_main() {
        let mut assembly = ShaderAssembly::new();
        let ident = assembly
            .assign("tProbe1_n", Expr::literal("vec3(0.0, 0.0, 1.0)", DataType::Xyz))
            .unwrap();
        assert_eq!(ident.emit(0).unwrap(), "tProbe1_n");
        let src = assembly.to_source();
        assert!(src.contains("  vec3 tProbe1_n = vec3(0.0, 0.0, 1.0);\n"));
    }
}

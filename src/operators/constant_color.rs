//! Fills the output with a single color.

use anyhow::Result;
use serde_json::json;

use crate::assembly::ShaderAssembly;
use crate::expr::{DataType, Expr};
use crate::graph::{Graph, Node};
use crate::operator::{Operator, OutputDef, Parameter};

pub struct ConstantColor {
    outputs: Vec<OutputDef>,
    params: Vec<Parameter>,
}

impl ConstantColor {
    pub fn new() -> Self {
        Self {
            outputs: vec![OutputDef::new("out", "Out", DataType::Rgba)],
            params: vec![
                Parameter::color("color", "Color").default(json!([1.0, 1.0, 1.0, 1.0])),
            ],
        }
    }
}

impl Operator for ConstantColor {
    fn group(&self) -> &'static str {
        "generator"
    }

    fn name(&self) -> &'static str {
        "Constant Color"
    }

    fn id(&self) -> &'static str {
        "generator_constant_color"
    }

    fn description(&self) -> &'static str {
        "A constant color."
    }

    fn outputs(&self) -> &[OutputDef] {
        &self.outputs
    }

    fn params(&self) -> &[Parameter] {
        &self.params
    }

    fn read_output_value(
        &self,
        assembly: &mut ShaderAssembly,
        _graph: &Graph,
        node: &Node,
        _output_id: &str,
        _uv: &Expr,
    ) -> Result<Expr> {
        if assembly.start(node) {
            assembly.declare_uniforms(node)?;
            assembly.finish(node);
        }

        assembly.uniform(node, "color")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_is_just_the_uniform() {
        let mut graph = Graph::new();
        let id = graph.add(Node::new(std::sync::Arc::new(ConstantColor::new())));
        let node = graph.find_node(id).unwrap();
        let source = node.operator.build(&graph, node).unwrap();

        assert!(source.contains("uniform vec4 uGenerator_constant_color1_color;"));
        assert!(source.contains("  gl_FragColor = uGenerator_constant_color1_color;\n"));
        assert!(!source.contains("// Common code"));
    }
}

//! Maps a scalar input through a color gradient.

use anyhow::Result;
use serde_json::json;

use crate::assembly::ShaderAssembly;
use crate::expr::{DataType, Expr};
use crate::graph::{Graph, Node};
use crate::operator::{InputDef, Operator, OutputDef, Parameter};

const COMMON_SRC: &str = include_str!("shaders/gradient-color.glsl");

pub struct Colorizer {
    inputs: Vec<InputDef>,
    outputs: Vec<OutputDef>,
    params: Vec<Parameter>,
}

impl Colorizer {
    pub fn new() -> Self {
        Self {
            inputs: vec![InputDef::new("in", "In", DataType::Scalar)],
            outputs: vec![OutputDef::new("out", "Out", DataType::Rgba)],
            params: vec![
                Parameter::color_gradient("gradient", "Gradient color").default(json!([
                    { "value": [0, 0, 0, 1], "position": 0 },
                    { "value": [1, 1, 1, 1], "position": 1 },
                ])),
            ],
        }
    }
}

impl Operator for Colorizer {
    fn group(&self) -> &'static str {
        "filter"
    }

    fn name(&self) -> &'static str {
        "Colorizer"
    }

    fn id(&self) -> &'static str {
        "filter_colorizer"
    }

    fn description(&self) -> &'static str {
        "Transforms input value through a color gradient."
    }

    fn inputs(&self) -> &[InputDef] {
        &self.inputs
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
        graph: &Graph,
        node: &Node,
        _output_id: &str,
        uv: &Expr,
    ) -> Result<Expr> {
        if assembly.start(node) {
            assembly.declare_uniforms(node)?;
            assembly.add_common("gradient-color.glsl", COMMON_SRC);
            assembly.finish(node);
        }

        let input = assembly.read_input_value(graph, node, "in", uv)?;
        let gradient_name = self.uniform_name(node.id, "gradient");
        let args = vec![
            input,
            Expr::ident(format!("{gradient_name}_colors"), DataType::Other),
            Expr::ident(format!("{gradient_name}_positions"), DataType::Other),
        ];
        Ok(Expr::call("gradientColor", args, DataType::Rgba))
    }
}

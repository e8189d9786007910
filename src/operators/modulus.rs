//! Converts a monotonic input into repeating sawtooth or triangle waves.

use anyhow::Result;
use serde_json::json;

use crate::assembly::ShaderAssembly;
use crate::expr::{DataType, Expr};
use crate::graph::{Graph, Node};
use crate::operator::{InputDef, Operator, OutputDef, Parameter};

const GRADIENT_COLOR_SRC: &str = include_str!("shaders/gradient-color.glsl");
const COMMON_SRC: &str = include_str!("shaders/modulus.glsl");

pub struct Modulus {
    inputs: Vec<InputDef>,
    outputs: Vec<OutputDef>,
    params: Vec<Parameter>,
}

impl Modulus {
    pub fn new() -> Self {
        Self {
            inputs: vec![InputDef::new("input", "In", DataType::Scalar)],
            outputs: vec![OutputDef::new("out", "Out", DataType::Rgba)],
            params: vec![
                Parameter::integer("frequency", "Frequency")
                    .min(1.0)
                    .max(100.0)
                    .default(json!(2)),
                Parameter::float("offset", "Offset")
                    .min(0.0)
                    .max(1.0)
                    .precision(2)
                    .increment(0.01)
                    .default(json!(0)),
                Parameter::float("phase", "Phase")
                    .min(0.0)
                    .max(1.0)
                    .precision(2)
                    .increment(0.01)
                    .default(json!(1)),
                Parameter::color_gradient("color", "Color").default(json!([
                    { "value": [0, 0, 0, 1], "position": 0 },
                    { "value": [1, 1, 1, 1], "position": 1 },
                ])),
            ],
        }
    }
}

impl Operator for Modulus {
    fn group(&self) -> &'static str {
        "filter"
    }

    fn name(&self) -> &'static str {
        "Modulus"
    }

    fn id(&self) -> &'static str {
        "filter_modulus"
    }

    fn description(&self) -> &'static str {
        "\
Performs a modulus operation on the input, converting a monotonically
increasing signal into a sequence of waves.
* **Frequency** indicates how often the input value repeats.
* **Offset** is added to the value before applying the mod operator.
* **Phase** moves the peak within the interval; 1 yields a sawtooth wave,
  0.5 a triangle wave.
* **Color** maps the output value through a gradient.
"
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
            assembly.add_common("gradient-color.glsl", GRADIENT_COLOR_SRC);
            assembly.add_common("modulus.glsl", COMMON_SRC);
            assembly.finish(node);
        }

        let color_name = self.uniform_name(node.id, "color");
        let args = vec![
            assembly.read_input_value(graph, node, "input", uv)?,
            assembly.uniform(node, "frequency")?,
            assembly.uniform(node, "offset")?,
            assembly.uniform(node, "phase")?,
            Expr::ident(format!("{color_name}_colors"), DataType::Other),
            Expr::ident(format!("{color_name}_positions"), DataType::Other),
        ];
        Ok(Expr::call("modulus", args, DataType::Rgba))
    }
}

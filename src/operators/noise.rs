//! Periodic band-limited noise generator.

use anyhow::Result;
use serde_json::json;

use crate::assembly::ShaderAssembly;
use crate::expr::{DataType, Expr};
use crate::graph::{Graph, Node};
use crate::operator::{Operator, OutputDef, Parameter};

const GRADIENT_COLOR_SRC: &str = include_str!("shaders/gradient-color.glsl");
const COMMON_SRC: &str = include_str!("shaders/periodic-noise.glsl");

pub struct Noise {
    outputs: Vec<OutputDef>,
    params: Vec<Parameter>,
}

impl Noise {
    pub fn new() -> Self {
        Self {
            outputs: vec![OutputDef::new("out", "Out", DataType::Rgba)],
            params: vec![
                Parameter::integer("scale_x", "Scale X")
                    .min(1.0)
                    .max(100.0)
                    .default(json!(1)),
                Parameter::integer("scale_y", "Scale Y")
                    .min(1.0)
                    .max(100.0)
                    .default(json!(1)),
                Parameter::float("offset_z", "Z Offset")
                    .min(0.0)
                    .max(200.0)
                    .precision(1)
                    .increment(0.1)
                    .default(json!(0)),
                Parameter::float("scale_value", "Value Scale")
                    .min(0.01)
                    .max(2.0)
                    .precision(2)
                    .default(json!(0.7)),
                Parameter::integer("start_band", "Start Band")
                    .min(1.0)
                    .max(16.0)
                    .default(json!(1)),
                Parameter::integer("end_band", "End Band")
                    .min(1.0)
                    .max(16.0)
                    .default(json!(8)),
                Parameter::float("persistence", "Persistence")
                    .min(0.0)
                    .max(1.0)
                    .precision(2)
                    .default(json!(0.5)),
                Parameter::color_gradient("color", "Color").default(json!([
                    { "value": [0, 0, 0, 1], "position": 0 },
                    { "value": [1, 1, 1, 1], "position": 1 },
                ])),
            ],
        }
    }
}

impl Operator for Noise {
    fn group(&self) -> &'static str {
        "pattern"
    }

    fn name(&self) -> &'static str {
        "Noise"
    }

    fn id(&self) -> &'static str {
        "pattern_noise"
    }

    fn description(&self) -> &'static str {
        "\
Generates a periodic noise texture by summing octave bands.
* **Scale X / Scale Y** set the base spatial frequency.
* **Z Offset** slices the 3d noise field, animating the pattern.
* **Value Scale** amplifies the accumulated signal.
* **Start Band / End Band** select which octaves contribute.
* **Persistence** controls the amplitude falloff per band.
* **Color** maps the output value through a gradient.
"
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
        uv: &Expr,
    ) -> Result<Expr> {
        if assembly.start(node) {
            assembly.declare_uniforms(node)?;
            assembly.add_common("gradient-color.glsl", GRADIENT_COLOR_SRC);
            assembly.add_common("periodic-noise.glsl", COMMON_SRC);
            assembly.finish(node);
        }

        let color_name = self.uniform_name(node.id, "color");
        let args = vec![
            uv.clone(),
            assembly.uniform(node, "scale_x")?,
            assembly.uniform(node, "scale_y")?,
            assembly.uniform(node, "offset_z")?,
            assembly.uniform(node, "scale_value")?,
            assembly.uniform(node, "start_band")?,
            assembly.uniform(node, "end_band")?,
            assembly.uniform(node, "persistence")?,
            Expr::ident(format!("{color_name}_colors"), DataType::Other),
            Expr::ident(format!("{color_name}_positions"), DataType::Other),
        ];
        Ok(Expr::call("periodicNoise", args, DataType::Rgba))
    }
}

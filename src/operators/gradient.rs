//! Simple directional and radial gradient generator.

use anyhow::Result;
use serde_json::json;

use crate::assembly::ShaderAssembly;
use crate::expr::{DataType, Expr};
use crate::graph::{Graph, Node};
use crate::operator::{EnumValue, Operator, OutputDef, Parameter};

const COMMON_SRC: &str = include_str!("shaders/gradient.glsl");

pub struct Gradient {
    outputs: Vec<OutputDef>,
    params: Vec<Parameter>,
}

impl Gradient {
    pub fn new() -> Self {
        Self {
            outputs: vec![OutputDef::new("out", "Out", DataType::Rgba)],
            params: vec![
                Parameter::integer("type", "Gradient Type")
                    .enum_vals(vec![
                        EnumValue {
                            name: "Linear Horizontal",
                            value: 0,
                        },
                        EnumValue {
                            name: "Linear Vertical",
                            value: 1,
                        },
                        EnumValue {
                            name: "Symmetric Horizontal",
                            value: 2,
                        },
                        EnumValue {
                            name: "Symmetric Vertical",
                            value: 3,
                        },
                        EnumValue {
                            name: "Radial",
                            value: 4,
                        },
                        EnumValue {
                            name: "Square",
                            value: 5,
                        },
                    ])
                    .default(json!(0)),
            ],
        }
    }
}

impl Operator for Gradient {
    fn group(&self) -> &'static str {
        "generator"
    }

    fn name(&self) -> &'static str {
        "Gradient"
    }

    fn id(&self) -> &'static str {
        "generator_gradient"
    }

    fn description(&self) -> &'static str {
        "Generates a simple gradient."
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
            assembly.add_common("gradient.glsl", COMMON_SRC);
            assembly.finish(node);
        }

        let args = vec![uv.clone(), assembly.uniform(node, "type")?];
        Ok(Expr::call("gradient", args, DataType::Rgba))
    }
}

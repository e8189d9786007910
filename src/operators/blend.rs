//! Layer-style blend of two inputs.

use anyhow::Result;
use serde_json::json;

use crate::assembly::ShaderAssembly;
use crate::expr::{DataType, Expr};
use crate::graph::{Graph, Node};
use crate::operator::{EnumValue, InputDef, Operator, OutputDef, Parameter};

const COMMON_SRC: &str = include_str!("shaders/blend.glsl");

pub struct Blend {
    inputs: Vec<InputDef>,
    outputs: Vec<OutputDef>,
    params: Vec<Parameter>,
}

impl Blend {
    pub fn new() -> Self {
        Self {
            inputs: vec![
                InputDef::new("a", "A", DataType::Rgba),
                InputDef::new("b", "B", DataType::Rgba),
            ],
            outputs: vec![OutputDef::new("out", "Out", DataType::Rgba)],
            params: vec![
                Parameter::integer("op", "Operator")
                    .enum_vals(vec![
                        EnumValue {
                            name: "Identity",
                            value: 0,
                        },
                        EnumValue {
                            name: "Add",
                            value: 1,
                        },
                        EnumValue {
                            name: "Subtract",
                            value: 2,
                        },
                        EnumValue {
                            name: "Multiply",
                            value: 3,
                        },
                        EnumValue {
                            name: "Difference",
                            value: 4,
                        },
                        EnumValue {
                            name: "Screen",
                            value: 5,
                        },
                        EnumValue {
                            name: "Overlay",
                            value: 6,
                        },
                        EnumValue {
                            name: "Dodge",
                            value: 7,
                        },
                        EnumValue {
                            name: "Burn",
                            value: 8,
                        },
                    ])
                    .default(json!(0)),
            ],
        }
    }
}

impl Operator for Blend {
    fn group(&self) -> &'static str {
        "filter"
    }

    fn name(&self) -> &'static str {
        "Blend"
    }

    fn id(&self) -> &'static str {
        "filter_blend"
    }

    fn description(&self) -> &'static str {
        "Blends two source images, similar to layer operations in an image editor."
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
            assembly.add_common("blend.glsl", COMMON_SRC);
            assembly.finish(node);
        }

        let a = assembly.read_input_value(graph, node, "a", uv)?;
        let b = assembly.read_input_value(graph, node, "b", uv)?;
        let op = assembly.uniform(node, "op")?;
        Ok(Expr::call("blend", vec![a, b, op], DataType::Rgba))
    }
}

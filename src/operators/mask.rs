//! Blends two inputs through a grayscale mask.

use anyhow::Result;
use serde_json::json;

use crate::assembly::ShaderAssembly;
use crate::expr::{DataType, Expr};
use crate::graph::{Graph, Node};
use crate::operator::{EnumValue, InputDef, Operator, OutputDef, Parameter};

const COMMON_SRC: &str = include_str!("shaders/mask.glsl");

pub struct Mask {
    inputs: Vec<InputDef>,
    outputs: Vec<OutputDef>,
    params: Vec<Parameter>,
}

impl Mask {
    pub fn new() -> Self {
        Self {
            inputs: vec![
                InputDef::new("a", "A", DataType::Rgba),
                InputDef::new("b", "B", DataType::Rgba),
                InputDef::new("mask", "Mask", DataType::Rgba),
            ],
            outputs: vec![OutputDef::new("out", "Out", DataType::Rgba)],
            params: vec![
                Parameter::integer("invert", "Invert")
                    .enum_vals(vec![
                        EnumValue {
                            name: "Off",
                            value: 0,
                        },
                        EnumValue {
                            name: "On",
                            value: 1,
                        },
                    ])
                    .default(json!(0)),
            ],
        }
    }
}

impl Operator for Mask {
    fn group(&self) -> &'static str {
        "filter"
    }

    fn name(&self) -> &'static str {
        "Mask"
    }

    fn id(&self) -> &'static str {
        "filter_mask"
    }

    fn description(&self) -> &'static str {
        "Blends two source images based on a grayscale mask."
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
            assembly.add_common("mask.glsl", COMMON_SRC);
            assembly.finish(node);
        }

        let a = assembly.read_input_value(graph, node, "a", uv)?;
        let b = assembly.read_input_value(graph, node, "b", uv)?;
        let mask = assembly.read_input_value(graph, node, "mask", uv)?;
        let invert = assembly.uniform(node, "invert")?;
        Ok(Expr::call("mask", vec![a, b, mask, invert], DataType::Rgba))
    }
}

//! Brick pattern generator.

use anyhow::Result;
use serde_json::json;

use crate::assembly::ShaderAssembly;
use crate::expr::{DataType, Expr};
use crate::graph::{Graph, Node};
use crate::operator::{EnumValue, Operator, OutputDef, Parameter};

const COMMON_SRC: &str = include_str!("shaders/bricks.glsl");

pub struct Bricks {
    outputs: Vec<OutputDef>,
    params: Vec<Parameter>,
}

impl Bricks {
    pub fn new() -> Self {
        Self {
            outputs: vec![OutputDef::new("out", "Out", DataType::Scalar)],
            params: vec![
                Parameter::integer("count_x", "Count X")
                    .min(1.0)
                    .max(16.0)
                    .default(json!(2)),
                Parameter::integer("count_y", "Count Y")
                    .min(1.0)
                    .max(16.0)
                    .default(json!(4)),
                Parameter::float("spacing_x", "Spacing X")
                    .min(0.0)
                    .max(0.5)
                    .default(json!(0.025)),
                Parameter::float("spacing_y", "Spacing Y")
                    .min(0.0)
                    .max(0.5)
                    .default(json!(0.05)),
                Parameter::float("blur_x", "Blur X")
                    .min(0.0)
                    .max(0.5)
                    .default(json!(0.1)),
                Parameter::float("blur_y", "Blur Y")
                    .min(0.0)
                    .max(0.5)
                    .default(json!(0.2)),
                Parameter::float("offset_x", "Offset X").min(0.0).max(0.5),
                Parameter::float("offset_y", "Offset Y").min(0.0).max(0.5),
                Parameter::float("stagger", "Stagger")
                    .min(0.0)
                    .max(1.0)
                    .default(json!(0.5)),
                Parameter::integer("corner", "Corner Shape")
                    .enum_vals(vec![
                        EnumValue {
                            name: "Square",
                            value: 0,
                        },
                        EnumValue {
                            name: "Mitered",
                            value: 1,
                        },
                        EnumValue {
                            name: "Rounded",
                            value: 2,
                        },
                    ])
                    .default(json!(0)),
            ],
        }
    }
}

impl Operator for Bricks {
    fn group(&self) -> &'static str {
        "pattern"
    }

    fn name(&self) -> &'static str {
        "Bricks"
    }

    fn id(&self) -> &'static str {
        "pattern_bricks"
    }

    fn description(&self) -> &'static str {
        "\
Generates a pattern consisting of alternating rows of bricks.
* **Count X / Count Y** are the number of bricks along each axis.
* **Spacing X / Spacing Y** are the gaps between bricks.
* **Blur X / Blur Y** control the softness of the brick edges.
* **Offset X / Offset Y** shift the entire pattern.
* **Stagger** offsets even rows relative to odd rows.
* **Corner Shape** selects square, mitered or rounded corners.
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
            assembly.add_common("bricks.glsl", COMMON_SRC);
            assembly.finish(node);
        }

        let mut args = vec![uv.clone()];
        for param in &self.params {
            args.push(assembly.uniform(node, param.id)?);
        }
        Ok(Expr::call("bricks", args, DataType::Scalar))
    }
}

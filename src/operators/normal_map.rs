//! Computes screen-space normals from a grayscale height input.

use anyhow::Result;
use serde_json::json;

use crate::assembly::ShaderAssembly;
use crate::expr::{DataType, Expr};
use crate::graph::{Graph, Node};
use crate::operator::{InputDef, Operator, OutputDef, Parameter};

pub struct NormalMap {
    inputs: Vec<InputDef>,
    outputs: Vec<OutputDef>,
    params: Vec<Parameter>,
}

impl NormalMap {
    pub fn new() -> Self {
        Self {
            inputs: vec![InputDef::new("in", "In", DataType::Rgba)],
            outputs: vec![OutputDef::new("out", "Out", DataType::Rgba)],
            params: vec![
                Parameter::float("scale", "Height Scale")
                    .min(-0.5)
                    .max(0.5)
                    .precision(3)
                    .increment(0.01)
                    .default(json!(0.2)),
            ],
        }
    }
}

impl Operator for NormalMap {
    fn group(&self) -> &'static str {
        "filter"
    }

    fn name(&self) -> &'static str {
        "Normal Map"
    }

    fn id(&self) -> &'static str {
        "filter_normal_map"
    }

    fn description(&self) -> &'static str {
        "Treating the grayscale input as a height map, computes normals."
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
            assembly.add_extension("GL_OES_standard_derivatives");
            assembly.finish(node);
        }

        let input = assembly.read_input_value(graph, node, "in", uv)?;
        let prefix = self.local_prefix(node.id);
        let scale = self.uniform_name(node.id, "scale");

        // The height is sampled through screen-space derivatives, so the
        // intermediate values need names main can reference.
        let t = format!("{prefix}_t");
        let h = format!("{prefix}_h");
        let dx = format!("{prefix}_dx");
        let dy = format!("{prefix}_dy");
        let normal = format!("{prefix}_normal");
        assembly.assign(t.as_str(), input)?;
        assembly.assign(
            h.as_str(),
            Expr::literal(
                format!("({t}.x + {t}.y + {t}.z) * {scale} / 3.0"),
                DataType::Scalar,
            ),
        )?;
        assembly.assign(
            dx.as_str(),
            Expr::literal(format!("dFdx(vec3(vTextureCoord, {h}))"), DataType::Xyz),
        )?;
        assembly.assign(
            dy.as_str(),
            Expr::literal(format!("dFdy(vec3(vTextureCoord, {h}))"), DataType::Xyz),
        )?;
        assembly.assign(
            normal.as_str(),
            Expr::literal(format!("normalize(cross({dx}, {dy}))"), DataType::Xyz),
        )?;
        Ok(Expr::literal(
            format!("vec4({normal} * vec3(-0.5, 0.5, 0.5) + 0.5, 1.0)"),
            DataType::Rgba,
        ))
    }
}

//! Operator contract: port and parameter declarations plus the per-node
//! code-generation hook.
//!
//! Operators are immutable, process-wide singletons shared read-only by every
//! node of that type. A node's semantics are entirely defined by its operator;
//! the operator in turn knows how to emit its own shader fragment through the
//! [`ShaderAssembly`] contract.

use anyhow::{Result, anyhow, bail};
use serde_json::Value;

use crate::assembly::ShaderAssembly;
use crate::expr::{DataType, Expr};
use crate::graph::{Graph, Node, NodeId};

/// Declares an operator input terminal.
#[derive(Clone, Debug)]
pub struct InputDef {
    pub id: &'static str,
    pub name: &'static str,
    pub ty: DataType,
}

impl InputDef {
    pub fn new(id: &'static str, name: &'static str, ty: DataType) -> Self {
        Self { id, name, ty }
    }
}

/// Declares an operator output terminal.
#[derive(Clone, Debug)]
pub struct OutputDef {
    pub id: &'static str,
    pub name: &'static str,
    pub ty: DataType,
}

impl OutputDef {
    pub fn new(id: &'static str, name: &'static str, ty: DataType) -> Self {
        Self { id, name, ty }
    }
}

/// Parameter kinds. `Group` is pure UI nesting and never becomes a uniform
/// itself; its children do.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParamKind {
    Integer,
    Float,
    Color,
    ColorGradient,
    Group,
}

impl ParamKind {
    /// The expression type of a uniform reference to a parameter of this kind.
    pub fn expr_type(self) -> DataType {
        match self {
            ParamKind::Integer => DataType::Integer,
            ParamKind::Float => DataType::Scalar,
            ParamKind::Color => DataType::Rgba,
            ParamKind::ColorGradient | ParamKind::Group => DataType::Other,
        }
    }
}

/// A named value for an enumerated integer parameter.
#[derive(Clone, Debug)]
pub struct EnumValue {
    pub name: &'static str,
    pub value: i64,
}

/// An operator parameter declaration. Values live in the owning node's
/// `param_values` map, never here.
#[derive(Clone, Debug)]
pub struct Parameter {
    pub id: &'static str,
    pub name: &'static str,
    pub kind: ParamKind,
    pub default: Option<Value>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub increment: Option<f64>,
    pub precision: Option<u32>,
    pub log_scale: bool,
    pub enum_vals: Vec<EnumValue>,
    pub children: Vec<Parameter>,
}

impl Parameter {
    fn new(id: &'static str, name: &'static str, kind: ParamKind) -> Self {
        Self {
            id,
            name,
            kind,
            default: None,
            min: None,
            max: None,
            increment: None,
            precision: None,
            log_scale: false,
            enum_vals: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn integer(id: &'static str, name: &'static str) -> Self {
        Self::new(id, name, ParamKind::Integer)
    }

    pub fn float(id: &'static str, name: &'static str) -> Self {
        Self::new(id, name, ParamKind::Float)
    }

    pub fn color(id: &'static str, name: &'static str) -> Self {
        Self::new(id, name, ParamKind::Color)
    }

    pub fn color_gradient(id: &'static str, name: &'static str) -> Self {
        Self::new(id, name, ParamKind::ColorGradient)
    }

    pub fn group(id: &'static str, name: &'static str, children: Vec<Parameter>) -> Self {
        let mut p = Self::new(id, name, ParamKind::Group);
        p.children = children;
        p
    }

    pub fn default(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    pub fn min(mut self, v: f64) -> Self {
        self.min = Some(v);
        self
    }

    pub fn max(mut self, v: f64) -> Self {
        self.max = Some(v);
        self
    }

    pub fn increment(mut self, v: f64) -> Self {
        self.increment = Some(v);
        self
    }

    pub fn precision(mut self, v: u32) -> Self {
        self.precision = Some(v);
        self
    }

    pub fn log_scale(mut self) -> Self {
        self.log_scale = true;
        self
    }

    pub fn enum_vals(mut self, vals: Vec<EnumValue>) -> Self {
        self.enum_vals = vals;
        self
    }
}

/// Flatten a parameter list to its uniform-bearing leaves: groups are
/// replaced by their children.
pub fn flatten_params(params: &[Parameter]) -> Vec<&Parameter> {
    let mut out = Vec::new();
    for param in params {
        if param.kind == ParamKind::Group {
            out.extend(flatten_params(&param.children));
        } else {
            out.push(param);
        }
    }
    out
}

/// A parameter-to-uniform mapping entry handed to the Renderer collaborator.
///
/// For `ColorGradient` parameters the renderer binds the `{name}_colors` and
/// `{name}_positions` array pair derived from `name`.
#[derive(Clone, Debug)]
pub struct UniformBinding<'a> {
    pub name: String,
    pub kind: ParamKind,
    pub value: Option<&'a Value>,
}

/// Defines a type of node: ports, parameters, description, and code
/// generation.
pub trait Operator {
    /// Operator group, e.g. `pattern`, `generator`, `filter`.
    fn group(&self) -> &'static str;

    /// Human-readable type name, e.g. `Bricks`.
    fn name(&self) -> &'static str;

    /// Globally unique id, `group_name` convention.
    fn id(&self) -> &'static str;

    /// Markdown description shown in the operator catalog.
    fn description(&self) -> &'static str {
        ""
    }

    fn inputs(&self) -> &[InputDef] {
        &[]
    }

    fn outputs(&self) -> &[OutputDef] {
        &[]
    }

    fn params(&self) -> &[Parameter] {
        &[]
    }

    /// Returns an expression for the named output of `node`, evaluated at the
    /// coordinate expression `uv`.
    ///
    /// Implementations must guard their one-time emission of uniform
    /// declarations and shared library code with `assembly.start(node)` /
    /// `assembly.finish(node)`, and must remain cheap to call a second time
    /// for the same node (the assembly caches fanned-out outputs in locals).
    fn read_output_value(
        &self,
        assembly: &mut ShaderAssembly,
        graph: &Graph,
        node: &Node,
        output_id: &str,
        uv: &Expr,
    ) -> Result<Expr>;

    /// Locate an operator input by id. Unknown ids are a programmer error.
    fn get_input(&self, id: &str) -> Result<&InputDef> {
        self.inputs()
            .iter()
            .find(|i| i.id == id)
            .ok_or_else(|| anyhow!("operator input not found: {}:{id}", self.id()))
    }

    /// Locate an operator output by id. Unknown ids are a programmer error.
    fn get_output(&self, id: &str) -> Result<&OutputDef> {
        self.outputs()
            .iter()
            .find(|o| o.id == id)
            .ok_or_else(|| anyhow!("operator output not found: {}:{id}", self.id()))
    }

    /// Locate a parameter by id, searching group children.
    fn find_param(&self, id: &str) -> Option<&Parameter> {
        flatten_params(self.params()).into_iter().find(|p| p.id == id)
    }

    /// Prefix for shader local variables generated for a node of this type.
    /// Pure function of (operator id, node id).
    fn local_prefix(&self, node_id: NodeId) -> String {
        format!("t{}{node_id}", capitalize(self.id()))
    }

    /// Prefix for shader uniforms generated for a node of this type.
    /// Pure function of (operator id, node id).
    fn uniform_prefix(&self, node_id: NodeId) -> String {
        format!("u{}{node_id}", capitalize(self.id()))
    }

    /// Uniform name for one parameter of one node instance.
    fn uniform_name(&self, node_id: NodeId, param_id: &str) -> String {
        format!("{}_{param_id}", self.uniform_prefix(node_id))
    }

    /// Build the complete shader for `node` and its current input
    /// connections: fresh assembly, first declared output, serialized text.
    ///
    /// Used both for GPU compilation and for the "view generated source"
    /// display; both must see byte-identical output for the same graph state.
    fn build(&self, graph: &Graph, node: &Node) -> Result<String> {
        let output = self
            .outputs()
            .first()
            .ok_or_else(|| anyhow!("operator {} has no outputs to build", self.id()))?;
        let mut assembly = ShaderAssembly::new();
        let uv = Expr::ident("vTextureCoord", DataType::Uv);
        let expr = self.read_output_value(&mut assembly, graph, node, output.id, &uv)?;
        assembly.main(expr)?;
        Ok(assembly.to_source())
    }

    /// The parameter-to-uniform-name mapping for one node, group children
    /// flattened, unset values falling back to declared defaults.
    fn uniform_bindings<'a>(&'a self, node: &'a Node) -> Vec<UniformBinding<'a>> {
        flatten_params(self.params())
            .into_iter()
            .map(|param| UniformBinding {
                name: self.uniform_name(node.id, param.id),
                kind: param.kind,
                value: node.param_values.get(param.id).or(param.default.as_ref()),
            })
            .collect()
    }
}

fn capitalize(id: &str) -> String {
    let mut chars = id.chars();
    match chars.next() {
        Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
        None => String::new(),
    }
}

/// Validate that `params` (recursively) have unique ids. Called by the
/// registry when the catalog is installed.
pub(crate) fn check_param_ids(op_id: &str, params: &[Parameter]) -> Result<()> {
    let flat = flatten_params(params);
    for (i, a) in flat.iter().enumerate() {
        if flat[i + 1..].iter().any(|b| b.id == a.id) {
            bail!("operator {op_id} declares duplicate parameter id {}", a.id);
        }
    }
    Ok(())
}

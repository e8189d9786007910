//! Typed expression IR used during shader code generation.
//!
//! The IR is deliberately tiny: identifiers, raw literals (an escape hatch
//! for inline snippets), function calls, and type casts. Every node carries
//! its `DataType` assigned at construction time; there is no separate
//! inference pass.

use anyhow::{Result, bail};

/// Data types for expressions, ports, and uniforms.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DataType {
    /// Single float per pixel.
    Scalar,
    /// vec2 texture coordinate.
    Uv,
    /// vec3.
    Xyz,
    /// vec4, used for normal and displacement maps.
    Xyzw,
    /// vec4 color.
    Rgba,
    /// Opaque / array value, never a real operator output.
    Other,

    // Types that only apply to uniforms.
    Integer,
    Rgb,
    RgbaGradient,
}

impl DataType {
    /// GLSL type name for declarable types.
    pub fn glsl(self) -> Result<&'static str> {
        match self {
            DataType::Scalar => Ok("float"),
            DataType::Uv => Ok("vec2"),
            DataType::Xyz | DataType::Rgb => Ok("vec3"),
            DataType::Xyzw | DataType::Rgba => Ok("vec4"),
            DataType::Integer => Ok("int"),
            DataType::Other | DataType::RgbaGradient => {
                bail!("data type {self:?} has no GLSL declaration")
            }
        }
    }
}

/// Weights for the RGBA -> scalar luma reduction. Fixed, sums to 1.0.
pub const LUMA_WEIGHTS: &str = "vec4(0.3, 0.59, 0.11, 0.0)";

/// A typed shader expression.
#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    Ident {
        name: String,
        ty: DataType,
    },
    Literal {
        text: String,
        ty: DataType,
    },
    Call {
        func: String,
        args: Vec<Expr>,
        ty: DataType,
    },
    TypeCast {
        value: Box<Expr>,
        ty: DataType,
    },
}

impl Expr {
    pub fn ident(name: impl Into<String>, ty: DataType) -> Self {
        Expr::Ident {
            name: name.into(),
            ty,
        }
    }

    pub fn literal(text: impl Into<String>, ty: DataType) -> Self {
        Expr::Literal {
            text: text.into(),
            ty,
        }
    }

    pub fn call(func: impl Into<String>, args: Vec<Expr>, ty: DataType) -> Self {
        Expr::Call {
            func: func.into(),
            args,
            ty,
        }
    }

    pub fn ty(&self) -> DataType {
        match self {
            Expr::Ident { ty, .. }
            | Expr::Literal { ty, .. }
            | Expr::Call { ty, .. }
            | Expr::TypeCast { ty, .. } => *ty,
        }
    }

    /// Serialize this expression to GLSL text.
    ///
    /// Call arguments are emitted one per line, indented for the generated
    /// source viewer. The formatting is cosmetic; nesting stays valid however
    /// deep the expression is.
    pub fn emit(&self, indent: usize) -> Result<String> {
        match self {
            Expr::Ident { name, .. } => Ok(name.clone()),
            Expr::Literal { text, .. } => Ok(text.clone()),
            Expr::Call { func, args, .. } => {
                let arg_indent = indent + 2;
                let mut out = String::new();
                out.push_str(func);
                out.push_str("(\n");
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        out.push_str(",\n");
                    }
                    out.push_str(&" ".repeat(arg_indent));
                    out.push_str(&arg.emit(arg_indent)?);
                }
                out.push(')');
                Ok(out)
            }
            Expr::TypeCast { value, ty } => {
                let inner = value.emit(indent)?;
                match (value.ty(), *ty) {
                    (DataType::Scalar, DataType::Rgba) | (DataType::Scalar, DataType::Xyzw) => {
                        Ok(format!("vec4(vec3({inner}), 1.0)"))
                    }
                    (DataType::Scalar, DataType::Xyz) => Ok(format!("vec3({inner})")),
                    (DataType::Rgba, DataType::Scalar) | (DataType::Xyzw, DataType::Scalar) => {
                        Ok(format!("dot({inner}, {LUMA_WEIGHTS})"))
                    }
                    (from, to) => bail!("type conversion not supported: {from:?} -> {to:?}"),
                }
            }
        }
    }
}

fn conversion_supported(from: DataType, to: DataType) -> bool {
    matches!(
        (from, to),
        (DataType::Scalar, DataType::Rgba)
            | (DataType::Scalar, DataType::Xyzw)
            | (DataType::Scalar, DataType::Xyz)
            | (DataType::Rgba, DataType::Scalar)
            | (DataType::Xyzw, DataType::Scalar)
    )
}

/// Coerce `expr` to `target`.
///
/// An identity cast is elided (the expression is returned unchanged). The
/// conversion matrix is intentionally partial: direct Xyz <-> Rgba casts are
/// unsupported so that normal maps and colors cannot be silently
/// interchanged. Unsupported pairs fail naming both types.
pub fn cast(expr: Expr, target: DataType) -> Result<Expr> {
    let from = expr.ty();
    if from == target {
        return Ok(expr);
    }
    if !conversion_supported(from, target) {
        bail!("type conversion not supported: {from:?} -> {target:?}");
    }
    Ok(Expr::TypeCast {
        value: Box::new(expr),
        ty: target,
    })
}

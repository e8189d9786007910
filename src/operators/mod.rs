//! Built-in operator library.
//!
//! Each module defines one operator type: its ports, parameters, and the
//! shader fragment it contributes during assembly. GLSL helper functions
//! live under `shaders/` and are registered through the assembly's common
//! block mechanism so helpers shared by several operators appear once per
//! program.

use std::sync::Arc;

use crate::operator::Operator;

mod blend;
mod bricks;
mod colorizer;
mod constant_color;
mod gradient;
mod mask;
mod modulus;
mod noise;
mod normal_map;

pub use blend::Blend;
pub use bricks::Bricks;
pub use colorizer::Colorizer;
pub use constant_color::ConstantColor;
pub use gradient::Gradient;
pub use mask::Mask;
pub use modulus::Modulus;
pub use noise::Noise;
pub use normal_map::NormalMap;

/// One instance of every built-in operator, ready for registration.
pub fn catalog() -> Vec<Arc<dyn Operator>> {
    vec![
        Arc::new(Bricks::new()),
        Arc::new(Noise::new()),
        Arc::new(Gradient::new()),
        Arc::new(ConstantColor::new()),
        Arc::new(Blend::new()),
        Arc::new(Colorizer::new()),
        Arc::new(Mask::new()),
        Arc::new(Modulus::new()),
        Arc::new(NormalMap::new()),
    ]
}

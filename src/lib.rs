//! texel-forge: a node-graph to GLSL shader compilation engine.
//!
//! Users compose a directed graph of operators (pattern generators, filters,
//! blend nodes) with typed terminals and parameters. The engine compiles the
//! subgraph feeding a node's output into a single fragment-shader program:
//! it walks the dependency structure, generates code per node with
//! memoization and fan-out de-duplication, applies type coercion, and emits
//! deterministic source text. GPU compilation and execution live behind the
//! [`render::Renderer`] boundary; this crate only produces text and
//! parameter-to-uniform mappings.

pub mod assembly;
pub mod document;
pub mod expr;
pub mod graph;
pub mod operator;
pub mod operators;
pub mod registry;
pub mod render;

pub use assembly::ShaderAssembly;
pub use expr::{DataType, Expr};
pub use graph::{ChangeType, Connection, Graph, Node, NodeId, TerminalRef};
pub use operator::{Operator, Parameter};
pub use registry::Registry;

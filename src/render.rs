//! Renderer collaborator boundary.
//!
//! The engine produces shader text and parameter-to-uniform mappings; GPU
//! compilation and execution happen behind the [`Renderer`] trait supplied by
//! the host. Handles are opaque tokens minted by the renderer. The engine
//! tracks which handles each node holds and releases them when the node is
//! deleted or its program is invalidated.

use std::collections::HashSet;

use anyhow::{Result, anyhow};

use crate::graph::{Graph, NodeId};
use crate::operator::UniformBinding;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ProgramHandle(pub u64);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TextureHandle(pub u64);

/// Output size for one draw.
#[derive(Clone, Copy, Debug)]
pub struct DrawParams {
    pub width: u32,
    pub height: u32,
}

impl Default for DrawParams {
    fn default() -> Self {
        Self {
            width: 512,
            height: 512,
        }
    }
}

/// GPU operations the engine consumes but never implements.
pub trait Renderer {
    fn compile_program(&mut self, source: &str) -> Result<ProgramHandle>;

    /// Bind parameter values to the named uniforms of a compiled program.
    /// Gradient entries bind the `{name}_colors` / `{name}_positions` array
    /// pair derived from the entry's name.
    fn bind_uniforms(&mut self, program: ProgramHandle, bindings: &[UniformBinding<'_>])
    -> Result<()>;

    fn execute(&mut self, program: ProgramHandle, params: &DrawParams) -> Result<()>;

    fn release_program(&mut self, program: ProgramHandle);

    fn load_texture(&mut self, data: &[u8]) -> Result<TextureHandle>;

    fn release_texture(&mut self, texture: TextureHandle);
}

/// GPU resources held on behalf of one node. The source text the program was
/// compiled from is kept so an unchanged rebuild can skip recompilation.
#[derive(Default)]
pub struct GlResources {
    pub program: Option<ProgramHandle>,
    pub source: Option<String>,
    pub textures: Vec<TextureHandle>,
}

impl GlResources {
    /// Hand everything back to the renderer.
    pub fn release(&mut self, renderer: &mut dyn Renderer) {
        if let Some(program) = self.program.take() {
            renderer.release_program(program);
        }
        self.source = None;
        for texture in self.textures.drain(..) {
            renderer.release_texture(texture);
        }
    }
}

/// Drop a node's compiled program so the next render rebuilds it. Used when
/// a change notification indicates the generated source may differ.
pub fn invalidate_program(graph: &mut Graph, node_id: NodeId, renderer: &mut dyn Renderer) {
    if let Some(node) = graph.find_node_mut(node_id) {
        if let Some(program) = node.resources.program.take() {
            renderer.release_program(program);
        }
        node.resources.source = None;
    }
}

/// Render one node's first output: build the shader for its upstream
/// subgraph, compile it (reusing the cached program when the source is
/// unchanged), bind the uniforms of every contributing node, and execute.
pub fn render_node(
    graph: &mut Graph,
    node_id: NodeId,
    renderer: &mut dyn Renderer,
    params: &DrawParams,
) -> Result<()> {
    let (source, contributors) = {
        let node = graph
            .find_node(node_id)
            .ok_or_else(|| anyhow!("node not found: {node_id}"))?;
        let source = node.operator.build(graph, node)?;
        let mut seen: HashSet<NodeId> = HashSet::new();
        let mut contributors = vec![node_id];
        seen.insert(node_id);
        graph.visit_upstream_nodes(node_id, &mut |upstream, _| {
            if seen.insert(upstream.id) {
                contributors.push(upstream.id);
            }
            true
        });
        (source, contributors)
    };

    let cached = graph
        .find_node(node_id)
        .and_then(|n| match (n.resources.program, &n.resources.source) {
            (Some(program), Some(old)) if *old == source => Some(program),
            _ => None,
        });
    let program = match cached {
        Some(program) => program,
        None => {
            let program = renderer.compile_program(&source)?;
            if let Some(node) = graph.find_node_mut(node_id) {
                if let Some(old) = node.resources.program.replace(program) {
                    renderer.release_program(old);
                }
                node.resources.source = Some(source);
            }
            program
        }
    };

    let mut bindings: Vec<UniformBinding<'_>> = Vec::new();
    for id in &contributors {
        if let Some(node) = graph.find_node(*id) {
            bindings.extend(node.operator.uniform_bindings(node));
        }
    }
    renderer.bind_uniforms(program, &bindings)?;
    renderer.execute(program, params)
}

/// A renderer that mints handles and records traffic without touching a GPU.
/// Used by tests and headless hosts.
#[derive(Default)]
pub struct NullRenderer {
    next_handle: u64,
    pub live_programs: HashSet<ProgramHandle>,
    pub live_textures: HashSet<TextureHandle>,
    pub compiled_sources: Vec<String>,
    pub bound_uniform_names: Vec<String>,
    pub executions: usize,
}

impl Renderer for NullRenderer {
    fn compile_program(&mut self, source: &str) -> Result<ProgramHandle> {
        self.next_handle += 1;
        let handle = ProgramHandle(self.next_handle);
        self.live_programs.insert(handle);
        self.compiled_sources.push(source.to_string());
        Ok(handle)
    }

    fn bind_uniforms(
        &mut self,
        _program: ProgramHandle,
        bindings: &[UniformBinding<'_>],
    ) -> Result<()> {
        self.bound_uniform_names
            .extend(bindings.iter().map(|b| b.name.clone()));
        Ok(())
    }

    fn execute(&mut self, _program: ProgramHandle, _params: &DrawParams) -> Result<()> {
        self.executions += 1;
        Ok(())
    }

    fn release_program(&mut self, program: ProgramHandle) {
        self.live_programs.remove(&program);
    }

    fn load_texture(&mut self, _data: &[u8]) -> Result<TextureHandle> {
        self.next_handle += 1;
        let handle = TextureHandle(self.next_handle);
        self.live_textures.insert(handle);
        Ok(handle)
    }

    fn release_texture(&mut self, texture: TextureHandle) {
        self.live_textures.remove(&texture);
    }
}

//! Indirect draw commands handed to the host renderer

use crate::grass::config::MeshTier;
use crate::grass::lod::LodTier;
use crate::math::Aabb;

/// One chunk's draw for the frame.
///
/// The host binds `mesh`/`material` and the culled instance buffer, then
/// calls [`DrawCommand::record`]. The instance count lives in `args` on the
/// GPU and is never read by the CPU.
#[derive(Clone, Debug)]
pub struct DrawCommand {
    pub chunk: [u32; 2],
    pub tier: LodTier,
    pub mesh: MeshTier,
    /// `DrawIndexedIndirectArgs` written by the compact stage
    pub args: wgpu::Buffer,
    /// Compacted survivors, tightly packed from slot 0
    pub instances: wgpu::Buffer,
    pub chunk_bounds: Aabb,
    /// Bound over every active chunk
    pub field_bounds: Aabb,
}

impl DrawCommand {
    /// Issue the indirect draw on a pass that already has the mesh bound
    pub fn record(&self, pass: &mut wgpu::RenderPass<'_>) {
        pass.draw_indexed_indirect(&self.args, 0);
    }
}

/// Everything `tick` produced for one frame
#[derive(Clone, Debug, Default)]
pub struct FrameDraws {
    pub commands: Vec<DrawCommand>,
    /// Chunks drawn with the full-detail tier
    pub full_detail: u32,
    /// Chunks drawn with the LOD tier
    pub lod: u32,
    /// Chunks that could not be culled this frame
    pub skipped: u32,
    /// Whether the field bound touches the view frustum at all
    pub field_visible: bool,
}

impl FrameDraws {
    pub fn push(&mut self, command: DrawCommand) {
        match command.tier {
            LodTier::Full => self.full_detail += 1,
            LodTier::Lod => self.lod += 1,
        }
        self.commands.push(command);
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

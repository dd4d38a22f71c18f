use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;

use super::RenderCtx;

#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct TriangleVertex {
    pub pos: [f32; 2],
}

impl TriangleVertex {
    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        const ATTRS: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![0 => Float32x2];
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<TriangleVertex>() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &ATTRS,
        }
    }
}

/// One triangle whose clipped interior is the whole viewport.
pub const FULLSCREEN_TRIANGLE: [TriangleVertex; 3] = [
    TriangleVertex { pos: [-1.0, -1.0] },
    TriangleVertex { pos: [-1.0, 3.0] },
    TriangleVertex { pos: [3.0, -1.0] },
];

/// Vertex buffer for [`FULLSCREEN_TRIANGLE`], created on first draw.
#[derive(Default)]
pub struct FullscreenTriangle {
    vbo: Option<wgpu::Buffer>,
}

impl FullscreenTriangle {
    pub fn new() -> Self {
        Self::default()
    }

    fn ensure_buffer(&mut self, ctx: &RenderCtx<'_>) -> &wgpu::Buffer {
        self.vbo.get_or_insert_with(|| {
            ctx.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("stratus fullscreen triangle vbo"),
                contents: bytemuck::cast_slice(&FULLSCREEN_TRIANGLE),
                usage: wgpu::BufferUsages::VERTEX,
            })
        })
    }

    /// Records the draw. The pipeline and bind groups must already be set.
    pub fn draw(&mut self, ctx: &RenderCtx<'_>, pass: &mut wgpu::RenderPass<'_>) {
        let vbo = self.ensure_buffer(ctx);
        pass.set_vertex_buffer(0, vbo.slice(..));
        pass.draw(0..FULLSCREEN_TRIANGLE.len() as u32, 0..1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn triangle_covers_clip_square() {
        // The square [-1, 1]² lies inside the triangle if each corner does.
        let [a, b, c] = FULLSCREEN_TRIANGLE.map(|v| v.pos);
        let edge = |p: [f32; 2], q: [f32; 2], r: [f32; 2]| {
            (q[0] - p[0]) * (r[1] - p[1]) - (q[1] - p[1]) * (r[0] - p[0])
        };
        for corner in [[-1.0, -1.0], [1.0, -1.0], [1.0, 1.0], [-1.0, 1.0]] {
            let d1 = edge(a, b, corner);
            let d2 = edge(b, c, corner);
            let d3 = edge(c, a, corner);
            let all_neg = d1 <= 0.0 && d2 <= 0.0 && d3 <= 0.0;
            let all_pos = d1 >= 0.0 && d2 >= 0.0 && d3 >= 0.0;
            assert!(all_neg || all_pos, "corner {corner:?} outside");
        }
    }

    #[test]
    fn layout_stride_matches_vertex() {
        assert_eq!(TriangleVertex::layout().array_stride, 8);
    }
}

use std::path::Path;
use std::time::Duration;

use stratus_engine::core::{App, AppControl, FrameCtx};
use stratus_engine::render::fullscreen::{FullscreenTriangle, TriangleVertex};
use stratus_engine::render::program::{ProgramDesc, ShaderProgram};
use stratus_engine::render::volume::{NoiseVolume, VolumeBindings, VolumeTexture};
use stratus_engine::render::RenderCtx;

use crate::config::ViewerConfig;
use crate::editor::{FrameStats, ParamEditor};
use crate::frame::{resolution_uniform, FrameContext};
use crate::uniforms::CloudUniform;

/// Bind group holding the noise volumes (group 0 is the uniform block).
const VOLUME_GROUP: u32 = 1;

/// GPU objects created on the first frame.
struct CloudPass {
    program: ShaderProgram<CloudUniform>,
    volumes: VolumeBindings,
    triangle: FullscreenTriangle,
    // Kept alive for the bind group.
    _textures: [VolumeTexture; 2],
}

impl CloudPass {
    fn new(ctx: &RenderCtx<'_>, config: &ViewerConfig) -> Self {
        let base = NoiseVolume::load_or_white(&config.base_noise);
        let detail = NoiseVolume::load_or_white(&config.detail_noise);
        let textures = [
            VolumeTexture::upload(ctx.device, ctx.queue, "base noise", &base),
            VolumeTexture::upload(ctx.device, ctx.queue, "detail noise", &detail),
        ];
        let volumes = VolumeBindings::new(ctx.device, "noise volumes", &[&textures[0], &textures[1]]);

        let vertex_source = read_source(&config.vertex_shader);
        let fragment_source = read_source(&config.fragment_shader);

        let mut program = ShaderProgram::new(
            ctx.device,
            &ProgramDesc {
                label: "clouds",
                vertex_source: &vertex_source,
                fragment_source: &fragment_source,
                vertex_entry: "vs_main",
                fragment_entry: "fs_main",
                color_format: ctx.surface_format,
                vertex_buffers: &[TriangleVertex::layout()],
                extra_bind_group_layouts: &[&volumes.layout],
            },
        );

        let (key, value) = resolution_uniform(ctx.size.width, ctx.size.height);
        program.set(key, value);

        Self {
            program,
            volumes,
            triangle: FullscreenTriangle::new(),
            _textures: textures,
        }
    }
}

/// Reads a shader file; a failure is logged and yields an empty source.
fn read_source(path: &Path) -> String {
    match std::fs::read_to_string(path) {
        Ok(src) => src,
        Err(e) => {
            log::error!("failed to read shader {}: {e}", path.display());
            String::new()
        }
    }
}

/// The cloud viewer application.
pub struct ViewerApp<E: ParamEditor> {
    config: ViewerConfig,
    frame: FrameContext,
    editor: E,
    stats: FrameStats,
    pass: Option<CloudPass>,
    cursor_synced: bool,
}

impl<E: ParamEditor> ViewerApp<E> {
    pub fn new(config: ViewerConfig, editor: E) -> Self {
        let frame = FrameContext::new(config.camera, config.projection(), config.start_captured);
        let stats = FrameStats::new(config.stats_interval);
        Self {
            config,
            frame,
            editor,
            stats,
            pass: None,
            cursor_synced: false,
        }
    }

    fn sync_capture(&self, ctx: &FrameCtx<'_, '_>) {
        let captured = self.frame.router.is_captured();
        ctx.window.set_cursor_captured(captured);
        ctx.window
            .set_title(&format!("{} | {}", self.config.title, self.frame.router.hint()));
    }
}

impl<E: ParamEditor> App for ViewerApp<E> {
    fn on_frame(&mut self, ctx: &mut FrameCtx<'_, '_>) -> AppControl {
        let dt = ctx.time.dt;

        if self.pass.is_none() {
            self.pass = Some(CloudPass::new(&ctx.render_ctx(), &self.config));
        }

        // ── input + editor + matrices ─────────────────────────────────────
        let editor = &mut self.editor;
        let outcome = self
            .frame
            .step(ctx.input, ctx.input_frame, dt, |params, hint| editor.frame(params, hint));
        if outcome.shutdown {
            return AppControl::Exit;
        }
        if outcome.capture_changed.is_some() || !self.cursor_synced {
            self.sync_capture(ctx);
            self.cursor_synced = true;
        }

        // ── uniforms ──────────────────────────────────────────────────────
        let Some(pass) = self.pass.as_mut() else {
            return AppControl::Continue;
        };
        for (key, value) in self.frame.frame_uniforms(ctx.time.elapsed) {
            pass.program.set(key, value);
        }

        // ── draw ──────────────────────────────────────────────────────────
        let control = ctx.render(self.config.clear_color, |rctx, target| {
            let mut rpass = target.begin_pass("clouds");
            if pass.program.bind(rctx.queue, &mut rpass) {
                rpass.set_bind_group(VOLUME_GROUP, &pass.volumes.bind_group, &[]);
                pass.triangle.draw(rctx, &mut rpass);
            }
        });

        self.frame.end_frame();

        if let Some(report) = self.stats.record(Duration::from_secs_f32(dt)) {
            log::info!(
                "{:.3} ms/frame ({:.1} FPS)",
                report.avg_ms,
                report.fps
            );
        }

        control
    }

    fn on_exit(&mut self) {
        log::info!("viewer exiting");
    }
}

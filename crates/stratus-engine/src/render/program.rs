//! Linked vertex + fragment program with a name-resolved uniform block.
//!
//! Construction never fails: compile and link problems are logged with the
//! stage they belong to and leave the program without a pipeline, in which
//! case [`ShaderProgram::bind`] reports `false` and callers skip the draw.

use std::borrow::Cow;
use std::fmt;
use std::marker::PhantomData;
use std::num::NonZeroU64;

use glam::{Mat4, Vec2, Vec3};

use super::reflect::{
    check_resource_bindings, check_stage_interface, compile_stage, require_entry_point,
    ShaderDiagnostic, ShaderStage, UniformBlock, UniformSlot, UniformValue,
};

/// Bind group index of the program's uniform block.
pub const UNIFORM_GROUP: u32 = 0;
/// Binding of the uniform block inside [`UNIFORM_GROUP`].
pub const UNIFORM_BINDING: u32 = 0;

/// Fixed enumeration of the uniform names a program is driven with.
///
/// `ALL[k.index()] == k` must hold for every key.
pub trait UniformKey: Copy + Eq + fmt::Debug + 'static {
    const ALL: &'static [Self];

    /// Member name in the shader's uniform struct.
    fn name(self) -> &'static str;

    fn index(self) -> usize;
}

/// CPU side of a uniform block: resolved slots plus the staged bytes.
///
/// Writes to keys without a slot, or with a value of the wrong kind, are
/// dropped. The first such write per key logs a warning.
pub struct UniformSet<K: UniformKey> {
    slots: Vec<Option<UniformSlot>>,
    warned: Vec<bool>,
    staging: Vec<u8>,
    changed: bool,
    quiet: bool,
    _keys: PhantomData<K>,
}

impl<K: UniformKey> UniformSet<K> {
    /// Resolves every key of `K` against `block` once.
    pub fn resolve(block: &UniformBlock) -> Self {
        let slots: Vec<Option<UniformSlot>> = K::ALL.iter().map(|k| block.slot(k.name())).collect();

        let missing = slots.iter().filter(|s| s.is_none()).count();
        if missing > 0 {
            log::debug!("{missing} uniform key(s) have no slot in the linked program");
        }

        Self {
            warned: vec![false; slots.len()],
            slots,
            staging: vec![0; block.size() as usize],
            changed: true,
            quiet: false,
            _keys: PhantomData,
        }
    }

    /// A set with no slots that never warns (used when linking failed).
    pub fn inert() -> Self {
        Self {
            slots: vec![None; K::ALL.len()],
            warned: vec![true; K::ALL.len()],
            staging: Vec::new(),
            changed: false,
            quiet: true,
            _keys: PhantomData,
        }
    }

    pub fn slot(&self, key: K) -> Option<UniformSlot> {
        self.slots.get(key.index()).copied().flatten()
    }

    /// Stages `value` for `key`. Returns `true` if the value was written.
    pub fn set(&mut self, key: K, value: UniformValue) -> bool {
        let Some(slot) = self.slot(key) else {
            self.warn_once(key, "not present in the program");
            return false;
        };

        if slot.kind != value.kind() {
            self.warn_once(key, "has a different type in the program");
            return false;
        }

        let start = slot.offset as usize;
        let end = start + slot.kind.size();
        let mut bytes = [0u8; 64];
        let bytes = &mut bytes[..slot.kind.size()];
        value.write_to(bytes);

        let dst = &mut self.staging[start..end];
        if dst != bytes {
            dst.copy_from_slice(bytes);
            self.changed = true;
        }
        true
    }

    pub fn bytes(&self) -> &[u8] {
        &self.staging
    }

    /// Returns whether the staged bytes changed since the last call.
    pub fn take_changed(&mut self) -> bool {
        std::mem::take(&mut self.changed)
    }

    fn warn_once(&mut self, key: K, what: &str) {
        if self.quiet {
            return;
        }
        let Some(warned) = self.warned.get_mut(key.index()) else { return };
        if !*warned {
            *warned = true;
            log::warn!("uniform `{}` ({key:?}) {what}; writes are ignored", key.name());
        }
    }
}

/// Construction parameters for a [`ShaderProgram`].
pub struct ProgramDesc<'a> {
    pub label: &'a str,
    pub vertex_source: &'a str,
    pub fragment_source: &'a str,
    pub vertex_entry: &'a str,
    pub fragment_entry: &'a str,
    pub color_format: wgpu::TextureFormat,
    pub vertex_buffers: &'a [wgpu::VertexBufferLayout<'a>],
    /// Layouts for bind groups 1.. (group 0 is the uniform block).
    pub extra_bind_group_layouts: &'a [&'a wgpu::BindGroupLayout],
}

struct Linked {
    pipeline: wgpu::RenderPipeline,
    ubo: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

/// A render pipeline built from two WGSL stages plus its uniform block.
pub struct ShaderProgram<K: UniformKey> {
    label: String,
    linked: Option<Linked>,
    uniforms: UniformSet<K>,
}

impl<K: UniformKey> ShaderProgram<K> {
    pub fn new(device: &wgpu::Device, desc: &ProgramDesc<'_>) -> Self {
        match link(desc) {
            Ok(block) => {
                let Some(linked) = create_linked(device, desc, &block) else {
                    return Self {
                        label: desc.label.to_owned(),
                        linked: None,
                        uniforms: UniformSet::inert(),
                    };
                };
                log::info!(
                    "program `{}` linked ({} uniforms, {} bytes)",
                    desc.label,
                    block.len(),
                    block.size()
                );
                Self {
                    label: desc.label.to_owned(),
                    linked: Some(linked),
                    uniforms: UniformSet::resolve(&block),
                }
            }
            Err(()) => Self {
                label: desc.label.to_owned(),
                linked: None,
                uniforms: UniformSet::inert(),
            },
        }
    }

    pub fn is_linked(&self) -> bool {
        self.linked.is_some()
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn set(&mut self, key: K, value: UniformValue) {
        self.uniforms.set(key, value);
    }

    pub fn set_int(&mut self, key: K, v: i32) {
        self.set(key, UniformValue::Int(v));
    }

    pub fn set_float(&mut self, key: K, v: f32) {
        self.set(key, UniformValue::Float(v));
    }

    pub fn set_vec2(&mut self, key: K, v: Vec2) {
        self.set(key, UniformValue::Vec2(v));
    }

    pub fn set_vec3(&mut self, key: K, v: Vec3) {
        self.set(key, UniformValue::Vec3(v));
    }

    pub fn set_mat4(&mut self, key: K, v: Mat4) {
        self.set(key, UniformValue::Mat4(v));
    }

    /// Makes this program current on `pass`.
    ///
    /// Uploads the staged uniforms if they changed, then sets the pipeline
    /// and the uniform bind group. Returns `false` if the program never
    /// linked; nothing is recorded in that case.
    pub fn bind(&mut self, queue: &wgpu::Queue, pass: &mut wgpu::RenderPass<'_>) -> bool {
        let Some(linked) = self.linked.as_ref() else {
            return false;
        };

        if self.uniforms.take_changed() {
            queue.write_buffer(&linked.ubo, 0, self.uniforms.bytes());
        }

        pass.set_pipeline(&linked.pipeline);
        pass.set_bind_group(UNIFORM_GROUP, &linked.bind_group, &[]);
        true
    }
}

/// Compiles both stages and checks they form a usable program.
///
/// Every problem found is logged; the error carries no payload.
fn link(desc: &ProgramDesc<'_>) -> Result<UniformBlock, ()> {
    let vs = compile_stage(ShaderStage::Vertex, desc.vertex_source);
    let fs = compile_stage(ShaderStage::Fragment, desc.fragment_source);

    let (vs, fs) = match (vs, fs) {
        (Ok(vs), Ok(fs)) => (vs, fs),
        (vs, fs) => {
            for err in [vs.err(), fs.err()].into_iter().flatten() {
                report(desc.label, &err);
            }
            report(
                desc.label,
                &ShaderDiagnostic {
                    stage: ShaderStage::Program,
                    log: "not linked: a stage failed to compile".to_owned(),
                },
            );
            return Err(());
        }
    };

    let group_count = 1 + desc.extra_bind_group_layouts.len() as u32;
    let in_layout = |group: u32, binding: u32| {
        if group == UNIFORM_GROUP {
            binding == UNIFORM_BINDING
        } else {
            group < group_count
        }
    };

    let checked = require_entry_point(&vs, ShaderStage::Vertex, desc.vertex_entry)
        .and_then(|()| require_entry_point(&fs, ShaderStage::Fragment, desc.fragment_entry))
        .and_then(|()| check_stage_interface(&vs, desc.vertex_entry, &fs, desc.fragment_entry))
        .and_then(|()| check_resource_bindings(&vs, ShaderStage::Vertex, in_layout))
        .and_then(|()| check_resource_bindings(&fs, ShaderStage::Fragment, in_layout))
        .and_then(|()| uniform_block(&vs, &fs));

    checked.map_err(|err| report(desc.label, &err))
}

/// The uniform block both stages agree on.
fn uniform_block(vs: &naga::Module, fs: &naga::Module) -> Result<UniformBlock, ShaderDiagnostic> {
    let from_vs = UniformBlock::reflect(vs, UNIFORM_GROUP, UNIFORM_BINDING);
    let from_fs = UniformBlock::reflect(fs, UNIFORM_GROUP, UNIFORM_BINDING);

    match (from_vs, from_fs) {
        (Some(v), Some(f)) if v != f => Err(ShaderDiagnostic {
            stage: ShaderStage::Program,
            log: format!(
                "vertex and fragment declare different uniform structs at @group({UNIFORM_GROUP}) @binding({UNIFORM_BINDING})"
            ),
        }),
        (_, Some(block)) | (Some(block), None) => Ok(block),
        (None, None) => Err(ShaderDiagnostic {
            stage: ShaderStage::Program,
            log: format!("no uniform struct at @group({UNIFORM_GROUP}) @binding({UNIFORM_BINDING})"),
        }),
    }
}

fn report(label: &str, err: &ShaderDiagnostic) {
    log::error!("program `{label}`: {err}");
}

/// Creates the GPU objects inside a validation error scope.
///
/// Anything the CPU-side checks missed (device limits, features the adapter
/// lacks) is reported as a link failure instead of reaching the device's
/// uncaptured-error handler.
fn create_linked(
    device: &wgpu::Device,
    desc: &ProgramDesc<'_>,
    block: &UniformBlock,
) -> Option<Linked> {
    let scope = device.push_error_scope(wgpu::ErrorFilter::Validation);

    let vs_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(&format!("{} vs", desc.label)),
        source: wgpu::ShaderSource::Wgsl(Cow::Borrowed(desc.vertex_source)),
    });
    let fs_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(&format!("{} fs", desc.label)),
        source: wgpu::ShaderSource::Wgsl(Cow::Borrowed(desc.fragment_source)),
    });

    let uniform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some(&format!("{} uniform bgl", desc.label)),
        entries: &[wgpu::BindGroupLayoutEntry {
            binding: UNIFORM_BINDING,
            visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: NonZeroU64::new(block.size() as u64),
            },
            count: None,
        }],
    });

    let mut layouts: Vec<&wgpu::BindGroupLayout> = Vec::with_capacity(1 + desc.extra_bind_group_layouts.len());
    layouts.push(&uniform_layout);
    layouts.extend_from_slice(desc.extra_bind_group_layouts);

    let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some(&format!("{} pipeline layout", desc.label)),
        bind_group_layouts: &layouts,
        immediate_size: 0,
    });

    let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(desc.label),
        layout: Some(&pipeline_layout),
        vertex: wgpu::VertexState {
            module: &vs_module,
            entry_point: Some(desc.vertex_entry),
            compilation_options: Default::default(),
            buffers: desc.vertex_buffers,
        },
        fragment: Some(wgpu::FragmentState {
            module: &fs_module,
            entry_point: Some(desc.fragment_entry),
            compilation_options: Default::default(),
            targets: &[Some(wgpu::ColorTargetState {
                format: desc.color_format,
                blend: None,
                write_mask: wgpu::ColorWrites::ALL,
            })],
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: None,
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        multiview_mask: None,
        cache: None,
    });

    let ubo = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some(&format!("{} ubo", desc.label)),
        size: block.size() as u64,
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });

    let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some(&format!("{} uniform bind group", desc.label)),
        layout: &uniform_layout,
        entries: &[wgpu::BindGroupEntry {
            binding: UNIFORM_BINDING,
            resource: ubo.as_entire_binding(),
        }],
    });

    if let Some(err) = pollster::block_on(scope.pop()) {
        report(
            desc.label,
            &ShaderDiagnostic {
                stage: ShaderStage::Program,
                log: err.to_string(),
            },
        );
        return None;
    }

    // Shader modules are released here; the pipeline keeps what it needs.
    Some(Linked {
        pipeline,
        ubo,
        bind_group,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::reflect::tests::{TEST_FS, TEST_VS};
    use crate::render::reflect::UniformKind;

    #[derive(Debug, Copy, Clone, Eq, PartialEq)]
    enum Key {
        Time,
        Color,
        Steps,
        Ivpm,
        Missing,
    }

    impl UniformKey for Key {
        const ALL: &'static [Self] = &[Key::Time, Key::Color, Key::Steps, Key::Ivpm, Key::Missing];

        fn name(self) -> &'static str {
            match self {
                Key::Time => "time",
                Key::Color => "color",
                Key::Steps => "steps",
                Key::Ivpm => "ivpm",
                Key::Missing => "not_in_shader",
            }
        }

        fn index(self) -> usize {
            self as usize
        }
    }

    fn desc<'a>(vs: &'a str, fs: &'a str) -> ProgramDesc<'a> {
        ProgramDesc {
            label: "test",
            vertex_source: vs,
            fragment_source: fs,
            vertex_entry: "vs_main",
            fragment_entry: "fs_main",
            color_format: wgpu::TextureFormat::Rgba8UnormSrgb,
            vertex_buffers: &[],
            extra_bind_group_layouts: &[],
        }
    }

    fn resolved() -> UniformSet<Key> {
        let fs = compile_stage(ShaderStage::Fragment, TEST_FS).unwrap();
        UniformSet::resolve(&UniformBlock::reflect(&fs, 0, 0).unwrap())
    }

    fn f32_at(set: &UniformSet<Key>, offset: usize) -> f32 {
        let b = &set.bytes()[offset..offset + 4];
        f32::from_ne_bytes([b[0], b[1], b[2], b[3]])
    }

    // ── link ──────────────────────────────────────────────────────────────

    #[test]
    fn link_succeeds_for_valid_pair() {
        let block = link(&desc(TEST_VS, TEST_FS)).unwrap();
        assert_eq!(block.size(), 112);
    }

    #[test]
    fn link_fails_when_a_stage_does_not_compile() {
        assert!(link(&desc("fn (", TEST_FS)).is_err());
        assert!(link(&desc(TEST_VS, "@fragment fn")).is_err());
    }

    #[test]
    fn link_fails_on_empty_source() {
        assert!(link(&desc("", TEST_FS)).is_err());
    }

    #[test]
    fn link_fails_on_wrong_entry_point() {
        let mut d = desc(TEST_VS, TEST_FS);
        d.fragment_entry = "main";
        assert!(link(&d).is_err());
    }

    #[test]
    fn link_fails_without_uniform_block() {
        let fs = "@fragment fn fs_main() -> @location(0) vec4<f32> { return vec4<f32>(1.0); }";
        assert!(link(&desc(TEST_VS, fs)).is_err());
    }

    #[test]
    fn link_fails_on_unwritten_fragment_input() {
        let fs = r#"
@fragment
fn fs_main(@location(3) v: vec4<f32>) -> @location(0) vec4<f32> {
    return v;
}
"#;
        assert!(link(&desc(TEST_VS, fs)).is_err());
    }

    #[test]
    fn link_fails_on_binding_outside_layout() {
        let fs = format!(
            "{TEST_FS}\n@group(2) @binding(7) var extra: texture_2d<f32>;\n"
        );
        assert!(link(&desc(TEST_VS, &fs)).is_err());
    }

    #[test]
    fn link_fails_on_second_binding_in_uniform_group() {
        let fs = format!("{TEST_FS}\n@group(0) @binding(1) var<uniform> other: vec4<f32>;\n");
        assert!(link(&desc(TEST_VS, &fs)).is_err());
    }

    #[test]
    fn link_fails_when_stages_disagree_on_uniforms() {
        let vs = r#"
struct Other { scale: f32 }
@group(0) @binding(0) var<uniform> other: Other;

@vertex
fn vs_main(@location(0) pos: vec2<f32>) -> @builtin(position) vec4<f32> {
    return vec4<f32>(pos * other.scale, 0.0, 1.0);
}
"#;
        assert!(link(&desc(vs, TEST_FS)).is_err());
    }

    // ── UniformSet ────────────────────────────────────────────────────────

    #[test]
    fn keys_resolve_once_to_slots() {
        let set = resolved();
        assert_eq!(set.slot(Key::Color).map(|s| s.offset), Some(16));
        assert_eq!(set.slot(Key::Ivpm).map(|s| s.kind), Some(UniformKind::Mat4));
        assert_eq!(set.slot(Key::Missing), None);
        assert_eq!(set.bytes().len(), 112);
    }

    #[test]
    fn set_writes_bytes_at_slot_offset() {
        let mut set = resolved();
        assert!(set.set(Key::Time, UniformValue::Float(2.5)));
        assert!(set.set(Key::Color, UniformValue::Vec3(Vec3::new(1.0, 2.0, 3.0))));
        assert_eq!(f32_at(&set, 0), 2.5);
        assert_eq!(f32_at(&set, 16), 1.0);
        assert_eq!(f32_at(&set, 24), 3.0);
    }

    #[test]
    fn missing_key_is_a_noop() {
        let mut set = resolved();
        set.take_changed();
        let before = set.bytes().to_vec();

        assert!(!set.set(Key::Missing, UniformValue::Float(1.0)));
        assert!(!set.set(Key::Missing, UniformValue::Float(2.0)));
        assert_eq!(set.bytes(), &before[..]);
        assert!(!set.take_changed());
    }

    #[test]
    fn kind_mismatch_is_a_noop() {
        let mut set = resolved();
        assert!(!set.set(Key::Steps, UniformValue::Float(1.0)));
        assert!(set.set(Key::Steps, UniformValue::Int(256)));
    }

    #[test]
    fn changed_tracks_actual_byte_changes() {
        let mut set = resolved();
        assert!(set.take_changed());

        set.set(Key::Time, UniformValue::Float(1.0));
        assert!(set.take_changed());

        set.set(Key::Time, UniformValue::Float(1.0));
        assert!(!set.take_changed());
    }

    #[test]
    fn inert_set_accepts_nothing() {
        let mut set = UniformSet::<Key>::inert();
        assert!(!set.set(Key::Time, UniformValue::Float(1.0)));
        assert!(set.bytes().is_empty());
        assert!(!set.take_changed());
    }
}

//! WGSL stage compilation and uniform-block reflection.
//!
//! Both run on the CPU through naga (the same front end wgpu uses), so a
//! broken shader is reported as a diagnostic instead of tripping the device's
//! uncaptured-error handler, and the uniform name table is known before any
//! GPU object exists.

use std::collections::HashMap;
use std::fmt;

use glam::{Mat4, Vec2, Vec3, Vec4};
use naga::{AddressSpace, ScalarKind, TypeInner, VectorSize};

/// Which part of the program a diagnostic refers to.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ShaderStage {
    Vertex,
    Fragment,
    /// The link step (both stages together).
    Program,
}

impl ShaderStage {
    fn naga_stage(self) -> Option<naga::ShaderStage> {
        match self {
            ShaderStage::Vertex => Some(naga::ShaderStage::Vertex),
            ShaderStage::Fragment => Some(naga::ShaderStage::Fragment),
            ShaderStage::Program => None,
        }
    }
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ShaderStage::Vertex => "VERTEX",
            ShaderStage::Fragment => "FRAGMENT",
            ShaderStage::Program => "PROGRAM",
        })
    }
}

/// Compile or link failure: the stage plus the full log text.
#[derive(Debug, Clone)]
pub struct ShaderDiagnostic {
    pub stage: ShaderStage,
    pub log: String,
}

impl fmt::Display for ShaderDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} shader error:\n{}", self.stage, self.log)
    }
}

impl std::error::Error for ShaderDiagnostic {}

/// Parses and validates one stage's WGSL text.
pub fn compile_stage(stage: ShaderStage, source: &str) -> Result<naga::Module, ShaderDiagnostic> {
    let module = naga::front::wgsl::parse_str(source).map_err(|e| ShaderDiagnostic {
        stage,
        log: e.emit_to_string(source),
    })?;

    naga::valid::Validator::new(
        naga::valid::ValidationFlags::all(),
        naga::valid::Capabilities::all(),
    )
    .validate(&module)
    .map_err(|e| ShaderDiagnostic {
        stage,
        log: e.as_inner().to_string(),
    })?;

    Ok(module)
}

/// Checks that `module` exports an entry point called `name` for `stage`.
pub fn require_entry_point(
    module: &naga::Module,
    stage: ShaderStage,
    name: &str,
) -> Result<(), ShaderDiagnostic> {
    let found = module
        .entry_points
        .iter()
        .any(|ep| ep.name == name && Some(ep.stage) == stage.naga_stage());

    if found {
        Ok(())
    } else {
        Err(ShaderDiagnostic {
            stage: ShaderStage::Program,
            log: format!("missing {stage} entry point `{name}`"),
        })
    }
}

/// Checks that every location the fragment entry point reads is written by
/// the vertex entry point.
pub fn check_stage_interface(
    vs: &naga::Module,
    vs_entry: &str,
    fs: &naga::Module,
    fs_entry: &str,
) -> Result<(), ShaderDiagnostic> {
    let mut outputs = Vec::new();
    if let Some(ep) = find_entry_point(vs, naga::ShaderStage::Vertex, vs_entry) {
        if let Some(result) = &ep.function.result {
            push_locations(vs, result.ty, result.binding.as_ref(), &mut outputs);
        }
    }

    let mut inputs = Vec::new();
    if let Some(ep) = find_entry_point(fs, naga::ShaderStage::Fragment, fs_entry) {
        for arg in &ep.function.arguments {
            push_locations(fs, arg.ty, arg.binding.as_ref(), &mut inputs);
        }
    }

    match inputs.iter().find(|loc| !outputs.contains(loc)) {
        None => Ok(()),
        Some(loc) => Err(ShaderDiagnostic {
            stage: ShaderStage::Program,
            log: format!(
                "fragment input @location({loc}) is not written by the vertex stage (outputs: {outputs:?})"
            ),
        }),
    }
}

/// Checks every resource binding declared in `module` against `provided`.
pub fn check_resource_bindings(
    module: &naga::Module,
    stage: ShaderStage,
    provided: impl Fn(u32, u32) -> bool,
) -> Result<(), ShaderDiagnostic> {
    for (_, var) in module.global_variables.iter() {
        let Some(b) = var.binding.as_ref() else { continue };
        if !provided(b.group, b.binding) {
            return Err(ShaderDiagnostic {
                stage: ShaderStage::Program,
                log: format!(
                    "{stage} resource `{}` at @group({}) @binding({}) is not in the pipeline layout",
                    var.name.as_deref().unwrap_or("<unnamed>"),
                    b.group,
                    b.binding
                ),
            });
        }
    }
    Ok(())
}

fn find_entry_point<'m>(
    module: &'m naga::Module,
    stage: naga::ShaderStage,
    name: &str,
) -> Option<&'m naga::EntryPoint> {
    module
        .entry_points
        .iter()
        .find(|ep| ep.stage == stage && ep.name == name)
}

/// Collects `@location`s from a binding, or from the members of a struct.
fn push_locations(
    module: &naga::Module,
    ty: naga::Handle<naga::Type>,
    binding: Option<&naga::Binding>,
    out: &mut Vec<u32>,
) {
    match binding {
        Some(naga::Binding::Location { location, .. }) => out.push(*location),
        Some(_) => {}
        None => {
            if let TypeInner::Struct { members, .. } = &module.types[ty].inner {
                for member in members {
                    if let Some(naga::Binding::Location { location, .. }) = &member.binding {
                        out.push(*location);
                    }
                }
            }
        }
    }
}

/// Type of a single uniform block member.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum UniformKind {
    Int,
    Uint,
    Float,
    Vec2,
    Vec3,
    Vec4,
    Mat4,
}

impl UniformKind {
    fn from_inner(inner: &TypeInner) -> Option<Self> {
        match *inner {
            TypeInner::Scalar(s) if s.width == 4 => match s.kind {
                ScalarKind::Sint => Some(UniformKind::Int),
                ScalarKind::Uint => Some(UniformKind::Uint),
                ScalarKind::Float => Some(UniformKind::Float),
                _ => None,
            },
            TypeInner::Vector { size, scalar } if scalar.kind == ScalarKind::Float && scalar.width == 4 => {
                match size {
                    VectorSize::Bi => Some(UniformKind::Vec2),
                    VectorSize::Tri => Some(UniformKind::Vec3),
                    VectorSize::Quad => Some(UniformKind::Vec4),
                }
            }
            TypeInner::Matrix {
                columns: VectorSize::Quad,
                rows: VectorSize::Quad,
                scalar,
            } if scalar.kind == ScalarKind::Float && scalar.width == 4 => Some(UniformKind::Mat4),
            _ => None,
        }
    }

    /// Bytes written for a value of this kind.
    pub fn size(self) -> usize {
        match self {
            UniformKind::Int | UniformKind::Uint | UniformKind::Float => 4,
            UniformKind::Vec2 => 8,
            UniformKind::Vec3 => 12,
            UniformKind::Vec4 => 16,
            UniformKind::Mat4 => 64,
        }
    }
}

/// Resolved location of a named uniform inside the block.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct UniformSlot {
    pub offset: u32,
    pub kind: UniformKind,
}

/// A value destined for a uniform slot.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum UniformValue {
    Int(i32),
    Uint(u32),
    Float(f32),
    Vec2(Vec2),
    Vec3(Vec3),
    Vec4(Vec4),
    Mat4(Mat4),
}

impl UniformValue {
    pub fn kind(&self) -> UniformKind {
        match self {
            UniformValue::Int(_) => UniformKind::Int,
            UniformValue::Uint(_) => UniformKind::Uint,
            UniformValue::Float(_) => UniformKind::Float,
            UniformValue::Vec2(_) => UniformKind::Vec2,
            UniformValue::Vec3(_) => UniformKind::Vec3,
            UniformValue::Vec4(_) => UniformKind::Vec4,
            UniformValue::Mat4(_) => UniformKind::Mat4,
        }
    }

    /// Writes the std140-compatible bytes into `dst` (`dst.len() == kind().size()`).
    pub(crate) fn write_to(&self, dst: &mut [u8]) {
        match self {
            UniformValue::Int(v) => dst.copy_from_slice(bytemuck::bytes_of(v)),
            UniformValue::Uint(v) => dst.copy_from_slice(bytemuck::bytes_of(v)),
            UniformValue::Float(v) => dst.copy_from_slice(bytemuck::bytes_of(v)),
            UniformValue::Vec2(v) => dst.copy_from_slice(bytemuck::bytes_of(v)),
            UniformValue::Vec3(v) => dst.copy_from_slice(bytemuck::bytes_of(v)),
            UniformValue::Vec4(v) => dst.copy_from_slice(bytemuck::bytes_of(v)),
            UniformValue::Mat4(m) => dst.copy_from_slice(bytemuck::bytes_of(m)),
        }
    }
}

/// Name → slot table of the struct bound as `var<uniform>` at one binding.
#[derive(Debug, Clone, PartialEq)]
pub struct UniformBlock {
    size: u32,
    slots: HashMap<String, UniformSlot>,
}

impl UniformBlock {
    /// Finds the uniform struct at `@group(group) @binding(binding)`.
    ///
    /// Members of unsupported types (arrays, nested structs, bools) are
    /// skipped with a debug log; they simply have no slot.
    pub fn reflect(module: &naga::Module, group: u32, binding: u32) -> Option<Self> {
        let (_, var) = module.global_variables.iter().find(|(_, var)| {
            var.space == AddressSpace::Uniform
                && var
                    .binding
                    .as_ref()
                    .is_some_and(|b| b.group == group && b.binding == binding)
        })?;

        let TypeInner::Struct { members, span } = &module.types[var.ty].inner else {
            log::debug!("uniform at @group({group}) @binding({binding}) is not a struct");
            return None;
        };

        let mut slots = HashMap::with_capacity(members.len());
        for member in members {
            let Some(name) = member.name.as_deref() else { continue };
            match UniformKind::from_inner(&module.types[member.ty].inner) {
                Some(kind) => {
                    slots.insert(
                        name.to_owned(),
                        UniformSlot {
                            offset: member.offset,
                            kind,
                        },
                    );
                }
                None => log::debug!("uniform member `{name}` has an unsupported type; skipped"),
            }
        }

        Some(Self {
            // Uniform buffer bindings are sized in 16-byte units.
            size: span.next_multiple_of(16).max(16),
            slots,
        })
    }

    /// Size of the backing buffer in bytes.
    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn slot(&self, name: &str) -> Option<UniformSlot> {
        self.slots.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) const TEST_VS: &str = r#"
@vertex
fn vs_main(@location(0) pos: vec2<f32>) -> @builtin(position) vec4<f32> {
    return vec4<f32>(pos, 0.0, 1.0);
}
"#;

    pub(crate) const TEST_FS: &str = r#"
struct Params {
    time: f32,
    color: vec3<f32>,
    steps: i32,
    ivpm: mat4x4<f32>,
    resolution: vec2<f32>,
}

@group(0) @binding(0) var<uniform> params: Params;

@fragment
fn fs_main() -> @location(0) vec4<f32> {
    let base = vec4<f32>(params.color * params.time, f32(params.steps));
    return base + params.ivpm[0] + vec4<f32>(params.resolution, 0.0, 0.0);
}
"#;

    // ── compile_stage ─────────────────────────────────────────────────────

    #[test]
    fn valid_stages_compile() {
        assert!(compile_stage(ShaderStage::Vertex, TEST_VS).is_ok());
        assert!(compile_stage(ShaderStage::Fragment, TEST_FS).is_ok());
    }

    #[test]
    fn syntax_error_reports_stage_and_log() {
        let err = compile_stage(ShaderStage::Fragment, "fn broken( {").unwrap_err();
        assert_eq!(err.stage, ShaderStage::Fragment);
        assert!(!err.log.is_empty());
        assert!(err.to_string().starts_with("FRAGMENT"));
    }

    #[test]
    fn type_error_is_reported() {
        let src = "@fragment fn fs_main() -> @location(0) vec4<f32> { return 1.0; }";
        let err = compile_stage(ShaderStage::Fragment, src).unwrap_err();
        assert_eq!(err.stage, ShaderStage::Fragment);
    }

    // ── require_entry_point ───────────────────────────────────────────────

    #[test]
    fn entry_point_lookup_checks_name_and_stage() {
        let vs = compile_stage(ShaderStage::Vertex, TEST_VS).unwrap();
        assert!(require_entry_point(&vs, ShaderStage::Vertex, "vs_main").is_ok());

        let err = require_entry_point(&vs, ShaderStage::Fragment, "vs_main").unwrap_err();
        assert_eq!(err.stage, ShaderStage::Program);
        assert!(err.log.contains("FRAGMENT"));
    }

    #[test]
    fn empty_source_has_no_entry_points() {
        let empty = compile_stage(ShaderStage::Vertex, "").unwrap();
        assert!(require_entry_point(&empty, ShaderStage::Vertex, "vs_main").is_err());
    }

    // ── stage interface ───────────────────────────────────────────────────

    const VS_POSITION_ONLY: &str = r#"
@vertex
fn vs_main(@location(0) pos: vec2<f32>) -> @builtin(position) vec4<f32> {
    return vec4<f32>(pos, 0.0, 1.0);
}
"#;

    const VS_WITH_UV: &str = r#"
struct VsOut {
    @builtin(position) clip: vec4<f32>,
    @location(0) uv: vec2<f32>,
}

@vertex
fn vs_main(@location(0) pos: vec2<f32>) -> VsOut {
    var out: VsOut;
    out.clip = vec4<f32>(pos, 0.0, 1.0);
    out.uv = pos;
    return out;
}
"#;

    const FS_READS_UV: &str = r#"
@fragment
fn fs_main(@location(0) uv: vec2<f32>) -> @location(0) vec4<f32> {
    return vec4<f32>(uv, 0.0, 1.0);
}
"#;

    const FS_READS_LOCATION_3: &str = r#"
@group(2) @binding(7) var extra: texture_2d<f32>;

@fragment
fn fs_main(@location(3) v: vec4<f32>) -> @location(0) vec4<f32> {
    return v + textureLoad(extra, vec2<i32>(0, 0), 0);
}
"#;

    #[test]
    fn matching_locations_pass() {
        let vs = compile_stage(ShaderStage::Vertex, VS_WITH_UV).unwrap();
        let fs = compile_stage(ShaderStage::Fragment, FS_READS_UV).unwrap();
        assert!(check_stage_interface(&vs, "vs_main", &fs, "fs_main").is_ok());
    }

    #[test]
    fn unwritten_fragment_input_fails() {
        let vs = compile_stage(ShaderStage::Vertex, VS_POSITION_ONLY).unwrap();
        let fs = compile_stage(ShaderStage::Fragment, FS_READS_LOCATION_3).unwrap();
        let err = check_stage_interface(&vs, "vs_main", &fs, "fs_main").unwrap_err();
        assert_eq!(err.stage, ShaderStage::Program);
        assert!(err.log.contains("@location(3)"));
    }

    #[test]
    fn binding_outside_layout_fails() {
        let fs = compile_stage(ShaderStage::Fragment, FS_READS_LOCATION_3).unwrap();
        let err = check_resource_bindings(&fs, ShaderStage::Fragment, |g, _| g < 2).unwrap_err();
        assert!(err.log.contains("@group(2) @binding(7)"));
        assert!(check_resource_bindings(&fs, ShaderStage::Fragment, |g, b| g == 2 && b == 7).is_ok());
    }

    // ── UniformBlock ──────────────────────────────────────────────────────

    #[test]
    fn reflects_member_offsets_and_kinds() {
        let fs = compile_stage(ShaderStage::Fragment, TEST_FS).unwrap();
        let block = UniformBlock::reflect(&fs, 0, 0).unwrap();

        assert_eq!(block.len(), 5);
        assert_eq!(block.slot("time"), Some(UniformSlot { offset: 0, kind: UniformKind::Float }));
        assert_eq!(block.slot("color"), Some(UniformSlot { offset: 16, kind: UniformKind::Vec3 }));
        assert_eq!(block.slot("steps"), Some(UniformSlot { offset: 28, kind: UniformKind::Int }));
        assert_eq!(block.slot("ivpm"), Some(UniformSlot { offset: 32, kind: UniformKind::Mat4 }));
        assert_eq!(
            block.slot("resolution"),
            Some(UniformSlot { offset: 96, kind: UniformKind::Vec2 })
        );
        assert_eq!(block.size(), 112);
    }

    #[test]
    fn unknown_name_has_no_slot() {
        let fs = compile_stage(ShaderStage::Fragment, TEST_FS).unwrap();
        let block = UniformBlock::reflect(&fs, 0, 0).unwrap();
        assert_eq!(block.slot("colour"), None);
    }

    #[test]
    fn wrong_binding_finds_nothing() {
        let fs = compile_stage(ShaderStage::Fragment, TEST_FS).unwrap();
        assert!(UniformBlock::reflect(&fs, 1, 0).is_none());
        assert!(UniformBlock::reflect(&fs, 0, 1).is_none());
    }

    // ── UniformValue ──────────────────────────────────────────────────────

    #[test]
    fn values_write_their_kind_size() {
        let values = [
            UniformValue::Int(-3),
            UniformValue::Float(1.5),
            UniformValue::Vec2(Vec2::new(1.0, 2.0)),
            UniformValue::Vec3(Vec3::new(1.0, 2.0, 3.0)),
            UniformValue::Mat4(Mat4::IDENTITY),
        ];
        for v in values {
            let mut buf = vec![0u8; v.kind().size()];
            v.write_to(&mut buf);
        }

        let mut buf = [0u8; 12];
        UniformValue::Vec3(Vec3::new(1.0, 2.0, 3.0)).write_to(&mut buf);
        let floats: Vec<f32> = buf
            .chunks_exact(4)
            .map(|c| f32::from_ne_bytes([c[0], c[1], c[2], c[3]]))
            .collect();
        assert_eq!(floats, vec![1.0, 2.0, 3.0]);
    }
}

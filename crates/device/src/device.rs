use serde::{Deserialize, Serialize};

/// Triangle face culling mode.
///
/// Serde names follow the declarative config vocabulary ("back",
/// "frontAndBack", ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CullMode {
    #[serde(rename = "none")]
    None,
    #[serde(rename = "back")]
    Back,
    #[serde(rename = "front")]
    Front,
    #[serde(rename = "frontAndBack")]
    FrontAndBack,
}

/// Depth comparison function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompareFunc {
    /// Config name "none": the test never passes.
    #[serde(rename = "none")]
    Never,
    #[serde(rename = "always")]
    Always,
    #[serde(rename = "less")]
    Less,
    #[serde(rename = "lessOrEqual")]
    LessOrEqual,
    #[serde(rename = "equal")]
    Equal,
    #[serde(rename = "greater")]
    Greater,
    #[serde(rename = "greaterOrEqual")]
    GreaterOrEqual,
    #[serde(rename = "notEqual")]
    NotEqual,
}

/// Source/destination blend weighting factor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlendFactor {
    #[serde(rename = "zero")]
    Zero,
    #[serde(rename = "one")]
    One,
    #[serde(rename = "sourceColour")]
    SourceColour,
    #[serde(rename = "invSourceColour")]
    InvSourceColour,
    #[serde(rename = "destColour")]
    DestColour,
    #[serde(rename = "invDestColour")]
    InvDestColour,
    #[serde(rename = "sourceAlpha")]
    SourceAlpha,
    #[serde(rename = "invSourceAlpha")]
    InvSourceAlpha,
    #[serde(rename = "destAlpha")]
    DestAlpha,
    #[serde(rename = "invDestAlpha")]
    InvDestAlpha,
    #[serde(rename = "constantColour")]
    ConstantColour,
    #[serde(rename = "invConstantColour")]
    InvConstantColour,
    #[serde(rename = "constantAlpha")]
    ConstantAlpha,
    #[serde(rename = "invConstantAlpha")]
    InvConstantAlpha,
}

/// How source and destination contributions combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlendEquation {
    #[serde(rename = "add")]
    Add,
    #[serde(rename = "subtract", alias = "sourceMinusDest")]
    Subtract,
    #[serde(rename = "destMinusSource")]
    ReverseSubtract,
    #[serde(rename = "min")]
    Min,
    #[serde(rename = "max")]
    Max,
}

/// The full blend pipeline state, issued to the device as one unit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BlendState {
    pub enabled: bool,
    pub source: BlendFactor,
    pub dest: BlendFactor,
    pub colour: [f32; 4],
    pub equation: BlendEquation,
}

impl BlendState {
    /// Opaque pass-through: blending off, ONE/ZERO, additive, white constant.
    pub fn opaque() -> Self {
        Self {
            enabled: false,
            source: BlendFactor::One,
            dest: BlendFactor::Zero,
            colour: [1.0; 4],
            equation: BlendEquation::Add,
        }
    }
}

/// Opaque handle to a device buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferHandle(pub u32);

/// How a mapped write region relates to earlier contents of the buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapMode {
    /// Earlier regions are no longer needed; the device may hand back fresh
    /// backing storage (orphaning) instead of waiting on in-flight reads.
    Discard,
    /// Earlier regions may still be read by in-flight draws; only the mapped
    /// range will be written, so the device must not stall on them.
    NoOverwrite,
}

/// Errors from device resource creation.
#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    #[error("buffer allocation of {requested} bytes failed")]
    AllocationFailed { requested: usize },
    #[error("zero-sized buffer requested")]
    ZeroSize,
}

/// The opaque sink all frame-state components drive.
///
/// Per-frame state and draw calls are assumed not to fail synchronously;
/// only resource creation returns a `Result`. Implementations interpret
/// `draw_indexed` as an indexed triangle-list draw against the given vertex
/// and index buffers, `first_index` counted in index ordinals.
pub trait RenderDevice {
    fn set_cull_mode(&mut self, mode: CullMode);
    fn set_depth_compare(&mut self, compare: CompareFunc);
    fn set_depth_write(&mut self, enabled: bool);
    fn set_blend(&mut self, blend: &BlendState);

    fn create_buffer(&mut self, bytes: usize) -> Result<BufferHandle, DeviceError>;
    fn destroy_buffer(&mut self, handle: BufferHandle);
    fn upload_range(&mut self, handle: BufferHandle, offset: usize, data: &[u8]);

    /// Map `len` bytes at `offset` for writing. Must be paired with `unmap`.
    fn map_range(&mut self, handle: BufferHandle, offset: usize, len: usize, mode: MapMode)
    -> &mut [u8];
    fn unmap(&mut self, handle: BufferHandle);

    fn draw_indexed(
        &mut self,
        vertices: BufferHandle,
        indices: BufferHandle,
        first_index: u32,
        index_count: u32,
    );
}

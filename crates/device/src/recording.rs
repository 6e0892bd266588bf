use crate::device::{
    BlendState, BufferHandle, CompareFunc, CullMode, DeviceError, MapMode, RenderDevice,
};
use std::collections::BTreeMap;

/// One recorded device call.
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceCall {
    SetCullMode(CullMode),
    SetDepthCompare(CompareFunc),
    SetDepthWrite(bool),
    SetBlend(BlendState),
    CreateBuffer {
        handle: BufferHandle,
        bytes: usize,
    },
    DestroyBuffer(BufferHandle),
    UploadRange {
        handle: BufferHandle,
        offset: usize,
        bytes: usize,
    },
    MapRange {
        handle: BufferHandle,
        offset: usize,
        bytes: usize,
        mode: MapMode,
    },
    Unmap(BufferHandle),
    DrawIndexed {
        vertices: BufferHandle,
        indices: BufferHandle,
        first_index: u32,
        index_count: u32,
    },
}

/// In-process device fake: records every call and backs buffers with host
/// memory so mapped and uploaded bytes can be inspected by tests.
///
/// Tests assert against the recorded call sequence instead of a real GPU.
#[derive(Debug, Default)]
pub struct RecordingDevice {
    next_handle: u32,
    buffers: BTreeMap<BufferHandle, Vec<u8>>,
    mapped: Option<BufferHandle>,
    calls: Vec<DeviceCall>,
    fail_create_in: Option<u32>,
}

impl RecordingDevice {
    pub fn new() -> Self {
        Self::default()
    }

    /// All calls recorded so far, in issue order.
    pub fn calls(&self) -> &[DeviceCall] {
        &self.calls
    }

    /// Drain and return the recorded calls.
    pub fn drain_calls(&mut self) -> Vec<DeviceCall> {
        std::mem::take(&mut self.calls)
    }

    /// Recorded draw calls only, in issue order.
    pub fn draws(&self) -> Vec<&DeviceCall> {
        self.calls
            .iter()
            .filter(|c| matches!(c, DeviceCall::DrawIndexed { .. }))
            .collect()
    }

    /// Current contents of a live buffer.
    pub fn buffer(&self, handle: BufferHandle) -> &[u8] {
        self.buffers
            .get(&handle)
            .expect("buffer read through a stale handle")
    }

    pub fn live_buffer_count(&self) -> usize {
        self.buffers.len()
    }

    /// Make the next `create_buffer` fail, for creation-error paths.
    pub fn fail_next_create(&mut self) {
        self.fail_create_in = Some(0);
    }

    /// Make the `skip`-th `create_buffer` from now fail (0 = the next one),
    /// for exercising partial-creation cleanup.
    pub fn fail_create_after(&mut self, skip: u32) {
        self.fail_create_in = Some(skip);
    }
}

impl RenderDevice for RecordingDevice {
    fn set_cull_mode(&mut self, mode: CullMode) {
        self.calls.push(DeviceCall::SetCullMode(mode));
    }

    fn set_depth_compare(&mut self, compare: CompareFunc) {
        self.calls.push(DeviceCall::SetDepthCompare(compare));
    }

    fn set_depth_write(&mut self, enabled: bool) {
        self.calls.push(DeviceCall::SetDepthWrite(enabled));
    }

    fn set_blend(&mut self, blend: &BlendState) {
        self.calls.push(DeviceCall::SetBlend(*blend));
    }

    fn create_buffer(&mut self, bytes: usize) -> Result<BufferHandle, DeviceError> {
        if bytes == 0 {
            return Err(DeviceError::ZeroSize);
        }
        match self.fail_create_in {
            Some(0) => {
                self.fail_create_in = None;
                return Err(DeviceError::AllocationFailed { requested: bytes });
            }
            Some(n) => self.fail_create_in = Some(n - 1),
            None => {}
        }
        self.next_handle += 1;
        let handle = BufferHandle(self.next_handle);
        self.buffers.insert(handle, vec![0; bytes]);
        self.calls.push(DeviceCall::CreateBuffer { handle, bytes });
        tracing::trace!(?handle, bytes, "create buffer");
        Ok(handle)
    }

    fn destroy_buffer(&mut self, handle: BufferHandle) {
        let removed = self.buffers.remove(&handle);
        assert!(removed.is_some(), "destroy of a stale buffer handle");
        self.calls.push(DeviceCall::DestroyBuffer(handle));
    }

    fn upload_range(&mut self, handle: BufferHandle, offset: usize, data: &[u8]) {
        let backing = self
            .buffers
            .get_mut(&handle)
            .expect("upload through a stale handle");
        backing[offset..offset + data.len()].copy_from_slice(data);
        self.calls.push(DeviceCall::UploadRange {
            handle,
            offset,
            bytes: data.len(),
        });
    }

    fn map_range(
        &mut self,
        handle: BufferHandle,
        offset: usize,
        len: usize,
        mode: MapMode,
    ) -> &mut [u8] {
        assert!(self.mapped.is_none(), "map while another map is live");
        self.mapped = Some(handle);
        self.calls.push(DeviceCall::MapRange {
            handle,
            offset,
            bytes: len,
            mode,
        });
        let backing = self
            .buffers
            .get_mut(&handle)
            .expect("map through a stale handle");
        &mut backing[offset..offset + len]
    }

    fn unmap(&mut self, handle: BufferHandle) {
        assert_eq!(self.mapped.take(), Some(handle), "unmatched unmap");
        self.calls.push(DeviceCall::Unmap(handle));
    }

    fn draw_indexed(
        &mut self,
        vertices: BufferHandle,
        indices: BufferHandle,
        first_index: u32,
        index_count: u32,
    ) {
        tracing::trace!(?vertices, first_index, index_count, "draw");
        self.calls.push(DeviceCall::DrawIndexed {
            vertices,
            indices,
            first_index,
            index_count,
        });
    }
}

use crate::layout::VertexLayout;
use framespace_device::{BufferHandle, DeviceError, MapMode, RenderDevice};

const VERTS_PER_QUAD: usize = 4;
const INDICES_PER_QUAD: u32 = 6;

/// Host scratch size for the staged-copy strategy.
const HOST_SCRATCH_BYTES: usize = 96 * 1024;

/// How a mesh moves written vertices to the device.
///
/// All three honour the same request/commit contract; they trade copies
/// against driver synchronization differently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StreamStrategy {
    /// Write into host scratch, then upload the committed sub-range. One
    /// extra copy, no mapping.
    StagedCopy,
    /// Map the whole buffer with discard semantics on every request. Each
    /// acquisition is a fresh generation; draws always start at ordinal 0.
    MappedOrphan,
    /// Map only the unwritten tail without waiting on readers of earlier
    /// regions; discard the whole buffer only on wrap.
    #[default]
    MappedRing,
}

/// Per-mesh streaming statistics.
#[derive(Debug, Clone, Copy, Default)]
pub struct StreamStats {
    pub draws: u32,
    pub quads: u64,
    pub bytes_written: u64,
    pub wraps: u32,
}

/// A writable reservation inside a quad mesh, sized for `quads * 4` vertices
/// at the mesh's stride. Fill it, then commit the count actually produced.
pub struct WriteRegion<'a> {
    pub bytes: &'a mut [u8],
    pub quads: u32,
}

#[derive(Debug, Clone, Copy)]
struct Reservation {
    quads: u32,
}

/// A fixed-capacity device vertex buffer used as circular staging for
/// streamed quads, with a precomputed triangle-list index buffer.
///
/// Producers loop `request`/`commit`; a reservation that would run past the
/// end of the buffer wraps the cursors to zero and acquires a fresh buffer
/// generation instead of stalling on storage still in use by in-flight
/// draws.
pub struct QuadMesh {
    vertices: BufferHandle,
    indices: BufferHandle,
    stride: usize,
    capacity: u32,
    byte_capacity: usize,
    strategy: StreamStrategy,
    /// Byte position of the next write in the vertex buffer.
    cursor: usize,
    /// Index-ordinal position of the next draw (6 per quad).
    index_cursor: u32,
    scratch: Vec<u8>,
    pending: Option<Reservation>,
    stats: StreamStats,
}

impl QuadMesh {
    /// Create a mesh holding up to `capacity` quads of the given layout.
    ///
    /// The index buffer covers the full capacity up front; u16 indices cap
    /// the capacity at 16384 quads.
    pub fn new(
        device: &mut dyn RenderDevice,
        capacity: u32,
        layout: &VertexLayout,
        strategy: StreamStrategy,
    ) -> Result<Self, DeviceError> {
        assert!(capacity > 0, "zero-capacity quad mesh");
        assert!(
            capacity as usize * VERTS_PER_QUAD <= u16::MAX as usize + 1,
            "quad capacity exceeds u16 index space"
        );
        let stride = layout.stride();
        let byte_capacity = stride * VERTS_PER_QUAD * capacity as usize;

        let vertices = device.create_buffer(byte_capacity)?;
        let pattern = index_pattern(capacity);
        let index_bytes: &[u8] = bytemuck::cast_slice(&pattern);
        let indices = match device.create_buffer(index_bytes.len()) {
            Ok(handle) => handle,
            Err(e) => {
                device.destroy_buffer(vertices);
                return Err(e);
            }
        };
        device.upload_range(indices, 0, index_bytes);

        let scratch = match strategy {
            StreamStrategy::StagedCopy => vec![0; HOST_SCRATCH_BYTES.min(byte_capacity)],
            _ => Vec::new(),
        };

        tracing::debug!(capacity, stride, ?strategy, "quad mesh created");
        Ok(Self {
            vertices,
            indices,
            stride,
            capacity,
            byte_capacity,
            strategy,
            cursor: 0,
            index_cursor: 0,
            scratch,
            pending: None,
            stats: StreamStats::default(),
        })
    }

    /// Reserve a write region for up to `quad_hint` quads.
    ///
    /// The hint is clamped to the per-call cap (host scratch for staged
    /// copies, total capacity otherwise); an oversized hint is never an
    /// error. If the clamped reservation would run past the end of the
    /// buffer, the cursors wrap to zero first and the acquisition discards
    /// the old generation.
    ///
    /// Every request must be matched by exactly one [`commit`], even for
    /// zero quads.
    ///
    /// [`commit`]: QuadMesh::commit
    pub fn request<'a>(
        &'a mut self,
        device: &'a mut dyn RenderDevice,
        quad_hint: u32,
    ) -> WriteRegion<'a> {
        assert!(self.pending.is_none(), "request while a reservation is open");

        let per_call_cap = match self.strategy {
            StreamStrategy::StagedCopy => {
                (self.scratch.len() / (VERTS_PER_QUAD * self.stride)) as u32
            }
            _ => self.capacity,
        };
        let quads = quad_hint.min(per_call_cap).min(self.capacity);
        let bytes = quads as usize * VERTS_PER_QUAD * self.stride;

        let mut fresh_generation = false;
        if self.strategy != StreamStrategy::MappedOrphan && self.cursor + bytes > self.byte_capacity
        {
            self.cursor = 0;
            self.index_cursor = 0;
            self.stats.wraps += 1;
            fresh_generation = true;
            tracing::trace!(quads, "cursor wrap, acquiring fresh generation");
        }

        self.pending = Some(Reservation { quads });
        let region = match self.strategy {
            StreamStrategy::StagedCopy => &mut self.scratch[..bytes],
            StreamStrategy::MappedOrphan => {
                let mapped =
                    device.map_range(self.vertices, 0, self.byte_capacity, MapMode::Discard);
                &mut mapped[..bytes]
            }
            StreamStrategy::MappedRing => {
                let mode = if fresh_generation {
                    MapMode::Discard
                } else {
                    MapMode::NoOverwrite
                };
                device.map_range(self.vertices, self.cursor, bytes, mode)
            }
        };
        WriteRegion {
            bytes: region,
            quads,
        }
    }

    /// Upload the written region and issue one indexed draw for `quads`
    /// quads at the current index-ordinal cursor, then advance.
    ///
    /// A zero-quad commit releases the reservation and draws nothing.
    /// Committing more quads than were reserved is a programming error.
    pub fn commit(&mut self, device: &mut dyn RenderDevice, quads: u32) {
        let reservation = self
            .pending
            .take()
            .expect("commit without a matching request");
        assert!(
            quads <= reservation.quads,
            "commit of {quads} quads exceeds the reservation of {}",
            reservation.quads
        );
        let bytes = quads as usize * VERTS_PER_QUAD * self.stride;

        match self.strategy {
            StreamStrategy::StagedCopy => {
                if quads > 0 {
                    device.upload_range(self.vertices, self.cursor, &self.scratch[..bytes]);
                }
            }
            StreamStrategy::MappedOrphan | StreamStrategy::MappedRing => {
                device.unmap(self.vertices);
            }
        }
        if quads == 0 {
            return;
        }

        debug_assert!(self.cursor + bytes <= self.byte_capacity);
        device.draw_indexed(
            self.vertices,
            self.indices,
            self.index_cursor,
            quads * INDICES_PER_QUAD,
        );
        self.stats.draws += 1;
        self.stats.quads += quads as u64;
        self.stats.bytes_written += bytes as u64;

        if self.strategy != StreamStrategy::MappedOrphan {
            self.cursor += bytes;
            self.index_cursor += quads * INDICES_PER_QUAD;
        }
    }

    /// Release the device buffers. The owning producer calls this when the
    /// mesh is retired.
    pub fn destroy(self, device: &mut dyn RenderDevice) {
        assert!(self.pending.is_none(), "destroy with an open reservation");
        device.destroy_buffer(self.vertices);
        device.destroy_buffer(self.indices);
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn strategy(&self) -> StreamStrategy {
        self.strategy
    }

    /// Byte position of the next write.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Index ordinal the next draw starts at.
    pub fn index_cursor(&self) -> u32 {
        self.index_cursor
    }

    pub fn stats(&self) -> &StreamStats {
        &self.stats
    }
}

/// Two triangles per quad over its four vertices, repeated for the full
/// capacity.
fn index_pattern(capacity: u32) -> Vec<u16> {
    let mut indices = Vec::with_capacity(capacity as usize * INDICES_PER_QUAD as usize);
    for quad in 0..capacity {
        let v = (quad as usize * VERTS_PER_QUAD) as u16;
        indices.extend_from_slice(&[v, v + 1, v + 2, v, v + 2, v + 3]);
    }
    indices
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::VertexAttr;
    use framespace_device::{DeviceCall, RecordingDevice};

    fn simple_layout() -> VertexLayout {
        VertexLayout::new([VertexAttr::new("position", 8), VertexAttr::new("colour", 16)])
    }

    fn mesh_with(
        device: &mut RecordingDevice,
        capacity: u32,
        strategy: StreamStrategy,
    ) -> QuadMesh {
        let layout = simple_layout();
        QuadMesh::new(device, capacity, &layout, strategy).unwrap()
    }

    fn draw_starts(device: &RecordingDevice) -> Vec<(u32, u32)> {
        device
            .calls()
            .iter()
            .filter_map(|c| match c {
                DeviceCall::DrawIndexed {
                    first_index,
                    index_count,
                    ..
                } => Some((*first_index, *index_count)),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn index_pattern_walks_quads() {
        let pattern = index_pattern(2);
        assert_eq!(pattern, vec![0, 1, 2, 0, 2, 3, 4, 5, 6, 4, 6, 7]);
    }

    #[test]
    fn creation_uploads_full_index_buffer() {
        let mut device = RecordingDevice::new();
        let mesh = mesh_with(&mut device, 100, StreamStrategy::MappedRing);
        let uploaded = device.buffer(mesh.indices);
        assert_eq!(uploaded.len(), 100 * 6 * 2);
        let as_u16: Vec<u16> = bytemuck::pod_collect_to_vec(uploaded);
        assert_eq!(&as_u16[..6], &[0, 1, 2, 0, 2, 3]);
        assert_eq!(as_u16[6 * 99], 99 * 4);
    }

    #[test]
    fn creation_failure_is_reported() {
        let mut device = RecordingDevice::new();
        device.fail_next_create();
        let layout = simple_layout();
        let result = QuadMesh::new(&mut device, 10, &layout, StreamStrategy::MappedRing);
        assert!(matches!(result, Err(DeviceError::AllocationFailed { .. })));
    }

    #[test]
    fn index_buffer_failure_releases_vertex_buffer() {
        let mut device = RecordingDevice::new();
        let layout = simple_layout();
        // Vertex buffer succeeds, index buffer fails.
        device.fail_create_after(1);
        let result = QuadMesh::new(&mut device, 10, &layout, StreamStrategy::MappedRing);
        assert!(result.is_err());
        assert_eq!(device.live_buffer_count(), 0);
    }

    #[test]
    fn oversized_hint_is_clamped_to_capacity() {
        let mut device = RecordingDevice::new();
        let mut mesh = mesh_with(&mut device, 100, StreamStrategy::MappedRing);
        let region = mesh.request(&mut device, 1000);
        assert_eq!(region.quads, 100);
        mesh.commit(&mut device, 100);
    }

    #[test]
    fn staged_copy_caps_at_scratch_and_capacity() {
        let mut device = RecordingDevice::new();
        // Scratch is clamped to the buffer size here, so capacity wins.
        let mut mesh = mesh_with(&mut device, 100, StreamStrategy::StagedCopy);
        let region = mesh.request(&mut device, 5000);
        assert_eq!(region.quads, 100);
        mesh.commit(&mut device, 0);
    }

    #[test]
    fn ring_wraps_instead_of_overflowing() {
        let mut device = RecordingDevice::new();
        let mut mesh = mesh_with(&mut device, 100, StreamStrategy::MappedRing);

        let region = mesh.request(&mut device, 60);
        assert_eq!(region.quads, 60);
        mesh.commit(&mut device, 60);
        assert_eq!(mesh.cursor(), 60 * 4 * 24);
        assert_eq!(mesh.index_cursor(), 360);

        // 60 more quads do not fit in the remaining 40: wrap to zero.
        let region = mesh.request(&mut device, 60);
        assert_eq!(region.quads, 60);
        mesh.commit(&mut device, 60);
        assert_eq!(mesh.stats().wraps, 1);

        let draws = draw_starts(&device);
        assert_eq!(draws, vec![(0, 360), (0, 360)]);
        assert_eq!(mesh.index_cursor(), 360);
    }

    #[test]
    fn sequential_commits_advance_draw_start() {
        let mut device = RecordingDevice::new();
        let mut mesh = mesh_with(&mut device, 100, StreamStrategy::MappedRing);
        for _ in 0..3 {
            let region = mesh.request(&mut device, 20);
            assert_eq!(region.quads, 20);
            mesh.commit(&mut device, 20);
        }
        assert_eq!(draw_starts(&device), vec![(0, 120), (120, 120), (240, 120)]);
    }

    #[test]
    fn zero_commit_is_a_no_op_draw_wise() {
        let mut device = RecordingDevice::new();
        let mut mesh = mesh_with(&mut device, 100, StreamStrategy::MappedRing);
        let _ = mesh.request(&mut device, 10);
        mesh.commit(&mut device, 0);
        assert!(draw_starts(&device).is_empty());
        assert_eq!(mesh.cursor(), 0);
        // The mapping is still released.
        assert!(
            device
                .calls()
                .iter()
                .any(|c| matches!(c, DeviceCall::Unmap(_)))
        );
    }

    #[test]
    fn partial_commit_advances_by_committed_amount() {
        let mut device = RecordingDevice::new();
        let mut mesh = mesh_with(&mut device, 100, StreamStrategy::MappedRing);
        let region = mesh.request(&mut device, 50);
        assert_eq!(region.quads, 50);
        mesh.commit(&mut device, 30);
        assert_eq!(mesh.cursor(), 30 * 4 * 24);
        assert_eq!(draw_starts(&device), vec![(0, 180)]);
    }

    #[test]
    #[should_panic(expected = "exceeds the reservation")]
    fn over_committing_panics() {
        let mut device = RecordingDevice::new();
        let mut mesh = mesh_with(&mut device, 100, StreamStrategy::MappedRing);
        let _ = mesh.request(&mut device, 10);
        mesh.commit(&mut device, 11);
    }

    #[test]
    #[should_panic(expected = "without a matching request")]
    fn commit_without_request_panics() {
        let mut device = RecordingDevice::new();
        let mut mesh = mesh_with(&mut device, 100, StreamStrategy::MappedRing);
        mesh.commit(&mut device, 1);
    }

    #[test]
    fn written_bytes_land_in_the_vertex_buffer() {
        let mut device = RecordingDevice::new();
        let mut mesh = mesh_with(&mut device, 4, StreamStrategy::MappedRing);
        let region = mesh.request(&mut device, 1);
        region.bytes.fill(0xAB);
        mesh.commit(&mut device, 1);
        let stride = mesh.stride();
        assert!(
            device.buffer(mesh.vertices)[..4 * stride]
                .iter()
                .all(|&b| b == 0xAB)
        );
    }

    #[test]
    fn staged_copy_uploads_through_scratch() {
        let mut device = RecordingDevice::new();
        let mut mesh = mesh_with(&mut device, 4, StreamStrategy::StagedCopy);
        let region = mesh.request(&mut device, 2);
        region.bytes.fill(0xCD);
        mesh.commit(&mut device, 2);
        let stride = mesh.stride();
        assert!(
            device.buffer(mesh.vertices)[..8 * stride]
                .iter()
                .all(|&b| b == 0xCD)
        );
        assert!(
            device
                .calls()
                .iter()
                .any(|c| matches!(c, DeviceCall::UploadRange { .. }))
        );
    }

    #[test]
    fn orphan_strategy_always_draws_from_zero() {
        let mut device = RecordingDevice::new();
        let mut mesh = mesh_with(&mut device, 100, StreamStrategy::MappedOrphan);
        for _ in 0..3 {
            let _ = mesh.request(&mut device, 40);
            mesh.commit(&mut device, 40);
        }
        assert_eq!(draw_starts(&device), vec![(0, 240), (0, 240), (0, 240)]);
        assert_eq!(mesh.cursor(), 0);
    }

    #[test]
    fn strategies_agree_on_draw_counts() {
        let workload = [30u32, 50, 45, 10, 80];
        let mut per_strategy = Vec::new();
        for strategy in [
            StreamStrategy::StagedCopy,
            StreamStrategy::MappedOrphan,
            StreamStrategy::MappedRing,
        ] {
            let mut device = RecordingDevice::new();
            let mut mesh = mesh_with(&mut device, 100, strategy);
            for &quads in &workload {
                let region = mesh.request(&mut device, quads);
                assert_eq!(region.quads, quads);
                mesh.commit(&mut device, quads);
            }
            let counts: Vec<u32> = draw_starts(&device).iter().map(|&(_, n)| n).collect();
            per_strategy.push(counts);
        }
        assert_eq!(per_strategy[0], per_strategy[1]);
        assert_eq!(per_strategy[1], per_strategy[2]);
    }

    #[test]
    fn producer_loops_through_multiple_reservations() {
        let mut device = RecordingDevice::new();
        let mut mesh = mesh_with(&mut device, 100, StreamStrategy::MappedRing);
        let mut remaining = 250u32;
        while remaining > 0 {
            let region = mesh.request(&mut device, remaining);
            let produced = region.quads;
            assert!(produced > 0);
            mesh.commit(&mut device, produced);
            remaining -= produced;
        }
        assert_eq!(mesh.stats().quads, 250);
        assert_eq!(mesh.stats().draws, 3);
        assert_eq!(mesh.stats().wraps, 2);
    }

    #[test]
    fn destroy_releases_both_buffers() {
        let mut device = RecordingDevice::new();
        let mesh = mesh_with(&mut device, 10, StreamStrategy::MappedRing);
        assert_eq!(device.live_buffer_count(), 2);
        mesh.destroy(&mut device);
        assert_eq!(device.live_buffer_count(), 0);
    }
}

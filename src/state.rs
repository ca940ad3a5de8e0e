use crate::checkpoint::{CheckpointBackend, Region, RegionMut};
use crate::field::Field;
use crate::partition::DomainPartition;

pub const REGION_ITERATION: u32 = 0;
pub const REGION_CURRENT: u32 = 1;
pub const REGION_PREVIOUS: u32 = 2;

/// Everything a checkpoint version captures: the completed-iteration
/// counter and both field buffers. Restoring a version overwrites all
/// three in place.
pub struct RunState {
    /// Completed loop iterations. Checkpoint versions correspond 1:1
    /// to values of this counter.
    pub iteration: u64,
    pub field: Field,
}

impl RunState {
    pub fn new(partition: &DomainPartition) -> Self {
        RunState {
            iteration: 0,
            field: Field::new(partition),
        }
    }

    pub fn regions(&self) -> [Region<'_>; 3] {
        let (current, previous) = self.field.buffers();
        [
            Region {
                id: REGION_ITERATION,
                bytes: bytemuck::bytes_of(&self.iteration),
            },
            Region {
                id: REGION_CURRENT,
                bytes: bytemuck::cast_slice(current),
            },
            Region {
                id: REGION_PREVIOUS,
                bytes: bytemuck::cast_slice(previous),
            },
        ]
    }

    pub fn regions_mut(&mut self) -> [RegionMut<'_>; 3] {
        let RunState { iteration, field } = self;
        let (current, previous) = field.buffers_mut();
        [
            RegionMut {
                id: REGION_ITERATION,
                bytes: bytemuck::bytes_of_mut(iteration),
            },
            RegionMut {
                id: REGION_CURRENT,
                bytes: bytemuck::cast_slice_mut(current),
            },
            RegionMut {
                id: REGION_PREVIOUS,
                bytes: bytemuck::cast_slice_mut(previous),
            },
        ]
    }

    /// Declares every region with the backend, before the loop starts.
    pub fn protect_all<B: CheckpointBackend>(&self, backend: &mut B) {
        for region in self.regions() {
            backend.protect(region.id, region.bytes.len());
        }
    }
}

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn regions_cover_counter_and_both_buffers() {
        let partition = DomainPartition::new(8, 0, 1).unwrap();
        let state = RunState::new(&partition);
        let regions = state.regions();
        assert_eq!(regions.len(), 3);
        assert_eq!(regions[0].bytes.len(), 8);
        let buffer_bytes = partition.local_rows() * partition.grid_size() * 8;
        assert_eq!(regions[1].bytes.len(), buffer_bytes);
        assert_eq!(regions[2].bytes.len(), buffer_bytes);
    }

    #[test]
    fn counter_bytes_track_the_iteration() {
        let partition = DomainPartition::new(8, 0, 1).unwrap();
        let mut state = RunState::new(&partition);
        state.iteration = 0x0102_0304;
        let regions = state.regions();
        assert_eq!(regions[0].bytes, 0x0102_0304u64.to_ne_bytes());
    }
}

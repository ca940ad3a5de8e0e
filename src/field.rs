use crate::par_slice;
use crate::partition::DomainPartition;

/// Fixed temperature of the heat source on the global top boundary.
pub const SOURCE_TEMP: f64 = 100.0;

/// Chunking for the parallel fill during initialization.
const INIT_CHUNK: usize = 1 << 14;

/// The per-rank temperature buffers, ping-ponged between iterations.
///
/// Both buffers are row-major `local_rows x M`. Row 0 and the last row
/// are halo rows: exchanged with the neighbor ranks each step, or held
/// at the fixed global boundary on the first and last rank. The halo
/// rows of `current` hold the most recently exchanged neighbor values
/// before a stencil pass begins.
pub struct Field {
    rows: usize,
    cols: usize,
    current: Vec<f64>,
    previous: Vec<f64>,
}

impl Field {
    /// Fresh zeroed field for `partition`, with the heat source applied
    /// on the top rank's upper boundary row: `SOURCE_TEMP` over the
    /// middle 80% of columns.
    pub fn new(partition: &DomainPartition) -> Self {
        let rows = partition.local_rows();
        let cols = partition.grid_size();
        let mut current = vec![0.0; rows * cols];
        let previous = vec![0.0; rows * cols];
        if partition.above().is_none() {
            par_slice::set_value(
                &mut current[cols / 10..cols * 9 / 10],
                SOURCE_TEMP,
                INIT_CHUNK,
            );
        }
        Field {
            rows,
            cols,
            current,
            previous,
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn current(&self) -> &[f64] {
        &self.current
    }

    pub fn current_mut(&mut self) -> &mut [f64] {
        &mut self.current
    }

    /// Read buffer and write buffer for one stencil pass.
    pub fn read_write(&mut self) -> (&[f64], &mut [f64]) {
        (&self.current, &mut self.previous)
    }

    /// Both buffers, in `(current, previous)` order, for checkpointing.
    pub fn buffers(&self) -> (&[f64], &[f64]) {
        (&self.current, &self.previous)
    }

    pub fn buffers_mut(&mut self) -> (&mut [f64], &mut [f64]) {
        (&mut self.current, &mut self.previous)
    }

    /// Swaps buffer roles after a pass, the freshly written buffer
    /// becomes `current`. Pointer swap, no copy.
    pub fn swap(&mut self) {
        std::mem::swap(&mut self.current, &mut self.previous);
    }

    /// One owned interior cell, by local interior row (halo excluded).
    pub fn interior(&self, row: usize, col: usize) -> f64 {
        debug_assert!(row < self.rows - 2);
        self.current[(row + 1) * self.cols + col]
    }
}

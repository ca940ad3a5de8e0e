use crate::error::Error;

/// One rank's contiguous row-block of the global `M x M` grid.
///
/// A rank owns `owned_rows` interior rows and carries one extra row on
/// each side: either a ghost row exchanged with the neighbor rank, or
/// the fixed global boundary for the first and last rank. Ownership is
/// exact, interior rows over all ranks sum to `M` with no overlap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DomainPartition {
    rank: usize,
    ranks: usize,
    grid_size: usize,
    owned_rows: usize,
    first_row: usize,
}

impl DomainPartition {
    pub fn new(grid_size: usize, rank: usize, ranks: usize) -> Result<Self, Error> {
        assert!(rank < ranks);
        if grid_size == 0 {
            return Err(Error::Config(
                "problem size works out to an empty grid".to_string(),
            ));
        }
        if grid_size < ranks {
            return Err(Error::Config(format!(
                "problem size too small for process count: {} rows over {} ranks",
                grid_size, ranks
            )));
        }
        let base = grid_size / ranks;
        let remainder = grid_size % ranks;
        let owned_rows = base + usize::from(rank < remainder);
        let first_row = rank * base + rank.min(remainder);
        Ok(DomainPartition {
            rank,
            ranks,
            grid_size,
            owned_rows,
            first_row,
        })
    }

    /// Derives the grid width from a per-rank memory budget: two
    /// `M x M` f64 buffers across the group must fit `size_mb` each.
    pub fn from_memory_budget(
        size_mb: usize,
        rank: usize,
        ranks: usize,
    ) -> Result<Self, Error> {
        let budget = size_mb * 1024 * 1024 * ranks;
        let cell_bytes = 2 * std::mem::size_of::<f64>();
        let grid_size = ((budget / cell_bytes) as f64).sqrt() as usize;
        Self::new(grid_size, rank, ranks)
    }

    pub fn rank(&self) -> usize {
        self.rank
    }

    pub fn ranks(&self) -> usize {
        self.ranks
    }

    /// Global grid width `M`, also the local column count.
    pub fn grid_size(&self) -> usize {
        self.grid_size
    }

    pub fn owned_rows(&self) -> usize {
        self.owned_rows
    }

    /// Global index of this rank's first interior row.
    pub fn first_row(&self) -> usize {
        self.first_row
    }

    /// Local row count including the two halo rows.
    pub fn local_rows(&self) -> usize {
        self.owned_rows + 2
    }

    /// Neighbor above, `None` for the top rank (fixed boundary there).
    pub fn above(&self) -> Option<usize> {
        (self.rank > 0).then(|| self.rank - 1)
    }

    /// Neighbor below, `None` for the bottom rank.
    pub fn below(&self) -> Option<usize> {
        (self.rank + 1 < self.ranks).then(|| self.rank + 1)
    }

    /// Size of both local buffers together, in MB.
    pub fn memory_mb(&self) -> f64 {
        let bytes = self.grid_size * self.local_rows() * 2 * std::mem::size_of::<f64>();
        bytes as f64 / (1024.0 * 1024.0)
    }
}

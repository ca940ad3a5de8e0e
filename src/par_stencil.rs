use crate::par_slice;
use crate::stencil::*;
use rayon::prelude::*;

/// Applies `stencil` to every interior cell of `input`, writing into
/// `output`, and returns the largest absolute change over those cells.
///
/// Both buffers are row-major `rows x cols` with a one-cell halo: row 0,
/// the last row, and the first and last columns are not recomputed, they
/// are carried over from `input` unchanged. The caller is responsible for
/// having exchanged the halo rows beforehand.
///
/// Output is a disjoint buffer, so rows parallelize with no ordering
/// requirement between tasks.
pub fn apply<const NEIGHBORHOOD_SIZE: usize>(
    stencil: &Stencil<NEIGHBORHOOD_SIZE>,
    input: &[f64],
    output: &mut [f64],
    cols: usize,
) -> f64 {
    profiling::scope!("par_stencil::apply");
    debug_assert_eq!(input.len(), output.len());
    debug_assert_eq!(input.len() % cols, 0);
    let rows = input.len() / cols;
    debug_assert!(rows >= 3);
    debug_assert!(cols >= 3);
    let radius = stencil.radius();
    debug_assert!(radius[0] <= 1 && radius[1] <= 1);

    // Halo rows and wall columns carry over unchanged.
    par_slice::copy(input, output, cols);

    output[cols..(rows - 1) * cols]
        .par_chunks_mut(cols)
        .enumerate()
        .map(|(chunk_index, out_row)| {
            let i = chunk_index + 1;
            let mut row_error = 0.0f64;
            for j in 1..cols - 1 {
                let mut args = [0.0; NEIGHBORHOOD_SIZE];
                for (arg, offset) in args.iter_mut().zip(stencil.offsets()) {
                    let n_i = (i as i32 + offset[0]) as usize;
                    let n_j = (j as i32 + offset[1]) as usize;
                    *arg = input[n_i * cols + n_j];
                }
                let value = stencil.apply(&args);
                row_error = row_error.max((value - input[i * cols + j]).abs());
                out_row[j] = value;
            }
            row_error
        })
        .reduce(|| 0.0, f64::max)
}

use num_traits::Num;
use rayon::prelude::*;

/// Sets each element to the same value.
/// `chunk_size` breaks the work into tasks for multi-threading.
pub fn set_value<NumType: Num + Copy + Send + Sync>(
    a_slice: &mut [NumType],
    value: NumType,
    chunk_size: usize,
) {
    a_slice
        .par_chunks_mut(chunk_size)
        .for_each(|a_chunk: &mut [NumType]| {
            for a in a_chunk {
                *a = value;
            }
        });
}

pub fn copy<NumType: Num + Copy + Send + Sync>(
    from_slice: &[NumType],
    to_slice: &mut [NumType],
    chunk_size: usize,
) {
    debug_assert_eq!(from_slice.len(), to_slice.len());
    to_slice
        .par_chunks_mut(chunk_size)
        .zip(from_slice.par_chunks(chunk_size))
        .for_each(|(to_chunk, from_chunk)| {
            to_chunk.copy_from_slice(from_chunk);
        });
}

/// Largest absolute difference between two slices.
pub fn max_abs_diff(a_slice: &[f64], b_slice: &[f64], chunk_size: usize) -> f64 {
    debug_assert_eq!(a_slice.len(), b_slice.len());
    a_slice
        .par_chunks(chunk_size)
        .zip(b_slice.par_chunks(chunk_size))
        .map(|(a_chunk, b_chunk)| {
            let mut result = 0.0f64;
            for (a, b) in a_chunk.iter().zip(b_chunk.iter()) {
                result = result.max((a - b).abs());
            }
            result
        })
        .reduce(|| 0.0, f64::max)
}

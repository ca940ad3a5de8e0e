/// For linear stencils, we can extract the weight for a neighbor
/// by passing in 1.0 for that neighbor and 0.0 for the others.
pub fn extract_weights<
    const NEIGHBORHOOD_SIZE: usize,
    F: Fn(&[f64; NEIGHBORHOOD_SIZE]) -> f64,
>(
    f: F,
) -> [f64; NEIGHBORHOOD_SIZE] {
    let mut weights = [0.0; NEIGHBORHOOD_SIZE];
    let mut arg_buffer = [0.0; NEIGHBORHOOD_SIZE];
    for n in 0..NEIGHBORHOOD_SIZE {
        arg_buffer[n] = 1.0;
        weights[n] = f(&arg_buffer);
        arg_buffer[n] = 0.0;
    }
    weights
}

/// We only deal with linear stencils, viewed as a combination of
/// `(row, col)` neighbor offsets and weights.
pub struct Stencil<const NEIGHBORHOOD_SIZE: usize> {
    pub weights: [f64; NEIGHBORHOOD_SIZE],
    pub offsets: [[i32; 2]; NEIGHBORHOOD_SIZE],
}

impl<const NEIGHBORHOOD_SIZE: usize> Stencil<NEIGHBORHOOD_SIZE> {
    pub fn new<F: Fn(&[f64; NEIGHBORHOOD_SIZE]) -> f64>(
        offsets: [[i32; 2]; NEIGHBORHOOD_SIZE],
        operation: F,
    ) -> Self {
        let weights = extract_weights(operation);
        Stencil { offsets, weights }
    }

    pub fn weights(&self) -> &[f64; NEIGHBORHOOD_SIZE] {
        &self.weights
    }

    pub fn offsets(&self) -> &[[i32; 2]; NEIGHBORHOOD_SIZE] {
        &self.offsets
    }

    /// Widest reach of any neighbor offset, per axis.
    /// The ghost-row halo must cover this.
    pub fn radius(&self) -> [i32; 2] {
        let mut result = [0; 2];
        for neighbor in self.offsets {
            for d in 0..2 {
                result[d] = result[d].max(neighbor[d].abs());
            }
        }
        result
    }

    pub fn apply(&self, args: &[f64; NEIGHBORHOOD_SIZE]) -> f64 {
        let mut result = 0.0;
        for n in 0..NEIGHBORHOOD_SIZE {
            result += self.weights[n] * args[n];
        }
        result
    }
}

/// Jacobi diffusion update, each cell the mean of its four grid neighbors.
pub fn jacobi_5pt() -> Stencil<4> {
    Stencil::new([[-1, 0], [1, 0], [0, -1], [0, 1]], |args: &[f64; 4]| {
        let up = args[0];
        let down = args[1];
        let left = args[2];
        let right = args[3];
        0.25 * (up + down + left + right)
    })
}

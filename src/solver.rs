use crate::comm::{CommError, Communicator};
use crate::field::Field;
use crate::par_stencil;
use crate::partition::DomainPartition;
use crate::stencil::Stencil;

/// Advances the field by one iteration: halo exchange with the
/// neighbor ranks, stencil sweep into the alternate buffer, buffer
/// swap. Returns the local error, the largest absolute change over the
/// cells this rank owns.
///
/// Deterministic in its inputs; the first and last rank keep their
/// fixed boundary row in place of the missing neighbor.
pub fn step<C: Communicator, const NEIGHBORHOOD_SIZE: usize>(
    comm: &mut C,
    partition: &DomainPartition,
    stencil: &Stencil<NEIGHBORHOOD_SIZE>,
    field: &mut Field,
) -> Result<f64, CommError> {
    profiling::scope!("solver::step");
    let cols = field.cols();
    let rows = field.rows();

    if let Some(above) = partition.above() {
        let (ghost, body) = field.current_mut().split_at_mut(cols);
        comm.sendrecv(above, &body[..cols], ghost)?;
    }
    if let Some(below) = partition.below() {
        let boundary = (rows - 1) * cols;
        let (body, ghost) = field.current_mut().split_at_mut(boundary);
        comm.sendrecv(below, &body[boundary - cols..], ghost)?;
    }

    let (input, output) = field.read_write();
    let local_error = par_stencil::apply(stencil, input, output, cols);
    field.swap();
    Ok(local_error)
}

#[cfg(test)]
mod unit_tests {
    use super::*;
    use crate::comm::LocalGroup;
    use crate::field::SOURCE_TEMP;
    use crate::stencil::jacobi_5pt;
    use float_cmp::assert_approx_eq;

    #[test]
    fn first_step_pulls_heat_off_the_source() {
        let partition = DomainPartition::new(10, 0, 1).unwrap();
        let mut comm = LocalGroup::split(1).pop().unwrap();
        let mut field = Field::new(&partition);
        let stencil = jacobi_5pt();

        let error = step(&mut comm, &partition, &stencil, &mut field).unwrap();

        // Cells under the source pick up a quarter of it.
        assert_approx_eq!(f64, error, SOURCE_TEMP / 4.0);
        assert_approx_eq!(f64, field.interior(0, 1), SOURCE_TEMP / 4.0);
        assert_approx_eq!(f64, field.interior(0, 5), SOURCE_TEMP / 4.0);
        // The source row itself is fixed.
        assert_approx_eq!(f64, field.current()[5], SOURCE_TEMP);
    }

    #[test]
    fn two_ranks_match_the_solo_run() {
        let grid_size = 12;
        let steps = 8;

        let solo_partition = DomainPartition::new(grid_size, 0, 1).unwrap();
        let mut solo_comm = LocalGroup::split(1).pop().unwrap();
        let mut solo_field = Field::new(&solo_partition);
        let stencil = jacobi_5pt();
        for _ in 0..steps {
            step(&mut solo_comm, &solo_partition, &stencil, &mut solo_field).unwrap();
        }

        let comms = LocalGroup::split(2);
        let handles: Vec<_> = comms
            .into_iter()
            .enumerate()
            .map(|(rank, mut comm)| {
                std::thread::spawn(move || {
                    let partition = DomainPartition::new(grid_size, rank, 2).unwrap();
                    let mut field = Field::new(&partition);
                    let stencil = jacobi_5pt();
                    for _ in 0..steps {
                        step(&mut comm, &partition, &stencil, &mut field).unwrap();
                    }
                    let mut rows = Vec::new();
                    for row in 0..partition.owned_rows() {
                        let mut cells = Vec::new();
                        for col in 0..grid_size {
                            cells.push(field.interior(row, col));
                        }
                        rows.push(cells);
                    }
                    (partition.first_row(), rows)
                })
            })
            .collect();

        for handle in handles {
            let (first_row, rows) = handle.join().unwrap();
            for (offset, cells) in rows.iter().enumerate() {
                let global_row = first_row + offset;
                for (col, value) in cells.iter().enumerate() {
                    assert_approx_eq!(
                        f64,
                        *value,
                        solo_field.interior(global_row, col),
                        ulps = 2
                    );
                }
            }
        }
    }
}

use ndarray::Array2;

use crate::{MlErr, Result};

/// A row-indexed sparse matrix: each row holds its nonzero `(column, value)` pairs.
#[derive(Debug, Clone, PartialEq)]
pub struct SparseMatrix {
    ncols: usize,
    rows: Vec<Vec<(usize, f32)>>,
}

impl SparseMatrix {
    /// Creates a new `SparseMatrix`.
    ///
    /// # Arguments
    /// * `ncols` - The amount of columns of the matrix.
    /// * `rows` - The nonzero `(column, value)` pairs of every row.
    ///
    /// # Returns
    /// A new `SparseMatrix` or an error if any column index is out of bounds.
    pub fn new(ncols: usize, rows: Vec<Vec<(usize, f32)>>) -> Result<Self> {
        let out_of_bounds = rows.iter().flatten().find(|&&(col, _)| col >= ncols);

        if let Some(&(index, _)) = out_of_bounds {
            return Err(MlErr::IndexOutOfBounds {
                what: "sparse row",
                index,
                len: ncols,
            });
        }

        Ok(Self { ncols, rows })
    }

    pub fn nrows(&self) -> usize {
        self.rows.len()
    }

    pub fn ncols(&self) -> usize {
        self.ncols
    }

    pub fn rows(&self) -> &[Vec<(usize, f32)>] {
        &self.rows
    }

    /// Expands the matrix into a dense array. Repeated column indices within a row add up.
    pub fn to_dense(&self) -> Array2<f32> {
        let mut dense = Array2::zeros((self.nrows(), self.ncols));

        for (i, row) in self.rows.iter().enumerate() {
            for &(j, value) in row {
                dense[[i, j]] += value;
            }
        }

        dense
    }
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;

    #[test]
    fn out_of_bounds_columns_are_rejected() {
        let err = SparseMatrix::new(2, vec![vec![(0, 1.0)], vec![(2, 1.0)]]).unwrap_err();
        assert_eq!(
            err,
            MlErr::IndexOutOfBounds {
                what: "sparse row",
                index: 2,
                len: 2
            }
        );
    }

    #[test]
    fn empty_rows_decode_to_zeros() {
        let m = SparseMatrix::new(2, vec![vec![], vec![(1, 3.0), (1, 1.0)]]).unwrap();
        assert_eq!(m.to_dense(), array![[0.0, 0.0], [0.0, 4.0]]);
    }
}

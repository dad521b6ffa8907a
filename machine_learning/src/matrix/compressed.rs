use half::f16;
use ndarray::{Array2, ArrayView2};

/// A dense matrix stored with half precision values, row major.
///
/// The encoding is lossy: values decode to their nearest `f16`.
#[derive(Debug, Clone, PartialEq)]
pub struct CompressedMatrix {
    nrows: usize,
    ncols: usize,
    data: Vec<f16>,
}

impl CompressedMatrix {
    /// Compresses a dense matrix.
    pub fn from_dense(m: ArrayView2<f32>) -> Self {
        let (nrows, ncols) = m.dim();
        let data = m.iter().map(|&x| f16::from_f32(x)).collect();

        Self { nrows, ncols, data }
    }

    pub fn nrows(&self) -> usize {
        self.nrows
    }

    pub fn ncols(&self) -> usize {
        self.ncols
    }

    pub fn to_dense(&self) -> Array2<f32> {
        Array2::from_shape_fn((self.nrows, self.ncols), |(i, j)| {
            self.data[i * self.ncols + j].to_f32()
        })
    }
}

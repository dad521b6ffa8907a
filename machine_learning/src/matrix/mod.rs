mod compressed;
mod sparse;

use std::borrow::Cow;

use ndarray::Array2;

pub use compressed::CompressedMatrix;
pub use sparse::SparseMatrix;

/// A matrix that may be stored in any of the supported encodings.
///
/// Every encoding decodes to the same dense values through `to_dense`, so numeric code only
/// ever has to deal with a plain `Array2`.
#[derive(Debug, Clone, PartialEq)]
pub enum GeneralMatrix {
    Full(Array2<f32>),
    Sparse(SparseMatrix),
    Compressed(CompressedMatrix),
}

impl GeneralMatrix {
    /// Returns the amount of rows of the matrix.
    pub fn nrows(&self) -> usize {
        match self {
            GeneralMatrix::Full(m) => m.nrows(),
            GeneralMatrix::Sparse(m) => m.nrows(),
            GeneralMatrix::Compressed(m) => m.nrows(),
        }
    }

    /// Returns the amount of columns of the matrix.
    pub fn ncols(&self) -> usize {
        match self {
            GeneralMatrix::Full(m) => m.ncols(),
            GeneralMatrix::Sparse(m) => m.ncols(),
            GeneralMatrix::Compressed(m) => m.ncols(),
        }
    }

    /// The name of the encoding, used in diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            GeneralMatrix::Full(_) => "full",
            GeneralMatrix::Sparse(_) => "sparse",
            GeneralMatrix::Compressed(_) => "compressed",
        }
    }

    /// Decodes the matrix into its dense representation.
    ///
    /// # Returns
    /// A borrowed array for `Full` matrices and a freshly decoded one otherwise.
    pub fn to_dense(&self) -> Cow<'_, Array2<f32>> {
        match self {
            GeneralMatrix::Full(m) => Cow::Borrowed(m),
            GeneralMatrix::Sparse(m) => Cow::Owned(m.to_dense()),
            GeneralMatrix::Compressed(m) => Cow::Owned(m.to_dense()),
        }
    }
}

impl From<Array2<f32>> for GeneralMatrix {
    fn from(value: Array2<f32>) -> Self {
        Self::Full(value)
    }
}

impl From<SparseMatrix> for GeneralMatrix {
    fn from(value: SparseMatrix) -> Self {
        Self::Sparse(value)
    }
}

impl From<CompressedMatrix> for GeneralMatrix {
    fn from(value: CompressedMatrix) -> Self {
        Self::Compressed(value)
    }
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;

    #[test]
    fn every_encoding_decodes_to_the_same_values() {
        let dense = array![[0.0, 1.0, 0.0], [0.5, 0.0, 0.25]];
        let sparse =
            SparseMatrix::new(3, vec![vec![(1, 1.0)], vec![(0, 0.5), (2, 0.25)]]).unwrap();
        let compressed = CompressedMatrix::from_dense(dense.view());

        let encodings = [
            GeneralMatrix::from(dense.clone()),
            GeneralMatrix::from(sparse),
            GeneralMatrix::from(compressed),
        ];

        for m in &encodings {
            assert_eq!(m.nrows(), 2, "{}", m.kind());
            assert_eq!(m.ncols(), 3, "{}", m.kind());
            assert_eq!(*m.to_dense(), dense, "{}", m.kind());
        }
    }

    #[test]
    fn full_matrices_are_not_copied_when_decoded() {
        let m = GeneralMatrix::from(array![[1.0, 2.0]]);
        assert!(matches!(m.to_dense(), Cow::Borrowed(_)));
    }
}

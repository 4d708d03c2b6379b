//! Compressed sparse row matrices of box-to-class relevance.

use crate::common::*;

/// A row-major compressed sparse matrix with `R32` values.
///
/// Row `i` owns the entries `indptr[i]..indptr[i + 1]` of `indices` and
/// `values`. Column indices are strictly increasing within a row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "CsrParts", into = "CsrParts")]
pub struct CsrMatrix {
    nrows: usize,
    ncols: usize,
    indptr: Vec<usize>,
    indices: Vec<usize>,
    values: Vec<R32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CsrParts {
    nrows: usize,
    ncols: usize,
    indptr: Vec<usize>,
    indices: Vec<usize>,
    values: Vec<R32>,
}

impl CsrMatrix {
    /// An all-zero matrix.
    pub fn zeros(nrows: usize, ncols: usize) -> Self {
        Self {
            nrows,
            ncols,
            indptr: vec![0; nrows + 1],
            indices: vec![],
            values: vec![],
        }
    }

    /// A matrix with a single 1.0 per row, at the column given for the row.
    pub fn one_hot(columns: &[usize], ncols: usize) -> Result<Self> {
        if let Some(&column) = columns.iter().find(|&&column| column >= ncols) {
            bail!("column {} is out of range for {} columns", column, ncols);
        }

        Ok(Self {
            nrows: columns.len(),
            ncols,
            indptr: (0..=columns.len()).collect(),
            indices: columns.to_vec(),
            values: vec![r32(1.0); columns.len()],
        })
    }

    pub fn from_parts(
        nrows: usize,
        ncols: usize,
        indptr: Vec<usize>,
        indices: Vec<usize>,
        values: Vec<R32>,
    ) -> Result<Self> {
        CsrParts {
            nrows,
            ncols,
            indptr,
            indices,
            values,
        }
        .try_into()
    }

    pub fn nrows(&self) -> usize {
        self.nrows
    }

    pub fn ncols(&self) -> usize {
        self.ncols
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.nrows, self.ncols)
    }

    /// The number of stored entries.
    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    /// Iterates over the stored (column, value) entries of a row.
    pub fn row(&self, row: usize) -> Option<impl Iterator<Item = (usize, R32)> + '_> {
        (row < self.nrows).then(|| {
            let range = self.indptr[row]..self.indptr[row + 1];
            self.indices[range.clone()]
                .iter()
                .copied()
                .zip(self.values[range].iter().copied())
        })
    }

    /// The value at (row, col). Returns `None` out of bounds.
    pub fn get(&self, row: usize, col: usize) -> Option<R32> {
        if col >= self.ncols {
            return None;
        }
        let value = self
            .row(row)?
            .find(|&(index, _)| index == col)
            .map(|(_, value)| value)
            .unwrap_or_else(|| r32(0.0));
        Some(value)
    }

    /// Stacks `other` below `self`.
    pub fn vstack(&self, other: &CsrMatrix) -> Result<Self> {
        ensure!(
            self.ncols == other.ncols,
            "cannot stack matrices with {} and {} columns",
            self.ncols,
            other.ncols
        );

        let offset = self.nnz();
        let indptr: Vec<_> = self
            .indptr
            .iter()
            .copied()
            .chain(other.indptr[1..].iter().map(|&ptr| ptr + offset))
            .collect();
        let indices: Vec<_> = self.indices.iter().chain(&other.indices).copied().collect();
        let values: Vec<_> = self.values.iter().chain(&other.values).copied().collect();

        Ok(Self {
            nrows: self.nrows + other.nrows,
            ncols: self.ncols,
            indptr,
            indices,
            values,
        })
    }

    /// Copies the leading `nrows` rows.
    pub fn head(&self, nrows: usize) -> Self {
        let nrows = nrows.min(self.nrows);
        let end = self.indptr[nrows];
        Self {
            nrows,
            ncols: self.ncols,
            indptr: self.indptr[..=nrows].to_vec(),
            indices: self.indices[..end].to_vec(),
            values: self.values[..end].to_vec(),
        }
    }

    pub fn to_dense(&self) -> Vec<Vec<f32>> {
        (0..self.nrows)
            .map(|row| {
                let mut dense = vec![0.0; self.ncols];
                let range = self.indptr[row]..self.indptr[row + 1];
                self.indices[range.clone()]
                    .iter()
                    .zip(&self.values[range])
                    .for_each(|(&col, value)| dense[col] = value.raw());
                dense
            })
            .collect()
    }
}

impl TryFrom<CsrParts> for CsrMatrix {
    type Error = Error;

    fn try_from(from: CsrParts) -> Result<Self, Self::Error> {
        let CsrParts {
            nrows,
            ncols,
            indptr,
            indices,
            values,
        } = from;

        let num_pointers = nrows
            .checked_add(1)
            .ok_or_else(|| format_err!("row count {} is too large", nrows))?;
        ensure!(
            indptr.len() == num_pointers,
            "expect {} row pointers, but found {}",
            num_pointers,
            indptr.len()
        );
        ensure!(indptr[0] == 0, "the first row pointer must be zero");
        ensure!(
            indptr.windows(2).all(|pair| pair[0] <= pair[1]),
            "row pointers must be non-decreasing"
        );
        ensure!(
            indices.len() == values.len() && indptr[nrows] == values.len(),
            "inconsistent number of stored entries"
        );
        for row in 0..nrows {
            let cols = &indices[indptr[row]..indptr[row + 1]];
            ensure!(
                cols.iter().all(|&col| col < ncols),
                "column index out of range in row {}",
                row
            );
            ensure!(
                cols.windows(2).all(|pair| pair[0] < pair[1]),
                "column indices are not increasing in row {}",
                row
            );
        }

        Ok(Self {
            nrows,
            ncols,
            indptr,
            indices,
            values,
        })
    }
}

impl From<CsrMatrix> for CsrParts {
    fn from(from: CsrMatrix) -> Self {
        let CsrMatrix {
            nrows,
            ncols,
            indptr,
            indices,
            values,
        } = from;
        Self {
            nrows,
            ncols,
            indptr,
            indices,
            values,
        }
    }
}

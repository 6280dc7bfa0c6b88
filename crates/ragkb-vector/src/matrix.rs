use ragkb_core::{Error, Result};

/// Dense row-major `rows x dim` matrix of `f32`, one row per chunk.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EmbeddingMatrix {
	rows: usize,
	dim: usize,
	data: Vec<f32>,
}

impl EmbeddingMatrix {
	pub fn new(dim: usize) -> Self { Self { rows: 0, dim, data: Vec::new() } }

	pub fn from_raw(data: Vec<f32>, rows: usize, dim: usize) -> Result<Self> {
		if rows.checked_mul(dim) != Some(data.len()) {
			return Err(Error::Operation(format!("{} values cannot form a {rows}x{dim} matrix", data.len())));
		}
		Ok(Self { rows, dim, data })
	}

	pub fn from_rows(rows: Vec<Vec<f32>>, dim: usize) -> Result<Self> {
		let mut m = Self::new(dim);
		for row in &rows { m.push_row(row)?; }
		Ok(m)
	}

	pub fn rows(&self) -> usize { self.rows }
	pub fn dim(&self) -> usize { self.dim }
	pub fn is_empty(&self) -> bool { self.rows == 0 }
	pub fn as_slice(&self) -> &[f32] { &self.data }

	pub fn row(&self, i: usize) -> Option<&[f32]> {
		(i < self.rows).then(|| &self.data[i * self.dim..(i + 1) * self.dim])
	}

	pub fn iter_rows(&self) -> impl Iterator<Item = &[f32]> + '_ {
		(0..self.rows).filter_map(move |i| self.row(i))
	}

	pub fn push_row(&mut self, row: &[f32]) -> Result<()> {
		if row.len() != self.dim {
			return Err(Error::DimensionMismatch { expected: self.dim, actual: row.len() });
		}
		self.data.extend_from_slice(row);
		self.rows += 1;
		Ok(())
	}

	pub fn extend(&mut self, other: &EmbeddingMatrix) -> Result<()> {
		if other.is_empty() { return Ok(()); }
		if other.dim != self.dim {
			return Err(Error::DimensionMismatch { expected: self.dim, actual: other.dim });
		}
		self.data.extend_from_slice(&other.data);
		self.rows += other.rows;
		Ok(())
	}
}

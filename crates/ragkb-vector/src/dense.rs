use ragkb_core::{Error, Result, SearchHit, SourceKind};

use crate::matrix::EmbeddingMatrix;

/// Brute-force cosine index over the corpus embedding matrix.
///
/// Row norms are cached at construction; a zero-norm row (or query) scores 0
/// against everything.
#[derive(Debug, Clone, Default)]
pub struct DenseIndex {
	matrix: EmbeddingMatrix,
	norms: Vec<f32>,
}

impl DenseIndex {
	pub fn new(matrix: EmbeddingMatrix) -> Self {
		let norms = matrix.iter_rows().map(l2_norm).collect();
		Self { matrix, norms }
	}

	pub fn len(&self) -> usize { self.matrix.rows() }
	pub fn is_empty(&self) -> bool { self.matrix.is_empty() }
	pub fn dim(&self) -> usize { self.matrix.dim() }
	pub fn matrix(&self) -> &EmbeddingMatrix { &self.matrix }

	/// Cosine similarity of `query` against every row, in corpus order.
	pub fn similarities(&self, query: &[f32]) -> Result<Vec<f32>> {
		if query.len() != self.dim() {
			return Err(Error::DimensionMismatch { expected: self.dim(), actual: query.len() });
		}
		let qn = l2_norm(query);
		Ok(self
			.matrix
			.iter_rows()
			.zip(&self.norms)
			.map(|(row, &rn)| if qn == 0.0 || rn == 0.0 { 0.0 } else { dot(row, query) / (qn * rn) })
			.collect())
	}

	/// Top `top_k` rows by cosine, best first. Every row is a candidate, so
	/// zero and negative scores are returned too; ties keep corpus order.
	pub fn search_vec(&self, query: &[f32], top_k: usize) -> Result<Vec<SearchHit>> {
		if self.is_empty() { return Ok(vec![]); }
		let scores = self.similarities(query)?;
		let mut hits: Vec<SearchHit> = scores
			.into_iter()
			.enumerate()
			.map(|(id, score)| SearchHit { id, score, source: SourceKind::Semantic })
			.collect();
		hits.sort_by(|a, b| b.score.total_cmp(&a.score));
		hits.truncate(top_k);
		Ok(hits)
	}

	/// Append rows for newly added chunks.
	pub fn append(&mut self, rows: &EmbeddingMatrix) -> Result<()> {
		self.matrix.extend(rows)?;
		self.norms.extend(rows.iter_rows().map(l2_norm));
		Ok(())
	}
}

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
	if a.len() != b.len() { return 0.0; }
	let (na, nb) = (l2_norm(a), l2_norm(b));
	if na == 0.0 || nb == 0.0 { 0.0 } else { dot(a, b) / (na * nb) }
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
	a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn l2_norm(v: &[f32]) -> f32 {
	v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

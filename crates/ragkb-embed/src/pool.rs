use anyhow::{bail, Result};
use candle_core::{DType, Tensor, D};

/// Sentence vectors from token states: average the positions where
/// `attention_mask` is 1, then scale each row to unit length.
///
/// `hidden` is `[batch, tokens, hidden]`, `attention_mask` is `[batch, tokens]`
/// of any numeric dtype. Returns `[batch, hidden]`.
pub fn masked_mean_l2(hidden: &Tensor, attention_mask: &Tensor) -> Result<Tensor> {
    let (batch, tokens, width) = match hidden.dims() {
        &[b, t, h] => (b, t, h),
        other => bail!("hidden states must be [batch, tokens, hidden], got {other:?}"),
    };
    if attention_mask.dims() != [batch, tokens] {
        bail!("attention mask {:?} does not match hidden states [{batch}, {tokens}, _]", attention_mask.dims());
    }

    let weights = attention_mask.to_device(hidden.device())?.to_dtype(hidden.dtype())?;
    let summed = hidden.broadcast_mul(&weights.unsqueeze(D::Minus1)?)?.sum(1)?;
    // rows with no attended tokens divide by 1 and stay zero
    let counts = weights.sum_keepdim(1)?.maximum(1f64)?;
    let mean = summed.broadcast_div(&counts)?;

    let eps = if hidden.dtype() == DType::F16 { 1e-6 } else { 1e-12 };
    let norms = (mean.sqr()?.sum_keepdim(1)?.sqrt()? + eps)?;
    let pooled = mean.broadcast_div(&norms)?;
    debug_assert_eq!(pooled.dims(), [batch, width]);
    Ok(pooled)
}

use anyhow::{bail, Result};
use candle_core::{DType, Tensor};

/// Mean of the token vectors selected by `attention_mask`, then L2-normalized.
///
/// `hidden` is `[batch, tokens, hidden]`, `attention_mask` is `[batch, tokens]`
/// with 1 for real tokens and 0 for padding. Returns `[batch, hidden]`.
pub fn masked_mean_l2(hidden: &Tensor, attention_mask: &Tensor) -> Result<Tensor> {
    let (batch, _tokens, width) = hidden.dims3()?;
    let mask = attention_mask.to_device(hidden.device())?.to_dtype(hidden.dtype())?;
    if mask.dims() != &hidden.dims()[..2] {
        bail!("attention mask shape {:?} does not match hidden states {:?}", mask.dims(), hidden.dims());
    }

    let summed = hidden.broadcast_mul(&mask.unsqueeze(2)?)?.sum(1)?;
    let counts = mask.sum_keepdim(1)?;
    let mean = summed.broadcast_div(&counts)?;

    let eps = match hidden.dtype() {
        DType::F16 | DType::BF16 => 1e-6f64,
        _ => 1e-12f64,
    };
    let norm = (mean.sqr()?.sum_keepdim(1)?.sqrt()? + eps)?;
    let pooled = mean.broadcast_div(&norm)?;
    debug_assert_eq!(pooled.dims(), &[batch, width]);
    Ok(pooled)
}

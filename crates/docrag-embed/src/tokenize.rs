use anyhow::{anyhow, Result};
use candle_core::{Device, Tensor};
use tokenizers::Tokenizer;

/// Token ids and attention mask for a batch, each `[batch, seq]`.
///
/// Every encoding is truncated to `max_len` and right-padded with `pad_id`
/// to the longest sequence in the batch.
pub fn tokenize_batch(
    tokenizer: &Tokenizer,
    texts: &[String],
    max_len: usize,
    pad_id: u32,
    device: &Device,
) -> Result<(Tensor, Tensor)> {
    let encodings = tokenizer
        .encode_batch(texts.to_vec(), true)
        .map_err(|e| anyhow!("Tokenization failed: {}", e))?;
    let seq = encodings.iter().map(|e| e.get_ids().len().min(max_len)).max().unwrap_or(0).max(1);

    let mut ids = Vec::with_capacity(texts.len() * seq);
    let mut mask = Vec::with_capacity(texts.len() * seq);
    for enc in &encodings {
        let n = enc.get_ids().len().min(max_len);
        ids.extend_from_slice(&enc.get_ids()[..n]);
        mask.extend_from_slice(&enc.get_attention_mask()[..n]);
        ids.extend(std::iter::repeat(pad_id).take(seq - n));
        mask.extend(std::iter::repeat(0u32).take(seq - n));
    }
    let input_ids = Tensor::from_vec(ids, (texts.len(), seq), device)?;
    let attention_mask = Tensor::from_vec(mask, (texts.len(), seq), device)?;
    Ok((input_ids, attention_mask))
}

use std::hash::Hasher;

use anyhow::Result;
use twox_hash::XxHash64;

use docrag_core::traits::Embedder;

/// Deterministic bag-of-words embedder: each lowercased token is hashed into
/// one of `dim` buckets, and the result is L2-normalized.
///
/// Needs no model files, so tests and offline development use it. Texts that
/// share words land close together, which is enough for retrieval tests.
pub struct HashEmbedder {
    dim: usize,
    id: String,
}

impl HashEmbedder {
    pub fn new(dim: usize) -> Self {
        Self { dim, id: format!("hash:xxh64:d{}", dim) }
    }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        if self.dim == 0 {
            return Vec::new();
        }
        let mut v = vec![0f32; self.dim];
        for token in text.split(|c: char| !c.is_alphanumeric()).filter(|t| !t.is_empty()) {
            let mut hasher = XxHash64::with_seed(0);
            hasher.write(token.to_lowercase().as_bytes());
            let h = hasher.finish();
            let idx = (h % self.dim as u64) as usize;
            // sign from a high bit keeps unrelated tokens from only ever adding up
            let sign = if (h >> 63) == 0 { 1.0 } else { -1.0 };
            v[idx] += sign;
        }
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt().max(1e-6);
        for x in &mut v {
            *x /= norm;
        }
        v
    }
}

impl Embedder for HashEmbedder {
    fn id(&self) -> &str {
        &self.id
    }

    fn dim(&self) -> usize {
        self.dim
    }

    fn max_len(&self) -> usize {
        usize::MAX
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn case_and_punctuation_do_not_matter() {
        let e = HashEmbedder::new(64);
        let v = e.embed_batch(&["Reflux, ratio!".to_string(), "reflux ratio".to_string()]).unwrap();
        assert_eq!(v[0], v[1]);
    }

    #[test]
    fn zero_dim_does_not_divide_by_zero() {
        let v = HashEmbedder::new(0).embed_batch(&["reflux".to_string()]).unwrap();
        assert_eq!(v, vec![Vec::<f32>::new()]);
    }

    #[test]
    fn empty_text_gives_zero_vector() {
        let e = HashEmbedder::new(8);
        let v = e.embed_batch(&[String::new()]).unwrap();
        assert!(v[0].iter().all(|x| *x == 0.0));
    }
}

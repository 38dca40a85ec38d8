//! ONNX Runtime sentence encoder for sentence-transformers exports.
//!
//! The model directory must contain `model.onnx` and `tokenizer.json`.
//! Graphs that emit token embeddings `[batch, seq, dim]` are mean-pooled under
//! the attention mask; graphs that already emit `[batch, dim]` are used as is.
//! Either way the result is L2-normalised.

use std::path::Path;
use std::sync::Mutex;

use answerbook_core::ResolveError;
use ort::session::Session;
use ort::value::Tensor;
use tokenizers::Tokenizer;
use tracing::info;

use crate::SentenceEncoder;

/// Truncation length for encoder input (MiniLM-style models).
const ENCODER_MAX_TOKENS: usize = 256;

/// Sentence embedding generator using ONNX Runtime.
pub struct Embedder {
    /// `Session::run` needs exclusive access.
    session: Mutex<Session>,
    tokenizer: Tokenizer,
    has_token_type_ids: bool,
    dim: usize,
}

impl Embedder {
    /// Load an embedding model from a directory containing `model.onnx` and `tokenizer.json`.
    pub fn load(model_dir: &Path) -> anyhow::Result<Self> {
        let model_path = model_dir.join("model.onnx");
        let tokenizer_path = model_dir.join("tokenizer.json");

        anyhow::ensure!(model_path.exists(), "model.onnx not found in {model_dir:?}");
        anyhow::ensure!(
            tokenizer_path.exists(),
            "tokenizer.json not found in {model_dir:?}"
        );

        let session = Session::builder()?.commit_from_file(&model_path)?;

        let dim = infer_dim(session.outputs()[0].dtype())
            .ok_or_else(|| anyhow::anyhow!("cannot infer embedding dimension of {model_path:?}"))?;
        let has_token_type_ids = session
            .inputs()
            .iter()
            .any(|input| input.name() == "token_type_ids");

        let mut tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow::anyhow!("load tokenizer: {e}"))?;

        tokenizer
            .with_truncation(Some(tokenizers::TruncationParams {
                max_length: ENCODER_MAX_TOKENS,
                ..Default::default()
            }))
            .map_err(|e| anyhow::anyhow!("set truncation: {e}"))?;

        // Pad every input in a batch to the longest one.
        tokenizer.with_padding(Some(tokenizers::PaddingParams::default()));

        info!(dim, model = %model_path.display(), "loaded sentence encoder");
        Ok(Self {
            session: Mutex::new(session),
            tokenizer,
            has_token_type_ids,
            dim,
        })
    }

    /// Embed a batch of texts, returning one normalized vector per input.
    pub fn embed_batch(&self, texts: &[&str]) -> anyhow::Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        let batch_size = texts.len();

        let encodings = self
            .tokenizer
            .encode_batch(texts.to_vec(), true)
            .map_err(|e| anyhow::anyhow!("tokenize: {e}"))?;

        let seq_len = encodings
            .iter()
            .map(|e| e.get_ids().len())
            .max()
            .unwrap_or(0);

        // Flat input tensors: [batch_size, seq_len].
        let mut input_ids = vec![0i64; batch_size * seq_len];
        let mut attention_mask = vec![0i64; batch_size * seq_len];
        let mut token_type_ids = vec![0i64; batch_size * seq_len];

        for (i, encoding) in encodings.iter().enumerate() {
            let offset = i * seq_len;
            for (j, &id) in encoding.get_ids().iter().enumerate() {
                input_ids[offset + j] = id as i64;
            }
            for (j, &mask) in encoding.get_attention_mask().iter().enumerate() {
                attention_mask[offset + j] = mask as i64;
            }
            for (j, &tid) in encoding.get_type_ids().iter().enumerate() {
                token_type_ids[offset + j] = tid as i64;
            }
        }

        let shape = [batch_size as i64, seq_len as i64];

        let ids_tensor = Tensor::from_array((shape, input_ids.into_boxed_slice()))?;
        let mask_tensor = Tensor::from_array((shape, attention_mask.clone().into_boxed_slice()))?;

        let mut inputs = ort::inputs![
            "input_ids" => ids_tensor,
            "attention_mask" => mask_tensor,
        ];
        if self.has_token_type_ids {
            let type_tensor = Tensor::from_array((shape, token_type_ids.into_boxed_slice()))?;
            inputs.push(("token_type_ids".into(), type_tensor.into()));
        }

        let mut session = self
            .session
            .lock()
            .map_err(|_| anyhow::anyhow!("encoder session lock poisoned"))?;
        let outputs = session.run(inputs)?;

        let (output_shape, output_data) = outputs[0].try_extract_tensor::<f32>()?;
        let dims: &[i64] = output_shape;

        let mut embeddings = Vec::with_capacity(batch_size);
        match dims {
            // Already pooled: [batch_size, dim].
            [b, d] if *b as usize == batch_size && *d as usize == self.dim => {
                for row in output_data.chunks(self.dim) {
                    let mut v = row.to_vec();
                    normalize(&mut v);
                    embeddings.push(v);
                }
            }
            // Token embeddings: [batch_size, seq_len, dim].
            [b, s, d] if *b as usize == batch_size && *d as usize == self.dim => {
                let actual_seq_len = *s as usize;
                for i in 0..batch_size {
                    let mut pooled = vec![0.0f32; self.dim];
                    let mut token_count = 0.0f32;

                    for j in 0..actual_seq_len.min(seq_len) {
                        let mask_val = attention_mask[i * seq_len + j] as f32;
                        if mask_val > 0.0 {
                            let offset = (i * actual_seq_len + j) * self.dim;
                            for (d, p) in pooled.iter_mut().enumerate() {
                                *p += output_data[offset + d] * mask_val;
                            }
                            token_count += mask_val;
                        }
                    }

                    if token_count > 0.0 {
                        for p in &mut pooled {
                            *p /= token_count;
                        }
                    }
                    normalize(&mut pooled);
                    embeddings.push(pooled);
                }
            }
            _ => anyhow::bail!(
                "unexpected output shape: {dims:?}, expected [{batch_size}, {}] or [{batch_size}, seq, {}]",
                self.dim,
                self.dim
            ),
        }

        Ok(embeddings)
    }
}

impl SentenceEncoder for Embedder {
    fn dim(&self) -> usize {
        self.dim
    }

    fn encode(&self, text: &str) -> Result<Vec<f32>, ResolveError> {
        self.embed_batch(&[text])
            .map_err(|e| ResolveError::inference(format!("{e:#}")))?
            .pop()
            .ok_or_else(|| ResolveError::inference("encoder returned no embedding"))
    }
}

/// L2-normalize a vector in place.
fn normalize(v: &mut [f32]) {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}

/// Last static dimension of a tensor output, if known.
pub(crate) fn infer_dim(output_type: &ort::value::ValueType) -> Option<usize> {
    match output_type {
        ort::value::ValueType::Tensor { shape, .. } => shape
            .last()
            .and_then(|&d| if d > 0 { Some(d as usize) } else { None }),
        _ => None,
    }
}

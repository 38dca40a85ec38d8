//! ONNX Runtime sequence classifier (BERT-style `...ForSequenceClassification` exports).
//!
//! The model directory must contain `model.onnx` and `tokenizer.json`. Input
//! is always exactly `max_length` tokens: longer text is truncated, shorter
//! text padded. The first graph output must be logits of shape `[1, classes]`.

use std::path::Path;
use std::sync::Mutex;

use answerbook_core::ResolveError;
use ort::session::Session;
use ort::value::Tensor;
use tokenizers::{PaddingStrategy, Tokenizer, TruncationParams};
use tracing::info;

use crate::SequenceClassifier;
use crate::embedder::infer_dim;

pub struct OnnxClassifier {
    session: Mutex<Session>,
    tokenizer: Tokenizer,
    has_token_type_ids: bool,
    num_classes: Option<usize>,
    max_length: usize,
}

impl OnnxClassifier {
    /// Load a classifier, fixing its tokenizer to `max_length` tokens.
    pub fn load(model_dir: &Path, max_length: usize) -> anyhow::Result<Self> {
        anyhow::ensure!(max_length > 0, "max_length must be at least 1");

        let model_path = model_dir.join("model.onnx");
        let tokenizer_path = model_dir.join("tokenizer.json");

        anyhow::ensure!(model_path.exists(), "model.onnx not found in {model_dir:?}");
        anyhow::ensure!(
            tokenizer_path.exists(),
            "tokenizer.json not found in {model_dir:?}"
        );

        let session = Session::builder()?.commit_from_file(&model_path)?;
        let num_classes = infer_dim(session.outputs()[0].dtype());
        let has_token_type_ids = session
            .inputs()
            .iter()
            .any(|input| input.name() == "token_type_ids");

        let mut tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow::anyhow!("load tokenizer: {e}"))?;

        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length,
                ..Default::default()
            }))
            .map_err(|e| anyhow::anyhow!("set truncation: {e}"))?;

        // Keep the tokenizer's own pad token, but always pad to max_length.
        let mut padding = tokenizer.get_padding().cloned().unwrap_or_default();
        padding.strategy = PaddingStrategy::Fixed(max_length);
        tokenizer.with_padding(Some(padding));

        info!(
            classes = num_classes,
            max_length,
            model = %model_path.display(),
            "loaded sequence classifier"
        );
        Ok(Self {
            session: Mutex::new(session),
            tokenizer,
            has_token_type_ids,
            num_classes,
            max_length,
        })
    }

    fn run(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| anyhow::anyhow!("tokenize: {e}"))?;

        let to_i64 = |values: &[u32]| -> Box<[i64]> { values.iter().map(|&v| v as i64).collect() };
        let seq_len = encoding.get_ids().len();
        anyhow::ensure!(
            seq_len == self.max_length,
            "tokenizer produced {seq_len} tokens, expected {}",
            self.max_length
        );

        let shape = [1i64, seq_len as i64];
        let ids_tensor = Tensor::from_array((shape, to_i64(encoding.get_ids())))?;
        let mask_tensor = Tensor::from_array((shape, to_i64(encoding.get_attention_mask())))?;

        let mut inputs = ort::inputs![
            "input_ids" => ids_tensor,
            "attention_mask" => mask_tensor,
        ];
        if self.has_token_type_ids {
            let type_tensor = Tensor::from_array((shape, to_i64(encoding.get_type_ids())))?;
            inputs.push(("token_type_ids".into(), type_tensor.into()));
        }

        let mut session = self
            .session
            .lock()
            .map_err(|_| anyhow::anyhow!("classifier session lock poisoned"))?;
        let outputs = session.run(inputs)?;

        let (output_shape, logits) = outputs[0].try_extract_tensor::<f32>()?;
        let dims: &[i64] = output_shape;
        anyhow::ensure!(
            dims.len() == 2 && dims[0] == 1 && dims[1] as usize == logits.len(),
            "unexpected logits shape: {dims:?}, expected [1, classes]"
        );

        Ok(logits.to_vec())
    }
}

impl SequenceClassifier for OnnxClassifier {
    fn num_classes(&self) -> Option<usize> {
        self.num_classes
    }

    fn max_length(&self) -> Option<usize> {
        Some(self.max_length)
    }

    fn logits(&self, text: &str) -> Result<Vec<f32>, ResolveError> {
        self.run(text)
            .map_err(|e| ResolveError::inference(format!("{e:#}")))
    }
}

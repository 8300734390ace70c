use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum TokenizerError {
    #[error("No tokenizer available for model {model}: {reason}")]
    UnknownModel { model: String, reason: String },

    #[error("Tokenizer failed to encode text: {0}")]
    Encode(String),
}

/// Encodes text into model tokens.
pub trait Encoder: Send + Sync {
    fn count_tokens(&self, text: &str) -> Result<usize, TokenizerError>;
}

/// Resolves the encoder for a model identifier.
pub trait TokenizerLookup: Send + Sync {
    fn encoder_for(&self, model: &str) -> Result<Box<dyn Encoder>, TokenizerError>;
}

/// [`TokenizerLookup`] backed by the OpenAI BPE tables bundled with `tiktoken-rs`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TiktokenLookup;

impl TokenizerLookup for TiktokenLookup {
    fn encoder_for(&self, model: &str) -> Result<Box<dyn Encoder>, TokenizerError> {
        let bpe = tiktoken_rs::get_bpe_from_model(model).map_err(|e| {
            TokenizerError::UnknownModel {
                model: model.to_string(),
                reason: e.to_string(),
            }
        })?;
        Ok(Box::new(TiktokenEncoder(bpe)))
    }
}

struct TiktokenEncoder(tiktoken_rs::CoreBPE);

impl Encoder for TiktokenEncoder {
    fn count_tokens(&self, text: &str) -> Result<usize, TokenizerError> {
        Ok(self.0.encode_with_special_tokens(text).len())
    }
}

/// Estimates token counts for one model. Never fails: without a known BPE
/// tokenizer the estimate is one token per four characters.
pub struct TokenEstimator {
    model: String,
    encoder: Option<Box<dyn Encoder>>,
}

impl TokenEstimator {
    /// Resolve the model's encoder once. A failed lookup is logged and the
    /// estimator falls back to the character heuristic for its lifetime.
    pub fn new(lookup: &dyn TokenizerLookup, model: &str) -> Self {
        let encoder = match lookup.encoder_for(model) {
            Ok(encoder) => Some(encoder),
            Err(e) => {
                warn!(error = %e, "falling back to character-based token estimate");
                None
            }
        };
        Self {
            model: model.to_string(),
            encoder,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn estimate(&self, text: &str) -> usize {
        match &self.encoder {
            Some(encoder) => encoder.count_tokens(text).unwrap_or_else(|e| {
                debug!(error = %e, "encode failed, using character estimate");
                char_estimate(text)
            }),
            None => char_estimate(text),
        }
    }
}

/// `ceil(chars / 4)`
fn char_estimate(text: &str) -> usize {
    text.chars().count().div_ceil(4)
}

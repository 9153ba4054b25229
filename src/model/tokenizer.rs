use std::io;
use std::path::Path;
use tokenizers::{PaddingParams, PaddingStrategy, Tokenizer, TruncationParams};

/// Reads `tokenizer.json` from a model directory.
pub fn load_tokenizer(model_dir: &Path) -> io::Result<Tokenizer> {
    Tokenizer::from_file(model_dir.join("tokenizer.json")).map_err(io::Error::other)
}

/// Loads a tokenizer that truncates inputs to `max_len` tokens and pads each batch to its
/// longest member. Used for both query-document pairs and single texts.
pub fn load_batch_tokenizer(model_dir: &Path, max_len: usize) -> io::Result<Tokenizer> {
    let mut tokenizer = load_tokenizer(model_dir)?;

    let truncation = TruncationParams {
        max_length: max_len,
        ..Default::default()
    };
    tokenizer
        .with_truncation(Some(truncation))
        .map_err(|e| io::Error::other(format!("Failed to configure truncation: {}", e)))?;

    let (pad_token, pad_id) = ["[PAD]", "<pad>"]
        .iter()
        .find_map(|token| tokenizer.token_to_id(token).map(|id| (token.to_string(), id)))
        .unwrap_or_else(|| ("[PAD]".to_string(), 0));
    let padding = PaddingParams {
        strategy: PaddingStrategy::BatchLongest,
        pad_id,
        pad_token,
        ..Default::default()
    };
    tokenizer.with_padding(Some(padding));

    Ok(tokenizer)
}

//! In-process embedding backend via `fastembed` (ONNX runtime).

use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};

use super::EmbeddingBackend;
use crate::error::ServiceError;

pub struct FastembedBackend {
    model: TextEmbedding,
    dimension: usize,
}

/// Map a sentence-transformers style identifier onto a fastembed model.
fn model_for(name: &str) -> Result<EmbeddingModel, ServiceError> {
    match name {
        "all-MiniLM-L6-v2" | "sentence-transformers/all-MiniLM-L6-v2" => {
            Ok(EmbeddingModel::AllMiniLML6V2)
        }
        "all-MiniLM-L12-v2" | "sentence-transformers/all-MiniLM-L12-v2" => {
            Ok(EmbeddingModel::AllMiniLML12V2)
        }
        "BAAI/bge-small-en-v1.5" => Ok(EmbeddingModel::BGESmallENV15),
        "BAAI/bge-base-en-v1.5" => Ok(EmbeddingModel::BGEBaseENV15),
        other => Err(ServiceError::ServiceUnavailable(format!(
            "unsupported embedding model '{other}'"
        ))),
    }
}

/// Load the embedding model named by the service configuration.
pub fn load(name: &str) -> Result<Box<dyn EmbeddingBackend>, ServiceError> {
    let model_kind = model_for(name)?;
    let dimension = TextEmbedding::get_model_info(&model_kind)
        .map_err(|e| ServiceError::ServiceUnavailable(format!("unknown model info: {e}")))?
        .dim;

    tracing::info!(model = name, dimension, "Loading embedding model");
    let model = TextEmbedding::try_new(InitOptions::new(model_kind)).map_err(|e| {
        ServiceError::ServiceUnavailable(format!("failed to load embedding model: {e}"))
    })?;
    tracing::info!("Embedding model loaded");

    Ok(Box::new(FastembedBackend { model, dimension }))
}

fn l2_normalize(vector: &mut [f32]) {
    let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        for v in vector.iter_mut() {
            *v /= norm;
        }
    }
}

impl EmbeddingBackend for FastembedBackend {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn encode(
        &mut self,
        texts: &[String],
        normalize: bool,
    ) -> Result<Vec<Vec<f32>>, ServiceError> {
        let mut embeddings = self
            .model
            .embed(texts.to_vec(), None)
            .map_err(|e| ServiceError::EncodingFailed(format!("{e}")))?;
        if normalize {
            for vector in &mut embeddings {
                l2_normalize(vector);
            }
        }
        Ok(embeddings)
    }
}

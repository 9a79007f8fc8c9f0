//! Embedding executor with bounded concurrency and dimension checks.

use std::{future::Future, pin::Pin};

use crate::{embed::EmbeddingsProvider, errors::RagError};
use futures::stream::{self, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info};

type EmbedJob<'a> = Pin<Box<dyn Future<Output = Result<(usize, Vec<f32>), RagError>> + Send + 'a>>;

/// Embeds `texts`, returning vectors in input order.
///
/// - `expected_dim`: if `Some`, every vector must have this length.
/// - `concurrency`: maximum number of in-flight embedding calls.
///
/// The first failing call aborts the whole batch.
pub async fn embed_all(
    texts: &[&str],
    provider: &dyn EmbeddingsProvider,
    expected_dim: Option<usize>,
    concurrency: usize,
    progress: bool,
) -> Result<Vec<Vec<f32>>, RagError> {
    info!(total = texts.len(), concurrency, "embedding chunks");
    if texts.is_empty() {
        return Ok(Vec::new());
    }

    let pb = if progress {
        let pb = ProgressBar::new(texts.len() as u64);
        if let Ok(style) = ProgressStyle::with_template(
            "{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} ({eta})",
        ) {
            pb.set_style(style.progress_chars("##-"));
        }
        pb
    } else {
        ProgressBar::hidden()
    };

    let pb_ref = &pb;
    let jobs: Vec<EmbedJob<'_>> = texts
        .iter()
        .copied()
        .enumerate()
        .map(|(i, text)| -> EmbedJob<'_> {
            Box::pin(async move {
                let v = provider.embed(text).await?;
                pb_ref.inc(1);
                Ok((i, v))
            })
        })
        .collect();

    let mut results: Vec<(usize, Vec<f32>)> = stream::iter(jobs)
        .buffer_unordered(concurrency.max(1))
        .collect::<Vec<_>>()
        .await
        .into_iter()
        .collect::<Result<Vec<_>, RagError>>()?;

    results.sort_by_key(|(i, _)| *i);

    let want = expected_dim.unwrap_or(results[0].1.len());
    for (_, v) in &results {
        if v.len() != want || v.is_empty() {
            return Err(RagError::EmbeddingShape { got: v.len(), want });
        }
    }

    pb.finish_and_clear();
    debug!(dim = want, "embeddings filled");
    Ok(results.into_iter().map(|(_, v)| v).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{future::Future, pin::Pin};

    struct LenEmbedder;

    impl EmbeddingsProvider for LenEmbedder {
        fn embed<'a>(
            &'a self,
            text: &'a str,
        ) -> Pin<Box<dyn Future<Output = Result<Vec<f32>, RagError>> + Send + 'a>> {
            Box::pin(async move {
                // later inputs finish first
                tokio::time::sleep(std::time::Duration::from_millis(
                    20u64.saturating_sub(text.len() as u64),
                ))
                .await;
                Ok(vec![text.len() as f32, 1.0])
            })
        }
    }

    #[tokio::test]
    async fn keeps_input_order_under_concurrency() {
        let texts = ["a", "bb", "ccc", "dddd"];
        let out = embed_all(&texts, &LenEmbedder, Some(2), 4, false)
            .await
            .unwrap();
        let firsts: Vec<f32> = out.iter().map(|v| v[0]).collect();
        assert_eq!(firsts, vec![1.0, 2.0, 3.0, 4.0]);
    }

    #[tokio::test]
    async fn rejects_wrong_dimension() {
        let err = embed_all(&["a"], &LenEmbedder, Some(3), 1, false)
            .await
            .unwrap_err();
        assert!(matches!(err, RagError::EmbeddingShape { got: 2, want: 3 }));
        assert!(err.is_upstream());
    }
}

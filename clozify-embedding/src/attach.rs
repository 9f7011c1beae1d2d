//! Attach an embedding column to a table
//!
//! One provider request per row, spaced by the rate limiter and retried by
//! the retry policy. A row whose embedding cannot be obtained gets a `Null`
//! cell and a [`RowFailure`]; the rest of the batch carries on.

use std::sync::Arc;

use clozify_core::{
    embedding_column, EmbeddingVector, RetryPolicy, Table, Value, CLOZE_COL, WORD_COL,
};
use tracing::{debug, info, instrument, warn};

use crate::{
    cache::EmbeddingCache,
    error::{EmbeddingError, Result},
    provider::EmbeddingProvider,
    rate_limiter::RateLimiter,
};

/// A row whose embedding could not be produced
#[derive(Debug, Clone, PartialEq)]
pub struct RowFailure {
    pub row: usize,
    pub text: Option<String>,
    pub reason: String,
}

/// Result of an attachment run
#[derive(Debug, Clone)]
pub struct AttachOutcome {
    /// Copy of the input with the `<column>_embedding` column added
    pub table: Table,
    /// Name of the new embedding column
    pub column: String,
    pub failures: Vec<RowFailure>,
    pub cache_hits: usize,
    pub requests: usize,
}

impl AttachOutcome {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Adds embedding columns to tables using an [`EmbeddingProvider`]
pub struct EmbeddingAttacher<P> {
    provider: P,
    retry: RetryPolicy,
    rate_limiter: Option<Arc<RateLimiter>>,
    cache: Option<EmbeddingCache>,
}

impl<P: EmbeddingProvider> EmbeddingAttacher<P> {
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            retry: RetryPolicy::default(),
            rate_limiter: None,
            cache: None,
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_rate_limiter(mut self, rate_limiter: Arc<RateLimiter>) -> Self {
        self.rate_limiter = Some(rate_limiter);
        self
    }

    pub fn with_cache(mut self, cache: EmbeddingCache) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn cache(&self) -> Option<&EmbeddingCache> {
        self.cache.as_ref()
    }

    /// Pick the column to embed
    ///
    /// An explicit column wins; otherwise `word`, then `cloze`.
    pub fn select_text_column(table: &Table, text_column: Option<&str>) -> Result<String> {
        match text_column {
            Some(column) => {
                table.require_column(column)?;
                Ok(column.to_string())
            }
            None if table.has_column(WORD_COL) => Ok(WORD_COL.to_string()),
            None if table.has_column(CLOZE_COL) => Ok(CLOZE_COL.to_string()),
            None => Err(EmbeddingError::Config(format!(
                "no text column given and table '{}' has neither a '{}' nor a '{}' column",
                table.name(),
                WORD_COL,
                CLOZE_COL
            ))),
        }
    }

    /// Return a copy of `table` with an embedding column for `text_column`
    ///
    /// Issues up to one provider request per row (fewer with a warm cache).
    /// Output rows are in input order.
    #[instrument(skip(self, table), fields(table = table.name(), rows = table.len()))]
    pub async fn attach_embeddings(
        &self,
        table: &Table,
        text_column: Option<&str>,
    ) -> Result<AttachOutcome> {
        let column = Self::select_text_column(table, text_column)?;
        let output_column = embedding_column(&column);
        let texts = table.require_column(&column)?;
        info!(
            "Embedding {} rows of column '{}' with model {}",
            texts.len(),
            column,
            self.provider.model()
        );

        let mut embeddings = Vec::with_capacity(texts.len());
        let mut failures = Vec::new();
        let mut cache_hits = 0;
        let mut requests = 0;

        for (row, value) in texts.iter().enumerate() {
            let Some(text) = value.as_text() else {
                warn!("Row {} has no text to embed", row);
                failures.push(RowFailure {
                    row,
                    text: None,
                    reason: "empty text".to_string(),
                });
                embeddings.push(Value::Null);
                continue;
            };

            if let Some(cached) = self.cached(&text) {
                debug!("Cache hit for row {}", row);
                cache_hits += 1;
                embeddings.push(Value::Vector(cached));
                continue;
            }

            requests += 1;
            match self.fetch(&text).await {
                Ok(embedding) => {
                    debug!("Got embedding for row {} ({})", row, text);
                    self.store(&text, &embedding);
                    embeddings.push(Value::Vector(embedding));
                }
                Err(e) => {
                    warn!("Could not retrieve embedding for row {} ({}): {}", row, text, e);
                    failures.push(RowFailure {
                        row,
                        text: Some(text.into_owned()),
                        reason: e.to_string(),
                    });
                    embeddings.push(Value::Null);
                }
            }
        }

        let mut output = table.clone();
        output.insert_column(output_column.as_str(), embeddings)?;

        info!(
            "Got {} embeddings ({} cached, {} requests, {} failed)",
            output.len() - failures.len(),
            cache_hits,
            requests,
            failures.len()
        );

        Ok(AttachOutcome {
            table: output,
            column: output_column,
            failures,
            cache_hits,
            requests,
        })
    }

    async fn fetch(&self, text: &str) -> Result<EmbeddingVector> {
        let label = format!("embedding '{}'", text);
        self.retry
            .run(&label, || async {
                if let Some(limiter) = &self.rate_limiter {
                    limiter.acquire().await;
                }
                self.provider.embed(text).await
            })
            .await
    }

    fn cached(&self, text: &str) -> Option<EmbeddingVector> {
        let cache = self.cache.as_ref()?;
        match cache.get(self.provider.model(), text) {
            Ok(hit) => hit,
            Err(e) => {
                warn!("Embedding cache lookup failed: {}", e);
                None
            }
        }
    }

    fn store(&self, text: &str, embedding: &[f32]) {
        if let Some(cache) = &self.cache {
            if let Err(e) = cache.put(self.provider.model(), text, embedding) {
                warn!("Failed to cache embedding: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    /// Provider answering from a fixed map; texts listed in `rate_limited`
    /// fail that many times before succeeding
    struct FakeProvider {
        vectors: HashMap<String, EmbeddingVector>,
        rate_limited: HashMap<String, usize>,
        calls: AtomicUsize,
        attempts: parking_lot::Mutex<HashMap<String, usize>>,
    }

    impl FakeProvider {
        fn new(entries: &[(&str, Vec<f32>)]) -> Self {
            Self {
                vectors: entries
                    .iter()
                    .map(|(text, v)| (text.to_string(), v.clone()))
                    .collect(),
                rate_limited: HashMap::new(),
                calls: AtomicUsize::new(0),
                attempts: parking_lot::Mutex::new(HashMap::new()),
            }
        }

        fn rate_limit(mut self, text: &str, times: usize) -> Self {
            self.rate_limited.insert(text.to_string(), times);
            self
        }
    }

    #[async_trait]
    impl EmbeddingProvider for FakeProvider {
        async fn embed(&self, text: &str) -> Result<EmbeddingVector> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let attempt = {
                let mut attempts = self.attempts.lock();
                let n = attempts.entry(text.to_string()).or_insert(0);
                *n += 1;
                *n
            };
            if attempt <= self.rate_limited.get(text).copied().unwrap_or(0) {
                return Err(EmbeddingError::RateLimited("slow down".to_string()));
            }
            self.vectors
                .get(text)
                .cloned()
                .ok_or(EmbeddingError::EmptyResponse)
        }

        fn model(&self) -> &str {
            "fake"
        }
    }

    fn table(column: &str, texts: &[&str]) -> Table {
        Table::new("input")
            .with_column(column, texts.iter().map(|t| Value::from(*t)).collect())
            .unwrap()
    }

    fn attacher(provider: FakeProvider) -> EmbeddingAttacher<FakeProvider> {
        EmbeddingAttacher::new(provider).with_retry_policy(RetryPolicy::immediate(6))
    }

    #[tokio::test]
    async fn test_attach_selects_default_columns() {
        let provider = || FakeProvider::new(&[("Input str", vec![0.1, 0.2])]);
        for column in [WORD_COL, CLOZE_COL] {
            let input = table(column, &["Input str"]);
            let outcome = attacher(provider()).attach_embeddings(&input, None).await.unwrap();

            let expected = input
                .clone()
                .with_column(
                    format!("{column}_embedding"),
                    vec![Value::Vector(vec![0.1, 0.2])],
                )
                .unwrap();
            assert_eq!(outcome.table, expected);
            assert!(outcome.is_complete());
        }
    }

    #[tokio::test]
    async fn test_attach_custom_column() {
        let input = table("custom_input", &["Input str"]);
        let outcome = attacher(FakeProvider::new(&[("Input str", vec![1.0])]))
            .attach_embeddings(&input, Some("custom_input"))
            .await
            .unwrap();

        assert_eq!(outcome.column, "custom_input_embedding");
        assert_eq!(
            outcome.table.get("custom_input_embedding", 0),
            Some(&Value::Vector(vec![1.0]))
        );
    }

    #[tokio::test]
    async fn test_attach_prefers_word_over_cloze() {
        let input = table(WORD_COL, &["a"])
            .with_column(CLOZE_COL, vec!["b".into()])
            .unwrap();
        let outcome = attacher(FakeProvider::new(&[("a", vec![1.0]), ("b", vec![2.0])]))
            .attach_embeddings(&input, None)
            .await
            .unwrap();

        assert_eq!(outcome.column, "word_embedding");
    }

    #[tokio::test]
    async fn test_attach_without_default_column_is_config_error() {
        let input = table("input_col", &["Input str"]);
        let err = attacher(FakeProvider::new(&[]))
            .attach_embeddings(&input, None)
            .await
            .unwrap_err();

        assert!(matches!(err, EmbeddingError::Config(_)));
        let message = err.to_string();
        assert!(message.contains("'word'") && message.contains("'cloze'"), "{message}");
    }

    #[tokio::test]
    async fn test_attach_missing_explicit_column() {
        let input = table(WORD_COL, &["a"]);
        let err = attacher(FakeProvider::new(&[]))
            .attach_embeddings(&input, Some("nope"))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            EmbeddingError::Table(clozify_core::ClozifyError::MissingColumn { .. })
        ));
    }

    #[tokio::test]
    async fn test_attach_retries_rate_limits() {
        let provider = FakeProvider::new(&[("a", vec![1.0])]).rate_limit("a", 2);
        let attacher = attacher(provider);
        let outcome = attacher
            .attach_embeddings(&table(WORD_COL, &["a"]), None)
            .await
            .unwrap();

        assert!(outcome.is_complete());
        assert_eq!(attacher.provider.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_attach_continues_after_row_failure() {
        let provider = FakeProvider::new(&[("a", vec![1.0]), ("c", vec![3.0])])
            .rate_limit("b", 100);
        let input = table(WORD_COL, &["a", "b", "c"]);
        let outcome = attacher(provider)
            .attach_embeddings(&input, None)
            .await
            .unwrap();

        let embeddings = outcome.table.column("word_embedding").unwrap();
        assert_eq!(
            embeddings,
            &[Value::Vector(vec![1.0]), Value::Null, Value::Vector(vec![3.0])]
        );
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].row, 1);
        assert_eq!(outcome.failures[0].text.as_deref(), Some("b"));
    }

    #[tokio::test]
    async fn test_attach_does_not_mutate_input() {
        let input = table(WORD_COL, &["a"]);
        let before = input.clone();
        attacher(FakeProvider::new(&[("a", vec![1.0])]))
            .attach_embeddings(&input, None)
            .await
            .unwrap();

        assert_eq!(input, before);
    }

    #[tokio::test]
    async fn test_attach_null_cell_is_row_failure() {
        let input = Table::new("input")
            .with_column(WORD_COL, vec![Value::Null, "a".into()])
            .unwrap();
        let attacher = attacher(FakeProvider::new(&[("a", vec![1.0])]));
        let outcome = attacher.attach_embeddings(&input, None).await.unwrap();

        assert_eq!(outcome.failures[0].reason, "empty text");
        assert_eq!(attacher.provider.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_attach_uses_cache() {
        let cache = EmbeddingCache::new_in_memory().unwrap();
        cache.put("fake", "a", &[9.0]).unwrap();
        let attacher = attacher(FakeProvider::new(&[("a", vec![1.0]), ("b", vec![2.0])]))
            .with_cache(cache);

        let outcome = attacher
            .attach_embeddings(&table(WORD_COL, &["a", "b", "b"]), None)
            .await
            .unwrap();

        assert_eq!(outcome.cache_hits, 2);
        assert_eq!(outcome.requests, 1);
        assert_eq!(
            outcome.table.get("word_embedding", 0),
            Some(&Value::Vector(vec![9.0]))
        );
        assert_eq!(attacher.provider.calls.load(Ordering::SeqCst), 1);
    }
}

use std::collections::HashMap;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use super::{
    build_system_prompt, build_user_payload, parse_translation_response, TranslationService,
};
use crate::config::TranslationConfig;
use crate::dictionary::{build_context, Dictionary};
use crate::error::PacklingoError;

/// Result of a batch translation pass. A cancelled outcome still carries
/// everything translated before the signal arrived, so the driver can
/// persist a best-effort checkpoint.
#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub translated: HashMap<String, String>,
    pub cancelled: bool,
}

enum BatchAttempt {
    Translated(HashMap<String, String>),
    Exhausted,
    Cancelled,
}

/// Splits entries into bounded batches, submits each to the translation
/// service with a dictionary context excerpt, and retries transient
/// failures with capped exponential backoff. An exhausted batch is
/// skipped, never fatal: its entries fall back to the original text at
/// merge time.
pub struct BatchTranslator {
    service: Box<dyn TranslationService>,
    target_lang: String,
    batch_size: usize,
    batch_delay: Duration,
    context_limit: usize,
    max_retries: u32,
}

impl BatchTranslator {
    pub fn new(
        service: Box<dyn TranslationService>,
        translation: &TranslationConfig,
        max_retries: u32,
    ) -> Self {
        Self {
            service,
            target_lang: translation.target_lang.clone(),
            batch_size: translation.batch_size.max(1),
            batch_delay: Duration::from_millis(translation.batch_delay_ms),
            context_limit: translation.context_limit,
            max_retries: max_retries.max(1),
        }
    }

    pub async fn translate(
        &self,
        entries: &[(String, String)],
        dict: &Dictionary,
        cancel: &CancellationToken,
    ) -> BatchOutcome {
        let mut outcome = BatchOutcome::default();
        if entries.is_empty() {
            return outcome;
        }

        let total_batches = entries.len().div_ceil(self.batch_size);
        for (idx, batch) in entries.chunks(self.batch_size).enumerate() {
            if cancel.is_cancelled() {
                outcome.cancelled = true;
                return outcome;
            }

            info!(
                "Translating batch {}/{} ({} entries)",
                idx + 1,
                total_batches,
                batch.len()
            );

            let dict_context = build_context(batch, dict, self.context_limit);
            let system_prompt = build_system_prompt(&self.target_lang, &dict_context);
            let user_payload = build_user_payload(batch);

            match self
                .translate_batch(&system_prompt, &user_payload, cancel)
                .await
            {
                BatchAttempt::Translated(map) => {
                    info!("Batch {}: translated {} entries", idx + 1, map.len());
                    outcome.translated.extend(map);
                }
                BatchAttempt::Exhausted => {
                    error!(
                        "Batch {}: all {} retries exhausted, skipping",
                        idx + 1,
                        self.max_retries
                    );
                }
                BatchAttempt::Cancelled => {
                    outcome.cancelled = true;
                    return outcome;
                }
            }

            // Rate limiting between batches.
            if idx + 1 < total_batches {
                if self.pause(self.batch_delay, cancel).await {
                    outcome.cancelled = true;
                    return outcome;
                }
            }
        }

        outcome
    }

    /// Run the retry loop for a single batch. The full batch is resubmitted
    /// on every attempt; there is no partial re-submission.
    async fn translate_batch(
        &self,
        system_prompt: &str,
        user_payload: &str,
        cancel: &CancellationToken,
    ) -> BatchAttempt {
        for attempt in 0..self.max_retries {
            let backoff_secs = match self.service.complete(system_prompt, user_payload).await {
                Ok(content) => match parse_translation_response(&content) {
                    Ok(map) => return BatchAttempt::Translated(map),
                    Err(e) => {
                        warn!(
                            "Attempt {}/{}: unparseable response: {}",
                            attempt + 1,
                            self.max_retries,
                            e
                        );
                        parse_backoff(attempt)
                    }
                },
                Err(e) => {
                    let kind = match &e {
                        PacklingoError::Http(http) if http.is_timeout() || http.is_connect() => {
                            "timeout/connection error"
                        }
                        _ => "service error",
                    };
                    warn!(
                        "Attempt {}/{}: {}: {}",
                        attempt + 1,
                        self.max_retries,
                        kind,
                        e
                    );
                    transport_backoff(attempt)
                }
            };

            if attempt + 1 < self.max_retries {
                if self.pause(Duration::from_secs(backoff_secs), cancel).await {
                    return BatchAttempt::Cancelled;
                }
            }
        }

        BatchAttempt::Exhausted
    }

    /// Sleep unless cancelled first. Returns true when cancelled.
    async fn pause(&self, duration: Duration, cancel: &CancellationToken) -> bool {
        tokio::select! {
            _ = tokio::time::sleep(duration) => false,
            _ = cancel.cancelled() => true,
        }
    }
}

/// Backoff for timeouts, connection failures and other service errors:
/// min(2^(attempt+1), 30) seconds.
fn transport_backoff(attempt: u32) -> u64 {
    (1u64 << (attempt + 1).min(5)).min(30)
}

/// Backoff for malformed responses: min(2^attempt, 10) seconds.
fn parse_backoff(attempt: u32) -> u64 {
    (1u64 << attempt.min(4)).min(10)
}

use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use walkdir::WalkDir;

use crate::checkpoint;
use crate::config::Config;
use crate::content::ContentFile;
use crate::dictionary::{split_by_dictionary, Dictionary, DictionaryCache};
use crate::error::{PacklingoError, Result};
use crate::translate::{BatchTranslator, ChatService};

/// Aggregate counters for a run.
#[derive(Debug, Default, Clone)]
pub struct PipelineStats {
    pub total_files: usize,
    pub skipped_files: usize,
    pub translated_files: usize,
    pub failed_files: usize,
    pub dict_entries: usize,
    pub reused_entries: usize,
    pub llm_entries: usize,
    pub fallback_entries: usize,
}

impl PipelineStats {
    fn log_summary(&self) {
        info!(
            "Translation complete: {} files seen, {} skipped (already done), {} translated, {} failed",
            self.total_files, self.skipped_files, self.translated_files, self.failed_files
        );
        info!(
            "Entries resolved: {} dictionary, {} reused, {} LLM, {} kept original",
            self.dict_entries, self.reused_entries, self.llm_entries, self.fallback_entries
        );
    }
}

/// Sequences the translation phases over every content file: classify,
/// checkpoint short-circuit, dictionary match, reuse split, LLM batch
/// translation, merge, persist. Files are processed one at a time; each
/// persisted output file is an atomic unit of resumable progress.
pub struct Pipeline {
    config: Config,
    translator: Option<BatchTranslator>,
    cancel: CancellationToken,
}

impl Pipeline {
    pub fn new(config: Config, cancel: CancellationToken) -> Result<Self> {
        let translator = if config.llm.is_configured() {
            let service = ChatService::new(config.llm.clone())?;
            Some(BatchTranslator::new(
                Box::new(service),
                &config.translation,
                config.llm.max_retries,
            ))
        } else {
            warn!("No LLM credentials configured, proceeding with dictionary-only translation");
            None
        };

        Ok(Self {
            config,
            translator,
            cancel,
        })
    }

    /// Construct with an explicit translator. Test seam.
    pub fn with_translator(
        config: Config,
        translator: Option<BatchTranslator>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            config,
            translator,
            cancel,
        }
    }

    /// Run the full pipeline: load the dictionary once, then process every
    /// content file under the configured categories, mirroring relative
    /// paths into the output tree.
    pub async fn run(&self, input_dir: &Path, output_dir: &Path) -> Result<PipelineStats> {
        let cache = DictionaryCache::new(&self.config.dictionary.url, self.config.work_dir());
        let dict = cache.load().await;
        self.run_with_dictionary(input_dir, output_dir, &dict).await
    }

    pub async fn run_with_dictionary(
        &self,
        input_dir: &Path,
        output_dir: &Path,
        dict: &Dictionary,
    ) -> Result<PipelineStats> {
        let mut stats = PipelineStats::default();

        for category in &self.config.translation.categories {
            let subdir = input_dir.join(category);
            if !subdir.is_dir() {
                continue;
            }

            let files = collect_json_files(&subdir);
            if files.is_empty() {
                info!("No JSON files found in {}", subdir.display());
                continue;
            }

            info!("Translating {} content ({} files)...", category, files.len());
            let progress = ProgressBar::new(files.len() as u64);
            progress.set_style(
                ProgressStyle::with_template("{prefix:>10} [{bar:40}] {pos}/{len} {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_bar()),
            );
            progress.set_prefix(category.clone());

            for file in &files {
                if self.cancel.is_cancelled() {
                    progress.abandon();
                    stats.log_summary();
                    return Err(PacklingoError::Cancelled);
                }

                let rel_path = file.strip_prefix(&subdir).unwrap_or(file);
                progress.set_message(rel_path.display().to_string());
                let output_path = output_dir.join(category).join(rel_path);

                match self.process_file(file, &output_path, dict, &mut stats).await {
                    Ok(()) => {}
                    Err(PacklingoError::Cancelled) => {
                        progress.abandon();
                        stats.log_summary();
                        return Err(PacklingoError::Cancelled);
                    }
                    Err(e) => {
                        warn!("Failed to process {}: {}", file.display(), e);
                        stats.failed_files += 1;
                    }
                }
                progress.inc(1);
            }

            progress.finish_with_message("done");
        }

        stats.log_summary();
        Ok(stats)
    }

    /// Process one content file end to end. Local data errors skip the
    /// file; cancellation persists whatever was resolved so far and then
    /// surfaces as `Cancelled`.
    async fn process_file(
        &self,
        input_path: &Path,
        output_path: &Path,
        dict: &Dictionary,
        stats: &mut PipelineStats,
    ) -> Result<()> {
        stats.total_files += 1;

        let file = match ContentFile::load(input_path) {
            Ok(Some(file)) => file,
            Ok(None) => {
                warn!("Skipping {}: not a JSON object", input_path.display());
                return Ok(());
            }
            Err(e) => {
                warn!("Failed to read {}: {}", input_path.display(), e);
                return Ok(());
            }
        };

        let entries = file.translatable();
        if entries.is_empty() {
            return Ok(());
        }

        if checkpoint::is_fully_translated(output_path, &entries) {
            info!(
                "Skipping {} (already translated)",
                input_path.display()
            );
            stats.skipped_files += 1;
            return Ok(());
        }

        info!(
            "Processing {} ({} entries)",
            input_path.display(),
            entries.len()
        );

        let partial = checkpoint::load_partial(output_path).unwrap_or_default();

        // Phase 1: dictionary matching.
        let (dict_pairs, remaining) = split_by_dictionary(&entries, dict);
        let dict_hits: HashMap<String, String> = dict_pairs.into_iter().collect();

        // Phase 2: reuse translations from an interrupted prior run.
        let (reused, still_remaining) = checkpoint::split_reusable(&remaining, &partial);
        if !reused.is_empty() {
            info!(
                "Resumed {} entries from previous run, {} still need the LLM",
                reused.len(),
                still_remaining.len()
            );
        }

        // Phase 3: LLM translation for the true remainder.
        let (llm, cancelled) = match &self.translator {
            Some(translator) if !still_remaining.is_empty() => {
                let outcome = translator
                    .translate(&still_remaining, dict, &self.cancel)
                    .await;
                (outcome.translated, outcome.cancelled)
            }
            _ => (HashMap::new(), false),
        };
        let cancelled = cancelled || self.cancel.is_cancelled();

        // Merge and persist: the output file is the checkpoint, written in
        // full even when the LLM phase was interrupted partway.
        let merged = checkpoint::merge(&file, &dict_hits, &reused, &llm);
        checkpoint::persist(output_path, &merged)?;

        let llm_resolved = still_remaining
            .iter()
            .filter(|(key, _)| llm.contains_key(key))
            .count();
        stats.dict_entries += dict_hits.len();
        stats.reused_entries += reused.len();
        stats.llm_entries += llm_resolved;
        stats.fallback_entries += still_remaining.len() - llm_resolved;
        stats.translated_files += 1;

        info!(
            "Translated {}/{} entries (dict: {}, resumed: {}, llm: {})",
            dict_hits.len() + reused.len() + llm_resolved,
            entries.len(),
            dict_hits.len(),
            reused.len(),
            llm_resolved
        );

        if cancelled {
            info!("Interrupted, partial progress saved to {}", output_path.display());
            return Err(PacklingoError::Cancelled);
        }
        Ok(())
    }
}

/// Per-category resumption status, computed without any network access.
#[derive(Debug, Default)]
pub struct CategoryStatus {
    pub category: String,
    pub complete: usize,
    pub pending: usize,
}

/// Report which content files already have a complete checkpoint.
pub fn collect_status(
    config: &Config,
    input_dir: &Path,
    output_dir: &Path,
) -> Vec<CategoryStatus> {
    let mut report = Vec::new();

    for category in &config.translation.categories {
        let subdir = input_dir.join(category);
        if !subdir.is_dir() {
            continue;
        }

        let mut status = CategoryStatus {
            category: category.clone(),
            ..Default::default()
        };

        for file in collect_json_files(&subdir) {
            let file_entries = match ContentFile::load(&file) {
                Ok(Some(content)) => content.translatable(),
                _ => continue,
            };
            if file_entries.is_empty() {
                continue;
            }

            let rel_path = file.strip_prefix(&subdir).unwrap_or(&file);
            let output_path = output_dir.join(category).join(rel_path);
            if checkpoint::is_fully_translated(&output_path, &file_entries) {
                status.complete += 1;
            } else {
                status.pending += 1;
            }
        }

        report.push(status);
    }

    report
}

/// All JSON files under a directory, in a stable sorted order.
fn collect_json_files(dir: &Path) -> Vec<PathBuf> {
    WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| {
            entry
                .path()
                .extension()
                .map(|ext| ext.eq_ignore_ascii_case("json"))
                .unwrap_or(false)
        })
        .map(|entry| entry.into_path())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::translate::MockTranslationService;
    use serde_json::json;
    use tempfile::TempDir;

    fn test_config() -> Config {
        let mut config = Config::default();
        config.translation.categories = vec!["mods".to_string()];
        config
    }

    fn write_content(input_dir: &Path, rel: &str, value: serde_json::Value) {
        let path = input_dir.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, serde_json::to_string_pretty(&value).unwrap()).unwrap();
    }

    fn read_output(output_dir: &Path, rel: &str) -> serde_json::Value {
        let content = std::fs::read_to_string(output_dir.join(rel)).unwrap();
        serde_json::from_str(&content).unwrap()
    }

    fn dictionary() -> Dictionary {
        Dictionary::from_value(json!({"Hello": ["你好"]})).unwrap()
    }

    #[tokio::test]
    async fn test_dictionary_only_scenario() {
        let input = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        write_content(
            input.path(),
            "mods/lang/en_us.json",
            json!({"a": "Hello", "b": "", "c": "World"}),
        );

        let pipeline =
            Pipeline::with_translator(test_config(), None, CancellationToken::new());
        let stats = pipeline
            .run_with_dictionary(input.path(), output.path(), &dictionary())
            .await
            .unwrap();

        assert_eq!(stats.translated_files, 1);
        assert_eq!(stats.dict_entries, 1);
        assert_eq!(stats.fallback_entries, 1);
        assert_eq!(
            read_output(output.path(), "mods/lang/en_us.json"),
            json!({"a": "你好", "b": "", "c": "World"})
        );
    }

    #[tokio::test]
    async fn test_second_run_skips_completed_files() {
        let input = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        write_content(
            input.path(),
            "mods/lang/en_us.json",
            json!({"a": "Hello", "c": "World"}),
        );

        let pipeline =
            Pipeline::with_translator(test_config(), None, CancellationToken::new());
        let dict = dictionary();

        let first = pipeline
            .run_with_dictionary(input.path(), output.path(), &dict)
            .await
            .unwrap();
        assert_eq!(first.translated_files, 1);
        let first_bytes =
            std::fs::read(output.path().join("mods/lang/en_us.json")).unwrap();

        let second = pipeline
            .run_with_dictionary(input.path(), output.path(), &dict)
            .await
            .unwrap();
        assert_eq!(second.skipped_files, 1);
        assert_eq!(second.translated_files, 0);
        let second_bytes =
            std::fs::read(output.path().join("mods/lang/en_us.json")).unwrap();
        assert_eq!(first_bytes, second_bytes);
    }

    #[tokio::test]
    async fn test_prior_translations_are_reused_without_llm() {
        let input = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        write_content(
            input.path(),
            "mods/a.json",
            json!({"k1": "Sword", "k2": "Shield"}),
        );
        // Interrupted prior run: k1 translated, k2 only carried through.
        write_content(
            output.path(),
            "mods/a.json",
            json!({"k1": "剑", "k2": "Shield"}),
        );
        // Force a rewrite by making the checkpoint incomplete.
        write_content(
            input.path(),
            "mods/a.json",
            json!({"k1": "Sword", "k2": "Shield", "k3": "Bow"}),
        );

        // A service that must never see k1.
        let mut service = MockTranslationService::new();
        service.expect_complete().returning(|_, payload| {
            let batch: HashMap<String, String> = serde_json::from_str(payload).unwrap();
            assert!(!batch.contains_key("k1"));
            let translated: HashMap<String, String> = batch
                .keys()
                .map(|k| (k.clone(), format!("[zh] {}", k)))
                .collect();
            Ok(serde_json::to_string(&translated).unwrap())
        });

        let config = test_config();
        let translator = BatchTranslator::new(Box::new(service), &config.translation, 2);
        let pipeline = Pipeline::with_translator(
            config,
            Some(translator),
            CancellationToken::new(),
        );
        let stats = pipeline
            .run_with_dictionary(input.path(), output.path(), &Dictionary::empty())
            .await
            .unwrap();

        assert_eq!(stats.reused_entries, 1);
        assert_eq!(stats.llm_entries, 2);
        let result = read_output(output.path(), "mods/a.json");
        assert_eq!(result["k1"], json!("剑"));
        assert_eq!(result["k2"], json!("[zh] k2"));
        assert_eq!(result["k3"], json!("[zh] k3"));
    }

    #[tokio::test]
    async fn test_cancellation_persists_partial_output() {
        let input = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        write_content(
            input.path(),
            "mods/a.json",
            json!({"k1": "Hello", "k2": "Raw"}),
        );

        let cancel = CancellationToken::new();
        let cancel_clone = cancel.clone();
        let mut service = MockTranslationService::new();
        service.expect_complete().returning(move |_, _| {
            cancel_clone.cancel();
            Err(PacklingoError::Translation("interrupted".to_string()))
        });

        let config = test_config();
        let translator = BatchTranslator::new(Box::new(service), &config.translation, 1);
        let pipeline = Pipeline::with_translator(config, Some(translator), cancel);

        let result = pipeline
            .run_with_dictionary(input.path(), output.path(), &dictionary())
            .await;
        assert!(matches!(result, Err(PacklingoError::Cancelled)));

        // The dictionary hit and the fallback are both on disk.
        let persisted = read_output(output.path(), "mods/a.json");
        assert_eq!(persisted, json!({"k1": "你好", "k2": "Raw"}));
    }

    #[tokio::test]
    async fn test_unreadable_file_is_skipped_not_fatal() {
        let input = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        let path = input.path().join("mods/broken.json");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "{not valid json").unwrap();
        write_content(input.path(), "mods/ok.json", json!({"a": "Hello"}));

        let pipeline =
            Pipeline::with_translator(test_config(), None, CancellationToken::new());
        let stats = pipeline
            .run_with_dictionary(input.path(), output.path(), &dictionary())
            .await
            .unwrap();

        assert_eq!(stats.translated_files, 1);
        assert!(!output.path().join("mods/broken.json").exists());
    }

    #[tokio::test]
    async fn test_status_report() {
        let input = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        write_content(input.path(), "mods/a.json", json!({"a": "Hello"}));
        write_content(input.path(), "mods/b.json", json!({"b": "World"}));
        write_content(output.path(), "mods/a.json", json!({"a": "你好"}));

        let report = collect_status(&test_config(), input.path(), output.path());
        assert_eq!(report.len(), 1);
        assert_eq!(report[0].complete, 1);
        assert_eq!(report[0].pending, 1);
    }
}

//! File system helpers: corpus loading and model blobs.

use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};

use log::{info, warn};
use walkdir::WalkDir;

use crate::config::ModelConfig;
use crate::error::NamerResult;
use crate::model::{CorpusUnit, NGramLanguageModel, TrainingOutcome};
use crate::token::Tokenizer;

/// Lists every file with a given extension under `dir`, recursively.
///
/// Symbolic links are not followed. Paths are returned sorted.
pub fn list_files<P: AsRef<Path>>(dir: P, extension: &str) -> NamerResult<Vec<PathBuf>> {
	let mut files = Vec::new();
	for entry in WalkDir::new(dir).follow_links(false) {
		let entry = entry.map_err(std::io::Error::from)?;
		if entry.file_type().is_file() && entry.path().extension() == Some(OsStr::new(extension)) {
			files.push(entry.into_path());
		}
	}

	files.sort();
	Ok(files)
}

/// Reads every matching file under `dir` as a corpus unit named after its
/// path.
///
/// Files that cannot be read as UTF-8 text are logged and skipped.
pub fn read_corpus<P: AsRef<Path>>(dir: P, extension: &str) -> NamerResult<Vec<CorpusUnit>> {
	let mut units = Vec::new();
	for path in list_files(dir, extension)? {
		match fs::read_to_string(&path) {
			Ok(source) => units.push(CorpusUnit::new(path.to_string_lossy(), source)),
			Err(e) => warn!("Skipping {}: {}", path.display(), e),
		}
	}
	Ok(units)
}

/// Writes a model blob to `path`.
pub fn save_model<P: AsRef<Path>>(model: &NGramLanguageModel, path: P) -> NamerResult<()> {
	fs::write(path, model.to_bytes()?)?;
	Ok(())
}

/// Reads a model blob written by `save_model`.
pub fn load_model<P: AsRef<Path>>(path: P) -> NamerResult<NGramLanguageModel> {
	NGramLanguageModel::from_bytes(&fs::read(path)?)
}

/// Loads the model cached at `cache` if it exists, otherwise trains one on
/// the corpus directory and writes it to `cache`.
///
/// A loaded model reports no skipped unit.
pub fn load_or_train<T: Tokenizer + ?Sized>(
	corpus_dir: impl AsRef<Path>,
	extension: &str,
	cache: impl AsRef<Path>,
	config: &ModelConfig,
	tokenizer: &T,
) -> NamerResult<TrainingOutcome> {
	let cache = cache.as_ref();
	if cache.exists() {
		info!("Loading model from {}", cache.display());
		return Ok(TrainingOutcome { model: load_model(cache)?, skipped: Vec::new() });
	}

	let units = read_corpus(corpus_dir, extension)?;
	let outcome = NGramLanguageModel::train(config, tokenizer, &units)?;
	save_model(&outcome.model, cache)?;
	info!("Model saved to {}", cache.display());
	Ok(outcome)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::error::NamerError;
	use crate::model::{LanguageModel, NGram};
	use crate::token::CodeTokenizer;

	fn write(dir: &Path, name: &str, content: &str) {
		let path = dir.join(name);
		if let Some(parent) = path.parent() {
			fs::create_dir_all(parent).unwrap();
		}
		fs::write(path, content).unwrap();
	}

	#[test]
	fn test_read_corpus_is_recursive_and_sorted() {
		let dir = tempfile::tempdir().unwrap();
		write(dir.path(), "b.java", "int b;");
		write(dir.path(), "nested/a.java", "int a;");
		write(dir.path(), "notes.txt", "ignored");

		let units = read_corpus(dir.path(), "java").unwrap();
		assert_eq!(units.len(), 2);
		assert!(units[0].name.ends_with("b.java"));
		assert!(units[1].name.ends_with("a.java"));
		assert_eq!(units[1].source, "int a;");
	}

	#[cfg(unix)]
	#[test]
	fn test_read_corpus_ignores_symlink_cycles() {
		let dir = tempfile::tempdir().unwrap();
		write(dir.path(), "a.c", "int a;");
		std::os::unix::fs::symlink(dir.path(), dir.path().join("loop")).unwrap();
		std::os::unix::fs::symlink(dir.path().join("a.c"), dir.path().join("alias.c")).unwrap();

		let units = read_corpus(dir.path(), "c").unwrap();
		assert_eq!(units.len(), 1);
		assert!(units[0].name.ends_with("a.c"));
	}

	#[test]
	fn test_list_files_missing_dir_fails() {
		let dir = tempfile::tempdir().unwrap();
		assert!(matches!(list_files(dir.path().join("missing"), "c"), Err(NamerError::Io(_))));
	}

	#[test]
	fn test_model_save_load() {
		let dir = tempfile::tempdir().unwrap();
		let config = ModelConfig { order: 3, vocabulary_cutoff: 0, ..ModelConfig::default() };
		let model = NGramLanguageModel::train(&config, &CodeTokenizer, &[CorpusUnit::new("a", "int a = 0;")])
			.unwrap()
			.model;

		let path = dir.path().join("model.bin");
		save_model(&model, &path).unwrap();
		let loaded = load_model(&path).unwrap();
		assert_eq!(loaded, model);
		let ngram = NGram::from(&["int", "a"][..]);
		assert_eq!(loaded.probability(&ngram), model.probability(&ngram));
	}

	#[test]
	fn test_load_corrupted_model_fails() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("model.bin");
		fs::write(&path, [0xff, 0xff, 0xff]).unwrap();
		assert!(matches!(load_model(&path), Err(NamerError::Serialization(_))));
		assert!(matches!(load_model(dir.path().join("missing.bin")), Err(NamerError::Io(_))));
	}

	#[test]
	fn test_load_or_train_caches_model() {
		let dir = tempfile::tempdir().unwrap();
		write(dir.path(), "corpus/a.c", "int a = 0;");
		let cache = dir.path().join("model.bin");
		let config = ModelConfig { vocabulary_cutoff: 0, ..ModelConfig::default() };

		let trained = load_or_train(dir.path().join("corpus"), "c", &cache, &config, &CodeTokenizer).unwrap();
		assert!(cache.exists());
		let loaded = load_or_train(dir.path().join("corpus"), "c", &cache, &config, &CodeTokenizer).unwrap();
		assert_eq!(trained.model, loaded.model);
	}
}

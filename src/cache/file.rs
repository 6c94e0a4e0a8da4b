//! Local File Cache Module
//!
//! Stores each entry as a `.txt` value file next to a `.meta` JSON file
//! holding its expiration options. The value file's modification time is
//! the entry's last-updated time.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::sleep;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use crate::cache::text::ensure_supported;
use crate::cache::{
    CacheEntryOptions, CacheManager, ExpirationEvaluator, KeyPattern, ManagedCache, TextCache,
};
use crate::error::{CacheError, Result};

const VALUE_EXTENSION: &str = "txt";
const METADATA_EXTENSION: &str = "meta";

/// Retries after the first failed attempt
const MAX_RETRIES: u32 = 8;
/// Upper bound of the first backoff window
const BASE_DELAY_MS: u64 = 250;
/// Upper bound of any backoff window
const MAX_DELAY_MS: u64 = 10_000;

const RESERVED_NAMES: [&str; 23] = [
    "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
    "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9", "GLOBALROOT",
];

#[derive(Debug, Default, Serialize, Deserialize)]
struct FileMetadata {
    #[serde(default)]
    cache_entry_options: Option<CacheEntryOptions>,
}

// == Local File Cache ==
/// Text cache persisted under a base directory on the local file system.
#[derive(Debug, Clone)]
pub struct LocalFileCache {
    base_dir: PathBuf,
    evaluator: ExpirationEvaluator,
}

impl LocalFileCache {
    // == Constructor ==
    /// Opens (and creates if needed) a file cache rooted at `base_dir`.
    pub fn new(base_dir: impl Into<PathBuf>, evaluator: ExpirationEvaluator) -> Result<Self> {
        let base_dir = base_dir.into();
        if base_dir.as_os_str().is_empty() {
            return Err(CacheError::Configuration(
                "Missing required file cache base directory".to_string(),
            ));
        }
        with_retry(&base_dir, || fs::create_dir_all(&base_dir))?;
        Ok(Self {
            base_dir,
            evaluator,
        })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    // == Paths ==
    /// Path of the value file for `key`.
    pub fn file_path(&self, key: &str) -> Result<PathBuf> {
        Ok(self.base_dir.join(file_name(key, VALUE_EXTENSION, false)?))
    }

    fn metadata_path(&self, key: &str) -> Result<PathBuf> {
        Ok(self.base_dir.join(file_name(key, METADATA_EXTENSION, false)?))
    }

    // == Expiration ==
    /// Evaluates the entry stored at `value_path`, deleting both files if expired.
    fn check_live(&self, value_path: &Path, metadata_path: &Path) -> Result<bool> {
        let Some(modified) = modified_time(value_path)? else {
            return Ok(false);
        };

        // File timestamps can run slightly ahead of the process clock
        let now = Utc::now();
        let updated = modified.min(now);

        let options = read_metadata(metadata_path)?;
        if !self
            .evaluator
            .is_expired_at(options.as_ref(), updated, now)?
        {
            return Ok(true);
        }

        debug!("Evicting expired file entry {}", value_path.display());
        delete_if_present(value_path)?;
        delete_if_present(metadata_path)?;
        Ok(false)
    }

    /// Value files in the base directory.
    fn value_files(&self) -> Result<Vec<PathBuf>> {
        let reader = with_retry(&self.base_dir, || fs::read_dir(&self.base_dir))?;
        let mut files = Vec::new();
        for entry in reader {
            let path = entry
                .map_err(|err| CacheError::storage(&self.base_dir, err))?
                .path();
            if path.extension().and_then(|ext| ext.to_str()) == Some(VALUE_EXTENSION) {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }

    /// Value files whose names match a wildcard key expression.
    fn matching_files(&self, pattern: &str) -> Result<Vec<PathBuf>> {
        let file_pattern = KeyPattern::new(&file_name(pattern, VALUE_EXTENSION, true)?)?;
        Ok(self
            .value_files()?
            .into_iter()
            .filter(|path| {
                path.file_name()
                    .and_then(|name| name.to_str())
                    .is_some_and(|name| file_pattern.is_match(name))
            })
            .collect())
    }
}

impl TextCache for LocalFileCache {
    fn contains(&self, key: &str) -> Result<bool> {
        self.check_live(&self.file_path(key)?, &self.metadata_path(key)?)
    }

    fn get_string(&self, key: &str) -> Result<Option<String>> {
        if !self.contains(key)? {
            return Ok(None);
        }
        let path = self.file_path(key)?;
        with_retry(&path, || read_optional(&path))
    }

    fn set_string(&self, key: &str, value: &str, options: &CacheEntryOptions) -> Result<()> {
        ensure_supported(options)?;
        let value_path = self.file_path(key)?;
        let metadata_path = self.metadata_path(key)?;

        write_replacing(&value_path, value.as_bytes())?;
        let metadata = FileMetadata {
            cache_entry_options: Some(options.clone()),
        };
        let json = serde_json::to_vec(&metadata)?;
        write_replacing(&metadata_path, &json)
    }

    fn location(&self, key: &str) -> String {
        match self.file_path(key) {
            Ok(path) => path.display().to_string(),
            Err(_) => self.base_dir.display().to_string(),
        }
    }

    fn remove(&self, key: &str) -> Result<()> {
        delete_if_present(&self.file_path(key)?)?;
        delete_if_present(&self.metadata_path(key)?)
    }
}

impl ManagedCache for LocalFileCache {
    fn manager(&self) -> Arc<dyn CacheManager> {
        Arc::new(LocalFileCacheManager {
            cache: self.clone(),
        })
    }
}

// == Local File Cache Manager ==
struct LocalFileCacheManager {
    cache: LocalFileCache,
}

impl CacheManager for LocalFileCacheManager {
    fn entry_count(&self) -> Result<usize> {
        Ok(self.cache.value_files()?.len())
    }

    fn count_matching(&self, pattern: &str) -> Result<usize> {
        Ok(self.cache.matching_files(pattern)?.len())
    }

    fn delete_matching(&self, pattern: &str) -> Result<usize> {
        let files = self.cache.matching_files(pattern)?;
        for path in &files {
            delete_if_present(path)?;
            delete_if_present(&path.with_extension(METADATA_EXTENSION))?;
        }
        Ok(files.len())
    }

    /// File stems; sanitization means these may differ from the original keys.
    fn keys(&self) -> Result<Vec<String>> {
        Ok(self
            .cache
            .value_files()?
            .iter()
            .filter_map(|path| path.file_stem().and_then(|stem| stem.to_str()))
            .map(str::to_string)
            .collect())
    }

    fn purge_expired(&self) -> Result<usize> {
        let mut removed = 0;
        for path in self.cache.value_files()? {
            let metadata_path = path.with_extension(METADATA_EXTENSION);
            match self.cache.check_live(&path, &metadata_path) {
                Ok(true) => {}
                Ok(false) => removed += 1,
                Err(err) => warn!("Skipping {} during purge: {}", path.display(), err),
            }
        }
        Ok(removed)
    }
}

// == File Names ==
/// Turns a cache key into a portable file name with the given extension.
///
/// Characters invalid on any major platform become `_`, `..` becomes `__`,
/// a trailing dot becomes `_`, and reserved device names get a `_` suffix.
/// With `keep_wildcards` the `*` and `?` characters survive so the result
/// can be used as a search pattern.
pub(crate) fn file_name(key: &str, extension: &str, keep_wildcards: bool) -> Result<String> {
    let trimmed = key.trim();
    if trimmed.is_empty() {
        return Err(CacheError::Configuration(
            "Cache key cannot be empty or whitespace".to_string(),
        ));
    }
    if extension.is_empty() || extension == "." {
        return Err(CacheError::Configuration(
            "File extension cannot be empty".to_string(),
        ));
    }

    let mut name: String = trimmed
        .chars()
        .map(|c| {
            let wildcard = c == '*' || c == '?';
            let invalid = c.is_control()
                || matches!(c, '\\' | '/' | ':' | '"' | '<' | '>' | '|')
                || (wildcard && !keep_wildcards);
            if invalid {
                '_'
            } else {
                c
            }
        })
        .collect();

    name = name.replace("..", "__");
    if name.ends_with('.') {
        name = format!("{}_", name.trim_end_matches('.'));
    }
    if RESERVED_NAMES
        .iter()
        .any(|reserved| reserved.eq_ignore_ascii_case(&name))
    {
        name.push('_');
    }
    Ok(format!("{}.{}", name, extension))
}

/// Picks a per-user directory suitable for a local file cache.
///
/// Does not check whether the directory exists.
pub fn find_local_cache_dir() -> PathBuf {
    let candidates = ["HOME", "USERPROFILE", "XDG_DATA_HOME", "APPDATA", "TEMP", "TMP"];
    let base = candidates
        .iter()
        .filter_map(|name| std::env::var_os(name))
        .find(|value| !value.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(std::env::temp_dir);
    base.join("method-cache").join(".quick-cache")
}

// == Retry Policy ==
/// Contention-style failures worth retrying.
fn is_transient(err: &io::Error) -> bool {
    #[cfg(windows)]
    {
        // ERROR_SHARING_VIOLATION, ERROR_LOCK_VIOLATION
        if matches!(err.raw_os_error(), Some(32) | Some(33)) {
            return true;
        }
    }
    matches!(
        err.kind(),
        io::ErrorKind::PermissionDenied
            | io::ErrorKind::WouldBlock
            | io::ErrorKind::Interrupted
            | io::ErrorKind::TimedOut
    )
}

/// Runs `op`, retrying transient failures with jittered exponential backoff.
fn with_retry<T>(path: &Path, mut op: impl FnMut() -> io::Result<T>) -> Result<T> {
    let mut attempt = 0;
    loop {
        match op() {
            Ok(value) => return Ok(value),
            Err(err) if is_transient(&err) && attempt < MAX_RETRIES => {
                let window = (BASE_DELAY_MS << attempt).min(MAX_DELAY_MS);
                let delay = rand::thread_rng().gen_range(0..=window);
                warn!(
                    "Transient I/O error on {} (attempt {}): {}; retrying in {}ms",
                    path.display(),
                    attempt + 1,
                    err,
                    delay
                );
                sleep(Duration::from_millis(delay));
                attempt += 1;
            }
            Err(err) => {
                if attempt > 0 {
                    error!(
                        "Giving up on {} after {} retries: {}",
                        path.display(),
                        attempt,
                        err
                    );
                }
                return Err(CacheError::storage(path, err));
            }
        }
    }
}

// == File Helpers ==
fn read_optional(path: &Path) -> io::Result<Option<String>> {
    match fs::read_to_string(path) {
        Ok(text) => Ok(Some(text)),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(err),
    }
}

fn read_metadata(path: &Path) -> Result<Option<CacheEntryOptions>> {
    match with_retry(path, || read_optional(path))? {
        Some(json) => {
            let metadata: FileMetadata = serde_json::from_str(&json)?;
            Ok(metadata.cache_entry_options)
        }
        None => Ok(None),
    }
}

fn modified_time(path: &Path) -> Result<Option<DateTime<Utc>>> {
    let metadata = with_retry(path, || match fs::metadata(path) {
        Ok(metadata) => Ok(Some(metadata)),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(err),
    })?;
    let Some(metadata) = metadata else {
        return Ok(None);
    };
    let modified = metadata
        .modified()
        .map_err(|err| CacheError::storage(path, err))?;
    Ok(Some(DateTime::<Utc>::from(modified)))
}

/// Writes through a temporary sibling so readers never see partial content.
fn write_replacing(path: &Path, contents: &[u8]) -> Result<()> {
    let suffix: u32 = rand::thread_rng().gen();
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or_default();
    let temp_path = path.with_extension(format!("{}.{:08x}.tmp", extension, suffix));

    with_retry(&temp_path, || fs::write(&temp_path, contents))?;
    let renamed = with_retry(path, || fs::rename(&temp_path, path));
    if renamed.is_err() {
        let _ = fs::remove_file(&temp_path);
    }
    renamed
}

fn delete_if_present(path: &Path) -> Result<()> {
    with_retry(path, || match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err),
    })
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn cache_in(dir: &TempDir) -> LocalFileCache {
        LocalFileCache::new(dir.path(), ExpirationEvaluator::default()).unwrap()
    }

    fn set_mtime_seconds_ago(path: &Path, seconds: u64) {
        let file = fs::OpenOptions::new().write(true).open(path).unwrap();
        let past = std::time::SystemTime::now() - Duration::from_secs(seconds);
        file.set_modified(past).unwrap();
    }

    #[test]
    fn test_set_and_get() {
        let dir = TempDir::new().unwrap();
        let cache = cache_in(&dir);

        cache.set_string_default("Bar.Foo()", "42").unwrap();

        assert!(cache.contains("Bar.Foo()").unwrap());
        assert_eq!(cache.get_string("Bar.Foo()").unwrap().as_deref(), Some("42"));
    }

    #[test]
    fn test_missing_entry() {
        let dir = TempDir::new().unwrap();
        let cache = cache_in(&dir);

        assert!(!cache.contains("nope").unwrap());
        assert!(cache.get_string("nope").unwrap().is_none());
    }

    #[test]
    fn test_remove_absent_is_noop() {
        let dir = TempDir::new().unwrap();
        let cache = cache_in(&dir);

        cache.remove("never-written").unwrap();
    }

    #[test]
    fn test_remove_deletes_both_files() {
        let dir = TempDir::new().unwrap();
        let cache = cache_in(&dir);
        cache.set_string_default("k", "v").unwrap();

        cache.remove("k").unwrap();

        assert!(!cache.file_path("k").unwrap().exists());
        assert!(!cache.metadata_path("k").unwrap().exists());
    }

    #[test]
    fn test_expired_entry_is_evicted() {
        let dir = TempDir::new().unwrap();
        let cache = cache_in(&dir);
        let options = CacheEntryOptions::relative(Duration::from_secs(4));
        cache.set_string("k", "v", &options).unwrap();
        set_mtime_seconds_ago(&cache.file_path("k").unwrap(), 10);

        assert!(!cache.contains("k").unwrap());
        assert!(!cache.file_path("k").unwrap().exists());
        assert!(!cache.metadata_path("k").unwrap().exists());
    }

    #[test]
    fn test_missing_metadata_uses_default_policy() {
        let dir = TempDir::new().unwrap();
        let cache = LocalFileCache::new(
            dir.path(),
            ExpirationEvaluator::new(CacheEntryOptions::relative(Duration::from_secs(5))),
        )
        .unwrap();
        cache.set_string_default("k", "v").unwrap();
        fs::remove_file(cache.metadata_path("k").unwrap()).unwrap();

        assert!(cache.contains("k").unwrap());

        set_mtime_seconds_ago(&cache.file_path("k").unwrap(), 6);
        assert!(!cache.contains("k").unwrap());
    }

    #[test]
    fn test_overwrite_resets_clock() {
        let dir = TempDir::new().unwrap();
        let cache = cache_in(&dir);
        let options = CacheEntryOptions::relative(Duration::from_secs(4));
        cache.set_string("k", "old", &options).unwrap();
        set_mtime_seconds_ago(&cache.file_path("k").unwrap(), 10);

        cache.set_string("k", "new", &options).unwrap();

        assert_eq!(cache.get_string("k").unwrap().as_deref(), Some("new"));
    }

    #[test]
    fn test_location_is_value_path() {
        let dir = TempDir::new().unwrap();
        let cache = cache_in(&dir);

        let location = cache.location("Bar.Foo()");
        assert!(location.ends_with("Bar.Foo().txt"));
        assert!(location.starts_with(&dir.path().display().to_string()));
    }

    #[test]
    fn test_sliding_rejected() {
        let dir = TempDir::new().unwrap();
        let cache = cache_in(&dir);
        let options = CacheEntryOptions::new().with_sliding(Duration::from_secs(1));

        assert!(matches!(
            cache.set_string("k", "v", &options),
            Err(CacheError::Configuration(_))
        ));
    }

    #[test]
    fn test_file_name_sanitization() {
        assert_eq!(file_name(" key ", "txt", false).unwrap(), "key.txt");
        assert_eq!(
            file_name("http://x/y?z*", "txt", false).unwrap(),
            "http___x_y_z_.txt"
        );
        assert_eq!(file_name("a*b?", "txt", true).unwrap(), "a*b?.txt");
        assert_eq!(file_name("a..b", "txt", false).unwrap(), "a__b.txt");
        assert_eq!(file_name("trailing.", "txt", false).unwrap(), "trailing_.txt");
        assert_eq!(file_name("con", "meta", false).unwrap(), "con_.meta");
        assert!(file_name("   ", "txt", false).is_err());
        assert!(file_name("k", "", false).is_err());
    }

    #[test]
    fn test_manager_operations() {
        let dir = TempDir::new().unwrap();
        let cache = cache_in(&dir);
        cache.set_string_default("Weather.a", "1").unwrap();
        cache.set_string_default("Weather.b", "2").unwrap();
        cache.set_string_default("Stock.a", "3").unwrap();
        let manager = cache.manager();

        assert_eq!(manager.entry_count().unwrap(), 3);
        assert_eq!(manager.count_matching("Weather.*").unwrap(), 2);
        assert_eq!(manager.count_matching("weather.*").unwrap(), 0);
        assert_eq!(manager.delete_matching("Weather.*").unwrap(), 2);
        assert_eq!(manager.keys().unwrap(), vec!["Stock.a".to_string()]);
        assert!(!cache.metadata_path("Weather.a").unwrap().exists());
    }

    #[test]
    fn test_manager_purge_expired() {
        let dir = TempDir::new().unwrap();
        let cache = cache_in(&dir);
        let options = CacheEntryOptions::relative(Duration::from_secs(4));
        cache.set_string("old", "v", &options).unwrap();
        cache.set_string("fresh", "v", &options).unwrap();
        set_mtime_seconds_ago(&cache.file_path("old").unwrap(), 10);

        assert_eq!(cache.manager().purge_expired().unwrap(), 1);
        assert_eq!(cache.manager().entry_count().unwrap(), 1);
    }

    #[test]
    fn test_purge_skips_unreadable_metadata() {
        let dir = TempDir::new().unwrap();
        let cache = cache_in(&dir);
        let options = CacheEntryOptions::relative(Duration::from_secs(4));
        cache.set_string("broken", "v", &options).unwrap();
        cache.set_string("old", "v", &options).unwrap();
        fs::write(cache.metadata_path("broken").unwrap(), "not json").unwrap();
        set_mtime_seconds_ago(&cache.file_path("old").unwrap(), 10);

        assert_eq!(cache.manager().purge_expired().unwrap(), 1);
        assert!(cache.file_path("broken").unwrap().exists());
        assert!(!cache.file_path("old").unwrap().exists());
    }

    #[test]
    fn test_find_local_cache_dir_suffix() {
        let dir = find_local_cache_dir();
        assert!(dir.ends_with(Path::new("method-cache").join(".quick-cache")));
    }

    #[test]
    fn test_empty_base_dir_is_configuration_error() {
        let result = LocalFileCache::new("", ExpirationEvaluator::default());
        assert!(matches!(result, Err(CacheError::Configuration(_))));
    }
}

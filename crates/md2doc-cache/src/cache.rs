//! Content-addressed image store.
//!
//! [`ImageCache`] keeps normalized images as files in a single directory next to
//! a JSON index mapping cache keys to [`CacheEntry`] records:
//!
//! ```text
//! {dir}/
//! +-- cache_index.json        # {"version": 1, "entries": {key: entry}}
//! +-- {source}_{config}.png   # normalized image
//! +-- ...
//! ```
//!
//! The index is loaded once on [`ImageCache::open`] and written back after
//! every mutation. An index written by a different format version is
//! discarded. Entries whose file has disappeared are purged on lookup.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::config::RenderConfig;
use crate::error::CacheError;
use crate::key::CacheKey;
use crate::transform::normalize;

const INDEX_FILE: &str = "cache_index.json";
const INDEX_VERSION: u32 = 1;
const RECENT_DAYS: i64 = 7;

/// One cached image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub source_hash: String,
    pub config_hash: String,
    pub file_path: PathBuf,
    pub created_at: DateTime<Utc>,
    pub accessed_at: DateTime<Utc>,
    pub size_bytes: u64,
    /// Extension of the source file, or `"diagram"` for rendered diagrams.
    pub original_format: String,
    pub output_format: String,
}

/// Snapshot of cache contents and counters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CacheStats {
    pub total_files: usize,
    pub total_size: u64,
    /// Entries accessed within the last seven days.
    pub recent_files: usize,
    pub oldest: Option<DateTime<Utc>>,
    pub newest: Option<DateTime<Utc>>,
    pub hits: u64,
    pub misses: u64,
}

/// Result of [`ImageCache::cleanup`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanupReport {
    pub removed: usize,
    pub freed_bytes: u64,
}

#[derive(Serialize, Deserialize)]
struct IndexFile {
    version: u32,
    entries: BTreeMap<String, CacheEntry>,
}

/// Image cache rooted at a directory on disk.
///
/// Safe to share between threads; index read-modify-write cycles are
/// serialized by an internal lock.
pub struct ImageCache {
    dir: PathBuf,
    config: RenderConfig,
    index: Mutex<BTreeMap<String, CacheEntry>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl ImageCache {
    /// Open (or create) a cache in `dir` and load its index.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, CacheError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        let index = load_index(&dir.join(INDEX_FILE));
        tracing::debug!(dir = %dir.display(), entries = index.len(), "opened image cache");
        Ok(Self {
            dir,
            config: RenderConfig::default(),
            index: Mutex::new(index),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        })
    }

    /// Set the configuration used when `process` is called without one.
    #[must_use]
    pub fn with_config(mut self, config: RenderConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    #[must_use]
    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// Look up a cached image without processing anything.
    ///
    /// A hit refreshes the entry's `accessed_at`. An entry whose file is gone
    /// is removed and reported as a miss.
    pub fn get(&self, source: &[u8], config: &RenderConfig) -> Option<PathBuf> {
        let key = CacheKey::compute(source, config).as_string();
        let mut index = self.lock();

        let Some(entry) = index.get_mut(&key) else {
            self.misses.fetch_add(1, Ordering::Relaxed);
            return None;
        };

        if !entry.file_path.is_file() {
            tracing::warn!(path = %entry.file_path.display(), "cached file missing, purging entry");
            index.remove(&key);
            self.misses.fetch_add(1, Ordering::Relaxed);
            self.persist_logged(&index);
            return None;
        }

        entry.accessed_at = Utc::now();
        let path = entry.file_path.clone();
        self.hits.fetch_add(1, Ordering::Relaxed);
        self.persist_logged(&index);
        tracing::debug!(%key, "cache hit");
        Some(path)
    }

    /// Normalize an image file through the cache.
    ///
    /// On a hit the cached file is returned (or copied to `out_path`). On a
    /// miss the image is resized and re-encoded, stored, and registered.
    pub fn process(
        &self,
        source_path: &Path,
        out_path: Option<&Path>,
        config: Option<&RenderConfig>,
    ) -> Result<PathBuf, CacheError> {
        if !source_path.is_file() {
            return Err(CacheError::SourceNotFound(source_path.to_path_buf()));
        }
        let config = config.unwrap_or(&self.config);
        let source = fs::read(source_path)?;

        let cached = match self.get(&source, config) {
            Some(path) => path,
            None => {
                let original_format = source_path
                    .extension()
                    .and_then(|ext| ext.to_str())
                    .map_or_else(String::new, str::to_ascii_lowercase);
                let data = normalize(&source, config)?;
                self.store(&source, &data, config, &original_format)?
            }
        };

        match out_path {
            Some(out) => {
                fs::copy(&cached, out)?;
                Ok(out.to_path_buf())
            }
            None => Ok(cached),
        }
    }

    /// Normalize an externally rendered image and register it under the key
    /// of `source` (typically diagram text).
    pub fn insert_rendered(
        &self,
        source: &[u8],
        rendered_path: &Path,
        config: &RenderConfig,
    ) -> Result<PathBuf, CacheError> {
        if !rendered_path.is_file() {
            return Err(CacheError::SourceNotFound(rendered_path.to_path_buf()));
        }
        let data = normalize(&fs::read(rendered_path)?, config)?;
        self.store(source, &data, config, "diagram")
    }

    /// Normalize an image for a Word page (see [`RenderConfig::for_word`]).
    pub fn optimize_for_word(&self, source_path: &Path) -> Result<PathBuf, CacheError> {
        let config = self.config.for_word();
        self.process(source_path, None, Some(&config))
    }

    #[must_use]
    pub fn stats(&self) -> CacheStats {
        let index = self.lock();
        let recent_cutoff = Utc::now() - Duration::days(RECENT_DAYS);
        CacheStats {
            total_files: index.len(),
            total_size: index.values().map(|e| e.size_bytes).sum(),
            recent_files: index
                .values()
                .filter(|e| e.accessed_at > recent_cutoff)
                .count(),
            oldest: index.values().map(|e| e.created_at).min(),
            newest: index.values().map(|e| e.created_at).max(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }

    /// Evict entries not accessed within `max_age_days`, then evict the
    /// least recently accessed entries until the total size fits
    /// `max_size_bytes`.
    pub fn cleanup(&self, max_age_days: u32, max_size_bytes: u64) -> Result<CleanupReport, CacheError> {
        let mut index = self.lock();
        let cutoff = Utc::now()
            .checked_sub_signed(Duration::days(i64::from(max_age_days)))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);

        let mut by_access: Vec<(String, DateTime<Utc>, u64)> = index
            .iter()
            .map(|(key, e)| (key.clone(), e.accessed_at, e.size_bytes))
            .collect();
        by_access.sort_by_key(|(_, accessed_at, _)| *accessed_at);

        let mut current_size: u64 = by_access.iter().map(|(_, _, size)| size).sum();
        let mut report = CleanupReport::default();

        for (key, accessed_at, size) in by_access {
            let expired = accessed_at <= cutoff;
            if !expired && current_size <= max_size_bytes {
                continue;
            }
            let Some(entry) = index.get(&key) else {
                continue;
            };
            // Drop the entry only once its file is gone
            if let Err(e) = remove_file(&entry.file_path) {
                self.persist_logged(&index);
                return Err(e);
            }
            index.remove(&key);
            tracing::debug!(%key, expired, "evicted cache entry");
            current_size = current_size.saturating_sub(size);
            report.removed += 1;
            report.freed_bytes += size;
        }

        self.persist(&index)?;
        tracing::info!(
            removed = report.removed,
            freed_bytes = report.freed_bytes,
            "cache cleanup finished"
        );
        Ok(report)
    }

    /// Remove every entry and its file. Returns the number of entries removed.
    pub fn clear(&self) -> Result<usize, CacheError> {
        let mut index = self.lock();
        let keys: Vec<String> = index.keys().cloned().collect();
        let mut removed = 0;
        for key in keys {
            if let Some(entry) = index.get(&key)
                && let Err(e) = remove_file(&entry.file_path)
            {
                self.persist_logged(&index);
                return Err(e);
            }
            index.remove(&key);
            removed += 1;
        }
        self.persist(&index)?;
        tracing::info!(removed, "cache cleared");
        Ok(removed)
    }

    fn store(
        &self,
        source: &[u8],
        data: &[u8],
        config: &RenderConfig,
        original_format: &str,
    ) -> Result<PathBuf, CacheError> {
        let key = CacheKey::compute(source, config);
        let key_string = key.as_string();
        let file_path = self
            .dir
            .join(format!("{key_string}.{}", config.output_format.extension()));
        fs::write(&file_path, data)?;

        let now = Utc::now();
        let entry = CacheEntry {
            source_hash: key.source_hash,
            config_hash: key.config_hash,
            file_path: file_path.clone(),
            created_at: now,
            accessed_at: now,
            size_bytes: data.len() as u64,
            original_format: original_format.to_owned(),
            output_format: config.output_format.as_str().to_owned(),
        };

        let mut index = self.lock();
        index.insert(key_string, entry);
        self.persist(&index)?;
        tracing::debug!(path = %file_path.display(), "stored image in cache");
        Ok(file_path)
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<String, CacheEntry>> {
        self.index.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn persist(&self, index: &BTreeMap<String, CacheEntry>) -> Result<(), CacheError> {
        let file = IndexFile {
            version: INDEX_VERSION,
            entries: index.clone(),
        };
        fs::write(self.dir.join(INDEX_FILE), serde_json::to_vec_pretty(&file)?)?;
        Ok(())
    }

    fn persist_logged(&self, index: &BTreeMap<String, CacheEntry>) {
        if let Err(e) = self.persist(index) {
            tracing::warn!("failed to write cache index: {e}");
        }
    }
}

fn load_index(path: &Path) -> BTreeMap<String, CacheEntry> {
    let data = match fs::read(path) {
        Ok(data) => data,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return BTreeMap::new(),
        Err(e) => {
            tracing::warn!("failed to read cache index: {e}");
            return BTreeMap::new();
        }
    };
    match serde_json::from_slice::<IndexFile>(&data) {
        Ok(file) if file.version == INDEX_VERSION => file.entries,
        Ok(file) => {
            tracing::info!(
                "cache index version mismatch (stored={}, current={INDEX_VERSION}), starting empty",
                file.version
            );
            BTreeMap::new()
        }
        Err(e) => {
            tracing::warn!("failed to parse cache index: {e}");
            BTreeMap::new()
        }
    }
}

fn remove_file(path: &Path) -> Result<(), CacheError> {
    match fs::remove_file(path) {
        Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e.into()),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OutputFormat;
    use image::{DynamicImage, ImageFormat, RgbImage};
    use pretty_assertions::assert_eq;
    use std::io::Cursor;
    use tempfile::TempDir;

    fn write_png(dir: &Path, name: &str, width: u32, height: u32) -> PathBuf {
        let mut buf = Vec::new();
        DynamicImage::ImageRgb8(RgbImage::new(width, height))
            .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .unwrap();
        let path = dir.join(name);
        fs::write(&path, buf).unwrap();
        path
    }

    fn cached_files(dir: &Path) -> usize {
        fs::read_dir(dir)
            .unwrap()
            .filter_map(Result::ok)
            .filter(|e| e.file_name() != INDEX_FILE)
            .count()
    }

    #[test]
    fn test_second_process_is_a_hit() {
        let tmp = TempDir::new().unwrap();
        let src = write_png(tmp.path(), "a.png", 40, 20);
        let cache = ImageCache::open(tmp.path().join("cache")).unwrap();

        let first = cache.process(&src, None, None).unwrap();
        let accessed_before = cache.lock().values().next().unwrap().accessed_at;
        assert_eq!(cached_files(cache.dir()), 1);

        std::thread::sleep(std::time::Duration::from_millis(5));
        let second = cache.process(&src, None, None).unwrap();

        assert_eq!(first, second);
        assert_eq!(cached_files(cache.dir()), 1);
        let accessed_after = cache.lock().values().next().unwrap().accessed_at;
        assert!(accessed_after > accessed_before);

        let stats = cache.stats();
        assert_eq!(stats.total_files, 1);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.recent_files, 1);
    }

    #[test]
    fn test_process_missing_source() {
        let tmp = TempDir::new().unwrap();
        let cache = ImageCache::open(tmp.path()).unwrap();
        let err = cache
            .process(&tmp.path().join("missing.png"), None, None)
            .unwrap_err();
        assert!(matches!(err, CacheError::SourceNotFound(_)));
    }

    #[test]
    fn test_process_to_out_path() {
        let tmp = TempDir::new().unwrap();
        let src = write_png(tmp.path(), "a.png", 10, 10);
        let out = tmp.path().join("out.png");
        let cache = ImageCache::open(tmp.path().join("cache")).unwrap();

        let result = cache.process(&src, Some(&out), None).unwrap();
        assert_eq!(result, out);
        assert!(out.is_file());
        assert_eq!(cache.stats().total_files, 1);
    }

    #[test]
    fn test_index_survives_reopen() {
        let tmp = TempDir::new().unwrap();
        let src = write_png(tmp.path(), "a.png", 10, 10);
        let dir = tmp.path().join("cache");
        {
            let cache = ImageCache::open(&dir).unwrap();
            cache.process(&src, None, None).unwrap();
        }

        let cache = ImageCache::open(&dir).unwrap();
        let source = fs::read(&src).unwrap();
        assert!(cache.get(&source, &RenderConfig::default()).is_some());
    }

    #[test]
    fn test_index_version_mismatch_discards_entries() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join(INDEX_FILE),
            r#"{"version": 0, "entries": {}}"#,
        )
        .unwrap();
        let cache = ImageCache::open(tmp.path()).unwrap();
        assert_eq!(cache.stats().total_files, 0);
    }

    #[test]
    fn test_missing_file_is_purged_on_lookup() {
        let tmp = TempDir::new().unwrap();
        let src = write_png(tmp.path(), "a.png", 10, 10);
        let cache = ImageCache::open(tmp.path().join("cache")).unwrap();

        let cached = cache.process(&src, None, None).unwrap();
        fs::remove_file(&cached).unwrap();
        assert_eq!(cache.stats().total_files, 1);

        let source = fs::read(&src).unwrap();
        assert_eq!(cache.get(&source, &RenderConfig::default()), None);
        assert_eq!(cache.stats().total_files, 0);
    }

    #[test]
    fn test_insert_rendered_registers_under_source_key() {
        let tmp = TempDir::new().unwrap();
        let rendered = write_png(tmp.path(), "diagram.png", 30, 30);
        let cache = ImageCache::open(tmp.path().join("cache")).unwrap();
        let config = RenderConfig::default();

        let path = cache
            .insert_rendered(b"graph TD\nA --> B", &rendered, &config)
            .unwrap();
        assert_eq!(cache.get(b"graph TD\nA --> B", &config), Some(path));

        let entry = cache.lock().values().next().unwrap().clone();
        assert_eq!(entry.original_format, "diagram");
        assert_eq!(entry.output_format, "png");
    }

    #[test]
    fn test_optimize_for_word_shrinks_to_page() {
        let tmp = TempDir::new().unwrap();
        let src = write_png(tmp.path(), "wide.png", 1200, 300);
        let cache = ImageCache::open(tmp.path().join("cache")).unwrap();

        let path = cache.optimize_for_word(&src).unwrap();
        let meta = crate::metadata::ImageMetadata::read(&fs::read(path).unwrap()).unwrap();
        assert_eq!(meta.width, 576);
        assert_eq!(meta.height, 144);
    }

    #[test]
    fn test_jpeg_entries_use_jpg_extension() {
        let tmp = TempDir::new().unwrap();
        let src = write_png(tmp.path(), "a.png", 10, 10);
        let cache = ImageCache::open(tmp.path().join("cache"))
            .unwrap()
            .with_config(RenderConfig {
                output_format: OutputFormat::Jpeg,
                ..RenderConfig::default()
            });

        let path = cache.process(&src, None, None).unwrap();
        assert_eq!(path.extension().unwrap(), "jpg");
    }

    #[test]
    fn test_cleanup_zero_days_evicts_everything() {
        let tmp = TempDir::new().unwrap();
        let cache = ImageCache::open(tmp.path().join("cache")).unwrap();
        let a = write_png(tmp.path(), "a.png", 10, 10);
        let b = write_png(tmp.path(), "b.png", 20, 20);
        cache.process(&a, None, None).unwrap();
        cache.process(&b, None, None).unwrap();

        let report = cache.cleanup(0, u64::MAX).unwrap();
        assert_eq!(report.removed, 2);
        assert!(report.freed_bytes > 0);
        assert_eq!(cache.stats().total_files, 0);
        assert_eq!(cached_files(cache.dir()), 0);
    }

    #[test]
    fn test_cleanup_size_limit_evicts_oldest_first() {
        let tmp = TempDir::new().unwrap();
        let cache = ImageCache::open(tmp.path().join("cache")).unwrap();
        let a = write_png(tmp.path(), "a.png", 10, 10);
        let b = write_png(tmp.path(), "b.png", 20, 20);
        let old = cache.process(&a, None, None).unwrap();
        std::thread::sleep(std::time::Duration::from_millis(5));
        let new = cache.process(&b, None, None).unwrap();

        let newest_size = fs::metadata(&new).unwrap().len();
        let report = cache.cleanup(30, newest_size).unwrap();

        assert_eq!(report.removed, 1);
        assert!(!old.exists());
        assert!(new.exists());
    }

    #[test]
    fn test_cleanup_keeps_fresh_entries_within_limits() {
        let tmp = TempDir::new().unwrap();
        let cache = ImageCache::open(tmp.path().join("cache")).unwrap();
        let a = write_png(tmp.path(), "a.png", 10, 10);
        cache.process(&a, None, None).unwrap();

        let report = cache.cleanup(30, u64::MAX).unwrap();
        assert_eq!(report, CleanupReport::default());
        assert_eq!(cache.stats().total_files, 1);
    }

    #[test]
    fn test_cleanup_failed_delete_keeps_entry() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("cache");
        let cache = ImageCache::open(&dir).unwrap();
        let a = write_png(tmp.path(), "a.png", 10, 10);
        let b = write_png(tmp.path(), "b.png", 20, 20);
        let old = cache.process(&a, None, None).unwrap();
        std::thread::sleep(std::time::Duration::from_millis(5));
        let stuck = cache.process(&b, None, None).unwrap();

        // A non-empty directory in place of the image cannot be unlinked.
        fs::remove_file(&stuck).unwrap();
        fs::create_dir(&stuck).unwrap();
        fs::write(stuck.join("keep"), b"x").unwrap();

        assert!(cache.cleanup(0, u64::MAX).is_err());
        assert!(!old.exists());
        assert_eq!(cache.stats().total_files, 1);

        let reopened = ImageCache::open(&dir).unwrap();
        assert_eq!(reopened.stats().total_files, 1);
    }

    #[test]
    fn test_clear_failed_delete_keeps_entry() {
        let tmp = TempDir::new().unwrap();
        let cache = ImageCache::open(tmp.path().join("cache")).unwrap();
        let a = write_png(tmp.path(), "a.png", 10, 10);
        let stuck = cache.process(&a, None, None).unwrap();

        fs::remove_file(&stuck).unwrap();
        fs::create_dir(&stuck).unwrap();
        fs::write(stuck.join("keep"), b"x").unwrap();

        assert!(cache.clear().is_err());
        assert_eq!(cache.stats().total_files, 1);
    }

    #[test]
    fn test_clear_removes_files_and_index() {
        let tmp = TempDir::new().unwrap();
        let cache = ImageCache::open(tmp.path().join("cache")).unwrap();
        let a = write_png(tmp.path(), "a.png", 10, 10);
        cache.process(&a, None, None).unwrap();

        assert_eq!(cache.clear().unwrap(), 1);
        assert_eq!(cache.stats().total_files, 0);
        assert_eq!(cached_files(cache.dir()), 0);
    }
}

//! Seen-set for delivered codes
//!
//! Keeps the most recent normalized codes in a bounded LRU so the same drop
//! relayed from several chats, or edited and re-posted, is delivered once.
//! Optionally mirrors every new code to an append-only file so the set
//! survives restarts. The file is compacted to the newest `capacity` codes
//! each time it is loaded.

use log::{info, warn};
use lru::LruCache;
use std::collections::VecDeque;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

use crate::error::{RelayError, Result};

pub struct SeenCodes {
    codes: LruCache<String, ()>,
    log_path: Option<PathBuf>,
}

impl SeenCodes {
    /// Create an in-memory seen-set holding at most `capacity` codes
    pub fn new(capacity: usize) -> Result<Self> {
        let capacity = NonZeroUsize::new(capacity).ok_or_else(|| {
            RelayError::ConfigError("seen-set capacity must be greater than zero".to_string())
        })?;
        Ok(Self {
            codes: LruCache::new(capacity),
            log_path: None,
        })
    }

    /// Create a seen-set backed by a flat file, loading the codes already in it
    pub fn with_log(capacity: usize, path: impl AsRef<Path>) -> Result<Self> {
        let mut seen = Self::new(capacity)?;
        let path = path.as_ref().to_path_buf();

        if path.exists() {
            let reader = BufReader::new(File::open(&path)?);
            let mut total = 0;
            let mut recent: VecDeque<String> = VecDeque::with_capacity(capacity);
            for line in reader.lines() {
                let line = line?;
                let code = line.trim();
                if code.is_empty() {
                    continue;
                }
                total += 1;
                if recent.len() == capacity {
                    recent.pop_front();
                }
                recent.push_back(code.to_string());
            }

            if total > recent.len() {
                compact(&path, &recent)?;
                info!("Compacted {} to its {} newest codes", path.display(), recent.len());
            }
            for code in recent {
                seen.codes.put(code, ());
            }
            info!("Loaded {} seen codes from {}", seen.count(), path.display());
        }

        seen.log_path = Some(path);
        Ok(seen)
    }

    /// Record a normalized code. Returns `false` if it was already seen.
    pub fn insert(&mut self, normalized: &str) -> bool {
        if self.codes.get(normalized).is_some() {
            return false;
        }
        self.codes.put(normalized.to_string(), ());

        if let Some(path) = &self.log_path {
            if normalized.contains(['\n', '\r']) {
                warn!("Not logging code with a line break: {:?}", normalized);
            } else if let Err(e) = append_line(path, normalized) {
                warn!("Failed to append code to {}: {}", path.display(), e);
            }
        }
        true
    }

    pub fn contains(&self, normalized: &str) -> bool {
        self.codes.contains(normalized)
    }

    /// Get the number of remembered codes
    pub fn count(&self) -> usize {
        self.codes.len()
    }
}

// Written to a sibling file, then renamed over the log
fn compact(path: &Path, codes: &VecDeque<String>) -> std::io::Result<()> {
    let tmp = path.with_extension("compact");
    {
        let mut file = File::create(&tmp)?;
        for code in codes {
            writeln!(file, "{}", code)?;
        }
        file.flush()?;
    }
    fs::rename(&tmp, path)
}

fn append_line(path: &Path, line: &str) -> std::io::Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(file, "{}", line)
}

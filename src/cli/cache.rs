use anyhow::Result;
use std::path::PathBuf;

use mzscope::cache::{CacheCompression, DiskCache};

/// Report or clear the disk cache
pub fn run(cache_dir: Option<PathBuf>, clear: bool) -> Result<()> {
    let cache = DiskCache::new(cache_dir, CacheCompression::default())?;

    if clear {
        let removed = cache.clear()?;
        println!(
            "Removed {} cached artifact(s) from {}",
            removed,
            cache.dir().display()
        );
        return Ok(());
    }

    let bytes = cache.cache_size()?;
    println!("Cache directory: {}", cache.dir().display());
    println!(
        "Cached artifacts: {} bytes ({:.2} MB)",
        bytes,
        bytes as f64 / 1024.0 / 1024.0
    );

    Ok(())
}

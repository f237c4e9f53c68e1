//! Maintenance commands over an [`ImageCache`].

use std::io::Write;

use color_eyre::eyre::{Result, WrapErr, eyre};
use serde::Serialize;
use tracing::{debug, warn};

use crate::domain::entities::{CacheKey, ImageRef};
use crate::infrastructure::config::Command;
use crate::infrastructure::image::ImageCache;

/// Cache state of one URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusReport {
    /// Requested URL.
    pub url: String,
    /// Derived file name.
    pub key: Option<String>,
    /// Local path, when cached.
    pub path: Option<String>,
    /// Tier that answered, when cached.
    pub tier: Option<String>,
    /// Whether a fresh copy is cached.
    pub cached: bool,
}

#[derive(Debug, Serialize)]
struct SizeReport {
    bytes: u64,
    human: String,
}

/// Runs one command, writing its output to `out`.
///
/// # Errors
/// Returns error if the command fails or output cannot be written.
pub async fn run(cache: &ImageCache, command: Command, out: &mut impl Write) -> Result<()> {
    match command {
        Command::Source { url, fallback } => {
            let resolution = cache
                .resolve_image(Some(url.as_str()), ImageRef::Asset(fallback))
                .await;
            writeln!(out, "{}", resolution.image)?;
            if let Some(pending) = resolution.pending {
                match pending.await {
                    Ok(Some(path)) => debug!(path = %path.display(), "Background caching finished"),
                    Ok(None) => warn!(url = %url, "Background caching failed"),
                    Err(e) => warn!(url = %url, error = %e, "Background caching task failed"),
                }
            }
        }
        Command::Fetch { urls } => {
            let mut failed = 0usize;
            for url in &urls {
                if let Some((path, tier)) = cache.acquire(url).await {
                    writeln!(out, "{tier}: {}", path.display())?;
                } else {
                    writeln!(out, "failed: {url}")?;
                    failed += 1;
                }
            }
            if failed > 0 {
                return Err(eyre!("{failed} of {} downloads failed", urls.len()));
            }
        }
        Command::Status { url, json } => {
            let located = cache.locate(&url).await;
            let report = StatusReport {
                key: CacheKey::from_url(&url).map(|key| key.to_string()),
                path: located.as_ref().map(|(p, _)| p.display().to_string()),
                tier: located.as_ref().map(|(_, tier)| tier.to_string()),
                cached: located.is_some(),
                url,
            };
            if json {
                writeln!(out, "{}", serde_json::to_string_pretty(&report)?)?;
            } else if let (Some(path), Some(tier)) = (&report.path, &report.tier) {
                writeln!(out, "cached ({tier}): {path}")?;
            } else {
                writeln!(out, "not cached")?;
            }
        }
        Command::Size { json } => {
            let bytes = cache.cache_size().await;
            let report = SizeReport {
                bytes,
                human: format_bytes(bytes),
            };
            if json {
                writeln!(out, "{}", serde_json::to_string_pretty(&report)?)?;
            } else {
                writeln!(out, "{}", report.human)?;
            }
        }
        Command::Sweep => {
            let report = cache
                .clear_expired_cache()
                .await
                .wrap_err("Failed to sweep cache")?;
            writeln!(
                out,
                "scanned {}, removed {}, failed {}",
                report.scanned, report.removed, report.failed
            )?;
        }
        Command::Clear => {
            cache
                .clear_all_cache()
                .await
                .wrap_err("Failed to clear cache")?;
            writeln!(out, "cleared {}", cache.cache_dir().display())?;
        }
    }
    Ok(())
}

/// Formats a byte count with a binary unit.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["KiB", "MiB", "GiB", "TiB"];
    if bytes < 1024 {
        return format!("{bytes} B");
    }
    let mut value = bytes as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{value:.1} {}", UNITS[unit])
}

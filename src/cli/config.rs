//! TOML configuration file support for power users.
//!
//! Instead of passing many CLI flags, users can keep settings in a config
//! file:
//!
//! ```toml
//! # mzscope.toml
//! [render]
//! width = 1100
//! height = 550
//! fast_factor = 4
//! colormap = "viridis"
//!
//! [cache]
//! dir = "/var/tmp/mzscope"
//! compression = "zstd"
//!
//! [downsample]
//! max_count = 5000
//! coverage_fraction = 0.7
//!
//! [view]
//! history_depth = 10
//! ```
//!
//! Explicit CLI flags always win over config-file values.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use mzscope::cache::CacheCompression;
use mzscope::downsample::DownsampleConfig;
use mzscope::render::{Colormap, RenderConfig};
use mzscope::view::ViewOptions;

/// Root configuration structure for mzscope.toml files.
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    /// Tile rendering settings.
    #[serde(default)]
    pub render: RenderSection,

    /// Disk cache settings.
    #[serde(default)]
    pub cache: CacheSection,

    /// Spectrum downsampling settings.
    #[serde(default)]
    pub downsample: DownsampleSection,

    /// Viewport gesture settings.
    #[serde(default)]
    pub view: ViewSection,
}

/// Settings for the `[render]` section.
#[derive(Debug, Default, Deserialize)]
pub struct RenderSection {
    /// Plot width in pixels.
    pub width: Option<u32>,

    /// Plot height in pixels.
    pub height: Option<u32>,

    /// Linear grid reduction factor applied in fast mode.
    pub fast_factor: Option<u32>,

    /// Palette name (jet, hot, fire, viridis, plasma, inferno, magma).
    pub colormap: Option<String>,

    /// Maximum sparse-spread passes in full mode.
    pub spread_max_px: Option<u32>,
}

/// Settings for the `[cache]` section.
#[derive(Debug, Default, Deserialize)]
pub struct CacheSection {
    /// Cache directory.
    pub dir: Option<PathBuf>,

    /// Artifact compression: snappy, zstd, or none.
    pub compression: Option<String>,

    /// Row batch size for cached-table reads.
    pub batch_size: Option<usize>,
}

/// Settings for the `[downsample]` section.
#[derive(Debug, Default, Deserialize)]
pub struct DownsampleSection {
    /// Maximum number of points in a display selection.
    pub max_count: Option<usize>,

    /// Fraction of the budget reserved for uniform coverage.
    pub coverage_fraction: Option<f64>,
}

/// Settings for the `[view]` section.
#[derive(Debug, Default, Deserialize)]
pub struct ViewSection {
    /// Zoom history depth.
    pub history_depth: Option<usize>,

    /// Range multiplier per wheel tick zooming in.
    pub wheel_in: Option<f64>,

    /// Range multiplier per wheel tick zooming out.
    pub wheel_out: Option<f64>,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_str(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse TOML configuration")
    }

    /// Render parameters: config-file values over the defaults, explicit
    /// dimensions over both.
    pub fn render_config(&self, width: Option<u32>, height: Option<u32>) -> RenderConfig {
        let mut config = RenderConfig::default();
        if let Some(w) = self.render.width {
            config.plot_width = w;
        }
        if let Some(h) = self.render.height {
            config.plot_height = h;
        }
        if let Some(f) = self.render.fast_factor {
            config.fast_factor = f;
        }
        if let Some(s) = self.render.spread_max_px {
            config.spread_max_px = s;
        }
        if let Some(w) = width {
            config.plot_width = w;
        }
        if let Some(h) = height {
            config.plot_height = h;
        }
        config
    }

    /// Palette: an explicit choice wins over the config file, which wins
    /// over the default.
    pub fn colormap(&self, explicit: Option<Colormap>) -> Result<Colormap> {
        if let Some(cmap) = explicit {
            return Ok(cmap);
        }
        match &self.render.colormap {
            Some(name) => name.parse().map_err(|e: String| anyhow::anyhow!(e)),
            None => Ok(Colormap::default()),
        }
    }

    /// Cache compression from the config file, snappy when unset.
    pub fn cache_compression(&self) -> Result<CacheCompression> {
        match &self.cache.compression {
            Some(name) => name.parse().map_err(|e: String| anyhow::anyhow!(e)),
            None => Ok(CacheCompression::default()),
        }
    }

    /// Gesture parameters with config-file values applied over the defaults.
    pub fn view_options(&self) -> ViewOptions {
        let mut options = ViewOptions::default();
        if let Some(d) = self.view.history_depth {
            options.history_depth = d;
        }
        if let Some(w) = self.view.wheel_in {
            options.wheel_in = w;
        }
        if let Some(w) = self.view.wheel_out {
            options.wheel_out = w;
        }
        options
    }

    /// Downsampling policy with config-file values applied over the defaults.
    pub fn downsample_config(&self) -> DownsampleConfig {
        let mut config = DownsampleConfig::default();
        if let Some(n) = self.downsample.max_count {
            config.max_count = n;
        }
        if let Some(f) = self.downsample.coverage_fraction {
            config.coverage_fraction = f;
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() {
        let toml = r#"
            [render]
            width = 800
            height = 400
            fast_factor = 2
            colormap = "viridis"

            [cache]
            compression = "zstd"
            batch_size = 32768

            [downsample]
            max_count = 2000
            coverage_fraction = 0.5

            [view]
            history_depth = 5
        "#;

        let config = Config::from_str(toml).unwrap();
        assert_eq!(config.render.width, Some(800));
        assert_eq!(config.render.colormap.as_deref(), Some("viridis"));
        assert_eq!(config.cache.batch_size, Some(32_768));
        assert_eq!(config.downsample.max_count, Some(2_000));
        assert_eq!(config.view.history_depth, Some(5));
    }

    #[test]
    fn test_partial_config() {
        let toml = r#"
            [render]
            width = 640
        "#;

        let config = Config::from_str(toml).unwrap();
        assert_eq!(config.render.width, Some(640));
        assert_eq!(config.render.height, None);
        assert_eq!(config.cache.dir, None);
    }

    #[test]
    fn test_empty_config() {
        let config = Config::from_str("").unwrap();
        assert_eq!(config.render.width, None);

        let render = config.render_config(None, None);
        assert_eq!(render.plot_width, RenderConfig::default().plot_width);
    }

    #[test]
    fn test_flags_win_over_file() {
        let config = Config::from_str("[render]\nwidth = 1000\nheight = 500\n").unwrap();
        let render = config.render_config(Some(800), None);
        assert_eq!(render.plot_width, 800);
        assert_eq!(render.plot_height, 500);
    }

    #[test]
    fn test_colormap_resolution() {
        let config = Config::from_str("[render]\ncolormap = \"fire\"\n").unwrap();
        assert_eq!(config.colormap(None).unwrap(), Colormap::Fire);
        assert_eq!(
            config.colormap(Some(Colormap::Plasma)).unwrap(),
            Colormap::Plasma
        );

        let bad = Config::from_str("[render]\ncolormap = \"turbo\"\n").unwrap();
        assert!(bad.colormap(None).is_err());
    }

    #[test]
    fn test_cache_compression_resolution() {
        let config = Config::from_str("[cache]\ncompression = \"none\"\n").unwrap();
        assert_eq!(
            config.cache_compression().unwrap(),
            CacheCompression::Uncompressed
        );
        assert_eq!(
            Config::default().cache_compression().unwrap(),
            CacheCompression::Snappy
        );
    }
}

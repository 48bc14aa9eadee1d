use std::path::{Path, PathBuf};

use anyhow::anyhow;
use font_kit::family_name::FamilyName;
use font_kit::handle::Handle;
use font_kit::properties::Properties;
use font_kit::source::SystemSource;
use plotters::style::{register_font, FontStyle, RGBColor};

/// Family name every chart label is drawn with once a font file is registered.
pub const FONT_FAMILY: &str = "chat-charts";

pub const DEFAULT_FONT_PATH: &str = "/System/Library/Fonts/PingFang.ttc";

pub const FALLBACK_FONT_PATHS: &[&str] = &[
    "/System/Library/Fonts/Helvetica.ttc",
    "/Library/Fonts/Arial Unicode.ttf",
    "/usr/share/fonts/opentype/noto/NotoSansCJK-Regular.ttc",
    "/usr/share/fonts/noto-cjk/NotoSansCJK-Regular.ttc",
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "C:\\Windows\\Fonts\\msyh.ttc",
    "C:\\Windows\\Fonts\\arial.ttf",
];

#[derive(Debug, thiserror::Error)]
pub enum FontError {
    #[error("cannot read font file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{path} is not a usable font: {reason}")]
    Invalid { path: PathBuf, reason: String },
    #[error("no system sans-serif font: {0}")]
    System(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedFont {
    pub family: String,
    pub path: PathBuf,
}

/// Reads a font file and registers it with the plotting backend under `family`.
pub fn load_font(path: &Path, family: &str) -> Result<LoadedFont, FontError> {
    let bytes = std::fs::read(path).map_err(|source| FontError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    register_bytes(family, bytes, path.to_path_buf())
}

/// Registers the platform's default sans-serif face under `family`.
pub fn load_system_font(family: &str) -> Result<LoadedFont, FontError> {
    let handle = SystemSource::new()
        .select_best_match(&[FamilyName::SansSerif], &Properties::new())
        .map_err(|e| FontError::System(format!("{e:?}")))?;
    let font = handle
        .load()
        .map_err(|e| FontError::System(format!("{e:?}")))?;
    let bytes = font
        .copy_font_data()
        .ok_or_else(|| FontError::System(format!("{} has no readable data", font.full_name())))?;
    let origin = match &handle {
        Handle::Path { path, .. } => path.clone(),
        Handle::Memory { .. } => PathBuf::from(font.full_name()),
    };
    register_bytes(family, bytes.to_vec(), origin)
}

fn register_bytes(family: &str, bytes: Vec<u8>, path: PathBuf) -> Result<LoadedFont, FontError> {
    // The backend keeps registered fonts for the life of the process.
    let bytes: &'static [u8] = Box::leak(bytes.into_boxed_slice());
    register_font(family, FontStyle::Normal, bytes).map_err(|_| FontError::Invalid {
        path: path.clone(),
        reason: "not a parsable TrueType/OpenType font".to_string(),
    })?;
    Ok(LoadedFont {
        family: family.to_string(),
        path,
    })
}

/// Loads `preferred`, then the system sans-serif face, then the first loadable
/// entry of `fallbacks`.
pub fn resolve_font(preferred: &Path, fallbacks: &[&str]) -> anyhow::Result<LoadedFont> {
    match load_font(preferred, FONT_FAMILY) {
        Ok(font) => {
            tracing::debug!(path = %font.path.display(), "using configured font");
            return Ok(font);
        }
        Err(err) => {
            tracing::warn!("{err}; falling back to a system default font");
        }
    }

    match load_system_font(FONT_FAMILY) {
        Ok(font) => {
            tracing::warn!(path = %font.path.display(), "using system sans-serif font");
            return Ok(font);
        }
        Err(err) => tracing::debug!("{err}"),
    }

    for candidate in fallbacks {
        match load_font(Path::new(candidate), FONT_FAMILY) {
            Ok(font) => {
                tracing::warn!(path = %font.path.display(), "using fallback font");
                return Ok(font);
            }
            Err(err) => tracing::debug!("{err}"),
        }
    }

    Err(anyhow!(
        "no usable font: {}, the system sans-serif face and all {} fallbacks failed to load",
        preferred.display(),
        fallbacks.len()
    ))
}

pub fn hex_color(hex: &str) -> anyhow::Result<RGBColor> {
    let digits = hex.trim_start_matches('#');
    if digits.len() != 6 {
        return Err(anyhow!("invalid colour `{hex}`"));
    }
    let channel = |range: std::ops::Range<usize>| {
        u8::from_str_radix(&digits[range], 16).map_err(|_| anyhow!("invalid colour `{hex}`"))
    };
    Ok(RGBColor(channel(0..2)?, channel(2..4)?, channel(4..6)?))
}

/// Everything the chart functions need to know about appearance.
#[derive(Debug, Clone)]
pub struct RenderConfig {
    pub font_family: String,
    pub background: RGBColor,
    pub panel_background: RGBColor,
    pub text: RGBColor,
    pub muted_text: RGBColor,
    pub grid_line: RGBColor,
    /// Per-sender colours, cycled when there are more senders than entries.
    pub palette: Vec<RGBColor>,
    /// Heatmap colour ramp from "no messages" to "at or above vmax".
    pub heat_colors: Vec<RGBColor>,
    pub pie_size: (u32, u32),
    pub hourly_size: (u32, u32),
    pub comparison_size: (u32, u32),
    pub yearly_panel_size: (u32, u32),
    pub heatmap_row_height: u32,
    pub heatmap_cell: u32,
}

impl RenderConfig {
    pub fn with_font(font: &LoadedFont) -> Self {
        Self {
            font_family: font.family.clone(),
            ..Self::default()
        }
    }

    pub fn sender_color(&self, index: usize) -> RGBColor {
        self.palette[index % self.palette.len()]
    }

    pub fn font(&self, size: u32) -> (&str, u32) {
        (self.font_family.as_str(), size)
    }

    /// Maps a count onto the heat ramp, splitting `[0, vmax]` into equal bins.
    pub fn heat_color(&self, value: u64, vmax: f64) -> RGBColor {
        let levels = self.heat_colors.len();
        if vmax <= 0.0 {
            return self.heat_colors[0];
        }
        let t = (value as f64 / vmax).clamp(0.0, 1.0);
        let index = ((t * levels as f64) as usize).min(levels - 1);
        self.heat_colors[index]
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            font_family: FONT_FAMILY.to_string(),
            background: RGBColor(255, 255, 255),
            panel_background: RGBColor(0xF8, 0xF9, 0xFA),
            text: RGBColor(0x2C, 0x3E, 0x50),
            muted_text: RGBColor(0x66, 0x66, 0x66),
            grid_line: RGBColor(0xDD, 0xDD, 0xDD),
            palette: vec![
                RGBColor(0xFF, 0x6B, 0x6B),
                RGBColor(0x4E, 0xCD, 0xC4),
                RGBColor(0xFF, 0xD9, 0x3D),
                RGBColor(0x6C, 0x5C, 0xE7),
                RGBColor(0xA2, 0x9B, 0xFE),
            ],
            heat_colors: vec![
                RGBColor(0xEB, 0xED, 0xF0),
                RGBColor(0x9B, 0xE9, 0xA8),
                RGBColor(0x40, 0xC4, 0x63),
                RGBColor(0x30, 0xA1, 0x4E),
                RGBColor(0x21, 0x6E, 0x39),
            ],
            pie_size: (1000, 800),
            hourly_size: (1500, 800),
            comparison_size: (1800, 800),
            yearly_panel_size: (750, 600),
            heatmap_row_height: 230,
            heatmap_cell: 24,
        }
    }
}

/// Render settings for tests that write PNGs; `None` (with a note on stderr)
/// when the host has no loadable font at all.
#[cfg(test)]
pub(crate) fn test_render_config() -> Option<RenderConfig> {
    let missing = std::env::temp_dir().join("chat-charts-no-such-font.ttf");
    match resolve_font(&missing, FALLBACK_FONT_PATHS) {
        Ok(font) => Some(RenderConfig::with_font(&font)),
        Err(err) => {
            eprintln!("skipping PNG output check: {err}");
            None
        }
    }
}

//! Image color filters: brightness/contrast composed with a display-mode LUT.
//!
//! Brightness and contrast follow the CSS filter definitions
//! (`brightness(b)` scales, `contrast(c)` pivots around mid-gray) and are
//! applied before the display-mode lookup table.

use serde::{Deserialize, Serialize};

/// Brightness and contrast in percent (100 = unchanged).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ImageFilters {
    pub brightness: f32,
    pub contrast: f32,
}

impl ImageFilters {
    pub fn new(brightness: f32, contrast: f32) -> Self {
        Self {
            brightness: brightness.max(0.0),
            contrast: contrast.max(0.0),
        }
    }

    /// True when the filters leave pixels unchanged.
    pub fn is_identity(&self) -> bool {
        (self.brightness - 100.0).abs() < f32::EPSILON && (self.contrast - 100.0).abs() < f32::EPSILON
    }

    /// Apply brightness then contrast to one 8-bit channel value.
    pub fn adjust_channel(&self, value: u8) -> u8 {
        let v = value as f32 / 255.0;
        let v = v * self.brightness.max(0.0) / 100.0;
        let v = (v - 0.5) * self.contrast.max(0.0) / 100.0 + 0.5;
        (v.clamp(0.0, 1.0) * 255.0).round() as u8
    }
}

impl Default for ImageFilters {
    fn default() -> Self {
        Self {
            brightness: 100.0,
            contrast: 100.0,
        }
    }
}

/// Color lookup-table mode used to display microscopy channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayMode {
    #[default]
    Normal,
    Grayscale,
    Inverted,
    Fire,
    HiLo,
    Green,
}

impl DisplayMode {
    /// Get the display name for this mode.
    pub fn name(&self) -> &'static str {
        match self {
            DisplayMode::Normal => "Normal",
            DisplayMode::Grayscale => "Grayscale",
            DisplayMode::Inverted => "Inverted",
            DisplayMode::Fire => "Fire",
            DisplayMode::HiLo => "Hi-Lo",
            DisplayMode::Green => "Green",
        }
    }

    /// Get all display modes.
    pub fn all() -> &'static [DisplayMode] {
        &[
            DisplayMode::Normal,
            DisplayMode::Grayscale,
            DisplayMode::Inverted,
            DisplayMode::Fire,
            DisplayMode::HiLo,
            DisplayMode::Green,
        ]
    }

    /// Map a luminance value through this mode's lookup table.
    ///
    /// `Normal` and `Inverted` operate per channel and are handled in
    /// [`ColorFilter::apply_rgba`]; for them this returns plain gray.
    fn lookup(&self, l: u8) -> [u8; 3] {
        match self {
            DisplayMode::Normal | DisplayMode::Grayscale | DisplayMode::Inverted => [l, l, l],
            DisplayMode::Fire => {
                let v = l as u16 * 3;
                [
                    v.min(255) as u8,
                    v.saturating_sub(255).min(255) as u8,
                    v.saturating_sub(510).min(255) as u8,
                ]
            }
            DisplayMode::HiLo => match l {
                0 => [0, 0, 255],
                255 => [255, 0, 0],
                _ => [l, l, l],
            },
            DisplayMode::Green => [0, l, 0],
        }
    }
}

/// The full color transform applied to the image layer.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ColorFilter {
    pub filters: ImageFilters,
    pub mode: DisplayMode,
}

impl ColorFilter {
    pub fn new(filters: ImageFilters, mode: DisplayMode) -> Self {
        Self { filters, mode }
    }

    /// True when applying the filter would not change any pixel.
    pub fn is_identity(&self) -> bool {
        self.filters.is_identity() && self.mode == DisplayMode::Normal
    }

    /// Apply the filter to an RGBA8 buffer, returning a new buffer.
    /// Alpha is preserved.
    pub fn apply_rgba(&self, rgba: &[u8]) -> Vec<u8> {
        if self.is_identity() {
            return rgba.to_vec();
        }

        let mut adjust = [0u8; 256];
        for (i, slot) in adjust.iter_mut().enumerate() {
            *slot = self.filters.adjust_channel(i as u8);
        }
        let mut lut = [[0u8; 3]; 256];
        for (i, slot) in lut.iter_mut().enumerate() {
            *slot = self.mode.lookup(i as u8);
        }

        let mut out = Vec::with_capacity(rgba.len());
        for px in rgba.chunks_exact(4) {
            let r = adjust[px[0] as usize];
            let g = adjust[px[1] as usize];
            let b = adjust[px[2] as usize];
            let mapped = match self.mode {
                DisplayMode::Normal => [r, g, b],
                DisplayMode::Inverted => [255 - r, 255 - g, 255 - b],
                _ => lut[luma(r, g, b) as usize],
            };
            out.extend_from_slice(&[mapped[0], mapped[1], mapped[2], px[3]]);
        }
        out
    }
}

/// Rec. 601 luma.
fn luma(r: u8, g: u8, b: u8) -> u8 {
    (0.299 * r as f32 + 0.587 * g as f32 + 0.114 * b as f32).round() as u8
}

//! The caller-facing data model: color tables, frames, and the logical
//! screen configuration.

use crate::error::{Error, Result};

/// A single color table entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

/// An ordered table of 1 to 256 colors.
///
/// The GIF format constrains color tables to a power of two entries; on
/// output a table is padded with black entries up to `1 << bit_size()`.
/// Every pixel index referencing the table must be below [`ColorTable::len`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColorTable {
    entries: Vec<Rgb>,
    /// Index of the background color within this table.
    pub background_index: u8,
    /// Whether the entries are sorted in decreasing order of importance.
    /// Informational only; echoed in a flag bit on the wire.
    pub ordered: bool,
}

impl ColorTable {
    /// Create a color table.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::InvalidArgument`] if `entries` is empty or holds
    /// more than 256 colors.
    pub fn new(entries: Vec<Rgb>) -> Result<Self> {
        if entries.is_empty() {
            return Err(Error::InvalidArgument("color table must not be empty"));
        }
        if entries.len() > 256 {
            return Err(Error::InvalidArgument(
                "color table holds at most 256 entries",
            ));
        }
        Ok(Self {
            entries,
            background_index: 0,
            ordered: false,
        })
    }

    pub fn entries(&self) -> &[Rgb] {
        &self.entries
    }

    /// Declared number of entries, before any power-of-two padding.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The least `n` in 1..=8 such that `1 << n` covers every entry.
    pub fn bit_size(&self) -> u8 {
        for bits in 1..8 {
            if (1 << bits) >= self.entries.len() {
                return bits;
            }
        }
        8
    }

    /// Entry count after padding to the next power of two.
    pub(crate) fn padded_len(&self) -> usize {
        1 << self.bit_size()
    }
}

/// How a frame's pixels should be treated before the next frame is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DisposalMethod {
    /// The decoder is not required to take any action.
    None,
    /// The image is left in place.
    #[default]
    DoNotDispose,
    /// The area used by the image is restored to the background color.
    RestoreToBackground,
    /// The area used by the image is restored to its previous state.
    RestoreToPrevious,
}

impl DisposalMethod {
    pub(crate) fn to_bits(self) -> u8 {
        match self {
            DisposalMethod::None => 0,
            DisposalMethod::DoNotDispose => 1,
            DisposalMethod::RestoreToBackground => 2,
            DisposalMethod::RestoreToPrevious => 3,
        }
    }

    /// Reserved wire values decode as `None`, per the GIF89a "no action
    /// required" rule.
    pub(crate) fn from_bits(bits: u8) -> Self {
        match bits {
            1 => DisposalMethod::DoNotDispose,
            2 => DisposalMethod::RestoreToBackground,
            3 => DisposalMethod::RestoreToPrevious,
            _ => DisposalMethod::None,
        }
    }
}

/// A single frame of a GIF data stream.
///
/// `data` holds one palette index per pixel, row major, of length
/// `width * height`. On the write path a `width` or `height` of 0 means
/// "use the screen size".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Image {
    pub x: u16,
    pub y: u16,
    pub width: u16,
    pub height: u16,
    /// Delay before rendering the next frame, in centiseconds.
    pub delay_centis: u16,
    /// Index of the transparent color, if any.
    pub transparency_index: Option<u8>,
    pub disposal: DisposalMethod,
    /// Overrides the stream's global color table for this frame only.
    pub local_color_table: Option<ColorTable>,
    pub data: Vec<u8>,
}

/// Stream-level configuration: the logical screen descriptor plus the
/// global color table.
#[derive(Debug, Clone, PartialEq)]
pub struct Screen {
    pub width: u16,
    pub height: u16,
    /// Color resolution of the source material, in bits (1 to 8).
    pub color_resolution: u8,
    /// Pixel width divided by pixel height, or 0.0 for "no information".
    /// Encoded on the wire as `64 * ratio - 15`, which covers 0.25 to
    /// 4.21875; the encoder rejects other non-zero values.
    pub pixel_aspect_ratio: f64,
    pub global_color_table: Option<ColorTable>,
}

impl Default for Screen {
    fn default() -> Self {
        Self {
            width: 0,
            height: 0,
            color_resolution: 8,
            pixel_aspect_ratio: 1.0,
            global_color_table: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn color_table_bounds() {
        assert!(matches!(
            ColorTable::new(vec![]),
            Err(Error::InvalidArgument(_))
        ));
        assert!(matches!(
            ColorTable::new(vec![Rgb::new(0, 0, 0); 257]),
            Err(Error::InvalidArgument(_))
        ));
        assert!(ColorTable::new(vec![Rgb::new(0, 0, 0); 256]).is_ok());
    }

    #[test]
    fn bit_size() {
        let sizes = [
            (1, 1),
            (2, 1),
            (3, 2),
            (4, 2),
            (5, 3),
            (16, 4),
            (17, 5),
            (128, 7),
            (129, 8),
            (256, 8),
        ];
        for (len, bits) in sizes {
            let table = ColorTable::new(vec![Rgb::new(0, 0, 0); len]).unwrap();
            assert_eq!(table.bit_size(), bits, "{len} entries");
            assert_eq!(table.padded_len(), 1 << bits, "{len} entries");
        }
    }

    #[test]
    fn disposal_round_trip() {
        for method in [
            DisposalMethod::None,
            DisposalMethod::DoNotDispose,
            DisposalMethod::RestoreToBackground,
            DisposalMethod::RestoreToPrevious,
        ] {
            assert_eq!(DisposalMethod::from_bits(method.to_bits()), method);
        }
        // Reserved values fall back to no action.
        assert_eq!(DisposalMethod::from_bits(7), DisposalMethod::None);
    }

    #[test]
    fn image_defaults() {
        let image = Image::default();
        assert_eq!(image.disposal, DisposalMethod::DoNotDispose);
        assert_eq!(image.transparency_index, None);
        assert_eq!(image.delay_centis, 0);
    }
}

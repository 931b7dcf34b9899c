//! GIF container writer.

use std::io::Write;

use log::trace;

use crate::error::{Error, Result};
use crate::image::{ColorTable, Image, Screen};
use crate::io::{BitWriter, Truncate, MIN_CODE_LENGTH};
use crate::prefix::{ForwardPrefixTable, MAX_CODES};
use crate::{EXTENSION_INTRODUCER, GRAPHIC_CONTROL_LABEL, IMAGE_SEPARATOR, TRAILER};

/// The write path always emits 89a: the graphic control extension written
/// before every frame did not exist in 87a.
const SIGNATURE: &[u8; 6] = b"GIF89a";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Initial,
    Open,
    Closed,
    Broken,
}

/// Wraps the sink and tracks how many bytes went through, so removing the
/// trailer needs no `Seek` bound.
struct CountingWriter<W: Write> {
    inner: W,
    written: u64,
}

impl<W: Write> CountingWriter<W> {
    fn new(inner: W) -> Self {
        Self { inner, written: 0 }
    }
}

impl<W: Write> Write for CountingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let written = self.inner.write(buf)?;
        self.written += written as u64;
        Ok(written)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}

impl<W: Write + Truncate> CountingWriter<W> {
    fn truncate_to(&mut self, len: u64) -> std::io::Result<()> {
        self.inner.truncate(len)?;
        self.written = len;
        Ok(())
    }
}

/// Writes a GIF data stream to a byte sink.
///
/// The lifecycle is [`begin`](GifEncoder::begin), any number of
/// [`write_image`](GifEncoder::write_image) calls, then
/// [`end`](GifEncoder::end). Calls outside that order fail with
/// [`Error::InvalidOperation`]. Once any write fails, the encoder is broken
/// and every further operation fails; the sink may hold a truncated stream.
///
/// The encoder assumes it starts on an empty sink. On truncatable sinks a
/// closed encoder can be [reopened](GifEncoder::reopen) to append more
/// frames.
///
/// ```
/// use gifwerk::{ColorTable, GifEncoder, Image, Rgb, Screen};
///
/// let screen = Screen {
///     width: 2,
///     height: 2,
///     global_color_table: Some(ColorTable::new(vec![
///         Rgb::new(0, 0, 0),
///         Rgb::new(255, 255, 255),
///     ])?),
///     ..Screen::default()
/// };
/// let mut encoder = GifEncoder::new(Vec::new(), screen);
/// encoder.begin()?;
/// encoder.write_image(&Image {
///     data: vec![0, 1, 1, 0],
///     ..Image::default()
/// })?;
/// encoder.end()?;
/// let bytes = encoder.into_inner();
/// assert_eq!(&bytes[..6], b"GIF89a");
/// assert_eq!(bytes.last(), Some(&0x3B));
/// # Ok::<(), gifwerk::Error>(())
/// ```
pub struct GifEncoder<W: Write> {
    output: CountingWriter<W>,
    screen: Screen,
    state: State,
}

impl<W: Write> GifEncoder<W> {
    pub fn new(output: W, screen: Screen) -> Self {
        Self {
            output: CountingWriter::new(output),
            screen,
            state: State::Initial,
        }
    }

    pub fn into_inner(self) -> W {
        self.output.inner
    }

    pub fn get_ref(&self) -> &W {
        &self.output.inner
    }

    /// Write the signature, logical screen descriptor, and global color
    /// table. Must be the first operation.
    pub fn begin(&mut self) -> Result<()> {
        if self.state != State::Initial {
            return Err(Error::InvalidOperation("begin requires a fresh encoder"));
        }
        if !(1..=8).contains(&self.screen.color_resolution) {
            return Err(Error::InvalidArgument(
                "color resolution must be between 1 and 8 bits",
            ));
        }
        // The wire byte covers `64 * ratio - 15` for 1..=255 only.
        if self.screen.pixel_aspect_ratio != 0.0
            && !(0.25..=4.21875).contains(&self.screen.pixel_aspect_ratio)
        {
            return Err(Error::InvalidArgument(
                "pixel aspect ratio must be 0.0 or between 0.25 and 4.21875",
            ));
        }
        self.state = State::Broken;

        self.output.write_all(SIGNATURE)?;
        self.write_u16(self.screen.width)?;
        self.write_u16(self.screen.height)?;
        let mut packed = (self.screen.color_resolution - 1) << 4;
        let mut background = 0;
        if let Some(table) = &self.screen.global_color_table {
            packed |= 0x80 | (table.bit_size() - 1);
            if table.ordered {
                packed |= 0x08;
            }
            background = table.background_index;
        }
        let aspect = aspect_byte(self.screen.pixel_aspect_ratio);
        self.output.write_all(&[packed, background, aspect])?;
        if let Some(table) = &self.screen.global_color_table {
            write_color_table(&mut self.output, table)?;
        }
        trace!("wrote header, screen {}x{}", self.screen.width, self.screen.height);

        self.state = State::Open;
        Ok(())
    }

    /// Write one frame: graphic control extension, image descriptor, local
    /// color table if any, and the compressed image data.
    ///
    /// A `width` or `height` of 0 stands for the screen size. The data
    /// length must match the effective dimensions and every pixel index
    /// must fall inside the active color table.
    pub fn write_image(&mut self, image: &Image) -> Result<()> {
        if self.state != State::Open {
            return Err(Error::InvalidOperation("write_image requires an open encoder"));
        }
        let width = if image.width == 0 { self.screen.width } else { image.width };
        let height = if image.height == 0 { self.screen.height } else { image.height };
        let table = image
            .local_color_table
            .as_ref()
            .or(self.screen.global_color_table.as_ref())
            .ok_or(Error::InvalidArgument(
                "image has neither a local nor a global color table",
            ))?;
        if image.data.len() != usize::from(width) * usize::from(height) {
            return Err(Error::InvalidArgument(
                "image data length does not match its dimensions",
            ));
        }
        let table_len = table.len();
        if image.data.iter().any(|&index| usize::from(index) >= table_len) {
            return Err(Error::InvalidArgument(
                "pixel index outside the active color table",
            ));
        }
        let code_size = table.bit_size().max(MIN_CODE_LENGTH);
        self.state = State::Broken;

        // Graphic control extension.
        let mut packed = image.disposal.to_bits() << 2;
        if image.transparency_index.is_some() {
            packed |= 0x01;
        }
        self.output
            .write_all(&[EXTENSION_INTRODUCER, GRAPHIC_CONTROL_LABEL, 4, packed])?;
        self.write_u16(image.delay_centis)?;
        self.output
            .write_all(&[image.transparency_index.unwrap_or(0), 0])?;

        // Image descriptor.
        self.output.write_all(&[IMAGE_SEPARATOR])?;
        self.write_u16(image.x)?;
        self.write_u16(image.y)?;
        self.write_u16(width)?;
        self.write_u16(height)?;
        let mut packed = 0u8;
        if let Some(table) = &image.local_color_table {
            packed |= 0x80 | (table.bit_size() - 1);
            if table.ordered {
                packed |= 0x40;
            }
        }
        self.output.write_all(&[packed])?;
        if let Some(table) = &image.local_color_table {
            write_color_table(&mut self.output, table)?;
        }

        self.write_image_data(&image.data, code_size)?;
        trace!("wrote {width}x{height} frame");

        self.state = State::Open;
        Ok(())
    }

    /// Write the trailer and flush the sink.
    pub fn end(&mut self) -> Result<()> {
        if self.state != State::Open {
            return Err(Error::InvalidOperation("end requires an open encoder"));
        }
        self.state = State::Broken;
        self.output.write_all(&[TRAILER])?;
        self.output.flush()?;
        self.state = State::Closed;
        Ok(())
    }

    fn write_u16(&mut self, value: u16) -> Result<()> {
        self.output.write_all(&value.to_le_bytes())?;
        Ok(())
    }

    /// LZW-compress one frame's pixel indices: minimum code size byte,
    /// Clear, greedy longest-match codes, End, sub-block terminator.
    fn write_image_data(&mut self, data: &[u8], code_size: u8) -> Result<()> {
        self.output.write_all(&[code_size])?;

        let clear: u16 = 1 << code_size;
        let end = clear + 1;
        let mut next_code = clear + 2;

        let mut table = ForwardPrefixTable::new();
        for code in 0..clear {
            table.add(code, None, code as u8);
        }

        let mut writer = BitWriter::new(&mut self.output, code_size + 1)?;
        writer.write_bits(clear)?;

        let mut pos = 0;
        while pos < data.len() {
            let (code, length) = match table.find(data, pos) {
                (Some(code), length) => (code, length),
                (None, _) => {
                    return Err(Error::InvalidArgument(
                        "pixel index outside the active color table",
                    ))
                }
            };
            writer.write_bits(code)?;
            // No entry for a match ending at the last byte: the decoder
            // would never see the code that completes it.
            if usize::from(next_code) < MAX_CODES && pos + length < data.len() {
                table.add(next_code, Some(code), data[pos + length]);
                if next_code >= (1 << writer.code_length()) {
                    writer.set_code_length(writer.code_length() + 1)?;
                }
                next_code += 1;
            }
            pos += length;
        }

        writer.write_bits(end)?;
        writer.flush_bits()?;
        writer.flush_bytes()?;
        drop(writer);
        self.output.write_all(&[0x00])?;
        Ok(())
    }
}

impl<W: Write + Truncate> GifEncoder<W> {
    /// Remove the trailer from a closed stream so more frames can be
    /// appended. Requires a sink that can be shortened in place.
    pub fn reopen(&mut self) -> Result<()> {
        if self.state != State::Closed {
            return Err(Error::InvalidOperation("reopen requires a closed encoder"));
        }
        self.state = State::Broken;
        let len = self.output.written - 1;
        self.output.truncate_to(len)?;
        self.state = State::Open;
        Ok(())
    }
}

/// A [`GifEncoder`] that keeps the sink structurally complete.
///
/// The header and trailer are written on construction; every
/// [`write_image`](StreamingEncoder::write_image) reopens the stream,
/// appends the frame, and closes it again. At any point between calls the
/// sink holds a valid GIF, so a recording that stops abruptly still plays.
pub struct StreamingEncoder<W: Write + Truncate> {
    inner: GifEncoder<W>,
}

impl<W: Write + Truncate> StreamingEncoder<W> {
    pub fn new(output: W, screen: Screen) -> Result<Self> {
        let mut inner = GifEncoder::new(output, screen);
        inner.begin()?;
        inner.end()?;
        Ok(Self { inner })
    }

    /// Append one frame, leaving the sink closed.
    pub fn write_image(&mut self, image: &Image) -> Result<()> {
        self.inner.reopen()?;
        self.inner.write_image(image)?;
        self.inner.end()
    }

    pub fn into_inner(self) -> W {
        self.inner.into_inner()
    }

    pub fn get_ref(&self) -> &W {
        self.inner.get_ref()
    }
}

fn aspect_byte(ratio: f64) -> u8 {
    if ratio == 0.0 {
        0
    } else {
        (64.0 * ratio - 15.0) as u8
    }
}

fn write_color_table<W: Write>(output: &mut W, table: &ColorTable) -> Result<()> {
    for entry in table.entries() {
        output.write_all(&[entry.r, entry.g, entry.b])?;
    }
    // Pad to a power of two entries with black.
    for _ in table.len()..table.padded_len() {
        output.write_all(&[0, 0, 0])?;
    }
    Ok(())
}

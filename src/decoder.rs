//! GIF container reader.

use std::io::{ErrorKind, Read};

use log::trace;

use crate::error::{Error, Result};
use crate::image::{ColorTable, DisposalMethod, Image, Rgb, Screen};
use crate::io::{BitReader, MIN_CODE_LENGTH};
use crate::prefix::{ReversePrefixTable, MAX_CODES};
use crate::{EXTENSION_INTRODUCER, GRAPHIC_CONTROL_LABEL, IMAGE_SEPARATOR, TRAILER};

/// A fully decoded GIF data stream.
#[derive(Debug, Clone, PartialEq)]
pub struct Gif {
    pub screen: Screen,
    pub images: Vec<Image>,
}

/// Reads a GIF data stream from a byte source.
///
/// Frames can be streamed through a callback with
/// [`read_with`](GifDecoder::read_with) or collected with
/// [`read_to_end`](GifDecoder::read_to_end). Both GIF87a and GIF89a inputs
/// are accepted. Error messages carry the byte offset of the offending
/// structure where one can be pinned down.
pub struct GifDecoder<R: Read> {
    input: R,
    offset: u64,
}

impl<R: Read> GifDecoder<R> {
    pub fn new(input: R) -> Self {
        Self { input, offset: 0 }
    }

    /// Decode the whole stream into a [`Gif`].
    pub fn read_to_end(self) -> Result<Gif> {
        let mut images = Vec::new();
        let screen = self.read_with(|image| {
            images.push(image);
            Ok(())
        })?;
        Ok(Gif { screen, images })
    }

    /// Decode the stream, handing each frame to `handler` as soon as it is
    /// complete, and return the logical screen.
    ///
    /// An error returned by the handler aborts the decode and propagates.
    pub fn read_with<F>(mut self, mut handler: F) -> Result<Screen>
    where
        F: FnMut(Image) -> Result<()>,
    {
        let screen = self.read_header()?;
        let mut pending: Option<Image> = None;
        loop {
            let label = self.read_u8()?;
            match label {
                TRAILER => break,
                EXTENSION_INTRODUCER => self.read_extension(&mut pending)?,
                IMAGE_SEPARATOR => {
                    // Attributes from a preceding graphic control extension
                    // apply to this frame only.
                    let mut image = pending.take().unwrap_or_default();
                    self.read_image_descriptor(&mut image)?;
                    self.read_image_data(&screen, &mut image)?;
                    trace!("decoded {}x{} frame", image.width, image.height);
                    handler(image)?;
                }
                other => {
                    return Err(Error::MalformedGif(format!(
                        "unrecognized block label 0x{other:02X} at offset {}",
                        self.offset - 1
                    )));
                }
            }
        }
        Ok(screen)
    }

    fn read_header(&mut self) -> Result<Screen> {
        let mut signature = [0u8; 6];
        self.read_exact_into(&mut signature)?;
        if &signature[..3] != b"GIF" {
            return Err(Error::MalformedGif("invalid signature".to_string()));
        }
        if &signature[3..] != b"87a" && &signature[3..] != b"89a" {
            return Err(Error::MalformedGif("unrecognized version".to_string()));
        }

        let width = self.read_u16()?;
        let height = self.read_u16()?;
        let packed = self.read_u8()?;
        let background = self.read_u8()?;
        let aspect = self.read_u8()?;

        let global_color_table = if packed & 0x80 != 0 {
            let mut table = self.read_color_table(1 << ((packed & 0x07) + 1))?;
            table.background_index = background;
            table.ordered = packed & 0x08 != 0;
            Some(table)
        } else {
            None
        };

        Ok(Screen {
            width,
            height,
            color_resolution: ((packed >> 4) & 0x07) + 1,
            pixel_aspect_ratio: if aspect == 0 {
                0.0
            } else {
                (f64::from(aspect) + 15.0) / 64.0
            },
            global_color_table,
        })
    }

    fn read_extension(&mut self, pending: &mut Option<Image>) -> Result<()> {
        let label = self.read_u8()?;
        if label == GRAPHIC_CONTROL_LABEL {
            *pending = Some(self.read_graphic_control()?);
        } else {
            trace!("skipping extension 0x{label:02X}");
            self.skip_sub_blocks()?;
        }
        Ok(())
    }

    fn read_graphic_control(&mut self) -> Result<Image> {
        let offset = self.offset;
        let length = self.read_u8()?;
        if length != 4 {
            return Err(Error::MalformedGif(format!(
                "graphic control extension of length {length} at offset {offset}"
            )));
        }
        let packed = self.read_u8()?;
        let delay_centis = self.read_u16()?;
        let transparency = self.read_u8()?;
        let terminator = self.read_u8()?;
        if terminator != 0 {
            return Err(Error::MalformedGif(format!(
                "graphic control extension terminated by 0x{terminator:02X} at offset {}",
                self.offset - 1
            )));
        }
        Ok(Image {
            delay_centis,
            transparency_index: (packed & 0x01 != 0).then_some(transparency),
            disposal: DisposalMethod::from_bits((packed >> 2) & 0x07),
            ..Image::default()
        })
    }

    fn skip_sub_blocks(&mut self) -> Result<()> {
        let mut buf = [0u8; 255];
        loop {
            let size = usize::from(self.read_u8()?);
            if size == 0 {
                return Ok(());
            }
            self.read_exact_into(&mut buf[..size])?;
        }
    }

    fn read_image_descriptor(&mut self, image: &mut Image) -> Result<()> {
        image.x = self.read_u16()?;
        image.y = self.read_u16()?;
        image.width = self.read_u16()?;
        image.height = self.read_u16()?;
        let packed = self.read_u8()?;
        image.local_color_table = if packed & 0x80 != 0 {
            let mut table = self.read_color_table(1 << ((packed & 0x07) + 1))?;
            table.ordered = packed & 0x40 != 0;
            Some(table)
        } else {
            None
        };
        Ok(())
    }

    fn read_image_data(&mut self, screen: &Screen, image: &mut Image) -> Result<()> {
        let table = image
            .local_color_table
            .as_ref()
            .or(screen.global_color_table.as_ref())
            .ok_or_else(|| {
                Error::MalformedGif("image has neither a local nor a global color table".to_string())
            })?;
        let expected = table.bit_size().max(MIN_CODE_LENGTH);
        let offset = self.offset;
        let code_size = self.read_u8()?;
        if code_size != expected {
            return Err(Error::MalformedGif(format!(
                "minimum code size {code_size} at offset {offset}, expected {expected}"
            )));
        }

        let pixel_count = usize::from(image.width) * usize::from(image.height);
        let mut data: Vec<u8> = Vec::with_capacity(pixel_count);

        let clear: u16 = 1 << code_size;
        let end = clear + 1;
        let mut next_code = usize::from(clear) + 2;
        let mut code_length = code_size + 1;

        let mut table = ReversePrefixTable::new();
        for code in 0..clear {
            table.add_root(code, code as u8);
        }

        let data_offset = self.offset;
        let consumed;
        {
            let mut reader = BitReader::new(&mut self.input, code_length)?;
            // The entry defined by each code is only completed by the code
            // after it, so it is carried here as (code to define, parent).
            let mut pending_entry: Option<(u16, u16)> = None;
            let mut pos = 0;
            loop {
                let code = reader.read_code()?;
                if code == clear {
                    table = ReversePrefixTable::new();
                    for c in 0..clear {
                        table.add_root(c, c as u8);
                    }
                    next_code = usize::from(clear) + 2;
                    code_length = code_size + 1;
                    reader.set_code_length(code_length)?;
                    pending_entry = None;
                    continue;
                }
                if code == end {
                    reader.clear()?;
                    consumed = reader.bytes_read();
                    break;
                }

                let length = match pending_entry {
                    // The code being defined right now: its string is the
                    // previous one plus that string's own first byte.
                    Some((update, last)) if code == update => {
                        let previous = table.find(last).ok_or_else(|| {
                            Error::MalformedGif(format!(
                                "unrecognized code {last} near offset {}",
                                data_offset + reader.bytes_read()
                            ))
                        })?;
                        let length = previous.len() + 1;
                        if pos + length > pixel_count {
                            return Err(Error::MalformedGif(format!(
                                "code {code} at pixel {pos} overflows image near offset {}",
                                data_offset + reader.bytes_read()
                            )));
                        }
                        let first = previous[0];
                        data.extend_from_slice(previous);
                        data.push(first);
                        length
                    }
                    _ => {
                        let sequence = table.find(code).ok_or_else(|| {
                            Error::MalformedGif(format!(
                                "unrecognized code {code} near offset {}",
                                data_offset + reader.bytes_read()
                            ))
                        })?;
                        if pos + sequence.len() > pixel_count {
                            return Err(Error::MalformedGif(format!(
                                "code {code} at pixel {pos} overflows image near offset {}",
                                data_offset + reader.bytes_read()
                            )));
                        }
                        data.extend_from_slice(sequence);
                        sequence.len()
                    }
                };

                if let Some((update, last)) = pending_entry {
                    table.add(update, last, data[pos]);
                }
                pos += length;

                // The encoder defines no entry for a match that ends the
                // input, so once the image is full there is nothing to
                // schedule and the code width must not grow either.
                if next_code < MAX_CODES && pos < pixel_count {
                    pending_entry = Some((next_code as u16, code));
                    if next_code >= (1 << code_length) {
                        code_length += 1;
                        reader.set_code_length(code_length)?;
                    }
                    next_code += 1;
                } else {
                    pending_entry = None;
                }
            }
        }
        self.offset += consumed;

        // A stream that ends early leaves the remaining pixels as color 0.
        data.resize(pixel_count, 0);
        image.data = data;
        Ok(())
    }

    fn read_color_table(&mut self, len: usize) -> Result<ColorTable> {
        let mut entries = Vec::with_capacity(len);
        let mut buf = [0u8; 3];
        for _ in 0..len {
            self.read_exact_into(&mut buf)?;
            entries.push(Rgb::new(buf[0], buf[1], buf[2]));
        }
        ColorTable::new(entries)
    }

    fn read_u8(&mut self) -> Result<u8> {
        let mut buf = [0u8; 1];
        self.read_exact_into(&mut buf)?;
        Ok(buf[0])
    }

    fn read_u16(&mut self) -> Result<u16> {
        let mut buf = [0u8; 2];
        self.read_exact_into(&mut buf)?;
        Ok(u16::from_le_bytes(buf))
    }

    fn read_exact_into(&mut self, buf: &mut [u8]) -> Result<()> {
        match self.input.read_exact(buf) {
            Ok(()) => {
                self.offset += buf.len() as u64;
                Ok(())
            }
            Err(error) if error.kind() == ErrorKind::UnexpectedEof => Err(Error::TruncatedInput),
            Err(error) => Err(error.into()),
        }
    }
}

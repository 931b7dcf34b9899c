//! GIF87a/89a encoder and decoder, self-contained.
//!
//! This crate reads and writes the GIF container format from first
//! principles, including its embedded variable-code-size LZW compression.
//! It works with palette indices, not pixels: quantization, rendering, and
//! interlacing are out of scope.
//!
//! The encoder works with any [std::io::Write], the decoder with any
//! [std::io::Read]. On truncatable sinks (files, in-memory cursors), the
//! [`StreamingEncoder`] keeps the output a structurally complete GIF after
//! every frame, so an interrupted recording still plays.
//!
//! # Examples
//!
//! ```
//! use gifwerk::{ColorTable, GifDecoder, GifEncoder, Image, Rgb, Screen};
//!
//! let screen = Screen {
//!     width: 2,
//!     height: 2,
//!     global_color_table: Some(ColorTable::new(vec![
//!         Rgb::new(0, 0, 0),
//!         Rgb::new(255, 0, 0),
//!         Rgb::new(0, 255, 0),
//!         Rgb::new(0, 0, 255),
//!     ])?),
//!     ..Screen::default()
//! };
//!
//! let mut encoder = GifEncoder::new(Vec::new(), screen);
//! encoder.begin()?;
//! encoder.write_image(&Image {
//!     data: vec![0, 1, 2, 3],
//!     ..Image::default()
//! })?;
//! encoder.end()?;
//! let bytes = encoder.into_inner();
//!
//! let gif = GifDecoder::new(&bytes[..]).read_to_end()?;
//! assert_eq!(gif.images.len(), 1);
//! assert_eq!(gif.images[0].data, [0, 1, 2, 3]);
//! # Ok::<(), gifwerk::Error>(())
//! ```

pub mod decoder;
pub mod encoder;
mod error;
mod image;
mod io;
mod prefix;

pub use decoder::{Gif, GifDecoder};
pub use encoder::{GifEncoder, StreamingEncoder};
pub use error::{Error, Result};
pub use image::{ColorTable, DisposalMethod, Image, Rgb, Screen};
pub use io::Truncate;

// Block labels shared by the two directions.
pub(crate) const EXTENSION_INTRODUCER: u8 = 0x21;
pub(crate) const GRAPHIC_CONTROL_LABEL: u8 = 0xF9;
pub(crate) const IMAGE_SEPARATOR: u8 = 0x2C;
pub(crate) const TRAILER: u8 = 0x3B;

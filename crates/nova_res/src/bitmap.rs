//! Palettes and NOVA bitmaps.
//!
//! Resources named `.pcx` with [`ResourceFlags::RAW_BITMAP`] set are not PCX files but raw 8-bit
//! bitmaps. They start with a 10-byte header followed by one palette index per pixel:
//!
//! | Offset (bytes) | Field    | Description                          |
//! |----------------|----------|--------------------------------------|
//! | 0x0000         | Width    | 2 bytes                              |
//! | 0x0002         | Height   | 2 bytes                              |
//! | 0x0004         | Scale    | 2 bytes: always 5                    |
//! | 0x0006         | X Center | 2 bytes: always 0                    |
//! | 0x0008         | Type     | 2 bytes: `0x000B` for bitmaps        |
//!
//! Colors come from a separate palette file: 8 bytes of header followed by 256 RGB triplets.

use std::io::{Cursor, Read};

use byteorder::{LittleEndian, ReadBytesExt};
use tracing::instrument;

use crate::error::{Error, Result};
use crate::types::ResourceFlags;

/// Size of a palette file
pub const PALETTE_FILE_SIZE: usize = 776;

/// Bitmap type tag
pub const TYPE_BITMAP: u16 = 0x000B;

const PALETTE_HEADER_SIZE: usize = 8;
const BITMAP_HEADER_SIZE: usize = 10;
const BITMAP_SCALE: u16 = 5;

/// 256 RGB colors
#[derive(Clone, PartialEq, Eq)]
pub struct Palette {
    colors: Box<[u8; 768]>,
}

impl std::fmt::Debug for Palette {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Palette").finish_non_exhaustive()
    }
}

impl Palette {
    /// Read a palette file
    pub fn read<R: Read>(mut reader: R) -> Result<Palette> {
        let mut blob = Vec::with_capacity(PALETTE_FILE_SIZE);
        reader
            .by_ref()
            .take(PALETTE_FILE_SIZE as u64 + 1)
            .read_to_end(&mut blob)?;
        if blob.len() != PALETTE_FILE_SIZE {
            return Err(Error::InvalidPalette {
                expected: PALETTE_FILE_SIZE,
                actual: blob.len(),
            });
        }

        let mut colors = Box::new([0u8; 768]);
        colors.copy_from_slice(&blob[PALETTE_HEADER_SIZE..]);
        Ok(Palette { colors })
    }

    /// RGB triplets, 768 bytes
    pub fn as_rgb(&self) -> &[u8] {
        &self.colors[..]
    }

    /// Color for a palette index
    pub fn color(&self, index: u8) -> [u8; 3] {
        let i = index as usize * 3;
        [self.colors[i], self.colors[i + 1], self.colors[i + 2]]
    }
}

/// An 8-bit indexed image decoded from a NOVA bitmap
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bitmap {
    /// Width in pixels
    pub width: u16,
    /// Height in pixels
    pub height: u16,
    /// Palette indices, row-major
    pub pixels: Vec<u8>,
}

impl Bitmap {
    /// Parse the payload of a bitmap resource, applying the transpose flag.
    #[instrument(skip(data), fields(len = data.len()), err)]
    pub fn parse(data: &[u8], flags: ResourceFlags) -> Result<Bitmap> {
        let mut header = Cursor::new(data);
        let mut field = || {
            header
                .read_u16::<LittleEndian>()
                .map_err(|_| Error::InvalidBitmap("header is truncated".into()))
        };
        let width = field()?;
        let height = field()?;
        let scale = field()?;
        let x_center = field()?;
        let kind = field()?;

        if scale != BITMAP_SCALE {
            return Err(Error::InvalidBitmap(format!("unexpected scale {scale}")));
        }
        if x_center != 0 {
            return Err(Error::InvalidBitmap(format!(
                "unexpected x center {x_center}"
            )));
        }
        if kind != TYPE_BITMAP {
            return Err(Error::InvalidBitmap(format!("unexpected type {kind:#06x}")));
        }

        let count = width as usize * height as usize;
        let pixels = &data[BITMAP_HEADER_SIZE..];
        if pixels.len() < count {
            return Err(Error::InvalidBitmap(format!(
                "{width}x{height} needs {count} pixels, found {}",
                pixels.len()
            )));
        }

        let bitmap = Bitmap {
            width,
            height,
            pixels: pixels[..count].to_vec(),
        };

        Ok(if flags.is_transposed() {
            bitmap.transpose()
        } else {
            bitmap
        })
    }

    /// Swap rows and columns
    pub fn transpose(&self) -> Bitmap {
        let (w, h) = (self.width as usize, self.height as usize);
        let mut pixels = vec![0u8; self.pixels.len()];
        for y in 0..h {
            for x in 0..w {
                pixels[x * h + y] = self.pixels[y * w + x];
            }
        }
        Bitmap {
            width: self.height,
            height: self.width,
            pixels,
        }
    }

    /// Expand into RGB triplets using `palette`
    pub fn to_rgb(&self, palette: &Palette) -> Vec<u8> {
        self.pixels
            .iter()
            .flat_map(|&index| palette.color(index))
            .collect()
    }

    /// Write as an indexed PNG using `palette`
    #[cfg(feature = "png")]
    #[instrument(skip(self, writer, palette), err)]
    pub fn write_png<W: std::io::Write>(&self, writer: W, palette: &Palette) -> Result<()> {
        let mut encoder = png::Encoder::new(writer, self.width as u32, self.height as u32);
        encoder.set_color(png::ColorType::Indexed);
        encoder.set_depth(png::BitDepth::Eight);
        encoder.set_palette(palette.as_rgb().to_vec());

        let mut writer = encoder.write_header()?;
        writer.write_image_data(&self.pixels)?;
        writer.finish()?;
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use std::io::Cursor;

    use pretty_assertions::assert_eq;

    use super::{Bitmap, Palette, PALETTE_FILE_SIZE};
    use crate::error::{Error, Result};
    use crate::types::ResourceFlags;

    fn bitmap_data(width: u16, height: u16, pixels: &[u8]) -> Vec<u8> {
        let mut data = Vec::new();
        for field in [width, height, 5, 0, 0x000B] {
            data.extend(field.to_le_bytes());
        }
        data.extend(pixels);
        data
    }

    fn gray_palette() -> Palette {
        let mut blob = vec![0u8; 8];
        for i in 0..=255u8 {
            blob.extend([i, i, i]);
        }
        Palette::read(Cursor::new(blob)).unwrap()
    }

    #[test]
    fn read_palette() -> Result<()> {
        let mut blob = vec![0xEE; 8];
        blob.extend((0..768).map(|i| (i % 256) as u8));

        let palette = Palette::read(Cursor::new(blob))?;
        assert_eq!(palette.color(0), [0, 1, 2]);
        assert_eq!(palette.color(255), [253, 254, 255]);

        Ok(())
    }

    #[test]
    fn read_palette_wrong_size() {
        let short = Palette::read(Cursor::new(vec![0u8; 775]));
        assert!(matches!(
            short,
            Err(Error::InvalidPalette {
                expected: PALETTE_FILE_SIZE,
                actual: 775,
            })
        ));

        let long = Palette::read(Cursor::new(vec![0u8; 800]));
        assert!(matches!(long, Err(Error::InvalidPalette { actual: 777, .. })));
    }

    #[test]
    fn parse_bitmap() -> Result<()> {
        let data = bitmap_data(3, 2, &[1, 2, 3, 4, 5, 6, 0xFF]);

        let bitmap = Bitmap::parse(&data, ResourceFlags(ResourceFlags::RAW_BITMAP))?;
        assert_eq!(bitmap.width, 3);
        assert_eq!(bitmap.height, 2);
        assert_eq!(bitmap.pixels, vec![1, 2, 3, 4, 5, 6]);

        Ok(())
    }

    #[test]
    fn parse_transposed_bitmap() -> Result<()> {
        let data = bitmap_data(3, 2, &[1, 2, 3, 4, 5, 6]);

        let bitmap = Bitmap::parse(&data, ResourceFlags(0x03))?;
        assert_eq!(bitmap.width, 2);
        assert_eq!(bitmap.height, 3);
        assert_eq!(bitmap.pixels, vec![1, 4, 2, 5, 3, 6]);

        Ok(())
    }

    #[test]
    fn parse_bitmap_rejects_bad_header() {
        let mut data = bitmap_data(1, 1, &[0]);
        data[4] = 4;
        assert!(matches!(
            Bitmap::parse(&data, ResourceFlags::default()),
            Err(Error::InvalidBitmap(_))
        ));

        assert!(matches!(
            Bitmap::parse(&data[..6], ResourceFlags::default()),
            Err(Error::InvalidBitmap(_))
        ));
    }

    #[test]
    fn parse_bitmap_rejects_missing_pixels() {
        let data = bitmap_data(4, 4, &[0; 15]);
        assert!(matches!(
            Bitmap::parse(&data, ResourceFlags::default()),
            Err(Error::InvalidBitmap(_))
        ));
    }

    #[test]
    fn expand_to_rgb() -> Result<()> {
        let bitmap = Bitmap::parse(&bitmap_data(2, 1, &[7, 9]), ResourceFlags::default())?;
        assert_eq!(bitmap.to_rgb(&gray_palette()), vec![7, 7, 7, 9, 9, 9]);

        Ok(())
    }

    #[cfg(feature = "png")]
    #[test]
    fn write_png() -> Result<()> {
        let bitmap = Bitmap::parse(&bitmap_data(2, 2, &[0, 1, 2, 3]), ResourceFlags::default())?;

        let mut out = Vec::new();
        bitmap.write_png(&mut out, &gray_palette())?;
        assert_eq!(&out[..8], b"\x89PNG\r\n\x1a\n");

        Ok(())
    }
}

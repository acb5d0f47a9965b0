//! Base types for structure of RES file.

use binrw::{BinRead, BinWrite};
use std::borrow::Cow;

/// Version every supported archive carries in its header
pub const RES_VERSION: u32 = 0x0000_0400;

/// Marker at the start of every resource header
pub const RESOURCE_MAGIC: [u8; 4] = *b"RSRC";

/// Width of the NUL-padded name fields
pub const NAME_LEN: usize = 13;

/// RES file header
///
/// The version is checked by [`crate::read::ResArchive`] rather than by the parser so that an
/// unknown version can be reported with its value.
/// All data is stored in little endian format
#[derive(BinRead, BinWrite, Debug, Copy, Clone, PartialEq)]
#[brw(little)]
pub struct ResHeader {
    /// Format version, [`RES_VERSION`] for supported files
    pub version: u32,

    /// The offset from the beginning of the file where the directory starts
    pub directory_offset: u32,

    /// The number of resources stored in the file
    pub resources: u32,
}

impl ResHeader {
    /// Size of the header in the file
    pub const SIZE: u64 = 12;
}

impl Default for ResHeader {
    fn default() -> Self {
        Self {
            version: RES_VERSION,
            directory_offset: Self::SIZE as u32,
            resources: Default::default(),
        }
    }
}

/// RES directory entry
///
/// Points at a resource header somewhere in the file
#[derive(BinRead, BinWrite, Debug, Default, Copy, Clone, PartialEq)]
#[brw(little)]
pub struct DirEntry {
    /// Hash of the resource's name
    pub hash: u32,

    /// The offset to the resource header from the start of the file
    pub resource_offset: u32,

    /// Index into the engine's table of file extensions
    pub extension: u8,

    /// 8.3 file name, padded with NUL bytes
    pub name: [u8; NAME_LEN],
}

impl DirEntry {
    /// Size of a directory entry in the file
    pub const SIZE: u64 = 22;

    /// Name with the NUL padding removed
    pub fn name(&self) -> Cow<'_, str> {
        decode_name(&self.name)
    }
}

/// Flags stored with each resource.
///
/// Only the bitmap conversion looks at these, the archive reader passes them through untouched.
#[derive(BinRead, BinWrite, Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct ResourceFlags(pub u8);

impl ResourceFlags {
    /// The resource is a raw NOVA bitmap even though it is named `.pcx`
    pub const RAW_BITMAP: u8 = 0x01;

    /// Pixel rows are stored transposed
    pub const TRANSPOSED: u8 = 0x02;

    /// Returns true if the payload is a NOVA bitmap rather than a real PCX file
    pub fn is_raw_bitmap(&self) -> bool {
        self.0 & Self::RAW_BITMAP != 0
    }

    /// Returns true if the bitmap has to be transposed for display
    pub fn is_transposed(&self) -> bool {
        self.0 & Self::TRANSPOSED != 0
    }
}

/// RES resource header
///
/// Precedes the payload of every resource
#[derive(BinRead, BinWrite, Debug, Copy, Clone, PartialEq)]
#[brw(little)]
pub struct ResourceHeader {
    /// Validity marker, normally [`RESOURCE_MAGIC`]
    pub magic: [u8; 4],

    /// The total size of this resource including its header
    pub chunk_size: u32,

    /// The size of the payload as stored
    pub compressed_size: u32,

    /// The size of the payload after decompression
    pub uncompressed_size: u32,

    /// Hash of the resource's name, duplicated from the directory
    pub hash: u32,

    /// See [`ResourceFlags`]
    pub flags: ResourceFlags,

    /// Raw compression code, see [`crate::compression::CompressionMethod`]
    pub compression: u8,

    /// Index into the engine's table of file extensions
    pub extension: u8,

    /// 8.3 file name, padded with NUL bytes
    pub name: [u8; NAME_LEN],
}

impl ResourceHeader {
    /// Size of a resource header in the file
    pub const SIZE: u64 = 36;

    /// Name with the NUL padding removed
    pub fn name(&self) -> Cow<'_, str> {
        decode_name(&self.name)
    }

    /// Returns true if the marker reads `RSRC` in either byte order
    pub fn has_valid_magic(&self) -> bool {
        let mut reversed = RESOURCE_MAGIC;
        reversed.reverse();
        self.magic == RESOURCE_MAGIC || self.magic == reversed
    }
}

impl Default for ResourceHeader {
    fn default() -> Self {
        Self {
            magic: RESOURCE_MAGIC,
            chunk_size: Self::SIZE as u32,
            compressed_size: Default::default(),
            uncompressed_size: Default::default(),
            hash: Default::default(),
            flags: Default::default(),
            compression: Default::default(),
            extension: Default::default(),
            name: Default::default(),
        }
    }
}

/// Pads `name` into a fixed-width name field, truncating anything that does not fit.
pub fn encode_name(name: &str) -> [u8; NAME_LEN] {
    let mut out = [0u8; NAME_LEN];
    let bytes = name.as_bytes();
    let len = bytes.len().min(NAME_LEN);
    out[..len].copy_from_slice(&bytes[..len]);
    out
}

fn decode_name(raw: &[u8; NAME_LEN]) -> Cow<'_, str> {
    let end = raw.iter().position(|&b| b == 0).unwrap_or(NAME_LEN);
    String::from_utf8_lossy(&raw[..end])
}

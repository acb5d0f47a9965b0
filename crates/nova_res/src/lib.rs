//! This library handles reading **RES** resource archives used by games built on the *NOVA* engine.
//!
//! # RES Archive Format Documentation
//!
//! A RES file bundles many small game resources (bitmaps, sounds, text) into one file. Each
//! resource is stored either as-is or packed with an LZ77 variant, see [`compression`].
//!
//! ## File Structure
//!
//! A RES file consists of a header, followed by the resources, and a directory that points at
//! them. Resources are located through the directory only, so their order in the file does not
//! matter.
//!
//! | Offset (bytes) | Field                  | Description                                                |
//! |----------------|------------------------|------------------------------------------------------------|
//! | 0x0000         | Version                | 4 bytes: Fixed value 0x00000400                            |
//! | 0x0004         | Directory Offset       | 4 bytes: Offset to the directory                           |
//! | 0x0008         | Resource Count         | 4 bytes: Number of resources in the archive                |
//!
//! ### Directory
//!
//! The directory is an array of **Resource Count** entries starting at **Directory Offset**:
//!
//! | Offset (bytes) | Field                  | Description                                             |
//! |----------------|------------------------|---------------------------------------------------------|
//! | 0x0000         | Hash                   | 4 bytes: Hash of the resource name                      |
//! | 0x0004         | Resource Offset        | 4 bytes: Offset to the resource header                  |
//! | 0x0008         | Extension              | 1 byte: Index into the engine's extension table         |
//! | 0x0009         | Name                   | 13 bytes: 8.3 file name, NUL padded                     |
//!
//! ### Resources
//!
//! Every resource starts with a header, directly followed by its payload:
//!
//! | Offset (bytes) | Field                  | Description                                             |
//! |----------------|------------------------|---------------------------------------------------------|
//! | 0x0000         | Marker                 | 4 bytes: "RSRC"                                         |
//! | 0x0004         | Chunk Size             | 4 bytes: Size of header and payload                     |
//! | 0x0008         | Compressed Size        | 4 bytes: Size of the payload as stored                  |
//! | 0x000C         | Uncompressed Size      | 4 bytes: Size of the payload after decompression        |
//! | 0x0010         | Hash                   | 4 bytes: Hash of the resource name                      |
//! | 0x0014         | Flags                  | 1 byte: Bitmap flags, see [`types::ResourceFlags`]      |
//! | 0x0015         | Compression            | 1 byte: Compression code                                |
//! | 0x0016         | Extension              | 1 byte: Index into the engine's extension table         |
//! | 0x0017         | Name                   | 13 bytes: 8.3 file name, NUL padded                     |
//!
//! - **Compression**: the method used for the payload. Possible values are:
//!   - `0`: None (no compression, both sizes are equal)
//!   - `1`: Run-length (never used, not supported)
//!   - `2`: LZ77 variant
//!
//! ## Additional Information
//!
//! - **File Extension**: `.res`
//! - **Endianness**: Little-endian for all multi-byte integers
//!

pub mod bitmap;
pub mod compression;
pub mod error;
pub mod read;
pub mod types;

pub use compression::CompressionMethod;
pub use read::{ErrorPolicy, ResArchive, ResArchiveOptions, Resource};

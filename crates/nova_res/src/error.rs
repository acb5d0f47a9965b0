//! Error types that can be emitted from this library

use miette::Diagnostic;
use thiserror::Error;

use crate::types::RES_VERSION;

/// Error type for library
#[derive(Error, Diagnostic, Debug)]
pub enum Error {
    /// Transparent warpper for [`std::io::Error`]
    #[error(transparent)]
    IOError(#[from] std::io::Error),

    /// Transparent warpper for [`binrw::Error`]
    #[error(transparent)]
    BinRWError(#[from] binrw::Error),

    /// Transparent warpper for [`png::EncodingError`]
    #[cfg(feature = "png")]
    #[error(transparent)]
    PngError(#[from] png::EncodingError),

    /// archive header carries an unknown version
    #[error(
        "invalid archive header at offset {offset:#x}: version {version:#010x}, expected {:#010x}",
        RES_VERSION
    )]
    #[diagnostic(
        code(nova_res::invalid_header),
        help("this file is probably not a NOVA resource archive")
    )]
    InvalidHeader {
        /// Offset of the archive header
        offset: u64,
        /// Version found in the header
        version: u32,
    },

    /// archive ended before a structure could be read completely
    #[error("archive is truncated at offset {offset:#x}")]
    #[diagnostic(code(nova_res::truncated_archive))]
    TruncatedArchive {
        /// Offset of the structure that could not be read
        offset: u64,
    },

    /// a resource header or payload runs past the end of the archive
    #[error("resource {name} is truncated at offset {offset:#x}")]
    #[diagnostic(code(nova_res::truncated_resource))]
    TruncatedResource {
        /// Name of the resource, from the directory
        name: String,
        /// First offset that could not be read
        offset: u64,
    },

    /// resource header does not start with the expected marker
    #[error("resource {name} at offset {offset:#x} has invalid marker {magic:02x?}")]
    #[diagnostic(
        code(nova_res::invalid_magic),
        help("disable strict mode to read archives with damaged markers")
    )]
    InvalidMagic {
        /// Name of the resource
        name: String,
        /// Offset of the resource header
        offset: u64,
        /// Marker found in the resource header
        magic: [u8; 4],
    },

    /// resource uses a compression code this library cannot decode
    #[error("resource {name} at offset {offset:#x} uses unsupported compression code {code}")]
    #[diagnostic(code(nova_res::unsupported_compression))]
    UnsupportedCompression {
        /// Name of the resource
        name: String,
        /// Offset of the resource header
        offset: u64,
        /// Compression code found in the resource header
        code: u8,
    },

    /// declared and actual sizes disagree
    #[error("resource {name} at offset {offset:#x}: expected {expected} bytes, got {actual}")]
    #[diagnostic(code(nova_res::size_mismatch))]
    SizeMismatch {
        /// Name of the resource
        name: String,
        /// Offset at which the check failed
        offset: u64,
        /// Size declared by the resource header
        expected: u64,
        /// Size found or produced
        actual: u64,
    },

    /// compressed stream ran out before its end marker
    #[error("resource {name}: compressed stream ends at offset {offset:#x} before its end marker")]
    #[diagnostic(code(nova_res::truncated_stream))]
    TruncatedStream {
        /// Name of the resource
        name: String,
        /// Offset in the archive where input was exhausted
        offset: u64,
    },

    /// compressed stream refers to data before the start of the output
    #[error(
        "resource {name}: back-reference at offset {offset:#x} reaches {distance} bytes back from output position {position}"
    )]
    #[diagnostic(code(nova_res::invalid_back_reference))]
    InvalidBackReference {
        /// Name of the resource
        name: String,
        /// Offset in the archive of the offending code
        offset: u64,
        /// Distance encoded in the back-reference
        distance: usize,
        /// Output position when the code was read
        position: usize,
    },

    /// directory and resource header disagree on the name hash
    #[error("resource {name} at offset {offset:#x}: directory hash {expected:#010x} does not match header hash {actual:#010x}")]
    #[diagnostic(code(nova_res::hash_mismatch))]
    HashMismatch {
        /// Name of the resource
        name: String,
        /// Offset of the resource header
        offset: u64,
        /// Hash stored in the directory entry
        expected: u32,
        /// Hash stored in the resource header
        actual: u32,
    },

    /// palette file has the wrong size
    #[error("palette must be {expected} bytes, got {actual}")]
    #[diagnostic(code(nova_res::invalid_palette))]
    InvalidPalette {
        /// Required palette file size
        expected: usize,
        /// Size that was read
        actual: usize,
    },

    /// {0}
    #[error("invalid bitmap: {0}")]
    #[diagnostic(code(nova_res::invalid_bitmap))]
    InvalidBitmap(String),

    /// unable to find requested resource
    #[error("unable to find requested resource")]
    FileNotFound(#[from] FileNotFoundError),
}

/// Error type to provide further information when a resource has not been found
#[derive(Error, Diagnostic, Debug)]
#[error("unable to find requested resource")]
pub enum FileNotFoundError {
    /// at index {0}
    #[error("at index {0}")]
    Index(usize),

    /// by name {0}
    #[error("by name {0}")]
    Name(String),
}

/// Generic result type with crate's Error as its error variant
pub type Result<T> = core::result::Result<T, Error>;

//! Types for reading RES archives
//!

use binrw::{BinRead, Endian};
use bon::Builder;
use indexmap::IndexMap;
use std::{
    fmt::{self, Debug},
    fs::File,
    io::{self, BufReader, Cursor, Read, Seek},
    iter::FusedIterator,
    path::Path,
};
use tracing::{debug, instrument, warn};

use crate::{
    compression::{decompress, CompressionMethod},
    error::{Error, FileNotFoundError, Result},
    types::{DirEntry, ResHeader, ResourceFlags, ResourceHeader, RES_VERSION},
};

/// What to do when a resource cannot be read while iterating an archive
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub enum ErrorPolicy {
    /// Stop at the first broken resource
    #[default]
    Abort,

    /// Log the broken resource and continue with the next one
    Skip,
}

/// Options for how a RES file should be read
#[derive(Debug, Clone, Copy, Builder)]
pub struct ResArchiveOptions {
    /// Behaviour of [`ResArchive::resources`] when a resource fails to read
    #[builder(default)]
    pub policy: ErrorPolicy,

    /// Reject resources whose header marker is not `RSRC`
    #[builder(default)]
    pub strict_magic: bool,

    /// Reject resources whose header hash differs from the directory's
    #[builder(default)]
    pub verify_hashes: bool,
}

impl Default for ResArchiveOptions {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Structure representing a RES resource header.
#[derive(Debug, Clone, Default)]
pub struct ResourceData {
    /// Name of the resource
    pub name: Box<str>,
    /// Raw name, without the NUL padding. To be used when name was incorrectly decoded.
    pub name_raw: Box<[u8]>,
    /// Index into the engine's table of file extensions
    pub extension: u8,
    /// Flags for the bitmap conversion
    pub flags: ResourceFlags,
    /// Compression code as stored in the header
    pub compression_code: u8,
    /// Total size of the resource chunk
    pub chunk_size: u64,
    /// Size of the resource in the archive
    pub compressed_size: u64,
    /// Size of the resource when extracted
    pub uncompressed_size: u64,
    /// Hash of the name, from the resource header
    pub hash: u32,
    /// Specifies where the resource header starts
    pub header_start: u64,
    /// Specifies where the payload starts
    pub data_start: u64,
}

impl ResourceData {
    /// Compression method, if the code is a known one
    pub fn compression_method(&self) -> Option<CompressionMethod> {
        CompressionMethod::try_from(self.compression_code).ok()
    }
}

/// A decoded resource
///
/// Reading from it yields the uncompressed payload.
pub struct Resource {
    data: ResourceData,
    content: Cursor<Vec<u8>>,
}

impl Debug for Resource {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Resource({:#?})", self.get_metadata())
    }
}

impl Resource {
    /// Get the name of the resource
    ///
    /// # Warnings
    ///
    /// Names come straight from the archive. Check them before using them as a path.
    pub fn name(&self) -> &str {
        &self.get_metadata().name
    }

    /// Get the name of the resource, in the raw (internal) byte representation.
    pub fn name_raw(&self) -> &[u8] {
        &self.get_metadata().name_raw
    }

    /// Get the extension code of the resource
    pub fn extension(&self) -> u8 {
        self.get_metadata().extension
    }

    /// Get the flags stored with the resource
    pub fn flags(&self) -> ResourceFlags {
        self.get_metadata().flags
    }

    /// Get the size of the resource, in bytes, in the archive
    pub fn compressed_size(&self) -> u64 {
        self.get_metadata().compressed_size
    }

    /// Get the size of the resource, in bytes, when uncompressed
    pub fn size(&self) -> u64 {
        self.get_metadata().uncompressed_size
    }

    /// Get the starting offset of the payload in the archive
    pub fn data_start(&self) -> u64 {
        self.get_metadata().data_start
    }

    /// Returns true if the resource is a NOVA bitmap stored under a `.pcx` name
    pub fn is_bitmap(&self) -> bool {
        self.flags().is_raw_bitmap() && self.name().to_ascii_lowercase().ends_with(".pcx")
    }

    /// Get the uncompressed payload
    pub fn bytes(&self) -> &[u8] {
        self.content.get_ref()
    }

    /// Unwrap and return the uncompressed payload
    pub fn into_bytes(self) -> Vec<u8> {
        self.content.into_inner()
    }

    /// Get the metadata read from the resource header
    pub fn get_metadata(&self) -> &ResourceData {
        &self.data
    }
}

impl Read for Resource {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.content.read(buf)
    }
}

/// RES archive reader
///
/// ```no_run
/// use std::io::prelude::*;
///
/// fn list_res_contents(reader: impl Read + Seek) -> nova_res::error::Result<()> {
///     let mut res = nova_res::ResArchive::new(reader)?;
///
///     for resource in res.resources() {
///         let mut resource = resource?;
///         println!("Filename: {}", resource.name());
///         std::io::copy(&mut resource, &mut std::io::stdout())?;
///     }
///
///     Ok(())
/// }
/// ```
pub struct ResArchive<R> {
    reader: R,
    options: ResArchiveOptions,
    header: ResHeader,
    entries: Vec<DirEntry>,
    names: IndexMap<Box<str>, usize>,
}

impl ResArchive<BufReader<File>> {
    /// Open the RES archive at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::new(BufReader::new(File::open(path)?))
    }
}

impl<R: Read + Seek> ResArchive<R> {
    /// Read a RES archive collecting the resources it contains.
    pub fn new(reader: R) -> Result<ResArchive<R>> {
        Self::with_options(reader, ResArchiveOptions::default())
    }

    /// Read a RES archive with the given options.
    ///
    /// Only the header and directory are read here. Resource headers and payloads are read on
    /// access.
    #[instrument(skip(reader), err)]
    pub fn with_options(mut reader: R, options: ResArchiveOptions) -> Result<ResArchive<R>> {
        let header: ResHeader = read_at(&mut reader, 0)?;
        if header.version != RES_VERSION {
            return Err(Error::InvalidHeader {
                offset: 0,
                version: header.version,
            });
        }

        let entries = Self::get_directory(&mut reader, &header)?;
        debug!(resources = entries.len(), "read directory");

        let mut names = IndexMap::with_capacity(entries.len());
        for (index, entry) in entries.iter().enumerate() {
            let key: Box<str> = entry.name().to_ascii_uppercase().into();
            if names.contains_key(&key) {
                warn!(name = %key, index, "duplicate resource name");
                continue;
            }
            names.insert(key, index);
        }

        Ok(ResArchive {
            reader,
            options,
            header,
            entries,
            names,
        })
    }

    /// Number of resources contained in this RES.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether this RES archive contains no resources
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the header of the archive
    pub fn header(&self) -> &ResHeader {
        &self.header
    }

    /// Returns the options the archive was opened with
    pub fn options(&self) -> &ResArchiveOptions {
        &self.options
    }

    /// Returns an iterator over all the resource names in directory order.
    pub fn file_names(&self) -> impl Iterator<Item = String> + '_ {
        self.entries.iter().map(|e| e.name().into_owned())
    }

    /// Get the index of a resource by name, if it's present.
    ///
    /// Names are compared ignoring ASCII case. If several resources share a name the first one
    /// is returned.
    pub fn index_for_name(&self, name: &str) -> Option<usize> {
        self.names.get(name.to_ascii_uppercase().as_str()).copied()
    }

    /// Get the name of a resource, if it's present.
    pub fn name_for_index(&self, index: usize) -> Option<String> {
        self.entries.get(index).map(|e| e.name().into_owned())
    }

    /// Get the directory entry of a resource
    pub fn entry(&self, index: usize) -> Result<&DirEntry> {
        self.entries
            .get(index)
            .ok_or(Error::FileNotFound(FileNotFoundError::Index(index)))
    }

    /// Read and validate the header of a resource without touching its payload
    #[instrument(skip(self), err)]
    pub fn record(&mut self, index: usize) -> Result<ResourceData> {
        let entry = *self.entry(index)?;
        let header_start = entry.resource_offset as u64;
        let header: ResourceHeader =
            read_at(&mut self.reader, header_start).map_err(|e| match e {
                Error::TruncatedArchive { offset } => Error::TruncatedResource {
                    name: entry.name().into_owned(),
                    offset,
                },
                e => e,
            })?;
        let name = header.name();

        if !header.has_valid_magic() {
            if self.options.strict_magic {
                return Err(Error::InvalidMagic {
                    name: name.into_owned(),
                    offset: header_start,
                    magic: header.magic,
                });
            }
            warn!(%name, offset = header_start, magic = ?header.magic, "unexpected resource marker");
        }

        if self.options.verify_hashes && entry.hash != header.hash {
            return Err(Error::HashMismatch {
                name: name.into_owned(),
                offset: header_start,
                expected: entry.hash,
                actual: header.hash,
            });
        }

        if header.compression == CompressionMethod::Stored as u8
            && header.compressed_size != header.uncompressed_size
        {
            return Err(Error::SizeMismatch {
                name: name.into_owned(),
                offset: header_start,
                expected: header.uncompressed_size as u64,
                actual: header.compressed_size as u64,
            });
        }

        let name_raw: Box<[u8]> = header
            .name
            .iter()
            .copied()
            .take_while(|&b| b != 0)
            .collect();

        Ok(ResourceData {
            name: name.into(),
            name_raw,
            extension: header.extension,
            flags: header.flags,
            compression_code: header.compression,
            chunk_size: header.chunk_size as u64,
            compressed_size: header.compressed_size as u64,
            uncompressed_size: header.uncompressed_size as u64,
            hash: header.hash,
            header_start,
            data_start: header_start + ResourceHeader::SIZE,
        })
    }

    /// Search for a resource by name
    pub fn by_name(&mut self, name: &str) -> Result<Resource> {
        let Some(index) = self.index_for_name(name) else {
            return Err(Error::FileNotFound(FileNotFoundError::Name(
                name.to_owned(),
            )));
        };
        self.by_index(index)
    }

    /// Get a resource by index, decoding its payload
    #[instrument(skip(self), err)]
    pub fn by_index(&mut self, index: usize) -> Result<Resource> {
        let data = self.record(index)?;

        let bytes = match data.compression_method() {
            Some(CompressionMethod::Stored) => {
                self.read_block(&data.name, data.data_start, data.uncompressed_size)?
            }
            Some(CompressionMethod::Lzss) => {
                let packed = self.read_block(&data.name, data.data_start, data.compressed_size)?;
                decompress(&packed, data.uncompressed_size as usize)
                    .map_err(|e| e.at(&*data.name, data.data_start))?
            }
            _ => {
                return Err(Error::UnsupportedCompression {
                    name: data.name.into(),
                    offset: data.header_start,
                    code: data.compression_code,
                })
            }
        };

        if bytes.len() as u64 != data.uncompressed_size {
            return Err(Error::SizeMismatch {
                name: data.name.into(),
                offset: data.data_start,
                expected: data.uncompressed_size,
                actual: bytes.len() as u64,
            });
        }

        debug!(name = %data.name, size = bytes.len(), "read resource");

        Ok(Resource {
            data,
            content: Cursor::new(bytes),
        })
    }

    /// Returns an iterator decoding every resource in directory order.
    ///
    /// Failures are handled according to [`ResArchiveOptions::policy`].
    pub fn resources(&mut self) -> Resources<'_, R> {
        Resources {
            archive: self,
            index: 0,
            done: false,
        }
    }

    /// Unwrap and return the inner reader object
    ///
    /// The position of the reader is undefined.
    pub fn into_inner(self) -> R {
        self.reader
    }

    fn read_block(&mut self, name: &str, start: u64, len: u64) -> Result<Vec<u8>> {
        self.reader.seek(io::SeekFrom::Start(start))?;

        let mut buffer = Vec::new();
        self.reader.by_ref().take(len).read_to_end(&mut buffer)?;
        if (buffer.len() as u64) < len {
            return Err(Error::TruncatedResource {
                name: name.to_owned(),
                offset: start + buffer.len() as u64,
            });
        }
        Ok(buffer)
    }

    fn get_directory(reader: &mut R, header: &ResHeader) -> Result<Vec<DirEntry>> {
        let start = header.directory_offset as u64;

        (0..header.resources as u64)
            .map(|i| read_at(reader, start + i * DirEntry::SIZE))
            .collect()
    }
}

/// Iterator over the decoded resources of a [`ResArchive`]
pub struct Resources<'a, R> {
    archive: &'a mut ResArchive<R>,
    index: usize,
    done: bool,
}

impl<R: Read + Seek> Iterator for Resources<'_, R> {
    type Item = Result<Resource>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.done && self.index < self.archive.len() {
            let index = self.index;
            self.index += 1;

            match self.archive.by_index(index) {
                Ok(resource) => return Some(Ok(resource)),
                Err(e) => match self.archive.options.policy {
                    ErrorPolicy::Abort => {
                        self.done = true;
                        return Some(Err(e));
                    }
                    ErrorPolicy::Skip => {
                        let name = self.archive.name_for_index(index).unwrap_or_default();
                        warn!(%name, index, error = %e, "skipping resource");
                    }
                },
            }
        }
        None
    }
}

impl<R: Read + Seek> FusedIterator for Resources<'_, R> {}

fn read_at<T, R>(reader: &mut R, offset: u64) -> Result<T>
where
    T: for<'a> BinRead<Args<'a> = ()>,
    R: Read + Seek,
{
    reader.seek(io::SeekFrom::Start(offset))?;
    T::read_options(reader, Endian::Little, ()).map_err(|e| {
        if e.is_eof() {
            Error::TruncatedArchive { offset }
        } else {
            Error::from(e)
        }
    })
}

#[cfg(test)]
mod test {
    use std::io::prelude::*;

    use crate::{
        error::{Error, Result},
        read::ResArchive,
    };
    use std::io::Cursor;

    #[test]
    fn read_invalid_version() {
        #[rustfmt::skip]
        let input = [
            0x00, 0x05, 0x00, 0x00,
            0x0C, 0x00, 0x00, 0x00,
            0x00, 0x00, 0x00, 0x00,
        ];

        let archive = ResArchive::new(Cursor::new(input));
        assert!(matches!(
            archive,
            Err(Error::InvalidHeader {
                offset: 0,
                version: 0x500
            })
        ));
    }

    #[test]
    fn read_short_header() {
        let input = [0x00, 0x04, 0x00, 0x00, 0x0C, 0x00];

        let archive = ResArchive::new(Cursor::new(input));
        assert!(matches!(
            archive,
            Err(Error::TruncatedArchive { offset: 0 })
        ));
    }

    #[test]
    fn read_empty_res() {
        #[rustfmt::skip]
        let input = [
            0x00, 0x04, 0x00, 0x00,
            0x0C, 0x00, 0x00, 0x00,
            0x00, 0x00, 0x00, 0x00,
        ];

        let archive = ResArchive::new(Cursor::new(input));
        assert!(archive.is_ok());
        assert!(archive.unwrap().is_empty());
    }

    #[test]
    fn read_truncated_directory() {
        #[rustfmt::skip]
        let input = [
            0x00, 0x04, 0x00, 0x00,
            0x0C, 0x00, 0x00, 0x00,
            0x02, 0x00, 0x00, 0x00,
            // a single directory entry (22)
            0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x41, 0x00,
            0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        ];

        let archive = ResArchive::new(Cursor::new(input));
        assert!(matches!(
            archive,
            Err(Error::TruncatedArchive { offset: 34 })
        ));
    }

    #[test]
    fn read_stored_res_with_entry() -> Result<()> {
        let input = [
            // Header (12)
            0x00, 0x04, 0x00, 0x00, 0x3B, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00,
            // Resource header (36)
            0x52, 0x53, 0x52, 0x43, 0x2F, 0x00, 0x00, 0x00, 0x0B, 0x00, 0x00, 0x00, 0x0B, 0x00,
            0x00, 0x00, 0x2A, 0x00, 0x00, 0x00, 0x00, 0x00, 0x03, 0x48, 0x45, 0x4C, 0x4C, 0x4F,
            0x2E, 0x54, 0x58, 0x54, 0x00, 0x00, 0x00, 0x00, // Data (11)
            0x48, 0x65, 0x6C, 0x6C, 0x6F, 0x20, 0x57, 0x6F, 0x72, 0x6C, 0x64,
            // Directory (22)
            0x2A, 0x00, 0x00, 0x00, 0x0C, 0x00, 0x00, 0x00, 0x03, 0x48, 0x45, 0x4C, 0x4C, 0x4F,
            0x2E, 0x54, 0x58, 0x54, 0x00, 0x00, 0x00, 0x00,
        ];

        let mut archive = ResArchive::new(Cursor::new(input))?;
        assert_eq!(archive.len(), 1);
        assert_eq!(archive.index_for_name("hello.txt"), Some(0));

        let mut resource = archive.by_index(0)?;
        assert_eq!(resource.data_start(), 48);
        assert_eq!(resource.name(), "HELLO.TXT");
        assert_eq!(resource.extension(), 3);

        let mut buffer = Vec::new();
        resource.read_to_end(&mut buffer)?;
        assert_eq!(
            buffer,
            vec![0x48, 0x65, 0x6C, 0x6C, 0x6F, 0x20, 0x57, 0x6F, 0x72, 0x6C, 0x64]
        );

        Ok(())
    }
}

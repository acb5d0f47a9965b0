//! Lays out RES archives in memory.

use std::io::{Cursor, Write};

use binrw::BinWrite;
use nova_res::types::{encode_name, DirEntry, ResHeader, ResourceFlags, ResourceHeader};

pub struct TestResource {
    pub name: &'static str,
    pub hash: u32,
    pub flags: u8,
    pub compression: u8,
    pub compressed_size: u32,
    pub uncompressed_size: u32,
    pub payload: Vec<u8>,
}

impl TestResource {
    pub fn stored(name: &'static str, payload: &[u8]) -> Self {
        Self {
            name,
            hash: 0,
            flags: 0,
            compression: 0,
            compressed_size: payload.len() as u32,
            uncompressed_size: payload.len() as u32,
            payload: payload.to_vec(),
        }
    }

    pub fn packed(name: &'static str, stream: &[u8], uncompressed_size: u32) -> Self {
        Self {
            name,
            hash: 0,
            flags: 0,
            compression: 2,
            compressed_size: stream.len() as u32,
            uncompressed_size,
            payload: stream.to_vec(),
        }
    }
}

#[derive(Default)]
pub struct ArchiveBuilder {
    pub version: Option<u32>,
    pub resources: Vec<TestResource>,
    /// Hashes written to the directory instead of the resource's own
    pub directory_hashes: Vec<(usize, u32)>,
    pub magic: Option<[u8; 4]>,
}

impl ArchiveBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn resource(mut self, resource: TestResource) -> Self {
        self.resources.push(resource);
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut out = Cursor::new(Vec::new());
        out.set_position(ResHeader::SIZE);

        let mut directory = Vec::new();
        for (index, r) in self.resources.iter().enumerate() {
            let offset = out.position() as u32;
            ResourceHeader {
                magic: self.magic.unwrap_or(*b"RSRC"),
                chunk_size: ResourceHeader::SIZE as u32 + r.payload.len() as u32,
                compressed_size: r.compressed_size,
                uncompressed_size: r.uncompressed_size,
                hash: r.hash,
                flags: ResourceFlags(r.flags),
                compression: r.compression,
                extension: 1,
                name: encode_name(r.name),
            }
            .write(&mut out)
            .unwrap();
            out.write_all(&r.payload).unwrap();

            let hash = self
                .directory_hashes
                .iter()
                .find(|(i, _)| *i == index)
                .map_or(r.hash, |(_, h)| *h);
            directory.push(DirEntry {
                hash,
                resource_offset: offset,
                extension: 1,
                name: encode_name(r.name),
            });
        }

        let directory_offset = out.position() as u32;
        for entry in &directory {
            entry.write(&mut out).unwrap();
        }

        out.set_position(0);
        ResHeader {
            directory_offset,
            resources: directory.len() as u32,
            ..Default::default()
        }
        .write(&mut out)
        .unwrap();
        if let Some(version) = self.version {
            out.set_position(0);
            out.write_all(&version.to_le_bytes()).unwrap();
        }

        out.into_inner()
    }
}

/// Encodes a back-reference code for `length` bytes at `offset`.
pub fn code(length: usize, offset: usize) -> [u8; 2] {
    (((length - 3) << 10 | (offset - 1)) as u16).to_le_bytes()
}

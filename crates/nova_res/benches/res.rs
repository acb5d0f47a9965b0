use divan::AllocProfiler;

#[global_allocator]
static ALLOC: AllocProfiler = AllocProfiler::system();

fn main() {
    divan::main();
}

/// Eight literals followed by eight maximal back-references, repeated `blocks` times.
fn packed_stream(blocks: usize) -> (Vec<u8>, usize) {
    let reference = ((63u16 << 10) | 7).to_le_bytes();
    let mut stream = Vec::new();
    for _ in 0..blocks {
        stream.extend([0x00, 0xFF]);
        stream.extend(b"NOVA-RES");
        for _ in 0..8 {
            stream.extend(reference);
        }
    }
    stream.extend([0x00, 0x00, 0x00, 0x00]);
    (stream, blocks * (8 + 8 * 66))
}

pub mod decompress {
    use divan::Bencher;
    use nova_res::compression::decompress;

    #[divan::bench(args = [1, 64, 1024])]
    fn packed(bencher: Bencher, blocks: usize) {
        bencher
            .with_inputs(|| super::packed_stream(blocks))
            .bench_refs(|(stream, len)| {
                divan::black_box(decompress(stream, *len).unwrap());
            });
    }
}

pub mod read {
    use std::io::Cursor;

    use binrw::BinWrite;
    use divan::Bencher;
    use nova_res::{
        types::{encode_name, DirEntry, ResHeader, ResourceHeader},
        ResArchive,
    };

    fn get_input() -> Vec<u8> {
        let (stream, len) = super::packed_stream(64);
        let mut out = Cursor::new(Vec::new());
        out.set_position(ResHeader::SIZE);

        let offsets = (0..32)
            .map(|i| {
                let offset = out.position() as u32;
                ResourceHeader {
                    chunk_size: (ResourceHeader::SIZE as usize + stream.len()) as u32,
                    compressed_size: stream.len() as u32,
                    uncompressed_size: len as u32,
                    compression: 2,
                    name: encode_name(&format!("RES{i:05}.BIN")),
                    ..Default::default()
                }
                .write(&mut out)
                .unwrap();
                std::io::Write::write_all(&mut out, &stream).unwrap();
                offset
            })
            .collect::<Vec<_>>();

        let directory_offset = out.position() as u32;
        for (i, offset) in offsets.iter().enumerate() {
            DirEntry {
                resource_offset: *offset,
                name: encode_name(&format!("RES{i:05}.BIN")),
                ..Default::default()
            }
            .write(&mut out)
            .unwrap();
        }

        out.set_position(0);
        ResHeader {
            directory_offset,
            resources: offsets.len() as u32,
            ..Default::default()
        }
        .write(&mut out)
        .unwrap();
        out.into_inner()
    }

    #[divan::bench]
    fn open(bencher: Bencher) {
        bencher.with_inputs(get_input).bench_refs(|data| {
            divan::black_box(ResArchive::new(Cursor::new(data)).unwrap());
        });
    }

    #[divan::bench(sample_count = 1)]
    fn read_all(bencher: Bencher) {
        let mut res = ResArchive::new(Cursor::new(get_input())).unwrap();

        bencher.bench_local(move || {
            for resource in res.resources() {
                divan::black_box(resource.unwrap());
            }
        });
    }
}

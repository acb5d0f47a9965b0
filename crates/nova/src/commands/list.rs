use clap::Args;
use miette::{Context, Result};
use nova_res::ResArchive;
use owo_colors::OwoColorize;
use std::path::PathBuf;
use tracing::warn;

#[derive(Args)]
pub struct ListArgs {
    /// An input RES file
    #[arg(short, long, value_name = "FILE")]
    file: PathBuf,
}

impl ListArgs {
    pub fn handle(&self) -> Result<()> {
        let mut res =
            ResArchive::open(&self.file).context(format!("path: {}", &self.file.display()))?;

        let mut broken = 0;
        for i in 0..res.len() {
            let record = match res.record(i) {
                Ok(record) => record,
                Err(e) => {
                    broken += 1;
                    warn!("{}", e);
                    continue;
                }
            };

            let (name, compression) = match record.compression_method() {
                Some(m) if m.is_supported() => {
                    (format!("{:13}", record.name).green().to_string(), m.to_string())
                }
                Some(m) => (format!("{:13}", record.name).red().to_string(), m.to_string()),
                None => (
                    format!("{:13}", record.name).red().to_string(),
                    format!("unknown({})", record.compression_code),
                ),
            };

            println!(
                "{} chunk={:7} compressed={:7} uncompressed={:7} hash={:#010x} flags={} compression={} extension={}",
                name,
                record.chunk_size,
                record.compressed_size,
                record.uncompressed_size,
                record.hash,
                record.flags.0,
                compression,
                record.extension,
            );
        }

        println!("{} resources, {} unreadable", res.len(), broken);

        Ok(())
    }
}

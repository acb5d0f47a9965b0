use clap::Args;
use miette::{Context, IntoDiagnostic, Result};
use nova_res::{
    bitmap::{Bitmap, Palette},
    ErrorPolicy, ResArchive, ResArchiveOptions, Resource,
};
use std::{
    ffi::OsStr,
    fs::File,
    io::{BufReader, BufWriter, Write},
    path::{Path, PathBuf},
};
use tracing::{info, warn};
use walkdir::WalkDir;

#[derive(Args)]
pub struct ExtractArgs {
    /// An input RES file, or a directory of RES files
    #[arg(short, long, value_name = "PATH")]
    file: PathBuf,

    /// A target directory
    #[arg(short, long, value_name = "DIR")]
    directory: PathBuf,

    /// A palette file used to convert bitmaps to PNG
    #[arg(short, long, value_name = "FILE")]
    palette: Option<PathBuf>,

    /// Allow overwriting the target
    #[arg(long, default_value_t = false)]
    overwrite: bool,

    /// Skip resources and archives that fail to read instead of stopping
    #[arg(long, default_value_t = false)]
    keep_going: bool,

    /// Reject resources whose header marker is damaged
    #[arg(long, default_value_t = false)]
    strict: bool,

    /// Check the directory hash of every resource against its header
    #[arg(long, default_value_t = false)]
    verify_hashes: bool,
}

impl ExtractArgs {
    pub fn handle(&self) -> Result<()> {
        let palette = match &self.palette {
            Some(path) => {
                let f = File::open(path)
                    .into_diagnostic()
                    .context(format!("path: {}", path.display()))?;
                Some(Palette::read(f).context(format!("reading palette {}", path.display()))?)
            }
            None => None,
        };

        let options = ResArchiveOptions::builder()
            .policy(if self.keep_going {
                ErrorPolicy::Skip
            } else {
                ErrorPolicy::Abort
            })
            .strict_magic(self.strict)
            .verify_hashes(self.verify_hashes)
            .build();

        if !self.file.is_dir() {
            return self.extract_archive(&self.file, &self.directory, options, palette.as_ref());
        }

        let archives = WalkDir::new(&self.file)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .collect::<Vec<_>>();

        for archive in archives {
            let target = self
                .directory
                .join(archive.path().strip_prefix(&self.file).into_diagnostic()?);
            info!("{} => {}", archive.path().display(), target.display());

            let result = self.extract_archive(archive.path(), &target, options, palette.as_ref());
            match result {
                Err(e) if self.keep_going => warn!("skipping {}: {:?}", archive.path().display(), e),
                result => result?,
            }
        }

        Ok(())
    }

    fn extract_archive(
        &self,
        path: &Path,
        target: &Path,
        options: ResArchiveOptions,
        palette: Option<&Palette>,
    ) -> Result<()> {
        let f = File::open(path)
            .into_diagnostic()
            .context(format!("path: {}", path.display()))?;
        let mut res = ResArchive::with_options(BufReader::new(f), options)
            .context(format!("opening {}", path.display()))?;

        std::fs::create_dir_all(target)
            .into_diagnostic()
            .context(format!("creating {}", target.display()))?;

        for resource in res.resources() {
            let resource = resource.context(format!("reading {}", path.display()))?;

            let name = resource.name().to_owned();
            if name.is_empty() || Path::new(&name).file_name() != Some(OsStr::new(&name)) {
                warn!("skipping resource with unsafe name {:?}", name);
                continue;
            }

            match palette {
                Some(palette) if resource.is_bitmap() => {
                    self.write_bitmap(resource, &target.join(&name), palette)?
                }
                _ => self.write_raw(resource, &target.join(&name))?,
            }
        }

        Ok(())
    }

    fn write_bitmap(&self, resource: Resource, path: &Path, palette: &Palette) -> Result<()> {
        let bitmap = match Bitmap::parse(resource.bytes(), resource.flags()) {
            Ok(bitmap) => bitmap,
            Err(e) => {
                warn!("{} is not a valid bitmap, writing raw data: {}", resource.name(), e);
                return self.write_raw(resource, path);
            }
        };

        let p = path.with_extension("png");
        info!("writing {} ({}x{})", p.display(), bitmap.width, bitmap.height);

        let mut out = BufWriter::new(self.create(&p)?);
        bitmap
            .write_png(&mut out, palette)
            .context(format!("encoding {}", p.display()))?;
        out.flush().into_diagnostic()
    }

    fn write_raw(&self, mut resource: Resource, path: &Path) -> Result<()> {
        info!("writing {}", path.display());

        let mut out = self.create(path)?;
        std::io::copy(&mut resource, &mut out).into_diagnostic()?;
        Ok(())
    }

    fn create(&self, p: &Path) -> Result<File> {
        if !self.overwrite {
            File::create_new(p)
                .into_diagnostic()
                .context(format!("creating {}", p.display()))
        } else {
            File::create(p)
                .into_diagnostic()
                .context(format!("creating {}", p.display()))
        }
    }
}

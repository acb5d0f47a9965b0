pub mod extract;
pub mod list;

#[derive(clap::Subcommand)]
pub enum Commands {
    /// List the resources of a RES file
    List(list::ListArgs),
    /// Extract RES files into a directory
    Extract(extract::ExtractArgs),
}

impl Commands {
    pub fn handle(&self) -> miette::Result<()> {
        match self {
            Commands::List(list) => list.handle(),
            Commands::Extract(extract) => extract.handle(),
        }
    }
}

use std::path::PathBuf;

use itertools::Itertools;

use crate::{FileFilters, Mdl, Result};

#[derive(clap::Args)]
pub struct Args {
    /// MDL file to inspect
    input: PathBuf,
    /// Glob patterns to include texture names
    #[arg(short, long)]
    include: Vec<String>,
    /// Glob patterns to exclude texture names
    #[arg(short = 'x', long)]
    exclude: Vec<String>,
}

pub fn inspect(args: Args) -> Result<()> {
    let data = std::fs::read(&args.input)?;
    let mdl = Mdl::parse(&data)?;
    println!(
        "{} ({} bytes, {} textures)",
        mdl.name,
        data.len(),
        mdl.textures.len()
    );
    let filters = FileFilters {
        includes: args.include,
        excludes: args.exclude,
    };
    for tex in mdl
        .textures
        .iter()
        .filter(|t| filters.matches(&t.name))
        .sorted_by_key(|t| t.offset)
    {
        println!(
            "  {:<32} {:>4}x{:<4} at 0x{:08x} ({} bytes)",
            tex.name,
            tex.width,
            tex.height,
            tex.offset,
            tex.region_len()
        );
    }
    Ok(())
}

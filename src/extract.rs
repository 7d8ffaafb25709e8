use std::{fs, path::PathBuf};

use crate::{decode_texture, FileFilters, Mdl, Result};

#[derive(clap::Args)]
pub struct Args {
    /// MDL file to extract textures from
    input: PathBuf,
    /// Directory to output PNG files into [default: <model name>_textures]
    #[arg(short, long)]
    outdir: Option<PathBuf>,
    /// Glob patterns to include texture names
    #[arg(short, long)]
    include: Vec<String>,
    /// Glob patterns to exclude texture names
    #[arg(short = 'x', long)]
    exclude: Vec<String>,
}

pub fn extract(args: Args) -> Result<()> {
    let data = fs::read(&args.input)?;
    let mdl = Mdl::parse(&data)?;
    let outdir = args.outdir.unwrap_or_else(|| {
        let stem = args
            .input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "model".into());
        PathBuf::from(format!("{stem}_textures"))
    });
    fs::create_dir_all(&outdir)?;

    let filters = FileFilters {
        includes: args.include,
        excludes: args.exclude,
    };
    let mut count = 0usize;
    for tex in mdl.textures.iter().filter(|t| filters.matches(&t.name)) {
        let raster = decode_texture(&data, tex)?;
        let path = outdir.join(format!("{}.png", file_stem(&tex.name)));
        raster
            .to_image()
            .save_with_format(&path, image::ImageFormat::Png)?;
        log::debug!("extracted {:?} to {}", tex.name, path.display());
        count += 1;
    }
    log::info!("extracted {count} textures to {}", outdir.display());
    Ok(())
}

/// Texture names conventionally carry a .bmp suffix and may contain path
/// separators; neither belongs in the output file name.
fn file_stem(name: &str) -> String {
    let base = name
        .strip_suffix(".bmp")
        .or_else(|| name.strip_suffix(".BMP"))
        .unwrap_or(name);
    base.chars()
        .map(|c| if matches!(c, '/' | '\\' | ':') { '_' } else { c })
        .collect()
}

use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::{replace_texture, Error, Mdl, Result};

#[derive(clap::Args)]
pub struct Args {
    /// MDL file to patch
    input: PathBuf,
    /// Replacement image (PNG, JPEG, BMP or GIF)
    image: PathBuf,
    /// Glob pattern naming the texture(s) to replace
    #[arg(short, long)]
    texture: String,
    /// Output MDL path [default: MOD_<input file name>]
    #[arg(short, long)]
    output: Option<PathBuf>,
}

pub fn patch(args: Args) -> Result<()> {
    let data = fs::read(&args.input)?;
    let image_bytes = fs::read(&args.image)?;
    let mdl = Mdl::parse(&data)?;

    let targets = mdl
        .textures
        .iter()
        .filter(|t| glob_match::glob_match(&args.texture, &t.name))
        .collect::<Vec<_>>();
    if targets.is_empty() {
        return Err(Error::NoSuchTexture(args.texture));
    }

    let mut out = data;
    for tex in targets {
        log::info!(
            "replacing {:?} ({}x{} at 0x{:x})",
            tex.name,
            tex.width,
            tex.height,
            tex.offset
        );
        out = replace_texture(&out, tex, &image_bytes)?;
    }

    let output = args.output.unwrap_or_else(|| default_output(&args.input));
    fs::write(&output, &out)?;
    log::info!("wrote {}", output.display());
    Ok(())
}

fn default_output(input: &Path) -> PathBuf {
    let name = input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "model.mdl".into());
    input.with_file_name(format!("MOD_{name}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_output_prefixes_file_name() {
        assert_eq!(
            default_output(Path::new("models/barney.mdl")),
            Path::new("models/MOD_barney.mdl")
        );
    }
}

//! Minimal reader for the MDL model container: just enough of the header
//! to locate the texture directory. Geometry, skeleton and sequence
//! sections are never interpreted.

use crate::error::{Error, Result};
use crate::texture::TextureDesc;
use crate::{convert_error, nom_fail, too_large};
use nom::{
    bytes::complete::{tag, take},
    error::{context, ParseError, VerboseError},
    number::complete::le_i32,
};

pub const MDL_MAGIC: &[u8; 4] = b"IDST";
pub const MDL_VERSION: i32 = 10;

/// Bytes between the header's name/length fields and the texture-count
/// field: bounds vectors, bone, controller, hitbox and sequence counts.
const HEADER_SKIP: usize = 104;

/// One texture directory record: 64-byte name, flags, width, height and
/// the absolute offset of the pixel data.
const TEXTURE_RECORD_LEN: usize = 80;

#[derive(Clone, Debug)]
pub struct Mdl {
    pub name: String,
    pub textures: Vec<TextureDesc>,
}

impl Mdl {
    /// Parses the header and texture directory. Records that point outside
    /// the buffer or have empty dimensions are skipped with a warning so
    /// one bad entry does not hide the rest.
    pub fn parse(data: &[u8]) -> Result<Self> {
        let res: nom::IResult<_, _, VerboseError<&[u8]>> =
            context("MDL", parse_mdl)(data);
        let mut mdl = res
            .map_err(|e| Error::Parse(convert_error(data, e)))?
            .1;
        let len = data.len();
        mdl.textures.retain(|t| {
            if t.width == 0 || t.height == 0 {
                log::warn!("skipping texture {:?}: empty dimensions", t.name);
                return false;
            }
            match t.check_bounds(len) {
                Ok(()) => true,
                Err(e) => {
                    log::warn!("skipping texture {:?}: {e}", t.name);
                    false
                }
            }
        });
        Ok(mdl)
    }
}

fn parse_mdl<'a, E: ParseError<&'a [u8]>>(input: &'a [u8]) -> nom::IResult<&'a [u8], Mdl, E> {
    let (rest, _) = tag(MDL_MAGIC.as_slice())(input)?;
    let (rest, version) = le_i32(rest)?;
    if version != MDL_VERSION {
        return Err(nom_fail(rest));
    }
    let (rest, name) = take(64usize)(rest)?;
    let (rest, _length) = le_i32(rest)?;
    let (rest, _) = take(HEADER_SKIP)(rest)?;
    let (rest, num_textures) = le_i32(rest)?;
    let (_, texture_index) = le_i32(rest)?;

    let count = usize::try_from(num_textures).map_err(|_| too_large(rest))?;
    let dir_start = usize::try_from(texture_index).map_err(|_| too_large(rest))?;
    let mut dir = input.get(dir_start..).ok_or_else(|| too_large(input))?;
    if count > dir.len() / TEXTURE_RECORD_LEN {
        return Err(too_large(dir));
    }

    let mut textures = Vec::with_capacity(count);
    for _ in 0..count {
        let (d, desc) = parse_texture(dir)?;
        dir = d;
        textures.push(desc);
    }

    Ok((
        dir,
        Mdl {
            name: zero_terminated(name),
            textures,
        },
    ))
}

fn parse_texture<'a, E: ParseError<&'a [u8]>>(
    data: &'a [u8],
) -> nom::IResult<&'a [u8], TextureDesc, E> {
    let (data, name) = take(64usize)(data)?;
    let (data, _flags) = le_i32(data)?;
    let (data, width) = le_i32(data)?;
    let (data, height) = le_i32(data)?;
    let (data, index) = le_i32(data)?;

    let width = u32::try_from(width).map_err(|_| too_large(data))?;
    let height = u32::try_from(height).map_err(|_| too_large(data))?;
    let offset = usize::try_from(index).map_err(|_| too_large(data))?;

    Ok((
        data,
        TextureDesc {
            name: zero_terminated(name),
            width,
            height,
            offset,
        },
    ))
}

fn zero_terminated(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|&c| c == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}

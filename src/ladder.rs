//! Rendition ladder files.
//!
//! A ladder file is JSON: either a bare array of renditions or an object with
//! a `renditions` array, so a full config file can double as a ladder file.

use std::path::Path;

use hf_core::{Error, RenditionLadder, RenditionSpec, Result};
use serde::Deserialize;

#[derive(Deserialize)]
#[serde(untagged)]
enum LadderFile {
    Bare(Vec<RenditionSpec>),
    Wrapped { renditions: Vec<RenditionSpec> },
}

/// Parse ladder JSON. An empty list is returned as-is; the resolver maps it
/// to the built-in ladder.
pub fn parse_renditions(json: &str) -> Result<Vec<RenditionSpec>> {
    let file: LadderFile = serde_json::from_str(json)
        .map_err(|e| Error::Validation(format!("ladder parse error: {e}")))?;
    Ok(match file {
        LadderFile::Bare(renditions) | LadderFile::Wrapped { renditions } => renditions,
    })
}

/// Read and parse a ladder file.
pub fn load_renditions(path: &Path) -> Result<Vec<RenditionSpec>> {
    let json = std::fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            Error::not_found("ladder file", path.display())
        } else {
            e.into()
        }
    })?;
    parse_renditions(&json)
}

/// Pick the effective ladder: a ladder file wins over the configured
/// renditions, and the built-in ladder fills in when neither is given.
pub fn select_ladder(
    ladder_file: Option<&Path>,
    configured: Option<&[RenditionSpec]>,
) -> Result<RenditionLadder> {
    let renditions = match ladder_file {
        Some(path) => Some(load_renditions(path)?),
        None => configured.map(<[RenditionSpec]>::to_vec),
    };
    RenditionLadder::resolve(renditions)
}

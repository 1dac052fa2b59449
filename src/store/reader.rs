//! Cassette loading

use std::io;
use std::path::Path;

use tracing::{debug, info};

use super::format::CassetteCodec;
use crate::cassette::Cassette;
use crate::Result;

/// Load the cassette stored at `path`
///
/// A missing file yields an empty cassette.
///
/// # Errors
///
/// Returns error if the file exists but cannot be read or decoded
pub fn load(path: &Path, codec: &dyn CassetteCodec) -> Result<Cassette> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!("No cassette at {}, starting empty", path.display());
            return Ok(Cassette::empty(path));
        }
        Err(e) => return Err(e.into()),
    };

    let interactions = codec.decode(&bytes)?;

    info!(
        "Loaded cassette '{}': {} interactions",
        path.display(),
        interactions.len()
    );

    Ok(Cassette::new(path, interactions))
}

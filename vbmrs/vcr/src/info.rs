use std::{
    fs::{File, OpenOptions},
    io::{ErrorKind, Read, Seek, SeekFrom},
    path::{Path, PathBuf},
};

use serde::Serialize;
use vbmrs_movie::{Metadata, VbmHeader, METADATA_SIZE};

use crate::error::VcrError;

/// Summary of a movie file, read without starting it.
#[derive(Debug, Clone, Serialize)]
pub struct MovieInfo {
    pub path: PathBuf,
    pub header: VbmHeader,
    pub metadata: Metadata,
    /// Frame count derived from the file size, or the live count if the movie is open.
    pub length_frames: u32,
    pub bytes_per_frame: usize,
    /// The file can't be opened for writing.
    pub read_only: bool,
}

/// Reads the header and author info of the movie at `path`.
pub fn read_info<P: AsRef<Path>>(path: P) -> Result<MovieInfo, VcrError> {
    let path = path.as_ref();
    if path.as_os_str().is_empty() {
        return Err(VcrError::FileNotFound(ErrorKind::NotFound.into()));
    }
    let mut file = File::open(path).map_err(VcrError::FileNotFound)?;

    let header = VbmHeader::read_from(&mut file)?;
    // old files may end right after the header
    let mut metadata = Vec::with_capacity(METADATA_SIZE);
    (&mut file)
        .take(METADATA_SIZE as u64)
        .read_to_end(&mut metadata)?;
    if metadata.len() < METADATA_SIZE {
        log::debug!("{}: author info is cut short", path.display());
    }
    let mut metadata_bytes = [0u8; METADATA_SIZE];
    metadata_bytes[..metadata.len()].copy_from_slice(&metadata);

    let file_size = file.seek(SeekFrom::End(0))?;
    let length_frames = header.length_from_size(file_size)?;
    let read_only = OpenOptions::new().write(true).open(path).is_err();

    Ok(MovieInfo {
        path: path.to_path_buf(),
        bytes_per_frame: header.bytes_per_frame(),
        header,
        metadata: Metadata::from_bytes(metadata_bytes),
        length_frames,
        read_only,
    })
}

//! The movie a session has open: its file, header, and controller data.

use std::{
    fs::File,
    io::{self, BufWriter, Read, Seek, SeekFrom, Take, Write},
    path::{Path, PathBuf},
};

use vbmrs_movie::{FrameBuffer, Metadata, VbmHeader, HEADER_SIZE, MAX_CONTROLLERS, METADATA_SIZE};

use crate::{
    error::VcrError,
    host::{CompatSettings, HostError},
    mux::Multiplexer,
};

/// Whether the open movie may be overwritten.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ReadOnly {
    #[default]
    Writable,
    /// Opened writable, but the user asked for playback only.
    ReadOnly,
    /// The file could only be opened for reading; this can't be toggled.
    Locked,
}

impl ReadOnly {
    pub fn is_read_only(self) -> bool {
        self != ReadOnly::Writable
    }
}

#[derive(Debug)]
pub(crate) struct Movie {
    pub header: VbmHeader,
    pub metadata: Metadata,
    pub buffer: FrameBuffer,
    pub read_only: ReadOnly,
    /// Set once anything was recorded since the movie was opened.
    pub recorded_this_session: bool,
    pub mux: Multiplexer,
    /// Emulator settings to put back when the movie closes.
    pub saved_settings: CompatSettings,
    /// Joypad state right after the start snapshot was loaded.
    pub start_joypad: [u16; MAX_CONTROLLERS],
    file: File,
    path: PathBuf,
}

impl Movie {
    pub fn new(
        header: VbmHeader,
        metadata: Metadata,
        file: File,
        path: PathBuf,
        read_only: ReadOnly,
        saved_settings: CompatSettings,
    ) -> Self {
        let mux = Multiplexer::new(header.controller_flags);
        Self {
            header,
            metadata,
            buffer: FrameBuffer::new(),
            read_only,
            recorded_this_session: false,
            mux,
            saved_settings,
            start_joypad: [0; MAX_CONTROLLERS],
            file,
            path,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn bytes_per_frame(&self) -> usize {
        self.header.bytes_per_frame()
    }

    /// Size of the recorded controller data in bytes.
    pub fn data_len(&self) -> usize {
        self.bytes_per_frame() * self.header.length_frames as usize
    }

    /// The recorded controller data.
    pub fn data(&self) -> &[u8] {
        self.buffer.slice(self.data_len()).unwrap_or_default()
    }

    /// Frame the buffer cursor is in.
    pub fn cursor_frame(&self) -> u32 {
        match self.bytes_per_frame() {
            0 => 0,
            bpf => (self.buffer.position() / bpf) as u32,
        }
    }

    /// Puts the cursor at the start of `frame` and begins a new polling round.
    pub fn seek_frame(&mut self, frame: u32) {
        self.buffer.seek(self.bytes_per_frame() * frame as usize);
        self.mux.restart_round();
    }

    /// Reads `length_frames` frames of controller data from the file.
    pub fn load_controller_data(&mut self) -> io::Result<()> {
        let len = self.data_len();
        self.buffer.reserve(len);
        self.file
            .seek(SeekFrom::Start(self.header.offset_to_controller_data.into()))?;
        match self.buffer.slice_mut(len) {
            Some(dst) => self.file.read_exact(dst),
            None => Ok(()),
        }
    }

    pub fn write_header(&mut self) -> io::Result<()> {
        self.file.seek(SeekFrom::Start(0))?;
        self.header.write_into(&mut self.file)
    }

    /// Reader over the embedded savestate or SRAM block.
    pub fn start_block(&mut self) -> io::Result<Take<&mut File>> {
        let len = self
            .header
            .offset_to_controller_data
            .saturating_sub(self.header.offset_to_savestate);
        self.file
            .seek(SeekFrom::Start(self.header.offset_to_savestate.into()))?;
        Ok((&mut self.file).take(len.into()))
    }

    /// Embeds a start block written by `write` after the author info, and
    /// moves the controller data behind it.
    pub fn write_start_block<F>(&mut self, write: F) -> Result<(), VcrError>
    where
        F: FnOnce(&mut dyn Write) -> Result<(), HostError>,
    {
        let start = (HEADER_SIZE + METADATA_SIZE) as u64;
        self.file.seek(SeekFrom::Start(start))?;
        {
            let mut writer = BufWriter::new(&mut self.file);
            write(&mut writer).map_err(VcrError::Emulator)?;
            writer.flush()?;
        }
        let end = self.file.stream_position()?;

        self.header.offset_to_savestate = start as u32;
        self.header.offset_to_controller_data =
            u32::try_from(end).map_err(|_| VcrError::WrongFormat("start block is too large"))?;
        log::debug!("embedded {} byte start block", end - start);
        Ok(())
    }

    /// Rewrites the header and the author info block.
    pub fn write_metadata(&mut self) -> io::Result<()> {
        self.write_header()?;
        self.file.seek(SeekFrom::Start(HEADER_SIZE as u64))?;
        self.file.write_all(self.metadata.as_bytes())?;
        self.file.flush()
    }

    /// Rewrites the header and all controller data.
    pub fn flush(&mut self) -> io::Result<()> {
        self.write_header()?;
        self.file
            .seek(SeekFrom::Start(self.header.offset_to_controller_data.into()))?;
        let len = self.data_len();
        if let Some(data) = self.buffer.slice(len) {
            self.file.write_all(data)?;
        }
        self.file.flush()
    }

    /// Writes buffer bytes `start..end` to their place in the file.
    pub fn write_range(&mut self, start: usize, end: usize) -> io::Result<()> {
        let Some(data) = self.buffer.slice(end) else {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "range is past the frame buffer",
            ));
        };
        let offset = u64::from(self.header.offset_to_controller_data) + start as u64;
        self.file.seek(SeekFrom::Start(offset))?;
        self.file.write_all(&data[start..])
    }

    /// Cuts the file down to the header's length.
    pub fn truncate(&mut self) -> io::Result<()> {
        if self.header.offset_to_savestate > self.header.offset_to_controller_data {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "savestate block follows controller data",
            ));
        }
        let size = self.header.logical_file_size();
        if self.file.metadata()?.len() != size {
            log::debug!("truncating {} to {} bytes", self.path.display(), size);
            self.file.set_len(size)?;
        }
        Ok(())
    }

    /// Final write-out before the file is closed. Failures are logged, not returned.
    pub fn finish(&mut self, flush: bool) {
        if flush {
            if let Err(err) = self.flush() {
                log::warn!("failed to flush {}: {}", self.path.display(), err);
            }
        }
        if self.read_only != ReadOnly::Locked {
            if let Err(err) = self.truncate() {
                log::warn!("failed to truncate {}: {}", self.path.display(), err);
            }
        }
        self.buffer.clear();
    }
}

//! Movie recording and playback, driven once per frame by the emulator.

use std::{
    fmt,
    fs::{self, File, OpenOptions},
    io,
    path::{Path, PathBuf},
};

use freeze::MovieFreeze;
use host::{CompatSettings, Emulator, InputSource, LogSink, MessageSink};
use movie::Movie;
use num_enum::{IntoPrimitive, TryFromPrimitive};
use vbmrs_movie::{
    ControllerFlags, Metadata, Sample, StartFlags, StringField, TypeFlags, VbmHeader,
    MAX_CONTROLLERS, SAMPLE_SIZE,
};

pub mod config;
pub mod error;
pub mod freeze;
pub mod host;
mod info;
mod movie;
pub mod mux;

pub use config::{EndPolicy, VcrConfig};
pub use error::{ResultCode, VcrError};
pub use info::{read_info, MovieInfo};
pub use movie::ReadOnly;

/// What the VCR is doing with the current movie.
#[repr(u32)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, IntoPrimitive, TryFromPrimitive)]
pub enum MovieState {
    /// No movie is open.
    #[default]
    None = 0,
    Record = 1,
    Play = 2,
    /// Playback ran out of frames; the movie stays open.
    End = 3,
}

/// A movie recording session. Holds at most one open movie.
///
/// The emulator calls [`Vcr::update_input`] whenever the game polls a
/// controller and [`Vcr::update_state`] once per frame. Savestates carry the
/// movie's progress through [`Vcr::freeze`] and [`Vcr::unfreeze`].
pub struct Vcr {
    config: VcrConfig,
    state: MovieState,
    movie: Option<Movie>,
    current_frame: u32,
    pause_at: Option<u32>,
    reset_signaled: bool,
    reset_signaled_last: bool,
    current_input: [Sample; MAX_CONTROLLERS],
    skip_rerecord_count: bool,
    /// Playback just ended and the end policy hasn't run yet.
    end_pending: bool,
    messages: Box<dyn MessageSink>,
}

impl fmt::Debug for Vcr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Vcr")
            .field("config", &self.config)
            .field("state", &self.state)
            .field("movie", &self.movie)
            .field("current_frame", &self.current_frame)
            .field("pause_at", &self.pause_at)
            .finish_non_exhaustive()
    }
}

impl Default for Vcr {
    fn default() -> Self {
        Self::new(VcrConfig::default())
    }
}

impl Vcr {
    pub fn new(config: VcrConfig) -> Self {
        Self::with_message_sink(config, Box::new(LogSink))
    }

    pub fn with_message_sink(config: VcrConfig, messages: Box<dyn MessageSink>) -> Self {
        Self {
            config,
            state: MovieState::None,
            movie: None,
            current_frame: 0,
            pause_at: None,
            reset_signaled: false,
            reset_signaled_last: false,
            current_input: [Sample::BLANK; MAX_CONTROLLERS],
            skip_rerecord_count: false,
            end_pending: false,
            messages,
        }
    }

    pub fn config(&self) -> &VcrConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: VcrConfig) {
        self.config = config;
    }

    /// Opens an existing movie and starts playing it from the beginning.
    ///
    /// The file is checked before the current movie is closed, so a bad file
    /// leaves the current movie running. If the file can't be opened for
    /// writing, the movie is [`ReadOnly::Locked`].
    pub fn open<P: AsRef<Path>>(
        &mut self,
        emu: &mut dyn Emulator,
        path: P,
        read_only: bool,
    ) -> Result<(), VcrError> {
        let path = path.as_ref();
        if path.as_os_str().is_empty() {
            return Err(VcrError::FileNotFound(io::ErrorKind::NotFound.into()));
        }
        if !emu.is_emulating() {
            return Err(VcrError::NotEmulating);
        }

        // a movie being recorded into this file has to be written out first
        let same_file = self.is_open_at(path);
        if same_file {
            self.teardown(emu);
        }
        let info = read_info(path)?;
        if !same_file {
            self.teardown(emu);
        }

        let (file, access) = match OpenOptions::new().read(true).write(true).open(path) {
            Ok(file) if read_only => (file, ReadOnly::ReadOnly),
            Ok(file) => (file, ReadOnly::Writable),
            Err(_) => (
                File::open(path).map_err(VcrError::FileNotFound)?,
                ReadOnly::Locked,
            ),
        };

        let mut header = info.header;
        header.length_frames = info.length_frames;

        let saved_settings = emu.compat_settings();
        emu.apply_compat_settings(&CompatSettings::from_header(
            &header,
            self.config.hide_border,
        ));

        let mut movie = Movie::new(
            header,
            info.metadata,
            file,
            canonical(path),
            access,
            saved_settings,
        );
        if let Err(err) = Self::start_playback(emu, &mut movie) {
            emu.apply_compat_settings(&movie.saved_settings);
            return Err(err);
        }

        log::info!(
            "playing {} ({} frames, {} rerecords, {:?})",
            movie.path().display(),
            movie.header.length_frames,
            movie.header.rerecord_count,
            access
        );
        self.movie = Some(movie);
        self.state = MovieState::Play;
        self.current_frame = 0;
        self.reset_signaled = false;
        self.reset_signaled_last = false;
        self.messages.message(if access.is_read_only() {
            "Movie replay (read)"
        } else {
            "Movie replay (edit)"
        });

        self.update_state(emu)
    }

    /// Puts the emulator in the movie's starting state and loads the input data.
    fn start_playback(emu: &mut dyn Emulator, movie: &mut Movie) -> Result<(), VcrError> {
        let start = movie.header.start_flags;
        if start.contains(StartFlags::FROM_SNAPSHOT) {
            emu.read_state(&mut movie.start_block()?)
                .map_err(VcrError::Emulator)?;
            movie.start_joypad = emu.joypad_state();
        } else if start.contains(StartFlags::FROM_SRAM) {
            emu.reset(false);
            emu.read_battery(&mut movie.start_block()?)
                .map_err(VcrError::Emulator)?;
        } else {
            hard_reset_and_clear(emu);
        }

        movie.load_controller_data()?;
        Ok(())
    }

    /// Starts recording a new movie into `path`, replacing the file.
    ///
    /// `start_flags` picks where the movie starts from: a savestate, the
    /// current SRAM, or (with neither) a hard reset with SRAM cleared.
    pub fn create<P: AsRef<Path>>(
        &mut self,
        emu: &mut dyn Emulator,
        path: P,
        author_info: &str,
        start_flags: StartFlags,
        controller_flags: ControllerFlags,
        type_flags: TypeFlags,
    ) -> Result<(), VcrError> {
        if !controller_flags.intersects(ControllerFlags::ANY) {
            return Err(VcrError::WrongFormat("no controllers enabled"));
        }
        if !emu.is_emulating() {
            return Err(VcrError::NotEmulating);
        }
        let path = path.as_ref();
        if path.as_os_str().is_empty() {
            return Err(VcrError::FileNotFound(io::ErrorKind::NotFound.into()));
        }

        let same_file = self.is_open_at(path);
        if same_file {
            self.teardown(emu);
        }
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)
            .map_err(VcrError::FileNotFound)?;
        if !same_file {
            self.teardown(emu);
        }

        let saved_settings = emu.compat_settings();
        let settings = saved_settings.for_recording();
        emu.apply_compat_settings(&settings);

        let rom = emu.rom_info();
        let mut header = VbmHeader::default();
        header.uid = chrono::Utc::now().timestamp() as u32;
        header.start_flags = start_flags;
        header.controller_flags = controller_flags;
        header.type_flags = type_flags;
        header.rom_title = StringField::from_bytes(rom.title);
        header.rom_crc = rom.crc;
        header.rom_or_bios_checksum = rom.checksum;
        header.rom_game_code = rom.game_code;
        settings.store(&mut header);

        let mut metadata = Metadata::default();
        let written = metadata.write_utf8_terminated(author_info);
        if written.len() < author_info.len() {
            log::warn!("author info cut to {} bytes", written.len());
        }

        let mut movie = Movie::new(
            header,
            metadata,
            file,
            canonical(path),
            ReadOnly::Writable,
            saved_settings,
        );
        if let Err(err) = Self::start_recording(emu, &mut movie) {
            emu.apply_compat_settings(&movie.saved_settings);
            return Err(err);
        }
        movie.recorded_this_session = true;

        log::info!(
            "recording {} (uid {}, {:?})",
            movie.path().display(),
            movie.header.uid,
            movie.header.controller_flags
        );
        self.movie = Some(movie);
        self.state = MovieState::Record;
        self.current_frame = 0;
        self.reset_signaled = false;
        self.reset_signaled_last = false;
        self.end_pending = false;
        self.messages.message("Recording movie...");
        Ok(())
    }

    /// Writes the header, author info, and start block of a new movie.
    fn start_recording(emu: &mut dyn Emulator, movie: &mut Movie) -> Result<(), VcrError> {
        movie.write_metadata()?;

        let start = movie.header.start_flags;
        if start.contains(StartFlags::FROM_SNAPSHOT) {
            movie.write_start_block(|writer| emu.write_state(writer))?;
        } else if start.contains(StartFlags::FROM_SRAM) {
            movie.write_start_block(|writer| emu.write_battery(writer))?;
            emu.reset(false);
        } else {
            hard_reset_and_clear(emu);
        }

        movie.write_header()?;
        movie.buffer.reserve(movie.bytes_per_frame());
        Ok(())
    }

    /// Closes the current movie.
    pub fn stop(&mut self, emu: &mut dyn Emulator, suppress_message: bool) {
        if self.state != MovieState::None {
            self.teardown(emu);
            if !suppress_message {
                self.messages.message("Movie stop");
            }
        }
    }

    /// Writes out and closes the movie, and gives the emulator its settings back.
    fn teardown(&mut self, emu: &mut dyn Emulator) {
        if let Some(mut movie) = self.movie.take() {
            movie.finish(self.state == MovieState::Record);
            emu.apply_compat_settings(&movie.saved_settings);
            log::info!("closed {}", movie.path().display());
        }
        self.state = MovieState::None;
        self.current_frame = 0;
        self.end_pending = false;
    }

    fn change_state(&mut self, state: MovieState) -> Result<(), VcrError> {
        if state == self.state {
            return Ok(());
        }
        if self.state == MovieState::Record {
            if let Some(movie) = self.movie.as_mut() {
                movie.flush()?;
            }
        }
        self.state = state;
        Ok(())
    }

    fn enter_end(&mut self) {
        self.state = MovieState::End;
        self.end_pending = true;
        self.messages.message("Movie end");
        log::info!("movie ended at frame {}", self.current_frame);
    }

    /// Handles a poll of the controller on `port`, returning what the game should see.
    ///
    /// While playing, the recorded input replaces `input`. While recording,
    /// `input` is written to the movie, along with the motion sensor if
    /// `sensor` is set. Controllers the movie doesn't record read as blank.
    pub fn update_input(
        &mut self,
        port: usize,
        sensor: bool,
        input: &dyn InputSource,
    ) -> Result<Sample, VcrError> {
        if port >= MAX_CONTROLLERS {
            return Ok(Sample::BLANK);
        }
        let recorded = self
            .movie
            .as_ref()
            .is_some_and(|movie| movie.header.controller_flags.port_present(port));

        match self.state {
            MovieState::Play if recorded => self.read_samples(port),
            MovieState::Record if recorded => self.write_samples(port, sensor, input)?,
            MovieState::Play | MovieState::Record => self.current_input[port] = Sample::BLANK,
            MovieState::None | MovieState::End => {
                self.current_input[port] = Sample::from_bits_retain(input.buttons(port));
                self.current_frame = self.current_frame.wrapping_add(1);
            }
        }
        Ok(self.current_input[port])
    }

    fn read_samples(&mut self, port: usize) {
        let Some(movie) = self.movie.as_mut() else {
            return;
        };
        let data_len = movie.data_len();
        for slot in movie.mux.poll(port) {
            if slot.synthesized {
                log::trace!("controller {} skipped, reading its sample", slot.port);
            }
            let sample = if movie.buffer.position() + SAMPLE_SIZE <= data_len {
                movie.buffer.read_sample().unwrap_or(Sample::BLANK)
            } else {
                Sample::BLANK
            };
            if sample.contains(Sample::NEW_RESET) {
                self.reset_signaled = true;
            }
            self.current_input[slot.port] = sample;
        }

        self.current_frame = movie.cursor_frame();
        if self.current_frame >= movie.header.length_frames {
            self.enter_end();
        }
    }

    fn write_samples(
        &mut self,
        port: usize,
        sensor: bool,
        input: &dyn InputSource,
    ) -> Result<(), VcrError> {
        let Some(movie) = self.movie.as_mut() else {
            return Ok(());
        };
        let start = movie.buffer.position();
        for slot in movie.mux.poll(port) {
            if slot.synthesized {
                log::trace!("controller {} skipped, recording its held input", slot.port);
            }
            let mut sample = Sample::from_regular(input.buttons(slot.port));
            if sensor {
                sample |= Sample::from(input.motion(slot.port));
            }
            if self.reset_signaled {
                sample |= Sample::NEW_RESET;
            }
            if self.reset_signaled_last {
                sample |= Sample::OLD_RESET;
                self.reset_signaled_last = false;
            }

            movie.buffer.reserve(movie.buffer.position() + SAMPLE_SIZE);
            movie.buffer.write_sample(sample)?;
            self.current_input[slot.port] = sample;
        }
        let end = movie.buffer.position();

        self.current_frame = movie.cursor_frame();
        movie.header.length_frames = self.current_frame;
        movie.recorded_this_session = true;
        movie.write_range(start, end)?;
        Ok(())
    }

    /// Per-frame housekeeping: applies the end-of-movie policy and pauses
    /// at the requested frame.
    pub fn update_state(&mut self, emu: &mut dyn Emulator) -> Result<(), VcrError> {
        let mut will_pause = false;

        if self.state == MovieState::Play && self.current_frame >= self.length() {
            self.enter_end();
        }

        if self.end_pending {
            self.end_pending = false;
            will_pause = self.config.pause_on_end;

            let recorded_this_session = self
                .movie
                .as_ref()
                .is_some_and(|movie| movie.recorded_this_session);
            match self.config.end_policy {
                // restarting waits for the next frame
                EndPolicy::Restart | EndPolicy::KeepOpen => (),
                EndPolicy::SwitchToRecord if recorded_this_session => {
                    self.switch_to_recording()?;
                    will_pause = true;
                }
                EndPolicy::SwitchToRecord | EndPolicy::Close => self.teardown(emu),
            }
        } else if self.state == MovieState::End
            && self.config.end_policy == EndPolicy::Restart
            && self.current_frame == self.length().wrapping_add(1)
        {
            self.restart(emu)?;
        }

        let at_pause_frame = self.is_active()
            && self
                .pause_at
                .is_some_and(|frame| self.current_frame >= frame);
        if will_pause || at_pause_frame {
            self.pause_at = None;
            emu.pause();
        }
        Ok(())
    }

    /// Captures the movie's progress for embedding in a savestate.
    pub fn freeze(&self) -> Result<Vec<u8>, VcrError> {
        let movie = self.movie.as_ref().ok_or(VcrError::NotFromAMovie)?;
        let blob = MovieFreeze {
            uid: movie.header.uid,
            current_frame: self.current_frame,
            end_frame: movie.header.length_frames,
            data: movie.data(),
        }
        .encode();
        log::debug!(
            "froze movie at frame {} ({} bytes)",
            self.current_frame,
            blob.len()
        );
        Ok(blob)
    }

    /// Restores movie progress from a savestate.
    ///
    /// A read-only movie keeps its input and only moves to the savestate's
    /// frame; the savestate's input history must agree with it. A writable
    /// movie takes over the savestate's history, which counts as a rerecord.
    /// The session is left as it was if the blob is rejected or the adopted
    /// history can't be written out.
    pub fn unfreeze(&mut self, blob: &[u8]) -> Result<(), VcrError> {
        let Some(movie) = self.movie.as_mut() else {
            return Err(VcrError::NotFromAMovie);
        };
        let freeze = MovieFreeze::decode(blob)?;
        if freeze.uid != movie.header.uid {
            return Err(VcrError::NotFromThisMovie);
        }
        let bytes_per_frame = movie.bytes_per_frame();
        let history = freeze
            .frames(bytes_per_frame, freeze.end_frame)
            .ok_or(VcrError::WrongFormat("movie freeze is missing input data"))?;

        let current_frame = freeze.current_frame;
        let length = movie.header.length_frames;

        let next_state = if movie.read_only.is_read_only() {
            // a savestate from a shorter recording can't be past its own end
            if freeze.end_frame < length && freeze.end_frame < current_frame {
                return Err(VcrError::SnapshotInconsistent);
            }
            let shared_frames = current_frame.min(freeze.end_frame).min(length);
            let shared = shared_frames as usize * bytes_per_frame;
            if movie.data().get(..shared) != Some(&history[..shared]) {
                log::debug!("savestate input diverges from the movie within {} bytes", shared);
                return Err(VcrError::SnapshotInconsistent);
            }

            if current_frame >= length {
                MovieState::End
            } else {
                MovieState::Play
            }
        } else {
            let previous = (
                movie.header.length_frames,
                movie.header.rerecord_count,
                movie.data().to_vec(),
            );
            movie.header.length_frames = freeze.end_frame;
            if !self.skip_rerecord_count {
                movie.header.rerecord_count = movie.header.rerecord_count.wrapping_add(1);
            }
            movie.buffer.copy_from(history);
            if let Err(err) = movie.flush() {
                let (length, rerecord_count, data) = previous;
                movie.header.length_frames = length;
                movie.header.rerecord_count = rerecord_count;
                movie.buffer.copy_from(&data);
                log::warn!("failed to write unfrozen movie: {}", err);
                return Err(err.into());
            }

            if current_frame >= freeze.end_frame {
                MovieState::End
            } else {
                MovieState::Record
            }
        };

        movie.seek_frame(current_frame);
        log::debug!(
            "unfroze movie at frame {} of {}",
            current_frame,
            movie.header.length_frames
        );
        self.current_frame = current_frame;
        self.change_state(next_state)
    }

    /// Whether recording could resume at the current frame.
    pub fn allows_rerecording(&self) -> bool {
        self.is_active() && self.current_frame <= self.length()
    }

    /// Resumes recording at the current frame, dropping everything after it.
    ///
    /// A read-only movie is made writable first. Returns `false` if the
    /// current frame is past the end of the movie.
    pub fn switch_to_recording(&mut self) -> Result<bool, VcrError> {
        if !self.is_active() {
            return Err(VcrError::Inactive);
        }
        if !self.allows_rerecording() {
            return Ok(false);
        }
        if self.read_only() != Some(ReadOnly::Writable) {
            self.toggle_read_only()?;
        }

        self.change_state(MovieState::Record)?;
        self.messages.message("Movie re-record");

        let current_frame = self.current_frame;
        let skip_rerecord_count = self.skip_rerecord_count;
        let Some(movie) = self.movie.as_mut() else {
            return Err(VcrError::Inactive);
        };
        movie.header.length_frames = current_frame;
        if !skip_rerecord_count {
            movie.header.rerecord_count = movie.header.rerecord_count.wrapping_add(1);
        }
        if movie.buffer.position() != movie.bytes_per_frame() * current_frame as usize {
            movie.seek_frame(current_frame);
        }
        movie.flush()?;
        log::info!(
            "rerecording from frame {} (rerecord {})",
            current_frame,
            movie.header.rerecord_count
        );
        Ok(true)
    }

    /// Plays the current movie again from the start.
    pub fn restart(&mut self, emu: &mut dyn Emulator) -> Result<(), VcrError> {
        let Some(movie) = self.movie.as_ref() else {
            return Ok(());
        };
        let recorded_this_session = movie.recorded_this_session;
        let read_only = movie.read_only.is_read_only();
        let path = movie.path().to_path_buf();

        self.stop(emu, true);
        self.open(emu, &path, read_only)?;

        if let Some(movie) = self.movie.as_mut() {
            movie.recorded_this_session = recorded_this_session;
        }
        self.current_input = [Sample::BLANK; MAX_CONTROLLERS];
        Ok(())
    }

    /// Flips between read-only and writable. Locked movies stay read-only.
    pub fn toggle_read_only(&mut self) -> Result<(), VcrError> {
        let movie = self.movie.as_mut().ok_or(VcrError::Inactive)?;
        match movie.read_only {
            ReadOnly::Locked => {
                log::warn!("{} is not writable", movie.path().display());
                self.messages.message("Can't toggle read-only movie");
                return Err(VcrError::Locked);
            }
            ReadOnly::ReadOnly => {
                movie.read_only = ReadOnly::Writable;
                self.messages.message("Movie now editable");
            }
            ReadOnly::Writable => {
                movie.read_only = ReadOnly::ReadOnly;
                self.messages.message("Movie now read-only");
            }
        }
        Ok(())
    }

    /// Replaces the author info and writes it to the file.
    pub fn set_metadata(&mut self, info: &str) -> Result<(), VcrError> {
        let movie = self.movie.as_mut().ok_or(VcrError::Inactive)?;
        let mut metadata = Metadata::default();
        metadata.write_utf8_terminated(info);
        if metadata == movie.metadata {
            return Ok(());
        }
        if movie.read_only == ReadOnly::Locked {
            return Err(VcrError::Locked);
        }
        movie.metadata = metadata;
        movie.write_metadata()?;
        Ok(())
    }

    /// Pauses the emulator once the frame counter reaches `frame`. `None` disables it.
    pub fn set_pause_at(&mut self, frame: Option<u32>) {
        self.pause_at = frame;
    }

    pub fn pause_at(&self) -> Option<u32> {
        self.pause_at
    }

    /// Requests a soft reset, which is recorded into the movie.
    pub fn signal_reset(&mut self) {
        if self.is_active() {
            self.reset_signaled = true;
        }
    }

    /// Performs a pending reset. Call once per frame after input is read.
    pub fn reset_if_requested(&mut self, emu: &mut dyn Emulator) {
        if self.reset_signaled {
            emu.reset(false);
            self.reset_signaled = false;
            self.reset_signaled_last = true;
        }
    }

    /// Keeps scripted rerecords from bumping the rerecord count.
    pub fn set_rerecord_count_skip(&mut self, skip: bool) {
        self.skip_rerecord_count = skip;
    }

    /// Sets the rerecord count, returning the previous one.
    pub fn set_rerecord_count(&mut self, count: u32) -> u32 {
        match self.movie.as_mut() {
            Some(movie) => std::mem::replace(&mut movie.header.rerecord_count, count),
            None => 0,
        }
    }

    /// Upgrades the open movie for newer players: the first frame of a
    /// savestate-started movie gets the joypad state the savestate carried,
    /// and legacy reset markers are converted.
    pub fn convert_current(&mut self) -> Result<(), VcrError> {
        let movie = self.movie.as_mut().ok_or(VcrError::Inactive)?;
        if movie.read_only == ReadOnly::Locked {
            return Err(VcrError::Locked);
        }

        let flags = movie.header.controller_flags;
        let length = movie.header.length_frames;
        let data_len = movie.data_len();
        let start_joypad = movie.start_joypad;

        if movie.header.start_flags.contains(StartFlags::FROM_SNAPSHOT) {
            let bytes_per_frame = movie.bytes_per_frame();
            movie.buffer.reserve(bytes_per_frame);
            if let Some(first) = movie.buffer.slice_mut(bytes_per_frame) {
                for (slot, port) in flags.ports().enumerate() {
                    let offset = slot * SAMPLE_SIZE;
                    first[offset..offset + SAMPLE_SIZE]
                        .copy_from_slice(&start_joypad[port].to_le_bytes());
                }
            }
        }

        let converted = match movie.buffer.slice_mut(data_len) {
            Some(data) => vbmrs_movie::convert_legacy_resets(data, flags, length),
            None => 0,
        };
        log::info!("converted {} legacy resets", converted);

        movie.flush()?;
        self.messages.message("Movie converted");
        Ok(())
    }

    /// Reads a movie's header without disturbing the session. If the movie is
    /// the one currently open, its live length is reported.
    pub fn get_info<P: AsRef<Path>>(&self, path: P) -> Result<MovieInfo, VcrError> {
        let path = path.as_ref();
        let mut info = read_info(path)?;
        if let Some(movie) = self.movie.as_ref().filter(|_| self.is_open_at(path)) {
            info.length_frames = movie.header.length_frames;
            info.bytes_per_frame = movie.bytes_per_frame();
        }
        Ok(info)
    }

    fn is_open_at(&self, path: &Path) -> bool {
        self.movie
            .as_ref()
            .is_some_and(|movie| movie.path() == canonical(path))
    }

    pub fn state(&self) -> MovieState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state != MovieState::None
    }

    pub fn is_playing(&self) -> bool {
        self.state == MovieState::Play
    }

    pub fn is_recording(&self) -> bool {
        self.state == MovieState::Record
    }

    /// Read-only mode of the open movie.
    pub fn read_only(&self) -> Option<ReadOnly> {
        self.movie.as_ref().map(|movie| movie.read_only)
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only().is_some_and(ReadOnly::is_read_only)
    }

    pub fn header(&self) -> Option<&VbmHeader> {
        self.movie.as_ref().map(|movie| &movie.header)
    }

    /// UID of the open movie, or 0.
    pub fn id(&self) -> u32 {
        self.header().map_or(0, |header| header.uid)
    }

    pub fn length(&self) -> u32 {
        self.header().map_or(0, |header| header.length_frames)
    }

    /// Current frame of the open movie, or 0.
    pub fn frame_counter(&self) -> u32 {
        if self.is_active() {
            self.current_frame
        } else {
            0
        }
    }

    pub fn rerecord_count(&self) -> u32 {
        self.header().map_or(0, |header| header.rerecord_count)
    }

    pub fn filename(&self) -> Option<&Path> {
        self.movie.as_ref().map(Movie::path)
    }

    pub fn author_info(&self) -> Option<String> {
        self.movie.as_ref().map(|movie| movie.metadata.read_lossy())
    }

    /// Input the game last saw on `port`.
    pub fn current_input(&self, port: usize, regular_only: bool) -> u16 {
        let Some(&sample) = self.current_input.get(port) else {
            return 0;
        };
        if regular_only {
            sample.regular().bits()
        } else {
            sample.bits()
        }
    }

    /// Frame counter as shown on screen.
    pub fn frame_counter_text(&self) -> String {
        let frame = self.frame_counter();
        match self.state {
            MovieState::Play => format!("{} / {}", frame, self.length()),
            MovieState::End => format!("{} ({})", frame, self.length()),
            MovieState::Record => format!("{} (record)", frame),
            MovieState::None => format!("{} (no movie)", frame),
        }
    }
}

impl Drop for Vcr {
    fn drop(&mut self) {
        // emulator settings can't be restored from here
        if let Some(movie) = self.movie.as_mut() {
            movie.finish(self.state == MovieState::Record);
        }
    }
}

/// Starts the game from power-on with its battery save deleted.
fn hard_reset_and_clear(emu: &mut dyn Emulator) {
    emu.clear_battery();
    emu.reset(true);
}

fn canonical(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

//! Reading and writing of VisualBoyAdvance `.vbm` movie files.

use std::{
    fmt::Debug,
    io::{self, Read, Seek, SeekFrom, Write},
};

use bytes::{Buf, BufMut};
use error::HeaderError;
use serde::Serialize;

pub mod buffer;
pub mod error;
mod helpers;
pub mod sample;

pub use buffer::{FrameBuffer, BUFFER_GROWTH_SIZE};
pub use helpers::StringField;
pub use sample::{Motion, Sample, SAMPLE_SIZE};

pub const VBM_MAGIC: [u8; 4] = [b'V', b'B', b'M', 0x1Au8];
/// The only header version this crate reads or writes.
pub const VBM_VERSION: u32 = 1;
pub const HEADER_SIZE: usize = 64;
/// Size of the author info block that follows the header.
pub const METADATA_SIZE: usize = 192;
pub const MAX_CONTROLLERS: usize = 4;

/// Author info stored right after the header.
pub type Metadata = StringField<METADATA_SIZE>;

#[derive(Clone, PartialEq, Eq, Hash, Serialize)]
pub struct VbmHeader {
    #[serde(skip)]
    magic: [u8; 4],
    version: u32,
    /// A unique UID associated with the movie. Equal to the Unix timestamp of its creation.
    pub uid: u32,
    /// Number of frames in the movie.
    pub length_frames: u32,
    /// Number of rerecords for this movie.
    pub rerecord_count: u32,
    /// How the movie should be started.
    pub start_flags: StartFlags,
    /// Which controllers were recorded.
    pub controller_flags: ControllerFlags,
    /// Which system the movie was recorded on.
    pub type_flags: TypeFlags,
    /// Emulator settings in effect while recording.
    pub option_flags: OptionFlags,
    pub save_type: u32,
    pub flash_size: u32,
    pub gb_emulator_type: u32,
    /// Internal name of the ROM, ripped from its header.
    pub rom_title: StringField<12>,
    pub reserved_byte: u8,
    pub rom_crc: u8,
    /// ROM checksum on GB/GBC, BIOS checksum on GBA.
    pub rom_or_bios_checksum: u16,
    pub rom_game_code: u32,
    /// File offset of the embedded savestate or SRAM, if any.
    pub offset_to_savestate: u32,
    /// File offset of the first frame of controller data.
    pub offset_to_controller_data: u32,
}

impl Default for VbmHeader {
    fn default() -> Self {
        Self {
            magic: VBM_MAGIC,
            version: VBM_VERSION,
            uid: 0,
            length_frames: 0,
            rerecord_count: 0,
            start_flags: StartFlags::empty(),
            controller_flags: ControllerFlags::P1_PRESENT,
            type_flags: TypeFlags::empty(),
            option_flags: OptionFlags::empty(),
            save_type: 0,
            flash_size: 0,
            gb_emulator_type: 0,
            rom_title: Default::default(),
            reserved_byte: 0,
            rom_crc: 0,
            rom_or_bios_checksum: 0,
            rom_game_code: 0,
            offset_to_savestate: 0,
            offset_to_controller_data: (HEADER_SIZE + METADATA_SIZE) as u32,
        }
    }
}

impl VbmHeader {
    pub fn version(&self) -> u32 {
        self.version
    }

    /// Decodes a header from the start of `data`.
    ///
    /// # Errors
    /// Fails with [`HeaderError::WrongFormat`] if `data` is too short or has the wrong
    /// signature, and with [`HeaderError::WrongVersion`] for any version but 1.
    pub fn decode(data: &[u8]) -> Result<Self, HeaderError> {
        if data.len() < HEADER_SIZE {
            return Err(HeaderError::WrongFormat("header is truncated"));
        }
        let mut buf = &data[..HEADER_SIZE];

        let mut magic = [0u8; 4];
        buf.copy_to_slice(&mut magic);
        if magic != VBM_MAGIC {
            return Err(HeaderError::WrongFormat("signature doesn't match"));
        }
        let version = buf.get_u32_le();
        if version != VBM_VERSION {
            return Err(HeaderError::WrongVersion(version));
        }

        let uid = buf.get_u32_le();
        // Old tools (TME) stored the length one short; the format kept doing so.
        let length_frames = buf.get_u32_le().wrapping_add(1);
        let rerecord_count = buf.get_u32_le();

        let start_flags = StartFlags::from_bits_retain(buf.get_u8());
        let controller_flags = ControllerFlags::from_bits_retain(buf.get_u8());
        let type_flags = TypeFlags::from_bits_retain(buf.get_u8());
        let option_flags = OptionFlags::from_bits_retain(buf.get_u8());

        let save_type = buf.get_u32_le();
        let flash_size = buf.get_u32_le();
        let gb_emulator_type = buf.get_u32_le();

        let mut rom_title = [0u8; 12];
        buf.copy_to_slice(&mut rom_title);

        Ok(Self {
            magic,
            version,
            uid,
            length_frames,
            rerecord_count,
            start_flags,
            controller_flags,
            type_flags,
            option_flags,
            save_type,
            flash_size,
            gb_emulator_type,
            rom_title: StringField::from_bytes(rom_title),
            reserved_byte: buf.get_u8(),
            rom_crc: buf.get_u8(),
            rom_or_bios_checksum: buf.get_u16_le(),
            rom_game_code: buf.get_u32_le(),
            offset_to_savestate: buf.get_u32_le(),
            offset_to_controller_data: buf.get_u32_le(),
        })
    }

    /// Encodes the header. The inverse of [`VbmHeader::decode`].
    pub fn encode(&self) -> [u8; HEADER_SIZE] {
        let mut result = [0u8; HEADER_SIZE];
        let mut buf = &mut result[..];

        buf.put_slice(&self.magic);
        buf.put_u32_le(self.version);
        buf.put_u32_le(self.uid);
        buf.put_u32_le(self.length_frames.wrapping_sub(1));
        buf.put_u32_le(self.rerecord_count);

        buf.put_u8(self.start_flags.bits());
        buf.put_u8(self.controller_flags.bits());
        buf.put_u8(self.type_flags.bits());
        buf.put_u8(self.option_flags.bits());

        buf.put_u32_le(self.save_type);
        buf.put_u32_le(self.flash_size);
        buf.put_u32_le(self.gb_emulator_type);
        buf.put_slice(self.rom_title.as_bytes());

        buf.put_u8(self.reserved_byte);
        buf.put_u8(self.rom_crc);
        buf.put_u16_le(self.rom_or_bios_checksum);
        buf.put_u32_le(self.rom_game_code);
        buf.put_u32_le(self.offset_to_savestate);
        buf.put_u32_le(self.offset_to_controller_data);

        result
    }

    pub fn read_from<R: Read>(mut reader: R) -> Result<Self, HeaderError> {
        let mut buffer = [0u8; HEADER_SIZE];
        reader.read_exact(&mut buffer)?;
        Self::decode(&buffer)
    }

    pub fn write_into<W: Write>(&self, mut writer: W) -> io::Result<()> {
        writer.write_all(&self.encode())
    }

    /// Bytes of controller data per frame: one sample per recorded controller.
    pub fn bytes_per_frame(&self) -> usize {
        SAMPLE_SIZE * self.controller_flags.count()
    }

    /// Number of whole frames a file of `file_size` bytes holds.
    ///
    /// # Errors
    /// Fails if the header's offsets don't fit the file or no controller is recorded.
    pub fn length_from_size(&self, file_size: u64) -> Result<u32, HeaderError> {
        if self.offset_to_savestate > self.offset_to_controller_data {
            return Err(HeaderError::WrongFormat(
                "savestate block follows controller data",
            ));
        }
        let bytes_per_frame = self.bytes_per_frame() as u64;
        if bytes_per_frame == 0 {
            return Err(HeaderError::WrongFormat("no controllers recorded"));
        }
        let data_size = file_size
            .checked_sub(self.offset_to_controller_data.into())
            .ok_or(HeaderError::WrongFormat("controller data offset past end of file"))?;

        u32::try_from(data_size / bytes_per_frame)
            .map_err(|_| HeaderError::WrongFormat("too many frames"))
    }

    /// Size the file should have for the current length.
    pub fn logical_file_size(&self) -> u64 {
        u64::from(self.offset_to_controller_data)
            + self.bytes_per_frame() as u64 * u64::from(self.length_frames)
    }
}

impl Debug for VbmHeader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VbmHeader")
            .field("version", &self.version)
            .field("uid", &self.uid)
            .field("length_frames", &self.length_frames)
            .field("rerecord_count", &self.rerecord_count)
            .field("start_flags", &self.start_flags)
            .field("controller_flags", &self.controller_flags)
            .field("type_flags", &self.type_flags)
            .field("option_flags", &self.option_flags)
            .field("save_type", &self.save_type)
            .field("flash_size", &self.flash_size)
            .field("gb_emulator_type", &self.gb_emulator_type)
            .field("rom_title", &self.rom_title)
            .field("rom_crc", &self.rom_crc)
            .field("rom_or_bios_checksum", &self.rom_or_bios_checksum)
            .field("rom_game_code", &self.rom_game_code)
            .field("offset_to_savestate", &self.offset_to_savestate)
            .field("offset_to_controller_data", &self.offset_to_controller_data)
            .finish()
    }
}

bitflags::bitflags! {
    /// Value indicating how the movie is to be started.
    /// With neither flag set the movie starts from power-on with SRAM cleared.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
    pub struct StartFlags: u8 {
        /// A savestate is embedded in the movie file.
        const FROM_SNAPSHOT = 1 << 0;
        /// An SRAM dump is embedded in the movie file.
        const FROM_SRAM = 1 << 1;
    }
}

bitflags::bitflags! {
    /// Flags indicating which controllers are recorded.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
    pub struct ControllerFlags: u8 {
        const P1_PRESENT = 1 << 0;
        const P2_PRESENT = 1 << 1;
        const P3_PRESENT = 1 << 2;
        const P4_PRESENT = 1 << 3;
    }
}

impl ControllerFlags {
    pub const ANY: ControllerFlags = ControllerFlags::from_bits_retain(0x0F);

    /// Returns the flag for the controller on `port`.
    pub fn port(port: usize) -> Option<Self> {
        (port < MAX_CONTROLLERS).then(|| Self::from_bits_retain(1 << port))
    }

    pub fn port_present(self, port: usize) -> bool {
        Self::port(port).is_some_and(|flag| self.contains(flag))
    }

    /// Number of recorded controllers.
    pub fn count(self) -> usize {
        (self & Self::ANY).bits().count_ones() as usize
    }

    /// Recorded ports in ascending order.
    pub fn ports(self) -> impl Iterator<Item = usize> {
        (0..MAX_CONTROLLERS).filter(move |port| self.port_present(*port))
    }
}

bitflags::bitflags! {
    /// The system the movie was recorded on.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
    pub struct TypeFlags: u8 {
        const GBA = 1 << 0;
        const GBC = 1 << 1;
        const SGB = 1 << 2;
    }
}

bitflags::bitflags! {
    /// Emulator settings captured at record time, needed to keep playback in sync.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
    pub struct OptionFlags: u8 {
        const USE_BIOS_FILE = 1 << 0;
        const SKIP_BIOS_FILE = 1 << 1;
        const RTC_ENABLE = 1 << 2;
        const GB_INPUT_HACK = 1 << 3;
        const LAG_HACK = 1 << 4;
        const GBC_FF55_FIX = 1 << 5;
        const GB_ECHO_RAM_FIX = 1 << 6;
    }
}

/// Sets the new reset bit on every frame whose following frame carries the legacy
/// reset bit. Returns how many samples were changed.
pub fn convert_legacy_resets(
    data: &mut [u8],
    controller_flags: ControllerFlags,
    length_frames: u32,
) -> usize {
    let old_reset = (Sample::OLD_RESET.bits() >> 8) as u8;
    let new_reset = (Sample::NEW_RESET.bits() >> 8) as u8;
    let bytes_per_frame = SAMPLE_SIZE * controller_flags.count();
    let frames = (length_frames as usize).min(data.len() / bytes_per_frame.max(1));

    let mut converted = 0;
    for slot in 0..controller_flags.count() {
        for frame in 1..frames {
            let high = frame * bytes_per_frame + slot * SAMPLE_SIZE + 1;
            if data[high] & old_reset != 0 {
                let prev = high - bytes_per_frame;
                if data[prev] & new_reset == 0 {
                    data[prev] |= new_reset;
                    converted += 1;
                }
            }
        }
    }
    converted
}

/// A whole `.vbm` file held in memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VbmFile {
    pub header: VbmHeader,
    pub metadata: Metadata,
    /// Embedded savestate or SRAM block, empty when the movie starts from power-on.
    pub start_block: Vec<u8>,
    /// `header.length_frames` frames of controller data.
    pub controller_data: Vec<u8>,
}

impl VbmFile {
    /// Reads a movie. The frame count is derived from the file size, as the
    /// header's count is not trusted.
    pub fn read_from<R: Read + Seek>(mut reader: R) -> Result<Self, HeaderError> {
        let mut header = VbmHeader::read_from(&mut reader)?;

        let mut metadata = [0u8; METADATA_SIZE];
        reader.read_exact(&mut metadata)?;

        let file_size = reader.seek(SeekFrom::End(0))?;
        let length = header.length_from_size(file_size)?;
        if length != header.length_frames {
            log::warn!(
                "header claims {} frames, file holds {}",
                header.length_frames,
                length
            );
        }
        header.length_frames = length;

        let start_block = if header
            .start_flags
            .intersects(StartFlags::FROM_SNAPSHOT | StartFlags::FROM_SRAM)
        {
            let size = header.offset_to_controller_data - header.offset_to_savestate;
            let mut block = vec![0u8; size as usize];
            reader.seek(SeekFrom::Start(header.offset_to_savestate.into()))?;
            reader.read_exact(&mut block)?;
            block
        } else {
            Vec::new()
        };

        let mut controller_data = vec![0u8; header.bytes_per_frame() * length as usize];
        reader.seek(SeekFrom::Start(header.offset_to_controller_data.into()))?;
        reader.read_exact(&mut controller_data)?;

        Ok(Self {
            header,
            metadata: StringField::from_bytes(metadata),
            start_block,
            controller_data,
        })
    }

    /// Writes the movie, recomputing both block offsets.
    pub fn write_into<W: Write>(mut self, writer: &mut W) -> io::Result<()> {
        let blocks_start = (HEADER_SIZE + METADATA_SIZE) as u32;
        if self.start_block.is_empty() {
            self.header.offset_to_savestate = 0;
            self.header.offset_to_controller_data = blocks_start;
        } else {
            let block_len = u32::try_from(self.start_block.len())
                .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "start block too large"))?;
            self.header.offset_to_savestate = blocks_start;
            self.header.offset_to_controller_data = blocks_start + block_len;
        }

        self.header.write_into(&mut *writer)?;
        writer.write_all(self.metadata.as_bytes())?;
        writer.write_all(&self.start_block)?;
        writer.write_all(&self.controller_data)?;
        Ok(())
    }

    /// Sample of the controller in `slot` (the n-th recorded controller) on `frame`.
    pub fn sample(&self, frame: u32, slot: usize) -> Option<Sample> {
        if slot >= self.header.controller_flags.count() {
            return None;
        }
        let offset = frame as usize * self.header.bytes_per_frame() + slot * SAMPLE_SIZE;
        let bytes = self.controller_data.get(offset..offset + SAMPLE_SIZE)?;
        Some(Sample::from_le_bytes([bytes[0], bytes[1]]))
    }

    /// Drops every frame from `length` on.
    pub fn truncate(&mut self, length: u32) {
        if length < self.header.length_frames {
            self.header.length_frames = length;
            self.controller_data
                .truncate(self.header.bytes_per_frame() * length as usize);
        }
    }
}

//! Interfaces to the parts of the emulator the VCR drives but doesn't own.

use std::{
    error::Error,
    io::{Read, Write},
};

use vbmrs_movie::{Motion, OptionFlags, VbmHeader, MAX_CONTROLLERS};

pub type HostError = Box<dyn Error + Send + Sync>;

/// Emulator operations needed to start, restore, and reset movies.
pub trait Emulator {
    /// Whether a game is loaded and running.
    fn is_emulating(&self) -> bool;

    /// Loads a full savestate.
    fn read_state(&mut self, reader: &mut dyn Read) -> Result<(), HostError>;
    /// Saves a full savestate.
    fn write_state(&mut self, writer: &mut dyn Write) -> Result<(), HostError>;
    /// Loads battery-backed save memory.
    fn read_battery(&mut self, reader: &mut dyn Read) -> Result<(), HostError>;
    /// Saves battery-backed save memory.
    fn write_battery(&mut self, writer: &mut dyn Write) -> Result<(), HostError>;
    /// Deletes the game's battery file and keeps it from being written back from RAM.
    fn clear_battery(&mut self);

    fn reset(&mut self, hard: bool);
    fn pause(&mut self);

    /// Settings that affect emulation accuracy.
    fn compat_settings(&self) -> CompatSettings;
    fn apply_compat_settings(&mut self, settings: &CompatSettings);

    /// Identification of the loaded ROM.
    fn rom_info(&self) -> RomInfo;

    /// Raw joypad state per port, as the game currently sees it.
    fn joypad_state(&self) -> [u16; MAX_CONTROLLERS] {
        [0; MAX_CONTROLLERS]
    }
}

/// Per-frame controller state from the frontend.
pub trait InputSource {
    /// Buttons held on `port`.
    fn buttons(&self, port: usize) -> u16;
    /// Motion sensor directions held on `port`.
    fn motion(&self, _port: usize) -> Motion {
        Motion::empty()
    }
}

impl InputSource for [u16; MAX_CONTROLLERS] {
    fn buttons(&self, port: usize) -> u16 {
        self.get(port).copied().unwrap_or(0)
    }
}

/// Sink for short status messages like "Movie end".
pub trait MessageSink: Send {
    fn message(&mut self, text: &str);
}

/// Forwards messages to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl MessageSink for LogSink {
    fn message(&mut self, text: &str) {
        log::info!("{}", text);
    }
}

/// Identification of a ROM as stored in the movie header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RomInfo {
    pub title: [u8; 12],
    pub game_code: u32,
    pub checksum: u16,
    pub crc: u8,
}

/// Emulator settings that change emulation results and are therefore pinned by a movie.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompatSettings {
    pub use_bios_file: bool,
    pub skip_bios_file: bool,
    pub rtc_enable: bool,
    pub lag_hack: bool,
    /// Corrected CGB HDMA5 (FF55) DMA timing.
    pub gbc_ff55_fix: bool,
    pub gb_echo_ram_fix: bool,
    pub save_type: u32,
    pub flash_size: u32,
    pub gb_emulator_type: u32,
    /// Whether the Super Game Boy border is shown.
    pub sgb_border: bool,
}

impl CompatSettings {
    /// Settings a movie needs for playback.
    pub fn from_header(header: &VbmHeader, hide_border: bool) -> Self {
        let flags = header.option_flags;
        Self {
            use_bios_file: flags.contains(OptionFlags::USE_BIOS_FILE),
            skip_bios_file: flags.contains(OptionFlags::SKIP_BIOS_FILE),
            rtc_enable: flags.contains(OptionFlags::RTC_ENABLE),
            lag_hack: flags.contains(OptionFlags::LAG_HACK),
            gbc_ff55_fix: flags.contains(OptionFlags::GBC_FF55_FIX),
            gb_echo_ram_fix: flags.contains(OptionFlags::GB_ECHO_RAM_FIX),
            save_type: header.save_type,
            flash_size: header.flash_size,
            gb_emulator_type: header.gb_emulator_type,
            sgb_border: is_sgb_mode(header.gb_emulator_type) && !hide_border,
        }
    }

    /// Settings for a new recording, starting from the current ones.
    /// New recordings always use the corrected DMA and echo RAM behaviour.
    pub fn for_recording(&self) -> Self {
        Self {
            gbc_ff55_fix: true,
            gb_echo_ram_fix: true,
            sgb_border: is_sgb_mode(self.gb_emulator_type),
            ..self.clone()
        }
    }

    /// Writes these settings into a header.
    pub fn store(&self, header: &mut VbmHeader) {
        let mut flags = OptionFlags::empty();
        flags.set(OptionFlags::USE_BIOS_FILE, self.use_bios_file);
        flags.set(OptionFlags::SKIP_BIOS_FILE, self.skip_bios_file);
        flags.set(OptionFlags::RTC_ENABLE, self.rtc_enable);
        flags.set(OptionFlags::LAG_HACK, self.lag_hack);
        flags.set(OptionFlags::GBC_FF55_FIX, self.gbc_ff55_fix);
        flags.set(OptionFlags::GB_ECHO_RAM_FIX, self.gb_echo_ram_fix);

        header.option_flags = flags;
        header.save_type = self.save_type;
        header.flash_size = self.flash_size;
        header.gb_emulator_type = self.gb_emulator_type;
    }
}

/// Emulator types 2 (SGB) and 5 (SGB2) can draw a border.
fn is_sgb_mode(gb_emulator_type: u32) -> bool {
    matches!(gb_emulator_type, 2 | 5)
}

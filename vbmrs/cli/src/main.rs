//! `vbmrs`: inspect and repair `.vbm` movies without an emulator.

use std::{
    error::Error,
    fs::File,
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

use clap::{Parser, Subcommand};
use serde::Serialize;
use vbmrs_movie::{
    ControllerFlags, OptionFlags, StartFlags, StringField, TypeFlags, VbmFile,
};
use vbmrs_vcr::{read_info, VcrConfig};

#[derive(Parser)]
#[command(name = "vbmrs", version, about = "Tools for VBM movie files")]
struct Cli {
    /// Config file to use instead of the default one.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print a movie's header and author info
    Info { file: PathBuf },
    /// Print recorded input, one frame per line
    Dump {
        file: PathBuf,
        /// First frame to print
        #[arg(long, default_value_t = 0)]
        start: u32,
        /// Number of frames to print; everything after `start` by default
        #[arg(long)]
        count: Option<u32>,
    },
    /// Mark resets in the newer style so current players see them
    ConvertResets { file: PathBuf },
    /// Cut a movie down to its first FRAMES frames
    Truncate { file: PathBuf, frames: u32 },
    /// Print the VCR settings in effect
    Config,
}

#[derive(Serialize)]
struct Summary {
    file: PathBuf,
    author: String,
    uid: u32,
    length_frames: u32,
    rerecord_count: u32,
    read_only: bool,
    rom_title: StringField<12>,
    rom_game_code: u32,
    rom_checksum: u16,
    rom_crc: u8,
    start: StartFlags,
    controllers: ControllerFlags,
    system: TypeFlags,
    options: OptionFlags,
    save_type: u32,
    flash_size: u32,
    gb_emulator_type: u32,
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    match cli.command {
        Command::Info { file } => info(&file),
        Command::Dump { file, start, count } => {
            let stdout = std::io::stdout();
            dump(&file, start, count, &mut stdout.lock())
        }
        Command::ConvertResets { file } => {
            let converted = convert_resets(&file)?;
            println!("{}: converted {} resets", file.display(), converted);
            Ok(())
        }
        Command::Truncate { file, frames } => {
            let length = truncate(&file, frames)?;
            println!("{}: {} frames", file.display(), length);
            Ok(())
        }
        Command::Config => show_config(cli.config),
    }
}

fn info(path: &Path) -> Result<(), Box<dyn Error>> {
    let info = read_info(path)?;
    let header = &info.header;
    let summary = Summary {
        file: info.path.clone(),
        author: info.metadata.read_lossy(),
        uid: header.uid,
        length_frames: info.length_frames,
        rerecord_count: header.rerecord_count,
        read_only: info.read_only,
        rom_title: header.rom_title.clone(),
        rom_game_code: header.rom_game_code,
        rom_checksum: header.rom_or_bios_checksum,
        rom_crc: header.rom_crc,
        start: header.start_flags,
        controllers: header.controller_flags,
        system: header.type_flags,
        options: header.option_flags,
        save_type: header.save_type,
        flash_size: header.flash_size,
        gb_emulator_type: header.gb_emulator_type,
    };
    print!("{}", toml::to_string(&summary)?);
    Ok(())
}

fn dump<W: Write>(
    path: &Path,
    start: u32,
    count: Option<u32>,
    out: &mut W,
) -> Result<(), Box<dyn Error>> {
    let movie = VbmFile::read_from(File::open(path)?)?;
    let length = movie.header.length_frames;
    let end = match count {
        Some(count) => start.saturating_add(count).min(length),
        None => length,
    };
    let slots = movie.header.controller_flags.count();

    for frame in start..end {
        write!(out, "{:>8}", frame)?;
        for slot in 0..slots {
            if let Some(sample) = movie.sample(frame, slot) {
                write!(out, " |{}|", sample.display())?;
            }
        }
        writeln!(out)?;
    }
    Ok(())
}

fn convert_resets(path: &Path) -> Result<usize, Box<dyn Error>> {
    let mut movie = VbmFile::read_from(File::open(path)?)?;
    let converted = vbmrs_movie::convert_legacy_resets(
        &mut movie.controller_data,
        movie.header.controller_flags,
        movie.header.length_frames,
    );
    if converted > 0 {
        save(movie, path)?;
    }
    log::info!("{}: {} resets converted", path.display(), converted);
    Ok(converted)
}

fn truncate(path: &Path, frames: u32) -> Result<u32, Box<dyn Error>> {
    let mut movie = VbmFile::read_from(File::open(path)?)?;
    if frames >= movie.header.length_frames {
        return Ok(movie.header.length_frames);
    }
    movie.truncate(frames);
    save(movie, path)?;
    Ok(frames)
}

fn save(movie: VbmFile, path: &Path) -> Result<(), Box<dyn Error>> {
    let mut out = BufWriter::new(File::create(path)?);
    movie.write_into(&mut out)?;
    out.flush()?;
    log::debug!("rewrote {}", path.display());
    Ok(())
}

fn show_config(path: Option<PathBuf>) -> Result<(), Box<dyn Error>> {
    let config = match path.or_else(VcrConfig::default_path) {
        Some(path) => VcrConfig::load(path)?,
        None => VcrConfig::default(),
    };
    print!("{}", toml::to_string(&config)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::fs;

    use vbmrs_movie::{Metadata, Sample, VbmHeader};

    use super::*;

    fn write_movie(path: &Path, samples: &[Sample]) {
        let controller_data = samples.iter().flat_map(|s| s.to_le_bytes()).collect();
        let mut header = VbmHeader::default();
        header.length_frames = samples.len() as u32;
        let movie = VbmFile {
            header,
            metadata: Metadata::new("cli").unwrap(),
            start_block: Vec::new(),
            controller_data,
        };
        save(movie, path).unwrap();
    }

    #[test]
    fn test_dump_range() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dump.vbm");
        write_movie(&path, &[Sample::A, Sample::B, Sample::A | Sample::UP]);

        let mut out = Vec::new();
        dump(&path, 1, Some(5), &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].trim_start().starts_with("1 |"));
        assert!(lines[0].contains('B'));
        assert!(lines[1].contains('^') && lines[1].contains('A'));
    }

    #[test]
    fn test_convert_and_truncate() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("edit.vbm");
        write_movie(
            &path,
            &[Sample::BLANK, Sample::BLANK, Sample::OLD_RESET, Sample::A],
        );

        assert_eq!(convert_resets(&path).unwrap(), 1);
        assert_eq!(convert_resets(&path).unwrap(), 0);
        let movie = VbmFile::read_from(File::open(&path).unwrap()).unwrap();
        assert_eq!(movie.sample(1, 0), Some(Sample::NEW_RESET));

        assert_eq!(truncate(&path, 2).unwrap(), 2);
        assert_eq!(truncate(&path, 10).unwrap(), 2);
        assert_eq!(fs::metadata(&path).unwrap().len(), 256 + 4);
    }
}

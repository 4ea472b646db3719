//! Per-controller input samples.

use bitflags::bitflags;

/// Size of one controller sample in the controller data block.
pub const SAMPLE_SIZE: usize = 2;

bitflags! {
    /// One controller's input for one frame, as stored in the movie.
    ///
    /// The low ten bits are the console's buttons. The high bits are side channels:
    /// reset signalling and the motion sensor of tilt cartridges.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Sample: u16 {
        const A = 1 << 0;
        const B = 1 << 1;
        const SELECT = 1 << 2;
        const START = 1 << 3;
        const RIGHT = 1 << 4;
        const LEFT = 1 << 5;
        const UP = 1 << 6;
        const DOWN = 1 << 7;
        const R = 1 << 8;
        const L = 1 << 9;

        /// Soft reset requested on this frame.
        const NEW_RESET = 1 << 10;
        /// Set on the frame *after* a reset. Only kept for old tools reading the file.
        const OLD_RESET = 1 << 11;

        const LEFT_MOTION = 1 << 12;
        const RIGHT_MOTION = 1 << 13;
        const DOWN_MOTION = 1 << 14;
        const UP_MOTION = 1 << 15;
    }
}

bitflags! {
    /// Motion sensor directions reported by the input source.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Motion: u8 {
        const LEFT = 1 << 0;
        const RIGHT = 1 << 1;
        const DOWN = 1 << 2;
        const UP = 1 << 3;
    }
}

impl Sample {
    /// Buttons that exist on the console itself.
    pub const REGULAR_MASK: Sample = Sample::from_bits_retain(0x03FF);
    /// Motion sensor bits.
    pub const MOTION_MASK: Sample = Sample::from_bits_retain(0xF000);
    /// Everything a user can press, which is what the input display shows.
    pub const RECORDING_MASK: Sample =
        Sample::from_bits_retain(Self::REGULAR_MASK.bits() | Self::MOTION_MASK.bits());

    pub const BLANK: Sample = Sample::empty();

    /// Builds a sample from raw button bits, discarding bits the console doesn't have.
    pub fn from_regular(bits: u16) -> Self {
        Self::from_bits_retain(bits) & Self::REGULAR_MASK
    }

    /// Reads a sample from its little-endian encoding.
    pub fn from_le_bytes(bytes: [u8; SAMPLE_SIZE]) -> Self {
        Self::from_bits_retain(u16::from_le_bytes(bytes))
    }

    pub fn to_le_bytes(self) -> [u8; SAMPLE_SIZE] {
        self.bits().to_le_bytes()
    }

    /// Returns the regular buttons only.
    pub fn regular(self) -> Self {
        self & Self::REGULAR_MASK
    }

    /// Renders the input display line, one column per input.
    pub fn display(self) -> String {
        const KEY_MAP: [char; 16] = [
            'A', 'B', 's', 'S', '>', '<', '^', 'v', 'R', 'L', '!', '?', '{', '}', 'v', '^',
        ];
        const KEY_ORDER: [usize; 15] = [5, 6, 4, 7, 0, 1, 9, 8, 3, 2, 12, 15, 13, 14, 11];

        let keys = (self & Self::RECORDING_MASK).bits();
        KEY_ORDER
            .iter()
            .map(|&bit| {
                if keys & (1 << bit) != 0 {
                    KEY_MAP[bit]
                } else {
                    ' '
                }
            })
            .collect()
    }
}

impl From<Motion> for Sample {
    fn from(value: Motion) -> Self {
        Sample::from_bits_retain((value.bits() as u16 & 0x0F) << 12)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_regular_masks_side_channels() {
        let sample = Sample::from_regular(0xFFFF);
        assert_eq!(sample.bits(), 0x03FF);
        assert!(!sample.contains(Sample::NEW_RESET));
    }

    #[test]
    fn test_motion_bits() {
        assert_eq!(Sample::from(Motion::LEFT), Sample::LEFT_MOTION);
        assert_eq!(Sample::from(Motion::UP), Sample::UP_MOTION);
        assert_eq!(Sample::from(Motion::all()), Sample::MOTION_MASK);
    }

    #[test]
    fn test_le_encoding() {
        let sample = Sample::A | Sample::NEW_RESET;
        assert_eq!(sample.to_le_bytes(), [0x01, 0x04]);
        assert_eq!(Sample::from_le_bytes([0x01, 0x04]), sample);
    }

    #[test]
    fn test_display() {
        assert_eq!(Sample::BLANK.display(), " ".repeat(15));
        let line = (Sample::LEFT | Sample::A | Sample::START).display();
        assert_eq!(line.chars().next(), Some('<'));
        assert_eq!(line.chars().nth(4), Some('A'));
        assert_eq!(line.chars().nth(8), Some('S'));
        // reset bits are not user inputs and never show up
        assert_eq!(Sample::NEW_RESET.display(), " ".repeat(15));
    }
}

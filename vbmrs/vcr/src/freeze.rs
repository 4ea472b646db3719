//! Movie progress as embedded in emulator savestates.

use bytes::{Buf, BufMut};

use crate::error::VcrError;

/// Size of the fixed fields at the start of a freeze blob.
pub const FREEZE_PREFIX_SIZE: usize = 12;

/// Movie position and input history at the time a savestate was made.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MovieFreeze<'a> {
    /// UID of the movie the savestate was made in.
    pub uid: u32,
    pub current_frame: u32,
    /// Length of the movie when the savestate was made.
    pub end_frame: u32,
    /// Controller data; at least `end_frame` frames for a well-formed blob.
    pub data: &'a [u8],
}

impl<'a> MovieFreeze<'a> {
    /// Parses a freeze blob. Only the fixed fields are validated here.
    pub fn decode(mut blob: &'a [u8]) -> Result<Self, VcrError> {
        if blob.len() < FREEZE_PREFIX_SIZE {
            return Err(VcrError::WrongFormat("movie freeze is truncated"));
        }
        let uid = blob.get_u32_le();
        let current_frame = blob.get_u32_le();
        // stored one short, like the header
        let end_frame = blob.get_u32_le().wrapping_add(1);

        Ok(Self {
            uid,
            current_frame,
            end_frame,
            data: blob,
        })
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut blob = Vec::with_capacity(FREEZE_PREFIX_SIZE + self.data.len());
        blob.put_u32_le(self.uid);
        blob.put_u32_le(self.current_frame);
        blob.put_u32_le(self.end_frame.wrapping_sub(1));
        blob.put_slice(self.data);
        blob
    }

    /// The first `frames` frames of input history, if the blob holds that many.
    pub fn frames(&self, bytes_per_frame: usize, frames: u32) -> Option<&'a [u8]> {
        let len = bytes_per_frame.checked_mul(frames as usize)?;
        self.data.get(..len)
    }
}

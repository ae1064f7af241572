//! Channel ordering between ZVD's layout and the Vorbis channel mapping
//!
//! ZVD orders channels the WAVE way (FL, FR, FC, LFE, BL, BR, SL, SR) while
//! Vorbis mapping family 0 places the center between the fronts and the LFE
//! last. Streams with more than eight channels carry no defined mapping and
//! are passed through in input order.

/// Highest channel count with a defined Vorbis ordering
pub const MAX_MAPPED_CHANNELS: usize = 8;

/// For each channel count, the input channel feeding each Vorbis channel
const VORBIS_ENCODING_OFFSETS: [[usize; 8]; 8] = [
    [0, 0, 0, 0, 0, 0, 0, 0],
    [0, 1, 0, 0, 0, 0, 0, 0],
    [0, 2, 1, 0, 0, 0, 0, 0],
    [0, 1, 2, 3, 0, 0, 0, 0],
    [0, 2, 1, 3, 4, 0, 0, 0],
    [0, 2, 1, 4, 5, 3, 0, 0],
    [0, 2, 1, 5, 6, 4, 3, 0],
    [0, 2, 1, 6, 7, 4, 5, 3],
];

/// Input channel index that feeds Vorbis channel `vorbis_channel`
///
/// `channels` must be non-zero and `vorbis_channel < channels`.
pub fn vorbis_source_channel(channels: usize, vorbis_channel: usize) -> usize {
    debug_assert!(channels > 0 && vorbis_channel < channels);
    if channels > MAX_MAPPED_CHANNELS {
        vorbis_channel
    } else {
        VORBIS_ENCODING_OFFSETS[channels - 1][vorbis_channel]
    }
}

/// Full source channel map for `channels` channels, in Vorbis order
pub fn vorbis_channel_map(channels: usize) -> Vec<usize> {
    (0..channels)
        .map(|c| vorbis_source_channel(channels, c))
        .collect()
}

/// Human readable layout name for a channel count
pub fn layout_name(channels: u16) -> &'static str {
    match channels {
        1 => "mono",
        2 => "stereo",
        3 => "3.0",
        4 => "quad",
        5 => "5.0",
        6 => "5.1",
        7 => "6.1",
        8 => "7.1",
        _ => "unknown",
    }
}

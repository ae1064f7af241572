//! libvorbisenc session
//!
//! Owns the `vorbis_info` / `vorbis_dsp_state` / `vorbis_block` triple and
//! wraps every libvorbis call the encoder needs. libvorbis keeps pointers
//! between these structs, so they live together in one heap allocation that
//! never moves for the lifetime of the session.

use super::options::{RateControl, VorbisOptions};
use crate::error::{Error, Result};
use aotuv_lancer_vorbis_sys::*;
use ogg_next_sys::ogg_packet;
use std::ffi::CString;
use std::os::raw::{c_int, c_long, c_void};
use std::{mem, ptr, slice};
use tracing::debug;

/// Internal library fault
const OV_EFAULT: c_int = -129;
/// Feature not implemented for the requested setup
const OV_EIMPL: c_int = -130;
/// Invalid argument
const OV_EINVAL: c_int = -131;

/// Disable the slow (bitrate-by-estimate) rate management engine
const OV_ECTL_RATEMANAGE2_SET: c_int = 0x15;
/// Set lowpass frequency in kHz (double)
const OV_ECTL_LOWPASS_SET: c_int = 0x21;
/// Set impulse block bias (double)
const OV_ECTL_IBLOCK_SET: c_int = 0x31;

/// Bytes of bookkeeping a staged packet costs on top of its payload
pub const PACKET_HEADER_SIZE: usize = mem::size_of::<ogg_packet>();

/// Map a libvorbis return code to a crate error
pub fn map_vorbis_error(code: c_int, call: &str) -> Error {
    match code {
        OV_EFAULT => Error::Bug(format!("{} reported an internal fault", call)),
        OV_EINVAL => Error::invalid_input(format!("{}: invalid argument", call)),
        OV_EIMPL => Error::invalid_input(format!("{}: unsupported encoder setup", call)),
        other => Error::Unknown(format!("{} failed with code {}", call, other)),
    }
}

/// Setup calls report failure with any non-zero code
fn check_setup(code: c_int, call: &str) -> Result<()> {
    if code != 0 {
        Err(map_vorbis_error(code, call))
    } else {
        Ok(())
    }
}

/// Streaming calls report failure with a negative code
fn check_stream(code: c_int, call: &str) -> Result<c_int> {
    if code < 0 {
        Err(map_vorbis_error(code, call))
    } else {
        Ok(code)
    }
}

/// A compressed packet copied out of libvorbis memory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawPacket {
    /// Packet payload
    pub data: Vec<u8>,
    /// Granule position (end sample) reported by the library
    pub granulepos: i64,
    /// Last packet of the stream
    pub end_of_stream: bool,
}

/// Copy a packet's payload out of library owned memory
///
/// # Safety
/// `op.packet` must point at `op.bytes` readable bytes when non-null.
unsafe fn packet_bytes(op: &ogg_packet) -> Vec<u8> {
    if op.packet.is_null() || op.bytes <= 0 {
        return Vec::new();
    }
    slice::from_raw_parts(op.packet as *const u8, op.bytes as usize).to_vec()
}

struct State {
    info: vorbis_info,
    dsp: vorbis_dsp_state,
    block: vorbis_block,
}

/// An initialized libvorbisenc analysis session
pub struct VorbisSession {
    state: Box<State>,
    channels: usize,
    info_initialized: bool,
    dsp_initialized: bool,
    block_initialized: bool,
    eof_signalled: bool,
}

impl VorbisSession {
    /// Configure libvorbisenc and start analysis
    ///
    /// Anything acquired before a failing step is released when the partially
    /// built session is dropped.
    pub fn open(options: &VorbisOptions) -> Result<Self> {
        let mut session = VorbisSession {
            // All-zero is the documented pre-init state of these structs
            state: Box::new(unsafe { mem::zeroed() }),
            channels: options.channels as usize,
            info_initialized: false,
            dsp_initialized: false,
            block_initialized: false,
            eof_signalled: false,
        };

        unsafe { vorbis_info_init(&mut session.state.info) };
        session.info_initialized = true;

        session.configure(options)?;

        let state = &mut *session.state;
        check_setup(
            unsafe { vorbis_analysis_init(&mut state.dsp, &mut state.info) },
            "vorbis_analysis_init",
        )?;
        session.dsp_initialized = true;

        let state = &mut *session.state;
        check_setup(
            unsafe { vorbis_block_init(&mut state.dsp, &mut state.block) },
            "vorbis_block_init",
        )?;
        session.block_initialized = true;

        debug!(
            "libvorbisenc session ready: {} Hz, {} channels",
            options.sample_rate, options.channels
        );
        Ok(session)
    }

    fn configure(&mut self, options: &VorbisOptions) -> Result<()> {
        let info: *mut vorbis_info = &mut self.state.info;
        let channels = options.channels as c_long;
        let rate = options.sample_rate as c_long;

        match options.rate_control {
            RateControl::Vbr { quality } => check_setup(
                unsafe { vorbis_encode_setup_vbr(info, channels, rate, quality) },
                "vorbis_encode_setup_vbr",
            )?,
            RateControl::Managed { nominal, min, max } => {
                check_setup(
                    unsafe {
                        vorbis_encode_setup_managed(
                            info,
                            channels,
                            rate,
                            max.unwrap_or(-1) as c_long,
                            nominal as c_long,
                            min.unwrap_or(-1) as c_long,
                        )
                    },
                    "vorbis_encode_setup_managed",
                )?;

                if options.rate_control.disables_rate_management() {
                    check_setup(
                        unsafe {
                            vorbis_encode_ctl(info, OV_ECTL_RATEMANAGE2_SET, ptr::null_mut())
                        },
                        "vorbis_encode_ctl(RATEMANAGE2_SET)",
                    )?;
                }
            }
        }

        if let Some(khz) = options.lowpass_khz {
            let mut cfreq: f64 = khz;
            check_setup(
                unsafe {
                    vorbis_encode_ctl(
                        info,
                        OV_ECTL_LOWPASS_SET,
                        &mut cfreq as *mut f64 as *mut c_void,
                    )
                },
                "vorbis_encode_ctl(LOWPASS_SET)",
            )?;
        }

        if options.iblock != 0.0 {
            let mut iblock: f64 = options.iblock;
            check_setup(
                unsafe {
                    vorbis_encode_ctl(
                        info,
                        OV_ECTL_IBLOCK_SET,
                        &mut iblock as *mut f64 as *mut c_void,
                    )
                },
                "vorbis_encode_ctl(IBLOCK_SET)",
            )?;
        }

        check_setup(
            unsafe { vorbis_encode_setup_init(info) },
            "vorbis_encode_setup_init",
        )
    }

    /// Produce the identification, comment and setup header packets
    pub fn header_packets(&mut self, comments: &[(String, String)]) -> Result<[Vec<u8>; 3]> {
        let tags = comments
            .iter()
            .map(|(key, value)| {
                let key = CString::new(key.as_str())
                    .map_err(|_| Error::invalid_input(format!("Comment key contains NUL: {}", key)))?;
                let value = CString::new(value.as_str()).map_err(|_| {
                    Error::invalid_input(format!("Comment value contains NUL: {}", value))
                })?;
                Ok((key, value))
            })
            .collect::<Result<Vec<_>>>()?;

        let mut vc: vorbis_comment = unsafe { mem::zeroed() };
        let mut header: ogg_packet = unsafe { mem::zeroed() };
        let mut header_comm: ogg_packet = unsafe { mem::zeroed() };
        let mut header_code: ogg_packet = unsafe { mem::zeroed() };

        let state = &mut *self.state;
        let packets = unsafe {
            vorbis_comment_init(&mut vc);
            for (key, value) in &tags {
                vorbis_comment_add_tag(&mut vc, key.as_ptr() as _, value.as_ptr() as _);
            }

            let ret = vorbis_analysis_headerout(
                &mut state.dsp,
                &mut vc,
                &mut header,
                &mut header_comm,
                &mut header_code,
            );
            let packets = if ret == 0 {
                Ok([
                    packet_bytes(&header),
                    packet_bytes(&header_comm),
                    packet_bytes(&header_code),
                ])
            } else {
                Err(map_vorbis_error(ret, "vorbis_analysis_headerout"))
            };

            vorbis_comment_clear(&mut vc);
            packets
        }?;

        debug!(
            "Vorbis headers: id {} bytes, comment {} bytes, setup {} bytes",
            packets[0].len(),
            packets[1].len(),
            packets[2].len()
        );
        Ok(packets)
    }

    /// Hand `nb_samples` samples per channel to the analysis buffer
    ///
    /// `fill` is called once per Vorbis channel with the destination slice.
    pub fn write_samples<F>(&mut self, nb_samples: usize, mut fill: F) -> Result<()>
    where
        F: FnMut(usize, &mut [f32]),
    {
        if self.eof_signalled {
            return Err(Error::invalid_state("Samples written after end of stream"));
        }
        let vals = c_int::try_from(nb_samples)
            .map_err(|_| Error::invalid_input(format!("Too many samples: {}", nb_samples)))?;

        let buffer = unsafe { vorbis_analysis_buffer(&mut self.state.dsp, vals) };
        if buffer.is_null() {
            return Err(Error::Bug("vorbis_analysis_buffer returned no buffer".into()));
        }

        for channel in 0..self.channels {
            let dst = unsafe {
                let plane = *buffer.add(channel);
                slice::from_raw_parts_mut(plane, nb_samples)
            };
            fill(channel, dst);
        }

        check_stream(
            unsafe { vorbis_analysis_wrote(&mut self.state.dsp, vals) },
            "vorbis_analysis_wrote",
        )?;
        Ok(())
    }

    /// Tell the library no more samples follow
    pub fn signal_eof(&mut self) -> Result<()> {
        if self.eof_signalled {
            return Ok(());
        }
        check_stream(
            unsafe { vorbis_analysis_wrote(&mut self.state.dsp, 0) },
            "vorbis_analysis_wrote",
        )?;
        self.eof_signalled = true;
        Ok(())
    }

    /// Whether end of stream has been signalled
    pub fn is_eof(&self) -> bool {
        self.eof_signalled
    }

    /// Run analysis on complete blocks and hand out finished packets
    ///
    /// `sink` returns whether more blocks should be analysed. Every packet of
    /// the current block is always delivered, since the bitrate manager
    /// refuses a new block while one is unclaimed. Stopping early leaves the
    /// remaining samples buffered in the library for the next call.
    pub fn drain<F>(&mut self, mut sink: F) -> Result<()>
    where
        F: FnMut(RawPacket) -> bool,
    {
        let state = &mut *self.state;
        let mut wants_more = true;

        while wants_more {
            let ret = unsafe { vorbis_analysis_blockout(&mut state.dsp, &mut state.block) };
            if check_stream(ret, "vorbis_analysis_blockout")? != 1 {
                break;
            }

            check_stream(
                unsafe { vorbis_analysis(&mut state.block, ptr::null_mut()) },
                "vorbis_analysis",
            )?;
            check_stream(
                unsafe { vorbis_bitrate_addblock(&mut state.block) },
                "vorbis_bitrate_addblock",
            )?;

            loop {
                let mut op: ogg_packet = unsafe { mem::zeroed() };
                let ret = unsafe { vorbis_bitrate_flushpacket(&mut state.dsp, &mut op) };
                if check_stream(ret, "vorbis_bitrate_flushpacket")? != 1 {
                    break;
                }

                let packet = RawPacket {
                    data: unsafe { packet_bytes(&op) },
                    granulepos: op.granulepos as i64,
                    end_of_stream: op.e_o_s != 0,
                };
                wants_more = sink(packet);
            }
        }

        Ok(())
    }
}

impl Drop for VorbisSession {
    fn drop(&mut self) {
        let state = &mut *self.state;
        unsafe {
            if self.dsp_initialized && !self.eof_signalled {
                vorbis_analysis_wrote(&mut state.dsp, 0);
            }
            if self.block_initialized {
                vorbis_block_clear(&mut state.block);
            }
            if self.dsp_initialized {
                vorbis_dsp_clear(&mut state.dsp);
            }
            if self.info_initialized {
                vorbis_info_clear(&mut state.info);
            }
        }
    }
}

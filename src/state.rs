//! Global DSP state shared by all voices.

use crate::modulo::ModuloArray;
use crate::registers::{DspFlags, PerVoiceFlag, RegisterFile};

/// Number of samples kept per channel for the echo FIR filter.
pub const ECHO_HISTORY_SIZE: usize = 8;

/// Period of the global sample counter that drives envelope and noise rates. It is the least common multiple of all
/// rate table periods.
pub const COUNTER_RANGE: i32 = 2048 * 5 * 3;

/// Initial value of the noise generator.
pub const NOISE_SEED: i32 = 0x4000;

/// Global DSP state.
///
/// Besides the registers and the persistent counters, this carries the `t_*` fields: values that one micro-operation
/// of the pipeline latches and a later one consumes. Most of them live for just one sample; several are read one
/// phase after another voice has already overwritten them, which is how the hardware behaves, too.
#[derive(Clone, Debug)]
pub struct State {
	/// Public DSP registers.
	pub regs:               RegisterFile,
	/// Echo FIR history per channel.
	pub echo_hist:          [ModuloArray<i32, ECHO_HISTORY_SIZE>; 2],
	/// Write cursor into `echo_hist`.
	pub echo_hist_pos:      usize,
	/// Toggles every sample; KON and KOFF are only processed on the samples where it is set.
	pub every_other_sample: bool,
	/// Voices keyed on in this sample pair.
	pub kon:                PerVoiceFlag,
	/// Noise LFSR (15 bit).
	pub noise:              i32,
	/// Global sample counter, counts down through [`COUNTER_RANGE`].
	pub counter:            i32,
	/// Byte offset of the current echo sample within the echo buffer.
	pub echo_offset:        u16,
	/// Length of the echo buffer in bytes, latched whenever `echo_offset` wraps to 0.
	pub echo_length:        u16,
	/// Most recent stereo sample delivered to the audio sink.
	pub last_sample:        (i16, i16),

	// Write staging buffers for the registers the pipeline updates itself.
	/// Last KON register write, pending for the next even sample.
	pub new_kon:  PerVoiceFlag,
	/// Pending ENDX value.
	pub endx_buf: PerVoiceFlag,
	/// Pending ENVX value.
	pub envx_buf: u8,
	/// Pending OUTX value.
	pub outx_buf: u8,

	// Per-sample scratch latches.
	/// PMON as latched in phase 27.
	pub t_pmon:          PerVoiceFlag,
	/// NON as latched in phase 28.
	pub t_non:           PerVoiceFlag,
	/// EON as latched in phase 28.
	pub t_eon:           PerVoiceFlag,
	/// DIR as latched in phase 28.
	pub t_dir:           u8,
	/// KOFF as latched in phase 30 of even samples.
	pub t_koff:          PerVoiceFlag,
	/// Sample start or loop address read from the sample directory.
	pub t_brr_next_addr: u16,
	/// ADSR0 of the voice whose envelope runs next.
	pub t_adsr0:         u8,
	/// Header of the current voice's BRR block.
	pub t_brr_header:    u8,
	/// First sample byte of the current voice's next decode.
	pub t_brr_byte:      u8,
	/// Sample number of the voice whose directory address is computed next.
	pub t_srcn:          u8,
	/// ESA as latched in phase 29.
	pub t_esa:           u8,
	/// FLG as latched for the echo writes.
	pub t_echo_disabled: DspFlags,
	/// Sample directory entry address.
	pub t_dir_addr:      u16,
	/// Pitch of the current voice, including modulation.
	pub t_pitch:         i32,
	/// Output of the most recently processed voice, after envelope.
	pub t_output:        i32,
	/// Bit of the current voice if it just jumped to its loop point.
	pub t_looped:        PerVoiceFlag,
	/// APU RAM address of the current echo sample.
	pub t_echo_ptr:      u16,
	/// Main output accumulators.
	pub t_main_out:      [i32; 2],
	/// Echo send accumulators.
	pub t_echo_out:      [i32; 2],
	/// FIR filter output.
	pub t_echo_in:       [i32; 2],
}

impl Default for State {
	fn default() -> Self {
		Self {
			regs:               RegisterFile::default(),
			echo_hist:          Default::default(),
			echo_hist_pos:      0,
			every_other_sample: false,
			kon:                PerVoiceFlag::empty(),
			noise:              0,
			counter:            0,
			echo_offset:        0,
			echo_length:        0,
			last_sample:        (0, 0),
			new_kon:            PerVoiceFlag::empty(),
			endx_buf:           PerVoiceFlag::empty(),
			envx_buf:           0,
			outx_buf:           0,
			t_pmon:             PerVoiceFlag::empty(),
			t_non:              PerVoiceFlag::empty(),
			t_eon:              PerVoiceFlag::empty(),
			t_dir:              0,
			t_koff:             PerVoiceFlag::empty(),
			t_brr_next_addr:    0,
			t_adsr0:            0,
			t_brr_header:       0,
			t_brr_byte:         0,
			t_srcn:             0,
			t_esa:              0,
			t_echo_disabled:    DspFlags::empty(),
			t_dir_addr:         0,
			t_pitch:            0,
			t_output:           0,
			t_looped:           PerVoiceFlag::empty(),
			t_echo_ptr:         0,
			t_main_out:         [0; 2],
			t_echo_out:         [0; 2],
			t_echo_in:          [0; 2],
		}
	}
}

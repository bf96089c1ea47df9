//! Internal per-voice state.

use crate::modulo::ModuloArray;
use crate::registers::{PerVoiceFlag, VOICE_BLOCK_SIZE};

/// Size of the internal BRR decode buffer that is used for pitch interpolation.
pub const BRR_BUFFER_SIZE: usize = 12;

/// Size of one encoded BRR block: a header byte and 8 bytes of 4-bit samples.
pub const BRR_BLOCK_SIZE: u16 = 9;

/// Length of the key-on startup sequence, in samples.
pub const KEY_ON_DELAY: u8 = 5;

/// Largest value the 11-bit envelope can take.
pub const ENVELOPE_MAX: i32 = 0x7ff;

/// Internal envelope state, determines how the envelope volume proceeds. This is also tracked in GAIN mode, where
/// only Release has an effect.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum EnvelopeMode {
	/// Linear decrease by 8 every sample, until 0.
	#[default]
	Release,
	/// Linear increase up to the maximum.
	Attack,
	/// Exponential decrease until the sustain level is reached.
	Decay,
	/// Exponential decrease at the sustain rate, indefinitely.
	Sustain,
}

/// Internal state of one of the eight voices.
#[derive(Clone, Debug)]
pub struct Voice {
	/// Last 12 decoded samples, for pitch interpolation. Decoding writes four samples at a time.
	pub buffer:       ModuloArray<i16, BRR_BUFFER_SIZE>,
	/// Next write index into `buffer`.
	pub buf_pos:      usize,
	/// Fixed-point 15-bit position in the decoded sample buffer. Bits 12-14 select the sample relative to `buf_pos`,
	/// bits 4-11 select the Gaussian table entry.
	pub interp_pos:   i32,
	/// Address of the BRR block currently being decoded.
	pub brr_addr:     u16,
	/// Offset of the next sample byte pair inside the current block; 1, 3, 5 or 7.
	pub brr_offset:   u16,
	/// This voice's bit in the per-voice registers.
	pub vbit:         PerVoiceFlag,
	/// Start address of this voice's register block.
	pub vidx:         usize,
	/// Remaining samples of the key-on startup sequence; 0 when the voice is running normally.
	pub kon_delay:    u8,
	/// Current envelope state.
	pub env_mode:     EnvelopeMode,
	/// Current envelope level (11 bit).
	pub env:          i32,
	/// Unclamped envelope value of the last envelope step. Only used by the bent-line GAIN mode, which decides on its
	/// slope before the clamp happens.
	pub hidden_env:   i32,
	/// ENVX value latched during this sample's envelope output.
	pub t_envx_out:   u8,
}

impl Voice {
	/// Create the voice with the given index (0-7).
	#[must_use]
	pub fn new(index: usize) -> Self {
		Self {
			buffer:     ModuloArray::default(),
			buf_pos:    0,
			interp_pos: 0,
			brr_addr:   0,
			brr_offset: 1,
			vbit:       PerVoiceFlag::voice(index),
			vidx:       index * VOICE_BLOCK_SIZE,
			kon_delay:  0,
			env_mode:   EnvelopeMode::Release,
			env:        0,
			hidden_env: 0,
			t_envx_out: 0,
		}
	}

	/// Create all eight voices.
	#[must_use]
	pub fn all() -> [Self; 8] {
		std::array::from_fn(Self::new)
	}

	/// Index of this voice.
	#[must_use]
	pub const fn index(&self) -> usize {
		self.vidx / VOICE_BLOCK_SIZE
	}

	/// Whether the voice is in its key-on startup sequence.
	#[must_use]
	pub const fn is_starting(&self) -> bool {
		self.kon_delay != 0
	}

	/// Read a decoded sample relative to the buffer write position.
	#[inline]
	#[must_use]
	#[allow(clippy::cast_possible_wrap)]
	pub fn sample(&self, relative_index: isize) -> i32 {
		i32::from(self.buffer.read(self.buf_pos as isize + relative_index))
	}
}

//! BRR (Bit Rate Reduced) sample decoder.
//!
//! A BRR block is a header byte (`ssssffle`: shift, filter, loop, end) followed by 8 bytes holding 16 4-bit samples,
//! high nibble first. The DSP decodes four samples at a time, from the two bytes at `brr_addr + brr_offset`.

use num_derive::FromPrimitive;
use num_traits::FromPrimitive;

use super::clamp16;
use crate::memory::ApuRam;
use crate::state::State;
use crate::voice::{BRR_BUFFER_SIZE, Voice};

/// Linear prediction filters of the BRR format, selected per block by the header.
#[derive(Clone, Copy, Debug, Eq, PartialEq, FromPrimitive)]
#[repr(u8)]
pub enum Filter {
	/// Verbatim samples.
	Zero  = 0,
	/// s + p1 * 15/16
	One   = 1,
	/// s + p1 * 61/32 - p2 * 15/16
	Two   = 2,
	/// s + p1 * 115/64 - p2 * 13/16
	Three = 3,
}

impl Filter {
	/// Filter selected by a block header.
	#[must_use]
	pub fn from_header(header: u8) -> Self {
		Self::from_u8((header >> 2) & 0b11).unwrap_or(Self::Zero)
	}

	/// Apply the prediction to the scaled sample `s`, given the previous decoded sample `p1` and the halved sample
	/// before that `p2`. The hardware uses only shifts and adds, which is where the odd coefficients come from.
	#[inline]
	#[must_use]
	pub const fn predict(self, mut s: i32, p1: i32, p2: i32) -> i32 {
		match self {
			Self::Zero => {},
			Self::One => {
				s += p1 >> 1;
				s += (-p1) >> 5;
			},
			Self::Two => {
				s += p1;
				s -= p2;
				s += p2 >> 4;
				s += (p1 * -3) >> 6;
			},
			Self::Three => {
				s += p1;
				s -= p2;
				s += (p1 * -13) >> 7;
				s += (p2 * 3) >> 4;
			},
		}
		s
	}
}

/// Header end flag: the block is the last one of the sample.
pub const HEADER_END: u8 = 0b01;
/// Header loop flag: jump to the loop point after this block. Only meaningful together with the end flag.
pub const HEADER_LOOP: u8 = 0b10;

/// Whether the header marks a block that ends the sample without looping, which silences the voice.
#[inline]
#[must_use]
pub const fn ends_without_loop(header: u8) -> bool {
	header & (HEADER_END | HEADER_LOOP) == HEADER_END
}

/// Scale a sign-extended 4-bit sample by the header's shift amount. Shifts above 12 are invalid and produce either 0
/// or -2048, like the hardware.
#[inline]
#[must_use]
pub const fn scale_nibble(nibble: i32, shift: u8) -> i32 {
	if shift <= 12 { (nibble << shift) >> 1 } else { nibble & !0x7ff }
}

/// Decode the next four samples of the voice into its sample buffer.
///
/// The first data byte was already fetched into `t_brr_byte` by the previous pipeline phase; the second one is read
/// now.
#[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
pub fn decode_brr(state: &State, voice: &mut Voice, memory: &mut dyn ApuRam) {
	let second_byte = memory.read_byte(voice.brr_addr.wrapping_add(voice.brr_offset).wrapping_add(1));
	let mut nibbles = (i32::from(state.t_brr_byte) << 8) | i32::from(second_byte);

	let filter = Filter::from_header(state.t_brr_header);
	let shift = state.t_brr_header >> 4;

	for _ in 0 .. 4 {
		// Bits 12-15 hold the current nibble; the i16 cast sign-extends it.
		let s = i32::from(nibbles as i16) >> 12;
		nibbles <<= 4;

		let s = scale_nibble(s, shift);
		let p1 = voice.sample(-1);
		let p2 = voice.sample(-2) >> 1;
		let s = clamp16(filter.predict(s, p1, p2));

		voice.buffer.write(voice.buf_pos, (s << 1) as i16);
		voice.buf_pos += 1;
		if voice.buf_pos >= BRR_BUFFER_SIZE {
			voice.buf_pos = 0;
		}
	}
}

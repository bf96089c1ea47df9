//! Gaussian pitch interpolation.

use super::clamp16;
use super::tables::GAUSSIAN_TABLE;
use crate::voice::Voice;

/// Interpolate the voice's current output sample from four consecutive decoded samples.
///
/// Bits 4-11 of `interp_pos` pick the weights, bits 12-14 pick the oldest of the four samples relative to `buf_pos`.
/// The sum of the first three products is truncated to 16 bits before the last one is added, so loud input can wrap
/// around, exactly like on hardware.
#[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
#[must_use]
pub fn interpolate(voice: &Voice) -> i32 {
	let offset = ((voice.interp_pos >> 4) & 0xff) as usize;
	let forward = 255 - offset;
	let base = (voice.interp_pos >> 12) as isize;

	let mut out = (GAUSSIAN_TABLE[forward] * voice.sample(base)) >> 11;
	out += (GAUSSIAN_TABLE[forward + 256] * voice.sample(base + 1)) >> 11;
	out += (GAUSSIAN_TABLE[offset + 256] * voice.sample(base + 2)) >> 11;
	out = i32::from(out as i16);
	out += (GAUSSIAN_TABLE[offset] * voice.sample(base + 3)) >> 11;

	clamp16(out) & !1
}

#[cfg(test)]
mod test {
	use rstest::rstest;

	use super::*;
	use crate::voice::BRR_BUFFER_SIZE;

	fn voice_with_samples(buf_pos: usize, interp_pos: i32, samples: &[i16]) -> Voice {
		let mut voice = Voice::new(0);
		voice.buf_pos = buf_pos;
		voice.interp_pos = interp_pos;
		for (index, sample) in samples.iter().enumerate() {
			voice.buffer.write((buf_pos + index) % BRR_BUFFER_SIZE, *sample);
		}
		voice
	}

	#[rstest]
	#[case::at_sample(0x0000)]
	#[case::halfway(0x0800)]
	fn constant_input_is_nearly_preserved(#[case] interp_pos: i32) {
		let voice = voice_with_samples(0, interp_pos, &[1000; 4]);
		assert_eq!(interpolate(&voice), 998);
	}

	#[test]
	fn weights_at_offset_zero() {
		// The newest-but-one sample carries the biggest weight when the position sits right on a sample.
		assert_eq!(interpolate(&voice_with_samples(0, 0, &[0, 4000, 0, 0])), 2548);
		assert_eq!(interpolate(&voice_with_samples(0, 0, &[0, 0, 0, 4000])), 0);
	}

	#[test]
	fn integer_part_selects_samples() {
		// interp_pos 0x1000 skips one sample past buf_pos.
		let voice = voice_with_samples(3, 0x1000, &[30000, 0, 4000, 0, 0]);
		assert_eq!(interpolate(&voice), 2548);
	}

	#[test]
	fn reads_wrap_around_the_buffer() {
		let voice = voice_with_samples(10, 0, &[0, 4000, 0, 0]);
		assert_eq!(voice.sample(1), 4000);
		assert_eq!(interpolate(&voice), 2548);
	}

	#[test]
	fn partial_sum_wraps_to_16_bits() {
		assert_eq!(interpolate(&voice_with_samples(0, 0, &[i16::MAX; 4])), -32756);
		assert_eq!(interpolate(&voice_with_samples(0, 0, &[i16::MIN; 4])), 32752);
	}
}

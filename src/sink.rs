//! Audio output of the DSP.

/// Receiver of the DSP's digital output. The DSP delivers exactly one stereo sample per 32-phase pipeline lap, i.e.
/// at 32 kHz of emulated time.
pub trait AudioSink {
	/// Accept the next stereo sample.
	fn sample(&mut self, left: i16, right: i16);
}

impl AudioSink for Vec<(i16, i16)> {
	#[inline]
	fn sample(&mut self, left: i16, right: i16) {
		self.push((left, right));
	}
}


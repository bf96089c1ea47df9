//! WAV file output of the DSP's samples.

use std::fs::File;
use std::io::{BufWriter, Seek, Write};
use std::path::Path;

use hound::{SampleFormat, WavSpec, WavWriter};
use sdsp::AudioSink;

/// Native DSP output rate.
pub const SAMPLE_RATE: u32 = 32000;

const SPEC: WavSpec =
	WavSpec { channels: 2, sample_rate: SAMPLE_RATE, bits_per_sample: 16, sample_format: SampleFormat::Int };

/// Summary of a finished recording.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Statistics {
	/// Number of stereo samples written.
	pub samples: u64,
	/// Largest absolute sample value on either channel.
	pub peak:    u16,
}

/// Audio sink that writes 16-bit stereo PCM at the DSP's native rate.
///
/// Sinks cannot fail, so the first write error is kept and reported by [`Self::finalize`]; later samples are dropped.
pub struct WavSink<W: Write + Seek> {
	writer:     WavWriter<W>,
	error:      Option<hound::Error>,
	statistics: Statistics,
}

impl WavSink<BufWriter<File>> {
	/// Create the output file.
	///
	/// # Errors
	///
	/// If the file can't be created.
	pub fn create(path: &Path) -> hound::Result<Self> {
		Self::new(BufWriter::new(File::create(path)?))
	}
}

impl<W: Write + Seek> WavSink<W> {
	/// Write into an arbitrary seekable writer.
	///
	/// # Errors
	///
	/// If the WAV header can't be written.
	pub fn new(writer: W) -> hound::Result<Self> {
		Ok(Self { writer: WavWriter::new(writer, SPEC)?, error: None, statistics: Statistics::default() })
	}

	/// Finish the file, fixing up the header's length fields.
	///
	/// # Errors
	///
	/// The first error that happened while writing samples, or any error while finishing the file.
	pub fn finalize(self) -> hound::Result<Statistics> {
		if let Some(error) = self.error {
			return Err(error);
		}
		self.writer.finalize()?;
		Ok(self.statistics)
	}
}

impl<W: Write + Seek> AudioSink for WavSink<W> {
	fn sample(&mut self, left: i16, right: i16) {
		if self.error.is_some() {
			return;
		}
		if let Err(error) = self.writer.write_sample(left).and_then(|()| self.writer.write_sample(right)) {
			self.error = Some(error);
			return;
		}
		self.statistics.samples += 1;
		self.statistics.peak = self.statistics.peak.max(left.unsigned_abs()).max(right.unsigned_abs());
	}
}

#[cfg(test)]
mod test {
	use std::io::Cursor;

	use hound::WavReader;

	use super::*;

	#[test]
	fn writes_interleaved_stereo() {
		let mut buffer = Cursor::new(Vec::new());
		let mut sink = WavSink::new(&mut buffer).unwrap();
		sink.sample(100, -200);
		sink.sample(i16::MIN, 7);
		let statistics = sink.finalize().unwrap();
		assert_eq!(statistics, Statistics { samples: 2, peak: 0x8000 });

		buffer.set_position(0);
		let mut reader = WavReader::new(buffer).unwrap();
		assert_eq!(reader.spec(), SPEC);
		let samples: Vec<i16> = reader.samples::<i16>().map(Result::unwrap).collect();
		assert_eq!(samples, [100, -200, i16::MIN, 7]);
	}

	#[test]
	fn empty_recording_is_valid() {
		let mut buffer = Cursor::new(Vec::new());
		let sink = WavSink::new(&mut buffer).unwrap();
		assert_eq!(sink.finalize().unwrap(), Statistics::default());
		buffer.set_position(0);
		assert_eq!(WavReader::new(buffer).unwrap().len(), 0);
	}
}

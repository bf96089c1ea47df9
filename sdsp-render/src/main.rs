//! Renders SPC700 sound file snapshots to WAV files, using only the S-DSP. The sound CPU is not emulated, so the
//! snapshot plays whatever the DSP registers were set up to play at the time it was taken.

use std::fs;
use std::num::ParseIntError;
use std::path::PathBuf;
use std::time::Instant;

use ::log::{LevelFilter, debug, info, warn};
use anyhow::{Context, Result};
use clap::Parser;
use sdsp::registers::{GlobalRegister, PerVoiceFlag, VOICE_BLOCK_SIZE, VoiceRegister};
use sdsp::{Dsp, Memory, TICKS_PER_SAMPLE};
use time::macros::format_description;

use crate::snapshot::Snapshot;
use crate::wav::{SAMPLE_RATE, WavSink};

mod snapshot;
mod wav;

#[derive(Clone, Debug, Parser)]
#[command(version, about, long_about = None)]
struct CliArguments {
	/// Input SPC file.
	input:      PathBuf,
	/// Output WAV file.
	output:     PathBuf,
	/// Length of the recording in seconds.
	#[arg(long, default_value_t = 10.0)]
	seconds:    f64,
	/// Length of the recording in samples, overrides --seconds.
	#[arg(long)]
	samples:    Option<u64>,
	/// Voices to key on after loading the snapshot, as a bit mask. Decimal, or hexadecimal / binary with 0x / 0b.
	#[arg(long, value_parser = parse_voice_mask)]
	key_on:     Option<u8>,
	/// Voices to silence, as a bit mask.
	#[arg(long, value_parser = parse_voice_mask, default_value = "0")]
	voice_mask: u8,
	/// Verbosity level to use.
	#[arg(long, short, action = clap::ArgAction::Count)]
	verbose:    u8,
}

impl CliArguments {
	#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
	fn sample_count(&self) -> u64 {
		self.samples.unwrap_or_else(|| (self.seconds.max(0.) * f64::from(SAMPLE_RATE)).round() as u64)
	}
}

fn parse_voice_mask(text: &str) -> Result<u8, ParseIntError> {
	if let Some(hex) = text.strip_prefix("0x") {
		u8::from_str_radix(hex, 16)
	} else if let Some(binary) = text.strip_prefix("0b") {
		u8::from_str_radix(binary, 2)
	} else {
		text.parse()
	}
}

/// Apply the command line's voice overrides to a freshly loaded DSP.
#[allow(clippy::cast_possible_truncation)]
fn apply_voice_overrides(dsp: &mut Dsp, key_on: Option<u8>, voice_mask: u8) {
	for voice in PerVoiceFlag::from_bits_retain(voice_mask).iter() {
		let block = (voice.bits().trailing_zeros() as usize * VOICE_BLOCK_SIZE) as u8;
		dsp.write(block + VoiceRegister::VolumeLeft as u8, 0);
		dsp.write(block + VoiceRegister::VolumeRight as u8, 0);
	}

	if let Some(key_on) = key_on {
		let key_off = dsp.read(GlobalRegister::KeyOff as u8);
		dsp.write(GlobalRegister::KeyOff as u8, key_off & !key_on);
		dsp.write(GlobalRegister::KeyOn as u8, key_on);
	}
}

#[allow(clippy::cast_precision_loss)]
fn main() -> Result<()> {
	human_panic::setup_panic!(human_panic::metadata!());

	let arguments = CliArguments::parse();
	let log_level = match arguments.verbose {
		0 => LevelFilter::Warn,
		1 => LevelFilter::Info,
		2 => LevelFilter::Debug,
		3 .. => LevelFilter::Trace,
	};
	simple_logger::SimpleLogger::new()
		.with_level(log_level)
		.with_local_timestamps()
		.with_timestamp_format(format_description!(version = 2, "[hour]:[minute]:[second]"))
		.init()?;

	warn!("sdsp-render version {}, licensed under BSD 2-clause", env!("CARGO_PKG_VERSION"));

	let file_data =
		fs::read(&arguments.input).with_context(|| format!("could not read {}", arguments.input.display()))?;
	let snapshot = Snapshot::from_bytes(&file_data)?;
	if let Some(title) = &snapshot.title {
		info!("Song: {title}");
	}
	debug!("DSP registers: {:02x?}", snapshot.dsp_registers);

	let mut memory = Memory::from_image(&snapshot.ram);
	let mut dsp = Dsp::new();
	dsp.load_register_bank(&snapshot.dsp_registers);
	apply_voice_overrides(&mut dsp, arguments.key_on, arguments.voice_mask);

	let mut sink = WavSink::create(&arguments.output)
		.with_context(|| format!("could not create {}", arguments.output.display()))?;

	let sample_count = arguments.sample_count();
	let start_time = Instant::now();
	for _ in 0 .. sample_count {
		dsp.clock(TICKS_PER_SAMPLE, &mut memory, &mut sink);
	}
	let statistics = sink.finalize().with_context(|| format!("could not write {}", arguments.output.display()))?;

	let elapsed = start_time.elapsed();
	let audio_seconds = statistics.samples as f64 / f64::from(SAMPLE_RATE);
	let speed = audio_seconds / elapsed.as_secs_f64();
	let peak = 20. * (f64::from(statistics.peak.max(1)) / 32768.).log10();
	info!(
		"Rendered {} samples ({audio_seconds:.2} s) in {elapsed:.2?}, {speed:5.2}× realtime, peak {peak:.1} dBFS",
		statistics.samples,
	);
	if statistics.peak == 0 {
		warn!("Output is silent; the snapshot may have been taken between notes, try --key-on");
	}

	Ok(())
}

#[cfg(test)]
mod test {
	use rstest::rstest;

	use super::*;

	#[rstest]
	#[case("0", 0)]
	#[case("255", 0xff)]
	#[case("0x81", 0x81)]
	#[case("0b101", 0b101)]
	fn voice_masks(#[case] text: &str, #[case] expected: u8) {
		assert_eq!(parse_voice_mask(text), Ok(expected));
	}

	#[test]
	fn invalid_voice_mask() {
		assert!(parse_voice_mask("256").is_err());
		assert!(parse_voice_mask("0xg").is_err());
	}

	#[test]
	fn sample_count_from_duration() {
		let arguments = CliArguments::parse_from(["sdsp-render", "in.spc", "out.wav", "--seconds", "1.5"]);
		assert_eq!(arguments.sample_count(), 48000);
		let arguments = CliArguments::parse_from(["sdsp-render", "in.spc", "out.wav", "--samples", "123"]);
		assert_eq!(arguments.sample_count(), 123);
	}

	#[test]
	fn overrides_silence_and_key_on() {
		let mut dsp = Dsp::new();
		let mut bank = [0x7f; 128];
		bank[GlobalRegister::KeyOff as usize] = 0xff;
		dsp.load_register_bank(&bank);

		apply_voice_overrides(&mut dsp, Some(0b0000_0110), 0b1000_0010);
		assert_eq!(dsp.read(0x10), 0);
		assert_eq!(dsp.read(0x11), 0);
		assert_eq!(dsp.read(0x70), 0);
		assert_eq!(dsp.read(0x20), 0x7f);
		assert_eq!(dsp.read(GlobalRegister::KeyOff as u8), 0b1111_1001);
		assert_eq!(dsp.read(GlobalRegister::KeyOn as u8), 0b0000_0110);
	}
}

//! S-DSP (Synthesizer) emulator front end: register bus, clock and lifecycle.

use log::debug;
use num_traits::FromPrimitive;

use crate::memory::ApuRam;
use crate::pipeline::{Context, PHASE_COUNT, SCHEDULE};
use crate::registers::{DspFlags, GlobalRegister, PerVoiceFlag, REGISTER_COUNT, RegisterFile, VoiceRegister};
use crate::sink::AudioSink;
use crate::state::{NOISE_SEED, State};
use crate::voice::Voice;

/// Master clock ticks per pipeline phase.
pub const TICKS_PER_PHASE: i64 = 24;
/// Master clock ticks per output sample.
#[allow(clippy::cast_possible_wrap)]
pub const TICKS_PER_SAMPLE: i64 = TICKS_PER_PHASE * PHASE_COUNT as i64;

/// State of the S-DSP.
#[derive(Clone, Debug)]
pub struct Dsp {
	state:  State,
	voices: [Voice; 8],
	/// Clock debt in master ticks. Negative values are owed work; each phase pays back [`TICKS_PER_PHASE`].
	clock:  i64,
	/// Next phase to run.
	phase:  usize,
}

impl Default for Dsp {
	fn default() -> Self {
		Self::new()
	}
}

impl Dsp {
	/// Create a new DSP instance in its power-on state.
	#[must_use]
	pub fn new() -> Self {
		let mut dsp = Self { state: State::default(), voices: Voice::all(), clock: 0, phase: 0 };
		dsp.power();
		dsp
	}

	/// Read a register. The pipeline updates ENVX, OUTX and ENDX itself, so reads observe those with up to a sample
	/// of latency.
	///
	/// # Panics
	///
	/// Addresses 0x80 and above do not exist.
	#[must_use]
	#[track_caller]
	pub fn read(&self, address: u8) -> u8 {
		self.state.regs.read(address)
	}

	/// Write a register.
	///
	/// # Panics
	///
	/// Addresses 0x80 and above do not exist.
	#[track_caller]
	pub fn write(&mut self, address: u8, value: u8) {
		self.state.regs.store(address, value);

		// The pipeline's pending ENVX and OUTX values are overwritten too, so the write sticks until the voice next
		// produces a value.
		match VoiceRegister::from_u8(address & 0x0f) {
			Some(VoiceRegister::Envelope) => self.state.envx_buf = value,
			Some(VoiceRegister::Output) => self.state.outx_buf = value,
			_ => {},
		}

		match GlobalRegister::from_u8(address) {
			Some(GlobalRegister::KeyOn) => self.state.new_kon = PerVoiceFlag::from_bits_retain(value),
			Some(GlobalRegister::VoiceEnd) => {
				// Any write clears all end flags.
				self.state.endx_buf = PerVoiceFlag::empty();
				self.state.regs.set_global(GlobalRegister::VoiceEnd, 0);
			},
			_ => {},
		}
	}

	/// Run the DSP for the given number of master clock ticks. Whole phases run as long as there is clock debt, so
	/// leftover ticks carry over into the next call.
	///
	/// Samples are delivered to the sink as they are finished, one per [`TICKS_PER_SAMPLE`].
	pub fn clock(&mut self, ticks: i64, memory: &mut dyn ApuRam, sink: &mut dyn AudioSink) {
		self.clock -= ticks;

		let mut context = Context { state: &mut self.state, voices: &mut self.voices, memory, sink };
		while self.clock < 0 {
			SCHEDULE[self.phase](&mut context);
			self.phase = (self.phase + 1) % PHASE_COUNT;
			self.clock += TICKS_PER_PHASE;
		}
	}

	/// Power cycle: clear all registers and internal state.
	pub fn power(&mut self) {
		self.state = State::default();
		self.voices = Voice::all();
		self.reset();
		debug!("DSP powered on");
	}

	/// Reset line: restart the pipeline and put the chip into soft reset. Registers and voice state other than FLG
	/// survive.
	pub fn reset(&mut self) {
		self.clock = 0;
		self.phase = 0;

		let state = &mut self.state;
		state.regs.set_global(GlobalRegister::Flags, DspFlags::POWER_ON.bits());
		state.noise = NOISE_SEED;
		state.echo_hist_pos = 0;
		state.every_other_sample = true;
		state.echo_offset = 0;
		state.counter = 0;
		debug!("DSP reset");
	}

	/// Load the register state from a bank of registers (e.g. a snapshot). No write side effects happen except for
	/// latching KON, DIR and ESA, so that the pipeline continues as if it had been running with these registers.
	pub fn load_register_bank(&mut self, register_bank: &[u8; REGISTER_COUNT]) {
		let state = &mut self.state;
		state.regs.load(register_bank);
		state.new_kon = PerVoiceFlag::from_bits_retain(state.regs.global(GlobalRegister::KeyOn));
		state.t_dir = state.regs.global(GlobalRegister::SampleDirectory);
		state.t_esa = state.regs.global(GlobalRegister::EchoSource);
		debug!("DSP registers loaded, KON {:08b}", state.new_kon.bits());
	}

	/// Most recent stereo sample, (left, right).
	#[must_use]
	pub const fn last_sample(&self) -> (i16, i16) {
		self.state.last_sample
	}

	/// The register file.
	#[must_use]
	pub const fn registers(&self) -> &RegisterFile {
		&self.state.regs
	}

	/// Internal state of one voice.
	#[must_use]
	pub fn voice(&self, index: usize) -> &Voice {
		&self.voices[index]
	}

	/// Internal global state.
	#[must_use]
	pub const fn state(&self) -> &State {
		&self.state
	}

	/// Phase that runs next.
	#[must_use]
	pub const fn phase(&self) -> usize {
		self.phase
	}
}

//! Sample generation pipeline of the S-DSP.
//!
//! The DSP produces one stereo sample every 32 clock phases. Each phase performs a handful of micro-operations from
//! different voices and the echo unit, so that memory and register accesses happen in the same order as on hardware.
//! [`SCHEDULE`] lists what happens in each phase; the micro-operations themselves live in the submodules.

use crate::memory::ApuRam;
use crate::sink::AudioSink;
use crate::state::State;
use crate::voice::Voice;

pub mod brr;
pub mod echo;
pub mod envelope;
pub mod gaussian;
pub mod misc;
pub mod stages;
pub mod tables;

use echo::{echo_22, echo_23, echo_24, echo_25, echo_26, echo_27, echo_28, echo_29, echo_30};
use misc::{misc_27, misc_28, misc_29, misc_30};
use stages::{
	voice_1, voice_2, voice_3, voice_3a, voice_3b, voice_3c, voice_4, voice_5, voice_6, voice_7, voice_8, voice_9,
};

/// Number of phases per sample.
pub const PHASE_COUNT: usize = 32;

/// Saturate to the signed 16-bit range.
#[inline]
#[must_use]
pub fn clamp16(value: i32) -> i32 {
	value.clamp(i16::MIN.into(), i16::MAX.into())
}

/// Everything a phase operates on, borrowed for the duration of a clock call.
pub struct Context<'a> {
	/// Global state and registers.
	pub state:  &'a mut State,
	/// Voice state.
	pub voices: &'a mut [Voice; 8],
	/// APU RAM.
	pub memory: &'a mut dyn ApuRam,
	/// Receiver of finished samples.
	pub sink:   &'a mut dyn AudioSink,
}

impl Context<'_> {
	fn v1(&mut self, voice: usize) {
		voice_1(self.state, &self.voices[voice]);
	}

	fn v2(&mut self, voice: usize) {
		voice_2(self.state, &self.voices[voice], self.memory);
	}

	fn v3(&mut self, voice: usize) {
		voice_3(self.state, &mut self.voices[voice], self.memory);
	}

	fn v4(&mut self, voice: usize) {
		voice_4(self.state, &mut self.voices[voice], self.memory);
	}

	fn v5(&mut self, voice: usize) {
		voice_5(self.state, &self.voices[voice]);
	}

	fn v6(&mut self, _voice: usize) {
		voice_6(self.state);
	}

	fn v7(&mut self, voice: usize) {
		voice_7(self.state, &self.voices[voice]);
	}

	fn v8(&mut self, voice: usize) {
		voice_8(self.state, &self.voices[voice]);
	}

	fn v9(&mut self, voice: usize) {
		voice_9(self.state, &self.voices[voice]);
	}

	/// V7, V8 and V9 of voice `k` overlap with V1 to V6 of the next voices in phases 2 to 16.
	fn v7_v1_v4(&mut self, k: usize) {
		self.v7(k);
		self.v1(k + 3);
		self.v4(k + 1);
	}

	fn v8_v5_v2(&mut self, k: usize) {
		self.v8(k);
		self.v5(k + 1);
		self.v2(k + 2);
	}

	fn v9_v6_v3(&mut self, k: usize) {
		self.v9(k);
		self.v6(k + 1);
		self.v3(k + 2);
	}
}

/// One phase of the pipeline.
pub type Phase = fn(&mut Context<'_>);

fn phase_0(c: &mut Context<'_>) {
	c.v5(0);
	c.v2(1);
}

fn phase_1(c: &mut Context<'_>) {
	c.v6(0);
	c.v3(1);
}

fn phase_2(c: &mut Context<'_>) {
	c.v7_v1_v4(0);
}

fn phase_3(c: &mut Context<'_>) {
	c.v8_v5_v2(0);
}

fn phase_4(c: &mut Context<'_>) {
	c.v9_v6_v3(0);
}

fn phase_5(c: &mut Context<'_>) {
	c.v7_v1_v4(1);
}

fn phase_6(c: &mut Context<'_>) {
	c.v8_v5_v2(1);
}

fn phase_7(c: &mut Context<'_>) {
	c.v9_v6_v3(1);
}

fn phase_8(c: &mut Context<'_>) {
	c.v7_v1_v4(2);
}

fn phase_9(c: &mut Context<'_>) {
	c.v8_v5_v2(2);
}

fn phase_10(c: &mut Context<'_>) {
	c.v9_v6_v3(2);
}

fn phase_11(c: &mut Context<'_>) {
	c.v7_v1_v4(3);
}

fn phase_12(c: &mut Context<'_>) {
	c.v8_v5_v2(3);
}

fn phase_13(c: &mut Context<'_>) {
	c.v9_v6_v3(3);
}

fn phase_14(c: &mut Context<'_>) {
	c.v7_v1_v4(4);
}

fn phase_15(c: &mut Context<'_>) {
	c.v8_v5_v2(4);
}

fn phase_16(c: &mut Context<'_>) {
	c.v9_v6_v3(4);
}

fn phase_17(c: &mut Context<'_>) {
	c.v1(0);
	c.v7(5);
	c.v4(6);
}

fn phase_18(c: &mut Context<'_>) {
	c.v8(5);
	c.v5(6);
	c.v2(7);
}

fn phase_19(c: &mut Context<'_>) {
	c.v9(5);
	c.v6(6);
	c.v3(7);
}

fn phase_20(c: &mut Context<'_>) {
	c.v1(1);
	c.v7(6);
	c.v4(7);
}

fn phase_21(c: &mut Context<'_>) {
	c.v8(6);
	c.v5(7);
	c.v2(0);
}

fn phase_22(c: &mut Context<'_>) {
	voice_3a(c.state, &c.voices[0]);
	c.v9(6);
	c.v6(7);
	echo_22(c.state, c.memory);
}

fn phase_23(c: &mut Context<'_>) {
	c.v7(7);
	echo_23(c.state, c.memory);
}

fn phase_24(c: &mut Context<'_>) {
	c.v8(7);
	echo_24(c.state);
}

fn phase_25(c: &mut Context<'_>) {
	voice_3b(c.state, &c.voices[0], c.memory);
	c.v9(7);
	echo_25(c.state);
}

fn phase_26(c: &mut Context<'_>) {
	echo_26(c.state);
}

fn phase_27(c: &mut Context<'_>) {
	misc_27(c.state);
	echo_27(c.state, c.sink);
}

fn phase_28(c: &mut Context<'_>) {
	misc_28(c.state);
	echo_28(c.state);
}

fn phase_29(c: &mut Context<'_>) {
	misc_29(c.state);
	echo_29(c.state, c.memory);
}

fn phase_30(c: &mut Context<'_>) {
	misc_30(c.state);
	voice_3c(c.state, &mut c.voices[0]);
	echo_30(c.state, c.memory);
}

fn phase_31(c: &mut Context<'_>) {
	c.v4(0);
	c.v1(2);
}

/// What happens in each of the 32 phases of a sample.
pub static SCHEDULE: [Phase; PHASE_COUNT] = [
	phase_0, phase_1, phase_2, phase_3, phase_4, phase_5, phase_6, phase_7, phase_8, phase_9, phase_10, phase_11,
	phase_12, phase_13, phase_14, phase_15, phase_16, phase_17, phase_18, phase_19, phase_20, phase_21, phase_22,
	phase_23, phase_24, phase_25, phase_26, phase_27, phase_28, phase_29, phase_30, phase_31,
];

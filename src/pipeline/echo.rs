//! Echo unit: echo buffer reads and writes, 8-tap FIR filter and the final output mix.
//!
//! The echo buffer lives in APU RAM at `ESA * 0x100` and holds `EDL * 2048` bytes of interleaved 16-bit stereo samples.
//! Every sample, the oldest entry is read into the FIR history and then overwritten with the new echo input.

use super::clamp16;
use crate::memory::ApuRam;
use crate::registers::{DspFlags, GlobalRegister};
use crate::sink::AudioSink;
use crate::state::{ECHO_HISTORY_SIZE, State};

/// One FIR tap applied to the channel's history.
#[inline]
#[must_use]
#[allow(clippy::cast_possible_wrap)]
pub fn calc_fir(state: &State, tap: usize, channel: usize) -> i32 {
	let sample = state.echo_hist[channel].read((state.echo_hist_pos + tap + 1) as isize);
	(sample * i32::from(state.regs.fir_coefficient(tap))) >> 6
}

/// Final output of the channel: main and echo signal, each scaled by its volume.
#[must_use]
#[allow(clippy::cast_possible_wrap, clippy::cast_possible_truncation)]
pub fn echo_output(state: &State, channel: usize) -> i32 {
	let main_volume = i32::from(state.regs.global(GlobalRegister::main_volume(channel)) as i8);
	let echo_volume = i32::from(state.regs.global(GlobalRegister::echo_volume(channel)) as i8);
	let main = i32::from(((state.t_main_out[channel] * main_volume) >> 7) as i16);
	let echo = i32::from(((state.t_echo_in[channel] * echo_volume) >> 7) as i16);
	clamp16(main + echo)
}

#[inline]
#[allow(clippy::cast_possible_truncation)]
const fn channel_address(state: &State, channel: usize) -> u16 {
	state.t_echo_ptr.wrapping_add(channel as u16 * 2)
}

#[allow(clippy::cast_possible_wrap)]
fn echo_read(state: &mut State, memory: &mut dyn ApuRam, channel: usize) {
	let sample = memory.read_word(channel_address(state, channel)) as i16;
	state.echo_hist[channel].write(state.echo_hist_pos, i32::from(sample) >> 1);
}

#[allow(clippy::cast_possible_truncation)]
fn echo_write(state: &mut State, memory: &mut dyn ApuRam, channel: usize) {
	if !state.t_echo_disabled.contains(DspFlags::ECHO_WRITE_DISABLE) {
		let address = channel_address(state, channel);
		let [low, high] = (state.t_echo_out[channel] as i16).to_le_bytes();
		memory.write_byte(address, low);
		memory.write_byte(address.wrapping_add(1), high);
	}
	state.t_echo_out[channel] = 0;
}

/// Advance the history, compute the echo pointer, read the left echo sample and start the FIR sum.
pub fn echo_22(state: &mut State, memory: &mut dyn ApuRam) {
	state.echo_hist_pos = (state.echo_hist_pos + 1) % ECHO_HISTORY_SIZE;
	state.t_echo_ptr = (u16::from(state.t_esa) << 8).wrapping_add(state.echo_offset);
	echo_read(state, memory, 0);

	state.t_echo_in = [calc_fir(state, 0, 0), calc_fir(state, 0, 1)];
}

/// FIR taps 1 and 2, read the right echo sample.
pub fn echo_23(state: &mut State, memory: &mut dyn ApuRam) {
	for channel in 0 .. 2 {
		state.t_echo_in[channel] += calc_fir(state, 1, channel) + calc_fir(state, 2, channel);
	}
	echo_read(state, memory, 1);
}

/// FIR taps 3 to 5.
pub fn echo_24(state: &mut State) {
	for channel in 0 .. 2 {
		state.t_echo_in[channel] +=
			calc_fir(state, 3, channel) + calc_fir(state, 4, channel) + calc_fir(state, 5, channel);
	}
}

/// FIR taps 6 and 7. The sum wraps to 16 bits after tap 6 and is only clamped at the very end.
#[allow(clippy::cast_possible_truncation)]
pub fn echo_25(state: &mut State) {
	for channel in 0 .. 2 {
		let mut sum = i32::from((state.t_echo_in[channel] + calc_fir(state, 6, channel)) as i16);
		sum += i32::from(calc_fir(state, 7, channel) as i16);
		state.t_echo_in[channel] = clamp16(sum) & !1;
	}
}

/// Left output, and echo feedback into the echo input.
#[allow(clippy::cast_possible_wrap, clippy::cast_possible_truncation)]
pub fn echo_26(state: &mut State) {
	state.t_main_out[0] = echo_output(state, 0);

	let feedback = i32::from(state.regs.global(GlobalRegister::EchoFeedback) as i8);
	for channel in 0 .. 2 {
		let amount = i32::from(((state.t_echo_in[channel] * feedback) >> 7) as i16);
		state.t_echo_out[channel] = clamp16(state.t_echo_out[channel] + amount) & !1;
	}
}

/// Right output; deliver the finished sample.
#[allow(clippy::cast_possible_truncation)]
pub fn echo_27(state: &mut State, sink: &mut dyn AudioSink) {
	let left = state.t_main_out[0];
	let right = echo_output(state, 1);
	state.t_main_out = [0; 2];

	let sample = if state.regs.flags().contains(DspFlags::AMPLIFIER_MUTE) {
		(0, 0)
	} else {
		(left as i16, right as i16)
	};
	sink.sample(sample.0, sample.1);
	state.last_sample = sample;
}

/// Latch FLG for the left echo write.
pub fn echo_28(state: &mut State) {
	state.t_echo_disabled = state.regs.flags();
}

/// Advance the echo buffer position, write the left echo sample.
pub fn echo_29(state: &mut State, memory: &mut dyn ApuRam) {
	state.t_esa = state.regs.global(GlobalRegister::EchoSource);

	// The buffer length only changes when the position wraps around.
	if state.echo_offset == 0 {
		state.echo_length = u16::from(state.regs.global(GlobalRegister::EchoDelay) & 0x0f) << 11;
	}
	state.echo_offset += 4;
	if state.echo_offset >= state.echo_length {
		if state.echo_length > 0 {
			trace!("echo buffer wrapped at {:04x}", state.t_echo_ptr);
		}
		state.echo_offset = 0;
	}

	echo_write(state, memory, 0);

	state.t_echo_disabled = state.regs.flags();
}

/// Write the right echo sample.
pub fn echo_30(state: &mut State, memory: &mut dyn ApuRam) {
	echo_write(state, memory, 1);
}

#[cfg(test)]
mod test {
	use super::*;
	use crate::memory::Memory;
	use crate::registers::fir_address;

	#[test]
	fn fir_reads_history_after_cursor() {
		let mut state = State::default();
		state.echo_hist_pos = 7;
		// Tap 0 sees the oldest entry (position 7 + 0 + 1 wraps to 0), tap 7 the newest.
		state.echo_hist[0].write(0, 1000);
		state.echo_hist[0].write(7, -640);
		state.regs.store(fir_address(0), 0x40);
		state.regs.store(fir_address(7), 0xff);
		assert_eq!(calc_fir(&state, 0, 0), 1000);
		assert_eq!(calc_fir(&state, 7, 0), 10);
		assert_eq!(calc_fir(&state, 0, 1), 0);
	}

	#[test]
	fn read_halves_the_stored_sample() {
		let mut state = State::default();
		let mut memory = Memory::zeroed();
		state.t_esa = 0x40;
		state.echo_offset = 0x10;
		memory.load(0x4010, &[0x00, 0x80, 0x34, 0x12]);
		echo_22(&mut state, &mut memory);
		echo_23(&mut state, &mut memory);
		assert_eq!(state.t_echo_ptr, 0x4010);
		assert_eq!(state.echo_hist_pos, 1);
		assert_eq!(state.echo_hist[0].read(1), -0x4000);
		assert_eq!(state.echo_hist[1].read(1), 0x091a);
	}

	#[test]
	fn echo_pointer_wraps_at_end_of_memory() {
		let mut state = State::default();
		let mut memory = Memory::zeroed();
		state.t_esa = 0xff;
		state.echo_offset = 0xfe;
		memory.load(0x0000, &[0xff, 0x7f]);
		echo_22(&mut state, &mut memory);
		echo_23(&mut state, &mut memory);
		assert_eq!(state.echo_hist[1].read(1), 0x3fff);
	}

	#[test]
	fn write_respects_disable_flag_and_clears_accumulator() {
		let mut state = State::default();
		let mut memory = Memory::zeroed();
		state.t_echo_ptr = 0x2000;
		state.t_echo_out = [0x1234, -2];

		state.t_echo_disabled = DspFlags::ECHO_WRITE_DISABLE;
		echo_30(&mut state, &mut memory);
		assert_eq!(memory.read_word(0x2002), 0);
		assert_eq!(state.t_echo_out, [0x1234, 0]);

		state.t_echo_disabled = DspFlags::empty();
		state.regs.set_global(GlobalRegister::Flags, 0);
		echo_29(&mut state, &mut memory);
		assert_eq!(memory.read_word(0x2000), 0x1234);
		assert_eq!(state.t_echo_out, [0, 0]);
	}

	#[test]
	fn zero_delay_keeps_offset_at_zero() {
		let mut state = State::default();
		let mut memory = Memory::zeroed();
		for _ in 0 .. 10 {
			echo_29(&mut state, &mut memory);
			assert_eq!(state.echo_offset, 0);
			assert_eq!(state.echo_length, 0);
		}
	}

	#[test]
	fn delay_length_latched_on_wrap() {
		let mut state = State::default();
		let mut memory = Memory::zeroed();
		state.regs.set_global(GlobalRegister::EchoDelay, 1);
		echo_29(&mut state, &mut memory);
		assert_eq!(state.echo_length, 2048);
		assert_eq!(state.echo_offset, 4);

		// Changing EDL mid-buffer has no effect until the next wrap.
		state.regs.set_global(GlobalRegister::EchoDelay, 2);
		for _ in 1 .. 512 {
			echo_29(&mut state, &mut memory);
		}
		assert_eq!(state.echo_offset, 0);
		assert_eq!(state.echo_length, 2048);
		echo_29(&mut state, &mut memory);
		assert_eq!(state.echo_length, 4096);
	}

	#[test]
	fn fir_sum_clamps() {
		let mut state = State::default();
		state.t_echo_in = [0x7f00, -0x7f00];
		state.echo_hist[0].write(0, 0x4000);
		state.echo_hist[1].write(0, -0x4000);
		state.regs.store(fir_address(7), 0x7f);
		// Tap 6 adds nothing, so the 16-bit truncation keeps the partial sum; tap 7 pushes it over the edge.
		echo_25(&mut state);
		assert_eq!(state.t_echo_in, [0x7ffe, -0x8000]);
	}

	#[test]
	fn output_mixes_and_mutes() {
		let mut state = State::default();
		let mut samples: Vec<(i16, i16)> = Vec::new();
		state.regs.set_global(GlobalRegister::MainVolumeLeft, 0x40);
		state.regs.set_global(GlobalRegister::MainVolumeRight, 0xc0);
		state.regs.set_global(GlobalRegister::EchoVolumeLeft, 0x7f);
		state.regs.set_global(GlobalRegister::Flags, 0);
		state.t_main_out = [1000, 1000];
		state.t_echo_in = [128, 0];

		echo_26(&mut state);
		echo_27(&mut state, &mut samples);
		assert_eq!(samples, vec![(500 + 127, -500)]);
		assert_eq!(state.last_sample, (627, -500));
		assert_eq!(state.t_main_out, [0, 0]);

		state.regs.set_global(GlobalRegister::Flags, DspFlags::AMPLIFIER_MUTE.bits());
		state.t_main_out = [1000, 1000];
		echo_26(&mut state);
		echo_27(&mut state, &mut samples);
		assert_eq!(samples[1], (0, 0));
		assert_eq!(state.last_sample, (0, 0));
	}

	#[test]
	fn feedback_adds_into_echo_send() {
		let mut state = State::default();
		state.regs.set_global(GlobalRegister::EchoFeedback, 0x40);
		state.t_echo_in = [1000, -1000];
		state.t_echo_out = [7, 0];
		echo_26(&mut state);
		assert_eq!(state.t_echo_out, [506, -500]);
	}
}

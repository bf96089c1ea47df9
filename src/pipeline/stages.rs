//! The nine per-voice pipeline stages.
//!
//! Each voice runs through V1 to V9 once per sample, spread over three consecutive phases per group of stages, with the
//! voices staggered against each other. Stages communicate through the `t_*` latches in [`State`], which is why a stage
//! of one voice can observe a value that another voice's stage has written one phase earlier.

use super::brr::{HEADER_END, decode_brr, ends_without_loop};
use super::clamp16;
use super::envelope::run_envelope;
use super::gaussian::interpolate;
use crate::memory::ApuRam;
use crate::registers::{DspFlags, GlobalRegister, PerVoiceFlag, VoiceRegister};
use crate::state::State;
use crate::voice::{BRR_BLOCK_SIZE, EnvelopeMode, KEY_ON_DELAY, Voice};

/// Interpolation position that forces a BRR decode in the next V4.
const DECODE_POSITION: i32 = 0x4000;
/// Largest interpolation position; higher pitches saturate here.
const MAX_INTERP_POSITION: i32 = 0x7fff;

/// Mix the voice's output into one channel of the main and echo accumulators.
#[allow(clippy::cast_possible_wrap)]
pub fn voice_output(state: &mut State, voice: &Voice, channel: usize) {
	let volume = i32::from(state.regs.voice(voice.vidx, VoiceRegister::volume(channel)) as i8);
	let amplitude = (state.t_output * volume) >> 7;

	state.t_main_out[channel] = clamp16(state.t_main_out[channel] + amplitude);
	if state.t_eon.intersects(voice.vbit) {
		state.t_echo_out[channel] = clamp16(state.t_echo_out[channel] + amplitude);
	}
}

/// Compute the directory entry address from the previously latched sample number, then latch this voice's SRCN.
pub fn voice_1(state: &mut State, voice: &Voice) {
	state.t_dir_addr = (u16::from(state.t_dir) << 8).wrapping_add(u16::from(state.t_srcn) << 2);
	state.t_srcn = state.regs.voice(voice.vidx, VoiceRegister::SampleNumber);
}

/// Read the sample directory entry: the start address while keying on, the loop address otherwise.
pub fn voice_2(state: &mut State, voice: &Voice, memory: &mut dyn ApuRam) {
	let mut entry = state.t_dir_addr;
	if !voice.is_starting() {
		entry = entry.wrapping_add(2);
	}
	state.t_brr_next_addr = memory.read_word(entry);

	state.t_adsr0 = state.regs.voice(voice.vidx, VoiceRegister::Adsr0);
	state.t_pitch = i32::from(state.regs.voice(voice.vidx, VoiceRegister::PitchLow));
}

/// High pitch bits.
pub fn voice_3a(state: &mut State, voice: &Voice) {
	state.t_pitch += i32::from(state.regs.voice(voice.vidx, VoiceRegister::PitchHigh) & 0x3f) << 8;
}

/// Fetch the BRR header and the first sample byte of the next decode.
pub fn voice_3b(state: &mut State, voice: &Voice, memory: &mut dyn ApuRam) {
	state.t_brr_byte = memory.read_byte(voice.brr_addr.wrapping_add(voice.brr_offset));
	state.t_brr_header = memory.read_byte(voice.brr_addr);
}

/// Pitch modulation, key-on startup, sample output and envelope.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn voice_3c(state: &mut State, voice: &mut Voice) {
	// Modulated by the previous voice's output, which is still in t_output.
	if state.t_pmon.intersects(voice.vbit) {
		state.t_pitch += ((state.t_output >> 5) * state.t_pitch) >> 10;
	}

	if voice.is_starting() {
		if voice.kon_delay == KEY_ON_DELAY {
			voice.brr_addr = state.t_brr_next_addr;
			voice.brr_offset = 1;
			voice.buf_pos = 0;
			// The header of the old sample must not end the new one.
			state.t_brr_header = 0;
			trace!("voice {} KON, sample at {:04x}", voice.index(), voice.brr_addr);
		}

		voice.env = 0;
		voice.hidden_env = 0;

		// Three samples of BRR decoding while the pitch is held at 0 fill the buffer.
		voice.interp_pos = 0;
		voice.kon_delay -= 1;
		if voice.kon_delay & 3 != 0 {
			voice.interp_pos = DECODE_POSITION;
		}
		state.t_pitch = 0;
	}

	let mut output = interpolate(voice);
	if state.t_non.intersects(voice.vbit) {
		output = i32::from((state.noise << 1) as i16);
	}

	state.t_output = ((output * voice.env) >> 11) & !1;
	voice.t_envx_out = (voice.env >> 4) as u8;

	if state.regs.flags().contains(DspFlags::SOFT_RESET) || ends_without_loop(state.t_brr_header) {
		voice.env_mode = EnvelopeMode::Release;
		voice.env = 0;
	}

	if state.every_other_sample {
		if state.t_koff.intersects(voice.vbit) {
			voice.env_mode = EnvelopeMode::Release;
		}
		if state.kon.intersects(voice.vbit) {
			voice.kon_delay = KEY_ON_DELAY;
			voice.env_mode = EnvelopeMode::Attack;
		}
	}

	if !voice.is_starting() {
		run_envelope(state, voice);
	}
}

/// V3a, V3b and V3c back to back, as used by voices 1-7. Voice 0 has its parts spread over three phases.
pub fn voice_3(state: &mut State, voice: &mut Voice, memory: &mut dyn ApuRam) {
	voice_3a(state, voice);
	voice_3b(state, voice, memory);
	voice_3c(state, voice);
}

/// Decode new samples if needed, advance the interpolation position and mix the left channel.
pub fn voice_4(state: &mut State, voice: &mut Voice, memory: &mut dyn ApuRam) {
	state.t_looped = PerVoiceFlag::empty();
	if voice.interp_pos >= DECODE_POSITION {
		decode_brr(state, voice, memory);
		voice.brr_offset += 2;

		if voice.brr_offset >= BRR_BLOCK_SIZE {
			voice.brr_addr = voice.brr_addr.wrapping_add(BRR_BLOCK_SIZE);
			if state.t_brr_header & HEADER_END != 0 {
				voice.brr_addr = state.t_brr_next_addr;
				state.t_looped = voice.vbit;
				trace!("voice {} sample end, continuing at {:04x}", voice.index(), voice.brr_addr);
			}
			voice.brr_offset = 1;
		}
	}

	voice.interp_pos = ((voice.interp_pos & 0x3fff) + state.t_pitch).min(MAX_INTERP_POSITION);

	voice_output(state, voice, 0);
}

/// Mix the right channel and prepare the new ENDX value.
pub fn voice_5(state: &mut State, voice: &Voice) {
	voice_output(state, voice, 1);

	let mut endx = PerVoiceFlag::from_bits_retain(state.regs.global(GlobalRegister::VoiceEnd)) | state.t_looped;
	// Keying on clears the voice's end flag.
	if voice.kon_delay == KEY_ON_DELAY {
		endx.remove(voice.vbit);
	}
	state.endx_buf = endx;
}

/// Latch OUTX.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn voice_6(state: &mut State) {
	state.outx_buf = (state.t_output >> 8) as u8;
}

/// Write back ENDX, latch ENVX.
pub fn voice_7(state: &mut State, voice: &Voice) {
	state.regs.set_global(GlobalRegister::VoiceEnd, state.endx_buf.bits());
	state.envx_buf = voice.t_envx_out;
}

/// Write back OUTX.
pub fn voice_8(state: &mut State, voice: &Voice) {
	state.regs.set_voice(voice.vidx, VoiceRegister::Output, state.outx_buf);
}

/// Write back ENVX.
pub fn voice_9(state: &mut State, voice: &Voice) {
	state.regs.set_voice(voice.vidx, VoiceRegister::Envelope, state.envx_buf);
}

//! ADSR and GAIN envelope generator.

use super::misc::counter_poll;
use crate::registers::VoiceRegister;
use crate::state::State;
use crate::voice::{ENVELOPE_MAX, EnvelopeMode, Voice};

/// GAIN register modes, from the top three bits of GAIN. All values below 4 select direct mode.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum GainMode {
	Direct,
	LinearDecrease,
	ExponentialDecrease,
	LinearIncrease,
	BentIncrease,
}

impl GainMode {
	const fn from_gain(gain: u8) -> Self {
		match gain >> 5 {
			0 ..= 3 => Self::Direct,
			4 => Self::LinearDecrease,
			5 => Self::ExponentialDecrease,
			6 => Self::LinearIncrease,
			_ => Self::BentIncrease,
		}
	}
}

/// Hidden envelope value above which the bent-line increase switches to its slow slope.
const BENT_THRESHOLD: u32 = 0x600;

/// Exponential decrease used by Decay, Sustain and GAIN mode 5.
#[inline]
const fn exponential_decrease(env: i32) -> i32 {
	let env = env - 1;
	env - (env >> 8)
}

/// Run the envelope generator for one sample.
///
/// The new level is always computed, but only committed if the global counter fires for the selected rate. Release
/// ignores the rate and always steps.
#[allow(clippy::cast_sign_loss)]
pub fn run_envelope(state: &State, voice: &mut Voice) {
	let mut env = voice.env;

	if voice.env_mode == EnvelopeMode::Release {
		voice.env = (env - 0x8).max(0);
		return;
	}

	let rate;
	let mut env_data = state.regs.voice(voice.vidx, VoiceRegister::Adsr1);
	if state.t_adsr0 & 0x80 != 0 {
		if matches!(voice.env_mode, EnvelopeMode::Decay | EnvelopeMode::Sustain) {
			env = exponential_decrease(env);
			rate = if voice.env_mode == EnvelopeMode::Decay {
				(((state.t_adsr0 >> 3) & 0x0e) + 0x10) as usize
			} else {
				(env_data & 0x1f) as usize
			};
		} else {
			rate = (((state.t_adsr0 & 0x0f) << 1) + 1) as usize;
			env += if rate < 31 { 0x20 } else { 0x400 };
		}
	} else {
		env_data = state.regs.voice(voice.vidx, VoiceRegister::Gain);
		let mode = GainMode::from_gain(env_data);
		if mode == GainMode::Direct {
			env = i32::from(env_data) << 4;
			rate = 31;
		} else {
			rate = (env_data & 0x1f) as usize;
			match mode {
				GainMode::LinearDecrease => env -= 0x20,
				GainMode::ExponentialDecrease => env = exponential_decrease(env),
				GainMode::LinearIncrease => env += 0x20,
				GainMode::BentIncrease => {
					// The comparison is unsigned: a negative leftover from a decrease counts as "high".
					env += if voice.hidden_env as u32 >= BENT_THRESHOLD { 0x8 } else { 0x20 };
				},
				GainMode::Direct => unreachable!(),
			}
		}
	}

	// Sustain level. In GAIN mode this compares against the GAIN register's top bits, as in hardware.
	if env >> 8 == i32::from(env_data >> 5) && voice.env_mode == EnvelopeMode::Decay {
		voice.env_mode = EnvelopeMode::Sustain;
	}
	voice.hidden_env = env;

	// Linear decrease underflowing also lands here.
	if !(0 ..= ENVELOPE_MAX).contains(&env) {
		env = if env < 0 { 0 } else { ENVELOPE_MAX };
		if voice.env_mode == EnvelopeMode::Attack {
			voice.env_mode = EnvelopeMode::Decay;
		}
	}

	if counter_poll(state, rate) {
		voice.env = env;
	}
}

#[cfg(test)]
mod test {
	use rstest::rstest;

	use super::*;
	use crate::pipeline::misc::counter_tick;
	use crate::registers::VOICE_BLOCK_SIZE;

	fn voice_with(state: &mut State, adsr0: u8, adsr1: u8, gain: u8) -> Voice {
		let voice = Voice::new(2);
		state.regs.set_voice(2 * VOICE_BLOCK_SIZE, VoiceRegister::Adsr0, adsr0);
		state.regs.set_voice(2 * VOICE_BLOCK_SIZE, VoiceRegister::Adsr1, adsr1);
		state.regs.set_voice(2 * VOICE_BLOCK_SIZE, VoiceRegister::Gain, gain);
		state.t_adsr0 = adsr0;
		voice
	}

	#[test]
	fn release_steps_down_to_zero() {
		let mut state = State::default();
		let mut voice = voice_with(&mut state, 0x8f, 0xe0, 0);
		voice.env = 0x13;
		run_envelope(&state, &mut voice);
		assert_eq!(voice.env, 0x0b);
		run_envelope(&state, &mut voice);
		assert_eq!(voice.env, 0x03);
		run_envelope(&state, &mut voice);
		assert_eq!(voice.env, 0);
	}

	#[test]
	fn fastest_attack_reaches_decay_in_two_steps() {
		let mut state = State::default();
		let mut voice = voice_with(&mut state, 0x8f, 0x00, 0);
		voice.env_mode = EnvelopeMode::Attack;
		run_envelope(&state, &mut voice);
		assert_eq!(voice.env, 0x400);
		assert_eq!(voice.env_mode, EnvelopeMode::Attack);
		run_envelope(&state, &mut voice);
		assert_eq!(voice.env, ENVELOPE_MAX);
		assert_eq!(voice.env_mode, EnvelopeMode::Decay);
	}

	#[test]
	fn decay_switches_to_sustain_at_sustain_level() {
		let mut state = State::default();
		// Sustain level 7: the very first decay step already lands in 0x700 ..= 0x7ff.
		let mut voice = voice_with(&mut state, 0x8f, 0xe0, 0);
		voice.env_mode = EnvelopeMode::Decay;
		voice.env = ENVELOPE_MAX;
		run_envelope(&state, &mut voice);
		assert_eq!(voice.env_mode, EnvelopeMode::Sustain);
	}

	#[test]
	fn direct_gain_sets_level() {
		let mut state = State::default();
		let mut voice = voice_with(&mut state, 0x00, 0x00, 0x45);
		voice.env_mode = EnvelopeMode::Attack;
		run_envelope(&state, &mut voice);
		assert_eq!(voice.env, 0x450);
	}

	#[test]
	fn linear_decrease_clamps_at_zero() {
		let mut state = State::default();
		// Mode 4, rate 31 (every sample).
		let mut voice = voice_with(&mut state, 0x00, 0x00, 0x9f);
		voice.env_mode = EnvelopeMode::Sustain;
		voice.env = 0x10;
		run_envelope(&state, &mut voice);
		assert_eq!(voice.env, 0);
		assert!(voice.hidden_env < 0);
	}

	#[test]
	fn bent_increase_slows_down_above_threshold() {
		let mut state = State::default();
		let mut voice = voice_with(&mut state, 0x00, 0x00, 0xff);
		voice.env_mode = EnvelopeMode::Sustain;
		voice.env = 0x500;
		voice.hidden_env = 0x500;
		run_envelope(&state, &mut voice);
		assert_eq!(voice.env, 0x520);
		voice.env = 0x600;
		voice.hidden_env = 0x600;
		run_envelope(&state, &mut voice);
		assert_eq!(voice.env, 0x608);
	}

	#[test]
	fn rate_zero_never_commits() {
		let mut state = State::default();
		let mut voice = voice_with(&mut state, 0x00, 0x00, 0xc0);
		voice.env_mode = EnvelopeMode::Sustain;
		voice.env = 0x100;
		for _ in 0 .. 100 {
			run_envelope(&state, &mut voice);
		}
		assert_eq!(voice.env, 0x100);
	}

	#[rstest]
	#[case::attack_adsr(0x8a, 0x2f, 0x00, EnvelopeMode::Attack)]
	#[case::sustain_adsr(0xff, 0x1f, 0x00, EnvelopeMode::Sustain)]
	#[case::linear_increase(0x00, 0x00, 0xdf, EnvelopeMode::Sustain)]
	#[case::bent_increase(0x00, 0x00, 0xfa, EnvelopeMode::Sustain)]
	#[case::exponential_decrease(0x00, 0x00, 0xbf, EnvelopeMode::Sustain)]
	#[case::linear_decrease(0x00, 0x00, 0x9c, EnvelopeMode::Sustain)]
	fn level_stays_in_range(#[case] adsr0: u8, #[case] adsr1: u8, #[case] gain: u8, #[case] mode: EnvelopeMode) {
		let mut state = State::default();
		let mut voice = voice_with(&mut state, adsr0, adsr1, gain);
		voice.env_mode = mode;
		voice.env = 0x3ff;
		for _ in 0 .. 40_000 {
			counter_tick(&mut state);
			run_envelope(&state, &mut voice);
			assert!((0 ..= ENVELOPE_MAX).contains(&voice.env), "envelope out of range: {:x}", voice.env);
		}
	}
}

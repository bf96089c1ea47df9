//! Global once-per-sample work: register latches, KON/KOFF gating, sample counter and noise.

use super::tables::{COUNTER_OFFSETS, COUNTER_RATES};
use crate::registers::{GlobalRegister, PerVoiceFlag};
use crate::state::{COUNTER_RANGE, State};

/// Advance the global sample counter by one sample.
#[inline]
pub fn counter_tick(state: &mut State) {
	state.counter -= 1;
	if state.counter < 0 {
		state.counter = COUNTER_RANGE - 1;
	}
}

/// Returns true if an event running at the given rate (0-31) fires on this sample.
#[inline]
#[must_use]
pub const fn counter_poll(state: &State, rate: usize) -> bool {
	if rate == 0 {
		return false;
	}
	(state.counter + COUNTER_OFFSETS[rate]) % COUNTER_RATES[rate] == 0
}

/// Step the noise LFSR.
#[inline]
#[must_use]
pub const fn noise_step(noise: i32) -> i32 {
	let feedback = (noise << 13) ^ (noise << 14);
	(feedback & 0x4000) ^ (noise >> 1)
}

/// PMON. Voice 0 has no previous voice to be modulated by.
pub fn misc_27(state: &mut State) {
	state.t_pmon = PerVoiceFlag::from_bits_retain(state.regs.global(GlobalRegister::PitchModEnable))
		.difference(PerVoiceFlag::ZERO);
}

/// NON, EON, DIR.
pub fn misc_28(state: &mut State) {
	state.t_non = PerVoiceFlag::from_bits_retain(state.regs.global(GlobalRegister::NoiseEnable));
	state.t_eon = PerVoiceFlag::from_bits_retain(state.regs.global(GlobalRegister::EchoEnable));
	state.t_dir = state.regs.global(GlobalRegister::SampleDirectory);
}

/// Toggle the every-other-sample flag; KON bits that were processed two samples ago are dropped from the KON latch.
pub fn misc_29(state: &mut State) {
	state.every_other_sample = !state.every_other_sample;
	if state.every_other_sample {
		state.new_kon &= !state.kon;
	}
}

/// Latch KON and KOFF on even samples, tick the counter and the noise generator.
pub fn misc_30(state: &mut State) {
	if state.every_other_sample {
		state.kon = state.new_kon;
		state.t_koff = PerVoiceFlag::from_bits_retain(state.regs.global(GlobalRegister::KeyOff));
		if !state.kon.is_empty() {
			trace!("KON latched: {:08b}", state.kon.bits());
		}
	}

	counter_tick(state);

	if counter_poll(state, state.regs.flags().noise_rate()) {
		state.noise = noise_step(state.noise);
	}
}

#[cfg(test)]
mod test {
	use super::*;
	use crate::registers::DspFlags;
	use crate::state::NOISE_SEED;

	/// Samples (counted from the first tick) on which the rate fires.
	fn firing_samples(rate: usize, samples: i32) -> Vec<i32> {
		let mut state = State::default();
		(1 ..= samples)
			.filter(|_| {
				counter_tick(&mut state);
				counter_poll(&state, rate)
			})
			.collect()
	}

	#[test]
	fn counter_wraps() {
		let mut state = State::default();
		counter_tick(&mut state);
		assert_eq!(state.counter, COUNTER_RANGE - 1);
		state.counter = 0;
		counter_tick(&mut state);
		assert_eq!(state.counter, COUNTER_RANGE - 1);
	}

	#[test]
	fn counter_rates() {
		assert!(firing_samples(0, COUNTER_RANGE).is_empty());
		assert_eq!(firing_samples(1, 8192), [2048, 4096, 6144, 8192]);
		assert_eq!(firing_samples(31, 5), [1, 2, 3, 4, 5]);
		// Rates of one group fire at different phases.
		assert_eq!(firing_samples(2, 4000), [1040, 2576]);
		assert_eq!(firing_samples(3, 2000), [536, 1816]);
		assert_eq!(firing_samples(4, 2048), [1024, 2048]);
	}

	#[test]
	fn noise_period() {
		let mut noise = noise_step(NOISE_SEED);
		let mut period = 1;
		while noise != NOISE_SEED {
			assert!((0 .. 0x8000).contains(&noise));
			noise = noise_step(noise);
			period += 1;
		}
		assert_eq!(period, 0x7fff);
	}

	#[test]
	fn pitch_modulation_skips_voice_0() {
		let mut state = State::default();
		state.regs.set_global(GlobalRegister::PitchModEnable, 0x03);
		misc_27(&mut state);
		assert_eq!(state.t_pmon, PerVoiceFlag::ONE);
	}

	#[test]
	fn voice_latches() {
		let mut state = State::default();
		state.regs.set_global(GlobalRegister::NoiseEnable, 0x81);
		state.regs.set_global(GlobalRegister::EchoEnable, 0x42);
		state.regs.set_global(GlobalRegister::SampleDirectory, 0x12);
		misc_28(&mut state);
		assert_eq!(state.t_non.bits(), 0x81);
		assert_eq!(state.t_eon.bits(), 0x42);
		assert_eq!(state.t_dir, 0x12);
	}

	#[test]
	fn processed_key_ons_are_dropped() {
		let mut state = State::default();
		state.every_other_sample = false;
		state.new_kon = PerVoiceFlag::ZERO | PerVoiceFlag::ONE;
		state.kon = PerVoiceFlag::ZERO;

		misc_29(&mut state);
		assert!(state.every_other_sample);
		assert_eq!(state.new_kon, PerVoiceFlag::ONE);

		state.new_kon = PerVoiceFlag::all();
		misc_29(&mut state);
		assert!(!state.every_other_sample);
		assert_eq!(state.new_kon, PerVoiceFlag::all());
	}

	#[test]
	fn key_latches_on_even_samples() {
		let mut state = State::default();
		state.regs.set_global(GlobalRegister::KeyOff, 0x02);
		state.new_kon = PerVoiceFlag::ZERO | PerVoiceFlag::TWO;

		state.every_other_sample = false;
		misc_30(&mut state);
		assert!(state.kon.is_empty());
		assert!(state.t_koff.is_empty());

		state.every_other_sample = true;
		misc_30(&mut state);
		assert_eq!(state.kon, PerVoiceFlag::ZERO | PerVoiceFlag::TWO);
		assert_eq!(state.t_koff, PerVoiceFlag::ONE);
	}

	#[test]
	fn noise_steps_at_its_rate() {
		let mut state = State::default();
		state.noise = NOISE_SEED;
		state.regs.set_global(GlobalRegister::Flags, 0);
		misc_30(&mut state);
		assert_eq!(state.noise, NOISE_SEED);

		state.regs.set_global(GlobalRegister::Flags, DspFlags::NOISE_FREQUENCY.bits());
		misc_30(&mut state);
		assert_eq!(state.noise, noise_step(NOISE_SEED));
		misc_30(&mut state);
		assert_eq!(state.noise, noise_step(noise_step(NOISE_SEED)));
	}
}

//! DSP registers.
#![allow(clippy::module_name_repetitions)]

use bitflags::bitflags;
use num_derive::FromPrimitive;

/// Number of addressable DSP registers.
pub const REGISTER_COUNT: usize = 0x80;

/// Size of each voice's register block.
pub const VOICE_BLOCK_SIZE: usize = 0x10;

/// Per-voice registers, `x0` - `x9`, as offsets within the voice's 16-byte block.
#[derive(Clone, Copy, Debug, Eq, PartialEq, FromPrimitive)]
#[repr(u8)]
pub enum VoiceRegister {
	/// 0, VOLL
	VolumeLeft   = 0x0,
	/// 1, VOLR
	VolumeRight  = 0x1,
	/// 2, PITCHL
	PitchLow     = 0x2,
	/// 3, PITCHH
	PitchHigh    = 0x3,
	/// 4, SRCN
	SampleNumber = 0x4,
	/// 5, ADSR0 (a.k.a. ADSR1 in some documentation)
	Adsr0        = 0x5,
	/// 6, ADSR1 (a.k.a. ADSR2 in some documentation)
	Adsr1        = 0x6,
	/// 7, GAIN
	Gain         = 0x7,
	/// 8, ENVX
	Envelope     = 0x8,
	/// 9, OUTX
	Output       = 0x9,
}

impl VoiceRegister {
	/// The register of the given channel's volume; 0 is left, 1 is right.
	#[must_use]
	pub const fn volume(channel: usize) -> Self {
		if channel == 0 { Self::VolumeLeft } else { Self::VolumeRight }
	}
}

/// Global registers at fixed addresses, interleaved with the voice blocks.
#[derive(Clone, Copy, Debug, Eq, PartialEq, FromPrimitive)]
#[repr(u8)]
pub enum GlobalRegister {
	/// 0C, MVOLL
	MainVolumeLeft  = 0x0C,
	/// 1C, MVOLR
	MainVolumeRight = 0x1C,
	/// 2C, EVOLL
	EchoVolumeLeft  = 0x2C,
	/// 3C, EVOLR
	EchoVolumeRight = 0x3C,
	/// 4C, KON
	KeyOn           = 0x4C,
	/// 5C, KOFF
	KeyOff          = 0x5C,
	/// 6C, FLG
	Flags           = 0x6C,
	/// 7C, ENDX
	VoiceEnd        = 0x7C,
	/// 0D, EFB
	EchoFeedback    = 0x0D,
	/// 2D, PMON
	PitchModEnable  = 0x2D,
	/// 3D, NON
	NoiseEnable     = 0x3D,
	/// 4D, EON
	EchoEnable      = 0x4D,
	/// 5D, DIR
	SampleDirectory = 0x5D,
	/// 6D, ESA 🚀
	EchoSource      = 0x6D,
	/// 7D, EDL
	EchoDelay       = 0x7D,
}

impl GlobalRegister {
	/// Main volume register of the given channel; 0 is left, 1 is right.
	#[must_use]
	pub const fn main_volume(channel: usize) -> Self {
		if channel == 0 { Self::MainVolumeLeft } else { Self::MainVolumeRight }
	}

	/// Echo volume register of the given channel; 0 is left, 1 is right.
	#[must_use]
	pub const fn echo_volume(channel: usize) -> Self {
		if channel == 0 { Self::EchoVolumeLeft } else { Self::EchoVolumeRight }
	}
}

/// Address of the `FIRx` coefficient register for the given tap.
#[must_use]
pub const fn fir_address(tap: usize) -> u8 {
	(tap * VOICE_BLOCK_SIZE + 0x0F) as u8
}

/// All DSP registers exposed to the SMP, stored exactly as written.
///
/// The register file is plain memory: reads return whatever was last stored by either the SMP or the DSP's own
/// pipeline. Side effects of writes are handled by [`crate::Dsp::write`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct RegisterFile([u8; REGISTER_COUNT]);

impl Default for RegisterFile {
	fn default() -> Self {
		Self([0; REGISTER_COUNT])
	}
}

impl RegisterFile {
	#[inline]
	#[track_caller]
	fn check_address(address: u8) {
		assert!((address as usize) < REGISTER_COUNT, "Illegal DSP register address {address:02x}");
	}

	/// Read a register by raw address.
	///
	/// # Panics
	///
	/// Addresses 0x80 and above do not exist.
	#[inline]
	#[must_use]
	#[track_caller]
	pub fn read(&self, address: u8) -> u8 {
		Self::check_address(address);
		self.0[address as usize]
	}

	/// Store a register by raw address, without any write side effects.
	///
	/// # Panics
	///
	/// Addresses 0x80 and above do not exist.
	#[inline]
	#[track_caller]
	pub fn store(&mut self, address: u8, value: u8) {
		Self::check_address(address);
		self.0[address as usize] = value;
	}

	/// Read a global register.
	#[inline]
	#[must_use]
	pub const fn global(&self, register: GlobalRegister) -> u8 {
		self.0[register as usize]
	}

	/// Write a global register.
	#[inline]
	pub const fn set_global(&mut self, register: GlobalRegister, value: u8) {
		self.0[register as usize] = value;
	}

	/// Read a register of the voice whose block starts at `block_base`.
	#[inline]
	#[must_use]
	pub const fn voice(&self, block_base: usize, register: VoiceRegister) -> u8 {
		self.0[block_base + register as usize]
	}

	/// Write a register of the voice whose block starts at `block_base`.
	#[inline]
	pub const fn set_voice(&mut self, block_base: usize, register: VoiceRegister, value: u8) {
		self.0[block_base + register as usize] = value;
	}

	/// Signed FIR filter coefficient of the given tap.
	#[inline]
	#[must_use]
	#[allow(clippy::cast_possible_wrap)]
	pub const fn fir_coefficient(&self, tap: usize) -> i8 {
		self.0[fir_address(tap) as usize] as i8
	}

	/// The FLG register.
	#[inline]
	#[must_use]
	pub const fn flags(&self) -> DspFlags {
		DspFlags::from_bits_retain(self.global(GlobalRegister::Flags))
	}

	/// Raw view of the whole register file.
	#[inline]
	#[must_use]
	pub const fn as_bytes(&self) -> &[u8; REGISTER_COUNT] {
		&self.0
	}

	/// Replace the whole register file without any write side effects.
	#[inline]
	pub const fn load(&mut self, bank: &[u8; REGISTER_COUNT]) {
		self.0 = *bank;
	}
}

bitflags! {
	/// Register with one bit per voice.
	#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
	pub struct PerVoiceFlag : u8 {
		/// Voice 0
		const ZERO = 1 << 0;
		/// Voice 1
		const ONE = 1 << 1;
		/// Voice 2
		const TWO = 1 << 2;
		/// Voice 3
		const THREE = 1 << 3;
		/// Voice 4
		const FOUR = 1 << 4;
		/// Voice 5
		const FIVE = 1 << 5;
		/// Voice 6
		const SIX = 1 << 6;
		/// Voice 7
		const SEVEN = 1 << 7;
	}

	/// Global DSP flags in the FLG register.
	#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
	pub struct DspFlags : u8 {
		/// Noise frequency (rate table index)
		const NOISE_FREQUENCY = 0x1f;
		/// Disable echo writes
		const ECHO_WRITE_DISABLE = 1 << 5;
		/// Mute analog amplifier
		const AMPLIFIER_MUTE = 1 << 6;
		/// Key-off all voices and set all envelopes to 0
		const SOFT_RESET = 1 << 7;
	}
}

impl PerVoiceFlag {
	/// Flag of a single voice.
	#[must_use]
	pub const fn voice(index: usize) -> Self {
		Self::from_bits_retain(1 << index)
	}
}

impl DspFlags {
	/// FLG value on power-up and reset: soft reset, mute and echo write disable all set.
	pub const POWER_ON: Self = Self::from_bits_retain(0xE0);

	/// Noise clock rate, as an index into the rate table.
	#[must_use]
	pub const fn noise_rate(self) -> usize {
		(self.bits() & Self::NOISE_FREQUENCY.bits()) as usize
	}
}

impl Default for DspFlags {
	fn default() -> Self {
		Self::POWER_ON
	}
}

#[cfg(test)]
mod test {
	use num_traits::FromPrimitive;

	use super::*;

	#[test]
	fn addresses_are_bit_exact() {
		assert_eq!(GlobalRegister::from_u8(0x4C), Some(GlobalRegister::KeyOn));
		assert_eq!(GlobalRegister::from_u8(0x7C), Some(GlobalRegister::VoiceEnd));
		assert_eq!(GlobalRegister::from_u8(0x1D), None);
		assert_eq!(VoiceRegister::from_u8(0x8), Some(VoiceRegister::Envelope));
		assert_eq!(VoiceRegister::from_u8(0xA), None);
		assert_eq!(fir_address(0), 0x0F);
		assert_eq!(fir_address(7), 0x7F);
	}

	#[test]
	fn voice_block_access() {
		let mut registers = RegisterFile::default();
		registers.set_voice(3 * VOICE_BLOCK_SIZE, VoiceRegister::Gain, 0x9a);
		assert_eq!(registers.read(0x37), 0x9a);
		registers.store(0x5f, 0x80);
		assert_eq!(registers.fir_coefficient(5), -128);
	}

	#[test]
	fn flags_view() {
		let mut registers = RegisterFile::default();
		registers.set_global(GlobalRegister::Flags, 0xdf);
		let flags = registers.flags();
		assert_eq!(flags.noise_rate(), 0x1f);
		assert!(flags.contains(DspFlags::SOFT_RESET));
		assert!(!flags.contains(DspFlags::ECHO_WRITE_DISABLE));
		assert_eq!(DspFlags::default().bits(), 0xE0);
	}

	#[test]
	#[should_panic = "Illegal DSP register address"]
	fn out_of_range_address_panics() {
		let registers = RegisterFile::default();
		let _ = registers.read(0x80);
	}
}

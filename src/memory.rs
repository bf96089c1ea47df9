//! APU RAM, the 64 KiB address space shared between the sound CPU and the DSP.

/// Size of APU RAM and the DSP's address space.
pub const MEMORY_SIZE: usize = 0x10000;

/// Byte-level access to APU RAM, as seen by the DSP.
///
/// The DSP never owns this memory; it borrows it for the duration of each [`crate::Dsp::clock`] call. All DSP address
/// arithmetic is performed modulo 65536 before it reaches this interface.
pub trait ApuRam {
	/// Performs a read from memory at the given address.
	fn read_byte(&mut self, address: u16) -> u8;
	/// Performs a write to memory at the given address.
	fn write_byte(&mut self, address: u16, value: u8);

	/// Performs a 16-bit little endian read from memory at the given address. The high byte wraps around to address 0.
	#[inline]
	fn read_word(&mut self, address: u16) -> u16 {
		u16::from_le_bytes([self.read_byte(address), self.read_byte(address.wrapping_add(1))])
	}
}

/// Plain 64 KiB RAM image.
#[derive(Clone)]
pub struct Memory {
	/// Raw RAM contents.
	pub ram: Box<[u8; MEMORY_SIZE]>,
}

impl Default for Memory {
	fn default() -> Self {
		Self::new()
	}
}

impl std::fmt::Debug for Memory {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Memory").finish_non_exhaustive()
	}
}

impl Memory {
	/// Creates a new memory instance that reflects the hardware power-on state: alternating runs of 32 bytes of 0x00
	/// and 0xFF.
	#[must_use]
	pub fn new() -> Self {
		let mut memory = Self::zeroed();
		memory.ram.chunks_exact_mut(32).enumerate().for_each(|(block, values)| {
			values.fill(if block & 1 == 0 { 0x00 } else { 0xff });
		});
		memory
	}

	/// Creates a memory instance that is all zeroes. Mostly useful for tests and for loading snapshots.
	#[must_use]
	pub fn zeroed() -> Self {
		Self { ram: Box::new([0; MEMORY_SIZE]) }
	}

	/// Creates a memory instance from a full RAM image.
	#[must_use]
	pub fn from_image(image: &[u8; MEMORY_SIZE]) -> Self {
		Self { ram: Box::new(*image) }
	}

	/// Copies the given bytes into RAM, starting at `address` and wrapping around at the end of the address space.
	pub fn load(&mut self, address: u16, data: &[u8]) {
		let mut address = address;
		for byte in data {
			self.ram[address as usize] = *byte;
			address = address.wrapping_add(1);
		}
	}
}

impl ApuRam for Memory {
	#[inline]
	fn read_byte(&mut self, address: u16) -> u8 {
		let result = self.ram[address as usize];
		trace!("read {0:04x} = {1:02x} ({1})", address, result);
		result
	}

	#[inline]
	fn write_byte(&mut self, address: u16, value: u8) {
		trace!("write {0:04x} = {1:02x} ({1})", address, value);
		self.ram[address as usize] = value;
	}
}

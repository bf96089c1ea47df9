//! Circular buffer with branch-free wraparound reads.

/// Fixed-size circular buffer of `N` elements.
///
/// Every write is stored into three adjacent copies of the backing array. A read at any index in `-N .. 2 * N` then
/// lands inside the middle copy or one of its neighbors, so readers can index relative to a cursor (`pos - 1`,
/// `pos + 3`, ...) without wrapping the index themselves.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModuloArray<T, const N: usize> {
	copies: [[T; N]; 3],
}

impl<T: Copy + Default, const N: usize> Default for ModuloArray<T, N> {
	fn default() -> Self {
		Self { copies: [[T::default(); N]; 3] }
	}
}

impl<T: Copy + Default, const N: usize> ModuloArray<T, N> {
	/// Read the element at `index`, which may be anywhere in `-N .. 2 * N`.
	///
	/// # Panics
	///
	/// Indices outside that range are a caller bug and panic.
	#[inline]
	#[must_use]
	#[allow(clippy::cast_sign_loss, clippy::cast_possible_wrap)]
	pub fn read(&self, index: isize) -> T {
		self.copies.as_flattened()[(N as isize + index) as usize]
	}

	/// Write the element at `index`, which must be in `0 .. N`.
	#[inline]
	pub fn write(&mut self, index: usize, value: T) {
		self.copies[0][index] = value;
		self.copies[1][index] = value;
		self.copies[2][index] = value;
	}
}

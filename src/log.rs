/// Trace message that is compiled out on release builds. The pipeline runs a million micro-operations per second of
/// audio, so even a disabled `log::trace!` level check is too expensive to keep in there.
macro_rules! trace {
	($($arg:tt)+) => {
		#[cfg(debug_assertions)]
		::log::trace!($($arg)+);
	};
}

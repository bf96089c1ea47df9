//! S-DSP emulator.
//!
//! A cycle-accurate model of the SNES sound DSP: eight BRR sample voices with ADSR/GAIN envelopes and Gaussian
//! interpolation, pitch modulation and noise, and the echo unit with its 8-tap FIR filter. The DSP advances in 32
//! phases per output sample, reading and writing APU RAM in the same order as the hardware does.
//!
//! ```
//! use sdsp::{Dsp, Memory, TICKS_PER_SAMPLE};
//!
//! let mut dsp = Dsp::new();
//! let mut memory = Memory::new();
//! let mut samples: Vec<(i16, i16)> = Vec::new();
//! dsp.clock(TICKS_PER_SAMPLE * 32, &mut memory, &mut samples);
//! assert_eq!(samples.len(), 32);
//! ```

#![deny(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names)]

#[macro_use]
mod log;

pub mod dsp;
pub mod memory;
pub mod modulo;
pub mod pipeline;
pub mod registers;
pub mod sink;
pub mod state;
pub mod voice;

pub use dsp::{Dsp, TICKS_PER_PHASE, TICKS_PER_SAMPLE};
pub use memory::{ApuRam, Memory};
pub use sink::AudioSink;

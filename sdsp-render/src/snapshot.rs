//! SPC700 sound file snapshots.
//!
//! An SPC file is a dump of the complete sound subsystem: SMP registers, a 256-byte header with optional ID666 song
//! information, all of APU RAM, and the DSP registers. Only RAM and DSP registers matter to the DSP; the SMP state is
//! skipped.

use nom::branch::alt;
use nom::bytes::complete::{tag, take};
use nom::combinator::map_res;
use nom::error::ErrorKind;
use nom::number::complete::le_u8;
use nom::sequence::tuple;
use nom::{IResult, Parser};
use sdsp::memory::MEMORY_SIZE;
use sdsp::registers::REGISTER_COUNT;
use thiserror::Error;

const MAGIC: &[u8] = b"SNES-SPC700 Sound File Data v0.30";
/// Magic, two marker bytes, the ID666 marker and the version.
const HEADER_START_LENGTH: usize = MAGIC.len() + 4;

/// Offset of the ID666 tag within the header.
const ID666_OFFSET: usize = 0x2e;
/// Offset of the RAM image; everything before it is the header.
const RAM_OFFSET: usize = 0x100;
/// Shortest file that contains both RAM and DSP registers.
pub const MINIMUM_LENGTH: usize = RAM_OFFSET + MEMORY_SIZE + REGISTER_COUNT;

/// Errors while reading an SPC file.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SnapshotError {
	/// The file doesn't start with the SPC magic string.
	#[error("Not an SPC700 sound file (missing \"SNES-SPC700 Sound File Data\" header)")]
	BadMagic,
	/// The file ends before the DSP registers.
	#[error("SPC file is truncated: {length} bytes, at least {MINIMUM_LENGTH} expected")]
	Truncated {
		/// Actual file length.
		length: usize,
	},
	/// The header's marker bytes are invalid.
	#[error("Malformed SPC header ({0:?})")]
	Malformed(ErrorKind),
}

/// The parts of an SPC file the DSP needs.
#[derive(Clone, Debug)]
pub struct Snapshot {
	/// Song title from the ID666 tag, if there is one.
	pub title:         Option<String>,
	/// APU RAM contents.
	pub ram:           Box<[u8; MEMORY_SIZE]>,
	/// DSP register contents.
	pub dsp_registers: Box<[u8; REGISTER_COUNT]>,
}

impl Snapshot {
	/// Parse an SPC file.
	///
	/// # Errors
	///
	/// If the file is not an SPC file or too short.
	pub fn from_bytes(bytes: &[u8]) -> Result<Self, SnapshotError> {
		if !bytes.starts_with(MAGIC) {
			return Err(SnapshotError::BadMagic);
		}
		if bytes.len() < MINIMUM_LENGTH {
			return Err(SnapshotError::Truncated { length: bytes.len() });
		}
		snapshot(bytes).map(|(_, snapshot)| snapshot).map_err(|error| match error {
			nom::Err::Error(error) | nom::Err::Failure(error) => SnapshotError::Malformed(error.code),
			nom::Err::Incomplete(_) => SnapshotError::Truncated { length: bytes.len() },
		})
	}
}

/// Creates a string from a byte sequence that has any number of null bytes at the end. Assumes UTF-8 and discards
/// invalid characters.
fn null_terminated_string(input: &[u8]) -> String {
	let end = input.iter().position(|byte| *byte == 0).unwrap_or(input.len());
	String::from_utf8_lossy(&input[.. end]).trim_end().to_owned()
}

fn array<const N: usize>(input: &[u8]) -> IResult<&[u8], Box<[u8; N]>> {
	map_res(take(N), |bytes: &[u8]| <[u8; N]>::try_from(bytes).map(Box::new)).parse(input)
}

/// Magic, marker bytes and format version. Returns whether an ID666 tag is present.
fn header_start(bytes: &[u8]) -> IResult<&[u8], bool> {
	tuple((
		tag(MAGIC),
		tag([26, 26].as_ref()),
		alt((tag([26].as_ref()).map(|_| true), tag([27].as_ref()).map(|_| false))),
		// Minor version
		le_u8,
	))
	.map(|(_, _, has_id666, _)| has_id666)
	.parse(bytes)
}

fn snapshot(bytes: &[u8]) -> IResult<&[u8], Snapshot> {
	// SMP registers and the ID666 tag fill the rest of the header.
	let (rest, (has_id666, header, ram, dsp_registers)) =
		tuple((header_start, take(RAM_OFFSET - HEADER_START_LENGTH), array::<MEMORY_SIZE>, array::<REGISTER_COUNT>))
			.parse(bytes)?;

	let title = has_id666
		.then(|| null_terminated_string(&header[ID666_OFFSET - HEADER_START_LENGTH ..][.. 32]))
		.filter(|title| !title.is_empty());
	Ok((rest, Snapshot { title, ram, dsp_registers }))
}

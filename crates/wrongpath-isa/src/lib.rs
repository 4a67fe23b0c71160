//! RV64IM instruction set definitions and decoder.
//!
//! Provides instruction decoding, classification, and disassembly. Each
//! extension (I, M) is self-contained in its own module under `extensions/`;
//! [`asm`] holds encoders for assembling small programs.

pub mod asm;
mod decode;
mod encode;
pub mod extensions;
mod types;

pub use decode::*;
pub use encode::*;
pub use extensions::*;
pub use types::*;

/// Decode an instruction with the standard RV64IM extensions.
///
/// This is a convenience wrapper around `CompositeDecoder::standard().decode()`.
pub fn decode(bytes: &[u8], pc: u64) -> Option<DecodedInstr> {
    CompositeDecoder::standard().decode(bytes, pc)
}

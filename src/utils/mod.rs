//! # Utility Functions and Types
//!
//! Helpers shared by the transport stream writer and parser.
//!
//! ## CRC Calculation
//!
//! The crc module provides the MPEG-2 CRC32 used to protect PSI sections:
//!
//! ```rust
//! use tsmux::utils::Crc32Mpeg2;
//!
//! # fn main() {
//! let data = b"Hello, world!";
//! let crc = Crc32Mpeg2::calculate(data);
//! println!("CRC32: {:08x}", crc);
//! # }
//! ```

/// CRC calculation implementations
pub mod crc;

pub use crc::Crc32Mpeg2;

//! # MPEG Transport Stream (TS) Implementation
//!
//! This module turns access units into 188-byte transport stream packets:
//!
//! - Service and stream registry with PID allocation
//! - Program Specific Information (PAT, PMT) and the DVB SDT
//! - Packetized Elementary Stream (PES) framing
//! - PCR insertion and PSI re-transmission scheduling
//! - A parser for checking the produced stream
//!
//! ## Example Usage
//!
//! ```rust
//! use tsmux::av::{AccessUnit, CodecType};
//! use tsmux::format::sink::MemorySink;
//! use tsmux::format::ts::{ServiceInfo, TsMuxer, PID_PAT};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let sink = MemorySink::new();
//! let muxer = TsMuxer::new(sink.clone());
//!
//! let service = muxer.add_service(ServiceInfo::new(1, "provider", "radio"))?;
//! let audio = muxer.add_streams(&service, &[CodecType::AAC])?.remove(0);
//!
//! muxer.encode(&AccessUnit::new(vec![0xff, 0xf1, 0x50, 0x80, 0x02, 0x1f, 0xfc], 0), audio.pid)?;
//!
//! // PSI goes out ahead of the first audio packet
//! assert_eq!(sink.packets()[0].pid(), PID_PAT);
//! # Ok(())
//! # }
//! ```

/// TS muxer: stream scheduling, PSI repetition and PCR
pub mod muxer;

/// Owned 188-byte packets
pub mod packet;

/// PES and PSI to TS packet slicing
pub mod packetizer;

/// Low-level TS packet parsing utilities
pub mod parser;

/// PES packet handling
pub mod pes;

/// Section serialization for PAT, PMT and SDT
pub mod psi;

/// Services, streams and PID allocation
pub mod registry;

/// Core TS types and constants
pub mod types;

pub use muxer::{MuxerState, TsMuxer};
pub use packet::TsPacket;
pub use parser::{PsiAssembler, Section, TSPacketParser};
pub use pes::{PESHeader, PESPacket};
pub use registry::{ElementaryStream, ServiceHandle, ServiceInfo};
pub use types::{
    TSHeader, PID_NULL, PID_PAT, PID_SDT, STREAM_TYPE_AAC, STREAM_TYPE_H264, STREAM_TYPE_H265,
    STREAM_TYPE_PRIVATE_PES, TS_PACKET_SIZE,
};

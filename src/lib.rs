#![doc(html_root_url = "https://docs.rs/tsmux/0.1.0")]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(rustdoc::missing_crate_level_docs)]

//! # tsmux - live MPEG-TS multiplexer
//!
//! `tsmux` turns encoded audio and video access units into an MPEG-2
//! transport stream. It is meant to sit between hardware or software
//! encoders and a file, socket or HLS segmenter.
//!
//! ## Features
//!
//! - Multiple services (programs) per multiplex, each with its own PMT
//! - H.264, H.265, AAC (ADTS) and Opus elementary streams
//! - PAT / PMT / SDT generation with periodic re-transmission
//! - PCR insertion on the service's PCR PID
//! - Thread-safe `encode` callable from several encoder threads at once
//! - Pluggable output through the [`format::sink::PacketSink`] trait
//!
//! ## Quick Start
//!
//! ```rust
//! use tsmux::av::{AccessUnit, CodecType};
//! use tsmux::format::sink::MemorySink;
//! use tsmux::format::ts::{ServiceInfo, TsMuxer, TS_PACKET_SIZE};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let sink = MemorySink::new();
//! let muxer = TsMuxer::new(sink.clone());
//!
//! let service = muxer.add_service(ServiceInfo::new(1, "provider", "camera"))?;
//! let streams = muxer.add_streams(&service, &[CodecType::H264, CodecType::AAC])?;
//!
//! let idr = AccessUnit::new(vec![0, 0, 0, 1, 0x65, 0x88, 0x84], 0).with_key_flag(true);
//! muxer.encode(&idr, streams[0].pid)?;
//! muxer.stop()?;
//!
//! assert_eq!(sink.to_bytes().len() % TS_PACKET_SIZE, 0);
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Overview
//!
//! - `av`: access units, codec identifiers and the [`av::FrameSink`] trait
//! - `codec`: per-codec payload framing (access unit delimiters, Opus headers)
//! - `config`: muxer policy with environment overrides
//! - `format`: the transport stream writer, parser and output sinks
//! - `error`: error types and the crate `Result` alias
//! - `utils`: MPEG-2 CRC32

/// Access units and codec identifiers
pub mod av;

/// Codec specific payload framing
pub mod codec;

/// Multiplexer configuration
pub mod config;

/// Error types and utilities
pub mod error;

/// Transport stream format and output sinks
pub mod format;

/// Common utilities and helper functions
pub mod utils;

pub use config::MuxerConfig;
pub use error::{MuxError, Result, SinkError};

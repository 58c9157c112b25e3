/// Packet sinks the muxer writes into
pub mod sink;

/// MPEG transport stream writer and parser
pub mod ts;

pub use self::sink::{MemorySink, PacketSink, WriterSink};
pub use self::ts::{MuxerState, TsMuxer, TsPacket};

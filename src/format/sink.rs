//! Output side of the muxer.
//!
//! A [`PacketSink`] receives finished TS packets in emission order. The muxer
//! never retries a failed write; the error goes straight back to whoever
//! called `encode`.

use super::ts::{TsPacket, TS_PACKET_SIZE};
use crate::error::SinkError;
use parking_lot::Mutex;
use std::io::Write;
use std::sync::Arc;
use tokio::io::{AsyncWrite, AsyncWriteExt, BufWriter};
use tokio::sync::mpsc;

/// Consumer of finished transport stream packets.
pub trait PacketSink {
    /// Accepts one packet. Packets arrive in the exact order they are to be
    /// transmitted.
    fn write(&mut self, packet: &TsPacket) -> Result<(), SinkError>;

    /// Pushes out anything buffered. Called once when the muxer stops.
    fn flush(&mut self) -> Result<(), SinkError> {
        Ok(())
    }
}

impl<S: PacketSink + ?Sized> PacketSink for Box<S> {
    fn write(&mut self, packet: &TsPacket) -> Result<(), SinkError> {
        (**self).write(packet)
    }

    fn flush(&mut self) -> Result<(), SinkError> {
        (**self).flush()
    }
}

/// Collects packets in memory. Clones share the same storage, so one handle
/// can be given to the muxer while another inspects the output.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    packets: Arc<Mutex<Vec<TsPacket>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything written so far.
    pub fn packets(&self) -> Vec<TsPacket> {
        self.packets.lock().clone()
    }

    /// Removes and returns everything written so far.
    pub fn take(&self) -> Vec<TsPacket> {
        std::mem::take(&mut *self.packets.lock())
    }

    pub fn len(&self) -> usize {
        self.packets.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.packets.lock().is_empty()
    }

    /// All packets concatenated into one byte stream.
    pub fn to_bytes(&self) -> Vec<u8> {
        let packets = self.packets.lock();
        let mut out = Vec::with_capacity(packets.len() * TS_PACKET_SIZE);
        for packet in packets.iter() {
            out.extend_from_slice(packet.as_bytes());
        }
        out
    }
}

impl PacketSink for MemorySink {
    fn write(&mut self, packet: &TsPacket) -> Result<(), SinkError> {
        self.packets.lock().push(packet.clone());
        Ok(())
    }
}

/// Writes packets to any blocking writer (file, pipe, socket).
#[derive(Debug)]
pub struct WriterSink<W: Write> {
    writer: W,
}

impl<W: Write> WriterSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn get_ref(&self) -> &W {
        &self.writer
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> PacketSink for WriterSink<W> {
    fn write(&mut self, packet: &TsPacket) -> Result<(), SinkError> {
        self.writer.write_all(packet.as_bytes())?;
        Ok(())
    }

    fn flush(&mut self) -> Result<(), SinkError> {
        self.writer.flush()?;
        Ok(())
    }
}

/// Hands packets to an async consumer through a bounded tokio channel.
///
/// `write` blocks the calling encoder thread while the channel is full, which
/// is the muxer's backpressure point. It must therefore be used from plain
/// threads (or `spawn_blocking`), never from inside an async task.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::Sender<TsPacket>,
}

/// Creates a channel sink and the receiver feeding [`drain_to_writer`].
pub fn channel(capacity: usize) -> (ChannelSink, mpsc::Receiver<TsPacket>) {
    let (tx, rx) = mpsc::channel(capacity);
    (ChannelSink { tx }, rx)
}

impl PacketSink for ChannelSink {
    fn write(&mut self, packet: &TsPacket) -> Result<(), SinkError> {
        self.tx
            .blocking_send(packet.clone())
            .map_err(|_| SinkError::Closed)
    }
}

/// Forwards every packet from `rx` into `writer` until all senders are gone.
/// Returns the number of packets written.
pub async fn drain_to_writer<W>(mut rx: mpsc::Receiver<TsPacket>, writer: W) -> Result<u64, SinkError>
where
    W: AsyncWrite + Unpin,
{
    let mut writer = BufWriter::new(writer);
    let mut count = 0u64;
    while let Some(packet) = rx.recv().await {
        writer.write_all(packet.as_bytes()).await?;
        count += 1;
    }
    writer.flush().await?;
    log::debug!("Drained {} TS packets to writer", count);
    Ok(count)
}

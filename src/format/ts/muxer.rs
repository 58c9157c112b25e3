use super::packet::TsPacket;
use super::packetizer::{
    packetize_pes, packetize_section, pes_packet_count, ContinuityCounters, PesStart,
};
use super::pes::PESPacket;
use super::psi::{pat_section, pmt_section, sdt_section};
use super::registry::{ElementaryStream, Registry, ServiceHandle, ServiceInfo};
use super::types::*;
use crate::av::{AccessUnit, CodecType, FrameSink};
use crate::codec;
use crate::config::MuxerConfig;
use crate::error::{MuxError, Result};
use crate::format::sink::PacketSink;
use bytes::Bytes;
use log::{debug, info, trace, warn};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::Duration;

// Distances above half the 33-bit range are treated as the clock going backwards.
const HALF_CLOCK_RANGE: u64 = 1 << 32;

/// Lifecycle of a [`TsMuxer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MuxerState {
    /// No service registered yet.
    Unconfigured,
    /// Services and streams may be added.
    Configured,
    /// Frames are being encoded; the layout is frozen.
    Streaming,
    /// Torn down; a new `add_service` starts another session.
    Stopped,
}

/// Per-service scheduling state.
#[derive(Debug, Default)]
struct ServiceClock {
    packets_since_psi: u64,
    last_psi: Option<u64>,
    last_pcr: Option<u64>,
}

fn interval_elapsed(last: Option<u64>, now: u64, interval: u64) -> bool {
    let Some(last) = last else {
        return true;
    };
    let forward = ticks_between(last, now);
    if forward < HALF_CLOCK_RANGE {
        forward >= interval
    } else {
        // Small backwards steps come from audio/video interleaving; a large
        // one is a timeline jump and restarts the schedule.
        ticks_between(now, last) >= interval
    }
}

fn duration_to_ticks(interval: Duration) -> u64 {
    (interval.as_nanos() * PTS_HZ as u128 / 1_000_000_000) as u64
}

fn emit_sections(
    sections: &[(u16, Bytes)],
    counters: &mut ContinuityCounters,
    packets: &mut Vec<TsPacket>,
) {
    for (pid, section) in sections {
        packets.extend(packetize_section(*pid, section, counters));
    }
}

struct Inner {
    state: MuxerState,
    registry: Registry,
    counters: ContinuityCounters,
    clocks: HashMap<u16, ServiceClock>,
    sink: Box<dyn PacketSink + Send>,
}

/// MPEG-TS multiplexer.
///
/// All state sits behind one mutex: every `encode` call builds and writes its
/// packets while holding it, so the packets of one call reach the sink as a
/// contiguous run even when audio and video encoders call in concurrently.
pub struct TsMuxer {
    config: MuxerConfig,
    psi_interval_ticks: Option<u64>,
    pcr_interval_ticks: u64,
    pcr_lead_27mhz: u64,
    inner: Mutex<Inner>,
}

impl TsMuxer {
    /// Creates a muxer with the default configuration.
    pub fn new<S>(sink: S) -> Self
    where
        S: PacketSink + Send + 'static,
    {
        Self::build(MuxerConfig::default(), Box::new(sink))
    }

    /// Creates a muxer with a custom configuration, which is validated first.
    pub fn with_config<S>(config: MuxerConfig, sink: S) -> Result<Self>
    where
        S: PacketSink + Send + 'static,
    {
        config.validate()?;
        Ok(Self::build(config, Box::new(sink)))
    }

    fn build(config: MuxerConfig, sink: Box<dyn PacketSink + Send>) -> Self {
        let registry = Registry::new(config.pid_base, config.pmt_pid_base, config.emit_sdt);
        Self {
            psi_interval_ticks: config.psi_interval.map(duration_to_ticks),
            pcr_interval_ticks: duration_to_ticks(config.pcr_interval),
            pcr_lead_27mhz: pts_to_pcr(duration_to_ticks(config.pcr_lead)),
            config,
            inner: Mutex::new(Inner {
                state: MuxerState::Unconfigured,
                registry,
                counters: ContinuityCounters::new(),
                clocks: HashMap::new(),
                sink,
            }),
        }
    }

    pub fn config(&self) -> &MuxerConfig {
        &self.config
    }

    pub fn state(&self) -> MuxerState {
        self.inner.lock().state
    }

    /// Registers a service. Allowed until streaming starts; after `stop` it
    /// begins a fresh session.
    pub fn add_service(&self, info: ServiceInfo) -> Result<ServiceHandle> {
        let mut inner = self.inner.lock();
        match inner.state {
            MuxerState::Unconfigured | MuxerState::Configured | MuxerState::Stopped => {}
            MuxerState::Streaming => {
                return Err(MuxError::Configuration(
                    "cannot add a service while streaming".into(),
                ))
            }
        }

        let handle = inner.registry.add_service(info)?;
        inner.clocks.insert(handle.id(), ServiceClock::default());
        inner.state = MuxerState::Configured;
        Ok(handle)
    }

    /// Registers elementary streams for `service`, one per codec, returned in
    /// the same order with their assigned PIDs.
    pub fn add_streams(
        &self,
        service: &ServiceHandle,
        codecs: &[CodecType],
    ) -> Result<Vec<ElementaryStream>> {
        let mut inner = self.inner.lock();
        if inner.state != MuxerState::Configured {
            return Err(MuxError::Configuration(format!(
                "cannot add streams in {:?} state",
                inner.state
            )));
        }
        inner.registry.add_streams(service, codecs)
    }

    /// Streams registered for `codec`, across all services.
    pub fn get_streams(&self, codec: CodecType) -> Vec<ElementaryStream> {
        self.inner.lock().registry.get_streams(codec)
    }

    pub fn services(&self) -> Vec<ServiceInfo> {
        self.inner.lock().registry.service_infos()
    }

    /// Packetizes one access unit for the stream on `pid` and writes the
    /// resulting packets, preceded by PSI when due, to the sink.
    ///
    /// The first call moves the muxer from `Configured` to `Streaming`. When
    /// the PSI packet threshold is crossed inside the access unit, a PSI
    /// burst is placed between its packets. A sink failure is returned as
    /// is; packets already handed over stay written.
    pub fn encode(&self, frame: &AccessUnit, pid: u16) -> Result<()> {
        let mut guard = self.inner.lock();
        let inner = &mut *guard;

        let starting = match inner.state {
            MuxerState::Streaming => false,
            MuxerState::Configured if inner.registry.has_streams() => true,
            state => {
                return Err(MuxError::Configuration(format!(
                    "cannot encode in {:?} state",
                    state
                )))
            }
        };

        let stream = inner
            .registry
            .stream(pid)
            .cloned()
            .ok_or_else(|| MuxError::Encoding(format!("no stream registered on PID 0x{:04x}", pid)))?;
        validate_frame(frame)?;
        let service_id = stream.service_id;

        let pes = PESPacket::new(
            stream.stream_id,
            codec::frame_payload(
                stream.codec,
                &frame.data,
                self.config.insert_access_unit_delimiters,
            ),
            frame.pts,
            frame.dts,
        )?
        .to_bytes();

        let now = frame.decode_time();
        let pcr_pid = inner.registry.service(service_id).and_then(|s| s.pcr_pid);
        let last_pcr = inner.clocks.get(&service_id).and_then(|c| c.last_pcr);
        let carries_pcr = pcr_pid == Some(pid)
            && (frame.is_key || interval_elapsed(last_pcr, now, self.pcr_interval_ticks));
        let start = PesStart {
            pcr: carries_pcr.then(|| self.pcr_for(now)),
            random_access: frame.is_key,
        };

        let psi_first = starting || self.psi_due(inner.clocks.get(&service_id), now);
        let mut since_psi = match inner.clocks.get(&service_id) {
            Some(clock) if !psi_first => clock.packets_since_psi,
            _ => 0,
        };
        let threshold = self.config.psi_packet_interval.map(u64::from);
        let es_count = pes_packet_count(pes.len(), &start) as u64;
        let psi_inside = threshold.is_some_and(|t| since_psi + es_count > t);

        // Every section is built before any counter moves, so a table that
        // cannot be serialized leaves the stream untouched.
        let service_psi = if psi_first || psi_inside {
            self.psi_sections(&inner.registry, &[service_id])?
        } else {
            Vec::new()
        };
        let mut packets = Vec::new();

        if starting {
            let service_ids: Vec<u16> = inner
                .registry
                .services()
                .iter()
                .map(|s| s.info.service_id)
                .collect();
            let all_psi = self.psi_sections(&inner.registry, &service_ids)?;
            info!("Starting TS stream with {} service(s)", service_ids.len());
            emit_sections(&all_psi, &mut inner.counters, &mut packets);
            for id in service_ids {
                let clock = inner.clocks.entry(id).or_default();
                clock.packets_since_psi = 0;
                clock.last_psi = Some(now);
            }
            inner.state = MuxerState::Streaming;
        } else if psi_first {
            emit_sections(&service_psi, &mut inner.counters, &mut packets);
        }

        let mut psi_repeats = 0;
        for packet in packetize_pes(pid, &pes, start, &mut inner.counters) {
            if threshold.is_some_and(|t| since_psi >= t) {
                emit_sections(&service_psi, &mut inner.counters, &mut packets);
                since_psi = 0;
                psi_repeats += 1;
            }
            packets.push(packet);
            since_psi += 1;
        }

        let clock = inner.clocks.entry(service_id).or_default();
        clock.packets_since_psi = since_psi;
        if psi_first || psi_repeats > 0 {
            clock.last_psi = Some(now);
        }
        if carries_pcr {
            clock.last_pcr = Some(now);
        }
        trace!(
            "PID 0x{:04x}: {} byte access unit -> {} packets, {} PSI repeats inside",
            pid,
            frame.data.len(),
            es_count,
            psi_repeats
        );

        for packet in &packets {
            if let Err(e) = inner.sink.write(packet) {
                warn!("Sink rejected TS packet on PID 0x{:04x}: {}", packet.pid(), e);
                return Err(e.into());
            }
        }
        Ok(())
    }

    /// PCR for an access unit decoded at `decode_time`, held back by the
    /// configured lead and saturating at zero.
    fn pcr_for(&self, decode_time: u64) -> u64 {
        pts_to_pcr(decode_time).saturating_sub(self.pcr_lead_27mhz)
    }

    fn psi_due(&self, clock: Option<&ServiceClock>, now: u64) -> bool {
        let Some(clock) = clock else {
            return true;
        };
        if let Some(threshold) = self.config.psi_packet_interval {
            if clock.packets_since_psi >= threshold as u64 {
                return true;
            }
        }
        match self.psi_interval_ticks {
            Some(interval) => interval_elapsed(clock.last_psi, now, interval),
            None => clock.last_psi.is_none(),
        }
    }

    /// PAT, SDT (when enabled) and the PMTs of `service_ids`, serialized and
    /// paired with the PID each travels on.
    fn psi_sections(&self, registry: &Registry, service_ids: &[u16]) -> Result<Vec<(u16, Bytes)>> {
        let version = registry.version();
        let mut sections = vec![(
            PID_PAT,
            pat_section(&registry.pat(), self.config.transport_stream_id, version)?,
        )];

        if self.config.emit_sdt {
            let sdt = registry.sdt(self.config.original_network_id);
            sections.push((
                PID_SDT,
                sdt_section(&sdt, self.config.transport_stream_id, version)?,
            ));
        }

        for &id in service_ids {
            let (Some(service), Some(pmt)) = (registry.service(id), registry.pmt(id)) else {
                continue;
            };
            sections.push((
                service.pmt_pid,
                pmt_section(&pmt, service.info.program_number, version)?,
            ));
        }

        trace!("PSI for services {:?} (version {})", service_ids, version);
        Ok(sections)
    }

    /// Stops the session: releases every PID and counter and flushes the sink.
    ///
    /// Idempotent; only the first call after configuration has side effects.
    /// An `encode` running concurrently completes first, later ones fail.
    pub fn stop(&self) -> Result<()> {
        let mut inner = self.inner.lock();
        match inner.state {
            MuxerState::Unconfigured | MuxerState::Stopped => {
                debug!("stop() on a muxer in {:?} state, nothing to do", inner.state);
                return Ok(());
            }
            MuxerState::Configured | MuxerState::Streaming => {}
        }

        inner.state = MuxerState::Stopped;
        inner.registry.reset();
        inner.counters.clear();
        inner.clocks.clear();
        info!("TS muxer stopped");

        inner.sink.flush()?;
        Ok(())
    }
}

fn validate_frame(frame: &AccessUnit) -> Result<()> {
    if frame.data.is_empty() {
        return Err(MuxError::Encoding("empty access unit".into()));
    }
    if frame.pts > MAX_TIMESTAMP {
        return Err(MuxError::Encoding(format!(
            "PTS {} exceeds the 33-bit clock",
            frame.pts
        )));
    }
    if let Some(dts) = frame.dts.filter(|&dts| dts > MAX_TIMESTAMP) {
        return Err(MuxError::Encoding(format!(
            "DTS {} exceeds the 33-bit clock",
            dts
        )));
    }
    Ok(())
}

impl FrameSink for TsMuxer {
    fn write_frame(&self, frame: &AccessUnit, pid: u16) -> Result<()> {
        self.encode(frame, pid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SinkError;
    use crate::format::sink::MemorySink;
    use crate::format::ts::parser::TSPacketParser;
    use pretty_assertions::assert_eq;

    fn configured(config: MuxerConfig) -> (TsMuxer, MemorySink, Vec<ElementaryStream>) {
        let sink = MemorySink::new();
        let muxer = TsMuxer::with_config(config, sink.clone()).unwrap();
        let service = muxer
            .add_service(ServiceInfo::new(1, "vdk", "camera"))
            .unwrap();
        let streams = muxer
            .add_streams(&service, &[CodecType::H264, CodecType::AAC])
            .unwrap();
        (muxer, sink, streams)
    }

    fn pids(packets: &[TsPacket]) -> Vec<u16> {
        packets.iter().map(TsPacket::pid).collect()
    }

    #[test]
    fn test_state_machine() {
        let muxer = TsMuxer::new(MemorySink::new());
        assert_eq!(muxer.state(), MuxerState::Unconfigured);
        assert!(muxer.encode(&AccessUnit::new(vec![1], 0), 0x100).is_err());
        muxer.stop().unwrap();
        assert_eq!(muxer.state(), MuxerState::Unconfigured);

        let service = muxer.add_service(ServiceInfo::new(1, "p", "s")).unwrap();
        assert_eq!(muxer.state(), MuxerState::Configured);
        let streams = muxer.add_streams(&service, &[CodecType::AAC]).unwrap();

        muxer
            .encode(&AccessUnit::new(vec![1, 2, 3], 0), streams[0].pid)
            .unwrap();
        assert_eq!(muxer.state(), MuxerState::Streaming);
        assert!(muxer.add_streams(&service, &[CodecType::H264]).is_err());
        assert!(muxer.add_service(ServiceInfo::new(2, "p", "s")).is_err());

        muxer.stop().unwrap();
        muxer.stop().unwrap();
        assert_eq!(muxer.state(), MuxerState::Stopped);
        assert!(muxer.encode(&AccessUnit::new(vec![1], 0), streams[0].pid).is_err());
        assert!(muxer.get_streams(CodecType::AAC).is_empty());

        let service = muxer.add_service(ServiceInfo::new(1, "p", "s")).unwrap();
        assert_eq!(muxer.state(), MuxerState::Configured);
        let again = muxer.add_streams(&service, &[CodecType::AAC]).unwrap();
        assert_eq!(again[0].pid, streams[0].pid);
    }

    #[test]
    fn test_encode_without_streams() {
        let muxer = TsMuxer::new(MemorySink::new());
        muxer.add_service(ServiceInfo::new(1, "p", "s")).unwrap();
        let err = muxer.encode(&AccessUnit::new(vec![1], 0), 0x100).unwrap_err();
        assert!(matches!(err, MuxError::Configuration(_)));
        assert_eq!(muxer.state(), MuxerState::Configured);
    }

    #[test]
    fn test_encoding_errors() {
        let (muxer, sink, streams) = configured(MuxerConfig::default());
        let audio = streams[1].pid;

        let err = muxer.encode(&AccessUnit::new(vec![1], 0), 0x555).unwrap_err();
        assert!(matches!(err, MuxError::Encoding(_)));
        let err = muxer.encode(&AccessUnit::new(Vec::new(), 0), audio).unwrap_err();
        assert!(matches!(err, MuxError::Encoding(_)));
        let err = muxer
            .encode(&AccessUnit::new(vec![1], MAX_TIMESTAMP + 1), audio)
            .unwrap_err();
        assert!(matches!(err, MuxError::Encoding(_)));
        let err = muxer
            .encode(&AccessUnit::new(vec![1], 0).with_dts(1 << 40), audio)
            .unwrap_err();
        assert!(matches!(err, MuxError::Encoding(_)));

        assert!(sink.is_empty());
        assert_eq!(muxer.state(), MuxerState::Configured);

        muxer
            .encode(&AccessUnit::new(vec![1], MAX_TIMESTAMP), audio)
            .unwrap();
    }

    #[test]
    fn test_first_encode_emits_psi() {
        let (muxer, sink, streams) = configured(MuxerConfig::default());
        let video = streams[0].pid;
        muxer
            .encode(
                &AccessUnit::new(vec![0, 0, 0, 1, 0x65, 0x88], 0).with_key_flag(true),
                video,
            )
            .unwrap();

        let packets = sink.packets();
        assert_eq!(pids(&packets), vec![PID_PAT, PID_SDT, 0x1000, video]);
        assert!(packets[3].payload_unit_start());
        // adaptation field carries PCR and random access
        assert_eq!(packets[3].as_bytes()[5] & 0x50, 0x50);
    }

    #[test]
    fn test_psi_repeats_on_stream_time() {
        let (muxer, sink, streams) = configured(MuxerConfig::default().with_sdt(false));
        let audio = streams[1].pid;

        for i in 0..10u64 {
            // 21.3 ms AAC frames
            muxer
                .encode(&AccessUnit::new(vec![0xff; 100], i * 1920), audio)
                .unwrap();
        }

        let psi_times: Vec<usize> = sink
            .packets()
            .iter()
            .enumerate()
            .filter(|(_, p)| p.pid() == PID_PAT)
            .map(|(i, _)| i)
            .collect();
        // frames at 0 ms and 106.7 ms (> 100 ms later) get a PSI burst
        assert_eq!(psi_times.len(), 2);
        assert_eq!(sink.len(), 10 + 2 * 2);
    }

    #[test]
    fn test_psi_repeats_on_packet_count() {
        let config = MuxerConfig::default()
            .with_sdt(false)
            .with_psi_interval(None)
            .with_psi_packet_interval(Some(4));
        let (muxer, sink, streams) = configured(config);
        let audio = streams[1].pid;

        for i in 0..8u64 {
            muxer
                .encode(&AccessUnit::new(vec![0xff; 100], i), audio)
                .unwrap();
        }
        let layout = pids(&sink.packets());
        let pat_count = layout.iter().filter(|&&pid| pid == PID_PAT).count();
        assert_eq!(pat_count, 2);
        assert_eq!(&layout[6..8], &[PID_PAT, 0x1000]);
    }

    #[test]
    fn test_psi_interleaves_inside_large_frames() {
        let config = MuxerConfig::default()
            .with_sdt(false)
            .with_psi_interval(None)
            .with_psi_packet_interval(Some(4));
        let (muxer, sink, streams) = configured(config);
        let video = streams[0].pid;

        muxer
            .encode(&AccessUnit::new(vec![1; 4000], 0).with_key_flag(true), video)
            .unwrap();
        muxer
            .encode(&AccessUnit::new(vec![1; 4000], 3000), video)
            .unwrap();

        let layout = pids(&sink.packets());
        let mut run = 0;
        let mut longest = 0;
        for (i, &pid) in layout.iter().enumerate() {
            if pid == PID_PAT {
                assert_eq!(layout[i + 1], 0x1000);
                run = 0;
            } else if pid == video {
                run += 1;
                longest = longest.max(run);
            }
        }
        assert_eq!(longest, 4);

        let es = layout.iter().filter(|&&pid| pid == video).count();
        let pat_count = layout.iter().filter(|&&pid| pid == PID_PAT).count();
        assert!(es > 40);
        assert_eq!(pat_count, es.div_ceil(4));
    }

    #[test]
    fn test_sdt_overflow_keeps_encoding() {
        let sink = MemorySink::new();
        let muxer = TsMuxer::new(sink.clone());
        let long = "x".repeat(119);
        for id in 1..=4u16 {
            muxer
                .add_service(ServiceInfo::new(id, long.as_str(), long.as_str()))
                .unwrap();
        }
        let err = muxer
            .add_service(ServiceInfo::new(5, long.as_str(), long.as_str()))
            .unwrap_err();
        assert!(matches!(err, MuxError::Configuration(_)));

        let service = muxer.add_service(ServiceInfo::new(5, "p", "s")).unwrap();
        let audio = muxer.add_streams(&service, &[CodecType::AAC]).unwrap()[0].pid;
        for i in 0..3u64 {
            muxer
                .encode(&AccessUnit::new(vec![1; 10], i * 1920), audio)
                .unwrap();
        }
        assert_eq!(muxer.state(), MuxerState::Streaming);

        let layout = pids(&sink.packets());
        assert_eq!(layout[0], PID_PAT);
        assert!(layout.contains(&PID_SDT));
        assert_eq!(layout.iter().filter(|&&pid| pid == audio).count(), 3);
    }

    #[test]
    fn test_pcr_lead() {
        let config = MuxerConfig::default()
            .with_sdt(false)
            .with_pcr_lead(Duration::from_millis(100));
        let (muxer, sink, streams) = configured(config);
        let video = streams[0].pid;

        muxer
            .encode(&AccessUnit::new(vec![1; 50], 0).with_key_flag(true), video)
            .unwrap();
        muxer
            .encode(&AccessUnit::new(vec![1; 50], 180_000).with_key_flag(true), video)
            .unwrap();

        let parser = TSPacketParser::new();
        let pcrs: Vec<u64> = sink
            .packets()
            .iter()
            .filter(|p| p.pid() == video)
            .filter_map(|p| parser.parse_adaptation_field(p.as_bytes()).unwrap())
            .filter_map(|field| field.pcr)
            .collect();
        // 100 ms is 9000 ticks at 90 kHz
        assert_eq!(pcrs, vec![0, (180_000 - 9_000) * 300]);
    }

    #[test]
    fn test_pcr_only_on_pcr_pid() {
        let (muxer, sink, streams) = configured(MuxerConfig::default().with_sdt(false));
        let (video, audio) = (streams[0].pid, streams[1].pid);

        muxer
            .encode(&AccessUnit::new(vec![1; 50], 0).with_key_flag(true), audio)
            .unwrap();
        muxer
            .encode(&AccessUnit::new(vec![1; 50], 0).with_key_flag(true), video)
            .unwrap();

        let packets = sink.packets();
        let audio_packet = packets.iter().find(|p| p.pid() == audio).unwrap();
        let video_packet = packets.iter().find(|p| p.pid() == video).unwrap();
        assert_eq!(audio_packet.as_bytes()[5] & 0x50, 0x40);
        assert_eq!(video_packet.as_bytes()[5] & 0x50, 0x50);
    }

    #[test]
    fn test_periodic_pcr_without_keyframes() {
        let (muxer, sink, streams) = configured(MuxerConfig::default().with_sdt(false));
        let video = streams[0].pid;

        for i in 0..4u64 {
            // 33 ms frames, 40 ms PCR interval
            muxer
                .encode(&AccessUnit::new(vec![1; 50], i * 3000), video)
                .unwrap();
        }
        let with_pcr = sink
            .packets()
            .iter()
            .filter(|p| p.pid() == video && p.has_adaptation_field() && p.as_bytes()[5] & 0x10 != 0)
            .count();
        // 0 ms (first), 66 ms
        assert_eq!(with_pcr, 2);
    }

    struct FailingSink {
        accepted: usize,
        limit: usize,
    }

    impl PacketSink for FailingSink {
        fn write(&mut self, _packet: &TsPacket) -> std::result::Result<(), SinkError> {
            if self.accepted == self.limit {
                return Err(SinkError::Closed);
            }
            self.accepted += 1;
            Ok(())
        }
    }

    #[test]
    fn test_sink_error_surfaces() {
        let muxer = TsMuxer::new(FailingSink {
            accepted: 0,
            limit: 2,
        });
        let service = muxer.add_service(ServiceInfo::new(1, "p", "s")).unwrap();
        let streams = muxer.add_streams(&service, &[CodecType::AAC]).unwrap();

        let err = muxer
            .encode(&AccessUnit::new(vec![1; 10], 0), streams[0].pid)
            .unwrap_err();
        assert!(matches!(err, MuxError::Sink(SinkError::Closed)));
        assert_eq!(muxer.state(), MuxerState::Streaming);
    }
}

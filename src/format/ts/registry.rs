//! Service and elementary stream bookkeeping: PID allocation, PCR PID
//! selection and the PAT/PMT/SDT contents derived from them.

use super::pes::stream_id_for;
use super::types::*;
use crate::av::CodecType;
use crate::error::{MuxError, Result};
use log::debug;
use std::collections::{BTreeSet, HashMap};

/// DVB `service_type` for digital television.
pub const SERVICE_TYPE_DIGITAL_TV: u8 = 0x01;

/// Description of one program carried in the multiplex.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceInfo {
    pub service_id: u16,
    /// Program number announced in the PAT; defaults to the service id.
    pub program_number: u16,
    pub service_type: u8,
    pub provider_name: String,
    pub service_name: String,
}

impl ServiceInfo {
    pub fn new(
        service_id: u16,
        provider_name: impl Into<String>,
        service_name: impl Into<String>,
    ) -> Self {
        Self {
            service_id,
            program_number: service_id,
            service_type: SERVICE_TYPE_DIGITAL_TV,
            provider_name: provider_name.into(),
            service_name: service_name.into(),
        }
    }

    pub fn with_program_number(mut self, program_number: u16) -> Self {
        self.program_number = program_number;
        self
    }

    pub fn with_service_type(mut self, service_type: u8) -> Self {
        self.service_type = service_type;
        self
    }
}

/// Handle returned by service registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ServiceHandle {
    id: u16,
    pmt_pid: u16,
}

impl ServiceHandle {
    pub fn id(&self) -> u16 {
        self.id
    }

    /// PID carrying this service's program map table.
    pub fn pmt_pid(&self) -> u16 {
        self.pmt_pid
    }
}

/// An audio or video track registered in a service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementaryStream {
    pub pid: u16,
    pub codec: CodecType,
    pub stream_type: u8,
    /// PES `stream_id` used for this track.
    pub stream_id: u8,
    pub service_id: u16,
}

#[derive(Debug, Clone)]
pub(crate) struct Service {
    pub info: ServiceInfo,
    pub pmt_pid: u16,
    pub pcr_pid: Option<u16>,
    pub streams: Vec<u16>,
}

/// Hands out unique PIDs inside `0x0010..=0x1ffe`.
#[derive(Debug, Clone, Default)]
pub struct PidAllocator {
    used: BTreeSet<u16>,
}

impl PidAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks `pid` as taken without allocating it.
    pub fn reserve(&mut self, pid: u16) {
        self.used.insert(pid);
    }

    pub fn is_used(&self, pid: u16) -> bool {
        self.used.contains(&pid)
    }

    /// Takes the first free PID at or above `base`, wrapping back to the
    /// bottom of the assignable range. `None` when the space is exhausted.
    pub fn allocate(&mut self, base: u16) -> Option<u16> {
        let base = base.clamp(PID_MIN_ASSIGNABLE, PID_MAX_ASSIGNABLE);
        let pid = (base..=PID_MAX_ASSIGNABLE)
            .chain(PID_MIN_ASSIGNABLE..base)
            .find(|pid| !self.used.contains(pid))?;
        self.used.insert(pid);
        Some(pid)
    }

    pub fn release(&mut self, pid: u16) {
        self.used.remove(&pid);
    }
}

/// Session-wide registry of services and their elementary streams.
#[derive(Debug)]
pub struct Registry {
    pid_base: u16,
    pmt_pid_base: u16,
    carries_sdt: bool,
    allocator: PidAllocator,
    services: Vec<Service>,
    streams: Vec<ElementaryStream>,
    by_pid: HashMap<u16, usize>,
    version: u8,
}

impl Registry {
    pub fn new(pid_base: u16, pmt_pid_base: u16, carries_sdt: bool) -> Self {
        let mut registry = Self {
            pid_base,
            pmt_pid_base,
            carries_sdt,
            allocator: PidAllocator::new(),
            services: Vec::new(),
            streams: Vec::new(),
            by_pid: HashMap::new(),
            version: 0,
        };
        registry.reserve_psi_pids();
        registry
    }

    fn reserve_psi_pids(&mut self) {
        if self.carries_sdt {
            self.allocator.reserve(PID_SDT);
        }
    }

    /// Current PSI `version_number` (5 bits).
    pub fn version(&self) -> u8 {
        self.version
    }

    fn bump_version(&mut self) {
        self.version = (self.version + 1) & 0x1f;
    }

    pub fn add_service(&mut self, info: ServiceInfo) -> Result<ServiceHandle> {
        if self.services.iter().any(|s| s.info.service_id == info.service_id) {
            return Err(MuxError::Configuration(format!(
                "service {} already registered",
                info.service_id
            )));
        }
        if info.program_number == 0 {
            return Err(MuxError::Configuration(
                "program number 0 is reserved for the network PID".into(),
            ));
        }
        if self
            .services
            .iter()
            .any(|s| s.info.program_number == info.program_number)
        {
            return Err(MuxError::Configuration(format!(
                "program number {} already in use",
                info.program_number
            )));
        }

        let pmt_pid = self
            .allocator
            .allocate(self.pmt_pid_base)
            .ok_or_else(|| MuxError::Configuration("no PID left for a PMT".into()))?;

        let handle = ServiceHandle {
            id: info.service_id,
            pmt_pid,
        };
        debug!(
            "Registered service {} ({:?}) with PMT PID 0x{:04x}",
            info.service_id, info.service_name, pmt_pid
        );
        self.services.push(Service {
            info,
            pmt_pid,
            pcr_pid: None,
            streams: Vec::new(),
        });

        if self.pat().len() + 9 > MAX_SECTION_LENGTH {
            self.remove_last_service();
            return Err(MuxError::Configuration("too many services for one PAT".into()));
        }
        // original_network_id does not change the size
        if self.carries_sdt && self.sdt(0).len() + 9 > MAX_SECTION_LENGTH {
            self.remove_last_service();
            return Err(MuxError::Configuration(
                "service names overflow the SDT section".into(),
            ));
        }

        self.bump_version();
        Ok(handle)
    }

    fn remove_last_service(&mut self) {
        if let Some(service) = self.services.pop() {
            self.allocator.release(service.pmt_pid);
        }
    }

    pub fn add_streams(
        &mut self,
        service: &ServiceHandle,
        codecs: &[CodecType],
    ) -> Result<Vec<ElementaryStream>> {
        let index = self
            .services
            .iter()
            .position(|s| s.info.service_id == service.id)
            .ok_or_else(|| MuxError::Configuration(format!("unknown service {}", service.id)))?;

        let mut added: Vec<ElementaryStream> = Vec::with_capacity(codecs.len());
        for &codec in codecs {
            let Some(pid) = self.allocator.allocate(self.pid_base) else {
                for stream in &added {
                    self.allocator.release(stream.pid);
                }
                return Err(MuxError::Configuration("PID space exhausted".into()));
            };

            let same_kind = self.services[index]
                .streams
                .iter()
                .filter_map(|pid| self.stream(*pid))
                .chain(added.iter())
                .filter(|s| s.codec.is_video() == codec.is_video())
                .count();

            added.push(ElementaryStream {
                pid,
                codec,
                stream_type: codec.stream_type(),
                stream_id: stream_id_for(codec, same_kind),
                service_id: service.id,
            });
        }

        let service_len = self.services[index].streams.len();
        let streams_len = self.streams.len();
        for stream in &added {
            self.by_pid.insert(stream.pid, self.streams.len());
            self.streams.push(stream.clone());
            self.services[index].streams.push(stream.pid);
        }

        let pmt_len = self.pmt(service.id).map_or(0, |pmt| pmt.len());
        if pmt_len + 9 > MAX_SECTION_LENGTH {
            self.services[index].streams.truncate(service_len);
            self.streams.truncate(streams_len);
            for stream in &added {
                self.by_pid.remove(&stream.pid);
                self.allocator.release(stream.pid);
            }
            return Err(MuxError::Configuration(format!(
                "too many streams for the PMT of service {}",
                service.id
            )));
        }

        for stream in &added {
            debug!(
                "Service {}: {} stream on PID 0x{:04x}",
                service.id, stream.codec, stream.pid
            );
        }
        self.update_pcr_pid(index);
        self.bump_version();

        Ok(added)
    }

    /// PCR travels on the first video stream, or the first stream of any kind.
    fn update_pcr_pid(&mut self, index: usize) {
        let pids = &self.services[index].streams;
        let pcr_pid = pids
            .iter()
            .copied()
            .find(|pid| self.stream(*pid).is_some_and(|s| s.codec.is_video()))
            .or_else(|| pids.first().copied());
        self.services[index].pcr_pid = pcr_pid;
    }

    pub fn get_streams(&self, codec: CodecType) -> Vec<ElementaryStream> {
        self.streams
            .iter()
            .filter(|s| s.codec == codec)
            .cloned()
            .collect()
    }

    pub fn stream(&self, pid: u16) -> Option<&ElementaryStream> {
        self.by_pid.get(&pid).map(|&i| &self.streams[i])
    }

    pub fn has_streams(&self) -> bool {
        !self.streams.is_empty()
    }

    pub(crate) fn service(&self, service_id: u16) -> Option<&Service> {
        self.services.iter().find(|s| s.info.service_id == service_id)
    }

    pub(crate) fn services(&self) -> &[Service] {
        &self.services
    }

    pub fn service_infos(&self) -> Vec<ServiceInfo> {
        self.services.iter().map(|s| s.info.clone()).collect()
    }

    /// Drops every service and stream, freeing their PIDs. The PSI version
    /// keeps counting so receivers notice the new layout.
    pub fn reset(&mut self) {
        self.services.clear();
        self.streams.clear();
        self.by_pid.clear();
        self.allocator = PidAllocator::new();
        self.reserve_psi_pids();
        self.bump_version();
    }

    pub fn pat(&self) -> PAT {
        PAT {
            entries: self
                .services
                .iter()
                .map(|s| PATEntry {
                    program_number: s.info.program_number,
                    program_map_pid: s.pmt_pid,
                })
                .collect(),
        }
    }

    pub fn pmt(&self, service_id: u16) -> Option<PMT> {
        let service = self.service(service_id)?;
        let elementary_stream_infos = service
            .streams
            .iter()
            .filter_map(|pid| self.stream(*pid))
            .map(|s| ElementaryStreamInfo {
                stream_type: s.stream_type,
                elementary_pid: s.pid,
                descriptors: match s.codec {
                    CodecType::OPUS => vec![Descriptor::registration(b"Opus")],
                    _ => Vec::new(),
                },
            })
            .collect();

        Some(PMT {
            pcr_pid: service.pcr_pid.unwrap_or(PID_NULL),
            program_descriptors: Vec::new(),
            elementary_stream_infos,
        })
    }

    pub fn sdt(&self, original_network_id: u16) -> SDT {
        SDT {
            original_network_id,
            entries: self
                .services
                .iter()
                .map(|s| SDTEntry {
                    service_id: s.info.service_id,
                    service_type: s.info.service_type,
                    provider_name: s.info.provider_name.clone(),
                    service_name: s.info.service_name.clone(),
                })
                .collect(),
        }
    }
}

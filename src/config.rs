use crate::error::{MuxError, Result};
use crate::format::ts::types::{PID_MAX_ASSIGNABLE, PID_MIN_ASSIGNABLE};
use std::env;
use std::time::Duration;

/// Default first PID handed to elementary streams.
pub const DEFAULT_PID_BASE: u16 = 0x100;
/// Default first PID handed to program map tables.
pub const DEFAULT_PMT_PID_BASE: u16 = 0x1000;
/// Default PSI re-transmission period in stream time.
pub const DEFAULT_PSI_INTERVAL: Duration = Duration::from_millis(100);
/// Default maximum distance between two PCR samples on a PCR PID.
pub const DEFAULT_PCR_INTERVAL: Duration = Duration::from_millis(40);

/// Multiplexer policy knobs.
///
/// Defaults follow common broadcast practice. [`MuxerConfig::from_env`] overlays
/// `TSMUX_*` environment variables on top of the defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MuxerConfig {
    /// `transport_stream_id` written into the PAT and SDT.
    pub transport_stream_id: u16,
    /// `original_network_id` written into the SDT.
    pub original_network_id: u16,
    /// First PID tried when allocating elementary stream PIDs.
    pub pid_base: u16,
    /// First PID tried when allocating PMT PIDs.
    pub pmt_pid_base: u16,
    /// Re-send PSI after this much stream time. `None` disables the time trigger.
    pub psi_interval: Option<Duration>,
    /// Re-send PSI after this many elementary stream packets of a service.
    pub psi_packet_interval: Option<u32>,
    /// Maximum stream time between two PCRs on a PCR PID.
    pub pcr_interval: Duration,
    /// How far the PCR runs behind the decode time of the access unit it
    /// travels with, giving receivers that much buffering room.
    pub pcr_lead: Duration,
    /// Emit a DVB Service Description Table alongside PAT/PMT.
    pub emit_sdt: bool,
    /// Prepend an access unit delimiter to H.264/H.265 access units lacking one.
    pub insert_access_unit_delimiters: bool,
}

impl Default for MuxerConfig {
    fn default() -> Self {
        Self {
            transport_stream_id: 1,
            original_network_id: 0xff01,
            pid_base: DEFAULT_PID_BASE,
            pmt_pid_base: DEFAULT_PMT_PID_BASE,
            psi_interval: Some(DEFAULT_PSI_INTERVAL),
            psi_packet_interval: None,
            pcr_interval: DEFAULT_PCR_INTERVAL,
            pcr_lead: Duration::ZERO,
            emit_sdt: true,
            insert_access_unit_delimiters: true,
        }
    }
}

impl MuxerConfig {
    /// Builds a configuration from the defaults overlaid with `TSMUX_*` variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(value) = lookup("TSMUX_PID_BASE") {
            config.pid_base = parse_pid(&value)?;
        }
        if let Some(value) = lookup("TSMUX_PMT_PID_BASE") {
            config.pmt_pid_base = parse_pid(&value)?;
        }
        if let Some(value) = lookup("TSMUX_TRANSPORT_STREAM_ID") {
            config.transport_stream_id = parse_u16(&value)?;
        }
        if let Some(value) = lookup("TSMUX_PSI_INTERVAL_MS") {
            let ms: u64 = value.trim().parse()?;
            config.psi_interval = (ms > 0).then(|| Duration::from_millis(ms));
        }
        if let Some(value) = lookup("TSMUX_PSI_PACKET_INTERVAL") {
            let packets: u32 = value.trim().parse()?;
            config.psi_packet_interval = (packets > 0).then_some(packets);
        }
        if let Some(value) = lookup("TSMUX_PCR_INTERVAL_MS") {
            config.pcr_interval = Duration::from_millis(value.trim().parse()?);
        }
        if let Some(value) = lookup("TSMUX_PCR_LEAD_MS") {
            config.pcr_lead = Duration::from_millis(value.trim().parse()?);
        }
        if let Some(value) = lookup("TSMUX_EMIT_SDT") {
            config.emit_sdt = parse_flag("TSMUX_EMIT_SDT", &value)?;
        }
        if let Some(value) = lookup("TSMUX_INSERT_AUD") {
            config.insert_access_unit_delimiters = parse_flag("TSMUX_INSERT_AUD", &value)?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn with_pid_base(mut self, pid: u16) -> Self {
        self.pid_base = pid;
        self
    }

    pub fn with_pmt_pid_base(mut self, pid: u16) -> Self {
        self.pmt_pid_base = pid;
        self
    }

    pub fn with_psi_interval(mut self, interval: Option<Duration>) -> Self {
        self.psi_interval = interval;
        self
    }

    pub fn with_psi_packet_interval(mut self, packets: Option<u32>) -> Self {
        self.psi_packet_interval = packets;
        self
    }

    pub fn with_pcr_interval(mut self, interval: Duration) -> Self {
        self.pcr_interval = interval;
        self
    }

    pub fn with_pcr_lead(mut self, lead: Duration) -> Self {
        self.pcr_lead = lead;
        self
    }

    pub fn with_sdt(mut self, enabled: bool) -> Self {
        self.emit_sdt = enabled;
        self
    }

    pub fn with_access_unit_delimiters(mut self, enabled: bool) -> Self {
        self.insert_access_unit_delimiters = enabled;
        self
    }

    /// Checks that the PID bases fall inside the assignable PID range.
    pub fn validate(&self) -> Result<()> {
        for (name, pid) in [("pid_base", self.pid_base), ("pmt_pid_base", self.pmt_pid_base)] {
            if !(PID_MIN_ASSIGNABLE..=PID_MAX_ASSIGNABLE).contains(&pid) {
                return Err(MuxError::Configuration(format!(
                    "{} 0x{:04x} outside 0x{:04x}..=0x{:04x}",
                    name, pid, PID_MIN_ASSIGNABLE, PID_MAX_ASSIGNABLE
                )));
            }
        }
        if self.psi_packet_interval == Some(0) {
            return Err(MuxError::Configuration(
                "psi_packet_interval must be positive".into(),
            ));
        }
        Ok(())
    }
}

fn parse_u16(value: &str) -> Result<u16> {
    let value = value.trim();
    match value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
        Some(hex) => Ok(u16::from_str_radix(hex, 16)?),
        None => Ok(value.parse()?),
    }
}

fn parse_pid(value: &str) -> Result<u16> {
    let pid = parse_u16(value)?;
    if pid > PID_MAX_ASSIGNABLE {
        return Err(MuxError::Configuration(format!("PID 0x{:04x} out of range", pid)));
    }
    Ok(pid)
}

fn parse_flag(name: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(MuxError::Configuration(format!(
            "{}: expected a boolean, got {:?}",
            name, other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = MuxerConfig::default();
        assert_eq!(config.pid_base, 0x100);
        assert_eq!(config.pmt_pid_base, 0x1000);
        assert_eq!(config.psi_interval, Some(Duration::from_millis(100)));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_overlay() {
        let config = MuxerConfig::from_lookup(lookup(&[
            ("TSMUX_PID_BASE", "0x200"),
            ("TSMUX_PMT_PID_BASE", "4200"),
            ("TSMUX_PSI_INTERVAL_MS", "0"),
            ("TSMUX_PSI_PACKET_INTERVAL", "50"),
            ("TSMUX_EMIT_SDT", "off"),
            ("TSMUX_PCR_LEAD_MS", "200"),
        ]))
        .unwrap();

        assert_eq!(config.pid_base, 0x200);
        assert_eq!(config.pmt_pid_base, 4200);
        assert_eq!(config.psi_interval, None);
        assert_eq!(config.psi_packet_interval, Some(50));
        assert!(!config.emit_sdt);
        assert_eq!(config.pcr_lead, Duration::from_millis(200));
        assert!(config.insert_access_unit_delimiters);
    }

    #[test]
    fn test_env_rejects_bad_values() {
        assert!(MuxerConfig::from_lookup(lookup(&[("TSMUX_PID_BASE", "0x1fff")])).is_err());
        assert!(MuxerConfig::from_lookup(lookup(&[("TSMUX_PID_BASE", "0x0001")])).is_err());
        assert!(MuxerConfig::from_lookup(lookup(&[("TSMUX_PCR_INTERVAL_MS", "soon")])).is_err());
        assert!(MuxerConfig::from_lookup(lookup(&[("TSMUX_INSERT_AUD", "maybe")])).is_err());
    }
}

use serde::{Deserialize, Serialize};

/// A candidate machine as supplied by the caller.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NodeDescriptor {
    pub hostname: String,
    pub ip_address: String,
    pub username: String,

    /// SSH port (default: 22)
    #[serde(default = "default_ssh_port")]
    pub port: u16,
}

fn default_ssh_port() -> u16 {
    22
}

impl NodeDescriptor {
    pub fn new(
        hostname: impl Into<String>,
        ip_address: impl Into<String>,
        username: impl Into<String>,
    ) -> Self {
        Self {
            hostname: hostname.into(),
            ip_address: ip_address.into(),
            username: username.into(),
            port: default_ssh_port(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum NodeRole {
    ControlPlane,
    GpuWorker,
    #[default]
    Worker,
}

impl NodeRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeRole::ControlPlane => "control_plane",
            NodeRole::GpuWorker => "gpu_worker",
            NodeRole::Worker => "worker",
        }
    }
}

impl std::fmt::Display for NodeRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How far discovery got for a node.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum DiscoveryStatus {
    #[default]
    Complete,
    /// Session was open but at least one probe fell back to defaults.
    Partial,
    /// No session could be opened (or the host task never finished).
    Unreachable,
}

impl std::fmt::Display for DiscoveryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            DiscoveryStatus::Complete => "complete",
            DiscoveryStatus::Partial => "partial",
            DiscoveryStatus::Unreachable => "unreachable",
        })
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CpuFacet {
    pub cores: u32,
    pub model: String,
    pub frequency_ghz: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct MemoryFacet {
    pub total_gb: f64,
    pub available_gb: f64,
}

impl MemoryFacet {
    /// Builds the facet, clamping `available` so it never exceeds `total`.
    pub fn new(total_gb: f64, available_gb: f64) -> Self {
        let total_gb = total_gb.max(0.0);
        Self {
            total_gb,
            available_gb: available_gb.clamp(0.0, total_gb),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StorageKind {
    Disk,
    Ssd,
    Nvme,
}

impl StorageKind {
    pub fn classify(name: &str, rotational: bool) -> Self {
        if name.starts_with("nvme") {
            StorageKind::Nvme
        } else if !rotational {
            StorageKind::Ssd
        } else {
            StorageKind::Disk
        }
    }

    pub fn is_fast(&self) -> bool {
        matches!(self, StorageKind::Ssd | StorageKind::Nvme)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StorageDevice {
    pub name: String,
    pub size_gb: f64,
    pub kind: StorageKind,
    #[serde(default)]
    pub mountpoint: Option<String>,
    pub rotational: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct StorageFacet {
    pub devices: Vec<StorageDevice>,
    pub total_gb: f64,
    /// Capacity of SSD/NVMe devices.
    pub fast_gb: f64,
}

impl StorageFacet {
    pub fn from_devices(devices: Vec<StorageDevice>) -> Self {
        let total_gb = devices.iter().map(|d| d.size_gb).sum();
        let fast_gb = devices
            .iter()
            .filter(|d| d.kind.is_fast())
            .map(|d| d.size_gb)
            .sum();
        Self {
            devices,
            total_gb,
            fast_gb,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum GpuClass {
    A100,
    H100,
    V100,
    Rtx4090,
    Rtx4080,
    M6000,
    L40,
    T4,
    L4,
    Rtx6000,
    Other,
}

impl GpuClass {
    /// Classifies a GPU by its marketing name. Order matters: "l40" must be
    /// tested before "l4".
    pub fn from_name(name: &str) -> Self {
        const TABLE: &[(&str, GpuClass)] = &[
            ("a100", GpuClass::A100),
            ("h100", GpuClass::H100),
            ("v100", GpuClass::V100),
            ("rtx 4090", GpuClass::Rtx4090),
            ("rtx 4080", GpuClass::Rtx4080),
            ("m6000", GpuClass::M6000),
            ("l40", GpuClass::L40),
            ("t4", GpuClass::T4),
            ("l4", GpuClass::L4),
            ("rtx 6000", GpuClass::Rtx6000),
        ];

        let lower = name.to_lowercase();
        TABLE
            .iter()
            .find(|(needle, _)| lower.contains(needle))
            .map(|(_, class)| *class)
            .unwrap_or(GpuClass::Other)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GpuDevice {
    pub index: u32,
    pub name: String,
    pub memory_gb: f64,
    pub class: GpuClass,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct GpuFacet {
    pub devices: Vec<GpuDevice>,
    pub count: u32,
    pub total_memory_gb: f64,
}

impl GpuFacet {
    pub fn from_devices(devices: Vec<GpuDevice>) -> Self {
        let count = devices.len() as u32;
        let total_memory_gb = devices.iter().map(|g| g.memory_gb).sum();
        Self {
            devices,
            count,
            total_memory_gb,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NetworkInterface {
    pub name: String,
    pub speed_gbps: f64,
    pub ip_addresses: Vec<String>,
    pub state: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct NetworkFacet {
    pub interfaces: Vec<NetworkInterface>,
    pub primary_interface: Option<String>,
    /// Link speed of the primary interface.
    pub speed_gbps: f64,
}

impl NetworkFacet {
    /// The first interface carrying at least one address becomes primary.
    pub fn from_interfaces(interfaces: Vec<NetworkInterface>) -> Self {
        let primary = interfaces.iter().find(|i| !i.ip_addresses.is_empty());
        let primary_interface = primary.map(|i| i.name.clone());
        let speed_gbps = primary.map(|i| i.speed_gbps).unwrap_or(0.0);
        Self {
            interfaces,
            primary_interface,
            speed_gbps,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct OsFacet {
    pub name: String,
    pub version: String,
    pub kernel: String,
}

/// Presence-only checks; versions are not validated.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RuntimeFacet {
    pub docker: bool,
    pub containerd: bool,
    pub kubectl: bool,
}

impl RuntimeFacet {
    pub fn container_engine_present(&self) -> bool {
        self.docker || self.containerd
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProbeWarning {
    pub probe: String,
    pub message: String,
}

/// Everything discovered about one host.
///
/// Created empty when discovery starts, filled by exactly one discovery task,
/// and treated as read-only afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NodeCapabilities {
    pub hostname: String,
    pub ip_address: String,
    pub username: String,
    pub ssh_key_path: String,

    #[serde(default)]
    pub cpu: CpuFacet,
    #[serde(default)]
    pub memory: MemoryFacet,
    #[serde(default)]
    pub storage: StorageFacet,
    #[serde(default)]
    pub gpu: GpuFacet,
    #[serde(default)]
    pub network: NetworkFacet,
    #[serde(default)]
    pub os: OsFacet,
    #[serde(default)]
    pub runtime: RuntimeFacet,

    #[serde(default)]
    pub recommended_role: NodeRole,
    #[serde(default)]
    pub priority_score: u32,

    #[serde(default)]
    pub discovery_status: DiscoveryStatus,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<ProbeWarning>,
}

impl NodeCapabilities {
    pub fn new(descriptor: &NodeDescriptor, ssh_key_path: impl Into<String>) -> Self {
        Self {
            hostname: descriptor.hostname.clone(),
            ip_address: descriptor.ip_address.clone(),
            username: descriptor.username.clone(),
            ssh_key_path: ssh_key_path.into(),
            cpu: CpuFacet::default(),
            memory: MemoryFacet::default(),
            storage: StorageFacet::default(),
            gpu: GpuFacet::default(),
            network: NetworkFacet::default(),
            os: OsFacet::default(),
            runtime: RuntimeFacet::default(),
            recommended_role: NodeRole::Worker,
            priority_score: 0,
            discovery_status: DiscoveryStatus::Complete,
            warnings: Vec::new(),
        }
    }

    pub fn has_gpu(&self) -> bool {
        self.gpu.count > 0
    }

    pub fn warn(&mut self, probe: &str, message: impl Into<String>) {
        self.warnings.push(ProbeWarning {
            probe: probe.to_string(),
            message: message.into(),
        });
    }
}

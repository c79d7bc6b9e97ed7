use fleet_common::{
    CpuFacet, DiscoveryStatus, GpuClass, GpuDevice, GpuFacet, MemoryFacet, NetworkFacet,
    NetworkInterface, NodeCapabilities, NodeDescriptor, OsFacet, ScoringPolicy, StorageDevice,
    StorageFacet, StorageKind,
};

/// Builds a scored node snapshot without going through discovery.
pub(crate) struct NodeBuilder {
    node: NodeCapabilities,
    devices: Vec<StorageDevice>,
}

pub(crate) fn node(hostname: &str, ip: &str) -> NodeBuilder {
    let mut node = NodeCapabilities::new(
        &NodeDescriptor::new(hostname, ip, "ubuntu"),
        "/home/ops/.ssh/id_ed25519",
    );
    node.os = OsFacet {
        name: "Ubuntu".into(),
        version: "22.04".into(),
        kernel: "5.15.0-105-generic".into(),
    };
    NodeBuilder {
        node,
        devices: Vec::new(),
    }
}

impl NodeBuilder {
    pub(crate) fn cores(mut self, cores: u32) -> Self {
        self.node.cpu = CpuFacet {
            cores,
            model: "AMD EPYC 7763".into(),
            frequency_ghz: 2.45,
        };
        self
    }

    pub(crate) fn memory(mut self, total_gb: f64) -> Self {
        self.node.memory = MemoryFacet::new(total_gb, total_gb * 0.9);
        self
    }

    pub(crate) fn nvme(mut self, size_gb: f64) -> Self {
        self.devices.push(StorageDevice {
            name: format!("nvme{}n1", self.devices.len()),
            size_gb,
            kind: StorageKind::Nvme,
            mountpoint: None,
            rotational: false,
        });
        self
    }

    pub(crate) fn hdd(mut self, size_gb: f64) -> Self {
        self.devices.push(StorageDevice {
            name: format!("sd{}", (b'a' + self.devices.len() as u8) as char),
            size_gb,
            kind: StorageKind::Disk,
            mountpoint: Some("/data".into()),
            rotational: true,
        });
        self
    }

    pub(crate) fn gpus(mut self, count: u32, memory_each_gb: f64) -> Self {
        self.node.gpu = GpuFacet::from_devices(
            (0..count)
                .map(|index| GpuDevice {
                    index,
                    name: "NVIDIA L40S".into(),
                    memory_gb: memory_each_gb,
                    class: GpuClass::L40,
                })
                .collect(),
        );
        self
    }

    pub(crate) fn network(mut self, speed_gbps: f64) -> Self {
        self.node.network = NetworkFacet::from_interfaces(vec![NetworkInterface {
            name: "ens5".into(),
            speed_gbps,
            ip_addresses: vec![self.node.ip_address.clone()],
            state: "UP".into(),
        }]);
        self
    }

    pub(crate) fn unreachable(mut self) -> Self {
        self.node.discovery_status = DiscoveryStatus::Unreachable;
        self
    }

    pub(crate) fn build(mut self) -> NodeCapabilities {
        self.node.storage = StorageFacet::from_devices(self.devices);
        ScoringPolicy::default().apply(&mut self.node);
        self.node
    }
}

/// One GPU box, one control-plane-grade box and one small worker.
pub(crate) fn mixed_fleet() -> Vec<NodeCapabilities> {
    vec![
        node("gpu-01", "10.0.0.11")
            .cores(64)
            .memory(512.0)
            .nvme(1800.0)
            .gpus(2, 48.0)
            .network(25.0)
            .build(),
        node("cp-01", "10.0.0.12")
            .cores(32)
            .memory(64.0)
            .nvme(480.0)
            .network(10.0)
            .build(),
        node("small-01", "10.0.0.13")
            .cores(4)
            .memory(8.0)
            .hdd(500.0)
            .network(1.0)
            .build(),
    ]
}

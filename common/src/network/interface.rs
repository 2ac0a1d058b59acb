//! Picks the interfaces that address conflict detection can run on.
//!
//! ARP probing needs a broadcast-capable link with a hardware address. An IPv4
//! address is *not* required: the whole point is to claim one.

use std::fmt;

use pnet::datalink::NetworkInterface;
use pnet::ipnetwork::IpNetwork;
use std::net::Ipv4Addr;

#[cfg(target_os = "linux")]
use linux_impl::{is_physical, is_wireless};
#[cfg(not(target_os = "linux"))]
use fallback_impl::{is_physical, is_wireless};

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ViabilityError {
    /// The interface is operationally down.
    IsDown,
    /// Loopback links never see other hosts.
    IsLoopback,
    /// The interface does not have a MAC address.
    NoMacAddress,
    /// The interface does not support broadcast (required for ARP).
    NotBroadcast,
    /// The interface is a point-to-point link (e.g., a VPN).
    IsPointToPoint,
}

impl fmt::Display for ViabilityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            ViabilityError::IsDown => "interface is down",
            ViabilityError::IsLoopback => "interface is a loopback",
            ViabilityError::NoMacAddress => "interface has no MAC address",
            ViabilityError::NotBroadcast => "interface does not support broadcast",
            ViabilityError::IsPointToPoint => "interface is point-to-point",
        };
        f.write_str(reason)
    }
}

/// Checks whether ARP probes can be sent and received on `interface`.
pub fn check_viability(interface: &NetworkInterface) -> Result<(), ViabilityError> {
    if !interface.is_up() {
        return Err(ViabilityError::IsDown);
    }
    if interface.is_loopback() {
        return Err(ViabilityError::IsLoopback);
    }
    if interface.mac.is_none_or(|mac| mac.is_zero()) {
        return Err(ViabilityError::NoMacAddress);
    }
    if !interface.is_broadcast() {
        return Err(ViabilityError::NotBroadcast);
    }
    if interface.is_point_to_point() {
        return Err(ViabilityError::IsPointToPoint);
    }
    Ok(())
}

/// All interfaces of this host that pass [`check_viability`], wired links first.
pub fn viable_interfaces() -> Vec<NetworkInterface> {
    let mut interfaces: Vec<NetworkInterface> = pnet::datalink::interfaces()
        .into_iter()
        .filter(|interface| check_viability(interface).is_ok())
        .collect();
    interfaces.sort_by_key(|interface| !is_wired(interface));
    interfaces
}

/// Looks an interface up by name, regardless of viability.
pub fn find_by_name(name: &str) -> Option<NetworkInterface> {
    pnet::datalink::interfaces()
        .into_iter()
        .find(|interface| interface.name == name)
}

/// The interface a claim runs on when the user did not name one.
pub fn select_default() -> Option<NetworkInterface> {
    select_best(viable_interfaces(), is_wired)
}

/// IPv4 addresses currently configured on `interface`.
pub fn ipv4_addrs(interface: &NetworkInterface) -> Vec<Ipv4Addr> {
    interface
        .ips
        .iter()
        .filter_map(|net| match net {
            IpNetwork::V4(v4) => Some(v4.ip()),
            IpNetwork::V6(_) => None,
        })
        .collect()
}

fn select_best(
    interfaces: Vec<NetworkInterface>,
    is_wired: impl Fn(&NetworkInterface) -> bool,
) -> Option<NetworkInterface> {
    interfaces
        .iter()
        .find(|&interface| is_wired(interface))
        .or(interfaces.first())
        .cloned()
}

fn is_wired(interface: &NetworkInterface) -> bool {
    is_physical(interface) && !is_wireless(interface)
}

#[cfg(target_os = "linux")]
mod linux_impl {
    use super::*;
    use std::path::Path;

    pub fn is_physical(interface: &NetworkInterface) -> bool {
        Path::new(&format!("/sys/class/net/{}/device", interface.name)).exists()
    }

    pub fn is_wireless(interface: &NetworkInterface) -> bool {
        Path::new(&format!("/sys/class/net/{}/wireless", interface.name)).exists()
    }
}

#[cfg(not(target_os = "linux"))]
mod fallback_impl {
    use super::*;

    // Without sysfs the name is the only hint we have.
    pub fn is_physical(interface: &NetworkInterface) -> bool {
        interface.name.starts_with("en") || interface.name.starts_with("eth")
    }

    pub fn is_wireless(interface: &NetworkInterface) -> bool {
        interface.name.starts_with("wl")
    }
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝

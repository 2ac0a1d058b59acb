use acd_common::network::{interface, mac};
use colored::*;
use pnet::datalink::{self, NetworkInterface};

use crate::terminal::{colors, print};

pub fn interfaces() {
    let all: Vec<NetworkInterface> = datalink::interfaces();
    let default_name: Option<String> = interface::select_default().map(|intf| intf.name);

    for (idx, intf) in all.iter().enumerate() {
        print::tree_head(idx, &intf.name);
        print::as_tree_one_level(details(intf, default_name.as_deref()));
    }
    print::fat_separator();
}

fn details(intf: &NetworkInterface, default_name: Option<&str>) -> Vec<(String, ColoredString)> {
    let mut details: Vec<(String, ColoredString)> = interface::ipv4_addrs(intf)
        .into_iter()
        .map(|addr| ("IPv4".to_string(), addr.to_string().color(colors::IPV4_ADDR)))
        .collect();

    if let Some(mac_addr) = intf.mac {
        details.push(("MAC".to_string(), mac_addr.to_string().color(colors::MAC_ADDR)));
        if let Some(vendor) = mac::get_vendor(mac_addr) {
            details.push(("Vendor".to_string(), vendor.normal()));
        }
    }

    let status: ColoredString = match interface::check_viability(intf) {
        Ok(()) if default_name == Some(intf.name.as_str()) => "viable (default)".color(colors::PRIMARY).bold(),
        Ok(()) => "viable".color(colors::PRIMARY),
        Err(reason) => reason.to_string().color(colors::FAILURE),
    };
    details.push(("Status".to_string(), status));
    details
}

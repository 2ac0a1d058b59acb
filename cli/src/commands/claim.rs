use std::net::Ipv4Addr;
use std::time::Duration;

use acd_common::config::AcdConfig;
use acd_common::network::{interface, mac};
use acd_core::network::datalink::{self, EthernetHandle};
use acd_core::{Acd, AcdEvent, DetectorId, InterfaceId};
use anyhow::{Context, bail};
use colored::*;
use is_root::is_root;
use pnet::datalink::NetworkInterface;
use pnet::util::MacAddr;
use tokio::sync::mpsc;
use tokio::time::{self, MissedTickBehavior};
use tracing::{info, warn};

use crate::commands::ClaimArgs;
use crate::terminal::{colors, print};

pub async fn claim(args: ClaimArgs) -> anyhow::Result<()> {
    if !is_root() {
        warn!("not running as root, opening a raw datalink channel will most likely fail");
    }

    let cfg = config_from(&args);
    let intf: NetworkInterface = pick_interface(args.interface.as_deref())?;
    let src_mac: MacAddr = intf.mac.context("interface has no MAC address")?;

    print_plan(&intf, src_mac, &args);

    let EthernetHandle { transmitter, mut rx } = datalink::start_capture(&intf)?;
    let mut acd = Acd::new(&cfg).context("invalid timing configuration")?;
    let iface: InterfaceId = acd.add_interface(intf.name.clone(), src_mac, transmitter);
    acd.set_recorder(|peer: MacAddr, frame: &[u8]| {
        warn!(bytes = frame.len(), "address held by {}", mac::describe(peer));
    });

    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<AcdEvent>();
    let id: DetectorId = acd.create_detector();
    acd.add(iface, id, move |event: AcdEvent| {
        let _ = event_tx.send(event);
    })?;
    acd.start(id, args.address)?;

    let mut retries = Retries::new(Duration::from_millis(args.retry_delay), args.max_attempts);
    let retry = time::sleep(Duration::ZERO);
    tokio::pin!(retry);
    let mut retry_pending = false;

    let mut ticker = time::interval(cfg.tick_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = ticker.tick() => acd.tick(),
            frame = rx.recv() => match frame {
                Some(frame) => acd.on_arp_frame(iface, &frame),
                None => bail!("capture on {} stopped", intf.name),
            },
            Some(event) = event_rx.recv() => match on_event(args.address, args.defend, &mut retries, event)? {
                Next::Continue => {}
                Next::Done => break,
                Next::RetryIn(delay) => {
                    retry.as_mut().reset(time::Instant::now() + delay);
                    retry_pending = true;
                }
            },
            _ = &mut retry, if retry_pending => {
                retry_pending = false;
                info!(address = %args.address, attempt = retries.attempts(), "acquiring again");
                acd.start(id, args.address)?;
            }
            _ = &mut shutdown => {
                print::print_status("Interrupted, releasing the address.");
                break;
            }
        }
    }

    acd.stop(id)?;
    print::fat_separator();
    Ok(())
}

enum Next {
    Continue,
    Done,
    RetryIn(Duration),
}

/// Delay and budget for acquiring the address again after losing it.
#[derive(Debug)]
struct Retries {
    delay: Duration,
    max_attempts: Option<u32>,
    attempts: u32,
}

impl Retries {
    fn new(delay: Duration, max_attempts: Option<u32>) -> Self {
        Self { delay, max_attempts, attempts: 0 }
    }

    fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Books one more attempt. `None` once the budget is spent.
    fn next_delay(&mut self) -> Option<Duration> {
        if self.max_attempts.is_some_and(|max| self.attempts >= max) {
            return None;
        }
        self.attempts += 1;
        Some(self.delay)
    }
}

/// Reacts to one detector event.
fn on_event(address: Ipv4Addr, defend: bool, retries: &mut Retries, event: AcdEvent) -> anyhow::Result<Next> {
    match event {
        AcdEvent::AddressUsable => {
            let addr: ColoredString = address.to_string().color(colors::IPV4_ADDR).bold();
            print::print_status(format!("{addr} is ours."));
            if !defend {
                return Ok(Next::Done);
            }
            print::print_status("Defending until Ctrl-C.");
            Ok(Next::Continue)
        }
        AcdEvent::AddressDeclined => {
            warn!(%address, "address declined");
            Ok(Next::Continue)
        }
        AcdEvent::RestartAcquisition => match retries.next_delay() {
            Some(delay) => {
                info!(%address, delay_ms = delay.as_millis() as u64, "retrying acquisition");
                Ok(Next::RetryIn(delay))
            }
            None => bail!("{address} is still in use after {} attempts, giving up", retries.attempts()),
        },
    }
}

fn config_from(args: &ClaimArgs) -> AcdConfig {
    AcdConfig {
        tick_interval: Duration::from_millis(args.tick_ms),
        periodic_defend: args.periodic_defend.map(Duration::from_secs),
        ..Default::default()
    }
}

fn pick_interface(name: Option<&str>) -> anyhow::Result<NetworkInterface> {
    let intf = match name {
        Some(name) => interface::find_by_name(name).with_context(|| format!("no interface named {name}"))?,
        None => interface::select_default().context("no interface suitable for ARP was found")?,
    };
    if let Err(reason) = interface::check_viability(&intf) {
        bail!("cannot claim on {}: {reason}", intf.name);
    }
    Ok(intf)
}

fn print_plan(intf: &NetworkInterface, src_mac: MacAddr, args: &ClaimArgs) {
    print::tree_head(0, &intf.name);
    let mut details: Vec<(String, ColoredString)> = vec![
        ("Address".to_string(), args.address.to_string().color(colors::IPV4_ADDR)),
        ("MAC".to_string(), src_mac.to_string().color(colors::MAC_ADDR)),
    ];
    let mode: ColoredString = match (args.defend, args.periodic_defend) {
        (false, _) => "claim".normal(),
        (true, None) => "claim and defend".normal(),
        (true, Some(secs)) => format!("claim and defend, re-probe every {secs}s").normal(),
    };
    details.push(("Mode".to_string(), mode));
    let retry: ColoredString = match args.max_attempts {
        Some(max) => format!("after {}ms, at most {max} times", args.retry_delay).normal(),
        None => format!("after {}ms", args.retry_delay).normal(),
    };
    details.push(("Retry".to_string(), retry));
    print::as_tree_one_level(details);
}



// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝

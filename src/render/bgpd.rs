//! `bgpd.conf`: one eBGP session per chain neighbor, advertising every
//! connected subnet.

use super::{finish, footer, header, RenderOptions, RouterConfig};
use crate::process::DaemonKind;

pub fn render(config: &RouterConfig, options: &RenderOptions) -> String {
    let mut lines = header(DaemonKind::Bgpd, config, options);

    lines.push(format!("router bgp {}", config.as_number));
    lines.push(format!(" bgp router-id {}", config.router_id));
    // Chain peers are plain eBGP neighbors without route policies
    lines.push(" no bgp ebgp-requires-policy".to_string());
    for peer in &config.peers {
        lines.push(format!(" neighbor {} remote-as {}", peer.address, peer.remote_as));
        lines.push(format!(" neighbor {} description {}", peer.address, peer.router));
    }
    lines.push(" !".to_string());
    lines.push(" address-family ipv4 unicast".to_string());
    for network in &config.networks {
        lines.push(format!("  network {}", network));
    }
    lines.push(" exit-address-family".to_string());
    lines.push("!".to_string());

    footer(&mut lines);
    finish(lines)
}

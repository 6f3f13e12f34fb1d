//! `zebra.conf`: one stanza per interface plus IPv4 forwarding.

use super::{finish, footer, header, RenderOptions, RouterConfig};
use crate::process::DaemonKind;

pub fn render(config: &RouterConfig, options: &RenderOptions) -> String {
    let mut lines = header(DaemonKind::Zebra, config, options);

    for interface in &config.interfaces {
        lines.push(format!("interface {}", interface.name));
        lines.push(format!(" ip address {}", interface.address));
        lines.push("!".to_string());
    }

    lines.push("ip forwarding".to_string());
    lines.push("!".to_string());
    footer(&mut lines);
    finish(lines)
}

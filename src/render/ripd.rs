//! `ripd.conf`: RIPv2 on every connected subnet.

use super::{finish, footer, header, RenderOptions, RouterConfig};
use crate::process::DaemonKind;

pub fn render(config: &RouterConfig, options: &RenderOptions) -> String {
    let mut lines = header(DaemonKind::Ripd, config, options);

    lines.push("router rip".to_string());
    lines.push(" version 2".to_string());
    for network in &config.networks {
        lines.push(format!(" network {}", network));
    }
    lines.push(" redistribute connected".to_string());
    lines.push("!".to_string());

    footer(&mut lines);
    finish(lines)
}

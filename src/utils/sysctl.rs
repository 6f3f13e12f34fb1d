//! Kernel parameter writes on emulated nodes.

use crate::shell::{NodeShell, ShellError};
use regex::Regex;
use std::sync::LazyLock;

/// `sysctl -w` echoes `key = value`
static SYSCTL_OUTPUT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([^ ]+) = ([^\s]+)").expect("Invalid sysctl output regex")
});

/// Set `key` to `value` on the node and check the echoed value.
///
/// Returns `Ok(false)` when the command ran but the kernel did not report
/// the requested value (for example in a dry run), so callers can warn.
pub fn set_sysctl(shell: &NodeShell, key: &str, value: &str) -> Result<bool, ShellError> {
    let output = shell.cmd(&format!("sysctl -w {}={}", key, value))?;
    Ok(sysctl_confirms(&output, key, value))
}

/// True when `output` holds a `key = value` line matching the request
pub fn sysctl_confirms(output: &str, key: &str, value: &str) -> bool {
    SYSCTL_OUTPUT
        .captures_iter(output)
        .any(|caps| &caps[1] == key && &caps[2] == value)
}

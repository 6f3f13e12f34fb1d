//! Lab orchestrator.
//!
//! [`LabPlan`] computes everything about a lab without touching the system:
//! chain, neighbor/address/AS maps, host addresses, per-router
//! configurations, network intents and the link list. [`Lab`] realises a
//! plan: namespaces and links, addressing, forwarding, then the routing
//! daemons. Teardown runs in reverse and also runs when a [`Lab`] is dropped,
//! so a failed bring-up does not leave forwarding enabled or namespaces
//! behind.

use crate::config::{LabConfig, RoutingMode};
use crate::emulator::{Emulator, LinkShaping};
use crate::intent::{apply_intent, plan_static_routes, NetworkIntent};
use crate::ip::{plan_hosts, AddressMap, AsNumberMap, HostAddress};
use crate::process::{start_daemon, stop_daemon, DaemonKind, DaemonPaths, DaemonUser, ForwardingGuard};
use crate::render::{render_all, RenderOptions, RenderedConfigs, RouterConfig};
use crate::shell::CommandRunner;
use crate::topology::{NeighborMap, Port, RouterChain};
use crate::utils::{resolve_daemon_binary, validate_address_plan, validate_chain_links, validate_neighbor_symmetry};
use chrono::{DateTime, Utc};
use color_eyre::eyre::{eyre, WrapErr};
use color_eyre::Result;
use log::{debug, info, warn};
use serde::Serialize;
use std::fs;
use std::io;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

/// File name of the JSON lab summary
pub const SUMMARY_FILE: &str = "lab_plan.json";

/// Temporary work directories are created 0700; daemons need to traverse them
const TEMP_WORK_DIR_MODE: u32 = 0o755;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkKind {
    /// Router to router
    Chain,
    /// Router to its dedicated host
    Access,
    /// End router to an edge host
    Edge,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LinkPlan {
    pub kind: LinkKind,
    pub a: String,
    pub a_if: String,
    pub b: String,
    pub b_if: String,
    pub shaping: LinkShaping,
}

/// Everything a lab will be, computed up front
#[derive(Debug, Clone)]
pub struct LabPlan {
    pub chain: RouterChain,
    pub neighbors: NeighborMap,
    pub addresses: AddressMap,
    pub as_numbers: AsNumberMap,
    pub hosts: Vec<HostAddress>,
    /// In chain order
    pub routers: Vec<RouterConfig>,
    /// Routers first, then hosts
    pub intents: Vec<NetworkIntent>,
    pub links: Vec<LinkPlan>,
    pub routing: RoutingMode,
}

/// Serialized form of a plan, written as `lab_plan.json`
#[derive(Debug, Serialize)]
pub struct LabSummary<'a> {
    pub generated_at: DateTime<Utc>,
    pub routing: RoutingMode,
    pub anycast: bool,
    pub routers: &'a [RouterConfig],
    pub hosts: &'a [HostAddress],
    pub links: &'a [LinkPlan],
}

impl LabPlan {
    /// Build and validate the plan for `config`
    pub fn build(config: &LabConfig) -> Result<Self> {
        let chain = RouterChain::new(config.chain.routers)?;
        let neighbors = NeighborMap::from_chain(&chain);
        let addresses = AddressMap::build(&chain, config.chain.anycast);
        let as_numbers = AsNumberMap::build(&chain, config.chain.as_step);

        validate_neighbor_symmetry(&neighbors).map_err(|e| eyre!("Neighbor map validation failed: {}", e))?;
        validate_address_plan(&chain, &addresses).map_err(|e| eyre!("Address plan validation failed: {}", e))?;
        validate_chain_links(&chain, &addresses).map_err(|e| eyre!("Chain link validation failed: {}", e))?;

        let routers = chain
            .routers()
            .iter()
            .map(|&router| RouterConfig::build(router, &neighbors, &addresses, &as_numbers))
            .collect::<Result<Vec<_>, _>>()
            .wrap_err("Failed to assemble router configuration")?;

        let hosts = plan_hosts(&chain, config.chain.anycast);

        let mut static_routes = if config.routing == RoutingMode::Static {
            plan_static_routes(&chain, &neighbors, &addresses)
                .wrap_err("Failed to plan static routes")?
        } else {
            Default::default()
        };

        let mut intents: Vec<NetworkIntent> = routers
            .iter()
            .map(|rc| NetworkIntent::for_router(rc, static_routes.remove(&rc.router).unwrap_or_default()))
            .collect();
        intents.extend(hosts.iter().map(NetworkIntent::for_host));

        let links = plan_links(&chain, &hosts, config);

        info!(
            "Planned {} routers, {} hosts, {} links ({} routing{})",
            routers.len(),
            hosts.len(),
            links.len(),
            config.routing.as_str(),
            if config.chain.anycast { ", anycast" } else { "" }
        );

        Ok(Self {
            chain,
            neighbors,
            addresses,
            as_numbers,
            hosts,
            routers,
            intents,
            links,
            routing: config.routing,
        })
    }

    /// Names of every node, routers first
    pub fn node_names(&self) -> Vec<String> {
        self.routers
            .iter()
            .map(|r| r.hostname.clone())
            .chain(self.hosts.iter().map(|h| h.host.name()))
            .collect()
    }

    pub fn summary(&self) -> LabSummary<'_> {
        LabSummary {
            generated_at: Utc::now(),
            routing: self.routing,
            anycast: self.addresses.is_anycast(),
            routers: &self.routers,
            hosts: &self.hosts,
            links: &self.links,
        }
    }

    /// Write `lab_plan.json` into `dir`
    pub fn write_summary(&self, dir: &Path) -> Result<PathBuf> {
        fs::create_dir_all(dir).wrap_err_with(|| format!("Failed to create {}", dir.display()))?;
        let path = dir.join(SUMMARY_FILE);
        let json = serde_json::to_string_pretty(&self.summary())?;
        fs::write(&path, json).wrap_err_with(|| format!("Failed to write {}", path.display()))?;
        info!("Wrote lab summary to {}", path.display());
        Ok(path)
    }

    /// Write every daemon config of every router to `<dir>/<router>/<daemon>.conf`
    pub fn write_rendered(&self, dir: &Path, password: &str) -> Result<Vec<PathBuf>> {
        let mut written = Vec::new();
        for config in &self.routers {
            let paths = DaemonPaths::new(dir.join(&config.hostname));
            fs::create_dir_all(paths.router_dir())
                .wrap_err_with(|| format!("Failed to create {}", paths.router_dir().display()))?;

            let rendered = render_for(config, &paths, password);
            for kind in [DaemonKind::Zebra, DaemonKind::Bgpd, DaemonKind::Ripd] {
                let path = paths.config_file(kind);
                fs::write(&path, rendered.for_daemon(kind))
                    .wrap_err_with(|| format!("Failed to write {}", path.display()))?;
                written.push(path);
            }
        }
        info!("Rendered {} daemon configs into {}", written.len(), dir.display());
        Ok(written)
    }
}

fn plan_links(chain: &RouterChain, hosts: &[HostAddress], config: &LabConfig) -> Vec<LinkPlan> {
    let mut links: Vec<LinkPlan> = chain
        .links()
        .map(|(left, right)| LinkPlan {
            kind: LinkKind::Chain,
            a: left.name(),
            a_if: left.interface(Port::Right),
            b: right.name(),
            b_if: right.interface(Port::Left),
            shaping: config.chain.chain_link.clone(),
        })
        .collect();

    for host in hosts {
        let kind = if host.port == Port::Access {
            LinkKind::Access
        } else {
            LinkKind::Edge
        };
        links.push(LinkPlan {
            kind,
            a: host.router.name(),
            a_if: host.router.interface(host.port),
            b: host.host.name(),
            b_if: host.interface(),
            shaping: config.chain.access_link.clone(),
        });
    }

    links
}

fn render_for(config: &RouterConfig, paths: &DaemonPaths, password: &str) -> RenderedConfigs {
    let options = RenderOptions {
        password: password.to_string(),
        log_dir: Some(paths.router_dir().to_path_buf()),
    };
    render_all(config, &options)
}

#[derive(Debug)]
enum WorkDir {
    Temp(TempDir),
    Fixed(PathBuf),
}

impl WorkDir {
    fn path(&self) -> &Path {
        match self {
            WorkDir::Temp(dir) => dir.path(),
            WorkDir::Fixed(path) => path,
        }
    }
}

#[derive(Debug)]
struct RunningDaemon {
    router: String,
    kind: DaemonKind,
    paths: DaemonPaths,
}

/// A running lab
#[derive(Debug)]
pub struct Lab {
    emulator: Emulator,
    guards: Vec<ForwardingGuard>,
    daemons: Vec<RunningDaemon>,
    work_dir: WorkDir,
}

impl Lab {
    /// Bring up `plan` on the system behind `runner`
    pub fn start(plan: &LabPlan, config: &LabConfig, runner: Arc<dyn CommandRunner>) -> Result<Self> {
        let work_dir = match &config.general.work_dir {
            Some(path) => {
                fs::create_dir_all(path)
                    .wrap_err_with(|| format!("Failed to create work directory {}", path.display()))?;
                WorkDir::Fixed(path.clone())
            }
            None => {
                let dir = tempfile::Builder::new()
                    .prefix("topolab-")
                    .tempdir()
                    .wrap_err("Failed to create temporary work directory")?;
                fs::set_permissions(dir.path(), fs::Permissions::from_mode(TEMP_WORK_DIR_MODE))
                    .wrap_err_with(|| format!("Failed to open up {}", dir.path().display()))?;
                WorkDir::Temp(dir)
            }
        };
        info!("Work directory: {}", work_dir.path().display());

        let mut lab = Lab {
            emulator: Emulator::new(runner),
            guards: Vec::new(),
            daemons: Vec::new(),
            work_dir,
        };

        for name in plan.node_names() {
            lab.emulator
                .add_node(&name)
                .wrap_err_with(|| format!("Failed to create node {}", name))?;
        }
        for link in &plan.links {
            lab.emulator
                .add_link(&link.a, &link.a_if, &link.b, &link.b_if, &link.shaping)
                .wrap_err_with(|| format!("Failed to link {} and {}", link.a_if, link.b_if))?;
        }
        info!(
            "Created {} nodes and {} links",
            lab.emulator.node_count(),
            lab.emulator.link_count()
        );

        for intent in &plan.intents {
            let shell = lab.emulator.node(&intent.node)?;
            apply_intent(shell, intent)
                .wrap_err_with(|| format!("Failed to configure {}", intent.node))?;
        }

        for router in &plan.routers {
            let shell = lab.emulator.node(&router.hostname)?.clone();
            let guard = ForwardingGuard::acquire(shell)
                .wrap_err_with(|| format!("Failed to enable forwarding on {}", router.hostname))?;
            lab.guards.push(guard);
        }

        let user = DaemonUser::new(&config.daemons.user, &config.daemons.group);

        // zebra must be up on every router before the protocol daemons
        for &kind in plan.routing.daemons() {
            let binary = resolve_daemon_binary(&config.daemons.dir, kind)?;
            for router in &plan.routers {
                let shell = lab.emulator.node(&router.hostname)?;
                let paths = DaemonPaths::new(lab.work_dir.path().join(&router.hostname));
                let rendered = render_for(router, &paths, &config.daemons.password);
                start_daemon(shell, kind, &binary, &paths, rendered.for_daemon(kind), &user)
                    .wrap_err_with(|| format!("Failed to start {} on {}", kind, router.hostname))?;
                lab.daemons.push(RunningDaemon {
                    router: router.hostname.clone(),
                    kind,
                    paths,
                });
            }
        }

        info!(
            "Lab is up: {} routers, {} daemons, {} routing",
            plan.routers.len(),
            lab.daemons.len(),
            plan.routing.as_str()
        );
        Ok(lab)
    }

    pub fn work_dir(&self) -> &Path {
        self.work_dir.path()
    }

    pub fn emulator(&self) -> &Emulator {
        &self.emulator
    }

    pub fn daemon_count(&self) -> usize {
        self.daemons.len()
    }

    /// Stop daemons, remove their files, disable forwarding and delete the
    /// namespaces
    pub fn teardown(mut self) {
        self.stop_all();
    }

    fn stop_all(&mut self) {
        while let Some(daemon) = self.daemons.pop() {
            match self.emulator.node(&daemon.router) {
                Ok(shell) => {
                    stop_daemon(shell, daemon.kind, &daemon.paths);
                }
                Err(e) => warn!("Cannot stop {} on {}: {}", daemon.kind, daemon.router, e),
            }
            if let Err(e) = fs::remove_file(daemon.paths.config_file(daemon.kind)) {
                if e.kind() != io::ErrorKind::NotFound {
                    warn!("Failed to remove {} config of {}: {}", daemon.kind, daemon.router, e);
                }
            }
            // The last daemon of a router leaves its directory empty but for logs
            if !self.daemons.iter().any(|d| d.router == daemon.router) {
                remove_router_dir(daemon.paths.router_dir());
            }
        }

        while let Some(guard) = self.guards.pop() {
            let node = guard.node().to_string();
            if let Err(e) = guard.release() {
                warn!("{}: failed to disable forwarding: {}", node, e);
            }
        }

        self.emulator.shutdown();
        debug!("Teardown complete");
    }
}

fn remove_router_dir(dir: &Path) {
    match fs::remove_dir_all(dir) {
        Ok(()) => debug!("Removed {}", dir.display()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => warn!("Failed to remove {}: {}", dir.display(), e),
    }
}

impl Drop for Lab {
    fn drop(&mut self) {
        self.stop_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shell::RecordingRunner;

    fn config(routers: usize, routing: RoutingMode, anycast: bool) -> LabConfig {
        let mut config = LabConfig::default();
        config.chain.routers = routers;
        config.chain.anycast = anycast;
        config.routing = routing;
        config
    }

    #[test]
    fn test_plan_shape() {
        let plan = LabPlan::build(&config(3, RoutingMode::Bgp, false)).unwrap();
        assert_eq!(plan.routers.len(), 3);
        assert_eq!(plan.hosts.len(), 5);
        assert_eq!(plan.intents.len(), 8);
        // 2 chain links, 3 access links, 2 edge links
        assert_eq!(plan.links.len(), 7);
        assert_eq!(plan.links.iter().filter(|l| l.kind == LinkKind::Chain).count(), 2);
        assert_eq!(plan.node_names()[..3], ["r1", "r2", "r3"]);
        // Dynamic routing carries no static routes
        assert!(plan.intents[..3].iter().all(|i| i.routes.is_empty()));
    }

    #[test]
    fn test_static_plan_has_routes() {
        let plan = LabPlan::build(&config(3, RoutingMode::Static, false)).unwrap();
        assert!(plan.intents[..3].iter().all(|i| !i.routes.is_empty()));
    }

    #[test]
    fn test_summary_serializes() {
        let plan = LabPlan::build(&config(2, RoutingMode::Bgp, true)).unwrap();
        let json = serde_json::to_value(plan.summary()).unwrap();
        assert_eq!(json["routing"], "bgp");
        assert_eq!(json["anycast"], true);
        assert_eq!(json["routers"][1]["as_number"], 2000);
        assert_eq!(json["links"][0]["kind"], "chain");
    }

    #[test]
    fn test_write_rendered() {
        let dir = tempfile::tempdir().unwrap();
        let plan = LabPlan::build(&config(2, RoutingMode::Bgp, false)).unwrap();
        let written = plan.write_rendered(dir.path(), "zebra").unwrap();
        assert_eq!(written.len(), 6);
        let bgpd = fs::read_to_string(dir.path().join("r2").join("bgpd.conf")).unwrap();
        assert!(bgpd.contains("router bgp 2000\n"));
    }

    #[test]
    fn test_start_and_teardown_recorded() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = config(2, RoutingMode::Bgp, false);
        cfg.general.work_dir = Some(dir.path().join("work"));
        let plan = LabPlan::build(&cfg).unwrap();
        let runner = Arc::new(RecordingRunner::new());

        let lab = Lab::start(&plan, &cfg, runner.clone()).unwrap();
        assert_eq!(lab.daemon_count(), 4);
        assert_eq!(lab.emulator().node_count(), 6);
        assert!(dir.path().join("work/r1/zebra.conf").exists());

        // zebra on both routers before any bgpd
        let spawned: Vec<String> = runner
            .commands()
            .into_iter()
            .map(|c| c.line)
            .filter(|l| l.contains("--config_file"))
            .collect();
        assert_eq!(spawned.len(), 4);
        assert!(spawned[0].starts_with("umask 000; /usr/lib/frr/zebra "));
        assert!(spawned[1].starts_with("umask 000; /usr/lib/frr/zebra "));
        assert!(spawned[2].starts_with("umask 000; /usr/lib/frr/bgpd "));
        assert!(spawned.iter().all(|l| l.contains(" -u frr -g frr ")));

        let mode = fs::metadata(dir.path().join("work/r1")).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o777);

        lab.teardown();
        assert!(!dir.path().join("work/r1").exists());
        let r1 = runner.lines_in(Some("r1"));
        assert_eq!(r1.last().map(String::as_str), Some("sysctl -w net.ipv4.ip_forward=0"));
        assert_eq!(runner.lines_in(None).last().map(String::as_str), Some("ip netns del r1"));
    }

    #[test]
    fn test_host_links_use_access_shaping() {
        let mut cfg = config(3, RoutingMode::Bgp, false);
        cfg.chain.access_link.delay = Some(std::time::Duration::from_millis(2));
        let plan = LabPlan::build(&cfg).unwrap();

        for link in &plan.links {
            match link.kind {
                LinkKind::Chain => assert_eq!(link.shaping, cfg.chain.chain_link),
                LinkKind::Access | LinkKind::Edge => assert_eq!(link.shaping, cfg.chain.access_link),
            }
        }
        assert_eq!(plan.links.iter().filter(|l| l.kind == LinkKind::Edge).count(), 2);

        // Default edge links stay unshaped
        let plan = LabPlan::build(&config(3, RoutingMode::Bgp, false)).unwrap();
        let edge = plan.links.iter().find(|l| l.kind == LinkKind::Edge).unwrap();
        assert_eq!(edge.shaping, LinkShaping::default());
    }

    #[test]
    fn test_temp_work_dir_is_traversable() {
        let cfg = config(2, RoutingMode::Static, false);
        let plan = LabPlan::build(&cfg).unwrap();
        let lab = Lab::start(&plan, &cfg, Arc::new(RecordingRunner::new())).unwrap();

        let mode = fs::metadata(lab.work_dir()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, TEMP_WORK_DIR_MODE);
        lab.teardown();
    }
}

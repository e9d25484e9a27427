//! Docker CLI backed runtime.
//!
//! Talks to a local docker daemon through the `docker` command line
//! client. The namespace of a started container is exposed under
//! `/run/netns/<container name>` via a symlink to `/proc/<pid>/ns/net`,
//! which is the convention the wiring engine and the teardown path both
//! rely on.

use async_trait::async_trait;

use wirelab_common::{shell, LabError, LabResult};
use wirelab_types::NodeConfig;

use crate::{ContainerRuntime, ExecOutput};

/// Path to the docker CLI client.
pub const DOCKER_CMD: &str = "docker";

/// Directory where named network namespaces are exposed.
const NETNS_DIR: &str = "/run/netns";

/// Builds the conditional image pull command.
pub(crate) fn build_pull_cmd(image: &str) -> String {
    let image = shell::shellquote(image);
    format!(
        "{DOCKER_CMD} image inspect {image} >/dev/null 2>&1 || {DOCKER_CMD} pull -q {image}"
    )
}

/// Builds the container create command from a node configuration.
pub(crate) fn build_create_cmd(cfg: &NodeConfig) -> String {
    let mut cmd = format!(
        "{DOCKER_CMD} create --name {} --hostname {}",
        shell::shellquote(&cfg.long_name),
        shell::shellquote(&cfg.fqdn)
    );
    for (k, v) in &cfg.env {
        cmd.push_str(&format!(" -e {}", shell::shellquote(&format!("{k}={v}"))));
    }
    for (k, v) in &cfg.labels {
        cmd.push_str(&format!(" -l {}", shell::shellquote(&format!("{k}={v}"))));
    }
    for bind in &cfg.binds {
        cmd.push_str(&format!(" -v {}", shell::shellquote(bind)));
    }
    if cfg.cpu > 0.0 {
        cmd.push_str(&format!(" --cpus {}", cfg.cpu));
    }
    if !cfg.memory.is_empty() {
        cmd.push_str(&format!(" --memory {}", shell::shellquote(&cfg.memory)));
    }
    if !cfg.mgmt_ipv4.is_empty() {
        cmd.push_str(&format!(" --ip {}", shell::shellquote(&cfg.mgmt_ipv4)));
    }
    cmd.push_str(&format!(" {}", shell::shellquote(&cfg.image)));
    cmd
}

fn inspect_fmt(id: &str, format: &str) -> String {
    format!(
        "{DOCKER_CMD} inspect -f '{format}' {}",
        shell::shellquote(id)
    )
}

/// Docker-daemon backed implementation of [`ContainerRuntime`].
#[derive(Debug, Default)]
pub struct DockerRuntime;

impl DockerRuntime {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ContainerRuntime for DockerRuntime {
    fn name(&self) -> &str {
        "docker"
    }

    async fn pull_image_if_required(&self, image: &str) -> LabResult<()> {
        shell::exec_checked(&build_pull_cmd(image)).await.map(|_| ())
    }

    async fn create_container(&self, cfg: &NodeConfig) -> LabResult<String> {
        let id = shell::exec_checked(&build_create_cmd(cfg)).await?;
        if id.is_empty() {
            return Err(LabError::runtime(
                "create",
                format!("docker returned no container id for {}", cfg.long_name),
            ));
        }
        Ok(id)
    }

    async fn start_container(&self, id: &str) -> LabResult<String> {
        shell::exec_checked(&format!("{DOCKER_CMD} start {}", shell::shellquote(id))).await?;

        let pid = shell::exec_checked(&inspect_fmt(id, "{{.State.Pid}}")).await?;
        let name = shell::exec_checked(&inspect_fmt(id, "{{.Name}}")).await?;
        let name = name.trim_start_matches('/');

        // expose the container netns under a stable name so plain
        // `ip netns exec` works against it
        std::fs::create_dir_all(NETNS_DIR)
            .map_err(|e| LabError::runtime("start", format!("creating {NETNS_DIR}: {e}")))?;
        let link = format!("{NETNS_DIR}/{name}");
        let _ = std::fs::remove_file(&link);
        std::os::unix::fs::symlink(format!("/proc/{pid}/ns/net"), &link)
            .map_err(|e| LabError::runtime("start", format!("linking {link}: {e}")))?;
        Ok(link)
    }

    async fn stop_container(&self, id: &str) -> LabResult<()> {
        shell::exec_checked(&format!("{DOCKER_CMD} stop -t 2 {}", shell::shellquote(id)))
            .await
            .map(|_| ())
    }

    async fn delete_container(&self, id: &str) -> LabResult<()> {
        shell::exec_checked(&format!("{DOCKER_CMD} rm -f {}", shell::shellquote(id)))
            .await
            .map(|_| ())
    }

    async fn exec(&self, id: &str, cmd: &[String]) -> LabResult<ExecOutput> {
        let argv: Vec<String> = cmd.iter().map(|a| shell::shellquote(a)).collect();
        let full = format!(
            "{DOCKER_CMD} exec {} {}",
            shell::shellquote(id),
            argv.join(" ")
        );
        let result = shell::exec(&full).await?;
        Ok(ExecOutput {
            exit_code: result.exit_code,
            stdout: result.stdout,
            stderr: result.stderr,
        })
    }

    async fn get_ns_path(&self, id: &str) -> LabResult<String> {
        let pid = shell::exec_checked(&inspect_fmt(id, "{{.State.Pid}}")).await?;
        Ok(format!("/proc/{pid}/ns/net"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_build_pull_cmd() {
        let cmd = build_pull_cmd("alpine:3");
        assert!(cmd.contains("image inspect \"alpine:3\""));
        assert!(cmd.contains("pull -q \"alpine:3\""));
    }

    #[test]
    fn test_build_create_cmd() {
        let cfg = NodeConfig {
            short_name: "r1".to_string(),
            long_name: "wl-lab-r1".to_string(),
            fqdn: "r1.lab.io".to_string(),
            kind: "linux".to_string(),
            image: "alpine:3".to_string(),
            env: HashMap::from([("FOO".to_string(), "bar".to_string())]),
            binds: vec!["/tmp/cfg:/etc/cfg:ro".to_string()],
            cpu: 1.5,
            memory: "2Gb".to_string(),
            ..Default::default()
        };

        let cmd = build_create_cmd(&cfg);
        assert!(cmd.starts_with("docker create --name \"wl-lab-r1\""));
        assert!(cmd.contains("--hostname \"r1.lab.io\""));
        assert!(cmd.contains("-e \"FOO=bar\""));
        assert!(cmd.contains("-v \"/tmp/cfg:/etc/cfg:ro\""));
        assert!(cmd.contains("--cpus 1.5"));
        assert!(cmd.contains("--memory \"2Gb\""));
        assert!(cmd.ends_with("\"alpine:3\""));
    }
}

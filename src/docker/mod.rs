use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use anyhow::{Context, Result};
use bollard::container::{Config, CreateContainerOptions, InspectContainerOptions, StartContainerOptions};
use bollard::exec::{CreateExecOptions, StartExecResults};
use bollard::image::BuildImageOptions;
use bollard::service::{HostConfig, PortBinding};
use bollard::Docker;
use futures_util::StreamExt;
use tracing::debug;

use crate::buildspec::{self, BuildSpec};
use crate::core::{DevcrateError, DevcrateResult};
use crate::runtime::RuntimeSpec;

/// Thin client over the Docker engine. All image-build and container-run
/// I/O lives here; the compilers never touch it.
pub struct DockerClient {
    client: Docker,
}

impl DockerClient {
    pub fn new() -> Result<Self> {
        let client = Docker::connect_with_local_defaults()
            .context("Failed to connect to Docker daemon")?;

        Ok(Self { client })
    }

    // Check Docker availability
    pub fn is_docker_available() -> bool {
        Docker::connect_with_local_defaults().is_ok()
    }

    /// Persist the rendered Dockerfile into the build context, tar the
    /// context, and stream the image build. Returns the built image id.
    pub async fn build_image(
        &self,
        context_dir: &Path,
        spec: &BuildSpec,
        tag: &str,
        dockerfile_name: &str,
    ) -> DevcrateResult<String> {
        buildspec::write_dockerfile(spec, context_dir, dockerfile_name)?;

        let context_tar = tar_build_context(context_dir)?;

        let options = BuildImageOptions {
            dockerfile: dockerfile_name.to_string(),
            t: tag.to_string(),
            rm: true,
            ..Default::default()
        };

        let mut image_id = None;
        let mut build_stream = self.client.build_image(options, None, Some(context_tar.into()));

        while let Some(build_result) = build_stream.next().await {
            let build_info = build_result
                .map_err(|e| DevcrateError::BuildError(e.to_string()))?;
            if let Some(error) = build_info.error {
                return Err(DevcrateError::BuildError(error));
            }
            if let Some(stream) = build_info.stream {
                debug!(target: "devcrate::build", "{}", stream.trim_end());
            }
            if let Some(aux) = build_info.aux {
                image_id = aux.id;
            }
        }

        // Older engines omit the aux record; the tag still names the image.
        Ok(image_id.unwrap_or_else(|| tag.to_string()))
    }

    /// Create and start a detached, auto-removed container running the
    /// composed entrypoint under `sh -c`, with engine-assigned host ports.
    pub async fn run_container(
        &self,
        image: &str,
        name: &str,
        runtime_spec: &RuntimeSpec,
    ) -> DevcrateResult<String> {
        let mut exposed_ports = HashMap::new();
        let mut port_bindings = HashMap::new();
        for (&container_port, &host_port) in &runtime_spec.port_map {
            exposed_ports.insert(port_key(container_port), HashMap::new());
            port_bindings.insert(
                port_key(container_port),
                Some(vec![PortBinding {
                    host_ip: Some("0.0.0.0".to_string()),
                    host_port: host_port.map(|p| p.to_string()),
                }]),
            );
        }

        let config = Config::<String> {
            image: Some(image.to_string()),
            cmd: Some(vec![
                "sh".to_string(),
                "-c".to_string(),
                runtime_spec.entrypoint.clone(),
            ]),
            exposed_ports: Some(exposed_ports),
            host_config: Some(HostConfig {
                port_bindings: Some(port_bindings),
                auto_remove: Some(true),
                ..Default::default()
            }),
            ..Default::default()
        };

        let create_options = CreateContainerOptions {
            name,
            ..Default::default()
        };

        let container = self
            .client
            .create_container(Some(create_options), config)
            .await
            .map_err(|e| DevcrateError::RunError(e.to_string()))?;

        self.client
            .start_container(&container.id, None::<StartContainerOptions<String>>)
            .await
            .map_err(|e| DevcrateError::RunError(e.to_string()))?;

        Ok(container.id)
    }

    /// Resolve each published container port to the host port the engine
    /// assigned to it.
    pub async fn assigned_host_ports(
        &self,
        container_id: &str,
    ) -> DevcrateResult<BTreeMap<u16, u16>> {
        let details = self
            .client
            .inspect_container(container_id, None::<InspectContainerOptions>)
            .await
            .map_err(|e| DevcrateError::RunError(e.to_string()))?;

        let mut assigned = BTreeMap::new();
        let ports = details
            .network_settings
            .and_then(|settings| settings.ports)
            .unwrap_or_default();

        for (key, bindings) in ports {
            let Some(container_port) = parse_port_key(&key) else {
                continue;
            };
            let host_port = bindings
                .unwrap_or_default()
                .into_iter()
                .filter_map(|binding| binding.host_port)
                .find_map(|port| port.parse::<u16>().ok());
            if let Some(host_port) = host_port {
                assigned.insert(container_port, host_port);
            }
        }

        Ok(assigned)
    }

    /// Execute a command inside the running container and capture its output.
    pub async fn exec_capture(&self, container_id: &str, cmd: &[&str]) -> DevcrateResult<String> {
        let exec = self
            .client
            .create_exec(
                container_id,
                CreateExecOptions {
                    cmd: Some(cmd.iter().map(|s| s.to_string()).collect()),
                    attach_stdout: Some(true),
                    attach_stderr: Some(true),
                    ..Default::default()
                },
            )
            .await
            .map_err(|e| DevcrateError::RunError(e.to_string()))?;

        let mut collected = Vec::new();
        let results = self
            .client
            .start_exec(&exec.id, None)
            .await
            .map_err(|e| DevcrateError::RunError(e.to_string()))?;

        if let StartExecResults::Attached { mut output, .. } = results {
            while let Some(chunk) = output.next().await {
                let chunk = chunk.map_err(|e| DevcrateError::RunError(e.to_string()))?;
                collected.extend_from_slice(&chunk.into_bytes());
            }
        }

        Ok(String::from_utf8_lossy(&collected).trim().to_string())
    }
}

fn port_key(port: u16) -> String {
    format!("{}/tcp", port)
}

fn parse_port_key(key: &str) -> Option<u16> {
    key.split('/').next()?.parse().ok()
}

/// In-memory tarball of the whole build context directory.
fn tar_build_context(context_dir: &Path) -> DevcrateResult<Vec<u8>> {
    let mut builder = tar::Builder::new(Vec::new());
    builder.append_dir_all(".", context_dir)?;
    let archive = builder.into_inner()?;
    Ok(archive)
}

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use anyhow::Result;
use tracing::{info, warn};

use crate::buildspec;
use crate::config::Settings;
use crate::core::ConfigWarning;
use crate::descriptor::EnvironmentDescriptor;
use crate::docker::DockerClient;
use crate::entrypoint;
use crate::features::Feature;
use crate::runtime;

/// Post-launch facts reported back to the caller.
#[derive(Debug)]
pub struct LaunchReport {
    pub container_id: String,
    pub ssh_port: Option<u16>,
    pub code_server_port: Option<u16>,
    pub tailscale_ip: Option<String>,
    pub warnings: Vec<ConfigWarning>,
}

/// Drives one container lifecycle: compile the descriptor, build the image,
/// and start the container. Compilation and validation errors surface before
/// any engine call is made.
pub struct ContainerOrchestrator {
    docker: DockerClient,
    settings: Settings,
}

impl ContainerOrchestrator {
    pub fn new(settings: Settings) -> Result<Self> {
        Ok(Self {
            docker: DockerClient::new()?,
            settings,
        })
    }

    pub async fn launch(
        &self,
        descriptor: &EnvironmentDescriptor,
        context_dir: &Path,
    ) -> Result<LaunchReport> {
        let build_spec = buildspec::compile(descriptor)?;
        let (command, warnings) = entrypoint::compose(
            &descriptor.features,
            descriptor.tailscale_auth_key.as_ref(),
        );
        for warning in &warnings {
            warn!("{}", warning);
        }
        let runtime_spec = runtime::build(descriptor, command);

        let tag = self.settings.image_tag(&descriptor.name);
        info!("Building image '{}'", tag);
        let image_id = self
            .docker
            .build_image(context_dir, &build_spec, &tag, &self.settings.dockerfile_name)
            .await?;
        info!("Image '{}' built successfully", image_id);

        let container_id = self
            .docker
            .run_container(&image_id, &descriptor.name, &runtime_spec)
            .await?;
        info!("Container '{}' started", descriptor.name);

        let assigned = if runtime_spec.port_map.is_empty() {
            BTreeMap::new()
        } else {
            self.docker.assigned_host_ports(&container_id).await?
        };

        let tailscale_ip = self.resolve_tailscale_ip(descriptor, &container_id).await;

        Ok(LaunchReport {
            container_id,
            ssh_port: assigned.get(&22).copied(),
            code_server_port: assigned.get(&8080).copied(),
            tailscale_ip,
            warnings,
        })
    }

    /// Ask the running container for its Tailscale address. Only meaningful
    /// when the bootstrap sequence ran, and best-effort even then.
    async fn resolve_tailscale_ip(
        &self,
        descriptor: &EnvironmentDescriptor,
        container_id: &str,
    ) -> Option<String> {
        if !descriptor.features.contains(&Feature::Tailscale)
            || descriptor.tailscale_auth_key.is_none()
        {
            return None;
        }

        info!("Waiting for Tailscale to connect...");
        tokio::time::sleep(Duration::from_secs(5)).await;

        self.docker
            .exec_capture(container_id, &["tailscale", "ip", "-4"])
            .await
            .ok()
            .filter(|ip| !ip.is_empty())
    }
}

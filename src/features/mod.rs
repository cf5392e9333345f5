use std::fmt;

use serde::{Deserialize, Serialize};

use crate::buildspec::Instruction;

/// Optional container features. The `Ord` derive follows declaration order,
/// which is also the canonical compile order, so feature sets iterate
/// deterministically no matter how the user selected them.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Feature {
    Ssh,
    Tailscale,
    OpenVscodeServer,
    Git,
}

/// Canonical feature order applied to all compiled output.
pub const CANONICAL_ORDER: [Feature; 4] = [
    Feature::Ssh,
    Feature::Tailscale,
    Feature::OpenVscodeServer,
    Feature::Git,
];

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Feature::Ssh => write!(f, "SSH"),
            Feature::Tailscale => write!(f, "Tailscale"),
            Feature::OpenVscodeServer => write!(f, "OpenVSCode Server"),
            Feature::Git => write!(f, "Git"),
        }
    }
}

impl Feature {
    /// The feature's fixed block of build instructions. Each block is
    /// self-contained and never depends on instructions contributed by
    /// another feature.
    pub fn build_instructions(&self) -> Vec<Instruction> {
        match self {
            Feature::Ssh => vec![
                Instruction::run("apt-get update && apt-get install -y openssh-server"),
                Instruction::run("mkdir /var/run/sshd"),
                Instruction::run("echo 'root:root' | chpasswd"),
                Instruction::run(
                    "sed -i 's/^#PermitRootLogin.*/PermitRootLogin yes/' /etc/ssh/sshd_config",
                ),
                Instruction::run(
                    "sed -i 's/^#PasswordAuthentication.*/PasswordAuthentication yes/' /etc/ssh/sshd_config",
                ),
                Instruction::Expose(22),
            ],
            // Install only; authentication happens at container start.
            Feature::Tailscale => vec![Instruction::run(
                "curl -fsSL https://tailscale.com/install.sh | sh",
            )],
            // auth: none is a deliberate default so the server is reachable
            // without credential provisioning. Do not expose this container
            // to untrusted networks.
            Feature::OpenVscodeServer => vec![
                Instruction::run("curl -fsSL https://code-server.dev/install.sh | sh"),
                Instruction::Expose(8080),
                Instruction::run(
                    "mkdir -p /root/.config/code-server && echo 'bind-addr: 0.0.0.0:8080\\nauth: none' > /root/.config/code-server/config.yaml",
                ),
            ],
            Feature::Git => vec![Instruction::run("apt-get update && apt-get install -y git")],
        }
    }

    /// Launch command for features that must occupy the container's
    /// foreground for its whole lifetime.
    pub fn main_process(&self) -> Option<&'static str> {
        match self {
            Feature::Ssh => Some("/usr/sbin/sshd -D"),
            Feature::OpenVscodeServer => Some("code-server"),
            Feature::Tailscale | Feature::Git => None,
        }
    }

    /// Container port published with an engine-assigned host port.
    pub fn exposed_port(&self) -> Option<u16> {
        match self {
            Feature::Ssh => Some(22),
            Feature::OpenVscodeServer => Some(8080),
            Feature::Tailscale | Feature::Git => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    #[test]
    fn test_canonical_order_matches_ord() {
        let mut sorted = CANONICAL_ORDER;
        sorted.sort();
        assert_eq!(sorted, CANONICAL_ORDER);
    }

    #[test_case(Feature::Ssh, Some(22); "ssh exposes 22")]
    #[test_case(Feature::OpenVscodeServer, Some(8080); "code server exposes 8080")]
    #[test_case(Feature::Tailscale, None; "tailscale exposes nothing")]
    #[test_case(Feature::Git, None; "git exposes nothing")]
    fn test_exposed_ports(feature: Feature, expected: Option<u16>) {
        assert_eq!(feature.exposed_port(), expected);
    }

    #[test]
    fn test_every_exposed_port_is_declared_in_build_block() {
        for feature in CANONICAL_ORDER {
            if let Some(port) = feature.exposed_port() {
                assert!(
                    feature
                        .build_instructions()
                        .contains(&Instruction::Expose(port)),
                    "{} must declare EXPOSE {}",
                    feature,
                    port
                );
            }
        }
    }

    #[test]
    fn test_main_processes() {
        assert_eq!(Feature::Ssh.main_process(), Some("/usr/sbin/sshd -D"));
        assert_eq!(Feature::OpenVscodeServer.main_process(), Some("code-server"));
        assert_eq!(Feature::Tailscale.main_process(), None);
        assert_eq!(Feature::Git.main_process(), None);
    }
}

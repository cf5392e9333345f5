use std::collections::BTreeSet;

use secrecy::{ExposeSecret, SecretString};

use crate::core::ConfigWarning;
use crate::features::{Feature, CANONICAL_ORDER};

/// Keeps the container alive when no selected feature needs the foreground.
pub const SLEEP_FALLBACK: &str = "sleep infinity";

/// Seconds to wait for tailscaled's control socket before `tailscale up`.
const TAILSCALE_GRACE_SECS: u32 = 2;

/// Compose the container's single entrypoint command: every selected main
/// process backgrounded and joined by a terminal `wait`, optionally gated by
/// the Tailscale bootstrap sequence. The command is always non-empty, so the
/// container is launchable even with zero features selected.
pub fn compose(
    features: &BTreeSet<Feature>,
    tailscale_auth_key: Option<&SecretString>,
) -> (String, Vec<ConfigWarning>) {
    let mut warnings = Vec::new();

    let mut main_commands: Vec<&str> = CANONICAL_ORDER
        .into_iter()
        .filter(|feature| features.contains(feature))
        .filter_map(|feature| feature.main_process())
        .collect();
    if main_commands.is_empty() {
        main_commands.push(SLEEP_FALLBACK);
    }

    // Container lifetime is the lifetime of the longest-running main process.
    let main_block = format!("{} & wait", main_commands.join(" & "));

    let bootstrap = if features.contains(&Feature::Tailscale) {
        match tailscale_auth_key {
            Some(key) => tailscale_bootstrap(key),
            None => {
                warnings.push(ConfigWarning::TailscaleAuthKeyMissing);
                String::new()
            }
        }
    } else {
        String::new()
    };

    (format!("{}{}", bootstrap, main_block), warnings)
}

/// Bring the VPN up before any main process starts. Sequenced with `&&`, so
/// a failed `tailscale up` aborts the whole chain and the container exits.
fn tailscale_bootstrap(auth_key: &SecretString) -> String {
    format!(
        "tailscaled --tun=userspace-networking --socks5-server=localhost:1055 --outbound-http-proxy-listen=localhost:1055 & sleep {} && tailscale up --auth-key={} && ",
        TAILSCALE_GRACE_SECS,
        auth_key.expose_secret()
    )
}

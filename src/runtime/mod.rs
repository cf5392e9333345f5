use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::descriptor::EnvironmentDescriptor;
use crate::features::CANONICAL_ORDER;

/// What the container engine needs to launch the container: which container
/// ports to publish (None means the engine assigns a host port) and the
/// composed entrypoint command. Pure output; applying it is the
/// orchestrator's job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeSpec {
    pub port_map: BTreeMap<u16, Option<u16>>,
    pub entrypoint: String,
}

/// Build the runtime spec for a descriptor and its composed entrypoint.
pub fn build(descriptor: &EnvironmentDescriptor, entrypoint: String) -> RuntimeSpec {
    let port_map = CANONICAL_ORDER
        .into_iter()
        .filter(|feature| descriptor.features.contains(feature))
        .filter_map(|feature| feature.exposed_port())
        .map(|port| (port, None))
        .collect();

    RuntimeSpec {
        port_map,
        entrypoint,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::Framework;
    use crate::features::Feature;
    use pretty_assertions::assert_eq;

    fn descriptor(features: &[Feature]) -> EnvironmentDescriptor {
        EnvironmentDescriptor::builder("test-env")
            .framework(Framework::GeneralPurpose)
            .features(features.iter().copied())
            .build()
            .unwrap()
    }

    #[test]
    fn test_ports_declared_for_selected_features() {
        let spec = build(
            &descriptor(&[Feature::Ssh, Feature::OpenVscodeServer]),
            "cmd".to_string(),
        );
        assert_eq!(
            spec.port_map,
            BTreeMap::from([(22, None), (8080, None)])
        );
    }

    #[test]
    fn test_no_ports_without_serving_features() {
        let spec = build(&descriptor(&[Feature::Tailscale, Feature::Git]), "cmd".to_string());
        assert!(spec.port_map.is_empty());
    }

    #[test]
    fn test_entrypoint_carried_unchanged() {
        let spec = build(&descriptor(&[]), "sleep infinity & wait".to_string());
        assert_eq!(spec.entrypoint, "sleep infinity & wait");
    }
}

use devcrate::buildspec::{self, Instruction};
use devcrate::descriptor::{DependencySource, EnvironmentDescriptor, Framework};
use devcrate::features::Feature;
use devcrate::{entrypoint, runtime, ConfigWarning};
use secrecy::SecretString;

fn python_env(features: &[Feature]) -> EnvironmentDescriptor {
    EnvironmentDescriptor::builder("integration-env")
        .framework(Framework::Python)
        .python_version("3.11")
        .features(features.iter().copied())
        .build()
        .unwrap()
}

/// Compilation pipeline properties
mod compile_pipeline {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_compile_is_deterministic() {
        let descriptor = python_env(&[Feature::Ssh, Feature::Tailscale, Feature::Git]);

        let first = buildspec::compile(&descriptor).unwrap().render();
        let second = buildspec::compile(&descriptor).unwrap().render();
        assert_eq!(first, second);
    }

    #[test]
    fn test_feature_permutations_compile_identically() {
        let permutations: [&[Feature]; 3] = [
            &[Feature::Git, Feature::Ssh, Feature::OpenVscodeServer],
            &[Feature::OpenVscodeServer, Feature::Git, Feature::Ssh],
            &[Feature::Ssh, Feature::OpenVscodeServer, Feature::Git],
        ];

        let rendered: Vec<String> = permutations
            .iter()
            .map(|features| {
                let descriptor = python_env(features);
                buildspec::compile(&descriptor).unwrap().render()
            })
            .collect();

        assert_eq!(rendered[0], rendered[1]);
        assert_eq!(rendered[1], rendered[2]);

        let commands: Vec<String> = permutations
            .iter()
            .map(|features| {
                let descriptor = python_env(features);
                entrypoint::compose(&descriptor.features, None).0
            })
            .collect();

        assert_eq!(commands[0], commands[1]);
        assert_eq!(commands[1], commands[2]);
    }

    #[test]
    fn test_file_reference_takes_precedence_over_package_list() {
        let dir = tempfile::tempdir().unwrap();
        let requirements = dir.path().join("requirements.txt");
        std::fs::write(&requirements, "flask\nrequests\n").unwrap();

        let descriptor = EnvironmentDescriptor::builder("integration-env")
            .framework(Framework::Python)
            .python_version("3.11")
            .dependency_source(DependencySource::resolve(requirements.to_str().unwrap()))
            .build()
            .unwrap();

        let spec = buildspec::compile(&descriptor).unwrap();

        let copies: Vec<&Instruction> = spec
            .instructions()
            .iter()
            .filter(|i| matches!(i, Instruction::Copy { .. }))
            .collect();
        assert_eq!(copies.len(), 1);

        let installs: Vec<String> = spec
            .instructions()
            .iter()
            .filter_map(|i| match i {
                Instruction::Run(cmd) if cmd.starts_with("pip install") => Some(cmd.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(installs, vec!["pip install -r requirements.txt".to_string()]);
    }

    /// The worked reference example: Python 3.11, flask+requests, SSH and Git.
    #[test]
    fn test_reference_example_compiles_exactly() {
        let descriptor = EnvironmentDescriptor::builder("integration-env")
            .framework(Framework::Python)
            .python_version("3.11")
            .dependency_source(DependencySource::PackageList(vec![
                "flask".to_string(),
                "requests".to_string(),
            ]))
            .features([Feature::Ssh, Feature::Git])
            .build()
            .unwrap();

        let spec = buildspec::compile(&descriptor).unwrap();
        assert_eq!(
            spec.render(),
            "\
FROM python:3.11
WORKDIR /app
RUN pip install flask requests
RUN apt-get update && apt-get install -y openssh-server
RUN mkdir /var/run/sshd
RUN echo 'root:root' | chpasswd
RUN sed -i 's/^#PermitRootLogin.*/PermitRootLogin yes/' /etc/ssh/sshd_config
RUN sed -i 's/^#PasswordAuthentication.*/PasswordAuthentication yes/' /etc/ssh/sshd_config
EXPOSE 22
RUN apt-get update && apt-get install -y git
"
        );

        let (command, warnings) =
            entrypoint::compose(&descriptor.features, descriptor.tailscale_auth_key.as_ref());
        assert_eq!(command, "/usr/sbin/sshd -D & wait");
        assert!(warnings.is_empty());

        let runtime_spec = runtime::build(&descriptor, command);
        assert_eq!(runtime_spec.port_map.keys().copied().collect::<Vec<_>>(), vec![22]);
    }
}

/// Entrypoint composition properties
mod entrypoint_properties {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_zero_features_still_launchable() {
        let descriptor = python_env(&[]);
        let (command, warnings) = entrypoint::compose(&descriptor.features, None);

        assert!(!command.is_empty());
        assert!(command.contains("sleep infinity"));
        assert!(warnings.is_empty());

        let runtime_spec = runtime::build(&descriptor, command);
        assert!(runtime_spec.port_map.is_empty());
    }

    #[test]
    fn test_vpn_bootstrap_gates_all_main_processes() {
        let descriptor = python_env(&[
            Feature::Ssh,
            Feature::Tailscale,
            Feature::OpenVscodeServer,
        ]);
        let key = SecretString::new("tskey-integration".to_string());
        let (command, warnings) = entrypoint::compose(&descriptor.features, Some(&key));

        assert!(warnings.is_empty());
        let up = command.find("tailscale up").unwrap();
        for main in ["/usr/sbin/sshd -D", "code-server"] {
            let position = command.find(main).unwrap();
            assert!(up < position, "'{}' must come after the VPN bring-up", main);
        }
        assert!(command.ends_with("& wait"));
    }

    #[test]
    fn test_missing_auth_key_degrades_to_inert() {
        let descriptor = python_env(&[Feature::Ssh, Feature::Tailscale]);
        let (command, warnings) = entrypoint::compose(&descriptor.features, None);

        assert_eq!(warnings, vec![ConfigWarning::TailscaleAuthKeyMissing]);
        assert!(!command.contains("tailscale up"));
        assert!(!command.contains("tailscaled"));

        // The build-time install is still present; only the bring-up is gone.
        let spec = buildspec::compile(&descriptor).unwrap();
        assert!(spec.render().contains("tailscale.com/install.sh"));
    }
}

/// Descriptor validation happens before anything is compiled or written
mod validation {
    use super::*;

    #[test]
    fn test_invalid_descriptor_fails_before_compilation() {
        let result = EnvironmentDescriptor::builder("integration-env")
            .framework(Framework::Python)
            .build();

        assert!(matches!(
            result,
            Err(devcrate::DevcrateError::InvalidDescriptor(_))
        ));
    }

    #[test]
    fn test_nonexistent_import_path_rejected() {
        let result = EnvironmentDescriptor::builder("integration-env")
            .framework(Framework::StaticHtml)
            .import_path("/no/such/dir")
            .build();

        assert!(result.is_err());
    }
}

use std::path::Path;

use anyhow::Result;
use dialoguer::{theme::ColorfulTheme, Input, MultiSelect, Password, Select};
use secrecy::SecretString;

use crate::descriptor::{
    DependencySource, EnvironmentDescriptor, Framework, SUPPORTED_PYTHON_VERSIONS,
};
use crate::features::{Feature, CANONICAL_ORDER};

/// Interactive wizard collecting every descriptor choice for one environment.
pub struct CreateWizard;

impl CreateWizard {
    pub fn run(name: &str) -> Result<EnvironmentDescriptor> {
        let framework = Self::select_framework()?;

        let mut builder = EnvironmentDescriptor::builder(name).framework(framework);

        if framework == Framework::Python {
            builder = builder.python_version(Self::select_python_version()?);

            let requirements: String = Input::with_theme(&ColorfulTheme::default())
                .with_prompt(
                    "pip requirements? Space-separated packages, a requirements file path, or empty for none",
                )
                .allow_empty(true)
                .interact_text()?;
            builder = builder.dependency_source(DependencySource::resolve(&requirements));
        }

        let import_dir: String = Input::with_theme(&ColorfulTheme::default())
            .with_prompt("Import directory? Path to copy into the container, or empty for none")
            .allow_empty(true)
            .validate_with(|input: &String| {
                if input.trim().is_empty() || Path::new(input.trim()).is_dir() {
                    Ok(())
                } else {
                    Err("Invalid directory path provided")
                }
            })
            .interact_text()?;
        if !import_dir.trim().is_empty() {
            builder = builder.import_path(import_dir.trim());
        }

        let features = Self::select_features()?;
        let wants_tailscale = features.contains(&Feature::Tailscale);
        builder = builder.features(features);

        if wants_tailscale {
            let key = Password::with_theme(&ColorfulTheme::default())
                .with_prompt("Tailscale auth key (empty to skip authentication)")
                .allow_empty_password(true)
                .interact()?;
            if !key.is_empty() {
                builder = builder.tailscale_auth_key(SecretString::new(key));
            }
        }

        Ok(builder.build()?)
    }

    fn select_framework() -> Result<Framework> {
        let frameworks = [
            Framework::Python,
            Framework::StaticHtml,
            Framework::GeneralPurpose,
        ];

        let selection = Select::with_theme(&ColorfulTheme::default())
            .with_prompt("Select a framework")
            .items(&frameworks)
            .default(0)
            .interact()?;

        Ok(frameworks[selection])
    }

    fn select_python_version() -> Result<String> {
        let selection = Select::with_theme(&ColorfulTheme::default())
            .with_prompt("Select a Python version")
            .items(&SUPPORTED_PYTHON_VERSIONS)
            .default(0)
            .interact()?;

        Ok(SUPPORTED_PYTHON_VERSIONS[selection].to_string())
    }

    fn select_features() -> Result<Vec<Feature>> {
        let selections = MultiSelect::with_theme(&ColorfulTheme::default())
            .with_prompt("Select features to include")
            .items(&CANONICAL_ORDER)
            .interact()?;

        Ok(selections
            .into_iter()
            .map(|index| CANONICAL_ORDER[index])
            .collect())
    }
}

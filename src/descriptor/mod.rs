use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};

use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use crate::core::{DevcrateError, DevcrateResult};
use crate::features::Feature;

/// Python versions the wizard offers and the compiler accepts.
pub const SUPPORTED_PYTHON_VERSIONS: [&str; 5] = ["3.9", "3.10", "3.11", "3.12", "3.13"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Framework {
    Python,
    StaticHtml,
    GeneralPurpose,
}

impl fmt::Display for Framework {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Framework::Python => write!(f, "Python"),
            Framework::StaticHtml => write!(f, "Static HTML"),
            Framework::GeneralPurpose => write!(f, "General Purpose"),
        }
    }
}

/// Where the environment's packages come from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DependencySource {
    None,
    FileReference(PathBuf),
    PackageList(Vec<String>),
}

impl Default for DependencySource {
    fn default() -> Self {
        DependencySource::None
    }
}

impl DependencySource {
    /// Classify raw user input: an existing file wins over a package list,
    /// and empty input means no dependencies at all.
    pub fn resolve(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return DependencySource::None;
        }

        let path = Path::new(trimmed);
        if path.is_file() {
            let absolute = path
                .canonicalize()
                .unwrap_or_else(|_| path.to_path_buf());
            return DependencySource::FileReference(absolute);
        }

        DependencySource::PackageList(
            trimmed.split_whitespace().map(str::to_string).collect(),
        )
    }

    pub fn is_none(&self) -> bool {
        matches!(self, DependencySource::None)
    }
}

/// Validated, immutable description of one dev container. Built once per
/// invocation, consumed by the build-spec and runtime-spec compilers, and
/// discarded after the container is launched.
#[derive(Debug, Clone)]
pub struct EnvironmentDescriptor {
    pub name: String,
    pub framework: Framework,
    pub python_version: Option<String>,
    pub dependency_source: DependencySource,
    pub import_path: Option<PathBuf>,
    pub features: BTreeSet<Feature>,
    pub tailscale_auth_key: Option<SecretString>,
}

impl EnvironmentDescriptor {
    pub fn builder(name: impl Into<String>) -> DescriptorBuilder {
        DescriptorBuilder::new(name)
    }

    /// Re-check the invariants the builder enforced. The compiler calls this
    /// defensively; a failure here means a descriptor was constructed by hand
    /// and skipped validation.
    pub fn validate(&self) -> DevcrateResult<()> {
        match (self.framework, &self.python_version) {
            (Framework::Python, None) => {
                return Err(DevcrateError::InvalidDescriptor(
                    "Python framework requires a Python version".to_string(),
                ));
            }
            (Framework::Python, Some(version)) => {
                if !SUPPORTED_PYTHON_VERSIONS.contains(&version.as_str()) {
                    return Err(DevcrateError::InvalidDescriptor(format!(
                        "Unsupported Python version: {}",
                        version
                    )));
                }
            }
            (_, Some(_)) => {
                return Err(DevcrateError::InvalidDescriptor(
                    "A Python version is only valid for the Python framework".to_string(),
                ));
            }
            (_, None) => {}
        }

        if self.framework != Framework::Python && !self.dependency_source.is_none() {
            return Err(DevcrateError::InvalidDescriptor(format!(
                "Dependencies are only supported for the Python framework, not {}",
                self.framework
            )));
        }

        if let Some(path) = &self.import_path {
            if !path.is_dir() {
                return Err(DevcrateError::InvalidDescriptor(format!(
                    "Import path is not an existing directory: {}",
                    path.display()
                )));
            }
        }

        Ok(())
    }
}

/// Builder collecting user choices before validation. `build` is the only way
/// to obtain a descriptor, so every descriptor in the pipeline is valid.
#[derive(Debug, Default)]
pub struct DescriptorBuilder {
    name: String,
    framework: Option<Framework>,
    python_version: Option<String>,
    dependency_source: DependencySource,
    import_path: Option<PathBuf>,
    features: BTreeSet<Feature>,
    tailscale_auth_key: Option<SecretString>,
}

impl DescriptorBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn framework(mut self, framework: Framework) -> Self {
        self.framework = Some(framework);
        self
    }

    pub fn python_version(mut self, version: impl Into<String>) -> Self {
        self.python_version = Some(version.into());
        self
    }

    pub fn dependency_source(mut self, source: DependencySource) -> Self {
        self.dependency_source = source;
        self
    }

    pub fn import_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.import_path = Some(path.into());
        self
    }

    /// Add features in any order; the set keeps them deduplicated and the
    /// compilers apply the canonical ordering regardless of insertion order.
    pub fn features<I>(mut self, features: I) -> Self
    where
        I: IntoIterator<Item = Feature>,
    {
        self.features.extend(features);
        self
    }

    pub fn feature(mut self, feature: Feature) -> Self {
        self.features.insert(feature);
        self
    }

    pub fn tailscale_auth_key(mut self, key: SecretString) -> Self {
        self.tailscale_auth_key = Some(key);
        self
    }

    pub fn build(self) -> DevcrateResult<EnvironmentDescriptor> {
        let framework = self.framework.ok_or_else(|| {
            DevcrateError::InvalidDescriptor("A framework must be selected".to_string())
        })?;

        // The path flows verbatim into a COPY instruction, so it must be
        // absolute. Nonexistent paths are left as given for validate to
        // reject with the original text.
        let import_path = self
            .import_path
            .map(|path| path.canonicalize().unwrap_or(path));

        let descriptor = EnvironmentDescriptor {
            name: self.name,
            framework,
            python_version: self.python_version,
            dependency_source: self.dependency_source,
            import_path,
            features: self.features,
            tailscale_auth_key: self.tailscale_auth_key,
        };

        descriptor.validate()?;
        Ok(descriptor)
    }
}

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::DevcrateResult;
use crate::descriptor::{DependencySource, EnvironmentDescriptor, Framework};
use crate::features::CANONICAL_ORDER;

/// Working directory set inside every generated image.
pub const WORKDIR: &str = "/app";

/// Fixed in-context name dependency files are copied to.
pub const REQUIREMENTS_FILE: &str = "requirements.txt";

/// Default base images for frameworks without a version-selected runtime.
pub const STATIC_HTML_BASE_IMAGE: &str = "nginx:alpine";
pub const GENERAL_PURPOSE_BASE_IMAGE: &str = "debian:bookworm-slim";

/// One step of the image-build specification, rendered keyword-first as a
/// single Dockerfile line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Instruction {
    From(String),
    Workdir(String),
    Copy { source: String, dest: String },
    Run(String),
    Expose(u16),
}

impl Instruction {
    pub fn run(command: impl Into<String>) -> Self {
        Instruction::Run(command.into())
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instruction::From(image) => write!(f, "FROM {}", image),
            Instruction::Workdir(dir) => write!(f, "WORKDIR {}", dir),
            Instruction::Copy { source, dest } => write!(f, "COPY {} {}", source, dest),
            Instruction::Run(command) => write!(f, "RUN {}", command),
            Instruction::Expose(port) => write!(f, "EXPOSE {}", port),
        }
    }
}

/// Append-only ordered sequence of build instructions. Produced once,
/// rendered to Dockerfile text, and handed unchanged to the image build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildSpec {
    instructions: Vec<Instruction>,
}

impl BuildSpec {
    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    /// Render to Dockerfile text, one instruction per line.
    pub fn render(&self) -> String {
        let mut text = String::new();
        for instruction in &self.instructions {
            text.push_str(&instruction.to_string());
            text.push('\n');
        }
        text
    }
}

/// Compile a descriptor into its build specification. Pure: identical
/// descriptors always compile to byte-identical output.
pub fn compile(descriptor: &EnvironmentDescriptor) -> DevcrateResult<BuildSpec> {
    // Should be unreachable when the descriptor came through the builder.
    descriptor.validate()?;

    let mut instructions = Vec::new();

    instructions.push(Instruction::From(base_image(descriptor)));
    instructions.push(Instruction::Workdir(WORKDIR.to_string()));
    instructions.extend(dependency_instructions(&descriptor.dependency_source));

    if let Some(import_path) = &descriptor.import_path {
        instructions.push(Instruction::Copy {
            source: import_path.display().to_string(),
            dest: format!("{}/", WORKDIR),
        });
    }

    for feature in CANONICAL_ORDER {
        if descriptor.features.contains(&feature) {
            instructions.extend(feature.build_instructions());
        }
    }

    Ok(BuildSpec { instructions })
}

fn base_image(descriptor: &EnvironmentDescriptor) -> String {
    match descriptor.framework {
        Framework::Python => {
            // Validation guarantees the version is present and supported.
            let version = descriptor.python_version.as_deref().unwrap_or_default();
            format!("python:{}", version)
        }
        Framework::StaticHtml => STATIC_HTML_BASE_IMAGE.to_string(),
        Framework::GeneralPurpose => GENERAL_PURPOSE_BASE_IMAGE.to_string(),
    }
}

fn dependency_instructions(source: &DependencySource) -> Vec<Instruction> {
    match source {
        DependencySource::None => vec![],
        DependencySource::FileReference(path) => vec![
            Instruction::Copy {
                source: path.display().to_string(),
                dest: format!("{}/{}", WORKDIR, REQUIREMENTS_FILE),
            },
            Instruction::run(format!("pip install -r {}", REQUIREMENTS_FILE)),
        ],
        // One instruction, names space-joined in the order given. pip
        // resolution can be order-sensitive, so the order is preserved.
        DependencySource::PackageList(packages) => {
            vec![Instruction::run(format!(
                "pip install {}",
                packages.join(" ")
            ))]
        }
    }
}

/// Persist the rendered spec as a plain Dockerfile inside the build context.
pub fn write_dockerfile(spec: &BuildSpec, context_dir: &Path, name: &str) -> DevcrateResult<()> {
    std::fs::write(context_dir.join(name), spec.render())?;
    Ok(())
}

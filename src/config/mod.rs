use serde::Deserialize;

/// Process-level settings, loaded from an optional `devcrate.toml` and
/// `DEVCRATE_*` environment variables. Nothing here affects compiled output
/// beyond file naming, so determinism is preserved.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub log_level: String,
    pub dockerfile_name: String,
    pub image_tag_prefix: String,
}

impl Settings {
    pub fn new() -> Result<Self, config::ConfigError> {
        let settings = config::Config::builder()
            .set_default("log_level", "info")?
            .set_default("dockerfile_name", "Dockerfile")?
            .set_default("image_tag_prefix", "devcrate")?
            .add_source(config::File::with_name("devcrate").required(false))
            .add_source(config::Environment::with_prefix("DEVCRATE"))
            .build()?;

        settings.try_deserialize()
    }

    /// Image tag for a named environment, e.g. `devcrate/my-env`.
    pub fn image_tag(&self, name: &str) -> String {
        format!("{}/{}", self.image_tag_prefix, name)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            dockerfile_name: "Dockerfile".to_string(),
            image_tag_prefix: "devcrate".to_string(),
        }
    }
}

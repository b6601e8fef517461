use serde::Deserialize;

/// Image serving configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ImagesConfig {
    /// Where missing images redirect to.
    #[serde(default = "default_placeholder_path")]
    pub placeholder_path: String,
    /// Largest width or height a placeholder may be requested at.
    #[serde(default = "default_max_placeholder_dimension")]
    pub max_placeholder_dimension: u32,
    /// `max-age` for stored images, in seconds.
    #[serde(default = "default_image_max_age")]
    pub image_max_age_seconds: u64,
    /// `max-age` for generated placeholders, in seconds.
    #[serde(default = "default_placeholder_max_age")]
    pub placeholder_max_age_seconds: u64,
}

impl Default for ImagesConfig {
    fn default() -> Self {
        Self {
            placeholder_path: default_placeholder_path(),
            max_placeholder_dimension: default_max_placeholder_dimension(),
            image_max_age_seconds: default_image_max_age(),
            placeholder_max_age_seconds: default_placeholder_max_age(),
        }
    }
}

fn default_placeholder_path() -> String {
    "/images/placeholder".to_owned()
}

fn default_max_placeholder_dimension() -> u32 {
    4096
}

fn default_image_max_age() -> u64 {
    31_536_000
}

fn default_placeholder_max_age() -> u64 {
    86_400
}

use std::path::PathBuf;

/// Everything that can go wrong while configuring or editing a pass chain.
///
/// Running a correctly sized chain never fails; these errors come from
/// configuration, asset loading, and rejected parameter writes.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("no pass with id {0}")]
    UnknownPass(u32),

    #[error("pass `{pass}` has no parameter `{name}`")]
    UnknownParameter { pass: String, name: String },

    #[error("parameter `{name}` holds a {expected}, got a {got}")]
    ParameterType {
        name: String,
        expected: &'static str,
        got: &'static str,
    },

    #[error("pass `{0}` declares more than {max} uniforms", max = crate::uniforms::MAX_UNIFORM_SLOTS)]
    TooManyUniforms(String),

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid pipeline config: {0}")]
    Config(#[from] serde_json::Error),

    #[error("failed to load image {}: {source}", path.display())]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

pub type Result<T> = std::result::Result<T, Error>;

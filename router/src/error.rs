use groute_common::db::DesignError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RouteError {
    #[error("min_routing_layer {min} is out of range for a design with {layers} layers")]
    InvalidMinLayer { min: usize, layers: usize },
    #[error(transparent)]
    Design(#[from] DesignError),
    #[error("failed to write '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl RouteError {
    pub(crate) fn io(path: impl AsRef<std::path::Path>, source: std::io::Error) -> Self {
        RouteError::Io {
            path: path.as_ref().display().to_string(),
            source,
        }
    }
}

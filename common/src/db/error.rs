use thiserror::Error;

#[derive(Debug, Error)]
pub enum DesignError {
    #[error("failed to access design file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid design syntax in '{path}': {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
    #[error("failed to serialize design: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("design has no routing layers")]
    NoLayers,
    #[error("gridlines along {dim} need at least two entries, found {count}")]
    TooFewGridlines { dim: char, count: usize },
    #[error("gridlines along {dim} are not strictly increasing")]
    UnsortedGridlines { dim: char },
    #[error("layer '{layer}' has non-positive pitch {pitch}")]
    BadPitch { layer: String, pitch: i32 },
    #[error("pin '{pin}' of net '{net}' has no access points")]
    NoAccessPoints { net: String, pin: String },
    #[error("access point {point} of net '{net}' lies outside the {x_size}x{y_size}x{layers} grid")]
    AccessPointOutOfGrid {
        net: String,
        point: crate::geom::GrPoint,
        x_size: usize,
        y_size: usize,
        layers: usize,
    },
    #[error("obstacle {index} references missing layer {layer}")]
    ObstacleLayer { index: usize, layer: usize },
}

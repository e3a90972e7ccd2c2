use crate::db::error::DesignError;
use crate::geom::{GrPoint, Interval, Rect};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayerDirection {
    Horizontal,
    Vertical,
}

impl LayerDirection {
    /// Dimension the wires of this layer run along (0 = x, 1 = y).
    #[inline(always)]
    pub fn index(self) -> usize {
        match self {
            LayerDirection::Horizontal => 0,
            LayerDirection::Vertical => 1,
        }
    }

}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MetalLayer {
    pub name: String,
    pub direction: LayerDirection,
    pub pitch: i32,
    #[serde(default)]
    pub track_offset: i32,
    pub width: i32,
    #[serde(default)]
    pub min_length: i32,
    #[serde(default)]
    pub parallel_spacing: i32,
    /// Fraction of the capacity withheld from the router.
    #[serde(default)]
    pub adjustment: f64,
}

impl MetalLayer {
    /// Indices of the tracks whose location falls inside `range`.
    pub fn track_range(&self, range: Interval) -> Interval {
        if !range.is_valid() || self.pitch <= 0 {
            return Interval::EMPTY;
        }
        let first = (range.low - self.track_offset + self.pitch - 1).div_euclid(self.pitch);
        let last = (range.high - self.track_offset).div_euclid(self.pitch);
        Interval::new(first.max(0), last)
    }

    pub fn track_location(&self, track: i32) -> i32 {
        self.track_offset + track * self.pitch
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Pin {
    pub name: String,
    /// Candidate gcells overlapped by the pin shape.
    pub access_points: Vec<GrPoint>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Net {
    pub name: String,
    pub pins: Vec<Pin>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layer_range: Option<Interval>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Obstacle {
    pub layer: usize,
    pub rect: Rect,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Design {
    pub name: String,
    #[serde(default = "default_lib_dbu")]
    pub lib_dbu: i32,
    /// Gcell boundaries along x and y in design units.
    pub gridlines: [Vec<i32>; 2],
    pub layers: Vec<MetalLayer>,
    #[serde(default)]
    pub nets: Vec<Net>,
    #[serde(default)]
    pub obstacles: Vec<Obstacle>,
}

fn default_lib_dbu() -> i32 {
    1000
}

impl Design {
    /// Square gcells of `gcell_size` units, layers alternating from a
    /// horizontal layer 0, one track per gcell on every layer.
    pub fn uniform(
        name: &str,
        x_cells: usize,
        y_cells: usize,
        gcell_size: i32,
        num_layers: usize,
    ) -> Self {
        let xs = (0..=x_cells as i32).map(|i| i * gcell_size).collect();
        let ys = (0..=y_cells as i32).map(|i| i * gcell_size).collect();
        let layers = (0..num_layers)
            .map(|i| MetalLayer {
                name: format!("M{}", i + 1),
                direction: if i % 2 == 0 {
                    LayerDirection::Horizontal
                } else {
                    LayerDirection::Vertical
                },
                pitch: gcell_size,
                track_offset: gcell_size / 2,
                width: gcell_size / 2,
                min_length: 0,
                parallel_spacing: 0,
                adjustment: 0.0,
            })
            .collect();
        Self {
            name: name.to_string(),
            lib_dbu: default_lib_dbu(),
            gridlines: [xs, ys],
            layers,
            nets: Vec::new(),
            obstacles: Vec::new(),
        }
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, DesignError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| DesignError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let design: Design = toml::from_str(&text).map_err(|source| DesignError::Parse {
            path: path.display().to_string(),
            source,
        })?;
        design.validate()?;
        Ok(design)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), DesignError> {
        let path = path.as_ref();
        let text = toml::to_string(self)?;
        std::fs::write(path, text).map_err(|source| DesignError::Io {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn x_size(&self) -> usize {
        self.gridlines[0].len().saturating_sub(1)
    }

    pub fn y_size(&self) -> usize {
        self.gridlines[1].len().saturating_sub(1)
    }

    pub fn num_layers(&self) -> usize {
        self.layers.len()
    }

    /// Pitch used to normalise wire lengths: layer 1 when present.
    pub fn m2_pitch(&self) -> i32 {
        self.layers
            .get(1)
            .or_else(|| self.layers.first())
            .map(|l| l.pitch)
            .unwrap_or(1)
            .max(1)
    }

    pub fn add_net(&mut self, name: &str, pins: Vec<Vec<GrPoint>>) -> usize {
        let id = self.nets.len();
        self.nets.push(Net {
            name: name.to_string(),
            pins: pins
                .into_iter()
                .enumerate()
                .map(|(i, access_points)| Pin {
                    name: format!("p{}", i),
                    access_points,
                })
                .collect(),
            layer_range: None,
        });
        id
    }

    pub fn validate(&self) -> Result<(), DesignError> {
        if self.layers.is_empty() {
            return Err(DesignError::NoLayers);
        }
        for (dim, lines) in self.gridlines.iter().enumerate() {
            let dim_name = if dim == 0 { 'x' } else { 'y' };
            if lines.len() < 2 {
                return Err(DesignError::TooFewGridlines {
                    dim: dim_name,
                    count: lines.len(),
                });
            }
            if lines.windows(2).any(|w| w[0] >= w[1]) {
                return Err(DesignError::UnsortedGridlines { dim: dim_name });
            }
        }
        for layer in &self.layers {
            if layer.pitch <= 0 {
                return Err(DesignError::BadPitch {
                    layer: layer.name.clone(),
                    pitch: layer.pitch,
                });
            }
        }
        let (x_size, y_size, layers) = (self.x_size(), self.y_size(), self.num_layers());
        for net in &self.nets {
            for pin in &net.pins {
                if pin.access_points.is_empty() {
                    return Err(DesignError::NoAccessPoints {
                        net: net.name.clone(),
                        pin: pin.name.clone(),
                    });
                }
                for ap in &pin.access_points {
                    if ap.layer >= layers
                        || ap.x < 0
                        || ap.y < 0
                        || ap.x as usize >= x_size
                        || ap.y as usize >= y_size
                    {
                        return Err(DesignError::AccessPointOutOfGrid {
                            net: net.name.clone(),
                            point: *ap,
                            x_size,
                            y_size,
                            layers,
                        });
                    }
                }
            }
        }
        for (index, obs) in self.obstacles.iter().enumerate() {
            if obs.layer >= layers {
                return Err(DesignError::ObstacleLayer {
                    index,
                    layer: obs.layer,
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_design_alternates_directions() {
        let design = Design::uniform("u", 4, 3, 10, 3);
        assert_eq!(design.x_size(), 4);
        assert_eq!(design.y_size(), 3);
        assert_eq!(design.layers[0].direction, LayerDirection::Horizontal);
        assert_eq!(design.layers[1].direction, LayerDirection::Vertical);
        assert!(design.validate().is_ok());
    }

    #[test]
    fn track_range_counts_tracks_inside() {
        let design = Design::uniform("u", 4, 4, 10, 2);
        let layer = &design.layers[0];
        assert_eq!(layer.track_range(Interval::new(0, 10)), Interval::new(0, 0));
        assert_eq!(layer.track_range(Interval::new(0, 30)), Interval::new(0, 2));
        assert!(!layer.track_range(Interval::new(6, 14)).is_valid());
    }

    #[test]
    fn validate_rejects_out_of_grid_pins() {
        let mut design = Design::uniform("u", 4, 4, 10, 2);
        design.add_net("n", vec![vec![GrPoint::new(0, 4, 0)]]);
        assert!(matches!(
            design.validate(),
            Err(DesignError::AccessPointOutOfGrid { .. })
        ));
    }

    #[test]
    fn toml_round_trip_keeps_nets() {
        let mut design = Design::uniform("u", 4, 4, 10, 2);
        design.add_net(
            "n",
            vec![vec![GrPoint::new(0, 1, 1)], vec![GrPoint::new(0, 3, 2)]],
        );
        let text = toml::to_string(&design).unwrap();
        let back: Design = toml::from_str(&text).unwrap();
        assert_eq!(back.nets.len(), 1);
        assert_eq!(back.nets[0].pins[1].access_points[0], GrPoint::new(0, 3, 2));
    }
}

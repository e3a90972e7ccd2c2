use crate::db::design::Design;
use crate::db::error::DesignError;
use crate::geom::GrPoint;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub struct BenchmarkSpec {
    pub x_cells: usize,
    pub y_cells: usize,
    pub num_layers: usize,
    pub num_nets: usize,
    pub max_pins: usize,
    pub gcell_size: i32,
    pub seed: u64,
}

/// Random design whose nets are clustered inside small windows, with pins on
/// layer 0 and up to two candidate access cells per pin.
pub fn generate_random_design(spec: &BenchmarkSpec) -> Design {
    let mut rng = StdRng::seed_from_u64(spec.seed);
    let mut design = Design::uniform(
        "random",
        spec.x_cells,
        spec.y_cells,
        spec.gcell_size,
        spec.num_layers.max(2),
    );

    let w = spec.x_cells as i32;
    let h = spec.y_cells as i32;
    let window = (w.min(h) / 4).max(2);
    let max_pins = spec.max_pins.max(2);

    log::info!(
        "Generating Benchmark: {} nets on {}x{} gcells, {} layers",
        spec.num_nets,
        w,
        h,
        design.num_layers()
    );

    for net_index in 0..spec.num_nets {
        let cx = rng.gen_range(0..w);
        let cy = rng.gen_range(0..h);
        let degree = if rng.gen_bool(0.7) {
            2
        } else {
            rng.gen_range(2..=max_pins)
        };
        let mut pins = Vec::with_capacity(degree);
        for _ in 0..degree {
            let x = (cx + rng.gen_range(-window..=window)).clamp(0, w - 1);
            let y = (cy + rng.gen_range(-window..=window)).clamp(0, h - 1);
            let mut aps = vec![GrPoint::new(0, x, y)];
            if rng.gen_bool(0.3) && x + 1 < w {
                aps.push(GrPoint::new(0, x + 1, y));
            }
            pins.push(aps);
        }
        design.add_net(&format!("net{}", net_index), pins);
    }
    design
}

pub fn generate_random_design_file(spec: &BenchmarkSpec, filename: &str) -> Result<(), DesignError> {
    let design = generate_random_design(spec);
    design.save(filename)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_design_is_valid_and_reproducible() {
        let spec = BenchmarkSpec {
            x_cells: 16,
            y_cells: 12,
            num_layers: 4,
            num_nets: 25,
            max_pins: 5,
            gcell_size: 20,
            seed: 7,
        };
        let a = generate_random_design(&spec);
        let b = generate_random_design(&spec);
        assert!(a.validate().is_ok());
        assert_eq!(a.nets.len(), 25);
        assert_eq!(
            a.nets[3].pins[0].access_points,
            b.nets[3].pins[0].access_points
        );
    }
}

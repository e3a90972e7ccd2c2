use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub global_routing: GlobalRoutingConfig,
    #[serde(default)]
    pub input: InputConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GlobalRoutingConfig {
    #[serde(default = "default_min_routing_layer")]
    pub min_routing_layer: usize,
    #[serde(default = "default_weight_wire_length")]
    pub weight_wire_length: f64,
    #[serde(default = "default_weight_via_number")]
    pub weight_via_number: f64,
    #[serde(default = "default_weight_short_area")]
    pub weight_short_area: f64,
    #[serde(default = "default_cost_logistic_slope")]
    pub cost_logistic_slope: f64,
    #[serde(default = "default_maze_logistic_slope")]
    pub maze_logistic_slope: f64,
    #[serde(default = "default_via_multiplier")]
    pub via_multiplier: f64,
    #[serde(default = "default_max_detour_ratio")]
    pub max_detour_ratio: f64,
    #[serde(default = "default_target_detour_count")]
    pub target_detour_count: usize,
    #[serde(default = "default_sparse_interval")]
    pub sparse_interval: usize,
    /// Extra layers above a pin's own layers it may be entered from.
    #[serde(default = "default_pin_layer_slack")]
    pub pin_layer_slack: usize,
}

impl Default for GlobalRoutingConfig {
    fn default() -> Self {
        Self {
            min_routing_layer: default_min_routing_layer(),
            weight_wire_length: default_weight_wire_length(),
            weight_via_number: default_weight_via_number(),
            weight_short_area: default_weight_short_area(),
            cost_logistic_slope: default_cost_logistic_slope(),
            maze_logistic_slope: default_maze_logistic_slope(),
            via_multiplier: default_via_multiplier(),
            max_detour_ratio: default_max_detour_ratio(),
            target_detour_count: default_target_detour_count(),
            sparse_interval: default_sparse_interval(),
            pin_layer_slack: default_pin_layer_slack(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct InputConfig {
    #[serde(default = "default_design_file")]
    pub design_file: String,
    #[serde(default = "default_guide_file")]
    pub guide_file: String,
    #[serde(default = "default_heatmap_file")]
    pub heatmap_file: String,
    #[serde(default)]
    pub congestion_image: Option<String>,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            design_file: default_design_file(),
            guide_file: default_guide_file(),
            heatmap_file: default_heatmap_file(),
            congestion_image: None,
        }
    }
}

fn default_min_routing_layer() -> usize {
    1
}

fn default_weight_wire_length() -> f64 {
    0.5
}

fn default_weight_via_number() -> f64 {
    4.0
}

fn default_weight_short_area() -> f64 {
    500.0
}

fn default_cost_logistic_slope() -> f64 {
    1.0
}

fn default_maze_logistic_slope() -> f64 {
    0.5
}

fn default_via_multiplier() -> f64 {
    2.0
}

fn default_max_detour_ratio() -> f64 {
    0.25
}

fn default_target_detour_count() -> usize {
    20
}

fn default_sparse_interval() -> usize {
    10
}

fn default_pin_layer_slack() -> usize {
    2
}

fn default_design_file() -> String {
    "inputs/design.toml".to_string()
}

fn default_guide_file() -> String {
    "output/route.guide".to_string()
}

fn default_heatmap_file() -> String {
    "output/heatmap.txt".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_toml_falls_back_to_defaults() {
        let config: Config = toml::from_str(
            r#"
            [global_routing]
            min_routing_layer = 2
            maze_logistic_slope = 1.5
            "#,
        )
        .unwrap();
        assert_eq!(config.global_routing.min_routing_layer, 2);
        assert_eq!(config.global_routing.maze_logistic_slope, 1.5);
        assert_eq!(config.global_routing.target_detour_count, 20);
        assert_eq!(config.input.guide_file, "output/route.guide");
    }
}

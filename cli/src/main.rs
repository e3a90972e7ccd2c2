use anyhow::Context;
use clap::{Parser, Subcommand};
use groute_common::db::Design;
use groute_common::util::config::Config;
use groute_common::util::generator::{self, BenchmarkSpec};
use groute_common::util::{logger, visualization};
use groute_router::GlobalRouter;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Route the design named in the configuration.
    Route,
    /// Write a random benchmark design.
    Generate {
        #[arg(long, default_value_t = 64)]
        cols: usize,
        #[arg(long, default_value_t = 64)]
        rows: usize,
        #[arg(long, default_value_t = 6)]
        layers: usize,
        #[arg(long, default_value_t = 500)]
        nets: usize,
        #[arg(long, default_value_t = 6)]
        max_pins: usize,
        #[arg(long, default_value_t = 1)]
        seed: u64,
        #[arg(long, default_value = "inputs/design.toml")]
        output: String,
    },
}

fn main() -> anyhow::Result<()> {
    logger::init();
    let args = Args::parse();

    let config = if args.config.exists() {
        log::info!("Loading configuration from {:?}", args.config);
        let config_str = std::fs::read_to_string(&args.config)
            .with_context(|| format!("Failed to read config file {:?}", args.config))?;
        toml::from_str(&config_str).context("Failed to parse config TOML")?
    } else {
        log::warn!(
            "Configuration file {:?} not found. Using internal defaults.",
            args.config
        );
        Config::default()
    };

    match args.command.unwrap_or(Commands::Route) {
        Commands::Generate {
            cols,
            rows,
            layers,
            nets,
            max_pins,
            seed,
            output,
        } => {
            prepare_output_dir(&output)?;
            let spec = BenchmarkSpec {
                x_cells: cols,
                y_cells: rows,
                num_layers: layers,
                num_nets: nets,
                max_pins,
                gcell_size: 100,
                seed,
            };
            generator::generate_random_design_file(&spec, &output)
                .with_context(|| format!("Failed to write benchmark '{}'", output))?;
            log::info!("Generated: {}", output);
        }
        Commands::Route => run_routing(&config)?,
    }

    Ok(())
}

fn prepare_output_dir(path_str: &str) -> anyhow::Result<()> {
    if let Some(parent) = Path::new(path_str).parent()
        && !parent.exists()
        && !parent.as_os_str().is_empty()
    {
        log::info!("Creating output directory: {:?}", parent);
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}

fn run_routing(config: &Config) -> anyhow::Result<()> {
    let input = &config.input;
    if !Path::new(&input.design_file).exists() {
        anyhow::bail!(
            "Design file missing: '{}'. Run 'generate' first or set input.design_file.",
            input.design_file
        );
    }

    log::info!("Loading design: {}", input.design_file);
    let design = Design::load(&input.design_file)?;
    log::info!(
        "Design '{}': {} x {} gcells, {} layers, {} nets",
        design.name,
        design.x_size(),
        design.y_size(),
        design.num_layers(),
        design.nets.len()
    );

    let mut router = GlobalRouter::new(&design, &config.global_routing)?;
    let stats = router.route();

    prepare_output_dir(&input.guide_file)?;
    router.write_guides(&input.guide_file)?;
    prepare_output_dir(&input.heatmap_file)?;
    router.write_heatmap(&input.heatmap_file)?;

    if let Some(image) = &input.congestion_image {
        prepare_output_dir(image)?;
        log::info!("Generating congestion map: {}", image);
        let graph = router.graph();
        visualization::draw_congestion_map(
            &graph.utilization_map(),
            graph.x_size(),
            graph.y_size(),
            image,
            1000,
            1000,
        )
        .with_context(|| format!("Failed to write congestion image '{}'", image))?;
    }

    println!(
        "routed {} nets: wire length {} ({:.1} pitches), {} vias, overflow {:.2}, {} overflowed nets",
        router.nets().len(),
        stats.wire_length,
        stats.wire_length_metric,
        stats.num_vias,
        stats.total_overflow,
        stats.overflowed_nets()
    );
    Ok(())
}

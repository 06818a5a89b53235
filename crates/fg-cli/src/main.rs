use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "fieldgate")]
#[command(about = "Field worker geofence verification CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute layered config hash + print canonical JSON
    ConfigHash {
        /// Paths in merge order (base first, overrides after)
        #[arg(required = true)]
        paths: Vec<String>,
    },

    /// List the zone directory
    Zones {
        /// Layered config paths in merge order
        #[arg(long = "config", required = true)]
        config_paths: Vec<String>,
    },

    /// Verify one fix for an actor and print the gate decision.
    /// Exit code 0 when permitted, 2 when refused.
    Check {
        /// Layered config paths in merge order
        #[arg(long = "config", required = true)]
        config_paths: Vec<String>,

        /// Actor id from the directory
        #[arg(long)]
        actor: String,

        #[arg(long, allow_hyphen_values = true)]
        lat: f64,

        #[arg(long, allow_hyphen_values = true)]
        lon: f64,

        /// Reported accuracy radius in meters
        #[arg(long, default_value_t = 10.0)]
        accuracy: f64,

        /// Match against the actor's assigned children's homes instead of
        /// the actor's own zones
        #[arg(long = "time-in", default_value_t = false)]
        time_in: bool,
    },

    /// Great-circle distance between two points, in meters
    Distance {
        /// "lat,lon"
        #[arg(long, allow_hyphen_values = true)]
        from: String,

        /// "lat,lon"
        #[arg(long, allow_hyphen_values = true)]
        to: String,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Load .env.local if present (dev convenience); silent when missing.
    let _ = dotenvy::from_filename(".env.local");
    commands::init_tracing();

    let cli = Cli::parse();

    match cli.cmd {
        Commands::ConfigHash { paths } => {
            let path_refs: Vec<&str> = paths.iter().map(|s| s.as_str()).collect();
            let loaded = fg_config::load_layered_yaml(&path_refs)?;
            println!("config_hash={}", loaded.config_hash);
            println!("{}", loaded.canonical_json);
        }

        Commands::Zones { config_paths } => {
            let (config, hash) = commands::load_config(&config_paths)?;
            println!("config_hash={}", hash);
            println!("zones={}", config.zones.len());
            for z in &config.zones {
                println!(
                    "{}\t{}\t{}\tradius_m={}",
                    z.id, z.display_name, z.center, z.radius_meters
                );
            }
        }

        Commands::Check {
            config_paths,
            actor,
            lat,
            lon,
            accuracy,
            time_in,
        } => {
            let args = commands::check::CheckArgs {
                config_paths,
                actor,
                lat,
                lon,
                accuracy,
                time_in,
            };
            let permitted = commands::check::run(args).await?;
            if !permitted {
                return Ok(ExitCode::from(2));
            }
        }

        Commands::Distance { from, to } => {
            let a = commands::parse_lat_lon(&from)?;
            let b = commands::parse_lat_lon(&to)?;
            println!("distance_meters={:.1}", fg_geo::distance_meters(a, b));
        }
    }

    Ok(ExitCode::SUCCESS)
}

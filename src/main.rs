// src/main.rs
//! gps-update - publish the live GPS position to a KML file

use anyhow::Context;
use clap::{Parser, Subcommand};
use gps_update::{config::GpsConfig, logging, PositionUpdater};
use tracing::info;

#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
struct Args {
    /// KML file to keep updated
    #[arg(short, long)]
    output: Option<String>,

    /// Placemark name
    #[arg(long)]
    name: Option<String>,

    /// Placemark description
    #[arg(long)]
    description: Option<String>,

    /// Camera distance from the position, in metres
    #[arg(long)]
    range: Option<f64>,

    /// Camera tilt in degrees
    #[arg(long)]
    tilt: Option<f64>,

    /// Camera heading in degrees
    #[arg(long)]
    heading: Option<f64>,

    /// Skip NMEA checksum verification
    #[arg(long)]
    no_checksum: bool,

    /// Store the effective settings as the new defaults
    #[arg(long)]
    save_config: bool,

    /// Log debug output
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    source: Option<SourceCommand>,
}

#[derive(Debug, Subcommand)]
enum SourceCommand {
    /// Read fixes from a gpsd daemon
    Gpsd {
        #[arg(long, default_value = "localhost")]
        host: String,
        #[arg(long, default_value_t = gps_update::gps::gpsd::GPSD_PORT)]
        port: u16,
    },
    /// Read raw NMEA from a TCP socket
    Tcp {
        /// host:port of the NMEA stream
        #[arg(long)]
        address: String,
    },
    /// Read raw NMEA from a serial or RFCOMM device
    Serial {
        #[arg(long)]
        port: String,
        #[arg(long, default_value_t = 9600)]
        baudrate: u32,
    },
}

fn apply_args(config: &mut GpsConfig, args: Args) {
    match args.source {
        Some(SourceCommand::Gpsd { host, port }) => config.update_gpsd(host, port),
        Some(SourceCommand::Tcp { address }) => config.update_tcp(address),
        Some(SourceCommand::Serial { port, baudrate }) => config.update_serial(port, baudrate),
        None => {}
    }

    if let Some(output) = args.output {
        config.output = output;
    }
    if let Some(name) = args.name {
        config.name = name;
    }
    if let Some(description) = args.description {
        config.description = description;
    }
    if let Some(range) = args.range {
        config.range = range;
    }
    if let Some(tilt) = args.tilt {
        config.tilt = tilt;
    }
    if let Some(heading) = args.heading {
        config.heading = heading;
    }
    if args.no_checksum {
        config.checksum = false;
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    logging::init_logging(args.verbose);

    let mut config = GpsConfig::load().context("loading configuration")?;
    let save_config = args.save_config;
    apply_args(&mut config, args);

    if save_config {
        let path = config.save().context("saving configuration")?;
        info!("Configuration saved to {}", path.display());
    }

    let source = config.source()?;
    let settings = config.sink_settings();
    info!("Using {} source", config.source_type);

    let updater = PositionUpdater::new();
    tokio::select! {
        result = updater.start(source, &settings) => result?,
        _ = tokio::signal::ctrl_c() => {
            updater.stop();
            info!("Interrupted, shutting down");
        }
    }

    Ok(())
}

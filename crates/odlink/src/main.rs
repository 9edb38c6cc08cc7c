//! odlink - command-line client
//!
//! Opens one device over USB, loads its endpoint schema and runs a single
//! command against the session.

mod config;
mod render;
mod usb;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use odlink_usb::Session;
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "odlink")]
#[command(about = "Talk to ODrive-style motor controllers over USB")]
#[command(version)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "odlink.toml")]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Device index used in full paths (odrv<index>)
    #[arg(short, long)]
    index: Option<u32>,

    /// Serial number of the device to open
    #[arg(short, long)]
    serial: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the endpoint tree
    List,
    /// Read an endpoint
    Get { identifier: String },
    /// Write an endpoint
    Set { identifier: String, value: String },
    /// Trigger a remote function
    Call { identifier: String },
    /// Read and decode all error registers
    Errors,
    /// Show serial number, firmware version and bus voltage
    Info,
    /// Write the endpoint definitions header
    Export {
        #[arg(short, long, default_value = "endpoints.h")]
        output: PathBuf,
    },
    /// Write a default configuration file and exit
    InitConfig,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    if let Command::InitConfig = args.command {
        config::save_default_config(&args.config)?;
        println!("Wrote {}", args.config.display());
        return Ok(());
    }

    let mut config = config::load_config(&args.config)?;
    if let Some(index) = args.index {
        config.session.device_index = index;
    }
    if let Some(serial) = args.serial {
        config.usb.serial = Some(serial);
    }

    let transport = usb::NusbTransport::open(&config.usb)?;
    let session = Session::new(Box::new(transport), config.session.clone())?;
    if !session.is_usable() {
        bail!("Device did not provide a usable endpoint schema");
    }
    info!(
        crc = %format!("0x{:04X}", session.checksum()),
        endpoints = session.endpoints().len(),
        "Session ready"
    );

    run(&session, args.command)
}

fn run(session: &Session, command: Command) -> Result<()> {
    match command {
        Command::List => {
            print!("{}", render::render_tree(&session.tree()));
        }
        Command::Get { identifier } => {
            let value = session
                .read_value(&identifier)
                .with_context(|| format!("Failed to read {}", identifier))?;
            println!("{}", render::render_value(&identifier, &value));
        }
        Command::Set { identifier, value } => {
            let written = session
                .write_value(&identifier, &value)
                .with_context(|| format!("Failed to write {}", identifier))?;
            println!("{} = {}", identifier, render::render_value(&identifier, &written));
        }
        Command::Call { identifier } => {
            session
                .call(&identifier)
                .with_context(|| format!("Failed to call {}", identifier))?;
            println!("Called {}", identifier);
        }
        Command::Errors => {
            let errors = session.update_errors();
            print!("{}", render::render_errors(&errors));
        }
        Command::Info => {
            let serial = session.serial_number().context("Failed to read serial number")?;
            println!("Serial:   {:012X}", serial);
            match session.firmware_version() {
                Ok(version) => println!("Firmware: {}", version),
                Err(e) => println!("Firmware: unknown ({})", e),
            }
            let vbus = session.vbus_voltage().context("Failed to read bus voltage")?;
            println!("Vbus:     {:.2} V", vbus);
            println!("Schema:   0x{:04X}, {} endpoints", session.checksum(), session.endpoints().len());
        }
        Command::Export { output } => {
            let header = session.export_endpoints().context("Failed to generate header")?;
            std::fs::write(&output, header)
                .with_context(|| format!("Failed to write {}", output.display()))?;
            println!("Wrote {}", output.display());
        }
        // Handled before connecting
        Command::InitConfig => {}
    }
    Ok(())
}

// Audi Connect - Vehicle Cloud Client
// Copyright (C) 2025 Henning Berge
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.


use anyhow::{Context, Result};
use audi_connect::{AudiConnect, ConnectConfig, HeaterSource, HonkFlashMode, UnitSystem};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "audi-connect-cli")]
#[command(about = "Audi connect CLI - query and command your vehicles", long_about = None)]
struct Cli {
    /// myAudi e-mail
    #[arg(short, long)]
    username: String,
    /// myAudi password
    #[arg(short, long)]
    password: String,
    /// Two-letter country code
    #[arg(short, long, default_value = "DE")]
    country: String,
    /// Security PIN for locking and heating
    #[arg(long)]
    spin: Option<String>,
    /// Report distances in miles
    #[arg(long)]
    imperial: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the vehicles of the account
    Vehicles,
    /// Update and print the state of a vehicle as JSON
    Status { vin: String },
    Lock { vin: String },
    Unlock { vin: String },
    /// Start or stop climatisation
    Climate {
        vin: String,
        #[arg(value_enum)]
        action: Switch,
        #[arg(long, value_enum, default_value = "electric")]
        source: Source,
    },
    /// Start or stop charging
    Charge {
        vin: String,
        #[arg(value_enum)]
        action: Switch,
    },
    /// Flash the lights (and honk with --honk)
    Flash {
        vin: String,
        #[arg(long)]
        honk: bool,
        #[arg(long, default_value_t = 15)]
        seconds: u32,
    },
    /// Wake the vehicle and wait for fresh data
    Refresh { vin: String },
}

#[derive(Clone, Copy, ValueEnum)]
enum Switch {
    Start,
    Stop,
}

#[derive(Clone, Copy, ValueEnum)]
enum Source {
    Electric,
    Auxiliary,
    Automatic,
}

impl From<Source> for HeaterSource {
    fn from(source: Source) -> Self {
        match source {
            Source::Electric => HeaterSource::Electric,
            Source::Auxiliary => HeaterSource::Auxiliary,
            Source::Automatic => HeaterSource::Automatic,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    let mut builder = ConnectConfig::builder(cli.username, cli.password).country(cli.country);
    if let Some(spin) = cli.spin {
        builder = builder.spin(spin);
    }
    if cli.imperial {
        builder = builder.unit_system(UnitSystem::Imperial);
    }
    let config = builder.build().context("invalid configuration")?;

    let mut account = AudiConnect::new(config)?;
    account.connect().await.context("login failed")?;
    account.fetch_vehicles().await.context("cannot list vehicles")?;

    match cli.command {
        Commands::Vehicles => {
            for vehicle in account.vehicles() {
                println!(
                    "{}  {}  {}",
                    vehicle.vin,
                    vehicle.title(),
                    vehicle.info.model_year().map(|y| y.to_string()).unwrap_or_default()
                );
            }
        }
        Commands::Status { vin } => {
            account.update_vehicle(&vin).await?;
            let vehicle = account
                .vehicle(&vin)
                .with_context(|| format!("unknown vehicle {}", vin))?;
            println!("{}", serde_json::to_string_pretty(vehicle)?);
        }
        Commands::Lock { vin } => account.set_lock(&vin, true).await?,
        Commands::Unlock { vin } => account.set_lock(&vin, false).await?,
        Commands::Climate { vin, action, source } => {
            account
                .set_climater(&vin, matches!(action, Switch::Start), source.into())
                .await?
        }
        Commands::Charge { vin, action } => {
            account
                .set_battery_charger(&vin, matches!(action, Switch::Start), false)
                .await?
        }
        Commands::Flash { vin, honk, seconds } => {
            // the command needs the parking position
            account.update_vehicle(&vin).await?;
            let mode = if honk { HonkFlashMode::Honk } else { HonkFlashMode::Flash };
            account.set_honkflash(&vin, mode, seconds).await?
        }
        Commands::Refresh { vin } => account.refresh_vehicle_data(&vin).await?,
    }

    Ok(())
}

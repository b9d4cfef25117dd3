use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};

use kodiproxy::config::{Config, DEFAULT_CONFIG_PATH};
use kodiproxy::devices::{AvReceiver, CecClient, DisplayControl, PowerState};
use kodiproxy::logging;

#[derive(Parser, Debug)]
#[command(name = "kodiproxy", version, about)]
struct Args {
    /// Configuration file
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the proxy (default)
    Serve,

    /// Talk to the AV receiver directly
    Receiver {
        #[command(subcommand)]
        action: ReceiverAction,
    },

    /// Talk to the display directly
    Display {
        #[command(subcommand)]
        action: Switch,
    },
}

#[derive(Subcommand, Debug)]
enum ReceiverAction {
    /// Print power, input, volume and mute
    Status,
    On,
    Off,
}

#[derive(Subcommand, Debug, Clone, Copy)]
enum Switch {
    On,
    Off,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = Config::load(&args.config)
        .with_context(|| format!("Failed to load {}", args.config.display()))?;
    logging::init(&config.logging)?;

    match args.command.unwrap_or(Command::Serve) {
        Command::Serve => kodiproxy::run(&config).await,
        Command::Receiver { action } => {
            let receiver = AvReceiver::from_config(&config.receiver)?;
            receiver_command(&receiver, &config.receiver.desired_input, action).await
        }
        Command::Display { action } => {
            let display = CecClient::from_config(&config.display);
            match action {
                Switch::On => display.switch_on().await?,
                Switch::Off => display.standby().await?,
            }
            Ok(())
        }
    }
}

async fn receiver_command(
    receiver: &AvReceiver,
    desired_input: &str,
    action: ReceiverAction,
) -> anyhow::Result<()> {
    match action {
        ReceiverAction::Status => {
            let status = receiver.status().await?;
            let reading = receiver.get_volume().await?;
            println!("state:  {:?}", PowerState::of(&status, desired_input));
            println!("power:  {}", describe(status.power));
            println!("input:  {}", status.input.as_deref().unwrap_or("unknown"));
            println!("volume: {}", describe(reading.percent));
            println!("muted:  {}", describe(reading.muted));
            println!("on {}: {}", desired_input, receiver.get_power().await?);
        }
        ReceiverAction::On => {
            receiver.set_power(true).await?;
            println!("on {}: {}", desired_input, receiver.get_power().await?);
        }
        ReceiverAction::Off => {
            let powered = receiver.set_power(false).await?;
            println!("powered: {}", powered);
        }
    }
    Ok(())
}

fn describe<T: std::fmt::Display>(value: Option<T>) -> String {
    value.map_or_else(|| "unknown".to_string(), |v| v.to_string())
}

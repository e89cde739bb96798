//! pingwarden — network liveness monitor.
//!
//! Pings a host on a fixed interval. After too many consecutive failures it
//! runs the given command, then waits out a cooldown before pinging again.
//! Health transitions can be reported to Home Assistant over MQTT.
//!
//! # Usage
//!
//! ```text
//! pingwarden --host 1.1.1.1 --max-failures 5 -- systemctl restart modem
//! pingwarden --mqtt-uri tcp://broker:1883 --unprivileged -- /usr/local/bin/reset-wan
//! ```

use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info};

use pingwarden_hass::HassSink;
use pingwarden_monitor::{CommandRemediator, IcmpProber, Monitor};

mod cli;
mod logging;

use cli::Cli;

#[tokio::main]
async fn main() -> ExitCode {
    // Help and version exit non-zero as well.
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return ExitCode::from(1);
        }
    };

    logging::init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %format!("{e:#}"), "fatal error");
            ExitCode::from(1)
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let settings = cli.resolve()?;

    let prober = IcmpProber::new(&settings.host, settings.unprivileged)
        .await
        .with_context(|| format!("failed to create pinger for {}", settings.host))?;

    let remediator = CommandRemediator::new().with_timeout(settings.monitor.command_timeout);

    let mut monitor = Monitor::new(settings.monitor, Box::new(prober), Box::new(remediator))?;

    if let Some(hass) = &settings.hass {
        let sink = HassSink::connect(hass)
            .await
            .context("failed to set up home assistant reporting")?;
        info!(topic = %sink.topics().state, "reporting status to home assistant");
        monitor = monitor.with_sink(Box::new(sink));
    }

    tokio::select! {
        _ = monitor.run() => {}
        signal = tokio::signal::ctrl_c() => {
            signal.context("failed to listen for ctrl-c")?;
            info!("shutdown signal received");
        }
    }

    Ok(())
}

use std::time::Duration;

use fleetlink::{AlertEvent, Config, Session};

#[tokio::main]
async fn main() {
    pretty_env_logger::init();

    let token = std::env::var("FLEETLINK_TOKEN").ok();

    let config = Config::from_env().unwrap_or_else(|err| {
        println!("Invalid configuration: {}", err);
        std::process::exit(1);
    });

    let session = Session::start(&config, token.as_deref(), |alert: &AlertEvent| {
        log::info!(
            "[{}] {}: {}",
            alert.vehicle_id,
            alert.category,
            alert.message
        );
    })
    .await
    .unwrap();

    let mut ticker = tokio::time::interval(Duration::from_secs(5));

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let manager = session.manager();
                println!(
                    "status: {}, attempts: {}, vehicles: {}",
                    manager.status(),
                    manager.attempt_count(),
                    manager.snapshot().len()
                );
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    session.close();
}

use anyhow::{Context, Result};
use console::style;
use std::sync::Arc;
use tracing::{info, warn};

use crate::core::config::Config;
use crate::core::dispatch::Dispatcher;
use crate::core::marathon::Marathon;
use crate::core::registry::{ConsulRegistry, MemoryRegistry, Mirror, Registry};
use crate::core::transport::{self, Transport};
use crate::interfaces::stream::{FixedBackoff, RECONNECT_DELAY, StreamIngestor};
use crate::interfaces::web;
use crate::logging;

const NAME: &str = env!("CARGO_PKG_NAME");
const VERSION: &str = env!("CARGO_PKG_VERSION");

fn print_help() {
    println!(
        "{} {}\nMirror Marathon applications and tasks into Consul.\n",
        style(NAME).green().bold(),
        style(VERSION).cyan()
    );
    println!(" {} {} [flags]\n", style("Usage:").bold(), style(NAME).green());

    let flags = [
        ("--config <path>", "TOML config file"),
        ("--marathon-location <host:port>", "Marathon address (localhost:8080)"),
        ("--marathon-protocol <http|https>", "Marathon scheme (http)"),
        ("--marathon-username <user>", "Marathon basic auth user"),
        ("--marathon-password <pass>", "Marathon basic auth password"),
        ("--marathon-no-verify-ssl", "Skip Marathon TLS verification"),
        ("--registry-location <host:port|memory>", "Consul address (localhost:8500)"),
        ("--registry-protocol <http|https>", "Consul scheme (http)"),
        ("--registry-token <token>", "Consul ACL token"),
        ("--registry-prefix <prefix>", "KV prefix (marathon)"),
        ("--registry-no-verify-ssl", "Skip Consul TLS verification"),
        ("--listen <addr>", "HTTP listen address (0.0.0.0:4000)"),
        ("--log-level <level>", "trace, debug, info, warn, error (info)"),
    ];
    for (flag, help) in flags {
        println!("   {:<42} {}", style(flag).yellow(), help);
    }
    println!(
        "\n Every flag can also be set as {}<NAME> in the environment.",
        style("MARATHON_CONSUL_").yellow()
    );
}

pub async fn run_main() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_help();
        return Ok(());
    }
    if args.iter().any(|a| a == "--version" || a == "-v") {
        println!("{} {}", NAME, VERSION);
        return Ok(());
    }

    let config = Config::load(&args).await?;
    logging::init(config.log_level.0);
    info!("starting {} v{}", NAME, VERSION);

    let registry: Arc<dyn Registry> = if config.registry.is_memory() {
        warn!("using in-memory registry, nothing will reach Consul");
        Arc::new(MemoryRegistry::new())
    } else {
        Arc::new(ConsulRegistry::new(&config.registry)?)
    };
    let dispatcher = Dispatcher::new(Mirror::new(registry, config.registry.prefix.clone()));
    let marathon = Marathon::new(&config.marathon)?;

    match transport::select(marathon.version().await) {
        Transport::EventStream => {
            let listener = web::bind(&config.web.listen).await?;
            tokio::spawn(async move {
                if let Err(e) = web::serve(listener, web::health_router()).await {
                    tracing::error!(error = %e, "health endpoint stopped");
                }
            });

            let ingestor =
                StreamIngestor::new(marathon, dispatcher, FixedBackoff(RECONNECT_DELAY));
            ingestor.run().await;
            Ok(())
        }
        Transport::Webhook => {
            let listener = web::bind(&config.web.listen).await?;
            web::serve(listener, web::webhook_router(dispatcher))
                .await
                .context("webhook receiver stopped")
        }
    }
}

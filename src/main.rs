use auth::StaticCredentials;
/**
 * This module defines the main entry point for the TURN relay and the server implementation.
 */
use slog::{info, Logger};
use std::{error::Error, net::IpAddr, sync::Arc};
use turn::processor::{StaticConfig, TurnMessageProcessor};

mod auth;
mod config;
mod logging;
mod net;
mod stun;
mod turn;
mod utils;

/**
 * Represents the context for the TURN relay.
 *
 * Fields:
 * - `config`: The server configuration settings.
 * - `logger`: The server logger instance.
 */
#[derive(Debug)]
pub(crate) struct Context {
    pub(crate) config: config::Settings,
    pub(crate) logger: Logger,
}

pub struct TurnServer {
    context: Arc<Context>,
}

impl TurnServer {
    /**
     * Loads configuration and sets up the logger.
     */
    pub fn new() -> Result<Self, ::config::ConfigError> {
        let cfg = config::Settings::new()?;

        let context = Context {
            logger: logging::init_logger(&cfg),
            config: cfg,
        };

        Ok(Self {
            context: Arc::new(context),
        })
    }

    /**
     * Bind the listening socket and run the dispatcher. Only returns on a
     * startup failure: a bad address in the configuration or a listening
     * socket that cannot be bound.
     */
    pub async fn run(&self) -> Result<(), Box<dyn Error>> {
        let cfg = &self.context.config;
        let listen: net::address::Address = cfg.udp_bind_address.parse()?;
        let relay_ip = relay_ip(cfg, &listen)?;

        info!(self.context.logger, "Starting TURN relay"; "relay_ip" => relay_ip.to_string());

        let settings = StaticConfig {
            software_name: cfg.software_name.clone(),
            realm: cfg.realm.clone(),
            lifetime: cfg.allocation_lifetime,
            compliance: cfg.compliance,
            relay_ip,
        };

        let processor = TurnMessageProcessor::new(&self.context, &settings, StaticCredentials::from_settings(cfg));
        let dispatcher = net::Dispatcher::bind(&self.context, processor, listen).await?;
        dispatcher.run().await;
        Ok(())
    }
}

/**
 * The IP relay sockets bind to and that ALLOCATE advertises. It falls back
 * to the listening IP, and must name a concrete interface since peers send
 * to it.
 */
fn relay_ip(cfg: &config::Settings, listen: &net::address::Address) -> Result<IpAddr, Box<dyn Error>> {
    let ip = match &cfg.relay_address {
        Some(relay) => relay.parse::<net::address::Address>()?.ip(),
        None => listen.ip(),
    };
    if ip.is_unspecified() {
        return Err(Box::new(::config::ConfigError::Message(format!(
            "relay IP {ip} is not reachable by peers, set relay_address (TURN_RELAY_ADDRESS)"
        ))));
    }
    Ok(ip)
}

/**
 * The main entry point for the application, it creates
 * the server object and passes control to it.
 */
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn Error>> {
    let server = TurnServer::new()?;
    server.run().await
}

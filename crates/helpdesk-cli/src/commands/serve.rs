use std::sync::Arc;

use anyhow::Result;
use helpdesk_config::Config;
use helpdesk_engine::TicketService;
use helpdesk_server::HelpdeskServer;
use tracing::warn;

pub async fn handle(service: TicketService, config: &Config, host: String, port: u16) -> Result<()> {
    if config.users.is_empty() {
        warn!("No users configured; every API request will be rejected");
    }

    println!("Starting help desk API on {}:{}", host, port);
    HelpdeskServer::new(Arc::new(service), config.server.cors_origins.clone())
        .serve(&host, port)
        .await
}

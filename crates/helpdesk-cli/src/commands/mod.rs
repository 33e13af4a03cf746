pub mod completions;
pub mod config;
pub mod serve;
pub mod ticket;

use std::sync::Arc;

use helpdesk_config::Config;
use helpdesk_core::SystemClock;
use helpdesk_engine::TicketService;
use helpdesk_storage::Storage;

/// Wire the SQLite store, configured users and SLA hours into a service
pub fn build_service(storage: Storage, config: &Config) -> TicketService {
    TicketService::new(
        Arc::new(storage),
        Arc::new(config.authenticator()),
        Arc::new(SystemClock),
        config.sla.policy(),
    )
}

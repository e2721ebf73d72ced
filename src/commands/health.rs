//! Backend connectivity check.

use roomhub_core::config::AppConfig;
use roomhub_core::error::AppError;
use roomhub_core::traits::lease::LeaseStore;
use roomhub_database::RoomStore;
use roomhub_lock::LeaseStoreManager;

use crate::output;

/// Execute the health check
pub async fn execute(config: &AppConfig) -> Result<(), AppError> {
    let database = match super::connect_store(config).await {
        Ok(store) => store.health_check().await.unwrap_or(false),
        Err(e) => {
            output::print_warning(&format!("Database unreachable: {e}"));
            false
        }
    };

    let lock = match LeaseStoreManager::new(&config.lock).await {
        Ok(leases) => leases.health_check().await.unwrap_or(false),
        Err(e) => {
            output::print_warning(&format!("Lock backend unreachable: {e}"));
            false
        }
    };

    println!("Health:");
    output::print_kv("database", status(database));
    output::print_kv(&format!("lock ({})", config.lock.provider), status(lock));

    if database && lock {
        output::print_success("All backends healthy.");
        Ok(())
    } else {
        Err(AppError::service_unavailable("One or more backends are unhealthy"))
    }
}

fn status(ok: bool) -> &'static str {
    if ok { "ok" } else { "unavailable" }
}

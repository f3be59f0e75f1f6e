use std::time::Duration;

use chrono::Utc;
use db::{
    DbErr, DbPool,
    models::{capability::Capability, user::User},
};

const CAPACITY_RESET_INTERVAL_ENV: &str = "BINFLOW_CAPACITY_RESET_INTERVAL_SECS";
const DEFAULT_CAPACITY_RESET_INTERVAL_SECS: u64 = 60 * 60 * 24;
const RETENTION_INTERVAL_ENV: &str = "BINFLOW_RETENTION_INTERVAL_SECS";
const DEFAULT_RETENTION_INTERVAL_SECS: u64 = 60 * 60;

fn read_interval_secs(name: &str, default: u64) -> u64 {
    let raw = match std::env::var(name) {
        Ok(value) => value,
        Err(_) => return default,
    };

    match raw.trim().parse::<u64>() {
        Ok(value) if value > 0 => value,
        _ => {
            tracing::warn!(value = raw.trim(), "Invalid {name}; using default");
            default
        }
    }
}

/// Zero the capability ledgers' used counters. Safe to re-run: a second
/// sweep on already-reset ledgers changes nothing.
pub async fn run_capacity_reset_once(pool: &DbPool) -> Result<u64, DbErr> {
    let reset = Capability::daily_reset(pool).await?;
    if reset > 0 {
        tracing::info!(capabilities = reset, "Reset daily capacity counters");
    }
    Ok(reset)
}

/// Permanently erase accounts whose soft-delete grace period has elapsed.
/// Each deletion is independent; a failed one is logged and retried on the
/// next sweep.
pub async fn run_retention_once(pool: &DbPool) -> Result<u64, DbErr> {
    let due = User::find_past_grace(pool, Utc::now()).await?;
    let mut deleted = 0u64;
    for user in due {
        match User::hard_delete(pool, user.id).await {
            Ok(rows) => deleted += rows,
            Err(err) => {
                tracing::warn!(user_id = %user.id, error = %err, "Failed to erase account");
            }
        }
    }
    if deleted > 0 {
        tracing::info!(deleted, "Erased accounts past their deletion deadline");
    }
    Ok(deleted)
}

pub fn spawn_capacity_reset_job(pool: DbPool) -> tokio::task::JoinHandle<()> {
    let interval = Duration::from_secs(read_interval_secs(
        CAPACITY_RESET_INTERVAL_ENV,
        DEFAULT_CAPACITY_RESET_INTERVAL_SECS,
    ));
    tracing::info!(interval_secs = interval.as_secs(), "Starting capacity reset job");
    tokio::spawn(async move {
        loop {
            if let Err(err) = run_capacity_reset_once(&pool).await {
                tracing::warn!(error = %err, "Capacity reset sweep failed");
            }
            tokio::time::sleep(interval).await;
        }
    })
}

pub fn spawn_retention_job(pool: DbPool) -> tokio::task::JoinHandle<()> {
    let interval = Duration::from_secs(read_interval_secs(
        RETENTION_INTERVAL_ENV,
        DEFAULT_RETENTION_INTERVAL_SECS,
    ));
    tracing::info!(interval_secs = interval.as_secs(), "Starting account retention job");
    tokio::spawn(async move {
        loop {
            if let Err(err) = run_retention_once(&pool).await {
                tracing::warn!(error = %err, "Retention sweep failed");
            }
            tokio::time::sleep(interval).await;
        }
    })
}

#[cfg(test)]
mod tests {
    use db::{
        DBService,
        models::{
            area::{Area, CreateArea},
            capability::{Capability, CreateCapability},
            enterprise::{CreateEnterprise, Enterprise},
            user::{CreateUser, User},
            waste_type::{CreateWasteType, WasteType},
        },
        types::UserRole,
    };
    use uuid::Uuid;

    use super::*;

    async fn setup_pool() -> DbPool {
        DBService::connect("sqlite::memory:").await.unwrap().pool
    }

    #[tokio::test]
    async fn capacity_reset_sweep_zeroes_used_counters() {
        let pool = setup_pool().await;

        let enterprise = Enterprise::create(
            &pool,
            &CreateEnterprise {
                name: "Sweep Co".to_string(),
                contact_email: None,
            },
            Uuid::new_v4(),
        )
        .await
        .unwrap();
        let area = Area::create(
            &pool,
            &CreateArea {
                name: "Midtown".to_string(),
                district: None,
            },
            Uuid::new_v4(),
        )
        .await
        .unwrap();
        let waste_type = WasteType::create(
            &pool,
            &CreateWasteType {
                name: "Textile".to_string(),
                hazardous: false,
            },
            Uuid::new_v4(),
        )
        .await
        .unwrap();
        let capability = Capability::create(
            &pool,
            &CreateCapability {
                enterprise_id: enterprise.id,
                area_id: area.id,
                waste_type_id: waste_type.id,
                daily_capacity_kg: 40.0,
            },
            Uuid::new_v4(),
        )
        .await
        .unwrap();
        Capability::reserve(&pool, capability.id, 33.0).await.unwrap();

        let reset = run_capacity_reset_once(&pool).await.unwrap();
        assert_eq!(reset, 1);

        let reloaded = Capability::find_by_id(&pool, capability.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(reloaded.used_capacity_kg, 0.0);
    }

    #[tokio::test]
    async fn retention_sweep_erases_only_overdue_accounts() {
        let pool = setup_pool().await;

        let overdue = User::create(
            &pool,
            &CreateUser {
                email: "overdue@example.org".to_string(),
                display_name: "Overdue".to_string(),
                role: Some(UserRole::Citizen),
            },
            Uuid::new_v4(),
        )
        .await
        .unwrap();
        let pending = User::create(
            &pool,
            &CreateUser {
                email: "pending@example.org".to_string(),
                display_name: "Pending".to_string(),
                role: Some(UserRole::Citizen),
            },
            Uuid::new_v4(),
        )
        .await
        .unwrap();

        User::schedule_delete(&pool, overdue.id, chrono::Duration::seconds(0))
            .await
            .unwrap();
        User::schedule_delete(&pool, pending.id, chrono::Duration::days(14))
            .await
            .unwrap();

        let deleted = run_retention_once(&pool).await.unwrap();
        assert_eq!(deleted, 1);
        assert!(User::find_by_id(&pool, overdue.id).await.unwrap().is_none());
        assert!(User::find_by_id(&pool, pending.id).await.unwrap().is_some());
    }
}

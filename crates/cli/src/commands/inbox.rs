//! One-shot inbox aggregation, for checking what a staff member can see.

use bankdesk_admin::services::InboxAggregator;
use bankdesk_admin::tenancy::TenantPools;
use bankdesk_core::{TenantKey, UserId};

use super::{CommandError, connect};

/// Aggregate the inbox of `staff` and log it, newest activity first.
pub async fn show(tenant: TenantKey, staff: i32) -> Result<(), CommandError> {
    let mut stores = Vec::with_capacity(TenantKey::ALL.len());
    for key in TenantKey::ALL {
        stores.push(connect(key).await?);
    }
    let pools = TenantPools::from_stores(stores);

    let result = aggregate(&pools, tenant, UserId::new(staff)).await;
    pools.close().await;
    result
}

async fn aggregate(
    pools: &TenantPools,
    tenant: TenantKey,
    staff: UserId,
) -> Result<(), CommandError> {
    let user = pools
        .store(tenant)?
        .get_user(staff)
        .await?
        .ok_or(CommandError::UnknownStaff(staff, tenant))?;

    let inbox = InboxAggregator::new(pools.clone())
        .aggregate(&user.as_staff())
        .await?;

    tracing::info!(
        "{} sessions visible to {} ({} unread)",
        inbox.sessions.len(),
        user.name,
        inbox.unread_total()
    );
    for entry in &inbox.sessions {
        tracing::info!(
            "  {:<20} #{:<6} {:<24} {:<7} unread={} last={}",
            entry.tenant_display_name,
            entry.session.id,
            entry.session.client_name,
            entry.session.status,
            entry.unread_count,
            entry.session.last_message_at.format("%Y-%m-%d %H:%M")
        );
    }
    for failure in &inbox.partial_failures {
        tracing::warn!("  {} skipped: {}", failure.tenant, failure.message);
    }
    Ok(())
}

//! Frontend DNS record swap.
//!
//! The frontend record must already exist in the managed zone: the updater
//! rewrites its data in place and never creates a record.

use tracing::{info, warn};

use crate::cloud::{ApiError, CloudApi};
use crate::resources::{DnsChange, ResourceRecordSet};

/// Outcome of [`point_domain_at`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum DnsUpdate {
    /// The record now points at the new address.
    Updated {
        /// Record data before the change.
        previous: Vec<String>,
    },
    /// No record with the requested name exists; nothing was submitted.
    RecordMissing,
}

/// Builds the change replacing `domain`'s record data with `ip`.
///
/// The first record set whose name equals `domain` exactly is used. Returns
/// `None` when there is no such record.
#[must_use]
pub fn plan_record_swap(
    record_sets: &[ResourceRecordSet],
    domain: &str,
    ip: &str,
) -> Option<DnsChange> {
    let current = record_sets.iter().find(|record| record.name == domain)?;
    Some(DnsChange {
        additions: vec![current.with_rrdatas(vec![ip.to_owned()])],
        deletions: vec![current.clone()],
    })
}

/// Points `domain` at `ip` with a single atomic deletion/addition change.
///
/// # Errors
///
/// Returns [`ApiError`] when listing the zone or applying the change fails.
pub async fn point_domain_at<C>(
    api: &C,
    project: &str,
    managed_zone: &str,
    domain: &str,
    ip: &str,
) -> Result<DnsUpdate, ApiError>
where
    C: CloudApi + ?Sized,
{
    let record_sets = api.list_record_sets(project, managed_zone).await?;
    let Some(change) = plan_record_swap(&record_sets, domain, ip) else {
        warn!(
            domain,
            managed_zone, "no record set found; the frontend record must be created manually"
        );
        return Ok(DnsUpdate::RecordMissing);
    };

    let previous = change
        .deletions
        .first()
        .map(|record| record.rrdatas.clone())
        .unwrap_or_default();
    api.apply_dns_change(project, managed_zone, &change).await?;
    info!(domain, ip, ?previous, "DNS record updated");
    Ok(DnsUpdate::Updated { previous })
}

//! Steady-state reconciliation pass.

use crate::{database::MysqlDatabase, error::Result};

/// One reconciliation pass over the backing store.
///
/// Currently performs no work; the scheduler supplies timing and telemetry
/// around it. Future passes will read and reconcile release results through
/// the restricted connection handed in here.
pub async fn reconcile(_db: &MysqlDatabase) -> Result<()> {
    Ok(())
}

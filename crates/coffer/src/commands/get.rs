//! `coffer get`

use anyhow::Result;
use camino::Utf8Path;
use coffer_core::AuditLog;

use super::open;
use crate::cli::GetArgs;

pub async fn run(args: GetArgs, config_path: Option<&Utf8Path>) -> Result<()> {
    let (resolved, manager) = open(&args.target, config_path).await?;
    let mut at = resolved.at;
    if let Some(property) = args.property {
        at = at.with_property(property);
    }

    let result = manager.get_at(&at).await;
    AuditLog::new("get", resolved.backend, &at.location, &at.name).record(&result);

    println!("{}", result?);
    Ok(())
}

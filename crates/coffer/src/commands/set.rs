//! `coffer set`

use anyhow::{bail, Context, Result};
use camino::Utf8Path;
use coffer_core::{AuditLog, SecretValue};
use std::io::Read;

use super::open;
use crate::cli::SetArgs;
use crate::output;

pub async fn run(args: SetArgs, config_path: Option<&Utf8Path>, quiet: bool) -> Result<()> {
    let value = build_value(&args, std::io::stdin())?;
    let (resolved, manager) = open(&args.target, config_path).await?;
    if value.overwrite && !quiet {
        output::warning(&format!(
            "Replacing all stored content of {}",
            resolved.at.name
        ));
    }

    let spinner = (!quiet).then(|| {
        output::spinner(&format!(
            "Writing {} to {} ({})",
            resolved.at.name, resolved.backend, resolved.at.location
        ))
    });
    let result = manager.set_at(&resolved.at, &value).await;
    if let Some(spinner) = spinner {
        spinner.finish_and_clear();
    }
    AuditLog::new(
        "set",
        resolved.backend,
        &resolved.at.location,
        &resolved.at.name,
    )
    .record(&result);
    result?;

    if !quiet {
        output::success(&format!("Secret {} written", resolved.at.name));
    }
    Ok(())
}

/// Assemble the desired content from the arguments; `--value -` reads `stdin`
fn build_value(args: &SetArgs, mut stdin: impl Read) -> Result<SecretValue> {
    let flat = match args.value.as_deref() {
        Some("-") => {
            let mut buf = String::new();
            stdin
                .read_to_string(&mut buf)
                .context("Failed to read secret value from stdin")?;
            Some(buf.trim_end_matches(['\r', '\n']).to_string())
        }
        other => other.map(str::to_string),
    };

    // Labels or annotations alone update metadata on key/value backends
    if flat.is_none()
        && args.properties.is_empty()
        && args.labels.is_empty()
        && args.annotations.is_empty()
    {
        bail!("Nothing to write; pass --value, --property, --label or --annotation");
    }

    let mut value = SecretValue::from_properties(args.properties.iter().cloned());
    value.value = flat;
    value.labels = args.labels.iter().cloned().collect();
    value.annotations = args.annotations.iter().cloned().collect();
    value.secret_type = args.secret_type.clone();
    value.overwrite = args.overwrite;
    Ok(value)
}

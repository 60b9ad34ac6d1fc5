//! `coffer backends`

use anyhow::Result;
use coffer_stores::BACKENDS;

use crate::cli::BackendsArgs;
use crate::output;

pub fn run(args: BackendsArgs) -> Result<()> {
    if args.json {
        let rows: Vec<_> = BACKENDS
            .iter()
            .map(|d| {
                serde_json::json!({
                    "tag": d.tag(),
                    "description": d.description,
                    "location": d.location(),
                    "storage": storage(d.key_value()),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    output::header(&format!("Supported backends ({} total)", BACKENDS.len()));
    for d in BACKENDS {
        println!();
        println!("  {} {}", console::style(d.tag()).cyan().bold(), d.description);
        output::kv("location", d.location());
        output::kv("storage", storage(d.key_value()));
    }
    Ok(())
}

fn storage(key_value: bool) -> &'static str {
    if key_value {
        "key/value"
    } else {
        "JSON blob"
    }
}

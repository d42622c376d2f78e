//! `list` command: run discovery locally and print what was found.

use vencord_installer_discord::InstallSource;
use vencord_installer_discord::fs::FsSource;
use vencord_installer_protocol::InstallRecord;
use vencord_installer_server::install_record;

use crate::config::Config;
use crate::error::{ClientError, ClientResult};

/// Lists installations as a table, or as JSON with `json`.
pub async fn run(config: &Config, json: bool) -> ClientResult<()> {
    let source = FsSource::new(config.source_config());
    let records: Vec<InstallRecord> = source
        .discover()
        .await
        .iter()
        .map(|install| install_record(install.as_ref()))
        .collect();

    if json {
        let out = serde_json::to_string_pretty(&records)
            .map_err(|e| ClientError::Config(format!("failed to serialize records: {}", e)))?;
        println!("{}", out);
    } else {
        print!("{}", render_table(&records));
    }
    Ok(())
}

/// Formats records as an aligned text table.
pub fn render_table(records: &[InstallRecord]) -> String {
    if records.is_empty() {
        return "No Discord installations found.\n".to_string();
    }

    let width = records
        .iter()
        .map(|r| r.branch.len())
        .max()
        .unwrap_or(0)
        .max("BRANCH".len());

    let mut out = format!("{:<width$}  PATCHED  OPENASAR  PATH\n", "BRANCH");
    for r in records {
        out.push_str(&format!(
            "{:<width$}  {:<7}  {:<8}  {}\n",
            r.branch,
            yes_no(r.is_patched),
            yes_no(r.is_open_asar),
            r.path
        ));
    }
    out
}

fn yes_no(value: bool) -> &'static str {
    if value { "yes" } else { "no" }
}

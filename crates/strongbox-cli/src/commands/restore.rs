use anyhow::Result;
use std::path::Path;

use strongbox_archive::RestoreOptions;

pub struct Args<'a> {
    pub backup_id: &'a str,
    pub out: Option<&'a Path>,
    pub skip_checksum: bool,
    pub fields: &'a [String],
    pub decryption_key: Option<&'a str>,
}

pub async fn run(args: Args<'_>, base_dir: &Path, cli_passphrase: &Option<String>) -> Result<()> {
    let (_config, service) = super::open_service(base_dir, cli_passphrase)?;

    let mut options = RestoreOptions::new(args.backup_id);
    if args.skip_checksum {
        options = options.skip_checksum();
    }
    if !args.fields.is_empty() {
        options = options.only_fields(args.fields.iter().cloned());
    }
    if let Some(key) = args.decryption_key {
        options = options.with_decryption_key(key);
    }

    let snapshot: serde_json::Value = service.restore_backup(options).await?;
    let rendered = serde_json::to_string_pretty(&snapshot)?;

    match args.out {
        Some(path) => {
            std::fs::write(path, rendered)?;
            eprintln!("Restored {} to {}", args.backup_id, path.display());
        }
        None => println!("{rendered}"),
    }

    Ok(())
}

//! Command execution.

use crate::config::Config;
use crate::{Commands, OutputFormat};
use colored::Colorize;
use mdbwire_protocol::{
    encode_delete, next_request_id, BsonSerializer, DeleteFlags, DeleteRequest, Selector,
};
use serde_json::Value;

/// Executes a command and returns the formatted output.
pub fn execute(config: &Config, cmd: Commands) -> Result<String, Box<dyn std::error::Error>> {
    match cmd {
        Commands::EncodeDelete {
            ns,
            selector,
            raw,
            single,
            request_id,
            skip_document_validation,
            format,
        } => {
            let selector = match (selector, raw) {
                (Some(_), Some(_)) => {
                    return Err("--selector and --raw are mutually exclusive".into());
                }
                (_, Some(raw)) => Selector::raw(hex::decode(raw.trim())?),
                (Some(json), None) => Selector::Document(parse_json_arg(&json)?),
                (None, None) => Selector::Document(Value::Object(Default::default())),
            };

            let mut flags = DeleteFlags::new();
            if single {
                flags = flags.with_single_remove();
            }

            let request_id = request_id.unwrap_or_else(next_request_id);
            let request = DeleteRequest::new(request_id, ns, selector).with_flags(flags);

            let mut policy = config.limits;
            if skip_document_validation {
                policy.skip_document_validation = true;
            }

            tracing::debug!(
                "Encoding delete ns={} request_id={} flags={:#x} ceiling={}",
                request.collection_name,
                request.request_id,
                request.flags.bits(),
                policy.ceiling()
            );
            let bytes = encode_delete(&request, &BsonSerializer, &policy)?;
            tracing::info!("Encoded delete request_id={} ({} bytes)", request_id, bytes.len());

            Ok(match format {
                OutputFormat::Hex => hex::encode(&bytes),
                OutputFormat::Dump => format_dump(&bytes),
            })
        }

        Commands::ShowConfig => Ok(config.to_yaml()?),

        Commands::InitConfig { path, force } => {
            if path.exists() && !force {
                return Err(format!(
                    "{} already exists (use --force to overwrite)",
                    path.display()
                )
                .into());
            }
            config.save(&path)?;
            tracing::info!("Wrote config to {}", path.display());
            Ok(format!("Wrote {}", path.display()))
        }
    }
}

/// Parses a JSON argument (or @file.json to read from file).
fn parse_json_arg(arg: &str) -> Result<Value, Box<dyn std::error::Error>> {
    if let Some(path) = arg.strip_prefix('@') {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    } else {
        Ok(serde_json::from_str(arg)?)
    }
}

/// Formats bytes as an offset-prefixed hex dump, 16 bytes per line.
fn format_dump(bytes: &[u8]) -> String {
    let mut output = format!("{} ({} bytes)", "OP_DELETE".bold(), bytes.len());
    for (line, chunk) in bytes.chunks(16).enumerate() {
        let hex = chunk
            .iter()
            .map(|b| format!("{:02x}", b))
            .collect::<Vec<_>>()
            .join(" ");
        let ascii: String = chunk
            .iter()
            .map(|&b| {
                if b.is_ascii_graphic() {
                    b as char
                } else {
                    '.'
                }
            })
            .collect();
        output.push_str(&format!(
            "\n{}  {:<47}  {}",
            format!("{:08x}", line * 16).dimmed(),
            hex,
            ascii
        ));
    }
    output
}

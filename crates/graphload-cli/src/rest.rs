//! Direct REST commands: queries, commands, documents, server information.
//!
//! Rows and documents are printed to stdout as one JSON value per line, so
//! the output pipes cleanly into `jq`.

use crate::parse_pair;
use anyhow::{anyhow, Result};
use clap::Subcommand;
use colored::Colorize;
use graphload_client::{Content, Identifier, OrientClient, RecordId, Select, UpdateMode};
use serde_json::Value;
use std::io::{self, Read};
use std::path::Path;

#[derive(Subcommand, Debug)]
pub enum DocumentCommands {
    /// Print one document.
    Get { rid: RecordId },

    /// Create a document; prints the stored document including its `@rid`.
    Create {
        class: String,
        /// JSON object, or `-` to read it from stdin
        json: String,
    },

    /// Replace a document's fields (or merge them with `--partial`).
    Update {
        rid: RecordId,
        /// JSON object, or `-` to read it from stdin
        json: String,
        #[arg(long)]
        partial: bool,
    },
}

fn print_rows<I>(rows: I, max: Option<usize>) -> Result<usize>
where
    I: Iterator<Item = graphload_client::Result<Value>>,
{
    let mut printed = 0;
    for row in rows.take(max.unwrap_or(usize::MAX)) {
        println!("{}", row?);
        printed += 1;
    }
    Ok(printed)
}

pub fn cmd_query(client: &OrientClient, text: &str, language: &str, max: Option<usize>) -> Result<()> {
    let printed = print_rows(client.query(text, language), max)?;
    eprintln!("{} {printed} rows", "Fetched".green().bold());
    Ok(())
}

pub fn cmd_select(
    client: &OrientClient,
    from: &str,
    conditions: &[String],
    max: Option<usize>,
) -> Result<()> {
    let mut select = Select::from(Identifier::new(from)?);
    for raw in conditions {
        let (field, value) = parse_pair(raw)?;
        select = select.filter_eq(Identifier::new(&field)?, value);
    }
    let printed = print_rows(client.select(&select), max)?;
    eprintln!("{} {printed} rows from {from}", "Fetched".green().bold());
    Ok(())
}

pub fn cmd_command(client: &OrientClient, text: &str, language: &str) -> Result<()> {
    let answer = client.command(text, language)?;
    println!("{}", serde_json::to_string_pretty(&answer)?);
    Ok(())
}

pub fn cmd_databases(client: &OrientClient) -> Result<()> {
    for name in client.list_databases()? {
        println!("{name}");
    }
    Ok(())
}

pub fn cmd_info(client: &OrientClient) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(&client.database_info()?)?);
    Ok(())
}

pub fn cmd_class(client: &OrientClient, name: &str) -> Result<()> {
    let info = client.class_info(&Identifier::new(name)?)?;
    println!("{}", serde_json::to_string_pretty(&info)?);
    Ok(())
}

pub fn cmd_document(client: &OrientClient, command: DocumentCommands) -> Result<()> {
    let answer = match command {
        DocumentCommands::Get { rid } => client.get_document(rid)?,
        DocumentCommands::Create { class, json } => {
            client.create_document(&Identifier::new(&class)?, &read_object(&json)?)?
        }
        DocumentCommands::Update { rid, json, partial } => {
            let mode = if partial {
                UpdateMode::Partial
            } else {
                UpdateMode::Full
            };
            client.update_document(rid, &read_object(&json)?, mode)?
        }
    };
    println!("{}", serde_json::to_string_pretty(&answer)?);
    Ok(())
}

pub fn cmd_export(client: &OrientClient, out: &Path) -> Result<()> {
    println!(
        "{} {} → {}",
        "Exporting".green().bold(),
        client.database(),
        out.display()
    );
    let written = client.export_database(out)?;
    println!("  {} {written} bytes", "→".cyan());
    Ok(())
}

fn read_object(arg: &str) -> Result<Content> {
    let text = if arg == "-" {
        let mut text = String::new();
        io::stdin().read_to_string(&mut text)?;
        text
    } else {
        arg.to_string()
    };
    parse_object(&text)
}

fn parse_object(text: &str) -> Result<Content> {
    match serde_json::from_str::<Value>(text)? {
        Value::Object(map) => Ok(map),
        other => Err(anyhow!("expected a JSON object, got {other}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn payloads_must_be_objects() {
        let content = parse_object(r#"{"uri": "A", "n": 1}"#).unwrap();
        assert_eq!(content.get("n"), Some(&json!(1)));
        assert!(parse_object("[1, 2]").is_err());
        assert!(parse_object("{not json").is_err());
    }

    #[test]
    fn print_rows_stops_at_max_and_surfaces_errors() {
        let rows = vec![Ok(json!({"a": 1})), Ok(json!({"a": 2})), Ok(json!({"a": 3}))];
        assert_eq!(print_rows(rows.into_iter(), Some(2)).unwrap(), 2);

        let rows = vec![
            Ok(json!({"a": 1})),
            Err(graphload_client::ClientError::Decode("bad page".to_string())),
        ];
        assert!(print_rows(rows.into_iter(), None).is_err());
    }
}

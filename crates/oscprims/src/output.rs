use std::io::IsTerminal;
use std::time::{SystemTime, UNIX_EPOCH};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use oscprims_chunk::ChunkSendReport;
use oscprims_wire::{Argument, Message};
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct ArgOutput {
    #[serde(rename = "type")]
    tag: char,
    value: serde_json::Value,
}

impl From<&Argument> for ArgOutput {
    fn from(arg: &Argument) -> Self {
        let value = match arg {
            Argument::Float(v) => serde_json::json!(v),
            Argument::Int(v) => serde_json::json!(v),
            Argument::String(v) => serde_json::json!(v),
        };
        Self {
            tag: arg.type_tag(),
            value,
        }
    }
}

#[derive(Serialize)]
struct MessageOutput<'a> {
    schema_id: &'static str,
    address: &'a str,
    type_tags: String,
    args: Vec<ArgOutput>,
    timestamp: String,
}

pub fn print_message(message: &Message, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = MessageOutput {
                schema_id: "https://schemas.3leaps.dev/oscprims/cli/v1/message-received.schema.json",
                address: &message.address,
                type_tags: message.type_tags(),
                args: message.args.iter().map(ArgOutput::from).collect(),
                timestamp: now_unix_seconds(),
            };
            print_json(&out);
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["ADDRESS", "TAGS", "ARGS"])
                .add_row(vec![
                    message.address.clone(),
                    message.type_tags(),
                    join_args(&message.args),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!("{} {} {}", message.address, message.type_tags(), join_args(&message.args));
        }
    }
}

#[derive(Serialize)]
struct FloatsOutput<'a> {
    schema_id: &'static str,
    title: &'a str,
    count: usize,
    values: &'a [f32],
    timestamp: String,
}

pub fn print_floats(title: &str, values: &[f32], format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = FloatsOutput {
                schema_id: "https://schemas.3leaps.dev/oscprims/cli/v1/floats-received.schema.json",
                title,
                count: values.len(),
                values,
                timestamp: now_unix_seconds(),
            };
            print_json(&out);
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["TITLE", "COUNT", "VALUES"])
                .add_row(vec![
                    title.to_string(),
                    values.len().to_string(),
                    join_floats(values),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!("{title} count={} values=[{}]", values.len(), join_floats(values));
        }
    }
}

#[derive(Serialize)]
pub struct SendOutput<'a> {
    schema_id: &'static str,
    target: &'a str,
    address: &'a str,
    bytes: usize,
}

impl<'a> SendOutput<'a> {
    pub fn new(target: &'a str, address: &'a str, bytes: usize) -> Self {
        Self {
            schema_id: "https://schemas.3leaps.dev/oscprims/cli/v1/message-sent.schema.json",
            target,
            address,
            bytes,
        }
    }
}

pub fn print_sent(out: &SendOutput<'_>, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(out),
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_header(vec!["TARGET", "ADDRESS", "BYTES"])
                .add_row(vec![
                    out.target.to_string(),
                    out.address.to_string(),
                    out.bytes.to_string(),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!("sent {} ({} bytes) to {}", out.address, out.bytes, out.target);
        }
    }
}

#[derive(Serialize)]
struct ReportOutput<'a> {
    schema_id: &'static str,
    target: &'a str,
    title: &'a str,
    floats: usize,
    chunks: usize,
    sent: usize,
    failed: usize,
    complete: bool,
}

pub fn print_chunk_report(
    target: &str,
    title: &str,
    floats: usize,
    report: &ChunkSendReport,
    format: OutputFormat,
) {
    match format {
        OutputFormat::Json => {
            let out = ReportOutput {
                schema_id: "https://schemas.3leaps.dev/oscprims/cli/v1/chunk-report.schema.json",
                target,
                title,
                floats,
                chunks: report.chunks,
                sent: report.sent,
                failed: report.failed,
                complete: report.is_complete(),
            };
            print_json(&out);
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_header(vec!["TARGET", "TITLE", "FLOATS", "CHUNKS", "SENT", "FAILED"])
                .add_row(vec![
                    target.to_string(),
                    title.to_string(),
                    floats.to_string(),
                    report.chunks.to_string(),
                    report.sent.to_string(),
                    report.failed.to_string(),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "{title}: {floats} floats in {} chunks to {target} (sent={} failed={})",
                report.chunks, report.sent, report.failed
            );
        }
    }
}

fn print_json<T: Serialize>(value: &T) {
    println!(
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
    );
}

fn join_args(args: &[Argument]) -> String {
    args.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" ")
}

fn join_floats(values: &[f32]) -> String {
    values
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

fn now_unix_seconds() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_else(|_| "0".to_string())
}

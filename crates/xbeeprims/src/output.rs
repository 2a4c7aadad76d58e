use std::io::{IsTerminal, Write};
use std::time::{SystemTime, UNIX_EPOCH};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;
use xbeeprims_frame::api;
use xbeeprims_packet::Packet;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
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
struct PacketOutput<'a> {
    #[serde(flatten)]
    packet: &'a Packet,
    timestamp: String,
}

pub fn print_packet(packet: &Packet, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = PacketOutput {
                packet,
                timestamp: now_unix_seconds(),
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["TYPE", "FROM", "STATUS", "DATA"])
                .add_row(vec![
                    packet.packet_type().as_str().to_string(),
                    origin(packet),
                    status(packet),
                    body(packet),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "type={} from={} status={} data={}",
                packet.packet_type().as_str(),
                origin(packet),
                status(packet),
                body(packet)
            );
        }
        OutputFormat::Raw => print_raw(packet.data()),
    }
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

/// Source address or frame id, whichever the packet carries.
fn origin(packet: &Packet) -> String {
    match packet {
        Packet::RemoteAtResponse {
            address64,
            frame_id,
            ..
        } => format!(
            "{} id={frame_id}",
            xbeeprims_packet::Address::Long(*address64)
        ),
        _ => match (packet.source(), packet.frame_id()) {
            (Some(source), _) => source.to_string(),
            (None, Some(frame_id)) => format!("id={frame_id}"),
            (None, None) => "-".to_string(),
        },
    }
}

fn status(packet: &Packet) -> String {
    match packet {
        Packet::ModemStatus { status } => status.to_string(),
        Packet::LocalAtResponse { status, .. } | Packet::RemoteAtResponse { status, .. } => {
            status.to_string()
        }
        Packet::TxStatus { status, .. } => status.to_string(),
        Packet::Data { rssi, .. } | Packet::Io { rssi, .. } => format!("-{rssi} dBm"),
        Packet::Unknown { frame_type, .. } => {
            format!("{} (0x{frame_type:02X})", api::frame_type_name(*frame_type))
        }
    }
}

fn body(packet: &Packet) -> String {
    match packet {
        Packet::Io { sample, .. } => io_summary(sample),
        Packet::LocalAtResponse { command, data, .. }
        | Packet::RemoteAtResponse { command, data, .. } => format!(
            "{} {}",
            String::from_utf8_lossy(command),
            payload_preview(data)
        ),
        Packet::Unknown { payload, .. } => hex(payload),
        _ => payload_preview(packet.data()),
    }
}

fn io_summary(sample: &xbeeprims_packet::IoSample) -> String {
    let mut parts = Vec::new();
    for channel in 0..8u8 {
        if sample.has_digital(channel) {
            parts.push(format!("D{channel}={}", u8::from(sample.get_digital(channel))));
        }
    }
    for channel in 0..6u8 {
        if sample.has_analog(channel) {
            parts.push(format!("A{channel}={}", sample.get_analog(channel, 0.0)));
        }
    }
    parts.join(" ")
}

/// Text if printable, otherwise hex.
pub fn payload_preview(payload: &[u8]) -> String {
    match std::str::from_utf8(payload) {
        Ok(text) if !text.chars().any(|c| c.is_control()) => text.to_string(),
        _ => hex(payload),
    }
}

fn hex(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{b:02X}"))
        .collect::<Vec<_>>()
        .join(" ")
}

fn now_unix_seconds() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_else(|_| "0".to_string())
}

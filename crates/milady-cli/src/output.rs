//! Output formatting for CLI commands.
//!
//! Supports table (human-readable) and JSON output formats.

use std::io::Write;

use milady_discovery::DiscoveryResult;
use milady_gateway::{ConnectResult, Notification, RpcResult};
use milady_proto::DiscoveryEventKind;
use serde::Serialize;

use crate::cli::Format;
use crate::error::CliError;

/// Output formatter that handles both table and JSON output.
#[derive(Debug, Clone, Default)]
pub struct OutputFormat {
    format: Format,
}

impl OutputFormat {
    /// Create a new output formatter.
    #[must_use]
    pub const fn new(format: Format) -> Self {
        Self { format }
    }

    /// Check if JSON format is selected.
    #[must_use]
    pub const fn is_json(&self) -> bool {
        matches!(self.format, Format::Json)
    }

    /// Write a value: pretty JSON or a table.
    pub fn write<W, T>(&self, writer: &mut W, value: &T) -> Result<(), CliError>
    where
        W: Write,
        T: Serialize + TableDisplay,
    {
        match self.format {
            Format::Json => {
                serde_json::to_writer_pretty(&mut *writer, value)
                    .map_err(|e| CliError::Format(format!("JSON serialization failed: {e}")))?;
                writeln!(writer)?;
            }
            Format::Table => value.write_table(writer)?,
        }
        Ok(())
    }

    /// Write one item of a stream: a JSON line or a table line.
    pub fn write_line<W, T>(&self, writer: &mut W, value: &T) -> Result<(), CliError>
    where
        W: Write,
        T: Serialize + TableDisplay,
    {
        match self.format {
            Format::Json => {
                serde_json::to_writer(&mut *writer, value)
                    .map_err(|e| CliError::Format(format!("JSON serialization failed: {e}")))?;
                writeln!(writer)?;
            }
            Format::Table => value.write_table(writer)?,
        }
        writer.flush()?;
        Ok(())
    }

    /// Render a value to a string.
    pub fn to_string<T>(&self, value: &T) -> Result<String, CliError>
    where
        T: Serialize + TableDisplay,
    {
        let mut buf = Vec::new();
        self.write(&mut buf, value)?;
        String::from_utf8(buf).map_err(|e| CliError::Format(format!("UTF-8 error: {e}")))
    }
}

/// Types that can be displayed as a table.
pub trait TableDisplay {
    /// Write the value in human-readable form.
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError>;
}

fn list(values: &[String]) -> String {
    if values.is_empty() {
        "-".to_string()
    } else {
        values.join(", ")
    }
}

impl TableDisplay for ConnectResult {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        writeln!(writer, "Gateway Session")?;
        writeln!(writer, "══════════════════════════════════")?;
        writeln!(writer, "Session:   {}", self.session_id)?;
        writeln!(writer, "Protocol:  {}", self.protocol)?;
        writeln!(writer, "Role:      {}", self.role)?;
        writeln!(writer, "Scopes:    {}", list(&self.scopes))?;
        writeln!(writer, "Methods:   {}", list(&self.methods))?;
        writeln!(writer, "Events:    {}", list(&self.events))?;
        Ok(())
    }
}

impl TableDisplay for RpcResult {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        if let Some(error) = self.error.as_ref().filter(|_| !self.ok) {
            writeln!(writer, "error {}: {}", error.code, error.message)?;
            return Ok(());
        }
        match &self.payload {
            Some(payload) => {
                let text = serde_json::to_string_pretty(payload)
                    .map_err(|e| CliError::Format(format!("JSON serialization failed: {e}")))?;
                writeln!(writer, "{text}")?;
            }
            None => writeln!(writer, "ok")?,
        }
        Ok(())
    }
}

impl TableDisplay for DiscoveryResult {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        if self.gateways.is_empty() {
            writeln!(writer, "No gateways found ({})", self.status)?;
            return Ok(());
        }

        let name_width = self
            .gateways
            .iter()
            .map(|g| g.name.chars().count())
            .max()
            .unwrap_or(0)
            .max(4);
        let host_width = self
            .gateways
            .iter()
            .map(|g| g.host.len())
            .max()
            .unwrap_or(0)
            .max(4);

        writeln!(
            writer,
            "{:<name_width$}  {:<host_width$}  {:>5}  {:<3}  URL",
            "NAME", "HOST", "PORT", "TLS"
        )?;
        for gateway in &self.gateways {
            writeln!(
                writer,
                "{:<name_width$}  {:<host_width$}  {:>5}  {:<3}  {}",
                gateway.name,
                gateway.host,
                gateway.port,
                if gateway.tls_enabled { "yes" } else { "no" },
                gateway.websocket_url()
            )?;
        }
        writeln!(writer)?;
        writeln!(writer, "{} gateway(s), {}", self.gateways.len(), self.status)?;
        Ok(())
    }
}

impl TableDisplay for Notification {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        match self {
            Self::StateChange { state, reason } => {
                let summary = state.summary();
                write!(writer, "[{state}] {}: {}", summary.title, summary.text)?;
                if let Some(reason) = reason {
                    write!(writer, " ({reason})")?;
                }
                writeln!(writer)?;
            }
            Self::GatewayEvent {
                event,
                payload,
                seq,
            } => {
                write!(writer, "[event] {event}")?;
                if let Some(seq) = seq {
                    write!(writer, " #{seq}")?;
                }
                if let Some(payload) = payload {
                    write!(writer, " {payload}")?;
                }
                writeln!(writer)?;
            }
            Self::Error {
                message,
                will_retry,
            } => {
                let retry = if *will_retry { ", retrying" } else { "" };
                writeln!(writer, "[error] {message}{retry}")?;
            }
            Self::Discovery(change) => {
                let verb = match change.kind {
                    DiscoveryEventKind::Found => "found",
                    DiscoveryEventKind::Updated => "updated",
                    DiscoveryEventKind::Lost => "lost",
                };
                writeln!(
                    writer,
                    "[discovery] {verb} {} at {}",
                    change.gateway.name,
                    change.gateway.websocket_url()
                )?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use milady_gateway::ConnectionState;
    use milady_proto::{DiscoveredGateway, DiscoveryEvent};
    use serde_json::json;

    use super::*;

    fn gateway(name: &str, host: &str, tls: bool) -> DiscoveredGateway {
        DiscoveredGateway {
            stable_id: format!("_openclaw-gw._tcp|local.|{}", name.to_lowercase()),
            name: name.to_string(),
            host: host.to_string(),
            port: 18789,
            lan_host: None,
            tailnet_dns: None,
            canvas_port: None,
            tls_enabled: tls,
            tls_fingerprint_sha256: None,
            is_local: true,
        }
    }

    fn render<T: Serialize + TableDisplay>(value: &T) -> String {
        OutputFormat::default().to_string(value).expect("render")
    }

    #[test]
    fn test_connect_result_table() {
        let result = ConnectResult {
            connected: true,
            session_id: "s-1".into(),
            protocol: 3,
            methods: vec!["health".into(), "chat.send".into()],
            events: Vec::new(),
            role: "operator".into(),
            scopes: vec!["operator.admin".into()],
        };
        let text = render(&result);
        assert!(text.contains("Protocol:  3"));
        assert!(text.contains("Methods:   health, chat.send"));
        assert!(text.contains("Events:    -"));
    }

    #[test]
    fn test_connect_result_json_is_camel_case() {
        let result = ConnectResult {
            connected: true,
            session_id: "s-1".into(),
            protocol: 3,
            methods: Vec::new(),
            events: Vec::new(),
            role: "operator".into(),
            scopes: Vec::new(),
        };
        let text = OutputFormat::new(Format::Json).to_string(&result).expect("render");
        let value: serde_json::Value = serde_json::from_str(&text).expect("json");
        assert_eq!(value["sessionId"], "s-1");
    }

    #[test]
    fn test_rpc_result_table() {
        assert_eq!(render(&RpcResult::success(None)), "ok\n");
        assert_eq!(
            render(&RpcResult::failure("TIMEOUT", "Request timed out")),
            "error TIMEOUT: Request timed out\n"
        );
        let text = render(&RpcResult::success(Some(json!({"status": "ok"}))));
        assert!(text.contains(r#""status": "ok""#));
    }

    #[test]
    fn test_discovery_table() {
        let result = DiscoveryResult {
            gateways: vec![
                gateway("Den", "192.168.1.20", false),
                gateway("Office Gateway", "10.0.0.7", true),
            ],
            status: "Discovering...".into(),
        };
        let text = render(&result);
        let lines: Vec<_> = text.lines().collect();
        assert!(lines[0].starts_with("NAME"));
        assert!(lines[1].contains("ws://192.168.1.20:18789"));
        assert!(lines[2].contains("wss://10.0.0.7:18789"));
        assert!(lines[2].contains("yes"));
        assert_eq!(lines[4], "2 gateway(s), Discovering...");
    }

    #[test]
    fn test_discovery_table_empty() {
        let result = DiscoveryResult {
            gateways: Vec::new(),
            status: "Discovery stopped".into(),
        };
        assert_eq!(render(&result), "No gateways found (Discovery stopped)\n");
    }

    #[test]
    fn test_notification_lines() {
        let state = Notification::StateChange {
            state: ConnectionState::Reconnecting,
            reason: Some("socket closed".into()),
        };
        assert_eq!(
            render(&state),
            "[reconnecting] Milady Gateway · Reconnecting: Attempting to restore connection… (socket closed)\n"
        );

        let event = Notification::GatewayEvent {
            event: "tick".into(),
            payload: Some(json!({"ts": 1})),
            seq: Some(7),
        };
        assert_eq!(render(&event), "[event] tick #7 {\"ts\":1}\n");

        let error = Notification::Error {
            message: "connection lost".into(),
            will_retry: true,
        };
        assert_eq!(render(&error), "[error] connection lost, retrying\n");

        let found = Notification::Discovery(DiscoveryEvent {
            kind: DiscoveryEventKind::Found,
            gateway: gateway("Den", "192.168.1.20", false),
        });
        assert_eq!(render(&found), "[discovery] found Den at ws://192.168.1.20:18789\n");
    }

    #[test]
    fn test_write_line_json_is_single_line() {
        let mut buf = Vec::new();
        let event = Notification::GatewayEvent {
            event: "tick".into(),
            payload: None,
            seq: Some(1),
        };
        OutputFormat::new(Format::Json)
            .write_line(&mut buf, &event)
            .expect("write");
        let text = String::from_utf8(buf).expect("utf8");
        assert_eq!(text.lines().count(), 1);
        assert!(text.starts_with(r#"{"type":"gatewayEvent""#));
    }
}

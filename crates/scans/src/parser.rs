//! Nmap greppable output parsing.
//!
//! The scans ask nmap for its greppable (`-oG`) form, where each host line
//! carries a tab-separated `Ports:` field of `port/state/proto/owner/
//! service/rpc/version/` entries. Closed ports are dropped.

use regex::Regex;
use serde::{Deserialize, Serialize};

/// One non-closed port on a host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortRecord {
    /// Port number.
    pub port: u16,
    /// Transport protocol (tcp/udp).
    pub protocol: String,
    /// Port state as reported by nmap (open, filtered, ...).
    pub state: String,
    /// Service name, when identified.
    pub service: String,
    /// Product and version string, when identified.
    pub product: String,
}

/// Ports grouped under the host that exposes them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostRecord {
    /// Host address.
    pub address: String,
    /// Ports found on this host.
    pub ports: Vec<PortRecord>,
}

/// Parsed nmap output: per-host port tables plus a flattened list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NmapReport {
    /// All hosts that reported ports.
    pub hosts: Vec<HostRecord>,
    /// Flattened list of every port across hosts.
    pub ports: Vec<PortRecord>,
}

impl NmapReport {
    /// Convert into an opaque scan payload.
    pub fn to_payload(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

/// Parser for nmap's greppable (`-oG`) output format.
pub struct NmapParser;

impl NmapParser {
    /// Parse greppable output into a report.
    pub fn parse(&self, content: &str) -> NmapReport {
        let host_re = Regex::new(r"^Host:\s+(\S+)").expect("static regex");

        let mut report = NmapReport::default();
        for line in content.lines() {
            let Some(captures) = host_re.captures(line) else {
                continue;
            };
            let Some(ports_field) = extract_field(line, "Ports:") else {
                continue;
            };

            let address = captures[1].to_string();
            let ports: Vec<PortRecord> = ports_field
                .split(',')
                .filter_map(parse_port_entry)
                .collect();
            if ports.is_empty() {
                continue;
            }

            report.ports.extend(ports.iter().cloned());
            match report.hosts.iter_mut().find(|h| h.address == address) {
                Some(host) => host.ports.extend(ports),
                None => report.hosts.push(HostRecord { address, ports }),
            }
        }
        report
    }
}

/// Pull a tab-delimited `Name: value` field out of a greppable line.
fn extract_field<'a>(line: &'a str, field: &str) -> Option<&'a str> {
    let start = line.find(field)? + field.len();
    let rest = &line[start..];
    Some(rest.split('\t').next().unwrap_or(rest).trim())
}

/// Parse one `port/state/proto/owner/service/rpc/version/` entry.
///
/// Returns `None` for closed ports and anything unparseable. Nmap escapes
/// literal slashes inside fields as `|`.
fn parse_port_entry(entry: &str) -> Option<PortRecord> {
    let mut fields = entry.trim().splitn(7, '/');
    let port = fields.next()?.trim().parse().ok()?;
    let state = fields.next()?.to_string();
    let protocol = fields.next()?.to_string();
    let _owner = fields.next()?;
    let service = fields.next()?.to_string();
    let _rpc = fields.next()?;
    let product = fields
        .next()
        .unwrap_or("")
        .trim_end_matches('/')
        .replace('|', "/")
        .trim()
        .to_string();

    if state == "closed" {
        return None;
    }

    Some(PortRecord { port, protocol, state, service, product })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SIMPLE: &str = "\
# Nmap 7.94 scan initiated as: nmap -sS -oG - 192.168.1.1
Host: 192.168.1.1 ()\tStatus: Up
Host: 192.168.1.1 ()\tPorts: 80/open/tcp//http//Apache httpd 2.4.41/\tIgnored State: closed (999)
# Nmap done
";

    const COMPLEX: &str = "\
Host: 192.168.1.1 ()\tPorts: 22/open/tcp//ssh//OpenSSH 7.9/, 80/open/tcp//http//nginx 1.18.0/, 443/open/tcp//https//nginx 1.18.0/
Host: 192.168.1.2 ()\tPorts: 3306/open/tcp//mysql//MySQL 8.0.32/, 8080/closed/tcp//http-proxy//
";

    #[test]
    fn parses_a_single_host_and_port() {
        let report = NmapParser.parse(SIMPLE);

        assert_eq!(report.hosts.len(), 1);
        assert_eq!(report.hosts[0].address, "192.168.1.1");
        assert_eq!(report.ports.len(), 1);

        let port = &report.ports[0];
        assert_eq!(port.port, 80);
        assert_eq!(port.protocol, "tcp");
        assert_eq!(port.state, "open");
        assert_eq!(port.service, "http");
        assert_eq!(port.product, "Apache httpd 2.4.41");
    }

    #[test]
    fn parses_multiple_hosts_and_drops_closed_ports() {
        let report = NmapParser.parse(COMPLEX);

        assert_eq!(report.hosts.len(), 2);
        assert_eq!(report.ports.len(), 4);

        let second = &report.hosts[1];
        assert_eq!(second.address, "192.168.1.2");
        assert_eq!(second.ports.len(), 1);
        assert_eq!(second.ports[0].service, "mysql");
    }

    #[test]
    fn status_only_lines_yield_no_hosts() {
        let report = NmapParser.parse("Host: 10.0.0.1 ()\tStatus: Up\n");
        assert!(report.hosts.is_empty());
        assert!(report.ports.is_empty());
    }

    #[test]
    fn empty_input_yields_an_empty_report() {
        let report = NmapParser.parse("");
        assert_eq!(report, NmapReport::default());
    }

    #[test]
    fn payload_exposes_a_ports_array() {
        let payload = NmapParser.parse(SIMPLE).to_payload();
        let ports = payload.get("ports").and_then(|p| p.as_array()).unwrap();
        assert_eq!(ports.len(), 1);
        assert_eq!(ports[0].get("port"), Some(&serde_json::json!(80)));
    }

    #[test]
    fn escaped_slashes_are_restored_in_products() {
        let line = "Host: 10.0.0.1 ()\tPorts: 80/open/tcp//http//Apache|2.4 (Unix)/\n";
        let report = NmapParser.parse(line);
        assert_eq!(report.ports[0].product, "Apache/2.4 (Unix)");
    }
}

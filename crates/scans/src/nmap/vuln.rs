//! Vulnerability script scanning.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use regex::Regex;
use tracing::{info, warn};

use autoscout_core::{run_command, Scan, ScanContext, ScanResult};

use super::join_ports;
use crate::parser::NmapParser;
use crate::recon::ContextExt;

/// Runs nmap's vulnerability detection scripts on discovered ports.
pub struct VulnScan;

impl VulnScan {
    fn command(&self, ctx: &ScanContext, ports: &[u16]) -> Vec<String> {
        let txt = ctx.output_dir().join("nmap_vuln.txt");
        let gnmap = ctx.output_dir().join("nmap_vuln.gnmap");
        vec![
            "sudo".into(),
            "nmap".into(),
            "-p".into(),
            join_ports(ports),
            "--script".into(),
            "vuln".into(),
            "-oN".into(),
            txt.to_string_lossy().into_owned(),
            "-oG".into(),
            gnmap.to_string_lossy().into_owned(),
            ctx.target().to_string(),
        ]
    }
}

#[async_trait]
impl Scan for VulnScan {
    fn name(&self) -> &str {
        "vuln_nmap"
    }

    fn description(&self) -> &str {
        "Run nmap vulnerability detection scripts on open ports"
    }

    fn timeout(&self) -> Duration {
        // Vuln scripts can be very slow.
        Duration::from_secs(1800)
    }

    fn requires_root(&self) -> bool {
        true
    }

    async fn can_run(&self, ctx: &ScanContext) -> anyhow::Result<bool> {
        let open_ports = ctx.open_ports().await;
        if open_ports.is_empty() {
            info!("no open ports found, skipping vulnerability scan");
            return Ok(false);
        }
        if open_ports.len() < 3 {
            // Small surfaces rarely justify the slow script pass; the
            // workflow can force it through metadata.
            let forced = ctx
                .metadata("force_vuln_scan")
                .await
                .and_then(|v| v.as_bool())
                .unwrap_or(false);
            if !forced {
                info!("less than 3 ports open, skipping vulnerability scan");
            }
            return Ok(forced);
        }
        Ok(true)
    }

    async fn execute(&self, ctx: &ScanContext) -> anyhow::Result<ScanResult> {
        let started_at = Utc::now();
        let ports = ctx.open_ports().await;

        info!("running vulnerability scan on {} ports", ports.len());
        warn!("vulnerability scripts can take a long time");
        let output = run_command(&self.command(ctx, &ports), None).await?;
        let finished_at = Utc::now();

        if !output.success() {
            let error = format!("nmap exited with code {}", output.exit_code);
            warn!("{error}");
            return Ok(ScanResult::failed(
                self.name(),
                started_at,
                finished_at,
                format!("{}\n{}", output.stdout, output.stderr),
                error,
            ));
        }

        let gnmap = tokio::fs::read_to_string(ctx.output_dir().join("nmap_vuln.gnmap"))
            .await
            .unwrap_or_default();
        let report = NmapParser.parse(&gnmap);

        let cves = extract_cves(&output.stdout);
        let vulnerable_lines = output
            .stdout
            .lines()
            .filter(|line| line.contains("VULNERABLE"))
            .count();
        info!(
            "vulnerability scan complete: {} CVE references, {vulnerable_lines} vulnerable markers",
            cves.len()
        );

        let mut payload = report.to_payload();
        payload["cves"] = serde_json::json!(cves);

        Ok(
            ScanResult::ok(self.name(), started_at, finished_at, output.stdout, payload)
                .with_extra("cve_count", cves.len())
                .with_extra("vulnerable_markers", vulnerable_lines)
                .with_extra("scanned_ports", ports.len()),
        )
    }
}

/// Collect distinct CVE identifiers mentioned in script output.
fn extract_cves(output: &str) -> Vec<String> {
    let re = Regex::new(r"CVE-\d{4}-\d{4,}").expect("static regex");
    let mut cves: Vec<String> = re
        .find_iter(output)
        .map(|m| m.as_str().to_string())
        .collect();
    cves.sort();
    cves.dedup();
    cves
}

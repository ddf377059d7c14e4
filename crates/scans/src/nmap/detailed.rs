//! Service and version detection.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{info, warn};

use autoscout_core::{run_command, Scan, ScanContext, ScanResult};

use super::join_ports;
use crate::parser::NmapParser;
use crate::recon::ContextExt;

/// Service version detection and OS fingerprinting on discovered ports.
pub struct DetailedScan;

impl DetailedScan {
    fn command(&self, ctx: &ScanContext, ports: &[u16]) -> Vec<String> {
        let txt = ctx.output_dir().join("nmap_detailed.txt");
        let gnmap = ctx.output_dir().join("nmap_detailed.gnmap");
        vec![
            "sudo".into(),
            "nmap".into(),
            "-sV".into(),
            "-sC".into(),
            "-A".into(),
            "-O".into(),
            "-p".into(),
            join_ports(ports),
            "-oN".into(),
            txt.to_string_lossy().into_owned(),
            "-oG".into(),
            gnmap.to_string_lossy().into_owned(),
            ctx.target().to_string(),
        ]
    }
}

#[async_trait]
impl Scan for DetailedScan {
    fn name(&self) -> &str {
        "detailed_nmap"
    }

    fn description(&self) -> &str {
        "Service version detection and OS fingerprinting on open ports"
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(900)
    }

    fn requires_root(&self) -> bool {
        true
    }

    async fn can_run(&self, ctx: &ScanContext) -> anyhow::Result<bool> {
        if !ctx.has_open_ports().await {
            info!("no open ports found, skipping detailed scan");
            return Ok(false);
        }
        Ok(true)
    }

    async fn execute(&self, ctx: &ScanContext) -> anyhow::Result<ScanResult> {
        let started_at = Utc::now();
        let ports = ctx.open_ports().await;

        info!("running detailed nmap scan on {} ports", ports.len());
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

        let gnmap = tokio::fs::read_to_string(ctx.output_dir().join("nmap_detailed.gnmap"))
            .await
            .unwrap_or_default();
        let report = NmapParser.parse(&gnmap);
        let service_count = report
            .ports
            .iter()
            .filter(|port| !port.service.is_empty())
            .count();
        info!("detailed scan complete: identified {service_count} services");

        Ok(
            ScanResult::ok(self.name(), started_at, finished_at, output.stdout, report.to_payload())
                .with_extra("service_count", service_count)
                .with_extra("scanned_ports", ports.len()),
        )
    }
}

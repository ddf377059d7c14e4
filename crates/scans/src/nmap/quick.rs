//! Fast TCP port discovery.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{info, warn};

use autoscout_core::{run_command, Scan, ScanContext, ScanResult};

use crate::parser::NmapParser;

/// Fast TCP SYN scan of all ports.
pub struct QuickScan;

impl QuickScan {
    fn command(&self, ctx: &ScanContext) -> Vec<String> {
        let txt = ctx.output_dir().join("nmap_quick.txt");
        let gnmap = ctx.output_dir().join("nmap_quick.gnmap");
        vec![
            "sudo".into(),
            "nmap".into(),
            "-sS".into(),
            "-Pn".into(),
            "-p-".into(),
            "--max-retries".into(),
            "3".into(),
            "--min-rate".into(),
            "1000".into(),
            "-oN".into(),
            txt.to_string_lossy().into_owned(),
            "-oG".into(),
            gnmap.to_string_lossy().into_owned(),
            ctx.target().to_string(),
        ]
    }
}

#[async_trait]
impl Scan for QuickScan {
    fn name(&self) -> &str {
        "quick_nmap"
    }

    fn description(&self) -> &str {
        "Fast TCP SYN scan of all ports (1-65535)"
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(600)
    }

    fn requires_root(&self) -> bool {
        // SYN scan needs raw sockets.
        true
    }

    async fn execute(&self, ctx: &ScanContext) -> anyhow::Result<ScanResult> {
        let started_at = Utc::now();

        info!("running quick nmap scan on {}", ctx.target());
        let output = run_command(&self.command(ctx), None).await?;
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

        let gnmap_path = ctx.output_dir().join("nmap_quick.gnmap");
        let gnmap = match tokio::fs::read_to_string(&gnmap_path).await {
            Ok(content) => content,
            Err(e) => {
                return Ok(ScanResult::failed(
                    self.name(),
                    started_at,
                    finished_at,
                    output.stdout,
                    format!("failed to read nmap output {}: {e}", gnmap_path.display()),
                ));
            }
        };

        let report = NmapParser.parse(&gnmap);
        let port_count = report.ports.len();
        info!("quick scan complete: found {port_count} open ports");

        Ok(
            ScanResult::ok(self.name(), started_at, finished_at, output.stdout, report.to_payload())
                .with_extra("port_count", port_count),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_targets_all_ports_and_writes_greppable_output() {
        let ctx = ScanContext::new("10.9.9.1", std::env::temp_dir().join("autoscout-nmap-tests"))
            .unwrap();
        let argv = QuickScan.command(&ctx);

        assert_eq!(argv[0], "sudo");
        assert_eq!(argv[1], "nmap");
        assert!(argv.contains(&"-p-".to_string()));
        assert!(argv.contains(&"-oG".to_string()));
        assert_eq!(argv.last().unwrap(), "10.9.9.1");
    }

    #[test]
    fn scan_metadata() {
        assert_eq!(QuickScan.name(), "quick_nmap");
        assert!(QuickScan.requires_root());
        assert_eq!(QuickScan.timeout(), Duration::from_secs(600));
    }
}

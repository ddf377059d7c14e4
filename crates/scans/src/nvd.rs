//! CVE lookup against the NVD REST API.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use tracing::{info, warn};

use autoscout_core::{Scan, ScanContext, ScanResult};

use crate::recon::ContextExt;

const NVD_API_URL: &str = "https://services.nvd.nist.gov/rest/json/cves/2.0";
const RESULTS_PER_PRODUCT: u32 = 5;

/// Looks up known CVEs for the service products identified by earlier
/// scans, via the NVD keyword search API.
pub struct CveLookupScan;

#[derive(Debug, Deserialize)]
struct NvdResponse {
    #[serde(default, rename = "totalResults")]
    total_results: u64,
    #[serde(default)]
    vulnerabilities: Vec<NvdVulnerability>,
}

#[derive(Debug, Deserialize)]
struct NvdVulnerability {
    cve: NvdCve,
}

#[derive(Debug, Deserialize)]
struct NvdCve {
    id: String,
    #[serde(default)]
    descriptions: Vec<NvdDescription>,
    #[serde(default)]
    metrics: NvdMetrics,
}

#[derive(Debug, Deserialize)]
struct NvdDescription {
    lang: String,
    value: String,
}

#[derive(Debug, Default, Deserialize)]
struct NvdMetrics {
    #[serde(default, rename = "cvssMetricV31")]
    cvss_v31: Vec<NvdCvssMetric>,
}

#[derive(Debug, Deserialize)]
struct NvdCvssMetric {
    #[serde(rename = "cvssData")]
    cvss_data: NvdCvssData,
}

#[derive(Debug, Deserialize)]
struct NvdCvssData {
    #[serde(rename = "baseScore")]
    base_score: f64,
}

/// Flatten an NVD response into per-CVE payload entries.
fn summarize(response: &NvdResponse) -> Vec<serde_json::Value> {
    response
        .vulnerabilities
        .iter()
        .map(|vuln| {
            let cve = &vuln.cve;
            let summary = cve
                .descriptions
                .iter()
                .find(|d| d.lang == "en")
                .map(|d| d.value.as_str())
                .unwrap_or("");
            let score = cve
                .metrics
                .cvss_v31
                .first()
                .map(|metric| metric.cvss_data.base_score);
            serde_json::json!({
                "id": cve.id,
                "score": score,
                "summary": summary,
            })
        })
        .collect()
}

#[async_trait]
impl Scan for CveLookupScan {
    fn name(&self) -> &str {
        "cve_lookup"
    }

    fn description(&self) -> &str {
        "Look up known CVEs for detected service products (NVD)"
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(120)
    }

    async fn can_run(&self, ctx: &ScanContext) -> anyhow::Result<bool> {
        if ctx.products().await.is_empty() {
            info!("no service products identified, skipping CVE lookup");
            return Ok(false);
        }
        Ok(true)
    }

    async fn execute(&self, ctx: &ScanContext) -> anyhow::Result<ScanResult> {
        let started_at = Utc::now();
        let products = ctx.products().await;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent("autoscout")
            .build()?;

        let mut services = Vec::with_capacity(products.len());
        let mut lookups_ok = 0usize;
        for (port, product) in &products {
            info!("querying NVD for '{product}' (port {port})");
            match lookup(&client, product).await {
                Ok(response) => {
                    lookups_ok += 1;
                    services.push(serde_json::json!({
                        "port": port,
                        "product": product,
                        "total_results": response.total_results,
                        "cves": summarize(&response),
                    }));
                }
                Err(e) => {
                    warn!("NVD lookup for '{product}' failed: {e}");
                    services.push(serde_json::json!({
                        "port": port,
                        "product": product,
                        "error": e.to_string(),
                    }));
                }
            }
        }
        let finished_at = Utc::now();

        if lookups_ok == 0 {
            return Ok(ScanResult::failed(
                self.name(),
                started_at,
                finished_at,
                "",
                "all NVD lookups failed",
            ));
        }

        info!("CVE lookup complete: {lookups_ok}/{} products resolved", products.len());
        Ok(ScanResult::ok(
            self.name(),
            started_at,
            finished_at,
            "",
            serde_json::json!({ "services": services }),
        )
        .with_extra("products_resolved", lookups_ok))
    }
}

async fn lookup(client: &reqwest::Client, product: &str) -> reqwest::Result<NvdResponse> {
    let per_page = RESULTS_PER_PRODUCT.to_string();
    client
        .get(NVD_API_URL)
        .query(&[("keywordSearch", product), ("resultsPerPage", per_page.as_str())])
        .send()
        .await?
        .error_for_status()?
        .json::<NvdResponse>()
        .await
}

use chrono::DateTime;
use tabled::settings::Style;
use tabled::{Table, Tabled};

use crate::model::SummaryOutput;

#[derive(Tabled)]
struct SummaryRow {
    target: String,
    started: String,
    completed: bool,
    exit_code: i32,
    nodes: usize,
    online: usize,
    #[tabled(rename = "mean ping (ms)")]
    #[tabled(display = "float2_or_dash")]
    mean_ping_ms: Option<f64>,
    #[tabled(rename = "best node")]
    best_node: String,
    #[tabled(rename = "peak speed (B/s)")]
    #[tabled(display = "number_or_dash")]
    peak_speed: Option<u64>,
}

impl From<&SummaryOutput> for SummaryRow {
    fn from(output: &SummaryOutput) -> Self {
        let run = &output.run_summary;
        let best = output.stats.best_node.as_ref();
        Self {
            target: run.target.clone(),
            started: DateTime::from_timestamp(run.started_at, 0)
                .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
                .unwrap_or_else(|| run.started_at.to_string()),
            completed: run.completed,
            exit_code: run.exit_code,
            nodes: output.stats.node_count,
            online: output.stats.online_count,
            mean_ping_ms: output.stats.mean_ping_ms,
            best_node: best
                .map(|node| {
                    if node.remarks.is_empty() {
                        node.section.clone()
                    } else {
                        node.remarks.clone()
                    }
                })
                .unwrap_or_else(|| "-".to_string()),
            peak_speed: best.map(|node| node.peak_speed),
        }
    }
}

fn float2_or_dash(n: &Option<f64>) -> String {
    n.map(|n| format!("{:.2}", n))
        .unwrap_or_else(|| "-".to_string())
}

fn number_or_dash(n: &Option<u64>) -> String {
    n.map(|n| n.to_string()).unwrap_or_else(|| "-".to_string())
}

/// Render one row per run.
pub fn render_table(outputs: &[SummaryOutput]) -> String {
    let mut table = Table::new(outputs.iter().map(SummaryRow::from));
    table.with(Style::modern());
    table.to_string()
}

#[cfg(test)]
mod tests {
    use stairspeed_summary_model::RunSummary;

    use super::*;
    use crate::model::{BestNode, RunStats};

    #[test]
    fn test_should_render_a_row_per_run() {
        let mut run = RunSummary::new(
            "run-1".to_string(),
            "https://a.example/sub".to_string(),
            "stream".to_string(),
            vec![],
            1_760_000_000,
            "0.1.0".to_string(),
        );
        run.completed = true;
        run.exit_code = 0;
        let output = SummaryOutput {
            run_summary: run,
            stats: RunStats {
                node_count: 2,
                online_count: 1,
                mean_ping_ms: Some(12.346),
                best_node: Some(BestNode {
                    section: "shadowsocks|1.2.3.4|443".to_string(),
                    remarks: "HK 01".to_string(),
                    peak_speed: 2048,
                }),
            },
        };

        let table = render_table(&[output]);

        assert!(table.contains("https://a.example/sub"));
        assert!(table.contains("12.35"));
        assert!(table.contains("HK 01"));
        assert!(table.contains("2048"));
        assert!(table.contains("2025-10-09 08:53:20"));
    }

    #[test]
    fn test_should_render_dashes_without_nodes() {
        let run = RunSummary::new(
            "run-2".to_string(),
            "bad".to_string(),
            "stream".to_string(),
            vec![],
            0,
            "0.1.0".to_string(),
        );
        let table = render_table(&[SummaryOutput {
            run_summary: run,
            stats: RunStats::default(),
        }]);

        assert!(table.contains("bad"));
        assert!(table.contains("-"));
    }
}

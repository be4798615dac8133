//! Rendering of run results, attempt summaries and token details.

use serde::Serialize;

use crate::auth::Credential;
use crate::cli::OutputFormat;
use crate::orchestrator::{AttemptRecord, RunReport};
use crate::remote::ClusterInfo;
use crate::result::{Row, TabularResult, Value};

/// JSON shape of a successful run.
#[derive(Debug, Serialize)]
struct JsonReport<'a> {
    strategy: &'a str,
    row_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    columns: Option<&'a [String]>,
    rows: &'a [Row],
    attempts: Vec<JsonAttempt<'a>>,
}

#[derive(Debug, Serialize)]
struct JsonAttempt<'a> {
    strategy: &'a str,
    outcome: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    detail: Option<&'a str>,
    elapsed_ms: u64,
}

impl<'a> From<&'a AttemptRecord> for JsonAttempt<'a> {
    fn from(record: &'a AttemptRecord) -> Self {
        Self {
            strategy: &record.strategy,
            outcome: record.outcome.as_str(),
            detail: record.detail.as_deref(),
            elapsed_ms: record.elapsed.as_millis() as u64,
        }
    }
}

/// JSON shape of one `--list-clusters` entry.
#[derive(Debug, Serialize)]
struct JsonCluster<'a> {
    name: Option<&'a str>,
    id: &'a str,
    state: &'a str,
    source: &'a str,
}

impl<'a> From<&'a ClusterInfo> for JsonCluster<'a> {
    fn from(cluster: &'a ClusterInfo) -> Self {
        Self {
            name: cluster.cluster_name.as_deref(),
            id: &cluster.cluster_id,
            state: &cluster.state,
            source: cluster.cluster_source.as_deref().unwrap_or("UNKNOWN"),
        }
    }
}

/// Renders a successful run.
pub fn render_report(report: &RunReport, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => format_text(report),
        OutputFormat::Json => format_json(report),
    }
}

fn format_text(report: &RunReport) -> String {
    let result = &report.result;
    let mut output = format_table(result);
    if !output.is_empty() {
        output.push('\n');
    }
    output.push_str(&format!(
        "({} row{} via {})\n",
        result.row_count(),
        if result.row_count() == 1 { "" } else { "s" },
        report.strategy
    ));
    output
}

fn format_json(report: &RunReport) -> String {
    let json_output = JsonReport {
        strategy: report.strategy.as_str(),
        row_count: report.result.row_count(),
        columns: report.result.columns.as_deref(),
        rows: &report.result.rows,
        attempts: report.attempts.iter().map(JsonAttempt::from).collect(),
    };

    serde_json::to_string_pretty(&json_output)
        .map(|mut s| {
            s.push('\n');
            s
        })
        .unwrap_or_else(|e| format!("{{\"error\": \"Failed to serialize: {}\"}}\n", e))
}

/// Formats rows as an aligned table, with a header when column names are known.
fn format_table(result: &TabularResult) -> String {
    let rows: Vec<Vec<String>> = result
        .rows
        .iter()
        .map(|row| row.iter().map(|v| v.to_display_string()).collect())
        .collect();

    let column_count = result
        .columns
        .as_ref()
        .map(Vec::len)
        .into_iter()
        .chain(rows.iter().map(Vec::len))
        .max()
        .unwrap_or(0);
    if column_count == 0 {
        return String::new();
    }

    let mut widths = vec![0usize; column_count];
    let headers = result.columns.as_deref().unwrap_or_default();
    for line in std::iter::once(headers).chain(rows.iter().map(Vec::as_slice)) {
        for (i, cell) in line.iter().enumerate() {
            widths[i] = widths[i].max(cell.chars().count());
        }
    }

    let format_line = |cells: &[String]| -> String {
        cells
            .iter()
            .enumerate()
            .map(|(i, cell)| format!("{:width$}", cell, width = widths[i]))
            .collect::<Vec<_>>()
            .join(" │ ")
            .trim_end()
            .to_string()
    };

    let mut output = String::new();
    if !headers.is_empty() {
        output.push_str(&format_line(headers));
        output.push('\n');
        let separator: Vec<String> = widths.iter().map(|w| "─".repeat(*w)).collect();
        output.push_str(&separator.join("─┼─"));
        output.push('\n');
    }
    for row in &rows {
        output.push_str(&format_line(row.as_slice()));
        output.push('\n');
    }

    output.trim_end().to_string()
}

/// Renders the workspace's clusters for `--list-clusters`.
pub fn render_clusters(clusters: &[ClusterInfo], format: OutputFormat) -> String {
    let entries: Vec<JsonCluster> = clusters.iter().map(JsonCluster::from).collect();
    match format {
        OutputFormat::Json => serde_json::to_string_pretty(&entries)
            .map(|mut s| {
                s.push('\n');
                s
            })
            .unwrap_or_else(|e| format!("{{\"error\": \"Failed to serialize: {}\"}}\n", e)),
        OutputFormat::Text => {
            if entries.is_empty() {
                return "No clusters found\n".to_string();
            }
            let rows = entries
                .iter()
                .map(|c| {
                    vec![
                        Value::from(c.name.unwrap_or("-")),
                        Value::from(c.id),
                        Value::from(c.state),
                        Value::from(c.source),
                    ]
                })
                .collect();
            let columns = ["name", "id", "state", "source"].map(String::from).to_vec();
            format!("{}\n", format_table(&TabularResult::new(Some(columns), rows)))
        }
    }
}

/// One line per attempt, for the exhaustion diagnostic.
pub fn render_attempts(attempts: &[AttemptRecord]) -> String {
    attempts
        .iter()
        .enumerate()
        .map(|(i, record)| format!("  {}. {}\n", i + 1, record))
        .collect()
}

/// Describes a credential for `--check-auth`. The token itself is never printed.
pub fn render_credential(credential: &Credential, format: OutputFormat) -> String {
    let claims = credential.claims();
    match format {
        OutputFormat::Json => {
            let value = serde_json::json!({
                "token_type": credential.token_type,
                "expires_in": credential.expires_in,
                "claims": claims.as_ref().map(|c| serde_json::json!({
                    "appid": c.appid,
                    "aud": c.aud,
                    "tid": c.tid,
                    "exp": c.exp,
                })),
            });
            format!("{value:#}\n")
        }
        OutputFormat::Text => {
            let mut output = format!(
                "Token type: {}\nExpires in: {}s\n",
                credential.token_type, credential.expires_in
            );
            match claims {
                Some(c) => {
                    let field = |v: Option<String>| v.unwrap_or_else(|| "-".to_string());
                    output.push_str(&format!("App id:     {}\n", field(c.appid)));
                    output.push_str(&format!("Audience:   {}\n", field(c.aud)));
                    output.push_str(&format!("Tenant:     {}\n", field(c.tid)));
                    output.push_str(&format!("Expiry:     {}\n", format_expiry(c.exp)));
                }
                None => output.push_str("Claims:     opaque token\n"),
            }
            output
        }
    }
}

/// Formats a JWT `exp` claim as epoch seconds plus time remaining.
fn format_expiry(exp: Option<i64>) -> String {
    let Some(exp) = exp else {
        return "-".to_string();
    };
    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0);
    let remaining = exp - now;
    if remaining >= 0 {
        format!("{exp} (in {remaining}s)")
    } else {
        format!("{exp} (expired {}s ago)", -remaining)
    }
}

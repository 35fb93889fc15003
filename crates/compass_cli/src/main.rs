//! Command-line client for the ACM Compass API.

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use compass_core::DEFAULT_CLI_SERVER_URL;
use serde_json::Value;
use std::io;
use std::time::{Duration, Instant};


#[derive(Parser)]
#[command(name = "compass", about = "ACM Compass CLI", version)]
struct Cli {
    /// Server URL (can also be set via COMPASS_SERVER env var)
    #[arg(short, long, env = "COMPASS_SERVER")]
    server: Option<String>,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    json: bool,

    /// Print timing for API requests
    #[arg(long, global = true)]
    timing: bool,

    /// Request timeout in seconds
    #[arg(short = 't', long, default_value = "30")]
    timeout: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
    /// List problems
    Problems {
        /// all, solved, or unsolved
        #[arg(long)]
        status: Option<String>,
        /// First creation day (YYYY-MM-DD)
        #[arg(long)]
        from: Option<String>,
        /// Last creation day (YYYY-MM-DD)
        #[arg(long)]
        to: Option<String>,
    },
    /// Show one problem
    Problem { id: String },
    /// Delete a problem and its solution
    DeleteProblem { id: String },
    /// List contests
    Contests {
        #[arg(long)]
        from: Option<String>,
        #[arg(long)]
        to: Option<String>,
    },
    /// Show what the bookmarklet has staged
    Staged,
    /// Commit everything staged
    Confirm,
    /// Discard everything staged
    ClearStaged,
    /// Sync the data repository
    Sync {
        #[command(subcommand)]
        action: SyncAction,
    },
}

#[derive(Subcommand)]
enum SyncAction {
    /// Repository summary and `git status`
    Status,
    /// Pull remote changes
    Pull {
        #[arg(short, long)]
        branch: Option<String>,
    },
    /// Commit local changes and push
    Push {
        #[arg(short, long)]
        branch: Option<String>,
        /// Commit message (defaults to a timestamp)
        #[arg(short, long)]
        message: Option<String>,
    },
}

fn log_timing(timing: bool, label: &str, request: Duration, parse: Duration) {
    if timing {
        eprintln!(
            "[timing] {}: request {:.1} ms, parse {:.1} ms",
            label,
            request.as_secs_f64() * 1000.0,
            parse.as_secs_f64() * 1000.0
        );
    }
}

fn error_message_for_response(status: reqwest::StatusCode, body: &str) -> String {
    if body.trim().is_empty() {
        return status
            .canonical_reason()
            .unwrap_or("Request failed")
            .to_string();
    }

    if let Ok(value) = serde_json::from_str::<Value>(body) {
        return value
            .get("error")
            .and_then(|v| v.as_str())
            .unwrap_or(body)
            .to_string();
    }

    body.to_string()
}

fn fail(action: &str, message: impl std::fmt::Display) -> ! {
    eprintln!("{} failed: {}", action, message);
    std::process::exit(1);
}

async fn ensure_success_or_exit(res: reqwest::Response, action: &str) -> reqwest::Response {
    let status = res.status();
    if status.is_success() {
        return res;
    }

    let body = match res.text().await {
        Ok(body) => body,
        Err(err) => format!("failed to read error response body: {}", err),
    };
    let message = error_message_for_response(status, &body);
    eprintln!("{} failed ({}): {}", action, status, message);
    std::process::exit(1);
}

fn api_url(server: &str, segments: &[&str]) -> Result<reqwest::Url, String> {
    let mut url = reqwest::Url::parse(server)
        .map_err(|err| format!("Invalid server URL '{}': {}", server, err))?;
    let mut path = url
        .path_segments_mut()
        .map_err(|_| "Server URL cannot be used as an API base".to_string())?;
    path.pop_if_empty();
    for segment in segments {
        path.push(segment);
    }
    drop(path);
    Ok(url)
}

fn normalize_server(server: String) -> String {
    if let Ok(mut url) = reqwest::Url::parse(&server) {
        let is_plain_localhost =
            url.scheme().eq_ignore_ascii_case("http") && url.host_str() == Some("localhost");
        if is_plain_localhost && url.set_host(Some("127.0.0.1")).is_err() {
            return server;
        }
        let mut normalized = url.to_string();
        while normalized.ends_with('/') {
            normalized.pop();
        }
        return normalized;
    }
    server
}

fn resolve_server(server: Option<String>) -> String {
    server
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| DEFAULT_CLI_SERVER_URL.to_string())
}

/// Non-empty query pairs for a listing request.
fn listing_query<'a>(pairs: &[(&'a str, &'a Option<String>)]) -> Vec<(&'a str, &'a str)> {
    pairs
        .iter()
        .filter_map(|(key, value)| {
            value
                .as_deref()
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(|value| (*key, value))
        })
        .collect()
}

fn pretty(value: &Value) -> Result<String, String> {
    serde_json::to_string_pretty(value).map_err(|err| format!("response encoding error: {}", err))
}

fn str_field<'a>(value: &'a Value, key: &str) -> &'a str {
    value.get(key).and_then(Value::as_str).unwrap_or("")
}

fn problem_state(problem: &Value) -> &str {
    if problem.get("solved").and_then(Value::as_bool) == Some(true) {
        return "solved";
    }
    match str_field(problem, "unsolved_custom_label") {
        "" => match str_field(problem, "unsolved_stage") {
            "" => "open",
            stage => stage,
        },
        label => label,
    }
}

fn format_problem_rows(problems: &[Value], json: bool) -> Result<String, String> {
    if json {
        return pretty(&Value::Array(problems.to_vec()));
    }
    let mut rows = Vec::with_capacity(problems.len());
    for (index, problem) in problems.iter().enumerate() {
        let id = str_field(problem, "id");
        if id.is_empty() {
            return Err(format!("response item {} missing 'id' field", index));
        }
        rows.push(format!(
            "{:<36} {:<32} {}",
            id,
            problem_state(problem),
            str_field(problem, "title")
        ));
    }
    Ok(rows.join("\n"))
}

fn format_problem_detail(problem: &Value, json: bool) -> Result<String, String> {
    if json {
        return pretty(problem);
    }
    let title = problem
        .get("title")
        .and_then(Value::as_str)
        .ok_or_else(|| "response missing 'title' field".to_string())?;
    let mut lines = vec![
        format!("{} [{}]", title, problem_state(problem)),
        format!("id:       {}", str_field(problem, "id")),
    ];
    for key in ["link", "source", "assignee", "notes"] {
        let value = str_field(problem, key);
        if !value.is_empty() {
            lines.push(format!("{:<9} {}", format!("{}:", key), value));
        }
    }
    if let Some(tags) = problem.get("tags").and_then(Value::as_array) {
        let tags: Vec<&str> = tags.iter().filter_map(Value::as_str).collect();
        if !tags.is_empty() {
            lines.push(format!("tags:     {}", tags.join(", ")));
        }
    }
    if problem.get("has_solution").and_then(Value::as_bool) == Some(true) {
        lines.push("solution: yes".to_string());
    }
    Ok(lines.join("\n"))
}

fn format_contest_rows(contests: &[Value], json: bool) -> Result<String, String> {
    if json {
        return pretty(&Value::Array(contests.to_vec()));
    }
    let rows: Vec<String> = contests
        .iter()
        .map(|contest| {
            let solved = contest
                .get("problems")
                .and_then(Value::as_array)
                .map_or(0, |rows| {
                    rows.iter()
                        .filter(|row| str_field(row, "my_status") == "ac")
                        .count()
                });
            let total = contest
                .get("total_problems")
                .and_then(Value::as_u64)
                .unwrap_or(0);
            format!(
                "{:<36} {:>2}/{:<2} {:<10} {}",
                str_field(contest, "id"),
                solved,
                total,
                str_field(contest, "rank_str"),
                str_field(contest, "name")
            )
        })
        .collect();
    Ok(rows.join("\n"))
}

fn format_staged(pending: &Value, json: bool) -> Result<String, String> {
    if json {
        return pretty(pending);
    }
    let mut lines = Vec::new();
    match pending.get("contest").filter(|contest| !contest.is_null()) {
        Some(contest) => lines.push(format!(
            "Contest:  {} ({} problems)",
            str_field(contest, "name"),
            contest
                .get("total_problems")
                .and_then(Value::as_u64)
                .unwrap_or(0)
        )),
        None => lines.push("Contest:  nothing staged".to_string()),
    }
    match pending.get("problems").filter(|batch| !batch.is_null()) {
        Some(batch) => {
            let count = batch
                .get("problems")
                .and_then(Value::as_array)
                .map_or(0, Vec::len);
            let merged = batch.get("stats_merged").and_then(Value::as_bool) == Some(true);
            lines.push(format!(
                "Problems: {} from contest {}{}",
                count,
                str_field(batch, "contestId"),
                if merged { " (standings merged)" } else { "" }
            ));
        }
        None => lines.push("Problems: nothing staged".to_string()),
    }
    Ok(lines.join("\n"))
}

fn format_confirm_report(report: &Value, json: bool) -> Result<String, String> {
    if json {
        return pretty(report);
    }
    let mut lines = Vec::new();
    if let Some(contest) = report.get("contest").filter(|c| !c.is_null()) {
        if contest.get("success").and_then(Value::as_bool) == Some(true) {
            lines.push(format!("Contest created: {}", str_field(contest, "contest_id")));
        } else {
            lines.push(format!("Contest failed: {}", str_field(contest, "error")));
        }
    }
    if let Some(batch) = report.get("problems").filter(|b| !b.is_null()) {
        let created = batch.get("success_count").and_then(Value::as_u64).unwrap_or(0);
        let failed = batch.get("fail_count").and_then(Value::as_u64).unwrap_or(0);
        lines.push(format!("Problems created: {}, failed: {}", created, failed));
        if let Some(failures) = batch.get("failures").and_then(Value::as_array) {
            for failure in failures {
                lines.push(format!(
                    "  {} {}: {}",
                    str_field(failure, "letter"),
                    str_field(failure, "title"),
                    str_field(failure, "error")
                ));
            }
        }
    }
    Ok(lines.join("\n"))
}

/// Render a sync transcript; the flag says whether the operation succeeded.
fn format_transcript(transcript: &Value, json: bool) -> Result<(String, bool), String> {
    let success = transcript
        .get("success")
        .and_then(Value::as_bool)
        .ok_or_else(|| "response missing 'success' field".to_string())?;
    if json {
        return pretty(transcript).map(|text| (text, success));
    }
    Ok((str_field(transcript, "output").to_string(), success))
}

fn format_sync_summary(summary: &Value) -> String {
    let repo = summary.get("is_repo").and_then(Value::as_bool) == Some(true);
    let config = summary.get("config").cloned().unwrap_or(Value::Null);
    let or_dash = |text: &str| if text.is_empty() { "-".to_string() } else { text.to_string() };
    [
        format!("repository: {}", if repo { "yes" } else { "no" }),
        format!("remote:     {}", or_dash(str_field(summary, "remote_url"))),
        format!("branch:     {}", or_dash(str_field(summary, "current_branch"))),
        format!("configured: {}", or_dash(str_field(&config, "branch"))),
    ]
    .join("\n")
}

struct Api {
    client: reqwest::Client,
    server: String,
    timing: bool,
}

impl Api {
    fn url(&self, action: &str, segments: &[&str]) -> reqwest::Url {
        api_url(&self.server, segments).unwrap_or_else(|message| fail(action, message))
    }

    async fn send(
        &self,
        request: reqwest::RequestBuilder,
        action: &str,
    ) -> Result<Value, reqwest::Error> {
        let request_start = Instant::now();
        let res = request.send().await?;
        let request_elapsed = request_start.elapsed();
        let res = ensure_success_or_exit(res, action).await;

        let parse_start = Instant::now();
        let value: Value = res.json().await?;
        log_timing(self.timing, action, request_elapsed, parse_start.elapsed());
        Ok(value)
    }

    async fn get(
        &self,
        action: &str,
        segments: &[&str],
        query: &[(&str, &str)],
    ) -> Result<Value, reqwest::Error> {
        let url = self.url(action, segments);
        self.send(self.client.get(url).query(query), action).await
    }

    async fn post(
        &self,
        action: &str,
        segments: &[&str],
        body: Option<Value>,
    ) -> Result<Value, reqwest::Error> {
        let url = self.url(action, segments);
        let request = self.client.post(url);
        let request = match body {
            Some(body) => request.json(&body),
            None => request,
        };
        self.send(request, action).await
    }

    async fn delete(&self, action: &str, segments: &[&str]) -> Result<Value, reqwest::Error> {
        let url = self.url(action, segments);
        self.send(self.client.delete(url), action).await
    }
}

fn print_or_fail(action: &str, output: Result<String, String>) {
    match output {
        Ok(output) if output.is_empty() => {}
        Ok(output) => println!("{}", output),
        Err(message) => fail(action, message),
    }
}

fn print_transcript(action: &str, transcript: &Value, json: bool) {
    match format_transcript(transcript, json) {
        Ok((output, success)) => {
            println!("{}", output);
            if !success {
                std::process::exit(1);
            }
        }
        Err(message) => fail(action, message),
    }
}

fn as_rows(action: &str, value: Value) -> Vec<Value> {
    match value {
        Value::Array(rows) => rows,
        _ => fail(action, "expected a JSON array"),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let Cli {
        server,
        json,
        timing,
        timeout,
        command,
    } = Cli::parse();

    let api = Api {
        client: reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout))
            .build()?,
        server: normalize_server(resolve_server(server)),
        timing,
    };

    match command {
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            generate(shell, &mut cmd, name, &mut io::stdout());
        }
        Commands::Problems { status, from, to } => {
            let query = listing_query(&[("status", &status), ("from", &from), ("to", &to)]);
            let rows = api.get("List problems", &["api", "problems"], &query).await?;
            let rows = as_rows("List problems", rows);
            print_or_fail("List problems", format_problem_rows(&rows, json));
        }
        Commands::Problem { id } => {
            let problem = api
                .get("Get problem", &["api", "problems", id.as_str()], &[])
                .await?;
            print_or_fail("Get problem", format_problem_detail(&problem, json));
        }
        Commands::DeleteProblem { id } => {
            let response = api
                .delete("Delete problem", &["api", "problems", id.as_str()])
                .await?;
            let output = if json {
                pretty(&response)
            } else {
                Ok(format!("Deleted problem: {}", id))
            };
            print_or_fail("Delete problem", output);
        }
        Commands::Contests { from, to } => {
            let query = listing_query(&[("from", &from), ("to", &to)]);
            let rows = api.get("List contests", &["api", "contests"], &query).await?;
            let rows = as_rows("List contests", rows);
            print_or_fail("List contests", format_contest_rows(&rows, json));
        }
        Commands::Staged => {
            let pending = api.get("Staged", &["api", "import"], &[]).await?;
            print_or_fail("Staged", format_staged(&pending, json));
        }
        Commands::Confirm => {
            let report = api
                .post("Confirm", &["api", "import", "confirm"], None)
                .await?;
            print_or_fail("Confirm", format_confirm_report(&report, json));
        }
        Commands::ClearStaged => {
            let response = api.delete("Clear staged", &["api", "import"]).await?;
            let output = if json {
                pretty(&response)
            } else {
                Ok("Cleared staged imports".to_string())
            };
            print_or_fail("Clear staged", output);
        }
        Commands::Sync { action } => match action {
            SyncAction::Status => {
                let summary = api.get("Sync status", &["api", "sync"], &[]).await?;
                if json {
                    print_or_fail("Sync status", pretty(&summary));
                    return Ok(());
                }
                println!("{}", format_sync_summary(&summary));
                if summary.get("is_repo").and_then(Value::as_bool) == Some(true) {
                    let status = api
                        .get("Sync status", &["api", "sync", "status"], &[])
                        .await?;
                    print_transcript("Sync status", &status, false);
                }
            }
            SyncAction::Pull { branch } => {
                let body = serde_json::json!({ "branch": branch });
                let transcript = api
                    .post("Pull", &["api", "sync", "pull"], Some(body))
                    .await?;
                print_transcript("Pull", &transcript, json);
            }
            SyncAction::Push { branch, message } => {
                let body = serde_json::json!({ "branch": branch, "message": message });
                let transcript = api
                    .post("Push", &["api", "sync", "push"], Some(body))
                    .await?;
                print_transcript("Push", &transcript, json);
            }
        },
    }

    Ok(())
}

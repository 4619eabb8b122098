//! api-call — 通过重试执行器发送单个 HTTP 请求的命令行工具
//!
//! Usage:
//!   api-call <METHOD> <URL> [--data <json>] [--header <name:value>]... [--timeout <secs>]
//!
//! Retry policy comes from `RESILIENT_MAX_RETRIES` / `RESILIENT_MIN_DELAY_MS` /
//! `RESILIENT_MAX_DELAY_MS`. Ctrl-C cancels the call, including any pending backoff.

use anyhow::{bail, Context};
use resilient_api::{ApiRequest, CancelHandle, RequestExecutor};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

struct Args {
    method: reqwest::Method,
    url: String,
    data: Option<String>,
    headers: Vec<(String, String)>,
    timeout: Option<Duration>,
}

fn print_usage() {
    println!(
        r#"api-call — send one request through the retrying executor

USAGE:
    api-call <METHOD> <URL> [OPTIONS]

OPTIONS:
    --data <json>             Request body (sent as application/json)
    --header <name:value>     Extra request header (repeatable)
    --timeout <secs>          Overall deadline for the call, retries included
    -h, --help                Show this help message

ENVIRONMENT:
    RESILIENT_API_KEY         Bearer token
    RESILIENT_MAX_RETRIES     Retry budget (default 3)
    RESILIENT_MIN_DELAY_MS    Base backoff delay (default 1000)
    RESILIENT_MAX_DELAY_MS    Backoff cap (default 60000)
    RUST_LOG                  Log filter (e.g. resilient_api=debug)"#
    );
}

fn parse_args(raw: &[String]) -> anyhow::Result<Args> {
    if raw.len() < 2 {
        bail!("expected <METHOD> <URL>");
    }
    let method = reqwest::Method::from_bytes(raw[0].to_uppercase().as_bytes())
        .with_context(|| format!("invalid method '{}'", raw[0]))?;
    let mut args = Args {
        method,
        url: raw[1].clone(),
        data: None,
        headers: Vec::new(),
        timeout: None,
    };

    let mut rest = raw[2..].iter();
    while let Some(flag) = rest.next() {
        let mut value = || {
            rest.next()
                .cloned()
                .with_context(|| format!("{} needs a value", flag))
        };
        match flag.as_str() {
            "--data" => args.data = Some(value()?),
            "--header" => {
                let h = value()?;
                let (name, val) = h
                    .split_once(':')
                    .with_context(|| format!("header '{}' is not name:value", h))?;
                args.headers.push((name.trim().to_string(), val.trim().to_string()));
            }
            "--timeout" => {
                let secs: u64 = value()?.parse().context("--timeout takes whole seconds")?;
                args.timeout = Some(Duration::from_secs(secs));
            }
            other => bail!("unknown option: {}", other),
        }
    }
    Ok(args)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let raw: Vec<String> = std::env::args().skip(1).collect();
    if raw.iter().any(|a| a == "-h" || a == "--help") {
        print_usage();
        return Ok(());
    }
    let args = match parse_args(&raw) {
        Ok(a) => a,
        Err(e) => {
            eprintln!("Error: {e:#}");
            eprintln!();
            print_usage();
            std::process::exit(2);
        }
    };

    let mut request = ApiRequest::new(args.method, &args.url)?;
    for (name, value) in &args.headers {
        request = request.with_header(name, value)?;
    }
    if let Some(data) = &args.data {
        let payload: serde_json::Value =
            serde_json::from_str(data).context("--data is not valid JSON")?;
        request = request.with_json(&payload)?;
    }

    let executor = RequestExecutor::builder().build()?;
    let mut cancel = CancelHandle::new();
    if let Some(timeout) = args.timeout {
        cancel = cancel.with_timeout(timeout);
    }

    let on_ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_ctrl_c.cancel();
        }
    });

    match executor.execute_with_stats(&request, &cancel).await {
        Ok((resp, stats)) => {
            eprintln!(
                "HTTP {} after {} attempt(s), {}ms",
                resp.status, stats.attempts, stats.duration_ms
            );
            println!("{}", resp.text());
            Ok(())
        }
        Err(e) => {
            if let Some(api) = e.api_error() {
                eprintln!("code: {} ({})", api.code, api.standard_code);
            }
            if let Some(rl) = e.rate_limit() {
                eprintln!(
                    "rate limit: {}/{} remaining, retry after {}s",
                    rl.remaining,
                    rl.limit,
                    rl.retry_after.as_secs()
                );
            }
            Err(e).context("request failed")
        }
    }
}

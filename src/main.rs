//! CLI driver for the blocking HTTP helper.
//!
//! Issues single GET/DELETE/POST/PUT calls, or repeats a POST to exercise the
//! helper under sustained use, recording every call to CSV.

mod infra;

use crate::infra::HeaderFile;
use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use http_helper::output::{CallRecord, append_record, print_response};
use http_helper::{CallOutcome, HttpHelper, Payload, RequestConfig, TextEncoding};
use serde_json::{Map, Value};
use std::ffi::OsStr;
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "http-helper")]
#[command(about = "Blocking HTTP calls with basic auth and custom TLS trust", long_about = None)]
struct Cli {
    #[command(flatten)]
    request: RequestArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct RequestArgs {
    /// Content type for POST/PUT bodies
    #[arg(long, global = true, default_value = "application/json")]
    content_type: String,

    /// Request timeout in seconds
    #[arg(long, global = true, default_value_t = 60)]
    timeout: u64,

    /// Maximum seconds to block waiting for a response (defaults to the timeout)
    #[arg(long, global = true)]
    wait_limit: Option<u64>,

    /// Decode response text as ISO-8859-1 instead of UTF-8
    #[arg(long, global = true, default_value_t = false)]
    latin1: bool,

    /// Extra header as NAME=VALUE (repeatable)
    #[arg(short = 'H', long = "header", global = true, value_parser = parse_pair)]
    headers: Vec<(String, String)>,

    /// JSON file with extra headers
    #[arg(long, global = true)]
    headers_file: Option<String>,

    /// Append device/app diagnostic parameters to GET and DELETE queries
    #[arg(long, global = true, default_value_t = false)]
    diagnostics: bool,

    /// Accept any server certificate
    #[arg(long, global = true, default_value_t = false)]
    trust_all: bool,

    /// Reject TLS challenges for any other host
    #[arg(long, global = true)]
    host_domain: Option<String>,

    /// PKCS#12 certificate to pin (password from HTTP_HELPER_CERT_PASSWORD)
    #[arg(long, global = true)]
    certificate: Option<String>,
}

#[derive(Args)]
struct BodyArgs {
    /// Raw request body
    #[arg(long, conflicts_with = "params")]
    body: Option<String>,

    /// Body parameter as KEY=VALUE (repeatable)
    #[arg(short, long = "param", value_parser = parse_pair)]
    params: Vec<(String, String)>,
}

#[derive(Subcommand)]
enum Commands {
    /// Send a GET request
    Get {
        url: String,

        /// Query parameter as KEY=VALUE (repeatable)
        #[arg(short, long = "param", value_parser = parse_pair)]
        params: Vec<(String, String)>,
    },
    /// Send a DELETE request
    Delete {
        url: String,

        /// Query parameter as KEY=VALUE (repeatable)
        #[arg(short, long = "param", value_parser = parse_pair)]
        params: Vec<(String, String)>,
    },
    /// Send a POST request
    Post {
        url: String,

        #[command(flatten)]
        body: BodyArgs,
    },
    /// Send a PUT request
    Put {
        url: String,

        #[command(flatten)]
        body: BodyArgs,
    },
    /// POST the same body repeatedly and record every call
    Stress {
        url: String,

        /// Raw request body
        #[arg(long)]
        body: String,

        /// Number of calls to make
        #[arg(short = 'n', long, default_value_t = 1000)]
        iterations: usize,

        /// CSV file to append call records to
        #[arg(short, long, default_value = "calls.csv")]
        output: String,
    },
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/http_helper.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("http_helper.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();
    let helper = build_helper(&cli.request)?;
    let encoding = helper.settings().encoding();

    match cli.command {
        Commands::Get { url, params } => {
            report(helper.get(&url, &params.into_iter().collect()), encoding)?;
        }
        Commands::Delete { url, params } => {
            report(helper.delete(&url, &params.into_iter().collect()), encoding)?;
        }
        Commands::Post { url, body } => {
            report(helper.post(&url, payload(body)), encoding)?;
        }
        Commands::Put { url, body } => {
            report(helper.update(&url, payload(body)), encoding)?;
        }
        Commands::Stress {
            url,
            body,
            iterations,
            output,
        } => {
            stress(&helper, &url, &body, iterations, &output)?;
        }
    }

    Ok(())
}

/// Builds a helper from CLI flags and `HTTP_HELPER_*` environment variables.
fn build_helper(args: &RequestArgs) -> Result<HttpHelper> {
    let encoding = if args.latin1 {
        TextEncoding::Latin1
    } else {
        TextEncoding::Utf8
    };
    let mut config = RequestConfig::new(
        &args.content_type,
        Duration::from_secs(args.timeout),
        encoding,
    );
    config
        .set_add_default_params(args.diagnostics)
        .set_trust_all(args.trust_all);

    if let Some(wait_limit) = args.wait_limit {
        config.set_wait_limit(Duration::from_secs(wait_limit));
    }
    if let Some(host_domain) = &args.host_domain {
        config.set_host_domain(host_domain);
    }

    let username = std::env::var("HTTP_HELPER_USERNAME").unwrap_or_default();
    let password = std::env::var("HTTP_HELPER_PASSWORD").unwrap_or_default();
    config.set_basic_auth(&username, &password);

    if let Some(path) = &args.certificate {
        let certificate =
            std::fs::read(path).with_context(|| format!("failed to read certificate '{path}'"))?;
        let password = std::env::var("HTTP_HELPER_CERT_PASSWORD").ok();
        config.set_certificate(Some(certificate), password.as_deref());
    }

    if let Some(path) = &args.headers_file {
        for (name, value) in HeaderFile::load(path)?.iter() {
            config.add_header(name, value);
        }
    }
    for (name, value) in &args.headers {
        config.add_header(name, value);
    }

    let mut helper = HttpHelper::new()?;
    *helper.config() = config;
    Ok(helper)
}

fn payload(args: BodyArgs) -> Payload {
    match args.body {
        Some(body) => Payload::Raw(body),
        None => Payload::Params(
            args.params
                .into_iter()
                .map(|(k, v)| (k, Value::String(v)))
                .collect::<Map<String, Value>>(),
        ),
    }
}

fn report(outcome: CallOutcome, encoding: TextEncoding) -> Result<()> {
    let response = outcome?;
    if encoding == TextEncoding::Utf8 {
        print_response(&response);
    } else {
        info!(status = response.status().as_u16(), "\n{}", response.decode_text(encoding));
    }
    Ok(())
}

/// Repeats a POST `iterations` times, appending one CSV row per call.
#[tracing::instrument(skip(helper, body))]
fn stress(helper: &HttpHelper, url: &str, body: &str, iterations: usize, output: &str) -> Result<()> {
    let mut failures = 0;

    for iteration in 1..=iterations {
        let started = Instant::now();
        let outcome = helper.post(url, body);
        let elapsed = started.elapsed();

        if elapsed.as_secs() > 15 {
            warn!(iteration, elapsed_secs = elapsed.as_secs(), "Call was slow");
        }
        if outcome.is_err() {
            failures += 1;
        }

        let record = CallRecord::from_outcome(iteration, "POST", url, &outcome, elapsed);
        if let Err(e) = append_record(output, &record) {
            error!(error = %e, "Failed to write call record");
        }
    }

    info!(iterations, failures, output, "Stress run finished");
    Ok(())
}

fn parse_pair(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("expected KEY=VALUE, got '{raw}'"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_pair() {
        assert_eq!(
            parse_pair("cnpj=40.670.000/0000-00").unwrap(),
            ("cnpj".to_string(), "40.670.000/0000-00".to_string())
        );
        assert_eq!(parse_pair("a=b=c").unwrap(), ("a".to_string(), "b=c".to_string()));
        assert!(parse_pair("novalue").is_err());
    }

    #[test]
    fn test_payload_prefers_raw_body() {
        let args = BodyArgs {
            body: Some("{}".to_string()),
            params: Vec::new(),
        };
        assert_eq!(payload(args), Payload::Raw("{}".to_string()));
    }

    #[test]
    fn test_payload_from_params() {
        let args = BodyArgs {
            body: None,
            params: vec![("a".to_string(), "1".to_string())],
        };
        let Payload::Params(map) = payload(args) else {
            panic!("expected params");
        };
        assert_eq!(map.get("a"), Some(&Value::String("1".to_string())));
    }

    #[test]
    fn test_cli_parses_stress() {
        let cli = Cli::try_parse_from([
            "http-helper",
            "stress",
            "http://localhost/v5/verificarcnpj",
            "--body",
            r#"{"cnpj":"40.670.000/0000-00"}"#,
            "-n",
            "3",
        ])
        .unwrap();
        assert!(matches!(cli.command, Commands::Stress { iterations: 3, .. }));
        assert_eq!(cli.request.content_type, "application/json");
    }
}

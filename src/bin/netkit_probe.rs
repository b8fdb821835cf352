//! netkit-probe：通过完整的弹性客户端链发送单个请求，便于排查重试与熔断行为
//!
//! Usage:
//!   netkit-probe <METHOD> <url> [OPTIONS]

use anyhow::{bail, Context};
use resilient_netkit::interceptors::RequestIdInterceptor;
use resilient_netkit::{
    BodyEncoding, Endpoint, HttpMethod, NetKitConfig, NetworkKit, NetworkKitBuilder, ParsedBody,
    RetryPolicy,
};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

fn print_usage() {
    println!(
        r#"netkit-probe: send one request through the resilient client

USAGE:
    netkit-probe <METHOD> <URL> [OPTIONS]

OPTIONS:
    --retry <N>             Retry count (default 0)
    --delay-ms <MS>         Constant retry delay in ms (default 3000)
    --exponential           Use exponential backoff instead of a constant delay
    --breaker               Enable the circuit breaker (NETKIT_BREAKER_* env)
    --header <NAME:VALUE>   Add a request header, repeatable
    --param <KEY=VALUE>     Add a parameter, repeatable (query for GET, body otherwise)
    --form                  Encode the body as application/x-www-form-urlencoded
    --config <PATH>         Load a YAML or JSON client configuration
    help                    Show this help message

ENVIRONMENT:
    RUST_LOG                Log filter, e.g. resilient_netkit=debug"#
    );
}

#[derive(Debug, Default)]
struct ProbeArgs {
    method: String,
    url: String,
    retry: u32,
    delay_ms: Option<u64>,
    exponential: bool,
    breaker: bool,
    headers: Vec<(String, String)>,
    params: Vec<(String, String)>,
    form: bool,
    config: Option<String>,
}

fn parse_args(args: &[String]) -> anyhow::Result<ProbeArgs> {
    let mut parsed = ProbeArgs::default();
    let mut positional = Vec::new();
    let mut iter = args.iter();

    while let Some(arg) = iter.next() {
        let mut value = |flag: &str| {
            iter.next()
                .cloned()
                .with_context(|| format!("{flag} requires a value"))
        };
        match arg.as_str() {
            "--retry" => parsed.retry = value("--retry")?.parse().context("--retry expects a number")?,
            "--delay-ms" => {
                parsed.delay_ms = Some(value("--delay-ms")?.parse().context("--delay-ms expects a number")?)
            }
            "--exponential" => parsed.exponential = true,
            "--breaker" => parsed.breaker = true,
            "--form" => parsed.form = true,
            "--header" => {
                let raw = value("--header")?;
                let (name, val) = raw.split_once(':').context("--header expects NAME:VALUE")?;
                parsed.headers.push((name.trim().to_string(), val.trim().to_string()));
            }
            "--param" => {
                let raw = value("--param")?;
                let (key, val) = raw.split_once('=').context("--param expects KEY=VALUE")?;
                parsed.params.push((key.to_string(), val.to_string()));
            }
            "--config" => parsed.config = Some(value("--config")?),
            flag if flag.starts_with("--") => bail!("unknown option: {flag}"),
            _ => positional.push(arg.clone()),
        }
    }

    match positional.as_slice() {
        [method, url] => {
            parsed.method = method.clone();
            parsed.url = url.clone();
        }
        _ => bail!("expected <METHOD> <URL>"),
    }
    Ok(parsed)
}

fn retry_policy(args: &ProbeArgs) -> RetryPolicy {
    if args.retry == 0 {
        return RetryPolicy::None;
    }
    match (args.exponential, args.delay_ms) {
        (true, Some(ms)) => RetryPolicy::exponential(
            args.retry,
            Duration::from_millis(ms),
            1.5,
            Duration::from_secs(30),
        ),
        (true, None) => RetryPolicy::exponential_default(args.retry),
        (false, Some(ms)) => RetryPolicy::constant(args.retry, Duration::from_millis(ms)),
        (false, None) => RetryPolicy::constant_default(args.retry),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.is_empty() || matches!(args[0].as_str(), "help" | "--help" | "-h") {
        print_usage();
        return Ok(());
    }
    let args = parse_args(&args)?;

    let method = HttpMethod::parse(&args.method)
        .with_context(|| format!("unsupported method: {}", args.method))?;
    let mut endpoint = Endpoint::new(method, &args.url)?;
    for (name, value) in &args.headers {
        endpoint = endpoint.with_header(name.as_str(), value.as_str());
    }
    for (key, value) in &args.params {
        endpoint = endpoint.with_query(key.as_str(), value.as_str());
    }
    if args.form {
        endpoint = endpoint.with_encoding(BodyEncoding::UrlEncoded);
    }

    let mut builder = NetworkKitBuilder::new().request_interceptor(RequestIdInterceptor);
    if let Some(path) = &args.config {
        let config = NetKitConfig::load(path)
            .await
            .with_context(|| format!("failed to load config from {path}"))?;
        builder = builder.with_config(&config);
    }
    if args.breaker {
        builder = builder.circuit_breaker_default();
    }
    let client = builder.build()?;

    match client.send(endpoint, retry_policy(&args)).await {
        Ok(response) => {
            println!("HTTP {}", response.status);
            for (name, value) in response.headers.iter() {
                println!("{name}: {value}");
            }
            println!();
            match &response.body {
                ParsedBody::Json(value) => println!("{}", serde_json::to_string_pretty(value)?),
                ParsedBody::Text(text) => println!("{text}"),
                ParsedBody::Raw(bytes) => println!("<{} bytes>", bytes.len()),
            }
            Ok(())
        }
        Err(err) => {
            eprintln!("error [{}]: {err}", err.kind());
            if let Some(snapshot) = client.breaker_snapshot() {
                eprintln!(
                    "circuit breaker: {} ({} failures)",
                    snapshot.state, snapshot.failure_count
                );
            }
            std::process::exit(1);
        }
    }
}

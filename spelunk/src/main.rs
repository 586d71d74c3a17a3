use anyhow::{Context, anyhow};
use clap::ArgMatches;
use colored::Colorize;
use commands::command_argument_builder;
use spelunk::handlers::{
    RenderTarget, build_transport_config, dispatch, parse_url_line, save_results,
};
use spelunk_core::crawl::{CrawlOptions, execute_crawl};
use spelunk_core::report::render_summary;
use spelunk_core::viewer::SystemViewer;
use spelunk_core::print_banner;
use std::io::IsTerminal;
use tokio_util::sync::CancellationToken;
use tracing::warn;
use tracing_subscriber::EnvFilter;

mod commands;

#[tokio::main]
async fn main() {
    let matches = command_argument_builder().get_matches();
    init_tracing();

    // Show banner unless --quiet flag is set
    if !matches.get_flag("quiet") {
        print_banner();
    }

    if let Err(e) = handle_crawl(&matches).await {
        eprintln!("{} {:#}", "[!]".red().bold(), e);
        std::process::exit(1);
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn crawl_options(args: &ArgMatches) -> anyhow::Result<CrawlOptions> {
    let raw = args
        .get_one::<String>("url")
        .ok_or_else(|| anyhow!("--url is required"))?;
    let url = parse_url_line(raw).ok_or_else(|| anyhow!("Invalid URL '{}'", raw))?;

    let ip = args
        .get_one::<String>("ip")
        .map(String::as_str)
        .unwrap_or(spelunk_scanner::transport::DEFAULT_PROXY_HOST);
    let port = args
        .get_one::<u16>("port")
        .copied()
        .unwrap_or(spelunk_scanner::transport::DEFAULT_PROXY_PORT);
    let timeout = args
        .get_one::<u64>("timeout")
        .copied()
        .unwrap_or(spelunk_scanner::transport::DEFAULT_TIMEOUT_SECS);

    Ok(CrawlOptions {
        extensions: args
            .get_many::<String>("extension")
            .map(|exts| exts.cloned().collect())
            .unwrap_or_default(),
        max_depth: args
            .get_one::<Option<usize>>("depth")
            .copied()
            .unwrap_or(Some(1)),
        workers: args.get_one::<usize>("threads").copied().unwrap_or(8),
        transport: build_transport_config(ip, port, args.get_flag("no-proxy"), timeout),
        show_progress: std::io::stderr().is_terminal(),
        ..CrawlOptions::new(url)
    })
}

async fn handle_crawl(args: &ArgMatches) -> anyhow::Result<()> {
    let options = crawl_options(args)?;
    let seed = options.url.clone();
    let target = RenderTarget::from_args(args);
    target.validate().context("Invalid --download destination")?;

    match &options.transport.proxy {
        Some(proxy) => println!("Crawling {} via socks5 proxy {}", seed, proxy),
        None => println!("Crawling {} without a proxy", seed),
    }

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, finishing with the pages fetched so far");
            on_interrupt.cancel();
        }
    });

    let graph = execute_crawl(options, cancel, None)
        .await
        .with_context(|| format!("Failed to crawl {}", seed))?;
    println!();

    let use_color = std::io::stdout().is_terminal();
    let output = dispatch(&graph, &target, use_color, &SystemViewer)
        .context("Failed to render the crawl")?;
    print!("{}", output);

    if target == RenderTarget::PrintChildren {
        print!("\n{}", render_summary(&graph));
    }

    if args.get_flag("save") {
        let dir = std::env::current_dir().context("Cannot determine the current directory")?;
        let path = save_results(&graph, &target, &dir).context("Failed to save results")?;
        println!("{} Saved to {}", "✓".green().bold(), path.display());
    }

    Ok(())
}

pub const CLAP_STYLING: clap::builder::styling::Styles = clap::builder::styling::Styles::styled()
    .header(clap_cargo::style::HEADER)
    .usage(clap_cargo::style::USAGE)
    .literal(clap_cargo::style::LITERAL)
    .placeholder(clap_cargo::style::PLACEHOLDER)
    .error(clap_cargo::style::ERROR)
    .valid(clap_cargo::style::VALID)
    .invalid(clap_cargo::style::INVALID);

use crate::CLAP_STYLING;
use clap::arg;
use spelunk::handlers::parse_depth;
use spelunk_scanner::transport::DEFAULT_PROXY_HOST;
use std::path::PathBuf;

pub(crate) fn command_argument_builder() -> clap::Command {
    clap::Command::new("spelunk")
        .version(env!("CARGO_PKG_VERSION"))
        .bin_name("spelunk")
        .about("Crawl a hidden service through a SOCKS proxy and map what links where")
        .styles(CLAP_STYLING)
        .arg(arg!(-q --"quiet" "Suppress the banner").required(false))
        .arg(
            arg!(-u --"url" <URL>)
                .required(true)
                .help("The seed URL to crawl (http:// is assumed when no scheme is given)"),
        )
        .arg(
            arg!(--"ip" <HOST>)
                .required(false)
                .help("Address of the SOCKS5 proxy")
                .default_value(DEFAULT_PROXY_HOST),
        )
        .arg(
            arg!(-p --"port" <PORT>)
                .required(false)
                .help("Port of the SOCKS5 proxy")
                .value_parser(clap::value_parser!(u16))
                .default_value("9050"),
        )
        .arg(
            arg!(--"no-proxy")
                .required(false)
                .help("Connect to targets directly instead of through the proxy")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            arg!(-e --"extension" <EXT>)
                .required(false)
                .help("Only follow links to hosts ending in EXT (e.g. .onion). Repeatable.")
                .action(clap::ArgAction::Append),
        )
        .arg(
            arg!(--"depth" <DEPTH>)
                .required(false)
                .help("How many levels below the seed to crawl (0 = seed only, 'all' = no limit)")
                .value_parser(parse_depth)
                .default_value("1"),
        )
        .arg(
            arg!(-t --"threads" <NUM_WORKERS>)
                .required(false)
                .help("The number of concurrent fetches in the worker pool.")
                .value_parser(clap::value_parser!(usize))
                .default_value("8"),
        )
        .arg(
            arg!(--"timeout" <SECONDS>)
                .required(false)
                .help("Request timeout in seconds")
                .value_parser(clap::value_parser!(u64))
                .default_value("30"),
        )
        .arg(
            arg!(-m --"mail" "List the email addresses found instead of links")
                .required(false),
        )
        .arg(
            arg!(-v --"visualize" "Open a diagram of the crawl in the system viewer")
                .required(false),
        )
        .arg(
            arg!(-d --"download" <FILE>)
                .required(false)
                .help("Write a diagram of the crawl to FILE (.svg, .png, .pdf or .dot)")
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            arg!(-s --"save" "Save the links (or emails with --mail) as JSON in the current directory")
                .required(false),
        )
}

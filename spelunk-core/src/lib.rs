pub mod crawl;
pub mod map;
pub mod persist;
pub mod report;
pub mod viewer;

use colored::Colorize;

pub use crawl::{CrawlOptions, CrawlProgressCallback, execute_crawl};
pub use map::{DiagramFormat, ExportError, build_diagram, export, export_to_path, to_dot, to_svg};
pub use persist::{PersistError, save_json};
pub use report::{render_children, render_children_colored, render_emails, render_summary};
pub use viewer::{DiagramViewer, SystemViewer};

const BANNER: &str = r#"
   ___ _ __   ___| |_   _ _ __ | | __
  / __| '_ \ / _ \ | | | | '_ \| |/ /
  \__ \ |_) |  __/ | |_| | | | |   <
  |___/ .__/ \___|_|\__,_|_| |_|_|\_\
      |_|
"#;

pub fn print_banner() {
    println!("{}", BANNER.bright_magenta().bold());
    println!(
        "  {} {}\n",
        "onion link mapper".bright_white(),
        format!("v{}", env!("CARGO_PKG_VERSION")).bright_black()
    );
}

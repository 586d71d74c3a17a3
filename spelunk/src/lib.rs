// Include handlers module directly from handlers.rs
#[path = "handlers.rs"]
pub mod handlers;

pub use handlers::{
    RenderTarget, build_transport_config, dispatch, parse_depth, parse_url_line, save_results,
};

pub use spelunk_core::crawl::{CrawlOptions, CrawlProgressCallback, execute_crawl};

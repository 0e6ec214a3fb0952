pub mod browser_profile;
pub mod browser_setup;
pub mod config;
pub mod discovery;
pub mod error;
pub mod extractor;
pub mod failures;
pub mod multiversion;
pub mod parser;
pub mod pipeline;
pub mod reconcile;
pub mod scraper;
pub mod shutdown;
pub mod store;
pub mod utils;

pub use browser_profile::{BrowserProfile, create_unique_profile_with_prefix};
pub use browser_setup::{
    apply_stealth_measures, download_managed_browser, find_browser_executable, launch_browser,
};
pub use config::{PipelineConfig, PipelineConfigBuilder};
pub use error::{FailureType, PipelineError, PipelineResult, ScrapeError, StoreError};
pub use pipeline::{PipelineController, PipelineReport, RunOptions, ShutdownToken};
pub use scraper::{FetchedPage, InteractiveAction, RenderedScraper, Scraper, StaticScraper};
pub use store::{SqliteStore, Store};

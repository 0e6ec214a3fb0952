//! Instance methods for attaching optional runtime collaborators to a built
//! `PipelineConfig`.

use std::path::PathBuf;

use super::types::PipelineConfig;

impl PipelineConfig {
    /// Attach a Chrome user data directory for browser profile isolation.
    #[must_use]
    pub fn with_chrome_data_dir(mut self, dir: PathBuf) -> Self {
        self.chrome_data_dir = Some(dir);
        self
    }
}

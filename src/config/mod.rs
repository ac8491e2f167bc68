#[cfg(feature = "cli")]
pub mod cli;
pub mod toml_config;

#[cfg(feature = "cli")]
pub use cli::{CliConfig, Command};
pub use toml_config::TomlConfig;

#[cfg(feature = "cli")]
impl TomlConfig {
    /// Applies command line overrides on top of the file values.
    pub fn apply_cli(&mut self, cli: &CliConfig) {
        if let Some(base_url) = &cli.api_base_url {
            self.api.base_url = base_url.clone();
        }
        if cli.refetch {
            self.sync.refetch_after_confirm = Some(true);
        }
        if cli.verbose {
            self.logging.verbose = Some(true);
        }
    }
}

pub mod commands;
pub mod handlers;

// Re-export commonly used handler functions for convenience
pub use handlers::{
    build_options, build_profile, expand_output_dir, log_filter_for_verbosity,
    normalize_extension,
};

// Re-export download functionality from sheetfetch-core
pub use sheetfetch_core::download::{DownloadOptions, PageSource, execute_download};

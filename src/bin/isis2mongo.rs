//! isis2mongo - export ISIS master file records to a MongoDB collection
//!
//! # Usage
//!
//! ```bash
//! isis2mongo lilacs localhost bireme lilacs --mongouser=loader --mongopsw=secret
//! ```

use isis_export::cli::MongoCli;
use isis_export::cli::app;

/// Application entry point
#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli: MongoCli = app::parse_or_exit();
    let cancel = app::cancel_on_ctrl_c();

    let outcome = app::export_mongo(&cli, cancel).await;
    std::process::exit(app::exit_code(outcome));
}

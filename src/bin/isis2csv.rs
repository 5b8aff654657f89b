//! isis2csv - export ISIS master file records to a CSV file
//!
//! # Usage
//!
//! ```bash
//! isis2csv lilacs lilacs.csv --isistags=10,12,30 --convtable=lilacs.tab --tell=1000
//! ```

use isis_export::cli::CsvCli;
use isis_export::cli::app;

/// Application entry point
#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli: CsvCli = app::parse_or_exit();
    let cancel = app::cancel_on_ctrl_c();

    let outcome = app::export_csv(&cli, cancel).await;
    std::process::exit(app::exit_code(outcome));
}

pub mod common;
pub mod staticsite_e2e;

use common::Error;
use staticsite_e2e::staticsite_e2e_test;
use std::env;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt::init();
    match env::args().nth(1).as_deref() {
        Some("staticsite") => {
            info!("Running staticsite end-to-end test");
            staticsite_e2e_test().await
        }
        _ => {
            info!("Please specify one controller");
            Ok(())
        }
    }
}

use crate::app::{PopcornStream, PopcornStreamArgs};
use clap::Parser;
use log::info;
use std::io;
use std::time::Instant;
use tokio::select;

mod api;
mod app;
mod errors;

#[tokio::main]
async fn main() -> io::Result<()> {
    let args = PopcornStreamArgs::parse();
    let start = Instant::now();
    let app = PopcornStream::new(args).await?;
    let time_taken = start.elapsed();
    info!(
        "Created new Popcorn Stream instance in {}.{:03} seconds",
        time_taken.as_secs(),
        time_taken.subsec_millis()
    );

    select! {
        _ = tokio::signal::ctrl_c() => app.stop(),
        _ = app.server().stopped() => (),
    }

    info!("Popcorn Stream is shutting down");
    Ok(())
}

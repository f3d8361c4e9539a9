// reposcout entry point.

use clap::Parser;
use dotenv::dotenv;
use tracing::error;

use reposcout::app::App;
use reposcout::args::Args;
use reposcout::error::Result;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();
    dotenv().ok();

    let args = Args::parse();
    if let Err(err) = run(args).await {
        error!("{}", err);
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    App::new(&args)?.run().await
}

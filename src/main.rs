use clap::Parser;

#[tokio::main]
async fn main() {
    corvid::init_logs();

    let args = corvid::cmd::Args::parse();
    if let Err(error) = args.run().await {
        tracing::error!("{error}");
        std::process::exit(1);
    }
}

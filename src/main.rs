use clap::Parser;

#[tokio::main]
async fn main() {
    let cli = hookbridge::cli::Cli::parse();
    if let Err(e) = hookbridge::cmd::dispatch(cli).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

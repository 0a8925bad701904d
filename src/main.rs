#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = skillcheck::run().await {
        eprintln!("skillcheck fatal: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}

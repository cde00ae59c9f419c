#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = assignment_portal::run().await {
        eprintln!("assignment-portal fatal: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}

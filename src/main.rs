#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = exam_proctor::run().await {
        eprintln!("exam-proctor fatal: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}

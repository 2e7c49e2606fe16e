#[tokio::main]
async fn main() {
    if let Err(e) = bloodwork_lib::run().await {
        tracing::error!("Fatal: {e}");
        eprintln!("bloodwork: {e}");
        std::process::exit(1);
    }
}

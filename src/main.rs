#[tokio::main]
async fn main() -> anyhow::Result<()> {
    plagiproof_lib::run().await
}

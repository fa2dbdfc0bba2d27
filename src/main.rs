#[tokio::main]
async fn main() -> anyhow::Result<()> {
    horizon_connect_lib::run().await
}

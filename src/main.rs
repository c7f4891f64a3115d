#[tokio::main]
async fn main() -> anyhow::Result<()> {
    calc_bff::run().await
}

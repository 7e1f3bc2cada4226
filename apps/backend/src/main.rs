#[tokio::main]
async fn main() -> anyhow::Result<()> {
    murajaah_backend::run().await
}

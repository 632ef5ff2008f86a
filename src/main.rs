#[tokio::main]
async fn main() -> anyhow::Result<()> {
    property_gateway::run().await
}

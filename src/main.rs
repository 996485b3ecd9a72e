#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    property_qr_server::run().await
}

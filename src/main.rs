#[tokio::main]
async fn main() {
    consult_booking::run().await;
}

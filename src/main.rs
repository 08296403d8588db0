#[tokio::main]
async fn main() {
    agora::start_server().await;
}

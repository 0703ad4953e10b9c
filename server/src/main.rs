#[tokio::main]
async fn main() {
    linkleaf::start_server().await;
}

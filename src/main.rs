#[rocket::main]
async fn main() {
    if let Err(e) = ghostwire_relay::rocket().launch().await {
        eprintln!("⚠️  server error: {e}");
        std::process::exit(1);
    }
}

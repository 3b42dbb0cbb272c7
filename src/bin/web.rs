use assetsheet::app;
use assetsheet::login;
use std::env;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    // Optional bind address, e.g. `website 0.0.0.0:8080`
    let args: Vec<String> = env::args().collect();
    let addr = if args.len() >= 2 {
        args[1].clone()
    } else {
        "127.0.0.1:3000".to_string()
    };

    login::init_database()?;

    println!("Starting asset inventory server on http://{}", addr);
    app::run(&addr).await
}

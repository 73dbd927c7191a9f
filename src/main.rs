use actix_cors::Cors;
use actix_web::{middleware, web, App, HttpServer};
use anyhow::Context;
use leafscan::config::Config;
use leafscan::detector::Detector;
use leafscan::server::routes;
use leafscan::util::init_tracing;
use std::path::PathBuf;
use std::{env, process};

use tracing::info;

const USAGE: &str = "usage: ./leafscan [config file]";

fn get_args() -> Option<PathBuf> {
    let args: Vec<String> = env::args().collect();
    match args.len() {
        1 => None,
        2 if args[1] == "-h" || args[1] == "--help" => {
            println!("{USAGE}");
            process::exit(0);
        }
        2 => Some(PathBuf::from(&args[1])),
        _ => {
            println!("{USAGE}");
            process::exit(1);
        }
    }
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let config_path = get_args();
    let config = Config::load(config_path.as_deref()).context("failed to load configuration")?;
    init_tracing(&config.log.filter);

    info!("starting tea leaf disease detection service");

    // A missing or mismatched model is fatal: refuse to serve
    let detector = Detector::load(&config.model).context("failed to bring up the detector")?;

    let detector = web::Data::new(detector);
    let server = web::Data::new(config.server.clone());
    let addr = (config.server.host.clone(), config.server.port);

    info!("listening on http://{}:{}", addr.0, addr.1);
    info!("  GET  /health  - health check");
    info!("  POST /predict - predict disease from image");
    info!("  GET  /classes - list disease classes");

    HttpServer::new(move || {
        App::new()
            .wrap(Cors::permissive())
            .wrap(middleware::Logger::default())
            .configure(routes::configure(detector.clone(), server.clone()))
    })
    .bind(addr)?
    .run()
    .await?;

    Ok(())
}

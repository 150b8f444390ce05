use actix_web::{App, HttpServer, middleware::Logger, web};
use anyhow::Context;
use chrono::Local;
use env_logger::{Env, Target};
use std::io::Write;
use std::sync::Arc;

use artisan_market::{
    config::Config,
    database::{create_pool, run_migrations},
    external::{EmailSender, ResendEmailService},
    handlers,
    middlewares::{AuthMiddleware, create_cors},
    services::*,
    swagger::swagger_config,
    tasks,
    utils::JwtService,
};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .format(|buf, record| {
            let ts = Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z");
            let level = record.level().as_str().to_ascii_lowercase();
            let msg_json = serde_json::to_string(&format!("{}", record.args()))
                .unwrap_or_else(|_| "\"<invalid utf8>\"".to_string());
            writeln!(
                buf,
                "{{\"timestamp\":\"{}\",\"level\":\"{}\",\"message\":{},\"target\":\"{}\"}}",
                ts,
                level,
                msg_json,
                record.target(),
            )
        })
        .target(Target::Stdout)
        .init();

    let config = Config::from_toml()
        .map_err(|e| anyhow::anyhow!("failed to load configuration: {e}"))?;

    let pool = create_pool(&config.database)
        .await
        .context("failed to create database connection pool")?;
    run_migrations(&pool)
        .await
        .context("failed to run database migrations")?;

    let jwt_service = JwtService::new(&config.jwt.secret);

    let email = ResendEmailService::new(config.email.clone());
    if config.email.api_key.is_empty() {
        log::warn!("RESEND_API_KEY is not set; order emails will fail");
    }
    let from_address = email.from_address().to_string();
    let email_sender: Arc<dyn EmailSender> = Arc::new(email);

    let role_service = RoleService::new(pool.clone());
    let order_service = OrderService::new(pool.clone(), config.checkout.clone());
    let payment_service = PaymentService::new(
        pool.clone(),
        config.payment.clone(),
        config.checkout.currency.clone(),
    );
    let pickup_location_service = PickupLocationService::new(pool.clone());
    let notification_service = NotificationService::new(
        pool.clone(),
        role_service.clone(),
        email_sender,
        from_address,
        config.checkout.currency.clone(),
    );

    if !config.payment.simulate_settlement && config.payment.webhook_secret.is_empty() {
        log::warn!("Settlement simulation is off and MOMO_WEBHOOK_SECRET is empty; mobile-money payments can never complete");
    }

    tasks::spawn_all(payment_service.clone());

    log::info!(
        "Starting HTTP server at {}:{}",
        config.server.host,
        config.server.port
    );

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(AuthMiddleware::new(jwt_service.clone()))
            .wrap(create_cors())
            .app_data(web::Data::new(role_service.clone()))
            .app_data(web::Data::new(order_service.clone()))
            .app_data(web::Data::new(payment_service.clone()))
            .app_data(web::Data::new(pickup_location_service.clone()))
            .app_data(web::Data::new(notification_service.clone()))
            .configure(swagger_config)
            .configure(handlers::webhook_config)
            .service(
                web::scope("/api/v1")
                    .configure(handlers::order_config)
                    .configure(handlers::pickup_location_config)
                    .configure(handlers::payment_config)
                    .configure(handlers::notification_config)
                    .configure(handlers::admin_config),
            )
    })
    .bind((config.server.host.as_str(), config.server.port))?
    .run()
    .await?;

    Ok(())
}

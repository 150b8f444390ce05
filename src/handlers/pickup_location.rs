use crate::models::*;
use crate::services::PickupLocationService;
use actix_web::{HttpResponse, ResponseError, Result, web};

#[utoipa::path(
    get,
    path = "/pickup-locations",
    tag = "pickup",
    responses(
        (status = 200, description = "Active pickup locations", body = [PickupLocationResponse])
    )
)]
pub async fn list_pickup_locations(
    pickup_service: web::Data<PickupLocationService>,
) -> Result<HttpResponse> {
    match pickup_service.list_active().await {
        Ok(list) => Ok(HttpResponse::Ok().json(ApiResponse::success(list))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn pickup_location_config(cfg: &mut web::ServiceConfig) {
    cfg.route("/pickup-locations", web::get().to(list_pickup_locations));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::test_support::{seed_pickup_location, setup_db};
    use crate::handlers::test_support::jwt;
    use crate::middlewares::AuthMiddleware;
    use actix_web::{App, test};
    use serde_json::Value;

    #[actix_web::test]
    async fn test_listing_is_public() {
        let pool = setup_db().await;
        seed_pickup_location(&pool, "Ntinda Craft Hub", true).await;
        seed_pickup_location(&pool, "Closed Stall", false).await;

        let app = test::init_service(
            App::new()
                .wrap(AuthMiddleware::new(jwt()))
                .app_data(web::Data::new(PickupLocationService::new(pool)))
                .service(web::scope("/api/v1").configure(pickup_location_config)),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/api/v1/pickup-locations")
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        let data = body["data"].as_array().unwrap();
        assert_eq!(data.len(), 1);
        assert_eq!(data[0]["name"], "Ntinda Craft Hub");
    }
}

use actix_web::{HttpResponse, Responder, get, web};

use crate::app_state::AppState;

/// 根路径健康检查/服务说明
#[get("/")]
pub async fn hello(data: web::Data<AppState>) -> impl Responder {
    let manager = &data.manager;
    let keys: Vec<&str> = manager.maps().iter().map(|m| m.key()).collect();
    HttpResponse::Ok().json(serde_json::json!({
        "message": "磁场查询服务",
        "endpoints": ["/field?x=<mm>&y=<mm>&z=<mm>", "/maps"],
        "format": manager.map_type(),
        "maps": keys,
        "origin_offset": manager.origin_offset(),
        "torus_radius": manager.torus_radius(),
        "uniform_fallback": manager.uniform_field().is_some(),
        "config": data.config_path,
    }))
}

use actix_web::{HttpResponse, Responder, get, web};
use serde::{Deserialize, Serialize};

use crate::app_state::AppState;

#[derive(Deserialize)]
pub struct FieldQuery {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

#[derive(Serialize)]
pub struct FieldResponse {
    /// 查询位置（全局坐标，mm）
    pub position: [f64; 3],
    /// 磁场 (T)
    pub field: [f64; 3],
    /// 是否落在某个详细磁场图内（否则是均匀场或零）
    pub covered: bool,
}

/// 查询某一点的磁场
/// 例如: /field?x=3904&y=0&z=-4000
#[get("/field")]
pub async fn get_field(data: web::Data<AppState>, query: web::Query<FieldQuery>) -> impl Responder {
    let position = [query.x, query.y, query.z];
    if position.iter().any(|v| !v.is_finite()) {
        return HttpResponse::BadRequest().json(serde_json::json!({
            "error": "坐标必须是有限数值",
        }));
    }

    let (field, covered) = data.manager.field_and_coverage(position);
    HttpResponse::Ok().json(FieldResponse {
        position,
        field,
        covered,
    })
}

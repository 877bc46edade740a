use actix_web::{HttpResponse, Responder, get, web};
use bfield_maps::{Limits, MapType};
use serde::Serialize;

use crate::app_state::AppState;

#[derive(Serialize)]
pub struct MapSummary<'a> {
    pub key: &'a str,
    pub map_type: MapType,
    pub shape: [usize; 3],
    pub limits: Option<Limits>,
    pub spacing: [f64; 3],
    pub defined_cells: usize,
}

/// 列出所有已加载的磁场图，顺序即查询顺序
#[get("/maps")]
pub async fn list_maps(data: web::Data<AppState>) -> impl Responder {
    let maps: Vec<MapSummary<'_>> = data
        .manager
        .maps()
        .iter()
        .map(|m| MapSummary {
            key: m.key(),
            map_type: m.map_type(),
            shape: m.shape(),
            limits: m.limits(),
            spacing: m.spacing(),
            defined_cells: m.defined_count(),
        })
        .collect();

    HttpResponse::Ok().json(serde_json::json!({ "maps": maps }))
}

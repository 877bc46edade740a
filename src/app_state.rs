use std::sync::Arc;

use bfield_maps::FieldManager;

/// 全局应用状态，在各个 handler 之间共享只读的磁场管理器
pub struct AppState {
    pub manager: Arc<FieldManager>,
    pub config_path: String,
}

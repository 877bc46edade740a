//! 磁场图的读取、插值与查询
//!
//! 支持三种磁场文件格式（GMC 二进制记录、G4BL 文本网格、G4BL 二进制缓存），
//! 加载结果组成一个只读的 [`FieldManager`]，可以在线程之间共享查询。

pub mod config;
pub mod error;
pub mod field_manager;
pub mod field_map;
pub mod grid;
pub mod maker;
pub mod parsers;
pub mod utils;
pub mod vec3;

pub use config::BFieldConfig;
pub use error::{FieldMapError, Result};
pub use field_manager::{FieldManager, FieldManagerBuilder, UniformField};
pub use field_map::{FieldMap, Limits, MapType};
pub use maker::{BFieldManagerMaker, build_field_manager};
pub use vec3::Vec3;

//! 磁场图加载配置
//!
//! 从 JSON 文件读取，可以用 `BFIELD_CONFIG_PATH` 环境变量指定其他路径。

use std::{
    env, fs, io,
    path::{Path, PathBuf},
};

use serde::Deserialize;
use thiserror::Error;

use crate::field_map::MapType;

/// 配置文件路径环境变量
pub const CONFIG_PATH_ENV: &str = "BFIELD_CONFIG_PATH";

/// 磁场管理器的全部配置
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BFieldConfig {
    /// "GMC" 或 "G4BL"
    pub format: MapType,
    /// 螺线管沿 x 方向的偏移 (mm)
    pub solenoid_offset: f64,
    /// 几何配置中的环形半径 (mm)，必须与磁场文件格式匹配
    pub torus_radius: f64,
    pub scale_factor: f64,

    pub ds_file: Option<String>,
    pub ts_file: Option<String>,
    pub ps_file: Option<String>,
    /// 仅用于 G4BL 的旧式按区域配置
    pub tsu_file: Option<String>,
    pub tsd_file: Option<String>,

    /// 旧格式需要的网格维度
    pub ds_dimensions: Option<[usize; 3]>,
    pub ts_dimensions: Option<[usize; 3]>,
    pub ps_dimensions: Option<[usize; 3]>,

    /// G4BL 文件列表；给出时忽略按区域的文件配置
    pub files: Option<Vec<String>>,

    /// 没有磁场图覆盖时的均匀 DS 场
    pub uniform_ds: Option<UniformDsConfig>,

    /// 加载 G4BL 磁场图后写出二进制缓存
    pub write_binaries: bool,
    /// 与 `files` 一一对应的缓存输出路径
    pub binary_files: Vec<String>,

    /// 查找磁场文件的目录，优先于环境变量
    pub search_path: Vec<String>,
}

impl Default for BFieldConfig {
    fn default() -> Self {
        Self {
            format: MapType::Gmc,
            solenoid_offset: 0.0,
            torus_radius: 0.0,
            scale_factor: 1.0,
            ds_file: None,
            ts_file: None,
            ps_file: None,
            tsu_file: None,
            tsd_file: None,
            ds_dimensions: None,
            ts_dimensions: None,
            ps_dimensions: None,
            files: None,
            uniform_ds: None,
            write_binaries: false,
            binary_files: Vec::new(),
            search_path: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(default)]
pub struct UniformDsConfig {
    /// T
    pub bz: f64,
    /// T/mm
    pub gradient: f64,
}

impl BFieldConfig {
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = BFieldConfig::from_json_str(&contents)?;
        Ok(config)
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("解析磁场配置失败: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("读取磁场配置 {path:?} 失败: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// 读取配置: 环境变量指定的路径优先，否则使用默认路径
pub fn load_config_from_env(default_path: &Path) -> Result<(BFieldConfig, PathBuf), ConfigError> {
    let path = env::var(CONFIG_PATH_ENV)
        .ok()
        .map(PathBuf::from)
        .unwrap_or_else(|| default_path.to_path_buf());

    match BFieldConfig::from_file(&path) {
        Ok(config) => {
            tracing::info!(
                target: "bfield::config",
                path = %path.display(),
                format = %config.format,
                "bfield_config.loaded=file"
            );
            Ok((config, path))
        }
        Err(err) => {
            tracing::warn!(
                target: "bfield::config",
                path = %path.display(),
                error = %err,
                "bfield_config.load_failed"
            );
            Err(err)
        }
    }
}

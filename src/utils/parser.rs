use std::path::Path;

use crate::error::Result;
use crate::field_map::{FieldMap, MapType};
use crate::utils::resolver::FileResolver;

/// 磁场文件的具体格式，配置阶段确定一次
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapFileFormat {
    /// 旧的二进制记录格式（GMC）
    LegacyBinary,
    /// G4BL 文本网格格式
    TextGrid,
    /// G4BL 二进制缓存（`.header` + `.bin`）
    BinaryCache,
}

impl MapFileFormat {
    /// 根据磁场图类型和配置中的文件名确定格式
    pub fn for_file(map_type: MapType, file_name: &str) -> Self {
        match map_type {
            MapType::Gmc => MapFileFormat::LegacyBinary,
            MapType::G4bl if file_name.contains(".header") => MapFileFormat::BinaryCache,
            MapType::G4bl => MapFileFormat::TextGrid,
        }
    }
}

/// 一次磁场图加载请求
pub struct MapSource<'a> {
    /// 区域名，例如 "DS"
    pub key: &'a str,
    /// 配置中写的文件名
    pub name: &'a str,
    /// 解析后的实际路径
    pub path: &'a Path,
    /// 配置中声明的网格维度（只有旧格式需要）
    pub dimensions: Option<[usize; 3]>,
    pub scale_factor: f64,
    /// 用于查找伴随文件（例如二进制缓存的 `.bin`）
    pub resolver: &'a dyn FileResolver,
}

/// 磁场图解析器 trait
/// 每种文件格式实现一个，都产出填充好的 `FieldMap`
pub trait FieldMapParser: Send + Sync {
    /// 负责的文件格式
    fn format(&self) -> MapFileFormat;

    /// 读取文件并构造磁场图
    fn parse(&self, source: &MapSource<'_>) -> Result<FieldMap>;

    /// 获取解析器名称（用于日志和错误信息）
    fn name(&self) -> &'static str;
}

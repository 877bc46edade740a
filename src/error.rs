use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// 加载磁场图时可能出现的全部错误
///
/// 除了可选区域未配置（只记录日志，不是错误）之外，这里的任何错误都意味着
/// 磁场图不可用，整个加载过程必须终止，不允许使用加载了一半的磁场图。
#[derive(Debug, Error)]
pub enum FieldMapError {
    #[error("找不到磁场文件 `{name}`（已搜索: {searched}）")]
    FileNotFound { name: String, searched: String },

    #[error(
        "磁场文件 {path:?} 不是整数个 {record_size} 字节记录: 大小 {size}，余数 {remainder}"
    )]
    Format {
        path: PathBuf,
        size: u64,
        record_size: usize,
        remainder: u64,
    },

    #[error(
        "磁场图 `{key}` ({path:?}) 第 {record} 条记录的首尾字节计数不一致: head {head}, tail {tail}"
    )]
    CorruptRecord {
        key: String,
        path: PathBuf,
        record: usize,
        head: i32,
        tail: i32,
    },

    #[error(
        "磁场图 `{key}` ({path:?}) 的网格点数与声明不一致: 声明 {expected:?}，实际 {observed:?}"
    )]
    GridMismatch {
        key: String,
        path: PathBuf,
        expected: [usize; 3],
        observed: [usize; 3],
    },

    #[error("磁场图 `{key}` ({path:?}) 读入的记录过多: 网格容量 {capacity}，实际读入 {records}")]
    GridOverflow {
        key: String,
        path: PathBuf,
        capacity: usize,
        records: usize,
    },

    #[error("磁场文件 {path:?} 中找不到 `{directive}` 行")]
    HeaderNotFound { path: PathBuf, directive: String },

    #[error("读取 {path:?} 出错: 期望 {expected} 行数据，只读到 {read} 行（最后一行: {last_line:?}）")]
    TruncatedData {
        path: PathBuf,
        read: usize,
        expected: usize,
        last_line: String,
    },

    #[error("{path:?} 字节序标记不匹配: 读到 {found:#010x}，期望 {expected:#010x}")]
    EndianMismatch {
        path: PathBuf,
        found: u32,
        expected: u32,
    },

    #[error("{format} 格式的磁场文件要求环形半径为 {required} mm，但配置为 {configured} mm")]
    ConfigMismatch {
        format: String,
        required: f64,
        configured: f64,
    },

    #[error("文件 {path:?} 已存在，拒绝覆盖")]
    FileExists { path: PathBuf },

    #[error("磁场图 `{key}` 的边界已经设置过")]
    LimitsAlreadySet { key: String },

    #[error("磁场图 `{key}` 已经加载过")]
    DuplicateMapKey { key: String },

    #[error("磁场配置无效: {0}")]
    Config(String),

    #[error("读写 {path:?} 失败: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl FieldMapError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        FieldMapError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, FieldMapError>;

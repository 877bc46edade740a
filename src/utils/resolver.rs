use std::env;
use std::path::{Path, PathBuf};

use crate::error::{FieldMapError, Result};

/// 搜索路径环境变量，多个目录用冒号分隔
pub const SEARCH_PATH_ENV: &str = "BFIELD_SEARCH_PATH";

/// 把配置中的文件名解析为实际路径
pub trait FileResolver: Send + Sync {
    fn resolve(&self, name: &str) -> Result<PathBuf>;
}

/// 按目录顺序查找文件，第一个存在的候选胜出
#[derive(Debug, Clone, Default)]
pub struct SearchPath {
    dirs: Vec<PathBuf>,
}

impl SearchPath {
    pub fn new(dirs: Vec<PathBuf>) -> Self {
        SearchPath { dirs }
    }

    /// 配置中的目录优先，然后是环境变量中的目录，最后是当前目录
    pub fn from_config_and_env(config_dirs: &[String]) -> Self {
        let mut dirs: Vec<PathBuf> = config_dirs.iter().map(PathBuf::from).collect();
        if let Ok(value) = env::var(SEARCH_PATH_ENV) {
            dirs.extend(
                value
                    .split(':')
                    .filter(|s| !s.trim().is_empty())
                    .map(PathBuf::from),
            );
        }
        dirs.push(PathBuf::from("."));
        SearchPath { dirs }
    }

    pub fn dirs(&self) -> &[PathBuf] {
        &self.dirs
    }

    fn searched(&self) -> String {
        self.dirs
            .iter()
            .map(|d| d.display().to_string())
            .collect::<Vec<_>>()
            .join(":")
    }
}

impl FileResolver for SearchPath {
    fn resolve(&self, name: &str) -> Result<PathBuf> {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(FieldMapError::FileNotFound {
                name: name.to_string(),
                searched: self.searched(),
            });
        }

        let path = Path::new(trimmed);
        if path.is_absolute() {
            if path.is_file() {
                return Ok(path.to_path_buf());
            }
        } else if let Some(found) = self
            .dirs
            .iter()
            .map(|dir| dir.join(path))
            .find(|candidate| candidate.is_file())
        {
            return Ok(found);
        }

        Err(FieldMapError::FileNotFound {
            name: name.to_string(),
            searched: self.searched(),
        })
    }
}

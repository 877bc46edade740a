use crate::field_map::MapType;
use crate::utils::parser::{FieldMapParser, MapFileFormat};

/// 解析器注册表
/// 管理所有可用的磁场图解析器，并根据文件格式匹配对应的解析器
pub struct ParserRegistry {
    parsers: Vec<Box<dyn FieldMapParser>>,
}

impl ParserRegistry {
    /// 创建新的解析器注册表，自动注册所有可用的解析器
    pub fn new() -> Self {
        let parsers = crate::parsers::get_all_parsers();
        Self { parsers }
    }

    /// 根据文件格式查找匹配的解析器
    pub fn find_parser(&self, format: MapFileFormat) -> Option<&dyn FieldMapParser> {
        self.parsers
            .iter()
            .find(|parser| parser.format() == format)
            .map(|p| p.as_ref())
    }

    /// 根据磁场图类型和文件名查找匹配的解析器
    pub fn find_parser_for_file(
        &self,
        map_type: MapType,
        file_name: &str,
    ) -> Option<&dyn FieldMapParser> {
        self.find_parser(MapFileFormat::for_file(map_type, file_name))
    }

    /// 获取所有已注册解析器的名称
    pub fn parser_names(&self) -> Vec<&'static str> {
        self.parsers.iter().map(|p| p.name()).collect()
    }
}

impl Default for ParserRegistry {
    fn default() -> Self {
        Self::new()
    }
}

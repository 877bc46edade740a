pub mod binary_cache;
pub mod g4bl_header;
pub mod legacy;
pub mod text_grid;

pub use binary_cache::{BinaryCacheParser, write_binary_cache};
pub use g4bl_header::GridHeader;
pub use legacy::{GridRecord, LegacyBinaryParser};
pub use text_grid::TextGridParser;

/// 获取所有可用的解析器
pub fn get_all_parsers() -> Vec<Box<dyn crate::utils::parser::FieldMapParser>> {
    vec![
        Box::new(LegacyBinaryParser::new()),
        Box::new(TextGridParser::new()),
        Box::new(BinaryCacheParser::new()),
    ]
}

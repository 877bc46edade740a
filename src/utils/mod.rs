pub mod decompress;
pub mod parser;
pub mod parser_registry;
pub mod resolver;

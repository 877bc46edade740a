pub mod field;
pub mod health;
pub mod maps;

pub use field::get_field;
pub use health::hello;
pub use maps::list_maps;

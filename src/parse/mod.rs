pub mod description;
pub mod placemark;
pub mod raw_table;

pub use description::parse_description;
pub use placemark::load_tables;
pub use raw_table::RawTable;

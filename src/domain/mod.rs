pub mod errors;
pub mod fields;
pub mod table;

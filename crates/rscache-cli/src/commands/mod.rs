pub mod enum_file;
pub mod extract;
pub mod info;

pub mod index;
pub mod library;
pub mod mime;
pub mod scanner;

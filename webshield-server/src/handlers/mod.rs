pub mod scan;
pub mod system;
pub mod tools;

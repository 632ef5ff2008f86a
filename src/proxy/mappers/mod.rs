// Protocol mappers
pub mod backend;

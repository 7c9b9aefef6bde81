pub mod header_assembler;
pub mod request_builder;

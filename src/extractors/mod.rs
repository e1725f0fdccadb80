// src/extractors/mod.rs
pub mod award;
pub mod fields;
pub mod hierarchy;
pub mod record;
pub mod search;
pub mod subcontractors;
pub mod tables;
pub mod text;

// Re-export key extraction types for convenience
pub use record::{parse_contract_page, parse_contract_page_opt, ContractRecord};
pub use search::{find_contract_match, ContractMatch};

//! Rent contracts: lifecycle, due-date schedule and arrears.

pub mod error;
pub mod schedule;
pub mod service;
pub mod types;

#[cfg(test)]
mod schedule_props;

pub use error::ContractError;
pub use service::ContractService;
pub use types::{
    Arrears, ContractFilter, ContractStatus, CreateContractInput, PayoutType, RentContract,
};

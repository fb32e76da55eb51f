pub mod db;
pub mod domain;

pub use domain::{
    DetailKind, DetailType, MeterRef, PowerRegion, Premise, Purpose, Tdsp, TransactionSubType,
    TransactionType, UsageTransaction, UsageTransactionDetail,
};

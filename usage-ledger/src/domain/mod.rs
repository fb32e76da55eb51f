pub mod reference;
pub mod usage_transaction;

pub use reference::{
    DetailKind, DetailType, PowerRegion, Premise, Purpose, Tdsp, TransactionSubType, TransactionType,
};
pub use usage_transaction::{MeterRef, UsageTransaction, UsageTransactionDetail};

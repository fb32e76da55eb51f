pub mod reference_queries;
pub mod usage_transaction_queries;

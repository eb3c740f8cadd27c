mod service;

pub use service::{DailySales, OrderLedger, ProductRevenue, RecordOutcome, SalesSummary};

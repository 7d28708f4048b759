//! Export adapters. Render ledger history for people outside the app.

pub mod csv_export;

pub use csv_export::{expenses_to_csv, write_history_csv};

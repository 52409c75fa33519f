//! tabsql - Query CSV and Excel files using SQL.
//!
//! Files are parsed into Arrow tables, bound to SQL table names in a
//! [`Session`](session::Session), and queried through an embedded engine
//! (SQLite or Apache DataFusion). Results can be printed or exported as CSV.
//!
//! # Example
//!
//! ```no_run
//! use tabsql::query::{EngineKind, QueryEngine};
//! use tabsql::session::Session;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let mut session = Session::new();
//!     session.load_file("orders.csv")?;
//!     session.load_file("customers.xlsx")?;
//!
//!     let engine = QueryEngine::new(EngineKind::Sqlite);
//!     let result = session
//!         .run_query("SELECT * FROM orders JOIN customers USING (customer_id)", &engine)
//!         .await?;
//!     println!("{} rows", result.num_rows());
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod error;
pub mod io;
pub mod query;
pub mod session;

pub use error::{Error, Result};

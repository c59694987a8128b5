//! undian — lottery-entry service.
//!
//! Users submit a Telegram handle, a wallet address, and a chosen number,
//! capped per handle by a global limit; administrators manage entries and
//! mark winners through a cookie-protected API. The admission sequence in
//! [`submission`] and [`db`] is the correctness core: the per-handle limit
//! and number uniqueness are enforced transactionally so concurrent
//! submissions cannot oversubscribe a handle or double-claim a number.

pub mod db;
pub mod export;
pub mod prom_metrics;
pub mod server;
pub mod submission;
pub mod telegram;

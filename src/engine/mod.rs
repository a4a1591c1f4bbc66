//! The live auction engine: board, queue, bidding, anti-snipe policy,
//! expiry sweeping, and settlement

pub mod bids;
pub mod board;
pub mod house;
pub mod promote;
pub mod queue;
pub mod settlement;
pub mod snipe;
pub mod sweeper;
mod throttle;

pub use bids::BidEngine;
pub use board::AuctionBoard;
pub use house::AuctionHouse;
pub use promote::SlotPromoter;
pub use queue::{AuctionQueue, QueueStats};
pub use settlement::{derived_salary, SettlementEngine};
pub use snipe::SnipePolicy;
pub use sweeper::{ExpirySweeper, SweeperStats};

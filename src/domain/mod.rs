//! Domain types: the auction state machine, items, bids, and ledger entries

mod bid;
mod item;
mod ledger;
mod state;

pub use bid::{Bid, BidReceipt};
pub use item::{AssetDescriptor, AuctionItem, ItemSeed, ItemSnapshot, SettlementOutcome};
pub use ledger::{LedgerDirection, LedgerEntry};
pub use state::AuctionState;

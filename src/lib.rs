pub mod adapters;
pub mod cli;
pub mod config;
pub mod domain;
pub mod engine;
pub mod error;
pub mod feed;
pub mod ports;

pub use adapters::{InMemoryAuditLog, InMemoryLedger, InMemoryRoster, PostgresAuditLog};
pub use config::AppConfig;
pub use domain::{
    AssetDescriptor, AuctionItem, AuctionState, Bid, BidReceipt, ItemSeed, ItemSnapshot,
    LedgerDirection, LedgerEntry, SettlementOutcome,
};
pub use engine::{
    AuctionBoard, AuctionHouse, AuctionQueue, BidEngine, ExpirySweeper, QueueStats,
    SettlementEngine, SlotPromoter, SnipePolicy, SweeperStats,
};
pub use error::{BidError, GavelError, Result, SettlementError};
pub use feed::{AuctionEvent, EventFeed};
pub use ports::{AuditLog, BalanceLedger, DebitOutcome, RosterService};

//! Debt auction house state and operations
//!
//! The house never touches ledger state directly: coins move through
//! `Ledger::transfer_internal_coins` and bidder compensation after a
//! shutdown goes through `Ledger::create_unbacked_debt`, both invoked under
//! the house's own identity. Token minting and bad-debt bookkeeping belong
//! to collaborators injected per call.

use std::collections::BTreeMap;

use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{msg, program_error::ProgramError, pubkey::Pubkey};

use crate::constants::{
    DEFAULT_AMOUNT_SOLD_INCREASE, DEFAULT_BID_DECREASE, DEFAULT_BID_DURATION,
    DEFAULT_TOTAL_AUCTION_LENGTH,
};
use crate::error::CdpEngineError;
use crate::ledger::Ledger;
use crate::math::scales::{wad_mul, Rad, Wad, WAD};
use crate::math::u256::U256;
use crate::params::ParamValue;

/// Mints protocol tokens to the winning bidder on settlement
pub trait ProtocolToken {
    fn mint(&mut self, recipient: &Pubkey, amount: Wad) -> Result<(), ProgramError>;
}

/// Bookkeeping collaborator that tracks how much queued bad debt is
/// currently being auctioned; consulted once, on the first bid of each
/// auction
pub trait AccountingEngine {
    fn total_on_auction_debt(&self) -> Rad;
    fn cancel_auctioned_debt_with_surplus(&mut self, amount: Rad) -> Result<(), ProgramError>;
}

/// A live auction record, freed on settlement or premature termination
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bid {
    /// Fixed payment, in internal coins (coarse scale)
    pub bid_amount: Rad,
    /// Protocol tokens on offer; strictly decreases across bids (fine scale)
    pub amount_to_sell: Wad,
    pub high_bidder: Pubkey,
    /// Zero until the first bid; afterwards renewed per bid and only grows
    pub bid_expiry: i64,
    pub auction_deadline: i64,
}

/// The debt auction house
#[derive(BorshSerialize, BorshDeserialize, Debug)]
pub struct DebtAuctionHouse {
    /// Capability allowlist for privileged entry points
    pub authorized_accounts: BTreeMap<Pubkey, bool>,
    /// Live auctions keyed by id
    pub bids: BTreeMap<u64, Bid>,
    /// Monotone id sequence; the first auction gets id 1
    pub auctions_started: u64,
    /// Auctions started and not yet settled; zeroed when the house is
    /// disabled
    pub active_debt_auctions: u64,

    /// Minimum bid improvement ratio (fine scale)
    pub bid_decrease: Wad,
    /// Lot growth applied when an unbid auction restarts (fine scale)
    pub amount_sold_increase: Wad,
    /// Seconds a high bid stays open before the auction can settle
    pub bid_duration: i64,
    /// Seconds from start to the auction deadline
    pub total_auction_length: i64,

    /// Token collaborator address on record
    pub protocol_token: Pubkey,
    /// Accounting collaborator address on record; overwritten with the
    /// disabling caller, which then receives premature-termination debt
    pub accounting_engine: Pubkey,
    /// Identity under which the house calls privileged ledger entry points
    pub house_address: Pubkey,

    pub contract_enabled: bool,
}

impl DebtAuctionHouse {
    pub fn new(authority: Pubkey, house_address: Pubkey, protocol_token: Pubkey) -> Self {
        let mut house = Self {
            authorized_accounts: BTreeMap::new(),
            bids: BTreeMap::new(),
            auctions_started: 0,
            active_debt_auctions: 0,
            bid_decrease: DEFAULT_BID_DECREASE,
            amount_sold_increase: DEFAULT_AMOUNT_SOLD_INCREASE,
            bid_duration: DEFAULT_BID_DURATION,
            total_auction_length: DEFAULT_TOTAL_AUCTION_LENGTH,
            protocol_token,
            accounting_engine: Pubkey::default(),
            house_address,
            contract_enabled: true,
        };
        house.authorized_accounts.insert(authority, true);
        house
    }

    pub fn is_authorized(&self, account: &Pubkey) -> bool {
        self.authorized_accounts.get(account).copied().unwrap_or(false)
    }

    pub fn bid(&self, id: u64) -> Option<Bid> {
        self.bids.get(&id).copied()
    }

    fn require_authorized(&self, caller: &Pubkey) -> Result<(), ProgramError> {
        if !self.is_authorized(caller) {
            return Err(CdpEngineError::Unauthorized.into());
        }
        Ok(())
    }

    fn live_bid(&self, id: u64) -> Result<Bid, ProgramError> {
        self.bids
            .get(&id)
            .copied()
            .ok_or_else(|| CdpEngineError::AuctionNeverStarted.into())
    }

    pub fn add_authorization(&mut self, caller: Pubkey, account: Pubkey) -> Result<(), ProgramError> {
        self.require_authorized(&caller)?;
        self.authorized_accounts.insert(account, true);
        Ok(())
    }

    pub fn remove_authorization(
        &mut self,
        caller: Pubkey,
        account: Pubkey,
    ) -> Result<(), ProgramError> {
        self.require_authorized(&caller)?;
        self.authorized_accounts.insert(account, false);
        Ok(())
    }

    /// Update an auction parameter by name
    pub fn modify_parameters(
        &mut self,
        caller: Pubkey,
        name: &str,
        value: ParamValue,
    ) -> Result<(), ProgramError> {
        self.require_authorized(&caller)?;

        match (name, value) {
            ("bid_decrease", ParamValue::Wad(v)) => self.bid_decrease = v,
            ("amount_sold_increase", ParamValue::Wad(v)) => self.amount_sold_increase = v,
            ("bid_duration", ParamValue::Duration(v)) => self.bid_duration = v,
            ("total_auction_length", ParamValue::Duration(v)) => self.total_auction_length = v,
            ("protocol_token", ParamValue::Address(v)) => self.protocol_token = v,
            ("accounting_engine", ParamValue::Address(v)) => self.accounting_engine = v,
            _ => return Err(CdpEngineError::UnrecognizedParameter.into()),
        }
        Ok(())
    }

    /// Open a new auction: a fixed `initial_bid` payment against
    /// `amount_to_sell` protocol tokens, initially credited to
    /// `income_receiver` as high bidder
    pub fn start_auction(
        &mut self,
        caller: Pubkey,
        income_receiver: Pubkey,
        amount_to_sell: Wad,
        initial_bid: Rad,
        now: i64,
    ) -> Result<u64, ProgramError> {
        self.require_authorized(&caller)?;
        if !self.contract_enabled {
            return Err(CdpEngineError::NotEnabled.into());
        }

        let id = self
            .auctions_started
            .checked_add(1)
            .ok_or_else(|| ProgramError::from(CdpEngineError::ArithmeticOverflow))?;
        let auction_deadline = now
            .checked_add(self.total_auction_length)
            .ok_or_else(|| ProgramError::from(CdpEngineError::ArithmeticOverflow))?;
        let active = self
            .active_debt_auctions
            .checked_add(1)
            .ok_or_else(|| ProgramError::from(CdpEngineError::ArithmeticOverflow))?;

        self.auctions_started = id;
        self.active_debt_auctions = active;
        self.bids.insert(
            id,
            Bid {
                bid_amount: initial_bid,
                amount_to_sell,
                high_bidder: income_receiver,
                bid_expiry: 0,
                auction_deadline,
            },
        );

        msg!("Debt auction {} started, selling {}", id, amount_to_sell);
        Ok(id)
    }

    /// Grow the lot of an auction whose deadline passed with no bid ever
    /// placed, and renew its deadline. The only way out for a stuck unbid
    /// auction.
    pub fn restart_auction(&mut self, id: u64, now: i64) -> Result<(), ProgramError> {
        let mut bid = self.live_bid(id)?;
        if bid.auction_deadline >= now {
            return Err(CdpEngineError::AuctionNotFinished.into());
        }
        if bid.bid_expiry != 0 {
            return Err(CdpEngineError::BidAlreadyPlaced.into());
        }

        bid.amount_to_sell = wad_mul(self.amount_sold_increase, bid.amount_to_sell)?;
        bid.auction_deadline = now
            .checked_add(self.total_auction_length)
            .ok_or_else(|| ProgramError::from(CdpEngineError::ArithmeticOverflow))?;
        self.bids.insert(id, bid);

        msg!("Debt auction {} restarted, now selling {}", id, bid.amount_to_sell);
        Ok(())
    }

    /// Place a bid: pay exactly the recorded `bid` of internal coins to the
    /// previous high bidder and accept a lot at least the configured ratio
    /// smaller. The first bid also cancels the matching slice of the
    /// accounting collaborator's queued debt.
    #[allow(clippy::too_many_arguments)]
    pub fn decrease_sold_amount<A: AccountingEngine>(
        &mut self,
        caller: Pubkey,
        id: u64,
        amount_to_buy: Wad,
        bid: Rad,
        now: i64,
        ledger: &mut Ledger,
        accounting: &mut A,
    ) -> Result<(), ProgramError> {
        if !self.contract_enabled {
            return Err(CdpEngineError::NotEnabled.into());
        }
        let mut record = self.live_bid(id)?;
        if record.high_bidder == Pubkey::default() {
            return Err(CdpEngineError::HighBidderUnset.into());
        }
        if record.bid_expiry != 0 && record.bid_expiry <= now {
            return Err(CdpEngineError::AuctionAlreadyExpired.into());
        }
        if record.auction_deadline <= now {
            return Err(CdpEngineError::AuctionAlreadyExpired.into());
        }
        if bid != record.bid_amount {
            return Err(CdpEngineError::BidNotMatching.into());
        }
        if amount_to_buy >= record.amount_to_sell {
            return Err(CdpEngineError::InsufficientBidImprovement.into());
        }
        if U256::mul_u128(self.bid_decrease, amount_to_buy)
            > U256::mul_u128(record.amount_to_sell, WAD)
        {
            return Err(CdpEngineError::InsufficientBidImprovement.into());
        }

        let first_bid = record.bid_expiry == 0;
        let bid_expiry = now
            .checked_add(self.bid_duration)
            .ok_or_else(|| ProgramError::from(CdpEngineError::ArithmeticOverflow))?;

        ledger.transfer_internal_coins(caller, caller, record.high_bidder, bid)?;

        // The first bid takes the matching amount of queued debt off auction
        // in the collaborator's own bookkeeping
        if first_bid {
            let queued = accounting.total_on_auction_debt();
            accounting.cancel_auctioned_debt_with_surplus(bid.min(queued))?;
        }

        record.high_bidder = caller;
        record.amount_to_sell = amount_to_buy;
        record.bid_expiry = bid_expiry;
        self.bids.insert(id, record);
        Ok(())
    }

    /// Close out an auction whose bid expiry or deadline has passed with a
    /// bid in place: mint the final lot to the high bidder and free the
    /// record
    pub fn settle_auction<T: ProtocolToken>(
        &mut self,
        id: u64,
        now: i64,
        token: &mut T,
    ) -> Result<(), ProgramError> {
        if !self.contract_enabled {
            return Err(CdpEngineError::NotEnabled.into());
        }
        let record = self.live_bid(id)?;
        let finished = record.bid_expiry != 0
            && (record.bid_expiry < now || record.auction_deadline < now);
        if !finished {
            return Err(CdpEngineError::AuctionNotFinished.into());
        }

        token.mint(&record.high_bidder, record.amount_to_sell)?;
        self.active_debt_auctions = self
            .active_debt_auctions
            .checked_sub(1)
            .ok_or_else(|| ProgramError::from(CdpEngineError::ArithmeticUnderflow))?;
        self.bids.remove(&id);

        msg!(
            "Debt auction {} settled: {} minted to {}",
            id,
            record.amount_to_sell,
            record.high_bidder
        );
        Ok(())
    }

    /// Shut the house down. The caller becomes the recorded accounting
    /// destination for premature-termination debt, and the active-auction
    /// counter stops tracking.
    pub fn disable_contract(&mut self, caller: Pubkey) -> Result<(), ProgramError> {
        self.require_authorized(&caller)?;
        self.contract_enabled = false;
        self.accounting_engine = caller;
        self.active_debt_auctions = 0;
        msg!("Debt auction house disabled");
        Ok(())
    }

    /// After shutdown, refund an auction's high bidder with freshly created
    /// unbacked debt (the coins it already paid cannot be returned any other
    /// way) and free the record
    pub fn terminate_auction_prematurely(
        &mut self,
        id: u64,
        ledger: &mut Ledger,
    ) -> Result<(), ProgramError> {
        if self.contract_enabled {
            return Err(CdpEngineError::HouseStillEnabled.into());
        }
        let record = self.live_bid(id)?;
        if record.high_bidder == Pubkey::default() {
            return Err(CdpEngineError::HighBidderUnset.into());
        }

        ledger.create_unbacked_debt(
            self.house_address,
            self.accounting_engine,
            record.high_bidder,
            record.bid_amount,
        )?;
        self.bids.remove(&id);

        msg!("Debt auction {} terminated prematurely", id);
        Ok(())
    }
}

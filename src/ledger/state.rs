//! Ledger state and entry points
//!
//! The `Ledger` owns every collateral-type record, position record and
//! balance account, plus the global debt accounting scalars. It is a single
//! owned state object: callers hold `&mut Ledger` and exclusive ownership is
//! the serialization barrier, so no operation ever observes a partial
//! update. Each entry point computes its new values first, runs every check,
//! and only then writes back.

use std::collections::BTreeMap;

use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{msg, program_error::ProgramError, pubkey::Pubkey};

use crate::error::CdpEngineError;
use crate::math::scales::{
    checked_add_delta, checked_sub_delta, mul_signed, ray_mul_wad, Rad, Ray, Wad, RAY,
};
use crate::params::ParamValue;

/// Per-collateral-type risk parameters and aggregate debt
///
/// `accumulated_rate` doubles as the initialization marker: it is zero until
/// `initialize_collateral_type` sets it to the accumulator unit, and a
/// second initialization is rejected.
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CollateralType {
    /// Total normalized debt issued against this collateral (fine scale)
    pub debt_amount: Wad,
    /// Cumulative interest multiplier (accumulator scale)
    pub accumulated_rate: Ray,
    /// Price with the safety margin applied (accumulator scale)
    pub safety_price: Ray,
    /// Price with the liquidation margin applied (accumulator scale)
    pub liquidation_price: Ray,
    /// Maximum debt issuable against this collateral (coarse scale)
    pub debt_ceiling: Rad,
    /// Minimum viable position debt (coarse scale)
    pub debt_floor: Rad,
}

/// A single owner's position for one collateral type
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Position {
    /// Collateral locked in the position (fine scale)
    pub locked_collateral: Wad,
    /// Normalized debt; actual owed is this times the accumulated rate
    pub generated_debt: Wad,
}

/// The collateral ledger
#[derive(BorshSerialize, BorshDeserialize, Debug, Default)]
pub struct Ledger {
    /// Capability allowlist for privileged entry points
    pub authorized_accounts: BTreeMap<Pubkey, bool>,
    /// (owner, delegate) pairs permitted to act on the owner's behalf
    pub position_delegates: BTreeMap<(Pubkey, Pubkey), bool>,

    /// Collateral-type records keyed by collateral identifier
    pub collateral_types: BTreeMap<Pubkey, CollateralType>,
    /// Position records keyed by (collateral, owner)
    pub positions: BTreeMap<(Pubkey, Pubkey), Position>,
    /// Free collateral not locked in a position, keyed by (collateral, account)
    pub collateral_balances: BTreeMap<(Pubkey, Pubkey), Wad>,
    /// Internal coin balances (coarse scale)
    pub coin_balances: BTreeMap<Pubkey, Rad>,
    /// Bad-debt balances, the antisymmetric counterpart of coin balances
    pub debt_balances: BTreeMap<Pubkey, Rad>,

    /// Sum of all issued debt (coarse scale)
    pub global_debt: Rad,
    /// Sum of all debt not backed by collateral (coarse scale)
    pub global_unbacked_debt: Rad,
    /// Maximum allowed global debt (coarse scale)
    pub global_debt_ceiling: Rad,
    /// Cleared by `disable`; most privileged mutation requires it
    pub enabled: bool,
}

impl Ledger {
    /// Create a ledger with `authority` seeded into the allowlist
    pub fn new(authority: Pubkey) -> Self {
        let mut ledger = Self {
            enabled: true,
            ..Self::default()
        };
        ledger.authorized_accounts.insert(authority, true);
        ledger
    }

    // --- reads -----------------------------------------------------------

    pub fn is_authorized(&self, account: &Pubkey) -> bool {
        self.authorized_accounts.get(account).copied().unwrap_or(false)
    }

    /// Whether `actor` may modify `owner`'s position and balances
    pub fn can_modify_position(&self, owner: &Pubkey, actor: &Pubkey) -> bool {
        owner == actor
            || self
                .position_delegates
                .get(&(*owner, *actor))
                .copied()
                .unwrap_or(false)
    }

    pub fn collateral_type(&self, collateral: &Pubkey) -> CollateralType {
        self.collateral_types.get(collateral).copied().unwrap_or_default()
    }

    pub fn position(&self, collateral: &Pubkey, owner: &Pubkey) -> Position {
        self.positions
            .get(&(*collateral, *owner))
            .copied()
            .unwrap_or_default()
    }

    pub fn collateral_balance(&self, collateral: &Pubkey, account: &Pubkey) -> Wad {
        self.collateral_balances
            .get(&(*collateral, *account))
            .copied()
            .unwrap_or_default()
    }

    pub fn coin_balance(&self, account: &Pubkey) -> Rad {
        self.coin_balances.get(account).copied().unwrap_or_default()
    }

    pub fn debt_balance(&self, account: &Pubkey) -> Rad {
        self.debt_balances.get(account).copied().unwrap_or_default()
    }

    fn require_authorized(&self, caller: &Pubkey) -> Result<(), ProgramError> {
        if !self.is_authorized(caller) {
            return Err(CdpEngineError::Unauthorized.into());
        }
        Ok(())
    }

    fn require_enabled(&self) -> Result<(), ProgramError> {
        if !self.enabled {
            return Err(CdpEngineError::NotEnabled.into());
        }
        Ok(())
    }

    // --- authorization and delegation ------------------------------------

    pub fn add_authorization(&mut self, caller: Pubkey, account: Pubkey) -> Result<(), ProgramError> {
        self.require_authorized(&caller)?;
        self.require_enabled()?;
        self.authorized_accounts.insert(account, true);
        Ok(())
    }

    pub fn remove_authorization(
        &mut self,
        caller: Pubkey,
        account: Pubkey,
    ) -> Result<(), ProgramError> {
        self.require_authorized(&caller)?;
        self.require_enabled()?;
        self.authorized_accounts.insert(account, false);
        Ok(())
    }

    /// Grant `delegate` the right to act on the caller's position and
    /// balances. Available in either lifecycle state.
    pub fn approve_position_modification(&mut self, caller: Pubkey, delegate: Pubkey) {
        self.position_delegates.insert((caller, delegate), true);
    }

    pub fn deny_position_modification(&mut self, caller: Pubkey, delegate: Pubkey) {
        self.position_delegates.insert((caller, delegate), false);
    }

    // --- collateral-type management --------------------------------------

    /// Register a collateral type, setting its accumulated rate to the
    /// accumulator unit. A second call for the same collateral fails and
    /// leaves the first initialization untouched.
    pub fn initialize_collateral_type(
        &mut self,
        caller: Pubkey,
        collateral: Pubkey,
    ) -> Result<(), ProgramError> {
        self.require_authorized(&caller)?;
        self.require_enabled()?;

        let mut record = self.collateral_type(&collateral);
        if record.accumulated_rate != 0 {
            return Err(CdpEngineError::AlreadyInitialized.into());
        }
        record.accumulated_rate = RAY;
        self.collateral_types.insert(collateral, record);

        msg!("Collateral type {} initialized", collateral);
        Ok(())
    }

    /// Update a global parameter by name
    pub fn modify_parameters(
        &mut self,
        caller: Pubkey,
        name: &str,
        value: ParamValue,
    ) -> Result<(), ProgramError> {
        self.require_authorized(&caller)?;
        self.require_enabled()?;

        match (name, value) {
            ("global_debt_ceiling", ParamValue::Rad(v)) => self.global_debt_ceiling = v,
            _ => return Err(CdpEngineError::UnrecognizedParameter.into()),
        }
        Ok(())
    }

    /// Update a per-collateral parameter by name. Prices are supplied by the
    /// external price source; the ledger only stores them.
    pub fn modify_collateral_parameters(
        &mut self,
        caller: Pubkey,
        collateral: Pubkey,
        name: &str,
        value: ParamValue,
    ) -> Result<(), ProgramError> {
        self.require_authorized(&caller)?;
        self.require_enabled()?;

        let mut record = self.collateral_type(&collateral);
        match (name, value) {
            ("safety_price", ParamValue::Ray(v)) => record.safety_price = v,
            ("liquidation_price", ParamValue::Ray(v)) => record.liquidation_price = v,
            ("debt_ceiling", ParamValue::Rad(v)) => record.debt_ceiling = v,
            ("debt_floor", ParamValue::Rad(v)) => record.debt_floor = v,
            _ => return Err(CdpEngineError::UnrecognizedParameter.into()),
        }
        self.collateral_types.insert(collateral, record);
        Ok(())
    }

    // --- balance movement -------------------------------------------------

    /// Credit or debit an account's free collateral
    pub fn adjust_collateral_balance(
        &mut self,
        caller: Pubkey,
        collateral: Pubkey,
        account: Pubkey,
        delta: i128,
    ) -> Result<(), ProgramError> {
        self.require_authorized(&caller)?;
        self.require_enabled()?;

        let balance = self.collateral_balance(&collateral, &account);
        let updated = checked_add_delta(balance, delta)?;
        self.collateral_balances.insert((collateral, account), updated);
        Ok(())
    }

    /// Move free collateral between accounts; the caller must be the source
    /// or an approved delegate of the source
    pub fn transfer_collateral(
        &mut self,
        caller: Pubkey,
        collateral: Pubkey,
        src: Pubkey,
        dst: Pubkey,
        amount: Wad,
    ) -> Result<(), ProgramError> {
        if !self.can_modify_position(&src, &caller) {
            return Err(CdpEngineError::NotConsented.into());
        }

        let src_balance = self.collateral_balance(&collateral, &src);
        let new_src = src_balance
            .checked_sub(amount)
            .ok_or_else(|| ProgramError::from(CdpEngineError::ArithmeticUnderflow))?;
        let dst_balance = if dst == src {
            new_src
        } else {
            self.collateral_balance(&collateral, &dst)
        };
        let new_dst = dst_balance
            .checked_add(amount)
            .ok_or_else(|| ProgramError::from(CdpEngineError::ArithmeticOverflow))?;

        self.collateral_balances.insert((collateral, src), new_src);
        self.collateral_balances.insert((collateral, dst), new_dst);
        Ok(())
    }

    /// Move internal coins between accounts; same consent rule as
    /// `transfer_collateral`. Not gated on `enabled` so balances can unwind
    /// after shutdown.
    pub fn transfer_internal_coins(
        &mut self,
        caller: Pubkey,
        src: Pubkey,
        dst: Pubkey,
        amount: Rad,
    ) -> Result<(), ProgramError> {
        if !self.can_modify_position(&src, &caller) {
            return Err(CdpEngineError::NotConsented.into());
        }

        let new_src = self.coin_balance(&src).checked_sub(amount)?;
        let dst_balance = if dst == src { new_src } else { self.coin_balance(&dst) };
        let new_dst = dst_balance.checked_add(amount)?;

        self.coin_balances.insert(src, new_src);
        self.coin_balances.insert(dst, new_dst);
        Ok(())
    }

    // --- position management ----------------------------------------------

    /// The core state transition: lock or free collateral and generate or
    /// repay debt for a position, settling the collateral leg against
    /// `collateral_source`'s free balance and the coin leg against
    /// `debt_destination`'s coin balance.
    ///
    /// Order of enforcement: initialization, checked arithmetic, ceilings,
    /// safety, consent, dust. Any failure aborts with no partial effect.
    #[allow(clippy::too_many_arguments)]
    pub fn modify_position_collateralization(
        &mut self,
        caller: Pubkey,
        collateral: Pubkey,
        owner: Pubkey,
        collateral_source: Pubkey,
        debt_destination: Pubkey,
        delta_collateral: i128,
        delta_debt: i128,
    ) -> Result<(), ProgramError> {
        self.require_enabled()?;

        let mut record = self.collateral_type(&collateral);
        if record.accumulated_rate == 0 {
            return Err(CdpEngineError::CollateralTypeNotInitialized.into());
        }

        let mut position = self.position(&collateral, &owner);
        position.locked_collateral =
            checked_add_delta(position.locked_collateral, delta_collateral)?;
        position.generated_debt = checked_add_delta(position.generated_debt, delta_debt)?;
        record.debt_amount = checked_add_delta(record.debt_amount, delta_debt)?;

        let delta_adjusted_debt = mul_signed(record.accumulated_rate, delta_debt);
        let total_issued_debt = ray_mul_wad(record.accumulated_rate, position.generated_debt);
        let new_global_debt = self.global_debt.add_signed(delta_adjusted_debt)?;

        // Ceilings bind only when debt grows
        let debt_not_increased = delta_debt <= 0;
        if !debt_not_increased {
            let collateral_debt_value = ray_mul_wad(record.accumulated_rate, record.debt_amount);
            if collateral_debt_value > record.debt_ceiling
                || new_global_debt > self.global_debt_ceiling
            {
                return Err(CdpEngineError::CeilingExceeded.into());
            }
        }

        // A risk-reducing change skips the safety check
        let risk_reducing = delta_debt <= 0 && delta_collateral >= 0;
        if !risk_reducing {
            let collateral_value = ray_mul_wad(record.safety_price, position.locked_collateral);
            if total_issued_debt > collateral_value {
                return Err(CdpEngineError::PositionNotSafe.into());
            }
        }

        // Consent: the owner unless risk-reducing, the collateral source
        // when collateral is taken, the debt destination when coins are taken
        if !risk_reducing && !self.can_modify_position(&owner, &caller) {
            return Err(CdpEngineError::NotConsented.into());
        }
        if delta_collateral > 0 && !self.can_modify_position(&collateral_source, &caller) {
            return Err(CdpEngineError::NotConsented.into());
        }
        if delta_debt < 0 && !self.can_modify_position(&debt_destination, &caller) {
            return Err(CdpEngineError::NotConsented.into());
        }

        if position.generated_debt != 0 && total_issued_debt < record.debt_floor {
            return Err(CdpEngineError::DustPosition.into());
        }

        let source_balance = self.collateral_balance(&collateral, &collateral_source);
        let new_source_balance = checked_sub_delta(source_balance, delta_collateral)?;
        let new_destination_coins = self
            .coin_balance(&debt_destination)
            .add_signed(delta_adjusted_debt)?;

        self.collateral_balances
            .insert((collateral, collateral_source), new_source_balance);
        self.coin_balances
            .insert(debt_destination, new_destination_coins);
        self.positions.insert((collateral, owner), position);
        self.collateral_types.insert(collateral, record);
        self.global_debt = new_global_debt;

        msg!(
            "Position {} / {} adjusted: collateral {} debt {}",
            collateral,
            owner,
            delta_collateral,
            delta_debt
        );
        Ok(())
    }

    /// Move collateral and debt between two positions of the same type.
    /// Both owners must consent and both resulting positions must be safe
    /// and above the debt floor.
    pub fn transfer_position_collateral_and_debt(
        &mut self,
        caller: Pubkey,
        collateral: Pubkey,
        src: Pubkey,
        dst: Pubkey,
        delta_collateral: i128,
        delta_debt: i128,
    ) -> Result<(), ProgramError> {
        let record = self.collateral_type(&collateral);

        let (new_src, new_dst) = if src == dst {
            // Aliased legs land on a single record; subtract before add per field
            let locked = checked_sub_delta(
                self.position(&collateral, &src).locked_collateral,
                delta_collateral,
            )?;
            let locked = checked_add_delta(locked, delta_collateral)?;
            let generated = checked_sub_delta(
                self.position(&collateral, &src).generated_debt,
                delta_debt,
            )?;
            let generated = checked_add_delta(generated, delta_debt)?;
            let merged = Position {
                locked_collateral: locked,
                generated_debt: generated,
            };
            (merged, merged)
        } else {
            let src_position = self.position(&collateral, &src);
            let dst_position = self.position(&collateral, &dst);
            (
                Position {
                    locked_collateral: checked_sub_delta(
                        src_position.locked_collateral,
                        delta_collateral,
                    )?,
                    generated_debt: checked_sub_delta(src_position.generated_debt, delta_debt)?,
                },
                Position {
                    locked_collateral: checked_add_delta(
                        dst_position.locked_collateral,
                        delta_collateral,
                    )?,
                    generated_debt: checked_add_delta(dst_position.generated_debt, delta_debt)?,
                },
            )
        };

        if !self.can_modify_position(&src, &caller) || !self.can_modify_position(&dst, &caller) {
            return Err(CdpEngineError::NotConsented.into());
        }

        let src_debt = ray_mul_wad(record.accumulated_rate, new_src.generated_debt);
        let dst_debt = ray_mul_wad(record.accumulated_rate, new_dst.generated_debt);
        if src_debt > ray_mul_wad(record.safety_price, new_src.locked_collateral)
            || dst_debt > ray_mul_wad(record.safety_price, new_dst.locked_collateral)
        {
            return Err(CdpEngineError::PositionNotSafe.into());
        }
        if (new_src.generated_debt != 0 && src_debt < record.debt_floor)
            || (new_dst.generated_debt != 0 && dst_debt < record.debt_floor)
        {
            return Err(CdpEngineError::DustPosition.into());
        }

        self.positions.insert((collateral, src), new_src);
        self.positions.insert((collateral, dst), new_dst);
        Ok(())
    }

    /// Seize collateral and debt from a position under system authority,
    /// bypassing safety, dust and consent checks. The collateral leg settles
    /// against `collateral_counterparty`'s free balance, the debt leg
    /// against `debt_counterparty`'s bad-debt balance at the accumulated
    /// rate, and the global unbacked total moves with it.
    #[allow(clippy::too_many_arguments)]
    pub fn confiscate_position_collateral_and_debt(
        &mut self,
        caller: Pubkey,
        collateral: Pubkey,
        owner: Pubkey,
        collateral_counterparty: Pubkey,
        debt_counterparty: Pubkey,
        delta_collateral: i128,
        delta_debt: i128,
    ) -> Result<(), ProgramError> {
        self.require_authorized(&caller)?;

        let mut record = self.collateral_type(&collateral);
        let mut position = self.position(&collateral, &owner);

        let delta_total_issued = mul_signed(record.accumulated_rate, delta_debt);

        position.locked_collateral =
            checked_add_delta(position.locked_collateral, delta_collateral)?;
        position.generated_debt = checked_add_delta(position.generated_debt, delta_debt)?;
        record.debt_amount = checked_add_delta(record.debt_amount, delta_debt)?;

        let counterparty_balance =
            self.collateral_balance(&collateral, &collateral_counterparty);
        let new_counterparty_balance = checked_sub_delta(counterparty_balance, delta_collateral)?;
        let new_debt_balance = self
            .debt_balance(&debt_counterparty)
            .sub_signed(delta_total_issued)?;
        let new_unbacked = self.global_unbacked_debt.sub_signed(delta_total_issued)?;

        self.collateral_balances
            .insert((collateral, collateral_counterparty), new_counterparty_balance);
        self.debt_balances.insert(debt_counterparty, new_debt_balance);
        self.positions.insert((collateral, owner), position);
        self.collateral_types.insert(collateral, record);
        self.global_unbacked_debt = new_unbacked;

        msg!("Confiscated from position {} / {}", collateral, owner);
        Ok(())
    }

    // --- debt accounting ---------------------------------------------------

    /// Burn equal amounts of the caller's coins and bad debt. Available in
    /// either lifecycle state.
    pub fn settle_debt(&mut self, caller: Pubkey, amount: Rad) -> Result<(), ProgramError> {
        let new_debt_balance = self.debt_balance(&caller).checked_sub(amount)?;
        let new_coin_balance = self.coin_balance(&caller).checked_sub(amount)?;
        let new_unbacked = self.global_unbacked_debt.checked_sub(amount)?;
        let new_global = self.global_debt.checked_sub(amount)?;

        self.debt_balances.insert(caller, new_debt_balance);
        self.coin_balances.insert(caller, new_coin_balance);
        self.global_unbacked_debt = new_unbacked;
        self.global_debt = new_global;

        msg!("Settled {} debt for {}", amount, caller);
        Ok(())
    }

    /// Mint matched bad debt and coins: the debt lands on
    /// `debt_destination`, the coins on `coin_destination`, and both global
    /// totals grow by `amount`.
    pub fn create_unbacked_debt(
        &mut self,
        caller: Pubkey,
        debt_destination: Pubkey,
        coin_destination: Pubkey,
        amount: Rad,
    ) -> Result<(), ProgramError> {
        self.require_authorized(&caller)?;

        let new_debt_balance = self.debt_balance(&debt_destination).checked_add(amount)?;
        let new_coin_balance = self.coin_balance(&coin_destination).checked_add(amount)?;
        let new_unbacked = self.global_unbacked_debt.checked_add(amount)?;
        let new_global = self.global_debt.checked_add(amount)?;

        self.debt_balances.insert(debt_destination, new_debt_balance);
        self.coin_balances.insert(coin_destination, new_coin_balance);
        self.global_unbacked_debt = new_unbacked;
        self.global_debt = new_global;

        msg!(
            "Created {} unbacked debt for {} / coins for {}",
            amount,
            debt_destination,
            coin_destination
        );
        Ok(())
    }

    /// Interest-accrual hook: fold a signed rate delta into the collateral
    /// type's accumulated rate and credit the resulting surplus (the
    /// aggregate normalized debt times the delta) to `surplus_destination`.
    pub fn update_accumulated_rate(
        &mut self,
        caller: Pubkey,
        collateral: Pubkey,
        surplus_destination: Pubkey,
        rate_multiplier: i128,
    ) -> Result<(), ProgramError> {
        self.require_authorized(&caller)?;
        self.require_enabled()?;

        let mut record = self.collateral_type(&collateral);
        if record.accumulated_rate == 0 {
            return Err(CdpEngineError::CollateralTypeNotInitialized.into());
        }

        record.accumulated_rate = checked_add_delta(record.accumulated_rate, rate_multiplier)?;
        let surplus = mul_signed(record.debt_amount, rate_multiplier);
        let new_surplus_balance = self.coin_balance(&surplus_destination).add_signed(surplus)?;
        let new_global = self.global_debt.add_signed(surplus)?;

        self.coin_balances
            .insert(surplus_destination, new_surplus_balance);
        self.collateral_types.insert(collateral, record);
        self.global_debt = new_global;
        Ok(())
    }

    /// Halt privileged mutation. History is preserved; delegation changes,
    /// coin/collateral transfers and debt settlement stay available so the
    /// system can unwind in an orderly way.
    pub fn disable(&mut self, caller: Pubkey) -> Result<(), ProgramError> {
        self.require_authorized(&caller)?;
        self.enabled = false;
        msg!("Ledger disabled");
        Ok(())
    }
}

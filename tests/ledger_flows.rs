//! End-to-end ledger scenarios and accounting properties
//!
//! Walks the ledger through realistic multi-step flows and checks the
//! global-accounting identities with randomized inputs.

use proptest::prelude::*;
use solana_program::pubkey::Pubkey;

use cdp_engine_core::{
    math::{ray_mul_wad, u256::U256},
    CdpEngineError, Ledger, ParamValue, Position, Rad, RAY, WAD,
};

fn ledger_with_collateral() -> (Ledger, Pubkey, Pubkey) {
    let authority = Pubkey::new_unique();
    let collateral = Pubkey::new_unique();
    let mut ledger = Ledger::new(authority);
    ledger
        .initialize_collateral_type(authority, collateral)
        .unwrap();
    // safety price 2.0: each collateral unit supports two units of debt
    ledger
        .modify_collateral_parameters(authority, collateral, "safety_price", ParamValue::Ray(2 * RAY))
        .unwrap();
    ledger
        .modify_collateral_parameters(
            authority,
            collateral,
            "debt_ceiling",
            ParamValue::Rad(Rad::from_whole(1_000_000)),
        )
        .unwrap();
    ledger
        .modify_collateral_parameters(
            authority,
            collateral,
            "debt_floor",
            ParamValue::Rad(Rad::from_whole(10)),
        )
        .unwrap();
    ledger
        .modify_parameters(
            authority,
            "global_debt_ceiling",
            ParamValue::Rad(Rad::from_whole(1_000_000)),
        )
        .unwrap();
    (ledger, authority, collateral)
}

#[test]
fn test_borrow_accrue_repay_flow() {
    let (mut ledger, authority, collateral) = ledger_with_collateral();
    let user = Pubkey::new_unique();
    let treasury = Pubkey::new_unique();

    ledger
        .adjust_collateral_balance(authority, collateral, user, (100 * WAD) as i128)
        .unwrap();
    ledger
        .modify_position_collateralization(
            user,
            collateral,
            user,
            user,
            user,
            (100 * WAD) as i128,
            (100 * WAD) as i128,
        )
        .unwrap();
    assert_eq!(ledger.coin_balance(&user), Rad::from_whole(100));

    // 2% accrual lands on the treasury and the global total
    ledger
        .update_accumulated_rate(authority, collateral, treasury, (RAY / 50) as i128)
        .unwrap();
    assert_eq!(ledger.coin_balance(&treasury), Rad::from_whole(2));
    assert_eq!(ledger.global_debt, Rad::from_whole(102));

    // the position now owes more than it drew; repaying all normalized debt
    // needs the accrued coins too
    let owed = ray_mul_wad(
        ledger.collateral_type(&collateral).accumulated_rate,
        ledger.position(&collateral, &user).generated_debt,
    );
    assert_eq!(owed, Rad::from_whole(102));

    ledger
        .transfer_internal_coins(treasury, treasury, user, Rad::from_whole(2))
        .unwrap();
    ledger
        .modify_position_collateralization(
            user,
            collateral,
            user,
            user,
            user,
            -((100 * WAD) as i128),
            -((100 * WAD) as i128),
        )
        .unwrap();

    assert_eq!(ledger.position(&collateral, &user), Position::default());
    assert_eq!(ledger.coin_balance(&user), Rad::ZERO);
    assert_eq!(ledger.collateral_balance(&collateral, &user), 100 * WAD);
    assert_eq!(ledger.global_debt, Rad::ZERO);
}

#[test]
fn test_liquidation_flow_settles_bad_debt() {
    let (mut ledger, authority, collateral) = ledger_with_collateral();
    let user = Pubkey::new_unique();
    let accounting = Pubkey::new_unique();

    ledger
        .adjust_collateral_balance(authority, collateral, user, (100 * WAD) as i128)
        .unwrap();
    ledger
        .modify_position_collateralization(
            user,
            collateral,
            user,
            user,
            user,
            (100 * WAD) as i128,
            (200 * WAD) as i128,
        )
        .unwrap();

    // the liquidation engine seizes the whole position
    ledger
        .confiscate_position_collateral_and_debt(
            authority,
            collateral,
            user,
            accounting,
            accounting,
            -((100 * WAD) as i128),
            -((200 * WAD) as i128),
        )
        .unwrap();
    assert_eq!(ledger.global_unbacked_debt, Rad::from_whole(200));
    assert_eq!(ledger.debt_balance(&accounting), Rad::from_whole(200));

    // the user still holds the drawn coins; once the accounting engine
    // collects them it can burn both sides
    ledger
        .transfer_internal_coins(user, user, accounting, Rad::from_whole(200))
        .unwrap();
    ledger.settle_debt(accounting, Rad::from_whole(200)).unwrap();

    assert_eq!(ledger.global_debt, Rad::ZERO);
    assert_eq!(ledger.global_unbacked_debt, Rad::ZERO);
    assert_eq!(ledger.debt_balance(&accounting), Rad::ZERO);
}

#[test]
fn test_safety_tracks_price_updates() {
    let (mut ledger, authority, collateral) = ledger_with_collateral();
    let user = Pubkey::new_unique();

    ledger
        .adjust_collateral_balance(authority, collateral, user, (100 * WAD) as i128)
        .unwrap();
    ledger
        .modify_position_collateralization(
            user,
            collateral,
            user,
            user,
            user,
            (100 * WAD) as i128,
            (150 * WAD) as i128,
        )
        .unwrap();

    // the price source marks collateral down; existing debt stands, but any
    // further risk increase is rejected
    ledger
        .modify_collateral_parameters(authority, collateral, "safety_price", ParamValue::Ray(RAY))
        .unwrap();
    assert_eq!(
        ledger.modify_position_collateralization(
            user,
            collateral,
            user,
            user,
            user,
            0,
            (1 * WAD) as i128,
        ),
        Err(CdpEngineError::PositionNotSafe.into())
    );
    // withdrawing collateral is also a risk increase
    assert_eq!(
        ledger.modify_position_collateralization(
            user,
            collateral,
            user,
            user,
            user,
            -((1 * WAD) as i128),
            0,
        ),
        Err(CdpEngineError::PositionNotSafe.into())
    );
    // repayment stays open
    ledger
        .modify_position_collateralization(
            user,
            collateral,
            user,
            user,
            user,
            0,
            -((140 * WAD) as i128),
        )
        .unwrap();
}

proptest! {
    #[test]
    fn prop_create_then_settle_round_trips(raw in 0u128..=u128::MAX) {
        let authority = Pubkey::new_unique();
        let keeper = Pubkey::new_unique();
        let mut ledger = Ledger::new(authority);
        let amount = Rad::from_raw(U256::from_u128(raw));

        ledger.create_unbacked_debt(authority, keeper, keeper, amount).unwrap();
        prop_assert_eq!(ledger.global_debt, amount);
        prop_assert_eq!(ledger.global_unbacked_debt, amount);
        prop_assert_eq!(ledger.coin_balance(&keeper), amount);
        prop_assert_eq!(ledger.debt_balance(&keeper), amount);

        ledger.settle_debt(keeper, amount).unwrap();
        prop_assert_eq!(ledger.global_debt, Rad::ZERO);
        prop_assert_eq!(ledger.global_unbacked_debt, Rad::ZERO);
        prop_assert_eq!(ledger.coin_balance(&keeper), Rad::ZERO);
        prop_assert_eq!(ledger.debt_balance(&keeper), Rad::ZERO);
    }

    #[test]
    fn prop_settle_decrements_exactly(total in 0u64..=1_000_000, part in 0u64..=1_000_000) {
        prop_assume!(part <= total);
        let authority = Pubkey::new_unique();
        let keeper = Pubkey::new_unique();
        let mut ledger = Ledger::new(authority);
        ledger
            .create_unbacked_debt(authority, keeper, keeper, Rad::from_whole(total))
            .unwrap();

        ledger.settle_debt(keeper, Rad::from_whole(part)).unwrap();
        let left = Rad::from_whole(total).checked_sub(Rad::from_whole(part)).unwrap();
        prop_assert_eq!(ledger.global_debt, left);
        prop_assert_eq!(ledger.global_unbacked_debt, left);
        prop_assert_eq!(ledger.coin_balance(&keeper), left);
        prop_assert_eq!(ledger.debt_balance(&keeper), left);
    }

    #[test]
    fn prop_settle_fails_without_balance(total in 0u64..1_000_000, excess in 1u64..=1_000_000) {
        let authority = Pubkey::new_unique();
        let keeper = Pubkey::new_unique();
        let mut ledger = Ledger::new(authority);
        ledger
            .create_unbacked_debt(authority, keeper, keeper, Rad::from_whole(total))
            .unwrap();

        let too_much = Rad::from_whole(total + excess);
        prop_assert_eq!(
            ledger.settle_debt(keeper, too_much),
            Err(CdpEngineError::ArithmeticUnderflow.into())
        );
        // nothing changed
        prop_assert_eq!(ledger.global_debt, Rad::from_whole(total));
        prop_assert_eq!(ledger.coin_balance(&keeper), Rad::from_whole(total));
    }

    #[test]
    fn prop_committed_positions_stay_safe(
        locked in 1u64..=1_000,
        drawn in 1u64..=4_000,
        price_units in 1u64..=3,
    ) {
        let (mut ledger, authority, collateral) = ledger_with_collateral();
        let user = Pubkey::new_unique();
        let price = price_units as u128 * RAY;
        ledger
            .modify_collateral_parameters(
                authority, collateral, "safety_price", ParamValue::Ray(price),
            )
            .unwrap();
        ledger
            .adjust_collateral_balance(
                authority, collateral, user, (locked as u128 * WAD) as i128,
            )
            .unwrap();

        let result = ledger.modify_position_collateralization(
            user,
            collateral,
            user,
            user,
            user,
            (locked as u128 * WAD) as i128,
            (drawn as u128 * WAD) as i128,
        );

        let record = ledger.collateral_type(&collateral);
        let position = ledger.position(&collateral, &user);
        if result.is_ok() {
            // risk-increasing change committed: the safety bound held
            let debt = ray_mul_wad(record.accumulated_rate, position.generated_debt);
            let value = ray_mul_wad(record.safety_price, position.locked_collateral);
            prop_assert!(debt <= value);
            // and the dust floor held
            prop_assert!(debt >= record.debt_floor);
        } else {
            // rejected calls leave no trace
            prop_assert_eq!(position, Position::default());
            prop_assert_eq!(ledger.global_debt, Rad::ZERO);
        }
    }
}

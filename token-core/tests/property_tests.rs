//! Property-based tests for token invariants
//!
//! These tests use proptest to verify critical invariants:
//! - Supply conservation: Σ(balances) == total_supply after any call sequence
//! - Atomicity: a rejected call changes neither state nor the event log
//! - Access control: privileged calls from other accounts always fail
//! - Sale pricing: paying `price * k` inside the window mints exactly `k`

use proptest::prelude::*;
use token_core::{
    spawn_token_actor, AccountId, Balance, Call, CallContext, Error, FeatureFlags, MemoryStore,
    Token, TokenInit,
};

const ACCOUNTS: usize = 4;

fn account(index: usize) -> AccountId {
    AccountId::from_uri(&format!("//Account{}", index))
}

fn owner() -> AccountId {
    account(0)
}

/// Strategy for picking one of the test accounts
fn account_strategy() -> impl Strategy<Value = AccountId> {
    (0..ACCOUNTS).prop_map(account)
}

/// Strategy for generating amounts, biased toward small values so that
/// transfers succeed as often as they fail
fn amount_strategy() -> impl Strategy<Value = Balance> {
    prop_oneof![
        4 => 0u128..1_000,
        1 => 1_000u128..1_000_000,
        1 => Just(Balance::MAX),
    ]
}

/// Strategy for generating a caller and a mutating call
fn call_strategy() -> impl Strategy<Value = (AccountId, Call)> {
    let call = prop_oneof![
        (account_strategy(), amount_strategy()).prop_map(|(to, value)| Call::Transfer {
            to,
            value,
            data: Vec::new(),
        }),
        (account_strategy(), account_strategy(), amount_strategy()).prop_map(
            |(from, to, value)| Call::TransferFrom {
                from,
                to,
                value,
                data: Vec::new(),
            }
        ),
        (account_strategy(), amount_strategy())
            .prop_map(|(spender, value)| Call::Approve { spender, value }),
        (account_strategy(), amount_strategy())
            .prop_map(|(spender, delta)| Call::IncreaseAllowance { spender, delta }),
        (account_strategy(), amount_strategy())
            .prop_map(|(spender, delta)| Call::DecreaseAllowance { spender, delta }),
        (account_strategy(), amount_strategy())
            .prop_map(|(account, amount)| Call::MintTo { account, amount }),
        amount_strategy().prop_map(|amount| Call::Burn { amount }),
        Just(Call::ChangeState),
        Just(Call::Buy),
        Just(Call::WithdrawProceeds),
    ];
    (account_strategy(), call)
}

/// Deploy a fully featured token with an open sale
fn create_test_token(initial_supply: Balance) -> Token<MemoryStore> {
    let init = TokenInit::new(initial_supply, FeatureFlags::all().with_sale(true))
        .with_name("Prop")
        .with_symbol("PRP")
        .with_decimals(18);
    let mut token = Token::deploy(MemoryStore::new(), &CallContext::new(owner(), 0), init).unwrap();
    token
        .set_sale_options(&CallContext::new(owner(), 0), 3, 10_000_000, 0, 1_000)
        .unwrap();
    token
}

/// Everything a call can observably change
#[derive(Debug, PartialEq, Eq)]
struct Snapshot {
    balances: Vec<Balance>,
    allowances: Vec<Balance>,
    total_supply: Balance,
    paused: bool,
    proceeds: Balance,
    events: usize,
}

fn snapshot(token: &Token<MemoryStore>) -> Snapshot {
    let accounts: Vec<AccountId> = (0..ACCOUNTS).map(account).collect();
    let mut allowances = Vec::new();
    for holder in &accounts {
        for spender in &accounts {
            allowances.push(token.allowance(holder, spender).unwrap());
        }
    }

    Snapshot {
        balances: accounts
            .iter()
            .map(|a| token.balance_of(a).unwrap())
            .collect(),
        allowances,
        total_supply: token.total_supply().unwrap(),
        paused: token.is_paused().unwrap(),
        proceeds: token.sale_proceeds().unwrap(),
        events: token.events().unwrap().len(),
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Property: supply is conserved and rejected calls change nothing
    #[test]
    fn prop_random_calls_conserve_supply(
        initial_supply in 0u128..1_000_000,
        calls in prop::collection::vec(call_strategy(), 1..40),
        timestamps in prop::collection::vec(0u64..2_000, 40),
        values in prop::collection::vec(0u128..10_000, 40),
    ) {
        let mut token = create_test_token(initial_supply);

        for (i, (caller, call)) in calls.into_iter().enumerate() {
            let ctx = CallContext::new(caller, timestamps[i]).with_value(values[i]);
            let before = snapshot(&token);

            let result = token.execute(&ctx, call);

            let after = snapshot(&token);
            if result.is_err() {
                prop_assert_eq!(before, after);
            } else {
                prop_assert!(after.events > before.events);
            }
            prop_assert!(token.check_supply_conservation().unwrap());
        }
    }

    /// Property: transferring more than the balance fails without side effects
    #[test]
    fn prop_over_transfer_rejected(
        balance in 0u128..1_000_000_000_000,
        excess in 1u128..1_000_000,
    ) {
        let mut token = create_test_token(balance);
        let before = snapshot(&token);

        let result = token.transfer(
            &CallContext::new(owner(), 1),
            account(1),
            balance + excess,
            Vec::new(),
        );

        prop_assert!(matches!(result, Err(Error::InsufficientBalance)));
        prop_assert_eq!(before, snapshot(&token));
    }

    /// Property: transfer moves exactly the value between two accounts
    #[test]
    fn prop_transfer_moves_value(
        balance in 1u128..1_000_000_000_000,
        fraction in 0u128..=100,
    ) {
        let mut token = create_test_token(balance);
        let value = balance * fraction / 100;

        token
            .transfer(&CallContext::new(owner(), 1), account(1), value, Vec::new())
            .unwrap();

        prop_assert_eq!(token.balance_of(&owner()).unwrap(), balance - value);
        prop_assert_eq!(token.balance_of(&account(1)).unwrap(), value);
        prop_assert_eq!(token.total_supply().unwrap(), balance);
    }

    /// Property: only the owner can mint, pause or configure the sale
    #[test]
    fn prop_non_owner_privileged_calls_rejected(
        index in 1usize..ACCOUNTS,
        amount in 0u128..1_000_000,
    ) {
        let mut token = create_test_token(1_000);
        let ctx = CallContext::new(account(index), 1);
        let before = snapshot(&token);

        prop_assert!(matches!(
            token.mint_to(&ctx, account(index), amount),
            Err(Error::Unauthorized)
        ));
        prop_assert!(matches!(token.pause(&ctx), Err(Error::Unauthorized)));
        prop_assert!(matches!(token.change_state(&ctx), Err(Error::Unauthorized)));
        prop_assert!(matches!(
            token.set_sale_options(&ctx, 1, amount, 0, 10),
            Err(Error::Unauthorized)
        ));
        prop_assert!(matches!(token.withdraw_proceeds(&ctx), Err(Error::Unauthorized)));

        prop_assert_eq!(before, snapshot(&token));
    }

    /// Property: burning more than the balance leaves supply unchanged
    #[test]
    fn prop_over_burn_rejected(
        balance in 0u128..1_000_000_000,
        excess in 1u128..1_000_000,
    ) {
        let mut token = create_test_token(balance);

        let result = token.burn(&CallContext::new(owner(), 1), balance + excess);

        prop_assert!(matches!(result, Err(Error::InsufficientBalance)));
        prop_assert_eq!(token.total_supply().unwrap(), balance);
        prop_assert_eq!(token.balance_of(&owner()).unwrap(), balance);
    }

    /// Property: paying `price * k` inside the window mints exactly `k`
    #[test]
    fn prop_buy_mints_value_over_price(
        price in 1u128..1_000_000,
        k in 1u128..1_000_000,
        remainder_fraction in 0u128..100,
        at in 0u64..1_000,
    ) {
        let mut token = create_test_token(0);
        token
            .set_sale_options(&CallContext::new(owner(), 0), price, Balance::MAX, 0, 1_000)
            .unwrap();
        let remainder = (price - 1) * remainder_fraction / 100;
        let paid = price * k + remainder;
        let buyer = account(2);

        let bought = token
            .buy(&CallContext::new(buyer, at).with_value(paid))
            .unwrap();

        prop_assert_eq!(bought, k);
        prop_assert_eq!(token.balance_of(&buyer).unwrap(), k);
        prop_assert_eq!(token.total_supply().unwrap(), k);
        prop_assert_eq!(token.sale_proceeds().unwrap(), paid);
    }

    /// Property: buying outside `[start_at, end_at)` always fails
    #[test]
    fn prop_buy_outside_window_rejected(
        start_at in 1u64..1_000_000,
        length in 1u64..1_000_000,
        before_start in any::<bool>(),
        offset in 0u64..1_000,
    ) {
        let mut token = create_test_token(0);
        let end_at = start_at + length;
        token
            .set_sale_options(&CallContext::new(owner(), 0), 1, Balance::MAX, start_at, end_at)
            .unwrap();
        let at = if before_start {
            start_at.saturating_sub(offset + 1)
        } else {
            end_at + offset
        };

        let result = token.buy(&CallContext::new(account(1), at).with_value(100));

        prop_assert!(matches!(result, Err(Error::SaleNotActive)));
        prop_assert_eq!(token.total_supply().unwrap(), 0);
        prop_assert_eq!(token.sale_proceeds().unwrap(), 0);
    }

    /// Property: sale minting never pushes supply past the cap
    #[test]
    fn prop_buy_respects_cap(
        initial_supply in 0u128..1_000,
        headroom in 0u128..1_000,
        purchases in prop::collection::vec(1u128..200, 1..20),
    ) {
        let mut token = create_test_token(initial_supply);
        let cap = initial_supply + headroom;
        token
            .set_sale_options(&CallContext::new(owner(), 0), 1, cap, 0, 1_000)
            .unwrap();

        for (i, value) in purchases.into_iter().enumerate() {
            let before = token.total_supply().unwrap();
            let result = token.buy(&CallContext::new(account(i % ACCOUNTS), 10).with_value(value));
            if before + value > cap {
                prop_assert!(matches!(result, Err(Error::SaleCapExceeded)));
            } else {
                prop_assert_eq!(result.unwrap(), value);
            }
            prop_assert!(token.total_supply().unwrap() <= cap);
        }
    }

    /// Property: while paused, balance-changing calls fail and change nothing
    #[test]
    fn prop_pause_blocks_balance_changes(
        value in 1u128..1_000,
        index in 1usize..ACCOUNTS,
    ) {
        let mut token = create_test_token(10_000);
        let owner_ctx = CallContext::new(owner(), 1);
        let spender_ctx = CallContext::new(account(index), 1);
        token.approve(&owner_ctx, account(index), value).unwrap();
        token.pause(&owner_ctx).unwrap();
        let before = snapshot(&token);

        prop_assert!(matches!(
            token.transfer(&owner_ctx, account(index), value, Vec::new()),
            Err(Error::Paused)
        ));
        prop_assert!(matches!(token.mint_to(&owner_ctx, account(index), value), Err(Error::Paused)));
        prop_assert!(matches!(token.burn(&owner_ctx, value), Err(Error::Paused)));
        prop_assert!(matches!(
            token.transfer_from(&spender_ctx, owner(), account(index), value, Vec::new()),
            Err(Error::Paused)
        ));
        prop_assert!(matches!(
            token.buy(&CallContext::new(account(index), 10).with_value(value * 3)),
            Err(Error::Paused)
        ));
        prop_assert_eq!(before, snapshot(&token));

        prop_assert_eq!(token.allowance(&owner(), &account(index)).unwrap(), value);

        token.unpause(&owner_ctx).unwrap();
        prop_assert!(token
            .transfer(&owner_ctx, account(index), value, Vec::new())
            .is_ok());
        prop_assert!(token
            .transfer_from(&spender_ctx, owner(), account(index), value, Vec::new())
            .is_ok());
        prop_assert_eq!(token.allowance(&owner(), &account(index)).unwrap(), 0);
    }

    /// Property: allowances are spent exactly and never exceeded
    #[test]
    fn prop_transfer_from_spends_allowance(
        allowance in 0u128..10_000,
        value in 0u128..20_000,
    ) {
        let mut token = create_test_token(100_000);
        let spender = account(1);
        token
            .approve(&CallContext::new(owner(), 1), spender, allowance)
            .unwrap();

        let result = token.transfer_from(
            &CallContext::new(spender, 2),
            owner(),
            account(2),
            value,
            Vec::new(),
        );

        if value <= allowance {
            prop_assert!(result.is_ok());
            prop_assert_eq!(token.allowance(&owner(), &spender).unwrap(), allowance - value);
            prop_assert_eq!(token.balance_of(&account(2)).unwrap(), value);
        } else {
            prop_assert!(matches!(result, Err(Error::InsufficientAllowance)));
            prop_assert_eq!(token.allowance(&owner(), &spender).unwrap(), allowance);
            prop_assert_eq!(token.balance_of(&account(2)).unwrap(), 0);
        }
    }

    /// Property: concurrent transfers through the actor conserve supply
    #[test]
    fn prop_actor_serializes_transfers(
        transfers in prop::collection::vec((account_strategy(), account_strategy(), 0u128..500), 1..30),
    ) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let token = create_test_token(0);
            let (handle, join) = spawn_token_actor(token, 8);

            for i in 0..ACCOUNTS {
                handle
                    .execute(
                        CallContext::new(owner(), 1),
                        Call::MintTo { account: account(i), amount: 1_000 },
                    )
                    .await
                    .unwrap();
            }

            let mut tasks = Vec::new();
            for (from, to, value) in transfers {
                let handle = handle.clone();
                tasks.push(tokio::spawn(async move {
                    handle.transfer(CallContext::new(from, 2), to, value).await
                }));
            }
            for task in tasks {
                let _ = task.await.unwrap();
            }

            prop_assert_eq!(handle.total_supply().await.unwrap(), 1_000 * ACCOUNTS as u128);

            handle.shutdown().await.unwrap();
            let token = join.await.unwrap();
            prop_assert!(token.check_supply_conservation().unwrap());
            Ok(())
        })?;
    }
}

//! Built-in tables against the schema rules and solc-derived identifiers

use std::collections::HashSet;

use alloy_sol_types::{sol, SolCall, SolEvent};
use ctoken_abi::domain::abi::{
    validate, AbiRegistry, EntryKind, LookupError, Mutability, ValidationIssue,
};
use ctoken_abi::tables;

sol! {
    interface CErc20 {
        event Transfer(address indexed from, address indexed to, uint256 amount);
        event Mint(address minter, uint256 mintAmount, uint256 mintTokens);
        event Redeem(address redeemer, uint256 redeemAmount, uint256 redeemTokens);
        event Failure(uint256 err, uint256 info, uint256 detail);

        function mint(uint256 mintAmount) external returns (uint256);
        function redeem(uint256 redeemTokens) external returns (uint256);
        function liquidateBorrow(address borrower, uint256 repayAmount, address cTokenCollateral) external returns (uint256);
        function exchangeRateStored() external view returns (uint256);
        function supplyRatePerBlock() external view returns (uint256);
        function underlying() external view returns (address);
        function getAccountSnapshot(address account) external view returns (uint256, uint256, uint256, uint256);
    }

    interface CEther {
        function mint() external payable;
        function repayBorrow() external payable;
        function repayBorrowBehalf(address borrower) external payable;
        function liquidateBorrow(address borrower, address cTokenCollateral) external payable;
    }

    interface Comptroller {
        function claimComp(address holder) external;
        function claimComp(address holder, address[] cTokens) external;
        function enterMarkets(address[] cTokens) external returns (uint256[]);
        function getAllMarkets() external view returns (address[]);
    }
}

#[test]
fn test_builtin_tables_validate_clean() {
    for table in tables::all() {
        let report = validate(table);
        println!("{}: {} entries, {} issues", report.table, report.entries, report.issues.len());
        for issue in &report.issues {
            println!("  {}", issue);
        }
        assert!(!table.is_empty(), "{} should not be empty", table.name());
        assert!(report.is_clean(), "{} should validate clean", table.name());
    }
}

#[test]
fn test_every_param_has_a_type() {
    for table in tables::all() {
        for entry in table.entries() {
            for param in entry.inputs.iter().chain(&entry.outputs) {
                assert!(
                    !param.kind.trim().is_empty(),
                    "{}.{} has an untyped parameter",
                    table.name(),
                    entry.describe()
                );
            }
        }
    }
}

#[test]
fn test_selectors_match_solidity() {
    let cerc20 = tables::cerc20();
    let selector = |name: &str| cerc20.function(name).unwrap().selector().unwrap();

    assert_eq!(selector("mint"), CErc20::mintCall::SELECTOR);
    assert_eq!(selector("redeem"), CErc20::redeemCall::SELECTOR);
    assert_eq!(selector("liquidateBorrow"), CErc20::liquidateBorrowCall::SELECTOR);
    assert_eq!(selector("exchangeRateStored"), CErc20::exchangeRateStoredCall::SELECTOR);
    assert_eq!(selector("supplyRatePerBlock"), CErc20::supplyRatePerBlockCall::SELECTOR);
    assert_eq!(selector("underlying"), CErc20::underlyingCall::SELECTOR);
    assert_eq!(selector("getAccountSnapshot"), CErc20::getAccountSnapshotCall::SELECTOR);

    let ceth = tables::ceth();
    let selector = |name: &str| ceth.function(name).unwrap().selector().unwrap();
    assert_eq!(selector("mint"), CEther::mintCall::SELECTOR);
    assert_eq!(selector("repayBorrow"), CEther::repayBorrowCall::SELECTOR);
    assert_eq!(selector("repayBorrowBehalf"), CEther::repayBorrowBehalfCall::SELECTOR);
    assert_eq!(selector("liquidateBorrow"), CEther::liquidateBorrowCall::SELECTOR);

    let comptroller = tables::comptroller();
    let selector = |key: &str| comptroller.function(key).unwrap().selector().unwrap();
    assert_eq!(selector("claimComp(address)"), Comptroller::claimComp_0Call::SELECTOR);
    assert_eq!(
        selector("claimComp(address,address[])"),
        Comptroller::claimComp_1Call::SELECTOR
    );
    assert_eq!(selector("enterMarkets"), Comptroller::enterMarketsCall::SELECTOR);
    assert_eq!(selector("getAllMarkets"), Comptroller::getAllMarketsCall::SELECTOR);
}

#[test]
fn test_topics_match_solidity() {
    let cerc20 = tables::cerc20();
    let topic = |name: &str| cerc20.event(name).unwrap().topic().unwrap();

    assert_eq!(topic("Transfer"), CErc20::Transfer::SIGNATURE_HASH);
    assert_eq!(topic("Mint"), CErc20::Mint::SIGNATURE_HASH);
    assert_eq!(topic("Redeem"), CErc20::Redeem::SIGNATURE_HASH);
    assert_eq!(topic("Failure"), CErc20::Failure::SIGNATURE_HASH);

    // ICETH declares no identifiers, derived ones must still agree
    assert_eq!(
        tables::ceth().event("Mint").unwrap().topic().unwrap(),
        CErc20::Mint::SIGNATURE_HASH
    );
}

#[test]
fn test_declared_identifiers_agree_with_derived() {
    for table in tables::all() {
        for entry in table.entries() {
            let declared = entry.declared_identifier().unwrap();
            if let Some(declared) = declared {
                assert_eq!(
                    Some(declared),
                    entry.derived_identifier(),
                    "{}.{}",
                    table.name(),
                    entry.describe()
                );
            }
        }
    }
}

#[test]
fn test_json_abi_conversion_keeps_selectors() {
    for table in tables::all() {
        let abi = table.to_json_abi().expect("table converts to JsonAbi");

        let ours: HashSet<[u8; 4]> = table.selectors().map(|(selector, _)| selector).collect();
        let theirs: HashSet<[u8; 4]> = abi.functions().map(|f| f.selector().0).collect();
        assert_eq!(ours, theirs, "{}", table.name());

        for event in abi.events() {
            assert!(
                table.event_by_topic(event.selector()).is_some(),
                "{}: {} missing from topic index",
                table.name(),
                event.name
            );
        }
    }
}

#[test]
fn test_claim_comp_overload_reported() {
    let comptroller = tables::comptroller();
    let report = validate(comptroller);

    assert!(report.is_clean());
    assert_eq!(
        report.overloads.get("claimComp").cloned(),
        Some(vec![
            "claimComp(address)".to_string(),
            "claimComp(address,address[])".to_string(),
        ])
    );

    match comptroller.function("claimComp") {
        Err(LookupError::Ambiguous { candidates, .. }) => assert_eq!(candidates.len(), 2),
        other => panic!("expected ambiguous lookup, got {:?}", other.map(|e| e.describe())),
    }
}

#[test]
fn test_ceth_payable_surface() {
    let ceth = tables::ceth();

    for name in ["mint", "repayBorrow", "repayBorrowBehalf", "liquidateBorrow"] {
        let entry = ceth.function(name).unwrap();
        assert_eq!(entry.mutability(), Some(Mutability::Payable), "{}", name);
        assert!(entry.outputs.is_empty(), "{} returns nothing", name);
    }

    let fallback = ceth.fallback().expect("ICETH has a fallback");
    assert_eq!(fallback.mutability(), Some(Mutability::Payable));
    assert_eq!(ceth.constructor().map(|c| c.inputs.len()), Some(7));

    // ICERC20 returns error codes instead
    let mint = tables::cerc20().function("mint").unwrap();
    assert_eq!(mint.mutability(), Some(Mutability::NonPayable));
    assert_eq!(mint.outputs.len(), 1);
}

#[test]
fn test_builtin_registry_has_no_collisions() {
    let registry = AbiRegistry::builtin();
    println!("{}", registry.summary());

    assert_eq!(registry.tables().len(), 4);
    assert!(registry.collisions.is_empty(), "{:?}", registry.collisions);

    // Shared selectors resolve to the first table registered
    let transfer = registry.lookup_hex("0xa9059cbb").unwrap();
    assert_eq!(transfer.table.name(), "ICERC20");
    assert_eq!(transfer.entry.kind, EntryKind::Function);

    let ceth_mint = registry.lookup_hex("1249c58b").unwrap();
    assert_eq!(ceth_mint.table.name(), "ICETH");

    let topic = registry
        .lookup_topic_hex("0x4c209b5fc8ad50758f13e2e1088ba56a560dff690a1c6fef26394f4c03821c4f")
        .unwrap();
    assert_eq!(topic.entry.describe(), "event Mint(address,uint256,uint256)");
}

#[test]
fn test_malformed_table_is_reported() {
    let text = r#"[
        {"type": "function", "name": "", "inputs": [], "outputs": []},
        {"type": "function", "name": "ping", "inputs": [{"name": "x", "type": "uint7"}], "outputs": []},
        {"type": "function", "name": "pong", "inputs": [], "outputs": [], "signature": "0xdeadbeef"}
    ]"#;
    let table = ctoken_abi::domain::abi::AbiTable::from_json(
        "Broken",
        ctoken_abi::domain::abi::TableSource::Builtin,
        text,
    )
    .unwrap();
    let report = validate(&table);

    assert!(report
        .issues
        .iter()
        .any(|issue| matches!(issue, ValidationIssue::MissingName { .. })));
    assert!(report
        .issues
        .iter()
        .any(|issue| matches!(issue, ValidationIssue::UnknownType { .. })));
    assert!(report
        .issues
        .iter()
        .any(|issue| matches!(issue, ValidationIssue::IdentifierMismatch { .. })));
}

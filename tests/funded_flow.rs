//! Funded distributor: pre-funding, debt accounting and persistence.

use anyhow::Result;

use rewardcraft_core::{Address, DistributorConfig, PayoutMode, Role, RootProposal};
use rewardcraft_distributor::{DistributorError, MemoryToken, MerkleDistributor, RoleRegistry, Token};
use rewardcraft_publisher::Publisher;
use rewardcraft_tree::BalanceTree;

const ADMIN: Address = [0xAD; 32];
const TREASURY: Address = [0x7E; 32];
const CONTRACT: Address = [0xDD; 32];
const U1: Address = [0x01; 32];
const U2: Address = [0x02; 32];
const ALICE: Address = [0x11; 32];
const BOB: Address = [0x12; 32];

type Distributor = MerkleDistributor<MemoryToken, RoleRegistry>;

fn registry() -> Result<RoleRegistry> {
    let mut registry = RoleRegistry::new(ADMIN);
    registry.grant_role(&ADMIN, Role::Updater, U1)?;
    registry.grant_role(&ADMIN, Role::Updater, U2)?;
    Ok(registry)
}

fn deploy(threshold: usize, treasury: u128) -> Result<Distributor> {
    let mut token = MemoryToken::with_minter(TREASURY);
    token.mint(&TREASURY, &TREASURY, treasury)?;
    let config = DistributorConfig::new(CONTRACT, ADMIN)
        .with_threshold(threshold)
        .with_payout(PayoutMode::Funded);
    Ok(MerkleDistributor::new(config, token, registry()?)?)
}

fn deposit(d: &mut Distributor, amount: u128) -> Result<()> {
    d.token_mut().transfer(&TREASURY, &CONTRACT, amount)?;
    Ok(())
}

#[test]
fn test_must_fully_prefund() -> Result<()> {
    rewardcraft_logging::init_test_logging();

    let tree = BalanceTree::new(&[(ALICE, 70), (BOB, 30)])?;
    let proposal = RootProposal::funded(tree.root(), "uri", 1, 100);

    for funding in [0u128, 80] {
        let mut d = deploy(1, 1_000)?;
        deposit(&mut d, funding)?;
        let err = d.propose_root(&U1, proposal.clone()).unwrap_err();
        assert_eq!(err.to_string(), "Distribution would leave contract underfunded");
        assert_eq!(d.distribution_count(), 0);
        assert_eq!(d.debt_total(), 0);
        assert_eq!(d.receipts().total_supply(), 0);
    }

    let mut d = deploy(1, 1_000)?;
    deposit(&mut d, 101)?;
    d.propose_root(&U1, proposal)?;
    assert_eq!(d.debt_total(), 100);
    assert_eq!(d.balance(), 1);
    Ok(())
}

#[test]
fn test_deposits_and_claims_across_epochs() -> Result<()> {
    rewardcraft_logging::init_test_logging();

    let mut d = deploy(2, 1_000)?;
    let mut publisher = Publisher::new();

    deposit(&mut d, 100)?;
    let dist = publisher.publish(&[(ALICE, 70), (BOB, 30)], 1)?;
    d.propose_root(&U1, dist.proposal())?;
    d.propose_root(&U2, dist.proposal())?;
    assert_eq!(d.debt_total(), 100);
    assert_eq!(d.balance(), 0);

    let (leaf, proof) = dist.proof_for(&ALICE).expect("alice in table");
    assert_eq!(d.claim(&ALICE, leaf.index, &ALICE, leaf.amount, &proof.siblings)?, 70);
    assert_eq!(d.debt_total(), 30);
    assert_eq!(d.token_balance(), 30);
    assert_eq!(d.token().balance_of(&ALICE), 70);

    // Epoch 2 promises 50 more; nothing is free until the next deposit
    let dist = publisher.publish(&[(ALICE, 100), (BOB, 50)], 2)?;
    d.propose_root(&U1, dist.proposal())?;
    assert!(matches!(
        d.propose_root(&U2, dist.proposal()),
        Err(DistributorError::Underfunded { required: 50, available: 0 })
    ));
    assert_eq!(d.pending_proposals().len(), 1);

    deposit(&mut d, 60)?;
    assert_eq!(d.balance(), 60);
    d.propose_root(&U2, dist.proposal())?;
    assert_eq!(d.distribution_total(), 150);
    assert_eq!(d.debt_total(), 80);
    assert_eq!(d.balance(), 10);

    for account in [ALICE, BOB] {
        let (leaf, proof) = dist.proof_for(&account).expect("account in table");
        d.claim(&account, leaf.index, &account, leaf.amount, &proof.siblings)?;
    }
    assert_eq!(d.token().balance_of(&ALICE), 100);
    assert_eq!(d.token().balance_of(&BOB), 50);
    assert_eq!(d.debt_total(), 0);
    assert_eq!(d.token_balance(), 10);
    Ok(())
}

#[test]
fn test_snapshot_resume_mid_epoch() -> Result<()> {
    rewardcraft_logging::init_test_logging();

    let dir = std::env::temp_dir().join("rewardcraft-flow-snapshot");
    let _ = std::fs::create_dir_all(&dir);
    let path = dir.join("distributor.json");
    let _ = std::fs::remove_file(&path);

    let mut d = deploy(2, 1_000)?;
    let mut publisher = Publisher::new();
    deposit(&mut d, 500)?;

    let first = publisher.publish(&[(ALICE, 70), (BOB, 30)], 1)?;
    d.propose_root(&U1, first.proposal())?;
    d.propose_root(&U2, first.proposal())?;
    let (leaf, proof) = first.proof_for(&BOB).expect("bob in table");
    d.claim(&BOB, leaf.index, &BOB, leaf.amount, &proof.siblings)?;

    // One vote cast for epoch 2 before the restart
    let second = publisher.publish(&[(ALICE, 90)], 2)?;
    d.propose_root(&U1, second.proposal())?;
    d.save_to_file(&path)?;

    let token = d.token().clone();
    let mut resumed = MerkleDistributor::load_from_file(&path, token, registry()?)?;
    assert_eq!(resumed.pending_proposals().len(), 1);
    assert!(matches!(
        resumed.propose_root(&U1, second.proposal()),
        Err(DistributorError::AlreadySubmitted)
    ));

    resumed.propose_root(&U2, second.proposal())?;
    assert_eq!(resumed.distribution_count(), 2);
    assert_eq!(resumed.debt_total(), 70 + 20);

    let (leaf, proof) = second.proof_for(&ALICE).expect("alice in table");
    assert_eq!(resumed.claim(&ALICE, leaf.index, &ALICE, leaf.amount, &proof.siblings)?, 90);
    let (leaf, proof) = second.proof_for(&BOB).expect("bob carried forward");
    assert!(matches!(
        resumed.claim(&BOB, leaf.index, &BOB, leaf.amount, &proof.siblings),
        Err(DistributorError::NothingClaimable)
    ));

    let _ = std::fs::remove_file(&path);
    let _ = std::fs::remove_dir(&dir);
    Ok(())
}

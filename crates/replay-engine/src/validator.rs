//! Final-state validation

use std::collections::BTreeSet;

use replay_primitives::{Address, H256};
use replay_rpc::{BlockId, ClientSession};
use replay_vectors::{PostExpectation, State, TestCase};
use tracing::debug;

use crate::error::{CaseError, CaseResult};

fn opt_hash(hash: Option<H256>) -> String {
    hash.map_or_else(|| "-".to_string(), |h| h.to_hex())
}

/// Check the client's chain head against the case's expectations.
///
/// The head is read fresh from the client. With `exhaustive_state` the client
/// may not hold accounts or nonzero storage slots the expectation omits.
pub async fn validate_final_state(
    session: &ClientSession,
    case: &TestCase,
    exhaustive_state: bool,
) -> CaseResult<()> {
    let rpc = |e| CaseError::session(session.endpoint(), e);

    let number = session.block_number().await.map_err(rpc)?;
    let head = session
        .get_block_by_number(BlockId::Number(number), false)
        .await
        .map_err(rpc)?;
    debug!(number, hash = %head.hash, "validating chain head");

    match &case.post {
        PostExpectation::Hash(expected) => {
            let actual = head.header.hash("stateRoot");
            if actual.as_ref() != Some(expected) {
                return Err(CaseError::mismatch(
                    "post state",
                    "stateRoot",
                    expected.to_hex(),
                    opt_hash(actual),
                ));
            }
        }
        PostExpectation::State(expected) => {
            compare_state(session, expected, BlockId::Number(number), exhaustive_state).await?;
        }
    }

    if head.hash != case.last_block_hash {
        return Err(CaseError::mismatch(
            "chain head",
            "lastblockhash",
            case.last_block_hash.to_hex(),
            head.hash.to_hex(),
        ));
    }

    if !case.genesis_rlp.is_empty() {
        let genesis = session.get_raw_block(BlockId::Number(0)).await.map_err(rpc)?;
        if genesis != case.genesis_rlp {
            return Err(CaseError::mismatch(
                "genesis",
                "genesisRLP",
                case.genesis_rlp.to_hex(),
                genesis.to_hex(),
            ));
        }
    }
    Ok(())
}

async fn compare_state(
    session: &ClientSession,
    expected: &State,
    at: BlockId,
    exhaustive_state: bool,
) -> CaseResult<()> {
    let rpc = |e| CaseError::session(session.endpoint(), e);

    for (address, want) in expected.iter() {
        let got = session.get_account_state(address, at).await.map_err(rpc)?;
        let context = format!("post state {}", address);

        if got.balance != want.balance {
            return Err(CaseError::mismatch(
                context,
                "balance",
                format!("{:#x}", want.balance),
                format!("{:#x}", got.balance),
            ));
        }
        if got.nonce != want.nonce {
            return Err(CaseError::mismatch(
                context,
                "nonce",
                format!("{:#x}", want.nonce),
                format!("{:#x}", got.nonce),
            ));
        }
        if got.code != want.code {
            return Err(CaseError::mismatch(context, "code", want.code.to_hex(), got.code.to_hex()));
        }
        for (key, value) in &want.storage {
            let actual = got.slot(key);
            if actual != *value {
                return Err(CaseError::mismatch(
                    context,
                    format!("storage[{:#x}]", key),
                    format!("{:#x}", value),
                    format!("{:#x}", actual),
                ));
            }
        }
        if exhaustive_state {
            let extra = got
                .storage
                .iter()
                .find(|(key, value)| !value.is_zero() && !want.storage.contains_key(key));
            if let Some((key, value)) = extra {
                return Err(CaseError::mismatch(
                    context,
                    format!("storage[{:#x}]", key),
                    "0x0",
                    format!("{:#x}", value),
                ));
            }
        }
    }

    if exhaustive_state {
        let listed: BTreeSet<&Address> = expected.iter().map(|(a, _)| a).collect();
        let accounts = session.account_range(at).await.map_err(rpc)?;
        if let Some(extra) = accounts.iter().find(|a| !listed.contains(a)) {
            return Err(CaseError::mismatch(
                format!("post state {}", extra),
                "account",
                "absent",
                "present",
            ));
        }
    }
    Ok(())
}

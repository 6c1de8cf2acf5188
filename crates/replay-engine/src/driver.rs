//! Block import driver

use replay_primitives::H256;
use replay_rpc::{ClientSession, RpcError};
use replay_vectors::{BlockCheck, BlockEntry, Environment, ExceptionId, VerifiedBlock};
use tracing::{debug, warn};

use crate::error::{CaseError, CaseResult};
use crate::exceptions::{ExceptionTaxonomy, MatchOutcome};

/// What the import loop left behind
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportSummary {
    /// Hash of the last block the client accepted
    pub last_imported: Option<H256>,
    /// Blocks accepted
    pub imported: usize,
    /// Blocks rejected (expected or tolerated)
    pub rejected: usize,
}

/// Replay `blocks` against the client in order.
///
/// A rejection is checked against the block's own `expectException`, or else
/// the next unused entry of the case-level `exceptions` list. Rejections with
/// nothing expected fail the case unless `allow_invalid` is set. Case-level
/// exceptions still unused after the last block mean a rejection that never
/// happened.
pub async fn run_blocks(
    session: &ClientSession,
    environment: &Environment,
    blocks: &[BlockEntry],
    exceptions: &[ExceptionId],
    taxonomy: &ExceptionTaxonomy,
    allow_invalid: bool,
) -> CaseResult<ImportSummary> {
    debug!(
        family = %environment.family(),
        blocks = blocks.len(),
        expected_rejections = exceptions.len(),
        "importing blocks"
    );

    let mut pending = exceptions.iter();
    let mut summary = ImportSummary::default();

    for entry in blocks {
        match session.import_raw_block(&entry.rlp).await {
            Ok(hash) => {
                if let Some(expected) = &entry.expect_exception {
                    return Err(CaseError::MissingRejection {
                        at: format!("block #{}", entry.index),
                        expected: expected.clone(),
                    });
                }
                debug!(block = entry.index, %hash, "block imported");
                if let BlockCheck::Verified(expected) = &entry.check {
                    verify_block(session, entry.index, &hash, expected).await?;
                }
                summary.last_imported = Some(hash);
                summary.imported += 1;
            }
            Err(RpcError::Rpc { message, .. }) => {
                let expected = entry
                    .expect_exception
                    .as_ref()
                    .or_else(|| pending.next());
                match expected {
                    Some(expected) => check_rejection(taxonomy, entry.index, expected, message)?,
                    None if allow_invalid => {
                        warn!(block = entry.index, %message, "tolerating unexpected rejection");
                    }
                    None => {
                        return Err(CaseError::UnexpectedRejection {
                            block: entry.index,
                            message,
                        })
                    }
                }
                summary.rejected += 1;
            }
            Err(other) => return Err(CaseError::session(session.endpoint(), other)),
        }
    }

    if let Some(expected) = pending.next() {
        return Err(CaseError::MissingRejection {
            at: "end of chain".to_string(),
            expected: expected.clone(),
        });
    }
    Ok(summary)
}

fn check_rejection(
    taxonomy: &ExceptionTaxonomy,
    block: usize,
    expected: &ExceptionId,
    message: String,
) -> CaseResult<()> {
    match taxonomy.classify(expected, &message) {
        MatchOutcome::Matched => {
            debug!(block, %expected, "block rejected as expected");
            Ok(())
        }
        MatchOutcome::Mismatch { pattern } => Err(CaseError::ExceptionMismatch {
            block,
            expected: expected.clone(),
            pattern,
            message,
        }),
        MatchOutcome::Unmapped => Err(CaseError::Unmapped {
            block,
            expected: expected.clone(),
            message,
        }),
    }
}

async fn verify_block(
    session: &ClientSession,
    index: usize,
    hash: &H256,
    expected: &VerifiedBlock,
) -> CaseResult<()> {
    let block = session
        .get_block_by_hash(hash, true)
        .await
        .map_err(|e| CaseError::session(session.endpoint(), e))?;

    let context = format!("block #{} header", index);
    if let Some((field, test, client)) = expected.header.diff(&block.header).into_iter().next() {
        return Err(CaseError::mismatch(context, field, test, client));
    }

    let context = format!("block #{}", index);
    if block.transactions.len() != expected.transactions.len() {
        return Err(CaseError::mismatch(
            context,
            "transaction count",
            expected.transactions.len(),
            block.transactions.len(),
        ));
    }
    for (i, tx_block_hash) in block.transaction_block_hashes().into_iter().enumerate() {
        if tx_block_hash.as_ref() != Some(hash) {
            let actual = tx_block_hash.map_or_else(|| "-".to_string(), |h| h.to_hex());
            return Err(CaseError::mismatch(
                context,
                format!("transactions[{}].blockHash", i),
                hash.to_hex(),
                actual,
            ));
        }
    }
    if block.uncles.len() != expected.uncles.len() {
        return Err(CaseError::mismatch(
            context,
            "uncle count",
            expected.uncles.len(),
            block.uncles.len(),
        ));
    }
    Ok(())
}

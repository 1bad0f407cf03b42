//! Invariant checkers for assembled templates.
//!
//! The assembler runs these as a final self-check before handing a
//! template to the mining loop; tests use them directly.

use crate::config::AssemblyConfig;
use crate::domain::coinbase::block_subsidy;
use crate::domain::template::BlockTemplate;
use crate::error::{AssemblyError, Result};
use quarry_types::TxId;
use std::collections::HashMap;

fn invalid(reason: impl Into<String>) -> AssemblyError {
    AssemblyError::TemplateInvalid {
        reason: reason.into(),
    }
}

/// The template's size stays within the configured maximum.
pub fn check_size(template: &BlockTemplate, config: &AssemblyConfig) -> Result<()> {
    if template.total_size > config.max_block_size {
        return Err(invalid(format!(
            "size {} exceeds maximum {}",
            template.total_size, config.max_block_size
        )));
    }
    Ok(())
}

/// Total sigops (nested counts included) stay within the maximum.
pub fn check_sigops(template: &BlockTemplate, config: &AssemblyConfig) -> Result<()> {
    let total: u32 = template.tx_sigops.iter().sum();
    if total > config.max_sigops {
        return Err(invalid(format!(
            "sigops {} exceed maximum {}",
            total, config.max_sigops
        )));
    }
    Ok(())
}

/// Exactly one reward transaction, and it comes first.
pub fn check_coinbase_position(template: &BlockTemplate) -> Result<()> {
    let transactions = &template.block.transactions;
    match transactions.first() {
        Some(first) if first.is_coinbase() => {}
        _ => return Err(invalid("first transaction is not a reward transaction")),
    }
    if transactions.iter().skip(1).any(|tx| tx.is_coinbase()) {
        return Err(invalid("multiple reward transactions"));
    }
    Ok(())
}

/// Every transaction spending an in-block output appears strictly after
/// its producer.
pub fn check_dependency_order(template: &BlockTemplate) -> Result<()> {
    let positions: HashMap<TxId, usize> = template
        .block
        .transactions
        .iter()
        .enumerate()
        .map(|(index, tx)| (tx.txid(), index))
        .collect();

    for (index, tx) in template.block.transactions.iter().enumerate() {
        for input in &tx.inputs {
            if let Some(&producer) = positions.get(&input.prevout.txid) {
                if producer >= index {
                    return Err(invalid(format!(
                        "transaction at {} spends output of transaction at {}",
                        index, producer
                    )));
                }
            }
        }
    }
    Ok(())
}

/// The reward transaction mints exactly `subsidy(height) + fees`; the
/// mandated shares are paid out of that total, never on top of it.
pub fn check_reward_balance(template: &BlockTemplate, config: &AssemblyConfig) -> Result<()> {
    let Some(coinbase) = template.block.transactions.first() else {
        return Err(invalid("empty template"));
    };
    let expected = block_subsidy(template.height, &config.reward) + template.total_fees;
    let minted = coinbase.value_out();
    if minted != expected {
        return Err(invalid(format!(
            "reward transaction mints {} but subsidy + fees is {}",
            minted, expected
        )));
    }
    Ok(())
}

/// Runs every invariant check.
pub fn validate_template(template: &BlockTemplate, config: &AssemblyConfig) -> Result<()> {
    check_size(template, config)?;
    check_sigops(template, config)?;
    check_coinbase_position(template)?;
    check_dependency_order(template)?;
    check_reward_balance(template, config)?;
    Ok(())
}

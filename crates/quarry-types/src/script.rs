//! Minimal script scanning.
//!
//! The engine never executes scripts (full script validation is the
//! ledger collaborator's job) but it must count signature operations for
//! the per-block sigop bound, both the legacy count and the
//! pay-to-script-hash-adjusted count.

/// `OP_0`.
pub const OP_0: u8 = 0x00;
/// `OP_PUSHDATA1`.
pub const OP_PUSHDATA1: u8 = 0x4c;
/// `OP_PUSHDATA2`.
pub const OP_PUSHDATA2: u8 = 0x4d;
/// `OP_PUSHDATA4`.
pub const OP_PUSHDATA4: u8 = 0x4e;
/// `OP_1` (smallest counted multisig key count).
pub const OP_1: u8 = 0x51;
/// `OP_16` (largest counted multisig key count).
pub const OP_16: u8 = 0x60;
/// `OP_DUP`.
pub const OP_DUP: u8 = 0x76;
/// `OP_EQUAL`.
pub const OP_EQUAL: u8 = 0x87;
/// `OP_EQUALVERIFY`.
pub const OP_EQUALVERIFY: u8 = 0x88;
/// `OP_HASH160`.
pub const OP_HASH160: u8 = 0xa9;
/// `OP_CHECKSIG`.
pub const OP_CHECKSIG: u8 = 0xac;
/// `OP_CHECKSIGVERIFY`.
pub const OP_CHECKSIGVERIFY: u8 = 0xad;
/// `OP_CHECKMULTISIG`.
pub const OP_CHECKMULTISIG: u8 = 0xae;
/// `OP_CHECKMULTISIGVERIFY`.
pub const OP_CHECKMULTISIGVERIFY: u8 = 0xaf;

/// Sigop weight charged for a multisig whose key count is unknown.
pub const MAX_PUBKEYS_PER_MULTISIG: u32 = 20;

/// One decoded script element: an opcode, optionally carrying pushed data.
struct Op<'a> {
    opcode: u8,
    data: Option<&'a [u8]>,
}

/// Iterates opcodes, resolving pushdata lengths. Stops at truncated data.
fn ops(script: &[u8]) -> impl Iterator<Item = Op<'_>> {
    let mut pos = 0usize;
    std::iter::from_fn(move || {
        if pos >= script.len() {
            return None;
        }
        let opcode = script[pos];
        pos += 1;
        let data_len = match opcode {
            1..=0x4b => opcode as usize,
            OP_PUSHDATA1 => {
                let len = *script.get(pos)? as usize;
                pos += 1;
                len
            }
            OP_PUSHDATA2 => {
                let bytes = script.get(pos..pos + 2)?;
                pos += 2;
                u16::from_le_bytes([bytes[0], bytes[1]]) as usize
            }
            OP_PUSHDATA4 => {
                let bytes = script.get(pos..pos + 4)?;
                pos += 4;
                u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as usize
            }
            _ => return Some(Op { opcode, data: None }),
        };
        let data = script.get(pos..pos + data_len)?;
        pos += data_len;
        Some(Op {
            opcode,
            data: Some(data),
        })
    })
}

/// Counts signature operations in a script.
///
/// With `accurate` set, a multisig preceded by `OP_1..OP_16` is charged
/// its actual key count; otherwise multisigs cost the worst-case
/// [`MAX_PUBKEYS_PER_MULTISIG`].
pub fn count_sigops(script: &[u8], accurate: bool) -> u32 {
    let mut count = 0u32;
    let mut last_opcode = 0xffu8;
    for op in ops(script) {
        match op.opcode {
            OP_CHECKSIG | OP_CHECKSIGVERIFY => count += 1,
            OP_CHECKMULTISIG | OP_CHECKMULTISIGVERIFY => {
                if accurate && (OP_1..=OP_16).contains(&last_opcode) {
                    count += (last_opcode - OP_1 + 1) as u32;
                } else {
                    count += MAX_PUBKEYS_PER_MULTISIG;
                }
            }
            _ => {}
        }
        last_opcode = op.opcode;
    }
    count
}

/// Whether a script-pubkey is the pay-to-script-hash template
/// (`OP_HASH160 <20 bytes> OP_EQUAL`).
pub fn is_pay_to_script_hash(script_pubkey: &[u8]) -> bool {
    script_pubkey.len() == 23
        && script_pubkey[0] == OP_HASH160
        && script_pubkey[1] == 0x14
        && script_pubkey[22] == OP_EQUAL
}

/// Sigops contributed by the redeem script nested inside a P2SH spend.
///
/// Returns zero when the spent output is not P2SH or the script-sig ends
/// in anything but a data push.
pub fn count_p2sh_sigops(script_pubkey: &[u8], script_sig: &[u8]) -> u32 {
    if !is_pay_to_script_hash(script_pubkey) {
        return 0;
    }
    // The redeem script is the final data push of the script-sig.
    let mut redeem: Option<&[u8]> = None;
    for op in ops(script_sig) {
        match op.data {
            Some(data) => redeem = Some(data),
            None if op.opcode == OP_0 => redeem = Some(&[]),
            None => return 0,
        }
    }
    redeem.map_or(0, |script| count_sigops(script, true))
}

/// Builds the standard pay-to-pubkey-hash script for a 20-byte key hash.
pub fn pay_to_pubkey_hash(key_hash: &[u8; 20]) -> Vec<u8> {
    let mut script = Vec::with_capacity(25);
    script.push(OP_DUP);
    script.push(OP_HASH160);
    script.push(0x14);
    script.extend_from_slice(key_hash);
    script.push(OP_EQUALVERIFY);
    script.push(OP_CHECKSIG);
    script
}

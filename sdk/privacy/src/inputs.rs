//! Circuit Input Assembly
//!
//! The one place that knows how each operation's witness is named and
//! ordered. Nothing else in the system touches circuit-specific layout.
//!
//! ```text
//! deposit:  token, amount, blindingFactor
//! withdraw: token, amount, blindingFactor, recipient,
//!           merkleProof, merkleRoot, leafIndex
//! swap:     tokenIn, tokenOut, amountIn, amountOut,
//!           blindingFactorIn, blindingFactorOut,
//!           merkleProof, merkleRoot, leafIndex
//! ```
//!
//! Public signals, in order:
//!
//! ```text
//! deposit:  [commitment, token, amount]
//! withdraw: [nullifier, merkleRoot, recipient, token, amount]
//! swap:     [nullifierIn, commitmentOut, merkleRoot, tokenIn, tokenOut]
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::address::Address;
use crate::commitment::{BlindingFactor, CommitmentScheme};
use crate::element::Element;
use crate::error::{PrivacyError, Result};
use crate::merkle::MerkleAuthPath;

/// The three circuits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProofKind {
    Deposit,
    Withdraw,
    Swap,
}

impl ProofKind {
    pub const ALL: [ProofKind; 3] = [ProofKind::Deposit, ProofKind::Withdraw, ProofKind::Swap];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProofKind::Deposit => "deposit",
            ProofKind::Withdraw => "withdraw",
            ProofKind::Swap => "swap",
        }
    }

    /// Number of public signals the circuit exposes
    pub fn public_signal_count(&self) -> usize {
        match self {
            ProofKind::Deposit => 3,
            ProofKind::Withdraw | ProofKind::Swap => 5,
        }
    }
}

impl fmt::Display for ProofKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProofKind {
    type Err = PrivacyError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "deposit" => Ok(ProofKind::Deposit),
            "withdraw" => Ok(ProofKind::Withdraw),
            "swap" => Ok(ProofKind::Swap),
            other => Err(PrivacyError::InvalidEncoding(format!(
                "unknown proof kind: {other}"
            ))),
        }
    }
}

/// One named circuit input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Signal {
    Scalar(Element),
    Array(Vec<Element>),
}

impl Signal {
    fn to_json(&self) -> Value {
        match self {
            Signal::Scalar(e) => Value::String(e.to_decimal_string()),
            Signal::Array(items) => Value::Array(
                items
                    .iter()
                    .map(|e| Value::String(e.to_decimal_string()))
                    .collect(),
            ),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DepositInputs {
    pub token: Element,
    pub amount: Element,
    pub blinding_factor: BlindingFactor,
}

#[derive(Debug, Clone)]
pub struct WithdrawInputs {
    pub token: Element,
    pub amount: Element,
    pub blinding_factor: BlindingFactor,
    pub recipient: Element,
    pub merkle_proof: Vec<Element>,
    pub merkle_root: Element,
    pub leaf_index: Element,
}

#[derive(Debug, Clone)]
pub struct SwapInputs {
    pub token_in: Element,
    pub token_out: Element,
    pub amount_in: Element,
    pub amount_out: Element,
    pub blinding_factor_in: BlindingFactor,
    pub blinding_factor_out: BlindingFactor,
    pub merkle_proof: Vec<Element>,
    pub merkle_root: Element,
    pub leaf_index: Element,
}

/// Complete input set for one proof
#[derive(Debug, Clone)]
pub enum CircuitInputs {
    Deposit(DepositInputs),
    Withdraw(WithdrawInputs),
    Swap(SwapInputs),
}

fn nonzero(amount: u128) -> Result<Element> {
    if amount == 0 {
        return Err(PrivacyError::ZeroAmount);
    }
    Ok(Element::from(amount))
}

impl CircuitInputs {
    pub fn deposit(token: &Address, amount: u128, blinding: &BlindingFactor) -> Result<Self> {
        Ok(CircuitInputs::Deposit(DepositInputs {
            token: token.to_element(),
            amount: nonzero(amount)?,
            blinding_factor: *blinding,
        }))
    }

    pub fn withdraw(
        token: &Address,
        amount: u128,
        blinding: &BlindingFactor,
        recipient: &Address,
        path: &MerkleAuthPath,
        merkle_root: Element,
    ) -> Result<Self> {
        path.validate()?;
        Ok(CircuitInputs::Withdraw(WithdrawInputs {
            token: token.to_element(),
            amount: nonzero(amount)?,
            blinding_factor: *blinding,
            recipient: recipient.to_element(),
            merkle_proof: path.siblings.clone(),
            merkle_root,
            leaf_index: Element::from(path.leaf_index),
        }))
    }

    #[allow(clippy::too_many_arguments)]
    pub fn swap(
        token_in: &Address,
        token_out: &Address,
        amount_in: u128,
        amount_out: u128,
        blinding_in: &BlindingFactor,
        blinding_out: &BlindingFactor,
        path: &MerkleAuthPath,
        merkle_root: Element,
    ) -> Result<Self> {
        path.validate()?;
        Ok(CircuitInputs::Swap(SwapInputs {
            token_in: token_in.to_element(),
            token_out: token_out.to_element(),
            amount_in: nonzero(amount_in)?,
            amount_out: nonzero(amount_out)?,
            blinding_factor_in: *blinding_in,
            blinding_factor_out: *blinding_out,
            merkle_proof: path.siblings.clone(),
            merkle_root,
            leaf_index: Element::from(path.leaf_index),
        }))
    }

    pub fn kind(&self) -> ProofKind {
        match self {
            CircuitInputs::Deposit(_) => ProofKind::Deposit,
            CircuitInputs::Withdraw(_) => ProofKind::Withdraw,
            CircuitInputs::Swap(_) => ProofKind::Swap,
        }
    }

    /// Named inputs in circuit order
    pub fn signals(&self) -> Vec<(&'static str, Signal)> {
        use Signal::{Array, Scalar};

        match self {
            CircuitInputs::Deposit(d) => vec![
                ("token", Scalar(d.token)),
                ("amount", Scalar(d.amount)),
                ("blindingFactor", Scalar(d.blinding_factor.to_element())),
            ],
            CircuitInputs::Withdraw(w) => vec![
                ("token", Scalar(w.token)),
                ("amount", Scalar(w.amount)),
                ("blindingFactor", Scalar(w.blinding_factor.to_element())),
                ("recipient", Scalar(w.recipient)),
                ("merkleProof", Array(w.merkle_proof.clone())),
                ("merkleRoot", Scalar(w.merkle_root)),
                ("leafIndex", Scalar(w.leaf_index)),
            ],
            CircuitInputs::Swap(s) => vec![
                ("tokenIn", Scalar(s.token_in)),
                ("tokenOut", Scalar(s.token_out)),
                ("amountIn", Scalar(s.amount_in)),
                ("amountOut", Scalar(s.amount_out)),
                ("blindingFactorIn", Scalar(s.blinding_factor_in.to_element())),
                ("blindingFactorOut", Scalar(s.blinding_factor_out.to_element())),
                ("merkleProof", Array(s.merkle_proof.clone())),
                ("merkleRoot", Scalar(s.merkle_root)),
                ("leafIndex", Scalar(s.leaf_index)),
            ],
        }
    }

    /// Witness JSON with decimal strings, keys in circuit order
    pub fn to_json(&self) -> Value {
        let mut map = Map::new();
        for (name, signal) in self.signals() {
            map.insert(name.to_string(), signal.to_json());
        }
        Value::Object(map)
    }

    /// Public signals the circuit is expected to expose for these inputs
    pub fn public_signals(&self, scheme: &CommitmentScheme) -> Vec<Element> {
        match self {
            CircuitInputs::Deposit(d) => {
                let commitment = scheme.commit(d.amount, &d.blinding_factor);
                vec![commitment.to_element(), d.token, d.amount]
            }
            CircuitInputs::Withdraw(w) => {
                let commitment = scheme.commit(w.amount, &w.blinding_factor);
                let nullifier = scheme.nullify(&commitment, &w.blinding_factor);
                vec![
                    nullifier.to_element(),
                    w.merkle_root,
                    w.recipient,
                    w.token,
                    w.amount,
                ]
            }
            CircuitInputs::Swap(s) => {
                let commitment_in = scheme.commit(s.amount_in, &s.blinding_factor_in);
                let nullifier_in = scheme.nullify(&commitment_in, &s.blinding_factor_in);
                let commitment_out = scheme.commit(s.amount_out, &s.blinding_factor_out);
                vec![
                    nullifier_in.to_element(),
                    commitment_out.to_element(),
                    s.merkle_root,
                    s.token_in,
                    s.token_out,
                ]
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::LinearHasher;
    use std::sync::Arc;

    fn token() -> Address {
        "0x00000000000000000000000000000000000000aa".parse().unwrap()
    }

    fn recipient() -> Address {
        "0x00000000000000000000000000000000000000bb".parse().unwrap()
    }

    fn blinding(v: u64) -> BlindingFactor {
        BlindingFactor::from_element(Element::from(v))
    }

    #[test]
    fn test_deposit_json_layout() {
        let inputs = CircuitInputs::deposit(&token(), 1_500_000, &blinding(7)).unwrap();
        let json = inputs.to_json();
        let keys: Vec<&String> = json.as_object().unwrap().keys().collect();
        assert_eq!(keys, ["token", "amount", "blindingFactor"]);
        assert_eq!(json["token"], "170");
        assert_eq!(json["amount"], "1500000");
        assert_eq!(json["blindingFactor"], "7");
    }

    #[test]
    fn test_withdraw_signal_order() {
        let path = MerkleAuthPath::new(vec![Element::from(1u64), Element::from(2u64)], 3);
        let inputs = CircuitInputs::withdraw(
            &token(),
            10,
            &blinding(7),
            &recipient(),
            &path,
            Element::from(99u64),
        )
        .unwrap();

        let names: Vec<&str> = inputs.signals().iter().map(|(n, _)| *n).collect();
        assert_eq!(
            names,
            [
                "token",
                "amount",
                "blindingFactor",
                "recipient",
                "merkleProof",
                "merkleRoot",
                "leafIndex"
            ]
        );
        let json = inputs.to_json();
        assert_eq!(json["merkleProof"], serde_json::json!(["1", "2"]));
        assert_eq!(json["leafIndex"], "3");
        assert_eq!(json["recipient"], "187");
    }

    #[test]
    fn test_swap_signal_order() {
        let path = MerkleAuthPath::new(vec![Element::from(1u64)], 0);
        let inputs = CircuitInputs::swap(
            &token(),
            &recipient(),
            10,
            20,
            &blinding(1),
            &blinding(2),
            &path,
            Element::zero(),
        )
        .unwrap();
        assert_eq!(inputs.kind(), ProofKind::Swap);

        let names: Vec<&str> = inputs.signals().iter().map(|(n, _)| *n).collect();
        assert_eq!(
            names,
            [
                "tokenIn",
                "tokenOut",
                "amountIn",
                "amountOut",
                "blindingFactorIn",
                "blindingFactorOut",
                "merkleProof",
                "merkleRoot",
                "leafIndex"
            ]
        );
    }

    #[test]
    fn test_zero_amount_rejected() {
        let err = CircuitInputs::deposit(&token(), 0, &blinding(1)).unwrap_err();
        assert_eq!(err, PrivacyError::ZeroAmount);
    }

    #[test]
    fn test_bad_path_rejected() {
        let path = MerkleAuthPath::new(vec![Element::zero()], 2);
        let res = CircuitInputs::withdraw(
            &token(),
            1,
            &blinding(1),
            &recipient(),
            &path,
            Element::zero(),
        );
        assert!(matches!(res, Err(PrivacyError::LeafIndexOutOfRange { .. })));
    }

    #[test]
    fn test_public_signal_layout() {
        let scheme = CommitmentScheme::new(Arc::new(LinearHasher));
        let inputs = CircuitInputs::deposit(&token(), 1_500_000, &blinding(7)).unwrap();
        let signals = inputs.public_signals(&scheme);
        assert_eq!(signals.len(), ProofKind::Deposit.public_signal_count());
        assert_eq!(
            signals[0].to_decimal_string(),
            "2381976568446569244243622252022378980192"
        );
        assert_eq!(signals[1], token().to_element());
        assert_eq!(signals[2], Element::from(1_500_000u64));
    }

    #[test]
    fn test_kind_names() {
        for kind in ProofKind::ALL {
            assert_eq!(kind.as_str().parse::<ProofKind>().unwrap(), kind);
        }
    }
}

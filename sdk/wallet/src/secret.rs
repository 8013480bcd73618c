//! Secret records and spent tracking.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use shade_privacy::{Address, BlindingFactor, Commitment, CommitmentScheme, Element};

use crate::error::{Result, WalletError};

/// Everything needed to later spend a commitment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecretRecord {
    pub commitment: Commitment,
    pub blinding_factor: BlindingFactor,
    #[serde(with = "amount_string")]
    pub amount: u128,
    pub token: Address,
    #[serde(default)]
    pub spent: bool,
}

/// The JSON shape handed to the user after a deposit
pub type ExportableSecret = SecretRecord;

impl SecretRecord {
    pub fn new(
        scheme: &CommitmentScheme,
        token: Address,
        amount: u128,
        blinding_factor: BlindingFactor,
    ) -> Self {
        Self {
            commitment: scheme.commit(Element::from(amount), &blinding_factor),
            blinding_factor,
            amount,
            token,
            spent: false,
        }
    }

    /// The stored commitment must be the one the amount and blinding factor
    /// open to under `scheme`
    pub fn validate(&self, scheme: &CommitmentScheme) -> Result<()> {
        let expected = scheme.commit(Element::from(self.amount), &self.blinding_factor);
        if expected != self.commitment {
            return Err(WalletError::MalformedInput(format!(
                "secret for {} does not open its commitment",
                self.commitment
            )));
        }
        Ok(())
    }
}

/// What happens to a secret after a successful withdraw or swap
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SpentPolicy {
    /// Keep the secret usable. The verifier's nullifier set is the only spent
    /// check, and the same proof can be derived again.
    #[default]
    Retain,
    /// Flag the secret and refuse further proofs against it
    MarkSpent,
}

impl fmt::Display for SpentPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpentPolicy::Retain => f.write_str("retain"),
            SpentPolicy::MarkSpent => f.write_str("mark-spent"),
        }
    }
}

impl FromStr for SpentPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "retain" => Ok(SpentPolicy::Retain),
            "mark-spent" | "mark_spent" => Ok(SpentPolicy::MarkSpent),
            other => Err(format!("unknown spent policy: {other}")),
        }
    }
}

/// u128 amounts travel as decimal strings so JSON consumers keep precision
mod amount_string {
    use super::*;

    pub fn serialize<S: Serializer>(amount: &u128, s: S) -> std::result::Result<S::Ok, S::Error> {
        s.serialize_str(&amount.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<u128, D::Error> {
        let s = String::deserialize(d)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shade_privacy::LinearHasher;
    use std::sync::Arc;

    fn scheme() -> CommitmentScheme {
        CommitmentScheme::new(Arc::new(LinearHasher))
    }

    fn token() -> Address {
        "0x00000000000000000000000000000000000000aa".parse().unwrap()
    }

    #[test]
    fn test_exportable_json_shape() {
        let record = SecretRecord::new(
            &scheme(),
            token(),
            1_500_000,
            BlindingFactor::from_element(Element::from(7u64)),
        );
        let json = serde_json::to_value(&record).unwrap();

        assert_eq!(json["amount"], "1500000");
        assert_eq!(json["token"], "0x00000000000000000000000000000000000000aa");
        assert_eq!(json["spent"], false);
        assert!(json.get("blindingFactor").is_some());

        let back: ExportableSecret = serde_json::from_value(json).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn test_validate_detects_wrong_amount() {
        let mut record = SecretRecord::new(
            &scheme(),
            token(),
            100,
            BlindingFactor::from_element(Element::from(3u64)),
        );
        assert!(record.validate(&scheme()).is_ok());

        record.amount = 101;
        assert!(matches!(
            record.validate(&scheme()),
            Err(WalletError::MalformedInput(_))
        ));
    }

    #[test]
    fn test_spent_policy_parse() {
        assert_eq!("retain".parse::<SpentPolicy>().unwrap(), SpentPolicy::Retain);
        assert_eq!(
            "MARK-SPENT".parse::<SpentPolicy>().unwrap(),
            SpentPolicy::MarkSpent
        );
        assert!("forget".parse::<SpentPolicy>().is_err());
        assert_eq!(SpentPolicy::MarkSpent.to_string(), "mark-spent");
    }
}

use std::sync::Arc;

use anyhow::Result;
use shade_config::{HasherToml, ShadeConfig};
use shade_privacy::{
    BlindingFactor, Commitment, CommitmentScheme, Element, FieldHasher, HasherKind,
    MerkleAuthPath, Nullifier,
};

pub fn hasher(config: &ShadeConfig) -> Arc<dyn FieldHasher> {
    let kind = match config.hash.hasher {
        HasherToml::Poseidon => HasherKind::Poseidon,
        HasherToml::Linear => HasherKind::Linear,
    };
    kind.build()
}

pub fn scheme(config: &ShadeConfig) -> CommitmentScheme {
    CommitmentScheme::new(hasher(config))
}

pub fn commitment(config: &ShadeConfig, amount: u128, blinding: Element) -> Commitment {
    scheme(config).commit(Element::from(amount), &BlindingFactor::from_element(blinding))
}

pub fn nullifier(config: &ShadeConfig, commitment: Commitment, blinding: Element) -> Nullifier {
    scheme(config).nullify(&commitment, &BlindingFactor::from_element(blinding))
}

pub fn merkle_root(
    config: &ShadeConfig,
    leaf: Element,
    siblings: Vec<Element>,
    index: u64,
) -> Result<Element> {
    let path = MerkleAuthPath::new(siblings, index);
    path.validate()?;
    Ok(path.compute_root(hasher(config).as_ref(), leaf))
}

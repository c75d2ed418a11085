use crate::errors::{FairnessError, GameError, GameResult};
use crate::games::randomness::{uniform_from_bytes, Draw, RandomSource};
use crate::games::types::{RoundSeed, VrfBundle};
use schnorrkel::{context::SigningContext, Keypair, PublicKey, Signature};
use sha2::{Digest, Sha256};
use std::sync::Arc;

const VRF_SIGNING_CONTEXT: &[u8] = b"ascent-crash";

/// Input message bound to a round
pub fn vrf_input(round_id: &str) -> String {
    format!("crash:{}", round_id)
}

/// VRF-backed randomness: every draw ships a proof that players can check
/// against the published public key once the round is resolved.
pub struct VrfRandomSource {
    keypair: Arc<Keypair>,
}

impl VrfRandomSource {
    pub fn new(keypair: Keypair) -> Self {
        Self {
            keypair: Arc::new(keypair),
        }
    }

    /// Fresh keypair from the OS generator
    pub fn new_random() -> Self {
        use rand_core::OsRng;
        Self::new(Keypair::generate_with(OsRng))
    }

    /// Produce output and proof for a round
    pub fn prove(&self, round_id: &str) -> VrfBundle {
        let input_message = vrf_input(round_id);
        let ctx = SigningContext::new(VRF_SIGNING_CONTEXT);
        let signature = self.keypair.sign(ctx.bytes(input_message.as_bytes()));
        let signature_bytes = signature.to_bytes();

        VrfBundle {
            vrf_output: hex::encode(Sha256::digest(signature_bytes)),
            vrf_proof: hex::encode(signature_bytes),
            public_key: hex::encode(self.keypair.public.to_bytes()),
            input_message,
        }
    }

    pub fn public_key(&self) -> Vec<u8> {
        self.keypair.public.to_bytes().to_vec()
    }
}

impl RandomSource for VrfRandomSource {
    fn draw(&self, round_id: &str) -> GameResult<Draw> {
        let bundle = self.prove(round_id);
        let output = hex::decode(&bundle.vrf_output)
            .map_err(|e| GameError::EntropyUnavailable(e.to_string()))?;
        Ok(Draw {
            value: uniform_from_bytes(&output)?,
            seed: RoundSeed::Vrf(bundle),
        })
    }

    fn name(&self) -> &'static str {
        "vrf"
    }

    fn public_key_hex(&self) -> Option<String> {
        Some(hex::encode(self.public_key()))
    }
}

/// Check a bundle against the round it claims to belong to and return the
/// verified VRF output bytes.
pub fn verify_vrf_bundle(bundle: &VrfBundle, round_id: &str) -> Result<Vec<u8>, FairnessError> {
    let expected = vrf_input(round_id);
    if bundle.input_message != expected {
        return Err(FairnessError::InputMismatch {
            expected,
            actual: bundle.input_message.clone(),
        });
    }

    let vrf_output = hex::decode(&bundle.vrf_output)
        .map_err(|e| FairnessError::InvalidProof(format!("Invalid VRF output hex: {}", e)))?;
    let vrf_proof = hex::decode(&bundle.vrf_proof)
        .map_err(|e| FairnessError::InvalidProof(format!("Invalid VRF proof hex: {}", e)))?;
    let public_key_bytes = hex::decode(&bundle.public_key)
        .map_err(|e| FairnessError::InvalidProof(format!("Invalid public key hex: {}", e)))?;

    let public_key = PublicKey::from_bytes(&public_key_bytes)
        .map_err(|e| FairnessError::InvalidProof(format!("Invalid public key: {:?}", e)))?;
    let signature = Signature::from_bytes(&vrf_proof)
        .map_err(|e| FairnessError::InvalidProof(format!("Invalid signature: {:?}", e)))?;

    let ctx = SigningContext::new(VRF_SIGNING_CONTEXT);
    public_key
        .verify(ctx.bytes(expected.as_bytes()), &signature)
        .map_err(|e| FairnessError::InvalidProof(format!("Signature check failed: {:?}", e)))?;

    // Output must be derived from the proof
    if Sha256::digest(&vrf_proof).as_slice() != vrf_output.as_slice() {
        return Err(FairnessError::InvalidProof(
            "VRF output is not derived from proof".to_string(),
        ));
    }

    Ok(vrf_output)
}

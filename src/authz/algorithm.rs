use josekit::jws::{
    JwsHeader, JwsSigner, JwsVerifier, ES256, ES384, ES512, HS256, HS384, HS512, PS256, PS384,
    PS512, RS256, RS384, RS512,
};
use josekit::jwt::{self, JwtPayload};
use josekit::JoseError;
use std::fmt;
use std::str::FromStr;

use crate::authz::errors::AuthError;

/// JWS algorithms accepted for token issuance and verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JwtAlgorithm {
    Hs256,
    Hs384,
    Hs512,
    Rs256,
    Rs384,
    Rs512,
    Es256,
    Es384,
    Es512,
    Ps256,
    Ps384,
    Ps512,
    None,
}

impl JwtAlgorithm {
    pub const ALL: [JwtAlgorithm; 13] = [
        JwtAlgorithm::Hs256,
        JwtAlgorithm::Hs384,
        JwtAlgorithm::Hs512,
        JwtAlgorithm::Rs256,
        JwtAlgorithm::Rs384,
        JwtAlgorithm::Rs512,
        JwtAlgorithm::Es256,
        JwtAlgorithm::Es384,
        JwtAlgorithm::Es512,
        JwtAlgorithm::Ps256,
        JwtAlgorithm::Ps384,
        JwtAlgorithm::Ps512,
        JwtAlgorithm::None,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            JwtAlgorithm::Hs256 => "HS256",
            JwtAlgorithm::Hs384 => "HS384",
            JwtAlgorithm::Hs512 => "HS512",
            JwtAlgorithm::Rs256 => "RS256",
            JwtAlgorithm::Rs384 => "RS384",
            JwtAlgorithm::Rs512 => "RS512",
            JwtAlgorithm::Es256 => "ES256",
            JwtAlgorithm::Es384 => "ES384",
            JwtAlgorithm::Es512 => "ES512",
            JwtAlgorithm::Ps256 => "PS256",
            JwtAlgorithm::Ps384 => "PS384",
            JwtAlgorithm::Ps512 => "PS512",
            JwtAlgorithm::None => "none",
        }
    }

    /// HMAC algorithms take a shared secret; the rest take PEM keys.
    pub fn is_symmetric(&self) -> bool {
        matches!(
            self,
            JwtAlgorithm::Hs256 | JwtAlgorithm::Hs384 | JwtAlgorithm::Hs512
        )
    }

    /// Signer for `key`: the HMAC secret, or a PEM private key.
    pub fn signer(&self, key: &[u8]) -> Result<Box<dyn JwsSigner>, AuthError> {
        let signer: Box<dyn JwsSigner> = match self {
            JwtAlgorithm::Hs256 => Box::new(HS256.signer_from_bytes(key).map_err(invalid_key)?),
            JwtAlgorithm::Hs384 => Box::new(HS384.signer_from_bytes(key).map_err(invalid_key)?),
            JwtAlgorithm::Hs512 => Box::new(HS512.signer_from_bytes(key).map_err(invalid_key)?),
            JwtAlgorithm::Rs256 => Box::new(RS256.signer_from_pem(key).map_err(invalid_key)?),
            JwtAlgorithm::Rs384 => Box::new(RS384.signer_from_pem(key).map_err(invalid_key)?),
            JwtAlgorithm::Rs512 => Box::new(RS512.signer_from_pem(key).map_err(invalid_key)?),
            JwtAlgorithm::Es256 => Box::new(ES256.signer_from_pem(key).map_err(invalid_key)?),
            JwtAlgorithm::Es384 => Box::new(ES384.signer_from_pem(key).map_err(invalid_key)?),
            JwtAlgorithm::Es512 => Box::new(ES512.signer_from_pem(key).map_err(invalid_key)?),
            JwtAlgorithm::Ps256 => Box::new(PS256.signer_from_pem(key).map_err(invalid_key)?),
            JwtAlgorithm::Ps384 => Box::new(PS384.signer_from_pem(key).map_err(invalid_key)?),
            JwtAlgorithm::Ps512 => Box::new(PS512.signer_from_pem(key).map_err(invalid_key)?),
            JwtAlgorithm::None => return Err(AuthError::UnsignedToken),
        };
        Ok(signer)
    }

    /// Verifier for `key`: the HMAC secret, or a PEM public key.
    pub fn verifier(&self, key: &[u8]) -> Result<Box<dyn JwsVerifier>, AuthError> {
        let verifier: Box<dyn JwsVerifier> = match self {
            JwtAlgorithm::Hs256 => Box::new(HS256.verifier_from_bytes(key).map_err(invalid_key)?),
            JwtAlgorithm::Hs384 => Box::new(HS384.verifier_from_bytes(key).map_err(invalid_key)?),
            JwtAlgorithm::Hs512 => Box::new(HS512.verifier_from_bytes(key).map_err(invalid_key)?),
            JwtAlgorithm::Rs256 => Box::new(RS256.verifier_from_pem(key).map_err(invalid_key)?),
            JwtAlgorithm::Rs384 => Box::new(RS384.verifier_from_pem(key).map_err(invalid_key)?),
            JwtAlgorithm::Rs512 => Box::new(RS512.verifier_from_pem(key).map_err(invalid_key)?),
            JwtAlgorithm::Es256 => Box::new(ES256.verifier_from_pem(key).map_err(invalid_key)?),
            JwtAlgorithm::Es384 => Box::new(ES384.verifier_from_pem(key).map_err(invalid_key)?),
            JwtAlgorithm::Es512 => Box::new(ES512.verifier_from_pem(key).map_err(invalid_key)?),
            JwtAlgorithm::Ps256 => Box::new(PS256.verifier_from_pem(key).map_err(invalid_key)?),
            JwtAlgorithm::Ps384 => Box::new(PS384.verifier_from_pem(key).map_err(invalid_key)?),
            JwtAlgorithm::Ps512 => Box::new(PS512.verifier_from_pem(key).map_err(invalid_key)?),
            JwtAlgorithm::None => return Err(AuthError::UnsignedToken),
        };
        Ok(verifier)
    }

    /// Encode `payload` without a signature. Only meaningful for `none`.
    pub fn encode_unsigned(&self, payload: &JwtPayload) -> Result<String, AuthError> {
        let mut header = JwsHeader::new();
        header.set_token_type("JWT");
        jwt::encode_unsecured(payload, &header).map_err(|e| AuthError::Signing(e.to_string()))
    }
}

fn invalid_key(e: JoseError) -> AuthError {
    AuthError::InvalidKey(e.to_string())
}

impl fmt::Display for JwtAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for JwtAlgorithm {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|alg| alg.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| AuthError::UnsupportedAlgorithm(s.to_string()))
    }
}

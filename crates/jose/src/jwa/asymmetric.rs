// Copyright 2024, 2025 New Vector Ltd.
// Copyright 2022-2024 The Matrix.org Foundation C.I.C.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use elliptic_curve::{PublicKey, SecretKey};
use rsa::{RsaPrivateKey, RsaPublicKey};
use signature::{SignatureEncoding as _, Signer as _, Verifier as _};
use thiserror::Error;

use super::{
    Es256SigningKey, Es256VerifyingKey, Es384SigningKey, Es384VerifyingKey, JsonWebSignatureAlg,
    Ps256VerifyingKey, Ps384VerifyingKey, Ps512VerifyingKey, Rs256SigningKey, Rs256VerifyingKey,
    Rs384SigningKey, Rs384VerifyingKey, Rs512SigningKey, Rs512VerifyingKey,
};
use crate::jwk::{JsonWebKeyEcEllipticCurve, JsonWebKeyPublicParameters};

#[derive(Debug, Error)]
pub enum AsymmetricKeyFromJwkError {
    #[error("Invalid RSA parameters")]
    Rsa {
        #[from]
        inner: rsa::errors::Error,
    },

    #[error("Invalid Elliptic Curve parameters")]
    EllipticCurve {
        #[from]
        inner: elliptic_curve::Error,
    },

    #[error("Unsupported algorithm {alg}")]
    UnsupportedAlgorithm { alg: JsonWebSignatureAlg },

    #[error("Key not suitable for algorithm {alg}")]
    KeyNotSuitable { alg: JsonWebSignatureAlg },
}

/// A public key able to verify the signature of a JWS.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum AsymmetricVerifyingKey {
    Rs256(Rs256VerifyingKey),
    Rs384(Rs384VerifyingKey),
    Rs512(Rs512VerifyingKey),
    Ps256(Ps256VerifyingKey),
    Ps384(Ps384VerifyingKey),
    Ps512(Ps512VerifyingKey),
    Es256(Es256VerifyingKey),
    Es384(Es384VerifyingKey),
}

impl AsymmetricVerifyingKey {
    /// Build a verifying key out of the public parameters of a JWK, for the
    /// given algorithm.
    ///
    /// # Errors
    ///
    /// Returns an error if the parameters are invalid, if the algorithm is not
    /// supported, or if the key can't be used with this algorithm.
    pub fn from_jwk_and_alg(
        params: &JsonWebKeyPublicParameters,
        alg: &JsonWebSignatureAlg,
    ) -> Result<Self, AsymmetricKeyFromJwkError> {
        match (params, alg) {
            (JsonWebKeyPublicParameters::Rsa(params), alg) => {
                let key = RsaPublicKey::try_from(params)?;
                match alg {
                    JsonWebSignatureAlg::Rs256 => Ok(Self::Rs256(Rs256VerifyingKey::new(key))),
                    JsonWebSignatureAlg::Rs384 => Ok(Self::Rs384(Rs384VerifyingKey::new(key))),
                    JsonWebSignatureAlg::Rs512 => Ok(Self::Rs512(Rs512VerifyingKey::new(key))),
                    JsonWebSignatureAlg::Ps256 => Ok(Self::Ps256(Ps256VerifyingKey::new(key))),
                    JsonWebSignatureAlg::Ps384 => Ok(Self::Ps384(Ps384VerifyingKey::new(key))),
                    JsonWebSignatureAlg::Ps512 => Ok(Self::Ps512(Ps512VerifyingKey::new(key))),
                    alg => Err(AsymmetricKeyFromJwkError::KeyNotSuitable { alg: alg.clone() }),
                }
            }

            (JsonWebKeyPublicParameters::Ec(params), JsonWebSignatureAlg::Es256)
                if params.crv == JsonWebKeyEcEllipticCurve::P256 =>
            {
                let key = PublicKey::<p256::NistP256>::try_from(params)?;
                Ok(Self::Es256(key.into()))
            }

            (JsonWebKeyPublicParameters::Ec(params), JsonWebSignatureAlg::Es384)
                if params.crv == JsonWebKeyEcEllipticCurve::P384 =>
            {
                let key = PublicKey::<p384::NistP384>::try_from(params)?;
                Ok(Self::Es384(key.into()))
            }

            (JsonWebKeyPublicParameters::Ec(_), JsonWebSignatureAlg::Es256 | JsonWebSignatureAlg::Es384) => {
                Err(AsymmetricKeyFromJwkError::KeyNotSuitable { alg: alg.clone() })
            }

            (_, alg) => Err(AsymmetricKeyFromJwkError::UnsupportedAlgorithm { alg: alg.clone() }),
        }
    }

    /// The algorithm this key verifies signatures for.
    #[must_use]
    pub const fn alg(&self) -> JsonWebSignatureAlg {
        match self {
            Self::Rs256(_) => JsonWebSignatureAlg::Rs256,
            Self::Rs384(_) => JsonWebSignatureAlg::Rs384,
            Self::Rs512(_) => JsonWebSignatureAlg::Rs512,
            Self::Ps256(_) => JsonWebSignatureAlg::Ps256,
            Self::Ps384(_) => JsonWebSignatureAlg::Ps384,
            Self::Ps512(_) => JsonWebSignatureAlg::Ps512,
            Self::Es256(_) => JsonWebSignatureAlg::Es256,
            Self::Es384(_) => JsonWebSignatureAlg::Es384,
        }
    }

    /// Verify the signature of a message.
    ///
    /// # Errors
    ///
    /// Returns an error if the signature is malformed or doesn't match.
    pub fn verify(&self, message: &[u8], signature: &[u8]) -> Result<(), signature::Error> {
        match self {
            Self::Rs256(key) => key.verify(message, &rsa::pkcs1v15::Signature::try_from(signature)?),
            Self::Rs384(key) => key.verify(message, &rsa::pkcs1v15::Signature::try_from(signature)?),
            Self::Rs512(key) => key.verify(message, &rsa::pkcs1v15::Signature::try_from(signature)?),
            Self::Ps256(key) => key.verify(message, &rsa::pss::Signature::try_from(signature)?),
            Self::Ps384(key) => key.verify(message, &rsa::pss::Signature::try_from(signature)?),
            Self::Ps512(key) => key.verify(message, &rsa::pss::Signature::try_from(signature)?),
            Self::Es256(key) => {
                let signature = ecdsa::Signature::<p256::NistP256>::from_slice(signature)?;
                key.verify(message, &signature)
            }
            Self::Es384(key) => {
                let signature = ecdsa::Signature::<p384::NistP384>::from_slice(signature)?;
                key.verify(message, &signature)
            }
        }
    }
}

/// A private key able to sign a JWS.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum AsymmetricSigningKey {
    Rs256(Rs256SigningKey),
    Rs384(Rs384SigningKey),
    Rs512(Rs512SigningKey),
    Es256(Es256SigningKey),
    Es384(Es384SigningKey),
}

impl AsymmetricSigningKey {
    #[must_use]
    pub fn rs256(key: RsaPrivateKey) -> Self {
        Self::Rs256(Rs256SigningKey::new(key))
    }

    #[must_use]
    pub fn rs384(key: RsaPrivateKey) -> Self {
        Self::Rs384(Rs384SigningKey::new(key))
    }

    #[must_use]
    pub fn rs512(key: RsaPrivateKey) -> Self {
        Self::Rs512(Rs512SigningKey::new(key))
    }

    #[must_use]
    pub fn es256(key: SecretKey<p256::NistP256>) -> Self {
        Self::Es256(key.into())
    }

    #[must_use]
    pub fn es384(key: SecretKey<p384::NistP384>) -> Self {
        Self::Es384(key.into())
    }

    /// The algorithm this key signs with.
    #[must_use]
    pub const fn alg(&self) -> JsonWebSignatureAlg {
        match self {
            Self::Rs256(_) => JsonWebSignatureAlg::Rs256,
            Self::Rs384(_) => JsonWebSignatureAlg::Rs384,
            Self::Rs512(_) => JsonWebSignatureAlg::Rs512,
            Self::Es256(_) => JsonWebSignatureAlg::Es256,
            Self::Es384(_) => JsonWebSignatureAlg::Es384,
        }
    }

    /// The public parameters of this key, to publish in a JWKS.
    #[must_use]
    pub fn public_parameters(&self) -> JsonWebKeyPublicParameters {
        match self {
            Self::Rs256(key) => rsa_public_key(key.as_ref()).into(),
            Self::Rs384(key) => rsa_public_key(key.as_ref()).into(),
            Self::Rs512(key) => rsa_public_key(key.as_ref()).into(),
            Self::Es256(key) => PublicKey::from(key.verifying_key()).into(),
            Self::Es384(key) => PublicKey::from(key.verifying_key()).into(),
        }
    }

    /// Sign a message, returning the raw JWS signature bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying signer fails.
    pub fn sign(&self, message: &[u8]) -> Result<Vec<u8>, signature::Error> {
        let signature = match self {
            Self::Rs256(key) => key.try_sign(message)?.to_vec(),
            Self::Rs384(key) => key.try_sign(message)?.to_vec(),
            Self::Rs512(key) => key.try_sign(message)?.to_vec(),
            Self::Es256(key) => {
                let signature: ecdsa::Signature<p256::NistP256> = key.try_sign(message)?;
                signature.to_bytes().to_vec()
            }
            Self::Es384(key) => {
                let signature: ecdsa::Signature<p384::NistP384> = key.try_sign(message)?;
                signature.to_bytes().to_vec()
            }
        };

        Ok(signature)
    }
}

fn rsa_public_key(key: &RsaPrivateKey) -> RsaPublicKey {
    key.to_public_key()
}

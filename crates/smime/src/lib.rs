/*
 * vPEC certified mail agent
 *
 * Copyright (C) 2003 - viridIT SAS
 * Licensed under the Elastic License 2.0
 *
 * You should have received a copy of the Elastic License 2.0 along with
 * this program. If not, see https://www.elastic.co/licensing/elastic-license.
 *
 */

//! S/MIME layer of the vPEC kernel.
//!
//! Every receipt and transport envelope carries a detached PKCS#7
//! signature in a `multipart/signed` wrapper. The signed bytes are the
//! CRLF-canonical serialization of the payload entity, emitted verbatim
//! into the signed part: what was hashed is what is on the wire.

pub mod canonicalize;
pub mod certificate;
pub mod private_key;
pub mod sign;
#[cfg(feature = "testing")]
pub mod testing;
pub mod verify;

pub use canonicalize::{canonicalize_crlf, wrap_base64};
pub use certificate::{CertificateError, SmimeCertificate};
pub use private_key::{PrivateKeyError, SmimePrivateKey};
pub use sign::{seal, Signer, SigningError};
pub use verify::{verify_signed, SignatureError, VerifiedSignature};

/// Media type of the detached signature part.
pub const PKCS7_SIGNATURE_TYPE: &str = "application/pkcs7-signature";
/// Legacy alias still emitted by some providers.
pub const PKCS7_SIGNATURE_TYPE_LEGACY: &str = "application/x-pkcs7-signature";

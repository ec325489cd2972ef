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

//! Internet Message Format handling for the vPEC kernel.
//!
//! Every artifact the kernel emits is covered by a detached signature, so
//! the representation is byte-faithful in both directions: parsed messages
//! serialize back to the exact bytes that were read, and constructed
//! messages serialize to the exact bytes that get signed.

pub mod build;
pub mod errors;
pub mod mail;
pub mod mime;
pub mod parsing;

pub use errors::{ParserError, ParserResult};
pub use mail::Mail;

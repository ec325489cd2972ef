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

//! Italian-locale rendering of the event timestamps. These strings are part
//! of the receipt contract, not cosmetics.

use time::macros::format_description;

/// `DD/MM/YYYY`.
#[must_use]
#[allow(clippy::expect_used)]
pub(crate) fn giorno(at: time::OffsetDateTime) -> String {
    at.format(format_description!("[day]/[month]/[year]"))
        .expect("formatting to a string")
}

/// `HH:MM:SS`.
#[must_use]
#[allow(clippy::expect_used)]
pub(crate) fn ora(at: time::OffsetDateTime) -> String {
    at.format(format_description!("[hour]:[minute]:[second]"))
        .expect("formatting to a string")
}

/// `+hhmm`.
#[must_use]
#[allow(clippy::expect_used)]
pub(crate) fn zona(at: time::OffsetDateTime) -> String {
    at.format(format_description!(
        "[offset_hour sign:mandatory][offset_minute]"
    ))
    .expect("formatting to a string")
}

/// `Date:` header value, rfc2822 form.
#[must_use]
#[allow(clippy::expect_used)]
pub(crate) fn date_header(at: time::OffsetDateTime) -> String {
    at.format(&time::format_description::well_known::Rfc2822)
        .expect("formatting to a string")
}

/// The `data` element of the certification XML.
#[must_use]
pub(crate) fn data_element(at: time::OffsetDateTime) -> vpec_daticert::Data {
    vpec_daticert::Data {
        zona: zona(at),
        giorno: giorno(at),
        ora: ora(at),
    }
}

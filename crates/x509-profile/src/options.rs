//! The option pipeline and the built-in options.
//!
//! Options run in caller order against a profile whose defaults are already
//! in place. Later options see and may overwrite the effects of earlier ones.
//! The first failure stops the pipeline.

use chrono::{DateTime, Duration, Utc};
use std::net::IpAddr;
use std::sync::Arc;
use tracing::debug;

use crate::key::{KeyAlgorithm, KeyGenerator, KeyMaterial, PublicKey};
use crate::name::DistinguishedName;
use crate::oid::Oid;
use crate::profile::Profile;
use crate::{ProfileError, Result};

/// A single mutation step applied to a profile during construction.
pub type WithOption = Box<dyn FnOnce(&mut Profile) -> Result<()> + Send>;

/// Wrap a closure as a [`WithOption`].
pub fn option<F>(f: F) -> WithOption
where
    F: FnOnce(&mut Profile) -> Result<()> + Send + 'static,
{
    Box::new(f)
}

/// Run every option in order; the first failure aborts the pipeline.
pub(crate) fn apply_options(profile: &mut Profile, options: Vec<WithOption>) -> Result<()> {
    for (index, option) in options.into_iter().enumerate() {
        option(profile).map_err(|source| ProfileError::OptionRejected {
            position: index + 1,
            source: Box::new(source),
        })?;
    }
    profile.mark_options_applied();
    Ok(())
}

/// Use `key` as the subject public key. No private half is attached.
#[must_use]
pub fn with_public_key(key: PublicKey) -> WithOption {
    option(move |profile| {
        profile.set_subject_key(KeyMaterial::public_only(key));
        Ok(())
    })
}

/// Use caller-supplied key material as the subject key.
#[must_use]
pub fn with_key_material(key: impl Into<Arc<KeyMaterial>>) -> WithOption {
    let key = key.into();
    option(move |profile| {
        profile.set_subject_key(key);
        Ok(())
    })
}

/// Generate the subject key with `generator` instead of the factory default.
#[must_use]
pub fn with_generated_key<G>(generator: G, algorithm: KeyAlgorithm) -> WithOption
where
    G: KeyGenerator + Send + 'static,
{
    option(move |profile| {
        profile.set_subject_key(generator.generate(algorithm)?);
        Ok(())
    })
}

/// Set the validity window.
///
/// A missing `not_before` means now. A missing `not_after` is derived from
/// `duration`, or from the profile's default duration when that is missing
/// too.
#[must_use]
pub fn with_not_before_after_duration(
    not_before: Option<DateTime<Utc>>,
    not_after: Option<DateTime<Utc>>,
    duration: Option<Duration>,
) -> WithOption {
    option(move |profile| {
        let not_before = not_before.unwrap_or_else(Utc::now);
        let not_after = match not_after {
            Some(not_after) => not_after,
            None => valid_until(
                not_before,
                duration.unwrap_or_else(|| profile.default_duration()),
            )?,
        };
        if not_after <= not_before {
            return Err(ProfileError::InvalidOption(format!(
                "validity window ends ({not_after}) before it starts ({not_before})"
            )));
        }
        let draft = profile.subject_draft_mut();
        draft.not_before = not_before;
        draft.not_after = not_after;
        Ok(())
    })
}

/// Set an explicit validity window.
#[must_use]
pub fn with_validity(not_before: DateTime<Utc>, not_after: DateTime<Utc>) -> WithOption {
    with_not_before_after_duration(Some(not_before), Some(not_after), None)
}

/// Keep `not_before` and make the certificate valid for `duration`.
#[must_use]
pub fn with_duration(duration: Duration) -> WithOption {
    option(move |profile| {
        if duration <= Duration::zero() {
            return Err(ProfileError::InvalidOption(format!(
                "duration must be positive, got {duration}"
            )));
        }
        let draft = profile.subject_draft_mut();
        draft.not_after = valid_until(draft.not_before, duration)?;
        Ok(())
    })
}

fn valid_until(not_before: DateTime<Utc>, duration: Duration) -> Result<DateTime<Utc>> {
    not_before.checked_add_signed(duration).ok_or_else(|| {
        ProfileError::InvalidOption(format!("{not_before} plus {duration} is out of range"))
    })
}

/// Replace the subject name.
#[must_use]
pub fn with_subject(subject: DistinguishedName) -> WithOption {
    option(move |profile| {
        profile.subject_draft_mut().subject = subject;
        Ok(())
    })
}

/// Replace the subject common name, keeping the other attributes.
#[must_use]
pub fn with_common_name(cn: impl Into<String>) -> WithOption {
    let cn = cn.into();
    option(move |profile| {
        profile.subject_draft_mut().subject.common_name = cn;
        Ok(())
    })
}

/// Append subject alternative names from a comma-separated host list.
///
/// IP literals become IP SANs, entries with `://` become URIs, entries with
/// `@` become email addresses and everything else is a DNS name. Empty
/// entries are skipped.
#[must_use]
pub fn with_hosts(hosts: impl Into<String>) -> WithOption {
    let hosts = hosts.into();
    option(move |profile| {
        let draft = profile.subject_draft_mut();
        for host in hosts.split(',').map(str::trim).filter(|h| !h.is_empty()) {
            if let Ok(ip) = host.parse::<IpAddr>() {
                draft.ip_addresses.push(ip);
            } else if host.contains("://") {
                draft.uris.push(host.to_string());
            } else if host.contains('@') {
                draft.email_addresses.push(host.to_string());
            } else {
                draft.dns_names.push(host.to_string());
            }
        }
        debug!(hosts = %hosts, "applied host list");
        Ok(())
    })
}

/// Replace the DNS names.
#[must_use]
pub fn with_dns_names<I, S>(names: I) -> WithOption
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let names: Vec<String> = names.into_iter().map(Into::into).collect();
    option(move |profile| {
        if let Some(bad) = names.iter().find(|n| n.is_empty() || n.contains(char::is_whitespace)) {
            return Err(ProfileError::InvalidOption(format!("invalid DNS name {bad:?}")));
        }
        profile.subject_draft_mut().dns_names = names;
        Ok(())
    })
}

/// Replace the email addresses.
#[must_use]
pub fn with_email_addresses<I, S>(addresses: I) -> WithOption
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let addresses: Vec<String> = addresses.into_iter().map(Into::into).collect();
    option(move |profile| {
        if let Some(bad) = addresses.iter().find(|a| !a.contains('@')) {
            return Err(ProfileError::InvalidOption(format!("invalid email address {bad:?}")));
        }
        profile.subject_draft_mut().email_addresses = addresses;
        Ok(())
    })
}

/// Replace the IP addresses.
#[must_use]
pub fn with_ip_addresses(addresses: Vec<IpAddr>) -> WithOption {
    option(move |profile| {
        profile.subject_draft_mut().ip_addresses = addresses;
        Ok(())
    })
}

/// Replace the URIs.
#[must_use]
pub fn with_uris<I, S>(uris: I) -> WithOption
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let uris: Vec<String> = uris.into_iter().map(Into::into).collect();
    option(move |profile| {
        if let Some(bad) = uris.iter().find(|u| !u.contains(':')) {
            return Err(ProfileError::InvalidOption(format!("URI {bad:?} has no scheme")));
        }
        profile.subject_draft_mut().uris = uris;
        Ok(())
    })
}

/// Replace the certificate policy identifiers.
#[must_use]
pub fn with_policy_identifiers(policies: Vec<Oid>) -> WithOption {
    option(move |profile| {
        profile.subject_draft_mut().policy_identifiers = policies;
        Ok(())
    })
}

/// Replace the path-length constraint.
///
/// Finalization still enforces the role's fixed path length, so this only
/// succeeds when it agrees with the role.
#[must_use]
pub fn with_path_length(max_path_len: Option<u8>) -> WithOption {
    option(move |profile| {
        profile.subject_draft_mut().max_path_len = max_path_len;
        Ok(())
    })
}

use chrono::{DateTime, TimeZone};
use safeguard_alert::{Alert, AlertDetails, DispatchReport, Dispatcher, GeoPoint, Language, Transport};
use safeguard_core::{ColorRaster, FaceMatcher, Verdict};
use safeguard_registry::{RegistryError, Subject, SubjectSource};
use std::fmt::Display;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),
}

/// Result of checking a sighting against the active subject.
#[derive(Debug)]
pub enum VerifyOutcome {
    /// Registry is empty; nothing to compare against.
    NoSubjectEnrolled,
    Checked { subject: Subject, verdict: Verdict },
}

#[derive(Debug)]
pub enum SosOutcome {
    NoSubjectEnrolled,
    Dispatched { subject: Subject, report: DispatchReport },
}

/// Compare `probe` against the most recently registered subject's photo.
///
/// The enrolled patch is re-derived from the stored photo on every call.
pub fn verify_latest<S: SubjectSource>(
    source: &S,
    matcher: &FaceMatcher,
    probe: &ColorRaster,
) -> Result<VerifyOutcome, ServiceError> {
    let Some(subject) = source.latest()? else {
        tracing::info!("verification requested with no subject registered");
        return Ok(VerifyOutcome::NoSubjectEnrolled);
    };

    let enrolled = ColorRaster::from_image(&subject.load_photo()?);
    let verdict = matcher.verify(&enrolled, probe);
    tracing::info!(
        subject = %subject.id,
        outcome = ?verdict.outcome,
        distance = ?verdict.distance,
        "sighting verified"
    );
    Ok(VerifyOutcome::Checked { subject, verdict })
}

/// Alert every configured guardian about the active subject at `location`.
pub fn raise_sos<S, T, Tz>(
    source: &S,
    dispatcher: &Dispatcher<T>,
    location: GeoPoint,
    language: Language,
    at: &DateTime<Tz>,
) -> Result<SosOutcome, ServiceError>
where
    S: SubjectSource,
    T: Transport,
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let Some(subject) = source.latest()? else {
        tracing::warn!("SOS raised with no subject registered");
        return Ok(SosOutcome::NoSubjectEnrolled);
    };

    let details = AlertDetails {
        name: subject.name.clone(),
        age: subject.age,
        clothing: subject.clothing.clone(),
        last_location: subject.last_location.clone(),
    };
    let alert = Alert::compose(&details, location, language, at);
    let report = dispatcher.dispatch(&alert);
    tracing::info!(
        subject = %subject.id,
        attempted = report.deliveries.len(),
        failed = report.failures().count(),
        "SOS dispatched"
    );
    Ok(SosOutcome::Dispatched { subject, report })
}

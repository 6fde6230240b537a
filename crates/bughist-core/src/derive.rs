//! Status-transition metrics, computed in one pass from past to present.

use chrono::{DateTime, TimeDelta, Utc};

use crate::{
  Error, Result,
  observe::{Observer, TimelineEvent},
  taxonomy::StatusTaxonomy,
  timeline::Timeline,
  version::DerivedAttributes,
};

const MS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

/// Whole days in `duration`, truncated.
fn whole_days(duration: TimeDelta) -> i64 {
  duration.num_milliseconds() / MS_PER_DAY
}

/// Derives per-version metrics for a timeline.
#[derive(Debug, Clone, Copy)]
pub struct MetricsDeriver<'t> {
  taxonomy: &'t StatusTaxonomy,
}

impl<'t> MetricsDeriver<'t> {
  pub fn new(taxonomy: &'t StatusTaxonomy) -> Self { Self { taxonomy } }

  /// Compute the attributes of every version, oldest first, without
  /// touching the timeline.
  ///
  /// A version whose `to` boundary lies after `now` is the latest one: it
  /// gets no time-in-status values and does not count towards accumulated
  /// open time.
  pub fn derive(
    &self,
    timeline: &Timeline,
    now: DateTime<Utc>,
  ) -> Result<Vec<DerivedAttributes>> {
    if timeline.is_empty() {
      return Err(Error::EmptyTimeline(timeline.id()));
    }

    let mut number: u64 = 1;
    let mut previous: Option<(&str, &str)> = None;
    let mut status_clock = TimeDelta::zero();
    let mut major_status_clock = TimeDelta::zero();
    let mut open_accumulated = TimeDelta::zero();
    let mut reopened: u32 = 0;
    let mut derived = Vec::with_capacity(timeline.len());

    for version in timeline {
      let is_latest = version.to() > now;
      let status = version.status().ok_or(Error::MissingStatus {
        bug_id: timeline.id(),
        number,
      })?;
      let major_status = self.taxonomy.major_status(status).ok_or_else(|| {
        Error::UnmappedStatus {
          bug_id: timeline.id(),
          status: status.to_owned(),
        }
      })?;

      let mut days_in_previous_status = None;
      let mut days_in_previous_major_status = None;
      if let Some((previous_status, previous_major_status)) = previous
        && status != previous_status
      {
        days_in_previous_status = Some(whole_days(status_clock));
        status_clock = TimeDelta::zero();
        if major_status != previous_major_status {
          if self.taxonomy.is_reopened(status) {
            reopened += 1;
          }
          days_in_previous_major_status = Some(whole_days(major_status_clock));
          major_status_clock = TimeDelta::zero();
        }
      }

      let duration = version.duration();
      status_clock += duration;
      major_status_clock += duration;
      if !is_latest && self.taxonomy.is_open(major_status) {
        open_accumulated += duration;
      }

      derived.push(DerivedAttributes {
        number,
        major_status: major_status.to_owned(),
        previous_status: previous.map(|(s, _)| s.to_owned()),
        previous_major_status: previous.map(|(_, m)| m.to_owned()),
        days_in_previous_status,
        days_in_previous_major_status,
        days_in_status: (!is_latest).then(|| whole_days(status_clock)),
        days_in_major_status: (!is_latest).then(|| whole_days(major_status_clock)),
        days_open_accumulated: whole_days(open_accumulated),
        times_reopened: reopened,
      });

      previous = Some((status, major_status));
      number += 1;
    }

    Ok(derived)
  }

  /// Derive and attach the attributes to every version.
  ///
  /// Either all versions are updated or, on error, none are.
  pub fn apply(
    &self,
    timeline: &mut Timeline,
    now: DateTime<Utc>,
    observer: &dyn Observer,
  ) -> Result<()> {
    let derived = self.derive(timeline, now)?;
    for (version, attributes) in timeline.versions.iter_mut().zip(derived) {
      version.attach_derived(attributes);
    }
    observer.observe(&TimelineEvent::Derived {
      bug_id:   timeline.id(),
      versions: timeline.len(),
    });
    Ok(())
  }
}

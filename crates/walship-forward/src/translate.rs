//! Sample Translation
//!
//! Builds the outbound metric for one decoded sample: the reserved name
//! label becomes the metric identifier, every other label carries over in
//! its original order, and the value and timestamp are forwarded verbatim.
//!
//! Every sample is emitted as an untyped scalar and counter resets are not
//! tracked, so the reset timestamp is always the `NO_TIMESTAMP` sentinel.

use walship_core::{
    Error, Labels, OutboundMetric, Result, Sample, METRIC_NAME_LABEL, NO_TIMESTAMP,
};

/// Translate one sample given its resolved labels.
///
/// Fails with `MissingMetricName` when the series carries no `__name__`
/// label; the caller drops the sample and counts the failure.
pub fn translate(labels: &Labels, sample: &Sample) -> Result<OutboundMetric> {
    let mut name = None;
    let mut carried = Vec::with_capacity(labels.len().saturating_sub(1));

    for label in labels.iter() {
        if label.name == METRIC_NAME_LABEL {
            name = Some(label.value.clone());
        } else {
            carried.push(label.clone());
        }
    }

    let name = name.ok_or(Error::MissingMetricName)?;

    Ok(OutboundMetric {
        name,
        labels: Labels::new(carried),
        value: sample.value,
        timestamp_ms: sample.timestamp_ms,
        reset_timestamp_ms: NO_TIMESTAMP,
    })
}

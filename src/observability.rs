use biometrics::{Collector, Counter, Moments};

pub(crate) static CLIENT_REQUESTS: Counter = Counter::new("sciquest.client.requests");
pub(crate) static CLIENT_REQUEST_ERRORS: Counter = Counter::new("sciquest.client.request_errors");
pub(crate) static CLIENT_REQUEST_DURATION: Moments =
    Moments::new("sciquest.client.request_duration_seconds");

pub(crate) static STREAM_FRAGMENTS: Counter = Counter::new("sciquest.stream.fragments");
pub(crate) static STREAM_ERRORS: Counter = Counter::new("sciquest.stream.errors");
pub(crate) static STREAM_BYTES: Counter = Counter::new("sciquest.stream.bytes");
pub(crate) static STREAM_TTFB: Moments = Moments::new("sciquest.stream.ttfb_seconds");
pub(crate) static STREAM_DURATION: Moments = Moments::new("sciquest.stream.duration_seconds");

pub(crate) static SESSION_TURNS: Counter = Counter::new("sciquest.session.turns");
pub(crate) static SESSION_TRUNCATED_TURNS: Counter =
    Counter::new("sciquest.session.truncated_turns");
pub(crate) static SESSION_RESETS: Counter = Counter::new("sciquest.session.resets");
pub(crate) static SESSION_FEEDBACK: Counter = Counter::new("sciquest.session.feedback");

/// Register this crate's biometrics with the provided collector.
pub fn register_biometrics(collector: Collector) {
    collector.register_counter(&CLIENT_REQUESTS);
    collector.register_counter(&CLIENT_REQUEST_ERRORS);
    collector.register_moments(&CLIENT_REQUEST_DURATION);

    collector.register_counter(&STREAM_FRAGMENTS);
    collector.register_counter(&STREAM_ERRORS);
    collector.register_counter(&STREAM_BYTES);
    collector.register_moments(&STREAM_TTFB);
    collector.register_moments(&STREAM_DURATION);

    collector.register_counter(&SESSION_TURNS);
    collector.register_counter(&SESSION_TRUNCATED_TURNS);
    collector.register_counter(&SESSION_RESETS);
    collector.register_counter(&SESSION_FEEDBACK);
}

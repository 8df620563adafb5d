use shared::metrics_defs::{MetricDef, MetricType};

pub const REQUEST_DURATION: MetricDef = MetricDef {
    name: "request.duration",
    metric_type: MetricType::Histogram,
    description: "Request duration in seconds. Tagged with status, handler.",
};

pub const REQUESTS_INFLIGHT: MetricDef = MetricDef {
    name: "requests.inflight",
    metric_type: MetricType::Gauge,
    description: "Number of requests currently being processed",
};

pub const EVENTS_SENT: MetricDef = MetricDef {
    name: "events.sent",
    metric_type: MetricType::Counter,
    description: "Events accepted by the conversions API. Tagged with action_source.",
};

pub const EVENTS_REJECTED: MetricDef = MetricDef {
    name: "events.rejected",
    metric_type: MetricType::Counter,
    description: "Events that failed before or during delivery. Tagged with handler, reason.",
};

pub const UPSTREAM_DURATION: MetricDef = MetricDef {
    name: "upstream.duration",
    metric_type: MetricType::Histogram,
    description: "Conversions API call duration in seconds. Tagged with outcome.",
};

pub const ALL_METRICS: &[MetricDef] = &[
    REQUEST_DURATION,
    REQUESTS_INFLIGHT,
    EVENTS_SENT,
    EVENTS_REJECTED,
    UPSTREAM_DURATION,
];

//! Common types for metrics definitions.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricType {
    Counter,
    Gauge,
    Histogram,
}

#[derive(Debug, Clone, Copy)]
pub struct MetricDef {
    pub name: &'static str,
    pub metric_type: MetricType,
    pub description: &'static str,
}

/// Registers the descriptions of `defs` with the installed recorder.
#[macro_export]
macro_rules! describe_metrics {
    ($defs:expr) => {
        for def in $defs {
            match def.metric_type {
                $crate::metrics_defs::MetricType::Counter => {
                    metrics::describe_counter!(def.name, def.description)
                }
                $crate::metrics_defs::MetricType::Gauge => {
                    metrics::describe_gauge!(def.name, def.description)
                }
                $crate::metrics_defs::MetricType::Histogram => {
                    metrics::describe_histogram!(def.name, def.description)
                }
            }
        }
    };
}

#[macro_export]
macro_rules! counter {
    ($def:expr) => {
        metrics::counter!($def.name)
    };
    ($def:expr, $($labels:tt)+) => {
        metrics::counter!($def.name, $($labels)+)
    };
}

#[macro_export]
macro_rules! gauge {
    ($def:expr) => {
        metrics::gauge!($def.name)
    };
    ($def:expr, $($labels:tt)+) => {
        metrics::gauge!($def.name, $($labels)+)
    };
}

#[macro_export]
macro_rules! histogram {
    ($def:expr) => {
        metrics::histogram!($def.name)
    };
    ($def:expr, $($labels:tt)+) => {
        metrics::histogram!($def.name, $($labels)+)
    };
}

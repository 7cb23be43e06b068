mod mock_otel_collector;
mod trace_integration_test;

pub use mock_otel_collector::MockOtelCollector;

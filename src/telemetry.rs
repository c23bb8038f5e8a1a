//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了日志与链路追踪的初始化。

use opentelemetry::global;
use opentelemetry::trace::TracerProvider;
use opentelemetry_sdk::trace::TracerProvider as SdkTracerProvider;
use tracing_subscriber::{layer::SubscriberExt, EnvFilter, Registry};

/// 初始化 tracing
///
/// 应在应用程序启动时调用一次。过滤级别优先读取 `RUST_LOG`，
/// 否则使用 `default_filter`。日志输出到 stderr，以免干扰命令行的标准输出；
/// 同时挂上 OpenTelemetry 层，未配置导出器时不产生开销。
///
/// 库本身不会调用此函数，全局 subscriber 由应用层决定。
pub fn init_tracing(service_name: &str, default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let provider = SdkTracerProvider::builder().build();
    global::set_tracer_provider(provider.clone());
    let tracer = provider.tracer(service_name.to_string());
    let telemetry = tracing_opentelemetry::layer().with_tracer(tracer);

    let subscriber = Registry::default()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(telemetry);

    // 可能已有其他 subscriber，忽略重复初始化
    let _ = tracing::subscriber::set_global_default(subscriber);
}

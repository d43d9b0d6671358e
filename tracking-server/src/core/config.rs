use std::time::Duration;

use shared::models::SlaSettings;

use crate::geo::EtaTuning;
use crate::hub::HubConfig;
use crate::tracking::IngestConfig;

/// 服务器配置 - 跟踪引擎的所有配置项
///
/// # 环境变量
///
/// 所有配置项都可以通过环境变量覆盖：
///
/// | 环境变量 | 默认值 | 说明 |
/// |----------|--------|------|
/// | HTTP_PORT | 3000 | HTTP/WS 服务端口 |
/// | ENVIRONMENT | development | 运行环境 |
/// | LOG_LEVEL | info | 日志等级 |
/// | LOG_DIR | (无) | 日志文件目录 |
/// | SETTINGS_SERVICE_URL | (无) | SLA 配置服务地址 |
/// | SETTINGS_REFRESH_SECS | 60 | SLA 配置刷新间隔 |
/// | SLA_TARGET_MINUTES | 45 | 配送时效目标（分钟） |
/// | SLA_EVAL_INTERVAL_SECS | 60 | SLA 重评估周期 |
/// | TRACKING_BUFFER_CAPACITY | 30 | 每订单尾随缓冲容量 |
/// | TRACKING_INACTIVITY_TIMEOUT_SECS | 1800 | 无 ping 后停止追踪 |
/// | ROOM_IDLE_TTL_SECS | 600 | 空闲房间回收阈值 |
/// | ROOM_SWEEP_INTERVAL_SECS | 60 | 房间清扫周期 |
/// | PING_SKEW_TOLERANCE_MS | 5000 | ping 时钟偏移容忍 |
/// | PING_DUPLICATE_EPSILON | 1e-6 | 重复坐标判定（度） |
/// | PING_SUBMIT_BUDGET_MS | 2000 | ping 提交软预算 |
/// | ETA_FALLBACK_SPEED_MPS | 6 | 无速度估计时的假定速度 |
/// | ETA_MIN_SPEED_MPS / ETA_MAX_SPEED_MPS | 1 / 25 | 速度钳制 |
/// | ETA_MIN_MINUTES / ETA_MAX_MINUTES | 3 / 45 | ETA 钳制 |
///
/// # 示例
///
/// ```ignore
/// HTTP_PORT=8080 SLA_TARGET_MINUTES=30 cargo run
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP API + WebSocket 服务端口
    pub http_port: u16,
    /// 运行环境: development | staging | production
    pub environment: String,
    /// 日志等级
    pub log_level: String,
    /// 日志文件目录（未设置则仅输出到控制台）
    pub log_dir: Option<String>,

    // === 协作服务 ===
    /// SLA 配置服务地址（未设置则使用默认配置）
    pub settings_url: Option<String>,
    /// SLA 配置刷新间隔（秒）
    pub settings_refresh_secs: u64,

    // === SLA ===
    /// 配送时效目标（分钟）
    pub sla_target_minutes: f64,
    /// 黄色阈值（剩余分钟数，未设置则按目标推导）
    pub sla_yellow_threshold_minutes: Option<f64>,
    /// 红色阈值（剩余分钟数，未设置则按目标推导）
    pub sla_red_threshold_minutes: Option<f64>,
    /// SLA 重评估周期（秒）
    pub sla_eval_interval_secs: u64,

    // === 房间与缓冲 ===
    /// 每订单尾随缓冲容量
    pub buffer_capacity: usize,
    /// 无 ping 后停止追踪（秒）
    pub inactivity_timeout_secs: u64,
    /// 空闲房间回收阈值（秒）
    pub room_idle_ttl_secs: u64,
    /// 房间清扫周期（秒）
    pub room_sweep_interval_secs: u64,

    // === ping 校验 ===
    /// ping 时钟偏移容忍（毫秒）
    pub ping_skew_tolerance_ms: i64,
    /// 重复坐标判定阈值（度）
    pub ping_duplicate_epsilon: f64,
    /// ping 提交软预算（毫秒）
    pub ping_submit_budget_ms: u64,

    // === ETA 调参 ===
    pub eta: EtaTuning,
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Config {
    /// 从环境变量加载配置
    ///
    /// 如果环境变量未设置，使用默认值
    pub fn from_env() -> Self {
        let eta_defaults = EtaTuning::default();
        Self {
            http_port: parse_env("HTTP_PORT", 3000),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into()),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".into()),
            log_dir: std::env::var("LOG_DIR").ok(),

            settings_url: std::env::var("SETTINGS_SERVICE_URL").ok(),
            settings_refresh_secs: parse_env("SETTINGS_REFRESH_SECS", 60),

            sla_target_minutes: parse_env("SLA_TARGET_MINUTES", 45.0),
            sla_yellow_threshold_minutes: std::env::var("SLA_YELLOW_THRESHOLD_MINUTES")
                .ok()
                .and_then(|v| v.parse().ok()),
            sla_red_threshold_minutes: std::env::var("SLA_RED_THRESHOLD_MINUTES")
                .ok()
                .and_then(|v| v.parse().ok()),
            sla_eval_interval_secs: parse_env("SLA_EVAL_INTERVAL_SECS", 60),

            buffer_capacity: parse_env("TRACKING_BUFFER_CAPACITY", 30),
            inactivity_timeout_secs: parse_env("TRACKING_INACTIVITY_TIMEOUT_SECS", 1800),
            room_idle_ttl_secs: parse_env("ROOM_IDLE_TTL_SECS", 600),
            room_sweep_interval_secs: parse_env("ROOM_SWEEP_INTERVAL_SECS", 60),

            ping_skew_tolerance_ms: parse_env("PING_SKEW_TOLERANCE_MS", 5_000),
            ping_duplicate_epsilon: parse_env("PING_DUPLICATE_EPSILON", 1e-6),
            ping_submit_budget_ms: parse_env("PING_SUBMIT_BUDGET_MS", 2_000),

            eta: EtaTuning {
                min_speed_mps: parse_env("ETA_MIN_SPEED_MPS", eta_defaults.min_speed_mps),
                max_speed_mps: parse_env("ETA_MAX_SPEED_MPS", eta_defaults.max_speed_mps),
                fallback_speed_mps: parse_env(
                    "ETA_FALLBACK_SPEED_MPS",
                    eta_defaults.fallback_speed_mps,
                ),
                min_eta_minutes: parse_env("ETA_MIN_MINUTES", eta_defaults.min_eta_minutes),
                max_eta_minutes: parse_env("ETA_MAX_MINUTES", eta_defaults.max_eta_minutes),
            },
        }
    }

    /// 使用自定义端口覆盖配置（测试用）
    pub fn with_port(http_port: u16) -> Self {
        let mut config = Self::from_env();
        config.http_port = http_port;
        config
    }

    pub fn hub_config(&self) -> HubConfig {
        HubConfig {
            buffer_capacity: self.buffer_capacity,
            inactivity_timeout_ms: self.inactivity_timeout_secs as i64 * 1000,
            idle_room_ttl_ms: self.room_idle_ttl_secs as i64 * 1000,
            sweep_interval: Duration::from_secs(self.room_sweep_interval_secs.max(1)),
            eta: self.eta,
        }
    }

    pub fn ingest_config(&self) -> IngestConfig {
        IngestConfig {
            clock_skew_tolerance_ms: self.ping_skew_tolerance_ms,
            duplicate_epsilon_deg: self.ping_duplicate_epsilon,
            submit_budget: Duration::from_millis(self.ping_submit_budget_ms),
        }
    }

    pub fn sla_defaults(&self) -> SlaSettings {
        SlaSettings {
            target_minutes: self.sla_target_minutes,
            yellow_threshold_minutes: self.sla_yellow_threshold_minutes,
            red_threshold_minutes: self.sla_red_threshold_minutes,
        }
    }
}

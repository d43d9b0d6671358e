/// 获取当前 UTC 时间戳（毫秒）
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// 毫秒时间戳 → 分钟差（向上取整，不小于 0）
///
/// 用于 SLA 倒计时：已用/剩余时间都以整分钟呈现。
pub fn millis_to_minutes_ceil(delta_ms: i64) -> i64 {
    if delta_ms <= 0 {
        return 0;
    }
    (delta_ms as u64).div_ceil(60_000) as i64
}

//! Tracking Server - 生鲜杂货配送的实时订单与配送追踪引擎
//!
//! # 架构概述
//!
//! 本模块是跟踪引擎的主入口，提供以下核心功能：
//!
//! - **订阅中心** (`hub`): 按房间隔离的实时事件扇出 + 库存广播
//! - **订单生命周期** (`orders`): 状态机转换、按订单串行化、幂等
//! - **位置摄入** (`tracking`): ping 校验、车队位置、尾随缓冲
//! - **地理计算** (`geo`): 大圆距离、速度估计、ETA 投影
//! - **SLA 评估** (`sla`): 倒计时红绿灯 + 周期性重评估
//! - **HTTP/WS API** (`api`): REST 入口和实时订阅会话
//!
//! # 模块结构
//!
//! ```text
//! tracking-server/src/
//! ├── core/          # 配置、状态、服务器
//! ├── hub/           # 房间注册与事件扇出
//! ├── orders/        # 订单生命周期引擎
//! ├── tracking/      # ping 摄入与尾随缓冲
//! ├── geo.rs         # 纯地理函数
//! ├── sla/           # SLA 评估与监控
//! ├── clients/       # 协作服务客户端
//! ├── api/           # HTTP 路由和 WS 会话
//! └── utils/         # 错误映射、日志
//! ```

pub mod api;
pub mod clients;
pub mod core;
pub mod geo;
pub mod hub;
pub mod orders;
pub mod sla;
pub mod tracking;
pub mod utils;

// Re-export 公共类型
pub use crate::core::{Config, Server, ServerState};
pub use hub::{HubEvent, InventoryBroadcastHub, RoomKey, SubscriptionHub};
pub use orders::{OrdersManager, TransitionCommand};
pub use tracking::LocationIngest;
pub use utils::{ApiError, ApiResponse};

// Re-export logger functions
pub use utils::logger::{init_logger, init_logger_with_file};

/// 设置运行环境 (dotenv + 日志)
pub fn setup_environment() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();

    let log_level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".into());
    let log_dir = std::env::var("LOG_DIR").ok();
    init_logger_with_file(Some(&log_level), log_dir.as_deref());

    Ok(())
}

pub fn print_banner() {
    println!(
        r#"
  ______                __   _
 /_  __/________ ______/ /__(_)___  ____ _
  / / / ___/ __ `/ ___/ //_/ / __ \/ __ `/
 / / / /  / /_/ / /__/ ,< / / / / / /_/ /
/_/ /_/   \__,_/\___/_/|_/_/_/ /_/\__, /
                                 /____/
    "#
    );
}

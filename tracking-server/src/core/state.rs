use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::clients::SettingsClient;
use crate::core::Config;
use crate::hub::{InventoryBroadcastHub, SubscriptionHub};
use crate::orders::{MemoryOrderStore, OrdersManager};
use crate::sla::SlaMonitor;
use crate::tracking::LocationIngest;

/// 服务器状态 - 持有所有服务的单例引用
///
/// ServerState 是跟踪引擎的核心数据结构，持有所有服务的共享引用。
/// 使用 Arc 实现浅拷贝，所有权成本极低。
///
/// # 服务组件
///
/// | 字段 | 类型 | 说明 |
/// |------|------|------|
/// | config | Config | 配置项 (不可变) |
/// | hub | Arc<SubscriptionHub> | 房间注册与事件扇出 |
/// | inventory | InventoryBroadcastHub | 门店库存广播 |
/// | ingest | Arc<LocationIngest> | ping 校验与路由 |
/// | orders | Arc<OrdersManager> | 订单生命周期 |
/// | settings | Arc<SettingsClient> | SLA 配置获取 |
#[derive(Clone)]
pub struct ServerState {
    /// 服务器配置
    pub config: Config,
    /// 订阅中心
    pub hub: Arc<SubscriptionHub>,
    /// 库存广播
    pub inventory: InventoryBroadcastHub,
    /// 位置摄入
    pub ingest: Arc<LocationIngest>,
    /// 订单生命周期管理
    pub orders: Arc<OrdersManager>,
    /// SLA 配置客户端
    pub settings: Arc<SettingsClient>,
    /// 关闭信号令牌
    pub shutdown_token: CancellationToken,
}

impl ServerState {
    /// 初始化服务器状态
    ///
    /// 按依赖顺序构建：hub → ingest/inventory → orders → settings
    pub fn initialize(config: &Config) -> Self {
        let hub = Arc::new(SubscriptionHub::new(config.hub_config()));
        let inventory = InventoryBroadcastHub::new(Arc::clone(&hub));
        let ingest = Arc::new(LocationIngest::new(
            Arc::clone(&hub),
            config.ingest_config(),
        ));
        let orders = Arc::new(OrdersManager::new(
            Arc::new(MemoryOrderStore::new()),
            Arc::clone(&hub),
        ));
        let settings = Arc::new(SettingsClient::new(
            config.settings_url.clone(),
            config.sla_defaults(),
            Duration::from_secs(config.settings_refresh_secs.max(1)),
        ));

        Self {
            config: config.clone(),
            hub,
            inventory,
            ingest,
            orders,
            settings,
            shutdown_token: CancellationToken::new(),
        }
    }

    /// 启动后台任务
    ///
    /// 必须在 `Server::run()` 之前调用
    ///
    /// 启动的任务：
    /// - 房间清扫器（缓冲失活 + 空闲房间回收）
    /// - SLA 监控（固定周期重评估）
    pub fn start_background_tasks(&self) {
        Arc::clone(&self.hub).spawn_sweeper(self.shutdown_token.clone());

        let monitor = SlaMonitor::new(
            Arc::clone(&self.orders),
            Arc::clone(&self.hub),
            Arc::clone(&self.settings),
            Duration::from_secs(self.config.sla_eval_interval_secs.max(1)),
        );
        monitor.spawn(self.shutdown_token.clone());

        tracing::debug!("Background tasks started");
    }

    /// 优雅关闭：取消所有后台任务
    pub fn shutdown(&self) {
        tracing::info!("Shutting down tracking engine");
        self.shutdown_token.cancel();
    }
}

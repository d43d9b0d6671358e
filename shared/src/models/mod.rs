//! 数据模型 - 跟踪引擎的共享实体类型
//!
//! # 内容
//!
//! - [`Order`] / [`OrderStatus`] - 订单与生命周期状态
//! - [`LocationPing`] / [`RiderPosition`] - 骑手位置
//! - [`SlaSettings`] / [`TrafficLight`] - 配送时效配置与红绿灯状态

pub mod location;
pub mod order;
pub mod sla;

pub use location::{LocationPing, RiderPosition};
pub use order::{Actor, Order, OrderStatus, PaymentStatus};
pub use sla::{SlaSettings, TrafficLight};

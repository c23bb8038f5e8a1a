//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了按键合并并发计算的登记表。
//!
//! 第一个未命中的调用方成为 leader 负责计算；同一时刻的其他调用方成为
//! follower，等待 leader 结束后重新读取缓存。leader 的守卫在 drop 时
//! 移除登记并唤醒等待者，因此 leader 被取消或 panic 也不会让 follower 永久挂起。

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::watch;

/// 并发计算登记表
#[derive(Clone, Default)]
pub struct InFlightRegistry {
    /// 正在计算的键
    in_flight: Arc<DashMap<String, watch::Receiver<bool>>>,
}

/// 调用方在一次未命中中的角色
pub enum Flight {
    Leader(LeaderGuard),
    Follower(FlightWaiter),
}

/// leader 持有的守卫
pub struct LeaderGuard {
    key: String,
    done: watch::Sender<bool>,
    in_flight: Arc<DashMap<String, watch::Receiver<bool>>>,
}

/// follower 的等待句柄
pub struct FlightWaiter {
    done: watch::Receiver<bool>,
}

impl InFlightRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 登记一次计算
    pub fn acquire(&self, key: &str) -> Flight {
        match self.in_flight.entry(key.to_string()) {
            Entry::Occupied(entry) => Flight::Follower(FlightWaiter {
                done: entry.get().clone(),
            }),
            Entry::Vacant(entry) => {
                let (tx, rx) = watch::channel(false);
                entry.insert(rx);
                Flight::Leader(LeaderGuard {
                    key: key.to_string(),
                    done: tx,
                    in_flight: self.in_flight.clone(),
                })
            }
        }
    }

    /// 当前正在计算的键数量
    pub fn len(&self) -> usize {
        self.in_flight.len()
    }

    pub fn is_empty(&self) -> bool {
        self.in_flight.is_empty()
    }
}

impl Drop for LeaderGuard {
    fn drop(&mut self) {
        self.in_flight.remove(&self.key);
        let _ = self.done.send(true);
    }
}

impl FlightWaiter {
    /// 等待 leader 结束（无论成功、失败还是被取消）
    pub async fn wait(mut self) {
        // 发送端被 drop 时 wait_for 返回错误，同样视为结束
        let _ = self.done.wait_for(|finished| *finished).await;
    }
}

use std::time::{Duration, Instant};

/// 绝对截止时间点，约束后续阻塞 I/O 的最长等待。
///
/// # 教案级注释
///
/// ## 意图（Why）
/// - 与 `spark-core` 的 `Deadline` 一致，以“绝对时间点”而非“持续时长”表达超时，
///   使同一截止点可以跨多次读写复用；
/// - `Deadline::none()` 表示未设置，即关闭超时。
///
/// ## 契约（What）
/// - `at`：以单调时钟 [`Instant`] 构造；
/// - `after`：以“当前时间 + 时长”构造，时长溢出时等同于未设置；
/// - `remaining`：给定当前时间，返回剩余时长；未设置返回 `None`，已过期返回 `Some(Duration::ZERO)`。
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Deadline {
    instant: Option<Instant>,
}

impl Deadline {
    /// 未设置截止时间。
    pub const fn none() -> Self {
        Self { instant: None }
    }

    /// 根据绝对时间点构造截止时间。
    pub const fn at(instant: Instant) -> Self {
        Self {
            instant: Some(instant),
        }
    }

    /// 以当前时刻加 `timeout` 构造截止时间。
    pub fn after(timeout: Duration) -> Self {
        // 溢出时视为永不到期。
        Instant::now()
            .checked_add(timeout)
            .map_or(Self::none(), Self::at)
    }

    /// 返回内部时间点。
    pub const fn instant(&self) -> Option<Instant> {
        self.instant
    }

    /// 是否设置了截止时间。
    pub const fn is_set(&self) -> bool {
        self.instant.is_some()
    }

    /// 判断在 `now` 时刻是否已经超时。
    pub fn is_expired(&self, now: Instant) -> bool {
        match self.instant {
            Some(target) => target <= now,
            None => false,
        }
    }

    /// 计算距离截止时间的剩余时长。
    pub fn remaining(&self, now: Instant) -> Option<Duration> {
        self.instant
            .map(|target| target.saturating_duration_since(now))
    }
}

impl From<Instant> for Deadline {
    fn from(instant: Instant) -> Self {
        Self::at(instant)
    }
}

impl From<Option<Instant>> for Deadline {
    fn from(instant: Option<Instant>) -> Self {
        Self { instant }
    }
}

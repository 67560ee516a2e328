//! # error 模块说明
//!
//! ## 角色定位（Why）
//! - 集中定义 VSOCK 建连与读写路径上的全部失败语义：分配失败、建连失败、本地地址查询失败、
//!   I/O 故障、截止超时与“已关闭”；
//! - 每个错误携带稳定错误码与 [`ErrorCategory`]，便于上层观测与策略决策，但本层自身从不重试。
//!
//! ## 设计要求（What）
//! - 错误类型派生 `thiserror::Error`，兼容 `std::error::Error` 与 `?` 传播；
//! - [`OperationKind`] 表格为每个底层操作提供错误码与默认文案；
//! - 可无损转换为 [`std::io::Error`]，以支撑 `Read`/`Write` 实现。

use crate::addr::VsockAddr;
use std::io;
use thiserror::Error;

/// 描述一次底层操作对应的稳定错误码与默认文案。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct OperationKind {
    pub code: &'static str,
    pub message: &'static str,
}

pub const SOCKET: OperationKind = OperationKind {
    code: "spark.transport.vsock.socket_failed",
    message: "vsock socket",
};
pub const CONNECT: OperationKind = OperationKind {
    code: "spark.transport.vsock.connect_failed",
    message: "vsock connect",
};
pub const LOCAL_ADDR: OperationKind = OperationKind {
    code: "spark.transport.vsock.local_addr_failed",
    message: "vsock local_addr",
};
pub const READ: OperationKind = OperationKind {
    code: "spark.transport.vsock.read_failed",
    message: "vsock read",
};
pub const WRITE: OperationKind = OperationKind {
    code: "spark.transport.vsock.write_failed",
    message: "vsock write",
};
pub const SET_DEADLINE: OperationKind = OperationKind {
    code: "spark.transport.vsock.set_deadline_failed",
    message: "vsock set_deadline",
};
pub const SHUTDOWN: OperationKind = OperationKind {
    code: "spark.transport.vsock.shutdown_failed",
    message: "vsock shutdown",
};
pub const CONFIGURE: OperationKind = OperationKind {
    code: "spark.transport.vsock.configure_failed",
    message: "vsock configure",
};
pub const CLOSE: OperationKind = OperationKind {
    code: "spark.transport.vsock.close_failed",
    message: "vsock close",
};

const TIMEOUT_CODE: &str = "spark.transport.vsock.timeout";
const CLOSED_CODE: &str = "spark.transport.vsock.closed";

/// 错误分类，供上层决定是否换路、告警或放弃。
///
/// - `Timeout`：截止时间到期，连接本身仍可用；
/// - `Closed`：连接已被本端关闭，后续调用都会失败；
/// - `Retryable`：对端拒绝、重置等瞬时故障，重试与否由调用方决定；
/// - `NonRetryable`：权限、地址族不支持等确定性失败。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ErrorCategory {
    Timeout,
    Closed,
    Retryable,
    NonRetryable,
}

/// VSOCK 传输错误域。
///
/// # 教案式说明
/// - **意图 (Why)**：将建连三步（分配、建连、本地地址查询）与连接期 I/O 的失败区分开，
///   使调用方无需解析系统错误文本即可判断失败阶段。
/// - **契约 (What)**：
///   - `Socket`/`Connect`/`LocalAddr` 只出现在建连阶段，后两者返回前描述符已被释放；
///   - `Timeout` 与 `Closed` 不携带系统错误，分别对应截止到期与本端关闭；
///   - 其余 I/O 故障统一归入 `Io`，`op` 指明失败的操作。
/// - **风险 (Trade-offs)**：系统错误以 `io::Error` 原样保留，因此该类型不可 `Clone`。
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum VsockError {
    /// 内核拒绝分配套接字描述符（资源耗尽、权限或平台不支持）。
    #[error("vsock socket: {source}")]
    Socket {
        #[source]
        source: io::Error,
    },

    /// 对端不可达、拒绝连接或 CID/端口无效。
    #[error("vsock connect to {remote}: {source}")]
    Connect {
        remote: VsockAddr,
        #[source]
        source: io::Error,
    },

    /// 建连成功后无法取得本地绑定地址。
    #[error("vsock local_addr: {source}")]
    LocalAddr {
        #[source]
        source: io::Error,
    },

    /// 连接期的读写、半关闭或配置故障。
    #[error("{}: {source}", .op.message)]
    Io {
        op: OperationKind,
        #[source]
        source: io::Error,
    },

    /// 截止时间到期。
    #[error("{} timed out", .op.message)]
    Timeout { op: OperationKind },

    /// 连接已关闭。
    #[error("{}: use of closed connection", .op.message)]
    Closed { op: OperationKind },
}

impl VsockError {
    /// 构造 I/O 故障。
    pub fn io(op: OperationKind, source: io::Error) -> Self {
        Self::Io { op, source }
    }

    /// 构造超时错误。
    pub fn timeout(op: OperationKind) -> Self {
        Self::Timeout { op }
    }

    /// 构造“已关闭”错误。
    pub fn closed(op: OperationKind) -> Self {
        Self::Closed { op }
    }

    /// 失败的底层操作。
    pub fn operation(&self) -> OperationKind {
        match self {
            Self::Socket { .. } => SOCKET,
            Self::Connect { .. } => CONNECT,
            Self::LocalAddr { .. } => LOCAL_ADDR,
            Self::Io { op, .. } | Self::Timeout { op } | Self::Closed { op } => *op,
        }
    }

    /// 稳定错误码，适合作为指标标签。
    pub fn code(&self) -> &'static str {
        match self {
            Self::Timeout { .. } => TIMEOUT_CODE,
            Self::Closed { .. } => CLOSED_CODE,
            _ => self.operation().code,
        }
    }

    /// 错误分类。
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Timeout { .. } => ErrorCategory::Timeout,
            Self::Closed { .. } => ErrorCategory::Closed,
            Self::Socket { source }
            | Self::Connect { source, .. }
            | Self::LocalAddr { source }
            | Self::Io { source, .. } => categorize_io_error(source),
        }
    }

    /// 底层系统错误（若存在）。
    pub fn io_error(&self) -> Option<&io::Error> {
        match self {
            Self::Socket { source }
            | Self::Connect { source, .. }
            | Self::LocalAddr { source }
            | Self::Io { source, .. } => Some(source),
            Self::Timeout { .. } | Self::Closed { .. } => None,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Closed { .. })
    }

    fn io_kind(&self) -> io::ErrorKind {
        match self {
            Self::Timeout { .. } => io::ErrorKind::TimedOut,
            Self::Closed { .. } => io::ErrorKind::NotConnected,
            _ => self
                .io_error()
                .map_or(io::ErrorKind::Other, io::Error::kind),
        }
    }
}

impl From<VsockError> for io::Error {
    fn from(error: VsockError) -> Self {
        io::Error::new(error.io_kind(), error)
    }
}

/// 将连接期 I/O 错误映射为 [`VsockError`]。
///
/// 启用了截止时间时，`SO_RCVTIMEO`/`SO_SNDTIMEO` 到期会以 `EAGAIN` 返回，此时统一视为超时。
pub(crate) fn map_io_error(
    op: OperationKind,
    error: io::Error,
    deadline_armed: bool,
) -> VsockError {
    match error.kind() {
        io::ErrorKind::TimedOut => VsockError::timeout(op),
        io::ErrorKind::WouldBlock if deadline_armed => VsockError::timeout(op),
        _ => VsockError::io(op, error),
    }
}

fn categorize_io_error(error: &io::Error) -> ErrorCategory {
    use io::ErrorKind;
    match error.kind() {
        ErrorKind::TimedOut => ErrorCategory::Timeout,
        ErrorKind::WouldBlock
        | ErrorKind::Interrupted
        | ErrorKind::ConnectionRefused
        | ErrorKind::ConnectionReset
        | ErrorKind::ConnectionAborted
        | ErrorKind::NotConnected
        | ErrorKind::AddrInUse
        | ErrorKind::AddrNotAvailable
        | ErrorKind::BrokenPipe
        | ErrorKind::WriteZero => ErrorCategory::Retryable,
        // 权限、平台不支持、地址无效等。
        _ => ErrorCategory::NonRetryable,
    }
}

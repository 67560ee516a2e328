use crate::{
    addr::VsockAddr,
    deadline::Deadline,
    descriptor::{DescriptorProvider, ShutdownDirection, StreamDescriptor},
    error::{self, CONFIGURE, OperationKind, VsockError, map_io_error},
};
use parking_lot::Mutex;
use socket2::Socket;
use std::{
    io::{self, Read, Write},
    net::Shutdown as StdShutdown,
    time::{Duration, Instant},
};

/// VSOCK 套接字级配置项。
///
/// # 教案级注释
///
/// ## 意图（Why）
/// - 将建连握手的超时与关闭阶段的 `SO_LINGER` 行为显式配置化，避免调用方直接操作 `socket2`；
/// - 与 `TcpSocketConfig` 保持同样的 Builder 形态，方便在不同传输之间迁移配置代码。
///
/// ## 契约（What）
/// - `connect_timeout`：`Some(dur)` 时建连最多等待 `dur`，超时以
///   [`VsockError::Connect`] 返回且底层错误为 `TimedOut`；`None` 表示阻塞直至内核给出结果；
/// - `linger`：`Some(dur)` 时在分配套接字后立即写入 `SO_LINGER`；`None` 沿用内核默认。
///
/// ## 注意事项（Trade-offs）
/// - `Duration::ZERO` 的建连超时在分配套接字时即以 `InvalidInput` 拒绝，不会等到握手阶段；
/// - 建连超时只约束握手本身，与连接期的读写截止时间相互独立。
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VsockSocketConfig {
    connect_timeout: Option<Duration>,
    linger: Option<Duration>,
}

impl VsockSocketConfig {
    /// 创建默认配置：无建连超时，沿用内核 `SO_LINGER`。
    pub const fn new() -> Self {
        Self {
            connect_timeout: None,
            linger: None,
        }
    }

    /// 设置建连超时。
    pub fn with_connect_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// 设置 `SO_LINGER` 超时时长。
    pub fn with_linger(mut self, linger: Option<Duration>) -> Self {
        self.linger = linger;
        self
    }

    /// 读取建连超时。
    pub fn connect_timeout(&self) -> Option<Duration> {
        self.connect_timeout
    }

    /// 读取 `SO_LINGER` 配置。
    pub fn linger(&self) -> Option<Duration> {
        self.linger
    }

    fn apply(&self, socket: &Socket) -> io::Result<()> {
        if self.connect_timeout == Some(Duration::ZERO) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "vsock connect timeout must be non-zero",
            ));
        }
        if let Some(linger) = self.linger {
            socket.set_linger(Some(linger))?;
        }
        Ok(())
    }
}

/// 基于 `socket2` 的 VSOCK 描述符实现。
///
/// # 教案式注释
///
/// ## 意图 (Why)
/// - 作为 [`StreamDescriptor`] 的生产实现，直接持有内核描述符，不引入任何异步运行时；
/// - 把“绝对截止时间”翻译为内核的 `SO_RCVTIMEO`/`SO_SNDTIMEO`。
///
/// ## 逻辑 (How)
/// - 描述符存放于 `Option<Socket>`：`close` 取出并释放，之后的调用在触达内核前即返回
///   [`VsockError::Closed`]；
/// - 读写前读取对应方向的截止时间：未设置则清除内核超时；已过期直接返回超时；
///   否则把剩余时长写入套接字选项再发起一次系统调用；
/// - 截止时间以 `parking_lot::Mutex` 保存，读、写两个方向互不阻塞。
///
/// ## 契约 (What)
/// - 每次 `read`/`write` 只执行一次系统调用，部分结果原样返回；
/// - 截止到期不会关闭描述符，清除截止时间后可继续读写。
///
/// ## 注意事项 (Trade-offs)
/// - 每次 I/O 都会重新写入一次超时选项，多一次 `setsockopt` 换取截止语义的准确性；
/// - 内核超时精度为微秒，剩余不足 1µs 时按 1µs 处理。
#[derive(Debug)]
pub struct VsockSocket {
    socket: Option<Socket>,
    read_deadline: Mutex<Deadline>,
    write_deadline: Mutex<Deadline>,
    config: VsockSocketConfig,
}

impl VsockSocket {
    /// 分配一个新的 VSOCK 流式套接字并应用配置。
    pub fn open(config: VsockSocketConfig) -> Result<Self, VsockError> {
        let socket = sys::stream_socket().map_err(|source| VsockError::Socket { source })?;
        Self::configure(socket, config)
    }

    /// 对新分配的套接字应用配置；失败时 `socket` 随作用域释放。
    fn configure(socket: Socket, config: VsockSocketConfig) -> Result<Self, VsockError> {
        config
            .apply(&socket)
            .map_err(|err| VsockError::io(CONFIGURE, err))?;
        Ok(Self::from_socket(socket, config))
    }

    pub(crate) fn from_socket(socket: Socket, config: VsockSocketConfig) -> Self {
        Self {
            socket: Some(socket),
            read_deadline: Mutex::new(Deadline::none()),
            write_deadline: Mutex::new(Deadline::none()),
            config,
        }
    }

    /// 返回构造时使用的套接字配置。
    pub fn config(&self) -> &VsockSocketConfig {
        &self.config
    }

    /// 描述符是否已关闭。
    pub fn is_closed(&self) -> bool {
        self.socket.is_none()
    }

    fn socket(&self, op: OperationKind) -> Result<&Socket, VsockError> {
        self.socket.as_ref().ok_or_else(|| VsockError::closed(op))
    }
}

/// `timeval` 的最小非零精度。
const MIN_KERNEL_TIMEOUT: Duration = Duration::from_micros(1);

/// 把截止时间写入内核超时选项，返回本次操作是否处于“已布防”状态。
///
/// 内核把零值超时解释为“永不超时”，因此不足 [`MIN_KERNEL_TIMEOUT`] 的剩余时长向上取整。
fn arm_timeout(
    deadline: Deadline,
    now: Instant,
    op: OperationKind,
    set_timeout: impl FnOnce(Option<Duration>) -> io::Result<()>,
) -> Result<bool, VsockError> {
    match deadline.remaining(now) {
        None => {
            set_timeout(None).map_err(|err| VsockError::io(CONFIGURE, err))?;
            Ok(false)
        }
        Some(remaining) if remaining.is_zero() => Err(VsockError::timeout(op)),
        Some(remaining) => {
            set_timeout(Some(remaining.max(MIN_KERNEL_TIMEOUT)))
                .map_err(|err| VsockError::io(CONFIGURE, err))?;
            Ok(true)
        }
    }
}

impl StreamDescriptor for VsockSocket {
    fn connect(&self, remote: VsockAddr) -> Result<(), VsockError> {
        let socket = self.socket(error::CONNECT)?;
        let result = sys::sock_addr(remote).and_then(|addr| match self.config.connect_timeout {
            Some(timeout) => socket.connect_timeout(&addr, timeout),
            None => socket.connect(&addr),
        });
        result.map_err(|source| VsockError::Connect { remote, source })
    }

    fn local_addr(&self) -> Result<VsockAddr, VsockError> {
        let socket = self.socket(error::LOCAL_ADDR)?;
        let addr = socket
            .local_addr()
            .map_err(|source| VsockError::LocalAddr { source })?;
        sys::vsock_addr(&addr).ok_or_else(|| VsockError::LocalAddr {
            source: io::Error::new(
                io::ErrorKind::InvalidData,
                "getsockname returned a non-vsock address family",
            ),
        })
    }

    fn read(&self, buf: &mut [u8]) -> Result<usize, VsockError> {
        let mut socket = self.socket(error::READ)?;
        let deadline = *self.read_deadline.lock();
        let armed = arm_timeout(deadline, Instant::now(), error::READ, |timeout| {
            socket.set_read_timeout(timeout)
        })?;
        socket
            .read(buf)
            .map_err(|err| map_io_error(error::READ, err, armed))
    }

    fn write(&self, buf: &[u8]) -> Result<usize, VsockError> {
        let mut socket = self.socket(error::WRITE)?;
        let deadline = *self.write_deadline.lock();
        let armed = arm_timeout(deadline, Instant::now(), error::WRITE, |timeout| {
            socket.set_write_timeout(timeout)
        })?;
        socket
            .write(buf)
            .map_err(|err| map_io_error(error::WRITE, err, armed))
    }

    fn set_read_deadline(&self, deadline: Deadline) -> Result<(), VsockError> {
        self.socket(error::SET_DEADLINE)?;
        *self.read_deadline.lock() = deadline;
        Ok(())
    }

    fn set_write_deadline(&self, deadline: Deadline) -> Result<(), VsockError> {
        self.socket(error::SET_DEADLINE)?;
        *self.write_deadline.lock() = deadline;
        Ok(())
    }

    fn shutdown(&self, direction: ShutdownDirection) -> Result<(), VsockError> {
        let socket = self.socket(error::SHUTDOWN)?;
        let how = match direction {
            ShutdownDirection::Read => StdShutdown::Read,
            ShutdownDirection::Write => StdShutdown::Write,
            ShutdownDirection::Both => StdShutdown::Both,
        };
        socket
            .shutdown(how)
            .map_err(|err| VsockError::io(error::SHUTDOWN, err))
    }

    fn close(&mut self) -> Result<(), VsockError> {
        match self.socket.take() {
            Some(socket) => {
                drop(socket);
                tracing::trace!(target: "spark::transport::vsock", "vsock descriptor closed");
                Ok(())
            }
            None => Err(VsockError::closed(error::CLOSE)),
        }
    }
}

/// 系统描述符工厂：每次 `open` 分配一个真实的 VSOCK 套接字。
#[derive(Clone, Debug, Default)]
pub struct SystemSockets {
    config: VsockSocketConfig,
}

impl SystemSockets {
    pub const fn new(config: VsockSocketConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &VsockSocketConfig {
        &self.config
    }
}

impl DescriptorProvider for SystemSockets {
    type Descriptor = VsockSocket;

    fn open(&self) -> Result<VsockSocket, VsockError> {
        VsockSocket::open(self.config.clone())
    }
}

#[cfg(any(target_os = "android", target_os = "linux"))]
mod sys {
    use crate::addr::VsockAddr;
    use socket2::{Domain, SockAddr, Socket, Type};
    use std::io;

    pub(super) fn stream_socket() -> io::Result<Socket> {
        Socket::new(Domain::VSOCK, Type::STREAM, None)
    }

    pub(super) fn sock_addr(addr: VsockAddr) -> io::Result<SockAddr> {
        Ok(SockAddr::vsock(addr.context_id(), addr.port()))
    }

    pub(super) fn vsock_addr(addr: &SockAddr) -> Option<VsockAddr> {
        addr.as_vsock_address().map(VsockAddr::from)
    }
}

#[cfg(not(any(target_os = "android", target_os = "linux")))]
mod sys {
    use crate::addr::VsockAddr;
    use socket2::{SockAddr, Socket};
    use std::io;

    fn unsupported() -> io::Error {
        io::Error::new(
            io::ErrorKind::Unsupported,
            "vsock is only available on linux and android",
        )
    }

    pub(super) fn stream_socket() -> io::Result<Socket> {
        Err(unsupported())
    }

    pub(super) fn sock_addr(_addr: VsockAddr) -> io::Result<SockAddr> {
        Err(unsupported())
    }

    pub(super) fn vsock_addr(_addr: &SockAddr) -> Option<VsockAddr> {
        None
    }
}

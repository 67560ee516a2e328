use crate::{addr::VsockAddr, deadline::Deadline, error::VsockError};

/// 半关闭方向。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ShutdownDirection {
    /// 关闭读方向，后续读取立即返回 EOF。
    Read,
    /// 关闭写方向，对端读取将观察到 EOF。
    Write,
    /// 同时关闭读写方向。
    Both,
}

/// 单个已打开 VSOCK 流式套接字的能力抽象。
///
/// # 教案级注释
///
/// ## 意图（Why）
/// - 将“内核描述符”抽象为 trait，使 [`VsockDialer`](crate::VsockDialer) 与
///   [`VsockConnection`](crate::VsockConnection) 可以在没有真实内核支持的环境中，
///   针对模拟实现验证失败注入与资源回收；
/// - 生产实现见 [`VsockSocket`](crate::VsockSocket)。
///
/// ## 契约（What）
/// - `connect`：阻塞（或受配置的超时约束）完成到 `remote` 的握手，失败返回
///   [`VsockError::Connect`]；
/// - `local_addr`：建连后查询内核分配的本地地址，失败返回 [`VsockError::LocalAddr`]；
/// - `read`/`write`：只执行一次系统调用，返回实际字节数；部分读写是合法结果，
///   实现不得在内部重试或聚合；
/// - 三个 `set_*deadline`：为后续阻塞操作设定绝对截止时间，到期以
///   [`VsockError::Timeout`] 体现，且不影响描述符本身的可用性；
/// - `close`：释放描述符，之后所有操作（包括再次 `close`）都返回 [`VsockError::Closed`]，
///   且不再触达内核。
///
/// ## 并发（Concurrency）
/// - 除 `close` 外的方法均以 `&self` 调用：一个读者与一个写者可在不同线程并行推进；
///   两个并发读者或两个并发写者由调用方自行串行化；
/// - `close` 需要 `&mut self`，借用检查保证其不会与进行中的读写竞争。
pub trait StreamDescriptor: Send {
    /// 建立到 `remote` 的连接。
    fn connect(&self, remote: VsockAddr) -> Result<(), VsockError>;

    /// 查询建连后内核绑定的本地地址。
    fn local_addr(&self) -> Result<VsockAddr, VsockError>;

    /// 读取数据，`Ok(0)` 表示对端已关闭写方向。
    fn read(&self, buf: &mut [u8]) -> Result<usize, VsockError>;

    /// 写入数据，返回实际写入的字节数。
    fn write(&self, buf: &[u8]) -> Result<usize, VsockError>;

    /// 同时设置读、写两个方向的截止时间。
    fn set_deadline(&self, deadline: Deadline) -> Result<(), VsockError> {
        self.set_read_deadline(deadline)?;
        self.set_write_deadline(deadline)
    }

    /// 设置读方向截止时间。
    fn set_read_deadline(&self, deadline: Deadline) -> Result<(), VsockError>;

    /// 设置写方向截止时间。
    fn set_write_deadline(&self, deadline: Deadline) -> Result<(), VsockError>;

    /// 按方向执行半关闭。
    fn shutdown(&self, direction: ShutdownDirection) -> Result<(), VsockError>;

    /// 释放描述符。
    fn close(&mut self) -> Result<(), VsockError>;
}

/// 描述符工厂，对应建连序列的第一步“分配套接字”。
///
/// 拆出独立 trait 是为了让分配失败也能被模拟：实现者返回
/// [`VsockError::Socket`] 时，拨号流程不会尝试任何清理。
pub trait DescriptorProvider {
    /// 产出的描述符类型。
    type Descriptor: StreamDescriptor;

    /// 分配一个新的 VSOCK 流式套接字。
    fn open(&self) -> Result<Self::Descriptor, VsockError>;
}

impl<P: DescriptorProvider + ?Sized> DescriptorProvider for &P {
    type Descriptor = P::Descriptor;

    fn open(&self) -> Result<Self::Descriptor, VsockError> {
        (**self).open()
    }
}
